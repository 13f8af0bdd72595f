use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};

use crate::model::{NormalizedLog, PunchDirection, RawPunch};

/// Dedups raw punches into canonical entries per (employee, date): the
/// earliest punch becomes the check-in entry, the latest becomes the
/// check-out entry.
///
/// `existing` maps already-persisted days to their latest recorded punch
/// time. A day present there keeps its check-in (re-ingesting an overlapping
/// device window never produces a duplicate), and a check-out entry is
/// emitted only when the batch carries a punch later than what is recorded,
/// so the out time can move forward across sweeps while identical input
/// yields nothing.
///
/// Punches with a blank or unenrolled device id are dropped. Output is
/// sorted by (employee, date, direction) so repeated runs over the same
/// input are bit-identical.
pub fn normalize(
    punches: &[RawPunch],
    pin_to_employee: &HashMap<String, u64>,
    existing: &HashMap<(u64, NaiveDate), NaiveTime>,
) -> Vec<NormalizedLog> {
    let mut span: HashMap<(u64, NaiveDate), (&RawPunch, &RawPunch)> = HashMap::new();

    for punch in punches {
        if punch.device_employee_id.trim().is_empty() {
            continue;
        }
        let Some(&employee_id) = pin_to_employee.get(&punch.device_employee_id) else {
            continue;
        };
        span.entry((employee_id, punch.date()))
            .and_modify(|(first, last)| {
                if punch.timestamp < first.timestamp {
                    *first = punch;
                }
                if punch.timestamp > last.timestamp {
                    *last = punch;
                }
            })
            .or_insert((punch, punch));
    }

    let mut entries = Vec::new();
    for ((employee_id, date), (first, last)) in span {
        let recorded = existing.get(&(employee_id, date)).copied();

        if recorded.is_none() {
            entries.push(NormalizedLog {
                employee_id,
                date,
                time: first.time(),
                direction: PunchDirection::CheckIn.to_string(),
            });
        }

        let emit_out = match recorded {
            None => last.timestamp > first.timestamp,
            Some(latest) => last.time() > latest,
        };
        if emit_out {
            entries.push(NormalizedLog {
                employee_id,
                date,
                time: last.time(),
                direction: PunchDirection::CheckOut.to_string(),
            });
        }
    }

    entries.sort_by(|a, b| {
        (a.employee_id, a.date, &a.direction).cmp(&(b.employee_id, b.date, &b.direction))
    });
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn punch(pin: &str, ts: &str) -> RawPunch {
        RawPunch {
            device_employee_id: pin.to_string(),
            timestamp: NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S").unwrap(),
            direction: PunchDirection::CheckIn,
        }
    }

    fn pins() -> HashMap<String, u64> {
        HashMap::from([("1000".to_string(), 1), ("2000".to_string(), 2)])
    }

    /// Latest time per (employee, date), as persistence would report it.
    fn persisted(entries: &[NormalizedLog]) -> HashMap<(u64, NaiveDate), NaiveTime> {
        let mut map = HashMap::new();
        for e in entries {
            map.entry((e.employee_id, e.date))
                .and_modify(|t: &mut NaiveTime| *t = (*t).max(e.time))
                .or_insert(e.time);
        }
        map
    }

    #[test]
    fn earliest_becomes_check_in_latest_becomes_check_out() {
        let punches = vec![
            punch("1000", "2026-01-05 09:12:00"),
            punch("1000", "2026-01-05 08:57:41"),
            punch("1000", "2026-01-05 17:40:00"),
        ];
        let out = normalize(&punches, &pins(), &HashMap::new());
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].direction, "check_in");
        assert_eq!(out[0].time, NaiveTime::from_hms_opt(8, 57, 41).unwrap());
        assert_eq!(out[1].direction, "check_out");
        assert_eq!(out[1].time, NaiveTime::from_hms_opt(17, 40, 0).unwrap());
    }

    #[test]
    fn single_punch_yields_only_a_check_in() {
        let punches = vec![punch("1000", "2026-01-05 09:00:00")];
        let out = normalize(&punches, &pins(), &HashMap::new());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].direction, "check_in");
    }

    #[test]
    fn splits_days_and_employees() {
        let punches = vec![
            punch("1000", "2026-01-05 09:00:00"),
            punch("1000", "2026-01-06 09:01:00"),
            punch("2000", "2026-01-05 08:30:00"),
        ];
        let out = normalize(&punches, &pins(), &HashMap::new());
        assert_eq!(out.len(), 3);
        // sorted by (employee, date)
        assert_eq!(out[0].employee_id, 1);
        assert_eq!(out[0].date, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
        assert_eq!(out[2].employee_id, 2);
    }

    #[test]
    fn drops_blank_and_unknown_pins() {
        let punches = vec![
            punch("", "2026-01-05 09:00:00"),
            punch("  ", "2026-01-05 09:00:00"),
            punch("9999", "2026-01-05 09:00:00"),
        ];
        assert!(normalize(&punches, &pins(), &HashMap::new()).is_empty());
    }

    #[test]
    fn persisted_day_keeps_its_check_in() {
        let punches = vec![
            punch("1000", "2026-01-05 09:00:00"),
            punch("1000", "2026-01-06 09:00:00"),
        ];
        let existing = HashMap::from([(
            (1u64, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        )]);
        let out = normalize(&punches, &pins(), &existing);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].date, NaiveDate::from_ymd_opt(2026, 1, 6).unwrap());
        assert_eq!(out[0].direction, "check_in");
    }

    #[test]
    fn later_punch_moves_the_check_out_forward() {
        // morning sweep persisted the day up to 08:55; the evening punch
        // must come through as a check-out update, nothing else
        let existing = HashMap::from([(
            (1u64, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()),
            NaiveTime::from_hms_opt(8, 55, 0).unwrap(),
        )]);
        let punches = vec![punch("1000", "2026-01-05 17:05:00")];
        let out = normalize(&punches, &pins(), &existing);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].direction, "check_out");
        assert_eq!(out[0].time, NaiveTime::from_hms_opt(17, 5, 0).unwrap());
    }

    #[test]
    fn punch_not_later_than_recorded_is_discarded() {
        let existing = HashMap::from([(
            (1u64, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()),
            NaiveTime::from_hms_opt(17, 5, 0).unwrap(),
        )]);
        let punches = vec![
            punch("1000", "2026-01-05 09:00:00"),
            punch("1000", "2026-01-05 17:05:00"),
        ];
        assert!(normalize(&punches, &pins(), &existing).is_empty());
    }

    #[test]
    fn reingesting_same_window_twice_is_a_noop() {
        let punches = vec![
            punch("1000", "2026-01-05 08:57:41"),
            punch("1000", "2026-01-05 17:40:00"),
            punch("2000", "2026-01-05 08:30:00"),
        ];
        let first = normalize(&punches, &pins(), &HashMap::new());

        // everything from the first pass is now persisted downstream
        let second = normalize(&punches, &pins(), &persisted(&first));
        assert!(second.is_empty());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_punch() -> impl Strategy<Value = RawPunch> {
            ("[0-9]{1,4}", 0i64..5, 0u32..86_400).prop_map(|(pin, day, secs)| {
                let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
                    + chrono::Duration::days(day);
                RawPunch {
                    device_employee_id: pin,
                    timestamp: date
                        .and_time(NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap()),
                    direction: PunchDirection::CheckIn,
                }
            })
        }

        proptest! {
            /// Running the normalizer over its own persisted output yields
            /// nothing, regardless of input shape.
            #[test]
            fn second_pass_is_always_empty(punches in prop::collection::vec(arb_punch(), 0..50)) {
                let mut pin_map = HashMap::new();
                for p in &punches {
                    let next = pin_map.len() as u64 + 1;
                    pin_map.entry(p.device_employee_id.clone()).or_insert(next);
                }
                let first = normalize(&punches, &pin_map, &HashMap::new());
                prop_assert!(normalize(&punches, &pin_map, &persisted(&first)).is_empty());
            }

            /// Output never contains two entries with the same key; at most
            /// one check-in and one check-out per employee-day.
            #[test]
            fn output_is_unique_per_employee_day_direction(punches in prop::collection::vec(arb_punch(), 0..50)) {
                let mut pin_map = HashMap::new();
                for p in &punches {
                    let next = pin_map.len() as u64 + 1;
                    pin_map.entry(p.device_employee_id.clone()).or_insert(next);
                }
                let out = normalize(&punches, &pin_map, &HashMap::new());
                let keys: std::collections::HashSet<_> =
                    out.iter().map(|e| (e.employee_id, e.date, e.direction.clone())).collect();
                prop_assert_eq!(keys.len(), out.len());
            }
        }
    }
}
