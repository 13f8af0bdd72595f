//! Attendance calculation: shift resolution, day classification, overtime
//! tier weighting, and leave-balance deduction planning.
//!
//! `compute_day` is pure; `recalculate_range` is the orchestrator that
//! assembles a day's inputs from the store and persists the result. Both
//! are safe to re-run: unchanged inputs produce the identical record and
//! the upsert overwrites in place.

use chrono::{Datelike, NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::store::EngineStore;
use crate::model::{
    ApprovalCategory, Attendance, AttendanceStatus, LeaveBalance, OvertimeMode, OvertimeRate,
    ShiftDetail,
};

/// Everything needed to classify one employee-day.
#[derive(Debug)]
pub struct DayInput<'a> {
    pub employee_id: u64,
    pub date: NaiveDate,
    /// Working detail for the weekday; None when the schedule has no row.
    pub detail: Option<&'a ShiftDetail>,
    /// The weekday exists in the schedule but is flagged off.
    pub weekday_is_off: bool,
    pub is_holiday: bool,
    pub punch_times: &'a [NaiveTime],
    pub overtime_mode: OvertimeMode,
    pub has_overtime_letter: bool,
    pub has_approved_leave: bool,
    pub has_out_permit: bool,
    pub has_late_permit: bool,
    pub has_early_out_permit: bool,
    pub rates: &'a [OvertimeRate],
}

/// Outcome of a batch recalculation. Skipped dates are reported as named
/// warnings, never as batch failure.
#[derive(Debug, Default)]
pub struct RecalcReport {
    pub computed: u32,
    pub warnings: Vec<String>,
}

fn minutes_between(from: NaiveTime, to: NaiveTime) -> i64 {
    (to - from).num_minutes()
}

/// Weights overtime minutes through the tier table. Tiers are ordered by
/// `hour_threshold`; each tier multiplies the hours between its threshold
/// and the next. An empty table weights hours at face value.
pub fn weighted_overtime(minutes: i64, rates: &[OvertimeRate]) -> Decimal {
    let hours = Decimal::from(minutes.max(0)) / Decimal::from(60);
    if rates.is_empty() {
        return hours;
    }

    let mut tiers: Vec<&OvertimeRate> = rates.iter().collect();
    tiers.sort_by_key(|r| r.hour_threshold);

    let mut value = Decimal::ZERO;
    for (i, tier) in tiers.iter().enumerate() {
        let lower = Decimal::from(tier.hour_threshold);
        let upper = tiers
            .get(i + 1)
            .map(|next| Decimal::from(next.hour_threshold))
            .unwrap_or(hours);
        let span = (hours.min(upper) - lower).max(Decimal::ZERO);
        value += span * tier.multiplier;
    }
    value
}

/// Picks the balance a leave day is deducted from: matching category, not
/// expired, something left to use, lowest priority number first (earliest
/// expiry breaks ties).
pub fn plan_leave_deduction(
    balances: &[LeaveBalance],
    category: &str,
    date: NaiveDate,
) -> Option<u64> {
    balances
        .iter()
        .filter(|b| b.category == category && b.usable_on(date))
        .min_by_key(|b| (b.priority, b.expiry_date))
        .map(|b| b.id)
}

fn blank_day(input: &DayInput, status: AttendanceStatus) -> Attendance {
    Attendance {
        employee_id: input.employee_id,
        date: input.date,
        in_time: None,
        out_time: None,
        late_minutes: 0,
        overtime_minutes: 0,
        overtime_value: Decimal::ZERO,
        status,
    }
}

fn overtime_allowed(input: &DayInput) -> bool {
    match input.overtime_mode {
        OvertimeMode::None => false,
        OvertimeMode::Auto => true,
        OvertimeMode::Letter => input.has_overtime_letter,
    }
}

/// Classifies one employee-day. Returns `MissingSchedule` when the weekday
/// has no working detail and the absence is not explained by an off day or
/// holiday; the caller reports it as a warning and continues the batch.
pub fn compute_day(input: &DayInput) -> EngineResult<Attendance> {
    // Non-working days first; punches on them only matter for overtime.
    if input.is_holiday || input.weekday_is_off {
        let status = if input.is_holiday {
            AttendanceStatus::Holiday
        } else {
            AttendanceStatus::OffSchedule
        };
        let mut record = blank_day(input, status);
        if !input.punch_times.is_empty() && overtime_allowed(input) {
            let first = *input.punch_times.iter().min().unwrap();
            let last = *input.punch_times.iter().max().unwrap();
            if last > first {
                record.in_time = Some(first);
                record.out_time = Some(last);
                record.overtime_minutes = minutes_between(first, last);
                record.overtime_value = weighted_overtime(record.overtime_minutes, input.rates);
            }
        }
        return Ok(record);
    }

    let Some(detail) = input.detail else {
        return Err(EngineError::MissingSchedule {
            employee_id: input.employee_id,
            date: input.date,
        });
    };

    // Punches outside [early_in, max_out] are noise from adjacent shifts.
    let mut times: Vec<NaiveTime> = input
        .punch_times
        .iter()
        .copied()
        .filter(|t| *t >= detail.early_in_time && *t <= detail.max_out_time)
        .collect();
    times.sort();

    if times.is_empty() {
        let status = if input.has_approved_leave {
            AttendanceStatus::Leave
        } else if input.has_out_permit {
            AttendanceStatus::Out
        } else {
            AttendanceStatus::NotPresent
        };
        return Ok(blank_day(input, status));
    }

    let in_time = times[0];
    let out_time = times.last().copied().filter(|t| *t > in_time);

    let past_tolerance =
        minutes_between(detail.in_time, in_time) - i64::from(detail.late_tolerance_minutes);
    let late_minutes = past_tolerance.max(0);

    let left_early = out_time.map(|t| t < detail.out_time).unwrap_or(false);

    let status = if late_minutes > 0 && !input.has_late_permit {
        AttendanceStatus::Late
    } else if left_early && !input.has_early_out_permit {
        AttendanceStatus::EarlyOut
    } else {
        AttendanceStatus::Present
    };

    let mut overtime_minutes = 0;
    if let Some(out) = out_time {
        if overtime_allowed(input) {
            overtime_minutes = minutes_between(detail.out_time, out.min(detail.max_out_time)).max(0);
        }
    }

    Ok(Attendance {
        employee_id: input.employee_id,
        date: input.date,
        in_time: Some(in_time),
        out_time,
        late_minutes,
        overtime_minutes,
        overtime_value: weighted_overtime(overtime_minutes, input.rates),
        status,
    })
}

/// Recomputes the attendance rows of one employee over a date range.
///
/// Missing schedule data skips the date with a named warning; the loop
/// never aborts the remaining dates. Leave days deduct from the matching
/// balance through an idempotent usage record, so recomputation cannot
/// double-deduct.
pub async fn recalculate_range<S: EngineStore>(
    store: &S,
    employee_id: u64,
    from: NaiveDate,
    to: NaiveDate,
) -> EngineResult<RecalcReport> {
    let config = store
        .attendance_config(employee_id)
        .await?
        .ok_or(EngineError::MissingConfig(employee_id))?;
    let schedule = store.shift_schedule(config.schedule_id).await?;
    let holidays = store.holidays(from, to).await?;
    let rates = store.overtime_rates().await?;

    let mut report = RecalcReport::default();
    let mut date = from;
    while date <= to {
        let logs = store.day_logs(employee_id, date).await?;
        let punch_times: Vec<NaiveTime> = logs.iter().map(|l| l.time).collect();

        let leave_category = store.approved_leave_category(employee_id, date).await?;
        let input = DayInput {
            employee_id,
            date,
            detail: schedule.as_ref().and_then(|s| s.detail_for(date.weekday())),
            weekday_is_off: schedule
                .as_ref()
                .map(|s| s.is_off_day(date.weekday()))
                .unwrap_or(false),
            is_holiday: holidays.iter().any(|h| h.date == date),
            punch_times: &punch_times,
            overtime_mode: config.overtime_mode,
            has_overtime_letter: store
                .has_approved_request(employee_id, date, ApprovalCategory::OvertimeLetter)
                .await?,
            has_approved_leave: leave_category.is_some(),
            has_out_permit: store
                .has_approved_request(employee_id, date, ApprovalCategory::OutPermit)
                .await?,
            has_late_permit: store
                .has_approved_request(employee_id, date, ApprovalCategory::LatePermit)
                .await?,
            has_early_out_permit: store
                .has_approved_request(employee_id, date, ApprovalCategory::EarlyOut)
                .await?,
            rates: &rates,
        };

        match compute_day(&input) {
            Ok(record) => {
                store.upsert_attendance(&record).await?;
                if record.status == AttendanceStatus::Leave {
                    if let Some(category) = leave_category.as_deref() {
                        let balances = store.leave_balances(employee_id).await?;
                        match plan_leave_deduction(&balances, category, date) {
                            Some(balance_id) => {
                                let recorded = store
                                    .record_leave_usage(balance_id, employee_id, date)
                                    .await?;
                                if !recorded {
                                    debug!(employee_id, %date, balance_id, "leave usage already recorded");
                                }
                            }
                            None => {
                                report.warnings.push(format!(
                                    "employee {employee_id} on {date}: no usable '{category}' balance to deduct"
                                ));
                            }
                        }
                    }
                }
                report.computed += 1;
            }
            Err(e @ EngineError::MissingSchedule { .. }) => {
                warn!(employee_id, %date, error = %e, "date skipped");
                report.warnings.push(e.to_string());
            }
            Err(e) => return Err(e),
        }

        date += chrono::Duration::days(1);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn nine_to_five() -> ShiftDetail {
        ShiftDetail {
            id: 1,
            schedule_id: 1,
            weekday: 0,
            in_time: t(9, 0),
            out_time: t(17, 0),
            early_in_time: t(7, 0),
            max_out_time: t(22, 0),
            late_tolerance_minutes: 10,
            is_off: false,
        }
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    fn input<'a>(detail: &'a ShiftDetail, punches: &'a [NaiveTime]) -> DayInput<'a> {
        DayInput {
            employee_id: 1000,
            date: monday(),
            detail: Some(detail),
            weekday_is_off: false,
            is_holiday: false,
            punch_times: punches,
            overtime_mode: OvertimeMode::None,
            has_overtime_letter: false,
            has_approved_leave: false,
            has_out_permit: false,
            has_late_permit: false,
            has_early_out_permit: false,
            rates: &[],
        }
    }

    #[test]
    fn punch_within_tolerance_is_present() {
        let detail = nine_to_five();
        let punches = [t(9, 5), t(17, 10)];
        let record = compute_day(&input(&detail, &punches)).unwrap();
        assert_eq!(record.status, AttendanceStatus::Present);
        assert_eq!(record.late_minutes, 0);
    }

    #[test]
    fn punch_past_tolerance_is_late_by_the_excess() {
        // 09:00 shift, 10 min tolerance, punch 09:12 => late by 2
        let detail = nine_to_five();
        let punches = [t(9, 12), t(17, 10)];
        let record = compute_day(&input(&detail, &punches)).unwrap();
        assert_eq!(record.status, AttendanceStatus::Late);
        assert_eq!(record.late_minutes, 2);
    }

    #[test]
    fn late_permit_excuses_the_late_arrival() {
        let detail = nine_to_five();
        let punches = [t(9, 30), t(17, 10)];
        let mut i = input(&detail, &punches);
        i.has_late_permit = true;
        let record = compute_day(&i).unwrap();
        assert_eq!(record.status, AttendanceStatus::Present);
        // the actual lateness is still recorded
        assert_eq!(record.late_minutes, 20);
    }

    #[test]
    fn leaving_before_shift_end_is_early_out() {
        let detail = nine_to_five();
        let punches = [t(9, 0), t(16, 0)];
        let record = compute_day(&input(&detail, &punches)).unwrap();
        assert_eq!(record.status, AttendanceStatus::EarlyOut);
    }

    #[test]
    fn late_takes_precedence_over_early_out() {
        let detail = nine_to_five();
        let punches = [t(9, 30), t(16, 0)];
        let record = compute_day(&input(&detail, &punches)).unwrap();
        assert_eq!(record.status, AttendanceStatus::Late);
    }

    #[test]
    fn no_punches_without_explanation_is_not_present() {
        let detail = nine_to_five();
        let record = compute_day(&input(&detail, &[])).unwrap();
        assert_eq!(record.status, AttendanceStatus::NotPresent);
        assert!(record.in_time.is_none());
    }

    #[test]
    fn approved_leave_explains_the_absence() {
        let detail = nine_to_five();
        let mut i = input(&detail, &[]);
        i.has_approved_leave = true;
        assert_eq!(compute_day(&i).unwrap().status, AttendanceStatus::Leave);
    }

    #[test]
    fn out_permit_explains_the_absence() {
        let detail = nine_to_five();
        let mut i = input(&detail, &[]);
        i.has_out_permit = true;
        assert_eq!(compute_day(&i).unwrap().status, AttendanceStatus::Out);
    }

    #[test]
    fn punches_outside_early_in_and_max_out_are_noise() {
        let detail = nine_to_five();
        // 06:00 is before early-in, 23:00 past max-out
        let punches = [t(6, 0), t(9, 5), t(17, 30), t(23, 0)];
        let record = compute_day(&input(&detail, &punches)).unwrap();
        assert_eq!(record.in_time, Some(t(9, 5)));
        assert_eq!(record.out_time, Some(t(17, 30)));
    }

    #[test]
    fn holiday_wins_over_punches() {
        let detail = nine_to_five();
        let punches = [t(9, 0), t(17, 0)];
        let mut i = input(&detail, &punches);
        i.is_holiday = true;
        assert_eq!(compute_day(&i).unwrap().status, AttendanceStatus::Holiday);
    }

    #[test]
    fn missing_detail_is_a_named_skip() {
        let punches = [t(9, 0)];
        let detail = nine_to_five();
        let mut i = input(&detail, &punches);
        i.detail = None;
        match compute_day(&i) {
            Err(EngineError::MissingSchedule { employee_id, date }) => {
                assert_eq!(employee_id, 1000);
                assert_eq!(date, monday());
            }
            other => panic!("expected MissingSchedule, got {other:?}"),
        }
    }

    #[test]
    fn off_day_is_off_schedule_even_without_detail() {
        let detail = nine_to_five();
        let mut i = input(&detail, &[]);
        i.detail = None;
        i.weekday_is_off = true;
        assert_eq!(compute_day(&i).unwrap().status, AttendanceStatus::OffSchedule);
    }

    #[test]
    fn auto_mode_counts_time_past_shift_out() {
        let detail = nine_to_five();
        let punches = [t(9, 0), t(18, 30)];
        let mut i = input(&detail, &punches);
        i.overtime_mode = OvertimeMode::Auto;
        let record = compute_day(&i).unwrap();
        assert_eq!(record.overtime_minutes, 90);
    }

    #[test]
    fn overtime_is_capped_at_max_out() {
        let mut detail = nine_to_five();
        detail.max_out_time = t(19, 0);
        let punches = [t(9, 0), t(19, 0)];
        let mut i = input(&detail, &punches);
        i.overtime_mode = OvertimeMode::Auto;
        assert_eq!(compute_day(&i).unwrap().overtime_minutes, 120);
    }

    #[test]
    fn letter_mode_requires_an_approved_letter() {
        let detail = nine_to_five();
        let punches = [t(9, 0), t(19, 0)];
        let mut i = input(&detail, &punches);
        i.overtime_mode = OvertimeMode::Letter;
        assert_eq!(compute_day(&i).unwrap().overtime_minutes, 0);

        i.has_overtime_letter = true;
        assert_eq!(compute_day(&i).unwrap().overtime_minutes, 120);
    }

    #[test]
    fn holiday_work_counts_as_overtime_in_auto_mode() {
        let detail = nine_to_five();
        let punches = [t(9, 0), t(13, 0)];
        let mut i = input(&detail, &punches);
        i.is_holiday = true;
        i.overtime_mode = OvertimeMode::Auto;
        let record = compute_day(&i).unwrap();
        assert_eq!(record.status, AttendanceStatus::Holiday);
        assert_eq!(record.overtime_minutes, 240);
    }

    #[test]
    fn recomputation_is_bit_identical() {
        let detail = nine_to_five();
        let punches = [t(9, 12), t(18, 0)];
        let mut i = input(&detail, &punches);
        i.overtime_mode = OvertimeMode::Auto;
        let first = compute_day(&i).unwrap();
        let second = compute_day(&i).unwrap();
        assert_eq!(first, second);
    }

    fn rate(threshold: u32, mult: f64) -> OvertimeRate {
        OvertimeRate {
            id: threshold as u64 + 1,
            hour_threshold: threshold,
            multiplier: Decimal::from_f64(mult).unwrap(),
        }
    }

    #[test]
    fn tiers_weight_each_hour_band() {
        // first hour x1.5, everything after x2
        let rates = [rate(0, 1.5), rate(1, 2.0)];
        // 3 hours => 1*1.5 + 2*2.0 = 5.5
        assert_eq!(
            weighted_overtime(180, &rates),
            Decimal::from_f64(5.5).unwrap()
        );
    }

    #[test]
    fn partial_hours_weight_proportionally() {
        let rates = [rate(0, 1.5), rate(1, 2.0)];
        // 90 min => 1*1.5 + 0.5*2.0 = 2.5
        assert_eq!(
            weighted_overtime(90, &rates),
            Decimal::from_f64(2.5).unwrap()
        );
    }

    #[test]
    fn empty_tier_table_weights_at_face_value() {
        assert_eq!(weighted_overtime(90, &[]), Decimal::from_f64(1.5).unwrap());
    }

    fn balance(id: u64, category: &str, priority: i32, remaining: i32, expiry: NaiveDate) -> LeaveBalance {
        LeaveBalance {
            id,
            employee_id: 1000,
            name: format!("balance-{id}"),
            category: category.into(),
            quota: remaining,
            used: 0,
            credit: 0,
            expiry_date: expiry,
            priority,
        }
    }

    #[test]
    fn deduction_picks_matching_category_by_priority() {
        let expiry = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        let balances = [
            balance(1, "annual", 2, 5, expiry),
            balance(2, "annual", 1, 5, expiry),
            balance(3, "sick", 1, 5, expiry),
        ];
        assert_eq!(plan_leave_deduction(&balances, "annual", monday()), Some(2));
    }

    #[test]
    fn expired_and_empty_balances_are_skipped() {
        let expired = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        let expiry = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        let balances = [
            balance(1, "annual", 1, 5, expired),
            balance(2, "annual", 2, 0, expiry),
            balance(3, "annual", 3, 1, expiry),
        ];
        assert_eq!(plan_leave_deduction(&balances, "annual", monday()), Some(3));
    }

    #[test]
    fn no_usable_balance_yields_none() {
        assert_eq!(plan_leave_deduction(&[], "annual", monday()), None);
    }
}
