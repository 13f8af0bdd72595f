//! The device sweep: decide which terminals are due, pull their punches
//! through the adapter, normalize, persist, and recalculate the touched
//! employee-days. One device failing never aborts the sweep.

use std::collections::{BTreeSet, HashMap};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use tracing::{debug, info, warn};

use crate::engine::adapter::DeviceAdapter;
use crate::engine::calculator::recalculate_range;
use crate::engine::error::EngineResult;
use crate::engine::normalizer::normalize;
use crate::engine::store::EngineStore;
use crate::model::Device;

/// A device is polled when the current time-of-day is within this many
/// minutes of one of its configured retrieval times.
pub const RETRIEVAL_TOLERANCE_MINUTES: i64 = 5;

/// Window match, wrap-aware so a 23:58 retrieval time matches at 00:01.
pub fn is_due(now: NaiveTime, retrieval_times: &[NaiveTime]) -> bool {
    const DAY_SECS: i64 = 86_400;
    let now_secs = i64::from(now.num_seconds_from_midnight());
    retrieval_times.iter().any(|t| {
        let t_secs = i64::from(t.num_seconds_from_midnight());
        let diff = (now_secs - t_secs).abs();
        diff.min(DAY_SECS - diff) <= RETRIEVAL_TOLERANCE_MINUTES * 60
    })
}

/// What one sweep did, for structured logging.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub devices_checked: u32,
    pub devices_due: u32,
    pub punches_fetched: u32,
    pub entries_saved: u32,
    pub days_recalculated: u32,
    pub device_failures: u32,
}

/// Polls every due device once. Runs on an unconditional repeating tick;
/// a sweep where nothing is due is a normal no-op.
pub async fn device_sweep<S, A>(
    store: &S,
    adapter: &A,
    now: NaiveDateTime,
) -> EngineResult<SweepReport>
where
    S: EngineStore,
    A: DeviceAdapter,
{
    let devices = store.active_devices().await?;
    let mut report = SweepReport::default();

    for device in &devices {
        report.devices_checked += 1;

        let times = device.retrieval_times();
        if times.is_empty() || !is_due(now.time(), &times) {
            continue;
        }
        report.devices_due += 1;

        // Per-device isolation: a timeout or malformed response on one
        // terminal must not starve the rest of the sweep.
        match poll_device(store, adapter, device, now).await {
            Ok((fetched, saved, recalculated)) => {
                report.punches_fetched += fetched;
                report.entries_saved += saved;
                report.days_recalculated += recalculated;
            }
            Err(e) => {
                warn!(device = %device.name, error = %e, "device poll failed, continuing sweep");
                report.device_failures += 1;
            }
        }
    }

    if report.devices_due == 0 {
        debug!(checked = report.devices_checked, "no device due this tick");
    } else {
        info!(
            due = report.devices_due,
            punches = report.punches_fetched,
            saved = report.entries_saved,
            recalculated = report.days_recalculated,
            failures = report.device_failures,
            "device sweep finished"
        );
    }

    Ok(report)
}

async fn poll_device<S, A>(
    store: &S,
    adapter: &A,
    device: &Device,
    now: NaiveDateTime,
) -> EngineResult<(u32, u32, u32)>
where
    S: EngineStore,
    A: DeviceAdapter,
{
    let targets = store.polling_targets(device.company_id).await?;
    if targets.is_empty() {
        debug!(device = %device.name, "no enrolled employees, skipped");
        return Ok((0, 0, 0));
    }

    let pin_to_employee: HashMap<String, u64> = targets
        .iter()
        .filter_map(|c| c.device_employee_id.clone().map(|pin| (pin, c.employee_id)))
        .collect();
    let pins: Vec<String> = pin_to_employee.keys().cloned().collect();

    let punches = adapter
        .retrieve_logs(device, &pins, device.last_captured_at)
        .await?;
    if punches.is_empty() {
        return Ok((0, 0, 0));
    }
    let fetched = punches.len() as u32;

    let window_from = punches.iter().map(|p| p.date()).min().unwrap();
    let window_to = punches.iter().map(|p| p.date()).max().unwrap();
    let existing = store.logged_days(window_from, window_to).await?;

    let entries = normalize(&punches, &pin_to_employee, &existing);

    // The cursor advances to the newest punch seen even when every entry
    // was deduplicated away, so overlapping windows shrink over time.
    let cursor = punches.iter().map(|p| p.timestamp).max().unwrap_or(now);
    store
        .save_normalized_logs(device.id, cursor, &entries)
        .await?;

    // A day's check-in and check-out entries recalculate that day once.
    let touched: BTreeSet<(u64, NaiveDate)> =
        entries.iter().map(|e| (e.employee_id, e.date)).collect();

    let mut recalculated = 0;
    for (employee_id, date) in touched {
        match recalculate_range(store, employee_id, date, date).await {
            Ok(recalc) => {
                for warning in &recalc.warnings {
                    warn!(device = %device.name, "{warning}");
                }
                recalculated += recalc.computed;
            }
            Err(e) => {
                // Data inconsistency on one employee must not abort the
                // device's batch.
                warn!(device = %device.name, employee_id, error = %e, "recalculation skipped");
            }
        }
    }

    Ok((fetched, entries.len() as u32, recalculated))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn polls_inside_the_five_minute_window() {
        let times = [t(8, 0), t(13, 0)];
        assert!(is_due(t(8, 3), &times));
        assert!(is_due(t(7, 55), &times));
        assert!(is_due(t(13, 5), &times));
    }

    #[test]
    fn does_not_poll_outside_the_window() {
        let times = [t(8, 0), t(13, 0)];
        assert!(!is_due(t(8, 10), &times));
        assert!(!is_due(t(12, 30), &times));
        assert!(!is_due(t(20, 0), &times));
    }

    #[test]
    fn window_wraps_over_midnight() {
        let times = [t(23, 58)];
        assert!(is_due(t(0, 1), &times));
        assert!(!is_due(t(0, 10), &times));
    }

    #[test]
    fn empty_time_set_is_never_due() {
        assert!(!is_due(t(8, 0), &[]));
    }
}
