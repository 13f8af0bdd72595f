use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::engine::error::EngineResult;
use crate::model::{
    ApprovalCategory, Attendance, AttendanceConfig, Device, EmployeeTransfer, Holiday,
    LeaveBalance, NormalizedLog, OvertimeRate, ShiftSchedule,
};

/// Persistence seam the sweeps run against.
///
/// Every sweep iteration works through a fresh short-lived unit of work on
/// the implementor's side (a pooled connection per call, a transaction for
/// the paired transfer writes); nothing here holds state across sleeps.
pub trait EngineStore {
    // --- device polling ---

    fn active_devices(&self) -> impl Future<Output = EngineResult<Vec<Device>>> + Send;

    /// Attendance configs for a company whose device-side employee id is
    /// non-empty; only these employees are polled.
    fn polling_targets(
        &self,
        company_id: u64,
    ) -> impl Future<Output = EngineResult<Vec<AttendanceConfig>>> + Send;

    /// Latest punch time already recorded per (employee, date) in the
    /// window. Key presence means the day's check-in entry exists; the
    /// normalizer keeps it and emits a check-out update only when a later
    /// punch arrives.
    fn logged_days(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> impl Future<Output = EngineResult<HashMap<(u64, NaiveDate), NaiveTime>>> + Send;

    /// Persists normalized entries (check-ins insert-once, check-outs
    /// overwrite in place) and advances the device's capture cursor in the
    /// same unit of work.
    fn save_normalized_logs(
        &self,
        device_id: u64,
        cursor: NaiveDateTime,
        entries: &[NormalizedLog],
    ) -> impl Future<Output = EngineResult<()>> + Send;

    // --- attendance calculation ---

    fn attendance_config(
        &self,
        employee_id: u64,
    ) -> impl Future<Output = EngineResult<Option<AttendanceConfig>>> + Send;

    fn shift_schedule(
        &self,
        schedule_id: u64,
    ) -> impl Future<Output = EngineResult<Option<ShiftSchedule>>> + Send;

    fn holidays(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> impl Future<Output = EngineResult<Vec<Holiday>>> + Send;

    fn day_logs(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> impl Future<Output = EngineResult<Vec<NormalizedLog>>> + Send;

    /// True when an Approve-status transaction of the category covers the
    /// date for the employee.
    fn has_approved_request(
        &self,
        employee_id: u64,
        date: NaiveDate,
        category: ApprovalCategory,
    ) -> impl Future<Output = EngineResult<bool>> + Send;

    /// Leave category (e.g. "annual", "sick") of the approved leave
    /// transaction covering the date, when one exists.
    fn approved_leave_category(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> impl Future<Output = EngineResult<Option<String>>> + Send;

    fn overtime_rates(&self) -> impl Future<Output = EngineResult<Vec<OvertimeRate>>> + Send;

    fn leave_balances(
        &self,
        employee_id: u64,
    ) -> impl Future<Output = EngineResult<Vec<LeaveBalance>>> + Send;

    /// Records one day of usage against a balance, keyed by
    /// (balance, employee, date) so recomputation cannot double-deduct.
    /// Returns false when the usage was already recorded.
    fn record_leave_usage(
        &self,
        balance_id: u64,
        employee_id: u64,
        date: NaiveDate,
    ) -> impl Future<Output = EngineResult<bool>> + Send;

    /// Inserts or overwrites the (employee, date) attendance row.
    fn upsert_attendance(
        &self,
        record: &Attendance,
    ) -> impl Future<Output = EngineResult<()>> + Send;

    // --- transfers ---

    /// Submitted, unprocessed transfers whose effective date has arrived.
    fn pending_transfers(
        &self,
        effective: NaiveDate,
    ) -> impl Future<Output = EngineResult<Vec<EmployeeTransfer>>> + Send;

    /// Applies the transfer's new assignment to the employee and flips
    /// status to Transferred with `is_processed = true`, all in one
    /// transaction. Returns false when the guard found the transfer already
    /// processed (a no-op, not an error).
    fn apply_transfer(
        &self,
        transfer: &EmployeeTransfer,
    ) -> impl Future<Output = EngineResult<bool>> + Send;
}
