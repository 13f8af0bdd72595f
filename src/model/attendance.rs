use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

use crate::model::overtime::OvertimeMode;

/// Computed status of one employee-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Late,
    EarlyOut,
    Holiday,
    OffSchedule,
    Leave,
    Out,
    NotPresent,
}

/// One row per (employee, date). Created and overwritten only by the
/// attendance calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "employee_id": 1000,
    "date": "2026-01-05",
    "in_time": "09:12:00",
    "out_time": "17:40:00",
    "late_minutes": 2,
    "overtime_minutes": 40,
    "overtime_value": "1.0",
    "status": "late"
}))]
pub struct Attendance {
    pub employee_id: u64,

    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(value_type = String, nullable = true)]
    pub in_time: Option<NaiveTime>,

    #[schema(value_type = String, nullable = true)]
    pub out_time: Option<NaiveTime>,

    pub late_minutes: i64,

    pub overtime_minutes: i64,

    /// Tier-weighted overtime hours (hours x multiplier, summed per tier).
    #[schema(value_type = String)]
    pub overtime_value: Decimal,

    #[schema(value_type = String)]
    pub status: AttendanceStatus,
}

/// Per-employee attendance configuration, long-lived reference data.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttendanceConfig {
    #[schema(example = 1000)]
    pub employee_id: u64,

    #[schema(example = 10)]
    pub company_id: u64,

    /// PIN enrolled on the company's terminals. Employees without one are
    /// never polling targets.
    #[schema(example = "1000", nullable = true)]
    pub device_employee_id: Option<String>,

    #[schema(example = 3)]
    pub shift_id: u64,

    #[schema(example = 7)]
    pub schedule_id: u64,

    #[schema(example = "auto", value_type = String)]
    pub overtime_mode: OvertimeMode,
}
