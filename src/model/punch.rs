use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Direction reported by the terminal for a single punch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PunchDirection {
    CheckIn,
    CheckOut,
    BreakIn,
    BreakOut,
    OvertimeIn,
    OvertimeOut,
}

/// A raw capture from the device adapter. Immutable once captured; the
/// engine never persists these directly, only their normalized form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPunch {
    /// Device-side employee identifier (the PIN enrolled on the terminal).
    pub device_employee_id: String,
    pub timestamp: NaiveDateTime,
    pub direction: PunchDirection,
}

impl RawPunch {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn time(&self) -> NaiveTime {
        self.timestamp.time()
    }
}

/// One deduplicated log entry per (employee, date), produced by the
/// normalizer and handed to persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct NormalizedLog {
    #[schema(example = 1000)]
    pub employee_id: u64,

    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(example = "08:57:41", value_type = String)]
    pub time: NaiveTime,

    #[schema(example = "check_in", value_type = String)]
    pub direction: String,
}
