use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Work-time template for one weekday of a shift schedule.
///
/// `early_in_time` is the earliest punch the calculator will accept as an
/// arrival; anything before it is treated as noise from the previous shift.
/// `max_out_time` caps how far past `out_time` worked time (and therefore
/// overtime) can extend.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ShiftDetail {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 7)]
    pub schedule_id: u64,

    /// 0 = Monday .. 6 = Sunday.
    #[schema(example = 0)]
    pub weekday: u8,

    #[schema(example = "09:00:00", value_type = String)]
    pub in_time: NaiveTime,

    #[schema(example = "17:00:00", value_type = String)]
    pub out_time: NaiveTime,

    #[schema(example = "07:00:00", value_type = String)]
    pub early_in_time: NaiveTime,

    #[schema(example = "22:00:00", value_type = String)]
    pub max_out_time: NaiveTime,

    /// Minutes past `in_time` still counted as on-time.
    #[schema(example = 10)]
    pub late_tolerance_minutes: u32,

    /// Non-working day in this schedule.
    pub is_off: bool,
}

/// A schedule groups one ShiftDetail per weekday.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShiftSchedule {
    #[schema(example = 7)]
    pub id: u64,

    #[schema(example = "Office 9-5")]
    pub name: String,

    pub details: Vec<ShiftDetail>,
}

impl ShiftSchedule {
    /// Returns the working detail for a weekday, or None when the schedule
    /// has no row for it or marks it as off.
    pub fn detail_for(&self, weekday: Weekday) -> Option<&ShiftDetail> {
        let idx = weekday.num_days_from_monday() as u8;
        self.details.iter().find(|d| d.weekday == idx && !d.is_off)
    }

    /// True when the schedule has a row for the weekday but it is flagged
    /// off (as opposed to the row being missing, which is a data gap).
    pub fn is_off_day(&self, weekday: Weekday) -> bool {
        let idx = weekday.num_days_from_monday() as u8;
        self.details.iter().any(|d| d.weekday == idx && d.is_off)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Holiday {
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(example = "New Year")]
    pub name: String,
}
