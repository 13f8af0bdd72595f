use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// How overtime is recognized for an employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OvertimeMode {
    /// Overtime is never computed.
    None,
    /// Any worked time past shift out counts automatically.
    Auto,
    /// Overtime counts only on dates covered by an approved overtime letter.
    Letter,
}

/// One tier of the overtime weighting table. Tiers are ordered by
/// `hour_threshold`; a tier weights the overtime hours between its threshold
/// and the next tier's threshold.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({ "id": 1, "hour_threshold": 0, "multiplier": "1.5" }))]
pub struct OvertimeRate {
    #[schema(example = 1)]
    pub id: u64,

    /// Hours of overtime already worked before this tier starts.
    #[schema(example = 0)]
    pub hour_threshold: u32,

    #[schema(example = "1.5", value_type = String)]
    pub multiplier: Decimal,
}
