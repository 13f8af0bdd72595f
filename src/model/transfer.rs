use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransferCategory {
    Promotion,
    Demotion,
    Rotation,
    Mutation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransferStatus {
    Draft,
    Submitted,
    Transferred,
    Canceled,
}

/// An employee's organizational placement tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Assignment {
    #[schema(example = 10)]
    pub company_id: u64,
    #[schema(example = 22)]
    pub organization_id: u64,
    #[schema(example = 5)]
    pub position_id: u64,
    #[schema(example = 3)]
    pub title_id: u64,
    #[schema(example = 1)]
    pub branch_id: u64,
}

/// A scheduled organizational move. The "old" tuple is captured at
/// submission so the record stays meaningful after the employee row changes.
/// `is_processed` guards the apply step against re-running on the same day
/// or after a scheduler restart.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmployeeTransfer {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String)]
    pub category: TransferCategory,
    #[schema(value_type = String, format = "date")]
    pub effective_date: NaiveDate,
    pub old_assignment: Assignment,
    pub new_assignment: Assignment,
    #[schema(value_type = String)]
    pub status: TransferStatus,
    pub is_processed: bool,
}
