use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Request categories that flow through the multi-level approval workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApprovalCategory {
    Leave,
    LatePermit,
    EarlyOut,
    OutPermit,
    OvertimeLetter,
}

/// Status of a transaction as a whole, and of each individual stamp.
/// Stamps only ever hold Waiting / Approve / Reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApprovalStatus {
    New,
    Waiting,
    Approve,
    Reject,
    Revision,
}

impl ApprovalStatus {
    /// Approve and Reject are terminal; everything else is transient.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ApprovalStatus::Approve | ApprovalStatus::Reject)
    }
}

/// One approver's decision slot at one level of a transaction. Levels are
/// contiguous starting at 1. Stamps are append-only; Revision abandons them
/// with the transaction instead of deleting.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApprovalStamp {
    pub id: u64,
    pub transaction_id: u64,
    #[schema(example = 1)]
    pub level: u32,
    /// Filled when the stamp is decided.
    pub approver_id: Option<u64>,
    #[schema(value_type = String)]
    pub status: ApprovalStatus,
    pub reject_reason: Option<String>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub stamped_at: Option<NaiveDateTime>,
}

/// A submitted leave / permit / overtime request moving through approval.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApprovalTransaction {
    pub id: u64,
    pub employee_id: u64,
    pub organization_id: u64,
    #[schema(value_type = String)]
    pub category: ApprovalCategory,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub reason: Option<String>,
    /// For Leave transactions: the balance category the leave draws from
    /// (e.g. "annual", "sick").
    pub leave_category: Option<String>,
    #[schema(value_type = String)]
    pub status: ApprovalStatus,
    #[schema(value_type = String, format = "date-time")]
    pub submitted_at: NaiveDateTime,
    /// Set when this transaction is the resubmission of a revised one.
    pub revised_from: Option<u64>,
}

/// One row of an organization's approval chain configuration.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ApprovalLevel {
    pub organization_id: u64,
    #[schema(example = 1)]
    pub level: u32,
    #[schema(example = "supervisor")]
    pub required_role: String,
}
