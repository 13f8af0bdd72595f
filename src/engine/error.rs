use chrono::NaiveDate;
use thiserror::Error;

/// Error type for the attendance engine.
///
/// Transient infrastructure failures (device, persistence) are retried on
/// the next scheduled cycle; data-inconsistency variants are logged per item
/// and skipped so a batch always continues.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Device could not be reached or returned a malformed response.
    #[error("device {device_id} ({name}): {message}")]
    Device {
        device_id: u64,
        name: String,
        message: String,
    },

    /// Persistence failure, retried on the next cycle.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Shift/schedule data missing for an employee on a date. The date is
    /// skipped and reported as a warning, never fatal to the batch.
    #[error("no shift schedule for employee {employee_id} on {date}")]
    MissingSchedule {
        employee_id: u64,
        date: NaiveDate,
    },

    #[error("employee {0} has no attendance config")]
    MissingConfig(u64),

    /// Approval chain configuration skips a level or does not start at 1.
    #[error("approval levels for organization {organization_id} are not contiguous from 1: {levels:?}")]
    BrokenApprovalChain {
        organization_id: u64,
        levels: Vec<u32>,
    },

    #[error("no stamp at level {level} for transaction {transaction_id}")]
    StampNotFound { transaction_id: u64, level: u32 },

    #[error("transaction {transaction_id} is {status} and cannot be stamped")]
    TransactionClosed {
        transaction_id: u64,
        status: String,
    },
}

pub type EngineResult<T> = Result<T, EngineError>;
