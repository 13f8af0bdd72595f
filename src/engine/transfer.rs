//! The transfer sweep: applies Submitted transfers whose effective date has
//! arrived, exactly once each.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::engine::error::EngineResult;
use crate::engine::store::EngineStore;

#[derive(Debug, Default)]
pub struct TransferReport {
    pub applied: u32,
    pub skipped: u32,
    pub failures: u32,
}

/// Applies every pending transfer effective on `today`.
///
/// Each transfer is an independent unit of work: a failure is logged and
/// the sweep continues. The store's `apply_transfer` pairs the assignment
/// overwrite with the Transferred/`is_processed` flip in one transaction,
/// so a second sweep the same day (or a restarted scheduler) finds nothing
/// to do.
pub async fn transfer_sweep<S: EngineStore>(
    store: &S,
    today: NaiveDate,
) -> EngineResult<TransferReport> {
    let pending = store.pending_transfers(today).await?;
    let mut report = TransferReport::default();

    for transfer in &pending {
        match store.apply_transfer(transfer).await {
            Ok(true) => {
                info!(
                    transfer_id = transfer.id,
                    employee_id = transfer.employee_id,
                    category = %transfer.category,
                    "transfer applied"
                );
                report.applied += 1;
            }
            Ok(false) => {
                // Guard found it already processed; a no-op, not an error.
                report.skipped += 1;
            }
            Err(e) => {
                warn!(transfer_id = transfer.id, error = %e, "transfer failed, continuing sweep");
                report.failures += 1;
            }
        }
    }

    if report.applied + report.skipped + report.failures > 0 {
        info!(
            applied = report.applied,
            skipped = report.skipped,
            failures = report.failures,
            "transfer sweep finished"
        );
    }

    Ok(report)
}
