//! The multi-level sequential approval state machine.
//!
//! Overall transaction status is a pure function of its stamps: a single
//! Reject wins immediately, Approve requires every configured level, and
//! anything else is still Waiting. Revision is decided on the transaction
//! itself (not a stamp) and invalidates the whole stamp set; resubmission
//! happens as a fresh transaction.

use crate::engine::error::{EngineError, EngineResult};
use crate::model::{ApprovalLevel, ApprovalStamp, ApprovalStatus};

/// Folds a stamp set into the transaction's overall status.
///
/// `max_level` is the highest configured level for the organization. Stamps
/// above it are ignored; a missing stamp below it counts as Waiting.
pub fn overall_status(stamps: &[ApprovalStamp], max_level: u32) -> ApprovalStatus {
    if stamps
        .iter()
        .any(|s| s.level <= max_level && s.status == ApprovalStatus::Reject)
    {
        return ApprovalStatus::Reject;
    }

    let all_approved = (1..=max_level).all(|level| {
        stamps
            .iter()
            .any(|s| s.level == level && s.status == ApprovalStatus::Approve)
    });

    if all_approved && max_level > 0 {
        ApprovalStatus::Approve
    } else {
        ApprovalStatus::Waiting
    }
}

/// Validates an organization's approval chain: levels must be contiguous
/// starting at 1. Returns the highest level on success.
pub fn validate_levels(organization_id: u64, levels: &[ApprovalLevel]) -> EngineResult<u32> {
    let mut numbers: Vec<u32> = levels.iter().map(|l| l.level).collect();
    numbers.sort_unstable();
    numbers.dedup();

    let contiguous = numbers
        .iter()
        .enumerate()
        .all(|(i, &n)| n == i as u32 + 1);
    if numbers.is_empty() || !contiguous || numbers.len() != levels.len() {
        return Err(EngineError::BrokenApprovalChain {
            organization_id,
            levels: levels.iter().map(|l| l.level).collect(),
        });
    }
    Ok(*numbers.last().unwrap())
}

/// An approver's decision on one stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampDecision {
    Approve,
    Reject,
    /// Sends the whole transaction back for revision.
    Revision,
}

/// Applies a decision to the stamp at `level` and returns the transaction's
/// new overall status.
///
/// Rejecting short-circuits: stamps at higher levels stay Waiting, the
/// workflow is stopped rather than pre-filled. A Revision decision does not
/// touch the stamp set at all; the stamps are abandoned with the
/// transaction.
pub fn apply_stamp(
    transaction_id: u64,
    current_status: ApprovalStatus,
    stamps: &mut [ApprovalStamp],
    max_level: u32,
    level: u32,
    approver_id: u64,
    decision: StampDecision,
    reject_reason: Option<String>,
    now: chrono::NaiveDateTime,
) -> EngineResult<ApprovalStatus> {
    if current_status.is_terminal() || current_status == ApprovalStatus::Revision {
        return Err(EngineError::TransactionClosed {
            transaction_id,
            status: current_status.to_string(),
        });
    }

    if decision == StampDecision::Revision {
        return Ok(ApprovalStatus::Revision);
    }

    let stamp = stamps
        .iter_mut()
        .find(|s| s.level == level)
        .ok_or(EngineError::StampNotFound {
            transaction_id,
            level,
        })?;

    stamp.status = match decision {
        StampDecision::Approve => ApprovalStatus::Approve,
        StampDecision::Reject => ApprovalStatus::Reject,
        StampDecision::Revision => unreachable!(),
    };
    stamp.approver_id = Some(approver_id);
    stamp.reject_reason = reject_reason;
    stamp.stamped_at = Some(now);

    Ok(overall_status(stamps, max_level))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp(level: u32, status: ApprovalStatus) -> ApprovalStamp {
        ApprovalStamp {
            id: level as u64,
            transaction_id: 1,
            level,
            approver_id: None,
            status,
            reject_reason: None,
            stamped_at: None,
        }
    }

    fn level(n: u32) -> ApprovalLevel {
        ApprovalLevel {
            organization_id: 22,
            level: n,
            required_role: "supervisor".into(),
        }
    }

    #[test]
    fn waiting_while_any_level_undecided() {
        let stamps = vec![
            stamp(1, ApprovalStatus::Approve),
            stamp(2, ApprovalStatus::Waiting),
        ];
        assert_eq!(overall_status(&stamps, 2), ApprovalStatus::Waiting);
    }

    #[test]
    fn approve_only_when_every_level_approved() {
        let stamps = vec![
            stamp(1, ApprovalStatus::Approve),
            stamp(2, ApprovalStatus::Approve),
        ];
        assert_eq!(overall_status(&stamps, 2), ApprovalStatus::Approve);
    }

    #[test]
    fn single_reject_wins_regardless_of_higher_levels() {
        let stamps = vec![
            stamp(1, ApprovalStatus::Approve),
            stamp(2, ApprovalStatus::Reject),
            stamp(3, ApprovalStatus::Waiting),
        ];
        assert_eq!(overall_status(&stamps, 3), ApprovalStatus::Reject);
    }

    #[test]
    fn reject_at_level_one_short_circuits() {
        let stamps = vec![
            stamp(1, ApprovalStatus::Reject),
            stamp(2, ApprovalStatus::Waiting),
        ];
        assert_eq!(overall_status(&stamps, 2), ApprovalStatus::Reject);
    }

    #[test]
    fn missing_stamp_counts_as_waiting() {
        let stamps = vec![stamp(1, ApprovalStatus::Approve)];
        assert_eq!(overall_status(&stamps, 2), ApprovalStatus::Waiting);
    }

    #[test]
    fn contiguous_levels_validate() {
        let levels = vec![level(1), level(2), level(3)];
        assert_eq!(validate_levels(22, &levels).unwrap(), 3);
    }

    #[test]
    fn skipped_level_is_rejected() {
        let levels = vec![level(1), level(3)];
        assert!(matches!(
            validate_levels(22, &levels),
            Err(EngineError::BrokenApprovalChain { .. })
        ));
    }

    #[test]
    fn chain_must_start_at_one() {
        let levels = vec![level(2), level(3)];
        assert!(validate_levels(22, &levels).is_err());
    }

    #[test]
    fn empty_chain_is_invalid() {
        assert!(validate_levels(22, &[]).is_err());
    }

    #[test]
    fn duplicate_levels_are_invalid() {
        let levels = vec![level(1), level(1)];
        assert!(validate_levels(22, &levels).is_err());
    }

    fn now() -> chrono::NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn approving_the_last_level_closes_the_transaction() {
        let mut stamps = vec![
            stamp(1, ApprovalStatus::Approve),
            stamp(2, ApprovalStatus::Waiting),
        ];
        let status = apply_stamp(
            1,
            ApprovalStatus::Waiting,
            &mut stamps,
            2,
            2,
            77,
            StampDecision::Approve,
            None,
            now(),
        )
        .unwrap();
        assert_eq!(status, ApprovalStatus::Approve);
        assert_eq!(stamps[1].approver_id, Some(77));
        assert!(stamps[1].stamped_at.is_some());
    }

    #[test]
    fn serialized_stamps_converge_on_the_final_fold() {
        // two approvers in a row, each folding over the stamp set as it
        // stands after the previous write: the second must see the first
        // stamp and close the transaction
        let mut stamps = vec![
            stamp(1, ApprovalStatus::Waiting),
            stamp(2, ApprovalStatus::Waiting),
        ];
        let after_first = apply_stamp(
            1,
            ApprovalStatus::Waiting,
            &mut stamps,
            2,
            1,
            77,
            StampDecision::Approve,
            None,
            now(),
        )
        .unwrap();
        assert_eq!(after_first, ApprovalStatus::Waiting);

        let after_second = apply_stamp(
            1,
            after_first,
            &mut stamps,
            2,
            2,
            88,
            StampDecision::Approve,
            None,
            now(),
        )
        .unwrap();
        assert_eq!(after_second, ApprovalStatus::Approve);
        // the stored status equals the fold of the stored stamps
        assert_eq!(overall_status(&stamps, 2), after_second);
    }

    #[test]
    fn rejecting_leaves_higher_stamps_waiting() {
        let mut stamps = vec![
            stamp(1, ApprovalStatus::Waiting),
            stamp(2, ApprovalStatus::Waiting),
        ];
        let status = apply_stamp(
            1,
            ApprovalStatus::Waiting,
            &mut stamps,
            2,
            1,
            77,
            StampDecision::Reject,
            Some("incomplete".into()),
            now(),
        )
        .unwrap();
        assert_eq!(status, ApprovalStatus::Reject);
        assert_eq!(stamps[1].status, ApprovalStatus::Waiting);
        assert_eq!(stamps[0].reject_reason.as_deref(), Some("incomplete"));
    }

    #[test]
    fn terminal_transactions_cannot_be_stamped() {
        let mut stamps = vec![stamp(1, ApprovalStatus::Reject)];
        let err = apply_stamp(
            1,
            ApprovalStatus::Reject,
            &mut stamps,
            1,
            1,
            77,
            StampDecision::Approve,
            None,
            now(),
        );
        assert!(matches!(err, Err(EngineError::TransactionClosed { .. })));
    }

    #[test]
    fn revision_abandons_the_stamp_set() {
        let mut stamps = vec![
            stamp(1, ApprovalStatus::Approve),
            stamp(2, ApprovalStatus::Waiting),
        ];
        let status = apply_stamp(
            1,
            ApprovalStatus::Waiting,
            &mut stamps,
            2,
            2,
            77,
            StampDecision::Revision,
            None,
            now(),
        )
        .unwrap();
        assert_eq!(status, ApprovalStatus::Revision);
        // stamps untouched
        assert_eq!(stamps[0].status, ApprovalStatus::Approve);
        assert_eq!(stamps[1].status, ApprovalStatus::Waiting);
    }

    #[test]
    fn unknown_level_is_an_error() {
        let mut stamps = vec![stamp(1, ApprovalStatus::Waiting)];
        let err = apply_stamp(
            1,
            ApprovalStatus::Waiting,
            &mut stamps,
            2,
            5,
            77,
            StampDecision::Approve,
            None,
            now(),
        );
        assert!(matches!(err, Err(EngineError::StampNotFound { level: 5, .. })));
    }
}
