//! The appointment status state machine.
//!
//! One explicit table: (current status × operation) → next status or
//! `InvalidTransition`. Side effects — timestamps, ticket/position
//! allocation, replacement-entry creation — are applied by the service in
//! the same transaction as the status write, never here.

use crate::models::EntryStatus;

use super::QueueError;

/// The operations a front-desk terminal can request on an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOp {
    CheckIn,
    Start,
    Complete,
    Cancel,
    MarkNoShow,
    Reschedule,
}

impl QueueOp {
    /// The status this operation moves an entry into.
    pub fn target(&self) -> EntryStatus {
        match self {
            Self::CheckIn => EntryStatus::CheckedIn,
            Self::Start => EntryStatus::InProgress,
            Self::Complete => EntryStatus::Completed,
            Self::Cancel => EntryStatus::Cancelled,
            Self::MarkNoShow => EntryStatus::NoShow,
            Self::Reschedule => EntryStatus::Rescheduled,
        }
    }

    /// The statuses this operation is legal from.
    fn valid_from(&self, current: EntryStatus) -> bool {
        use EntryStatus::*;
        match self {
            Self::CheckIn => matches!(current, Scheduled | Rescheduled),
            Self::Start => matches!(current, CheckedIn),
            Self::Complete => matches!(current, InProgress),
            Self::Cancel => !current.is_terminal(),
            Self::MarkNoShow => matches!(current, Scheduled | Rescheduled),
            Self::Reschedule => !current.is_terminal(),
        }
    }

    pub const ALL: [QueueOp; 6] = [
        Self::CheckIn,
        Self::Start,
        Self::Complete,
        Self::Cancel,
        Self::MarkNoShow,
        Self::Reschedule,
    ];
}

impl std::fmt::Display for QueueOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CheckIn => "check_in",
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
            Self::MarkNoShow => "mark_no_show",
            Self::Reschedule => "reschedule",
        };
        f.write_str(s)
    }
}

/// Resolve the transition table. Terminal statuses are absorbing: every
/// operation on them fails, naming both the current and requested status.
pub fn next_status(current: EntryStatus, op: QueueOp) -> Result<EntryStatus, QueueError> {
    if op.valid_from(current) {
        Ok(op.target())
    } else {
        Err(QueueError::InvalidTransition {
            from: current,
            requested: op.target(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EntryStatus::*;

    /// The full (operation × status) matrix from the transition table.
    #[test]
    fn transition_matrix() {
        let allowed: &[(QueueOp, &[EntryStatus])] = &[
            (QueueOp::CheckIn, &[Scheduled, Rescheduled]),
            (QueueOp::Start, &[CheckedIn]),
            (QueueOp::Complete, &[InProgress]),
            (QueueOp::Cancel, &[Scheduled, CheckedIn, InProgress]),
            (QueueOp::MarkNoShow, &[Scheduled, Rescheduled]),
            (QueueOp::Reschedule, &[Scheduled, CheckedIn, InProgress]),
        ];

        for (op, valid) in allowed {
            for status in EntryStatus::ALL {
                let result = next_status(status, *op);
                if valid.contains(&status) {
                    assert_eq!(
                        result.unwrap(),
                        op.target(),
                        "{op} from {status} should succeed"
                    );
                } else {
                    match result {
                        Err(QueueError::InvalidTransition { from, requested }) => {
                            assert_eq!(from, status);
                            assert_eq!(requested, op.target());
                        }
                        other => panic!("{op} from {status} should fail, got {other:?}"),
                    }
                }
            }
        }
    }

    #[test]
    fn completed_cancelled_no_show_are_absorbing() {
        for terminal in [Completed, Cancelled, NoShow] {
            for op in QueueOp::ALL {
                assert!(
                    next_status(terminal, op).is_err(),
                    "{op} must be rejected from terminal {terminal}"
                );
            }
        }
    }

    #[test]
    fn rescheduled_allows_only_check_in_and_no_show() {
        // A rescheduled original can still be checked in or no-showed if
        // the patient turns up for the old slot anyway, but it can no
        // longer be cancelled, started, completed or rescheduled again.
        assert!(next_status(Rescheduled, QueueOp::CheckIn).is_ok());
        assert!(next_status(Rescheduled, QueueOp::MarkNoShow).is_ok());
        assert!(next_status(Rescheduled, QueueOp::Cancel).is_err());
        assert!(next_status(Rescheduled, QueueOp::Start).is_err());
        assert!(next_status(Rescheduled, QueueOp::Complete).is_err());
        assert!(next_status(Rescheduled, QueueOp::Reschedule).is_err());
    }

    #[test]
    fn error_names_both_states() {
        let err = next_status(Completed, QueueOp::Start).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("completed"), "message should name current state: {msg}");
        assert!(msg.contains("in_progress"), "message should name requested state: {msg}");
    }
}
