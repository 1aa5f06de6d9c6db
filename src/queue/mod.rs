//! The walk-in / check-in queue engine.
//!
//! Everything with real state-management hazards lives here: per-day
//! ticket allocation (`sequence`), the single total order of the waiting
//! line (`order`), the appointment status state machine (`lifecycle`),
//! the orchestration the HTTP handlers call (`service`) and the nightly
//! reset sweep (`overnight`).
//!
//! Concurrency rules: ticket and position claims are single atomic store
//! operations; every transition plus its side effects commits in one
//! IMMEDIATE transaction or not at all; single-entry transitions carry an
//! optimistic status guard.

pub mod lifecycle;
pub mod order;
pub mod overnight;
pub mod sequence;
pub mod service;

use thiserror::Error;

use crate::db::DatabaseError;
use crate::models::EntryStatus;

/// Failures of queue operations, mapped onto HTTP statuses by the API layer.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    /// The requested transition is not legal from the entry's current status.
    #[error("invalid transition from {from} to {requested}")]
    InvalidTransition {
        from: EntryStatus,
        requested: EntryStatus,
    },

    /// The entry changed between the caller's read and the guarded write.
    /// Retryable: re-fetch and try again.
    #[error("entry {id} was modified concurrently")]
    ConcurrentModification { id: String },

    /// A reorder referenced entries that are not in the active queue.
    /// The whole call is a no-op.
    #[error("reorder references entries not in the active queue: {ids:?}")]
    InvalidQueueState { ids: Vec<String> },

    /// The counter store is unreachable. Callers must not fabricate a
    /// ticket number locally; safe to retry.
    #[error("ticket allocation unavailable: {0}")]
    AllocationUnavailable(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl QueueError {
    pub(crate) fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}

impl From<rusqlite::Error> for QueueError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(DatabaseError::Sqlite(err))
    }
}
