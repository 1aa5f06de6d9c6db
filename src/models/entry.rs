use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::EntryStatus;

/// A single appointment / queue entry.
///
/// Walk-ins and scheduled bookings are the same entity: a walk-in is
/// created already checked in, a booking starts out `Scheduled`. Only the
/// lifecycle engine mutates `status`, `ticket_number` and `queue_position`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: Option<NaiveTime>,
    pub is_walk_in: bool,
    pub status: EntryStatus,
    /// Daily sequential ticket. Assigned once at check-in, never changed.
    pub ticket_number: Option<i64>,
    /// The day `ticket_number` and `queue_position` were assigned for.
    pub queue_day: Option<NaiveDate>,
    pub queue_position: Option<i64>,
    pub check_in_at: Option<NaiveDateTime>,
    pub start_at: Option<NaiveDateTime>,
    pub end_at: Option<NaiveDateTime>,
    pub diagnosis_summary: Option<String>,
    pub notes: Option<String>,
    /// Back-reference set on the replacement entry created by a reschedule.
    pub original_entry_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Daily queue statistics for the front desk dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub day: NaiveDate,
    pub waiting: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub no_show: i64,
    pub walk_in_count: i64,
    pub avg_service_minutes: i64,
    pub next_ticket_number: i64,
}
