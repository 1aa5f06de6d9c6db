//! Queue orchestration — what the HTTP handlers call.
//!
//! Composes the ticket allocator, the line ordering and the state machine.
//! Multi-step mutations (walk-in, check-in, reschedule, reset) run inside
//! one IMMEDIATE transaction: either the status change and all of its side
//! effects commit together, or none of them do. Single-status transitions
//! are a lone guarded UPDATE — atomic on its own.
//!
//! Every operation takes `now` from the caller; "today" is the local
//! calendar day of that instant.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{Connection, TransactionBehavior};
use uuid::Uuid;

use crate::db::repository;
use crate::models::{EntryStatus, QueueEntry, QueueStats};

use super::lifecycle::{self, QueueOp};
use super::{order, sequence, QueueError};

/// Create a walk-in entry: already arrived, so it is born checked-in with
/// a ticket and a place at the end of the line.
pub fn walk_in(
    conn: &mut Connection,
    patient_id: &Uuid,
    now: NaiveDateTime,
) -> Result<QueueEntry, QueueError> {
    let day = now.date();
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if !repository::patient_exists(&tx, patient_id)? {
        return Err(QueueError::not_found("Patient", patient_id));
    }

    let ticket = sequence::next_ticket(&tx, day)?;
    let entry = QueueEntry {
        id: Uuid::new_v4(),
        patient_id: *patient_id,
        scheduled_date: day,
        scheduled_time: None,
        is_walk_in: true,
        status: EntryStatus::CheckedIn,
        ticket_number: Some(ticket),
        queue_day: Some(day),
        queue_position: None,
        check_in_at: Some(now),
        start_at: None,
        end_at: None,
        diagnosis_summary: None,
        notes: None,
        original_entry_id: None,
        created_at: now,
        updated_at: now,
    };
    repository::insert_entry(&tx, &entry)?;
    order::append_to_end(&tx, &entry.id, day)?;

    let entry = require_entry(&tx, &entry.id)?;
    tx.commit()?;

    tracing::info!(entry_id = %entry.id, ticket, "walk-in checked in");
    Ok(entry)
}

/// Book a scheduled appointment. No slot-conflict check: the front desk
/// may double-book a time on purpose.
pub fn book(
    conn: &Connection,
    patient_id: &Uuid,
    date: NaiveDate,
    time: Option<NaiveTime>,
    now: NaiveDateTime,
) -> Result<QueueEntry, QueueError> {
    if !repository::patient_exists(conn, patient_id)? {
        return Err(QueueError::not_found("Patient", patient_id));
    }

    let entry = QueueEntry {
        id: Uuid::new_v4(),
        patient_id: *patient_id,
        scheduled_date: date,
        scheduled_time: time,
        is_walk_in: false,
        status: EntryStatus::Scheduled,
        ticket_number: None,
        queue_day: None,
        queue_position: None,
        check_in_at: None,
        start_at: None,
        end_at: None,
        diagnosis_summary: None,
        notes: None,
        original_entry_id: None,
        created_at: now,
        updated_at: now,
    };
    repository::insert_entry(conn, &entry)?;
    Ok(entry)
}

/// Check in a scheduled (or rescheduled) appointment. Allocates a ticket
/// and a line position for today unless the entry already holds today's.
pub fn check_in(
    conn: &mut Connection,
    entry_id: &Uuid,
    now: NaiveDateTime,
) -> Result<QueueEntry, QueueError> {
    let current = require_entry(conn, entry_id)?;
    lifecycle::next_status(current.status, QueueOp::CheckIn)?;

    let day = now.date();
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    // Allocate a ticket unless the entry already holds one for today.
    let ticket = match current.ticket_number {
        Some(t) if current.queue_day == Some(day) => t,
        _ => sequence::next_ticket(&tx, day)?,
    };

    if !repository::mark_checked_in(&tx, entry_id, current.status, ticket, day, now)? {
        return Err(concurrent_or_missing(&tx, entry_id)?);
    }
    order::append_to_end(&tx, entry_id, day)?;

    let entry = require_entry(&tx, entry_id)?;
    tx.commit()?;

    tracing::info!(entry_id = %entry.id, ticket, "checked in");
    Ok(entry)
}

/// Call the next patient into the consultation room.
pub fn start_consultation(
    conn: &Connection,
    entry_id: &Uuid,
    now: NaiveDateTime,
) -> Result<QueueEntry, QueueError> {
    let current = require_entry(conn, entry_id)?;
    lifecycle::next_status(current.status, QueueOp::Start)?;

    if !repository::mark_started(conn, entry_id, current.status, now)? {
        return Err(concurrent_or_missing(conn, entry_id)?);
    }
    require_entry(conn, entry_id)
}

/// Finish a consultation, optionally attaching the diagnosis summary.
/// The entry drops out of the active queue by virtue of its status.
pub fn complete(
    conn: &Connection,
    entry_id: &Uuid,
    diagnosis_summary: Option<&str>,
    now: NaiveDateTime,
) -> Result<QueueEntry, QueueError> {
    let current = require_entry(conn, entry_id)?;
    lifecycle::next_status(current.status, QueueOp::Complete)?;

    if !repository::mark_completed(conn, entry_id, current.status, diagnosis_summary, now)? {
        return Err(concurrent_or_missing(conn, entry_id)?);
    }
    require_entry(conn, entry_id)
}

/// Cancel from any non-terminal status; the reason lands in the notes.
pub fn cancel(
    conn: &Connection,
    entry_id: &Uuid,
    reason: Option<&str>,
    now: NaiveDateTime,
) -> Result<QueueEntry, QueueError> {
    let current = require_entry(conn, entry_id)?;
    lifecycle::next_status(current.status, QueueOp::Cancel)?;

    let notes = match reason {
        Some(r) => Some(append_note(current.notes.as_deref(), &format!("Cancelled: {r}"))),
        None => current.notes.clone(),
    };
    if !repository::mark_cancelled(conn, entry_id, current.status, notes.as_deref(), now)? {
        return Err(concurrent_or_missing(conn, entry_id)?);
    }
    require_entry(conn, entry_id)
}

pub fn mark_no_show(
    conn: &Connection,
    entry_id: &Uuid,
    now: NaiveDateTime,
) -> Result<QueueEntry, QueueError> {
    let current = require_entry(conn, entry_id)?;
    lifecycle::next_status(current.status, QueueOp::MarkNoShow)?;

    if !repository::mark_no_show(conn, entry_id, current.status, now)? {
        return Err(concurrent_or_missing(conn, entry_id)?);
    }
    require_entry(conn, entry_id)
}

/// Move an appointment to a new date. The original keeps its identity,
/// ticket and patient; it only gains the `Rescheduled` status and a note.
/// A fresh `Scheduled` entry is created for the new date, linked back via
/// `original_entry_id`. Both writes commit together.
pub fn reschedule(
    conn: &mut Connection,
    entry_id: &Uuid,
    new_date: NaiveDate,
    new_time: Option<NaiveTime>,
    reason: Option<&str>,
    now: NaiveDateTime,
) -> Result<(QueueEntry, QueueEntry), QueueError> {
    let current = require_entry(conn, entry_id)?;
    lifecycle::next_status(current.status, QueueOp::Reschedule)?;

    let note_line = match reason {
        Some(r) => format!("Rescheduled to {new_date}: {r}"),
        None => format!("Rescheduled to {new_date}"),
    };
    let notes = append_note(current.notes.as_deref(), &note_line);

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    if !repository::mark_rescheduled(&tx, entry_id, current.status, Some(&notes), now)? {
        return Err(concurrent_or_missing(&tx, entry_id)?);
    }

    let replacement = QueueEntry {
        id: Uuid::new_v4(),
        patient_id: current.patient_id,
        scheduled_date: new_date,
        scheduled_time: new_time,
        is_walk_in: current.is_walk_in,
        status: EntryStatus::Scheduled,
        ticket_number: None,
        queue_day: None,
        queue_position: None,
        check_in_at: None,
        start_at: None,
        end_at: None,
        diagnosis_summary: None,
        notes: current.notes.clone(),
        original_entry_id: Some(current.id),
        created_at: now,
        updated_at: now,
    };
    repository::insert_entry(&tx, &replacement)?;

    let original = require_entry(&tx, entry_id)?;
    tx.commit()?;

    tracing::info!(
        original = %original.id,
        replacement = %replacement.id,
        %new_date,
        "rescheduled"
    );
    Ok((original, replacement))
}

/// Daily dashboard numbers.
pub fn queue_stats(conn: &Connection, day: NaiveDate) -> Result<QueueStats, QueueError> {
    Ok(QueueStats {
        day,
        waiting: repository::count_for_day(conn, day, EntryStatus::CheckedIn)?,
        in_progress: repository::count_for_day(conn, day, EntryStatus::InProgress)?,
        completed: repository::count_for_day(conn, day, EntryStatus::Completed)?,
        cancelled: repository::count_for_day(conn, day, EntryStatus::Cancelled)?,
        no_show: repository::count_for_day(conn, day, EntryStatus::NoShow)?,
        walk_in_count: repository::walk_in_count(conn, day)?,
        avg_service_minutes: repository::avg_service_minutes(conn, day)?,
        next_ticket_number: sequence::peek_next(conn, day)?,
    })
}

/// Administrative bulk reset: the day's still-active entries return to
/// `Scheduled` with ticket, position and timestamps cleared, and the
/// day's counter restarts at 1. Idempotent — a repeat run resets nothing.
pub fn reset_day(
    conn: &mut Connection,
    day: NaiveDate,
    now: NaiveDateTime,
) -> Result<usize, QueueError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let count = repository::reset_day_entries(&tx, day, now)?;
    // Completed/cancelled entries keep their tickets; re-allocation must
    // continue above them. With none retained the day restarts at 1.
    match repository::max_ticket_for_day(&tx, day)? {
        Some(last) => sequence::reset_to(&tx, day, last)?,
        None => sequence::reset(&tx, day)?,
    }
    tx.commit()?;

    if count > 0 {
        tracing::info!(%day, count, "queue reset");
    }
    Ok(count)
}

fn require_entry(conn: &Connection, entry_id: &Uuid) -> Result<QueueEntry, QueueError> {
    repository::get_entry(conn, entry_id)?
        .ok_or_else(|| QueueError::not_found("QueueEntry", entry_id))
}

/// Distinguish "gone" from "changed under us" after a guarded write
/// touched zero rows.
fn concurrent_or_missing(conn: &Connection, entry_id: &Uuid) -> Result<QueueError, QueueError> {
    match repository::get_entry(conn, entry_id)? {
        Some(_) => Ok(QueueError::ConcurrentModification {
            id: entry_id.to_string(),
        }),
        None => Ok(QueueError::not_found("QueueEntry", entry_id)),
    }
}

fn append_note(existing: Option<&str>, line: &str) -> String {
    match existing {
        Some(n) if !n.is_empty() => format!("{n}\n{line}"),
        _ => line.to_string(),
    }
}
