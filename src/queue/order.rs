//! Waiting-line ordering.
//!
//! Positions of active (checked-in / in-progress) entries form one
//! consistent total order per day. This module is the only writer of
//! `queue_position`; reads go through the repository.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, TransactionBehavior};
use uuid::Uuid;

use crate::db::repository;
use crate::db::repository::fmt_dt;
use crate::models::QueueEntry;

use super::QueueError;

/// Assign the entry the next free position at the end of the day's line:
/// `max(position among active entries) + 1`.
///
/// Must run inside the caller's IMMEDIATE transaction, together with the
/// status write that makes the entry active — the max-read and the claim
/// then commit as one serializable unit.
pub fn append_to_end(conn: &Connection, entry_id: &Uuid, day: NaiveDate) -> Result<i64, QueueError> {
    let next: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(queue_position), 0) + 1 FROM queue_entries
             WHERE queue_day = ?1 AND status IN ('checked_in', 'in_progress')",
            params![day.to_string()],
            |row| row.get(0),
        )
        .map_err(|e| QueueError::AllocationUnavailable(e.to_string()))?;

    let changed = conn
        .execute(
            "UPDATE queue_entries SET queue_position = ?1 WHERE id = ?2",
            params![next, entry_id.to_string()],
        )
        .map_err(|e| QueueError::AllocationUnavailable(e.to_string()))?;
    if changed == 0 {
        return Err(QueueError::not_found("QueueEntry", entry_id));
    }
    Ok(next)
}

/// Reassign positions so the given ids come first, in list order. Unlisted
/// active entries follow, keeping their previous relative order.
///
/// All-or-nothing: any listed id that is not currently active (or appears
/// twice) fails the whole call with `InvalidQueueState` and no positions
/// change. Returns the new ordered queue.
pub fn reorder(
    conn: &mut Connection,
    day: NaiveDate,
    ordered_ids: &[Uuid],
    now: NaiveDateTime,
) -> Result<Vec<QueueEntry>, QueueError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let active = repository::active_entries(&tx, day)?;
    let active_ids: Vec<Uuid> = active.iter().map(|e| e.id).collect();

    let mut seen = std::collections::HashSet::new();
    let bad: Vec<String> = ordered_ids
        .iter()
        .filter(|&id| !active_ids.contains(id) || !seen.insert(*id))
        .map(|id| id.to_string())
        .collect();
    if !bad.is_empty() {
        return Err(QueueError::InvalidQueueState { ids: bad });
    }

    // Clear first so the intermediate assignments cannot trip the
    // per-statement uniqueness index while positions are being swapped.
    tx.execute(
        "UPDATE queue_entries SET queue_position = NULL
         WHERE queue_day = ?1 AND status IN ('checked_in', 'in_progress')",
        params![day.to_string()],
    )?;

    let listed: Vec<Uuid> = ordered_ids.to_vec();
    let unlisted = active_ids.iter().filter(|&id| !listed.contains(id));

    for (i, id) in listed.iter().chain(unlisted).enumerate() {
        tx.execute(
            "UPDATE queue_entries SET queue_position = ?1, updated_at = ?2 WHERE id = ?3",
            params![(i + 1) as i64, fmt_dt(&now), id.to_string()],
        )?;
    }

    let queue = repository::active_queue_ordered(&tx, day)?;
    tx.commit()?;
    Ok(queue)
}

/// The checked-in entry with the lowest position, or `None` when nobody
/// is waiting. The in-consultation patient is not "in line".
pub fn next_in_line(conn: &Connection, day: NaiveDate) -> Result<Option<QueueEntry>, QueueError> {
    Ok(repository::next_checked_in(conn, day)?)
}

/// The day's queue as displayed: in-progress first, then waiting patients
/// by position. Entries in terminal states never appear, stale positions
/// or not.
pub fn today_queue(conn: &Connection, day: NaiveDate) -> Result<Vec<QueueEntry>, QueueError> {
    Ok(repository::active_queue_ordered(conn, day)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr as _;

    use crate::db::sqlite::open_memory_database;
    use crate::models::{EntryStatus, Patient, QueueEntry};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2026-03-02 09:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn seed_patient(conn: &Connection) -> Uuid {
        let patient = Patient {
            id: Uuid::new_v4(),
            first_name: "Marta".into(),
            last_name: "Silva".into(),
            date_of_birth: None,
            phone: None,
            email: None,
            created_at: now(),
        };
        repository::insert_patient(conn, &patient).unwrap();
        patient.id
    }

    fn seed_entry(
        conn: &Connection,
        patient_id: Uuid,
        status: EntryStatus,
        position: Option<i64>,
    ) -> Uuid {
        let entry = QueueEntry {
            id: Uuid::new_v4(),
            patient_id,
            scheduled_date: day(),
            scheduled_time: None,
            is_walk_in: true,
            status,
            ticket_number: position,
            queue_day: Some(day()),
            queue_position: position,
            check_in_at: Some(now()),
            start_at: None,
            end_at: None,
            diagnosis_summary: None,
            notes: None,
            original_entry_id: None,
            created_at: now(),
            updated_at: now(),
        };
        repository::insert_entry(conn, &entry).unwrap();
        entry.id
    }

    #[test]
    fn append_assigns_sequential_positions() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn);
        let a = seed_entry(&conn, patient, EntryStatus::CheckedIn, None);
        let b = seed_entry(&conn, patient, EntryStatus::CheckedIn, None);

        assert_eq!(append_to_end(&conn, &a, day()).unwrap(), 1);
        assert_eq!(append_to_end(&conn, &b, day()).unwrap(), 2);
    }

    #[test]
    fn append_unknown_entry_fails() {
        let conn = open_memory_database().unwrap();
        let err = append_to_end(&conn, &Uuid::new_v4(), day()).unwrap_err();
        assert!(matches!(err, QueueError::NotFound { .. }));
    }

    #[test]
    fn today_queue_puts_in_progress_first_and_drops_terminal() {
        // InProgress(pos=3), CheckedIn(1), CheckedIn(2), Completed(0, stale)
        // must read [InProgress(3), CheckedIn(1), CheckedIn(2)].
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn);
        let in_progress = seed_entry(&conn, patient, EntryStatus::InProgress, Some(3));
        let first = seed_entry(&conn, patient, EntryStatus::CheckedIn, Some(1));
        let second = seed_entry(&conn, patient, EntryStatus::CheckedIn, Some(2));
        seed_entry(&conn, patient, EntryStatus::Completed, Some(0));

        let queue = today_queue(&conn, day()).unwrap();
        let ids: Vec<Uuid> = queue.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![in_progress, first, second]);
    }

    #[test]
    fn next_in_line_skips_in_progress() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn);
        seed_entry(&conn, patient, EntryStatus::InProgress, Some(1));
        let waiting = seed_entry(&conn, patient, EntryStatus::CheckedIn, Some(2));

        let next = next_in_line(&conn, day()).unwrap().unwrap();
        assert_eq!(next.id, waiting);
    }

    #[test]
    fn next_in_line_empty_queue() {
        let conn = open_memory_database().unwrap();
        assert!(next_in_line(&conn, day()).unwrap().is_none());
    }

    #[test]
    fn reorder_moves_listed_entries_to_front() {
        let mut conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn);
        let a = seed_entry(&conn, patient, EntryStatus::CheckedIn, Some(1));
        let b = seed_entry(&conn, patient, EntryStatus::CheckedIn, Some(2));
        let c = seed_entry(&conn, patient, EntryStatus::CheckedIn, Some(3));

        let queue = reorder(&mut conn, day(), &[c, a], now()).unwrap();
        let ids: Vec<Uuid> = queue.iter().map(|e| e.id).collect();
        // Listed first in list order, unlisted (b) after, old order kept.
        assert_eq!(ids, vec![c, a, b]);
        let positions: Vec<Option<i64>> = queue.iter().map(|e| e.queue_position).collect();
        assert_eq!(positions, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn reorder_swap_of_adjacent_positions() {
        let mut conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn);
        let a = seed_entry(&conn, patient, EntryStatus::CheckedIn, Some(1));
        let b = seed_entry(&conn, patient, EntryStatus::CheckedIn, Some(2));

        let queue = reorder(&mut conn, day(), &[b, a], now()).unwrap();
        let ids: Vec<Uuid> = queue.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![b, a]);
    }

    #[test]
    fn reorder_with_inactive_id_changes_nothing() {
        let mut conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn);
        let a = seed_entry(&conn, patient, EntryStatus::CheckedIn, Some(1));
        let b = seed_entry(&conn, patient, EntryStatus::CheckedIn, Some(2));
        let done = seed_entry(&conn, patient, EntryStatus::Completed, Some(0));

        let before = repository::active_entries(&conn, day()).unwrap();
        let err = reorder(&mut conn, day(), &[b, done], now()).unwrap_err();
        assert!(matches!(err, QueueError::InvalidQueueState { .. }));

        // Full snapshot unchanged.
        let after = repository::active_entries(&conn, day()).unwrap();
        let before_pos: Vec<(Uuid, Option<i64>)> =
            before.iter().map(|e| (e.id, e.queue_position)).collect();
        let after_pos: Vec<(Uuid, Option<i64>)> =
            after.iter().map(|e| (e.id, e.queue_position)).collect();
        assert_eq!(before_pos, after_pos);
        assert_eq!(after_pos, vec![(a, Some(1)), (b, Some(2))]);
    }

    #[test]
    fn reorder_rejects_duplicate_ids() {
        let mut conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn);
        let a = seed_entry(&conn, patient, EntryStatus::CheckedIn, Some(1));
        seed_entry(&conn, patient, EntryStatus::CheckedIn, Some(2));

        let err = reorder(&mut conn, day(), &[a, a], now()).unwrap_err();
        assert!(matches!(err, QueueError::InvalidQueueState { .. }));
    }

    #[test]
    fn reorder_then_append_continues_after_new_tail() {
        let mut conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn);
        let a = seed_entry(&conn, patient, EntryStatus::CheckedIn, Some(1));
        let b = seed_entry(&conn, patient, EntryStatus::CheckedIn, Some(2));
        reorder(&mut conn, day(), &[b, a], now()).unwrap();

        let c = seed_entry(&conn, patient, EntryStatus::CheckedIn, None);
        assert_eq!(append_to_end(&conn, &c, day()).unwrap(), 3);
    }

    #[test]
    fn reorder_ignores_other_days() {
        let mut conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn);
        let a = seed_entry(&conn, patient, EntryStatus::CheckedIn, Some(1));

        let other_day = NaiveDate::from_str("2026-03-03").unwrap();
        let err = reorder(&mut conn, other_day, &[a], now()).unwrap_err();
        assert!(matches!(err, QueueError::InvalidQueueState { .. }));
    }
}
