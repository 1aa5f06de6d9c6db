use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{EntryStatus, QueueEntry};

pub(crate) const DT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TIME_FORMAT: &str = "%H:%M";

pub(crate) fn fmt_dt(dt: &NaiveDateTime) -> String {
    dt.format(DT_FORMAT).to_string()
}

pub(crate) fn parse_dt(s: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(s, DT_FORMAT)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad datetime '{s}': {e}")))
}

fn parse_date(s: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad date '{s}': {e}")))
}

fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::from_str(s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

const ENTRY_COLUMNS: &str = "id, patient_id, scheduled_date, scheduled_time, is_walk_in, status, \
     ticket_number, queue_day, queue_position, check_in_at, start_at, end_at, \
     diagnosis_summary, notes, original_entry_id, created_at, updated_at";

/// Raw column values before parsing into the model.
struct RawEntry {
    id: String,
    patient_id: String,
    scheduled_date: String,
    scheduled_time: Option<String>,
    is_walk_in: bool,
    status: String,
    ticket_number: Option<i64>,
    queue_day: Option<String>,
    queue_position: Option<i64>,
    check_in_at: Option<String>,
    start_at: Option<String>,
    end_at: Option<String>,
    diagnosis_summary: Option<String>,
    notes: Option<String>,
    original_entry_id: Option<String>,
    created_at: String,
    updated_at: String,
}

fn read_raw(row: &Row<'_>) -> rusqlite::Result<RawEntry> {
    Ok(RawEntry {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        scheduled_date: row.get(2)?,
        scheduled_time: row.get(3)?,
        is_walk_in: row.get(4)?,
        status: row.get(5)?,
        ticket_number: row.get(6)?,
        queue_day: row.get(7)?,
        queue_position: row.get(8)?,
        check_in_at: row.get(9)?,
        start_at: row.get(10)?,
        end_at: row.get(11)?,
        diagnosis_summary: row.get(12)?,
        notes: row.get(13)?,
        original_entry_id: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

fn raw_to_entry(raw: RawEntry) -> Result<QueueEntry, DatabaseError> {
    Ok(QueueEntry {
        id: parse_uuid(&raw.id)?,
        patient_id: parse_uuid(&raw.patient_id)?,
        scheduled_date: parse_date(&raw.scheduled_date)?,
        scheduled_time: raw
            .scheduled_time
            .and_then(|t| NaiveTime::parse_from_str(&t, TIME_FORMAT).ok()),
        is_walk_in: raw.is_walk_in,
        status: EntryStatus::from_str(&raw.status)?,
        ticket_number: raw.ticket_number,
        queue_day: raw.queue_day.map(|d| parse_date(&d)).transpose()?,
        queue_position: raw.queue_position,
        check_in_at: raw.check_in_at.map(|t| parse_dt(&t)).transpose()?,
        start_at: raw.start_at.map(|t| parse_dt(&t)).transpose()?,
        end_at: raw.end_at.map(|t| parse_dt(&t)).transpose()?,
        diagnosis_summary: raw.diagnosis_summary,
        notes: raw.notes,
        original_entry_id: raw.original_entry_id.map(|s| parse_uuid(&s)).transpose()?,
        created_at: parse_dt(&raw.created_at)?,
        updated_at: parse_dt(&raw.updated_at)?,
    })
}

fn collect_entries<P: rusqlite::Params>(
    stmt: &mut rusqlite::Statement<'_>,
    params: P,
) -> Result<Vec<QueueEntry>, DatabaseError> {
    let rows = stmt.query_map(params, read_raw)?;
    let mut entries = Vec::new();
    for row in rows {
        entries.push(raw_to_entry(row?)?);
    }
    Ok(entries)
}

pub fn insert_entry(conn: &Connection, entry: &QueueEntry) -> Result<(), DatabaseError> {
    conn.execute(
        &format!("INSERT INTO queue_entries ({ENTRY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"),
        params![
            entry.id.to_string(),
            entry.patient_id.to_string(),
            entry.scheduled_date.to_string(),
            entry.scheduled_time.map(|t| t.format(TIME_FORMAT).to_string()),
            entry.is_walk_in,
            entry.status.as_str(),
            entry.ticket_number,
            entry.queue_day.map(|d| d.to_string()),
            entry.queue_position,
            entry.check_in_at.map(|t| fmt_dt(&t)),
            entry.start_at.map(|t| fmt_dt(&t)),
            entry.end_at.map(|t| fmt_dt(&t)),
            entry.diagnosis_summary,
            entry.notes,
            entry.original_entry_id.map(|id| id.to_string()),
            fmt_dt(&entry.created_at),
            fmt_dt(&entry.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_entry(conn: &Connection, id: &Uuid) -> Result<Option<QueueEntry>, DatabaseError> {
    let raw = conn
        .query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM queue_entries WHERE id = ?1"),
            params![id.to_string()],
            read_raw,
        )
        .optional()?;
    raw.map(raw_to_entry).transpose()
}

/// All entries belonging to a day, walk-ins and bookings alike. A checked-in
/// entry belongs to its assignment day; one never checked in belongs to its
/// scheduled date.
pub fn entries_for_day(conn: &Connection, day: NaiveDate) -> Result<Vec<QueueEntry>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM queue_entries
         WHERE COALESCE(queue_day, scheduled_date) = ?1
         ORDER BY created_at ASC"
    ))?;
    collect_entries(&mut stmt, params![day.to_string()])
}

/// Active (checked-in / in-progress) entries for a day in plain position
/// order. Used by reordering to preserve relative order of unlisted entries.
pub fn active_entries(conn: &Connection, day: NaiveDate) -> Result<Vec<QueueEntry>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM queue_entries
         WHERE queue_day = ?1 AND status IN ('checked_in', 'in_progress')
         ORDER BY queue_position ASC"
    ))?;
    collect_entries(&mut stmt, params![day.to_string()])
}

/// The waiting line as the front desk sees it: the in-consultation patient
/// first, then the waiting patients by position. Terminal entries with stale
/// positions never appear.
pub fn active_queue_ordered(
    conn: &Connection,
    day: NaiveDate,
) -> Result<Vec<QueueEntry>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM queue_entries
         WHERE queue_day = ?1 AND status IN ('checked_in', 'in_progress')
         ORDER BY CASE status WHEN 'in_progress' THEN 0 ELSE 1 END, queue_position ASC"
    ))?;
    collect_entries(&mut stmt, params![day.to_string()])
}

pub fn next_checked_in(
    conn: &Connection,
    day: NaiveDate,
) -> Result<Option<QueueEntry>, DatabaseError> {
    let raw = conn
        .query_row(
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM queue_entries
                 WHERE queue_day = ?1 AND status = 'checked_in'
                 ORDER BY queue_position ASC LIMIT 1"
            ),
            params![day.to_string()],
            read_raw,
        )
        .optional()?;
    raw.map(raw_to_entry).transpose()
}

// ─── Guarded transition writes ────────────────────────────────────────────────
//
// Every write carries a `WHERE status = <status read by the caller>` guard.
// Zero affected rows means the entry changed (or vanished) since the caller's
// read; the service maps that to a retryable conflict.

pub fn mark_checked_in(
    conn: &Connection,
    id: &Uuid,
    from: EntryStatus,
    ticket_number: i64,
    queue_day: NaiveDate,
    at: NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE queue_entries
         SET status = 'checked_in', ticket_number = ?1, queue_day = ?2,
             check_in_at = ?3, updated_at = ?3
         WHERE id = ?4 AND status = ?5",
        params![
            ticket_number,
            queue_day.to_string(),
            fmt_dt(&at),
            id.to_string(),
            from.as_str(),
        ],
    )?;
    Ok(changed == 1)
}

pub fn mark_started(
    conn: &Connection,
    id: &Uuid,
    from: EntryStatus,
    at: NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE queue_entries
         SET status = 'in_progress', start_at = ?1, updated_at = ?1
         WHERE id = ?2 AND status = ?3",
        params![fmt_dt(&at), id.to_string(), from.as_str()],
    )?;
    Ok(changed == 1)
}

pub fn mark_completed(
    conn: &Connection,
    id: &Uuid,
    from: EntryStatus,
    diagnosis_summary: Option<&str>,
    at: NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE queue_entries
         SET status = 'completed', end_at = ?1, updated_at = ?1,
             diagnosis_summary = COALESCE(?2, diagnosis_summary)
         WHERE id = ?3 AND status = ?4",
        params![fmt_dt(&at), diagnosis_summary, id.to_string(), from.as_str()],
    )?;
    Ok(changed == 1)
}

pub fn mark_cancelled(
    conn: &Connection,
    id: &Uuid,
    from: EntryStatus,
    notes: Option<&str>,
    at: NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE queue_entries
         SET status = 'cancelled', notes = ?1, updated_at = ?2
         WHERE id = ?3 AND status = ?4",
        params![notes, fmt_dt(&at), id.to_string(), from.as_str()],
    )?;
    Ok(changed == 1)
}

pub fn mark_no_show(
    conn: &Connection,
    id: &Uuid,
    from: EntryStatus,
    at: NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE queue_entries
         SET status = 'no_show', updated_at = ?1
         WHERE id = ?2 AND status = ?3",
        params![fmt_dt(&at), id.to_string(), from.as_str()],
    )?;
    Ok(changed == 1)
}

pub fn mark_rescheduled(
    conn: &Connection,
    id: &Uuid,
    from: EntryStatus,
    notes: Option<&str>,
    at: NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE queue_entries
         SET status = 'rescheduled', notes = ?1, updated_at = ?2
         WHERE id = ?3 AND status = ?4",
        params![notes, fmt_dt(&at), id.to_string(), from.as_str()],
    )?;
    Ok(changed == 1)
}

/// Administrative bulk reset: active entries of the day go back to
/// `Scheduled` with ticket, position and timestamps cleared.
pub fn reset_day_entries(
    conn: &Connection,
    day: NaiveDate,
    at: NaiveDateTime,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE queue_entries
         SET status = 'scheduled', ticket_number = NULL, queue_day = NULL,
             queue_position = NULL, check_in_at = NULL, start_at = NULL,
             end_at = NULL, updated_at = ?1
         WHERE queue_day = ?2 AND status IN ('checked_in', 'in_progress')",
        params![fmt_dt(&at), day.to_string()],
    )?;
    Ok(changed)
}

/// Days before `today` that still have entries sitting in the active
/// queue — the nightly reset missed them.
pub fn stale_active_days(
    conn: &Connection,
    today: NaiveDate,
) -> Result<Vec<NaiveDate>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT queue_day FROM queue_entries
         WHERE queue_day < ?1 AND status IN ('checked_in', 'in_progress')
         ORDER BY queue_day ASC",
    )?;
    let rows = stmt.query_map(params![today.to_string()], |row| row.get::<_, String>(0))?;
    let mut days = Vec::new();
    for row in rows {
        days.push(parse_date(&row?)?);
    }
    Ok(days)
}

/// Highest ticket still held by any entry assigned to `day`. Used by the
/// reset to re-seed the counter past retained tickets.
pub fn max_ticket_for_day(conn: &Connection, day: NaiveDate) -> Result<Option<i64>, DatabaseError> {
    let max: Option<i64> = conn.query_row(
        "SELECT MAX(ticket_number) FROM queue_entries WHERE queue_day = ?1",
        params![day.to_string()],
        |row| row.get(0),
    )?;
    Ok(max)
}

// ─── Daily statistics ─────────────────────────────────────────────────────────

pub fn count_for_day(
    conn: &Connection,
    day: NaiveDate,
    status: EntryStatus,
) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM queue_entries
         WHERE COALESCE(queue_day, scheduled_date) = ?1 AND status = ?2",
        params![day.to_string(), status.as_str()],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn walk_in_count(conn: &Connection, day: NaiveDate) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM queue_entries
         WHERE COALESCE(queue_day, scheduled_date) = ?1 AND is_walk_in = 1",
        params![day.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Mean consultation length over the day's completed entries, in whole
/// minutes. 0 when nothing completed yet.
pub fn avg_service_minutes(conn: &Connection, day: NaiveDate) -> Result<i64, DatabaseError> {
    let avg: Option<f64> = conn.query_row(
        "SELECT AVG((julianday(end_at) - julianday(start_at)) * 1440.0)
         FROM queue_entries
         WHERE COALESCE(queue_day, scheduled_date) = ?1
           AND status = 'completed' AND start_at IS NOT NULL AND end_at IS NOT NULL",
        params![day.to_string()],
        |row| row.get(0),
    )?;
    Ok(avg.map(|m| m.round() as i64).unwrap_or(0))
}
