//! Per-day ticket number allocation.
//!
//! Tickets restart at 1 every local-midnight boundary and increase
//! monotonically within the day. The claim is a single
//! `INSERT .. ON CONFLICT .. RETURNING` against the counter row, so two
//! concurrent check-ins can never observe the same value — there is no
//! separate read-the-max step to race against.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use super::QueueError;

/// Claim the next ticket number for `day`: 1 for the first caller,
/// previous + 1 after that.
pub fn next_ticket(conn: &Connection, day: NaiveDate) -> Result<i64, QueueError> {
    conn.query_row(
        "INSERT INTO ticket_counters (day, last_ticket) VALUES (?1, 1)
         ON CONFLICT(day) DO UPDATE SET last_ticket = last_ticket + 1
         RETURNING last_ticket",
        params![day.to_string()],
        |row| row.get(0),
    )
    .map_err(|e| QueueError::AllocationUnavailable(e.to_string()))
}

/// Peek at the value the next claim would return, without claiming it.
/// Dashboard display only — never hand this out as a ticket.
pub fn peek_next(conn: &Connection, day: NaiveDate) -> Result<i64, QueueError> {
    let last: Option<i64> = conn
        .query_row(
            "SELECT last_ticket FROM ticket_counters WHERE day = ?1",
            params![day.to_string()],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| QueueError::AllocationUnavailable(e.to_string()))?;
    Ok(last.unwrap_or(0) + 1)
}

/// Drop the counter row for `day` so its sequence restarts at 1.
/// Part of the reset; only safe when no entry of that day still holds a
/// ticket, otherwise re-allocation would collide with a retained number.
pub fn reset(conn: &Connection, day: NaiveDate) -> Result<(), QueueError> {
    conn.execute(
        "DELETE FROM ticket_counters WHERE day = ?1",
        params![day.to_string()],
    )
    .map_err(|e| QueueError::AllocationUnavailable(e.to_string()))?;
    Ok(())
}

/// Re-seed the counter at `last` so the next claim is `last + 1`. Used by
/// the reset when completed or cancelled entries of the day retain their
/// tickets.
pub fn reset_to(conn: &Connection, day: NaiveDate, last: i64) -> Result<(), QueueError> {
    conn.execute(
        "INSERT INTO ticket_counters (day, last_ticket) VALUES (?1, ?2)
         ON CONFLICT(day) DO UPDATE SET last_ticket = ?2",
        params![day.to_string(), last],
    )
    .map_err(|e| QueueError::AllocationUnavailable(e.to_string()))?;
    Ok(())
}
