//! Nightly queue reset.
//!
//! The midnight reset is the hourly sweep's first firing after the day
//! boundary: every check looks for past days that still have active
//! entries and resets them. Re-running is a no-op, so a missed midnight
//! (service down, clock jump) is healed by the next hourly pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime};
use rusqlite::Connection;

use crate::db::repository;
use crate::state::AppState;

use super::{service, QueueError};

/// Check interval: every hour.
const CHECK_INTERVAL_SECS: u64 = 60 * 60;

/// Sleep granularity for shutdown responsiveness (5 seconds).
const SLEEP_GRANULARITY_SECS: u64 = 5;

/// Handle for the overnight reset thread.
///
/// Supports graceful shutdown via `shutdown()` or automatic cleanup on `Drop`.
pub struct OvernightResetHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl OvernightResetHandle {
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

impl Drop for OvernightResetHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

/// Start the overnight reset sweep on a separate thread. One sweep runs
/// immediately to catch a reset missed while the service was down.
pub fn start_overnight_reset(state: Arc<AppState>) -> OvernightResetHandle {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();

    let handle = std::thread::spawn(move || {
        tracing::info!("Overnight reset sweep started (check every {CHECK_INTERVAL_SECS}s)");
        run_sweep(&state);
        reset_loop(&state, &flag);
    });

    OvernightResetHandle {
        shutdown,
        handle: Some(handle),
    }
}

fn reset_loop(state: &AppState, shutdown: &AtomicBool) {
    loop {
        // Sleep in small increments for responsive shutdown
        for _ in 0..(CHECK_INTERVAL_SECS / SLEEP_GRANULARITY_SECS) {
            if shutdown.load(Ordering::Relaxed) {
                tracing::info!("Overnight reset sweep shutting down");
                return;
            }
            std::thread::sleep(Duration::from_secs(SLEEP_GRANULARITY_SECS));
        }
        run_sweep(state);
    }
}

fn run_sweep(state: &AppState) {
    let now = Local::now().naive_local();
    match state.open_db() {
        Ok(mut conn) => {
            if let Err(e) = sweep_stale_days(&mut conn, now.date(), now) {
                tracing::warn!("Overnight reset sweep failed: {e}");
            }
        }
        Err(e) => tracing::warn!("Overnight reset sweep could not open database: {e}"),
    }
}

/// Reset every day before `today` that still has active entries. Returns
/// the number of entries reset across all swept days.
pub fn sweep_stale_days(
    conn: &mut Connection,
    today: NaiveDate,
    now: NaiveDateTime,
) -> Result<usize, QueueError> {
    let stale = repository::stale_active_days(conn, today)?;
    let mut total = 0;
    for day in stale {
        let count = service::reset_day(conn, day, now)?;
        tracing::info!(%day, count, "reset stale queue day");
        total += count;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    use crate::db::sqlite::open_memory_database;
    use crate::models::{EntryStatus, Patient};
    use crate::queue::service;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn seed_patient(conn: &Connection) -> Uuid {
        let patient = Patient {
            id: Uuid::new_v4(),
            first_name: "Ana".into(),
            last_name: "Reyes".into(),
            date_of_birth: None,
            phone: None,
            email: None,
            created_at: dt("2026-03-01 08:00:00"),
        };
        repository::insert_patient(conn, &patient).unwrap();
        patient.id
    }

    #[test]
    fn sweep_resets_only_past_days() {
        let mut conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn);

        // Yesterday's leftovers and today's live queue.
        let stale = service::walk_in(&mut conn, &patient, dt("2026-03-01 17:00:00")).unwrap();
        let live = service::walk_in(&mut conn, &patient, dt("2026-03-02 08:30:00")).unwrap();

        let total = sweep_stale_days(&mut conn, d("2026-03-02"), dt("2026-03-02 01:00:00")).unwrap();
        assert_eq!(total, 1);

        let stale = repository::get_entry(&conn, &stale.id).unwrap().unwrap();
        assert_eq!(stale.status, EntryStatus::Scheduled);
        assert!(stale.ticket_number.is_none());

        let live = repository::get_entry(&conn, &live.id).unwrap().unwrap();
        assert_eq!(live.status, EntryStatus::CheckedIn);
        assert_eq!(live.ticket_number, Some(1));
    }

    #[test]
    fn sweep_is_idempotent() {
        let mut conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn);
        service::walk_in(&mut conn, &patient, dt("2026-03-01 17:00:00")).unwrap();

        assert_eq!(
            sweep_stale_days(&mut conn, d("2026-03-02"), dt("2026-03-02 01:00:00")).unwrap(),
            1
        );
        assert_eq!(
            sweep_stale_days(&mut conn, d("2026-03-02"), dt("2026-03-02 02:00:00")).unwrap(),
            0
        );
    }

    #[test]
    fn sweep_with_empty_database_does_nothing() {
        let mut conn = open_memory_database().unwrap();
        assert_eq!(
            sweep_stale_days(&mut conn, d("2026-03-02"), dt("2026-03-02 01:00:00")).unwrap(),
            0
        );
    }

    #[test]
    fn next_day_starts_at_one_after_sweep() {
        let mut conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn);
        for hour in 8..12 {
            service::walk_in(&mut conn, &patient, dt(&format!("2026-03-01 {hour:02}:00:00")))
                .unwrap();
        }
        sweep_stale_days(&mut conn, d("2026-03-02"), dt("2026-03-02 00:10:00")).unwrap();

        let first = service::walk_in(&mut conn, &patient, dt("2026-03-02 08:00:00")).unwrap();
        assert_eq!(first.ticket_number, Some(1));
    }
}
