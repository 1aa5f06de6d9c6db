use std::path::Path;

use rusqlite::Connection;
use tracing;

use super::DatabaseError;

/// Open a SQLite connection to the given path and run migrations
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    // busy_timeout: every front-desk terminal opens its own connection, so
    // writers must wait out the single-writer lock instead of failing.
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA foreign_keys=ON;
         PRAGMA busy_timeout=5000;",
    )?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![
        (1, include_str!("../../resources/migrations/001_initial.sql")),
        (2, include_str!("../../resources/migrations/002_audit_log.sql")),
    ];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql).map_err(|e| DatabaseError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get::<_, i64>(0),
    )
    .unwrap_or(0)
}

/// Count tables in the database (for verification)
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_initializes_all_tables() {
        let conn = open_memory_database().unwrap();
        // patients + queue_entries + ticket_counters + audit_log + schema_version
        let count = count_tables(&conn).unwrap();
        assert!(count >= 5, "Expected at least 5 tables, got {count}");
    }

    #[test]
    fn schema_version_is_current() {
        let conn = open_memory_database().unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 2);
    }

    #[test]
    fn migration_idempotent() {
        let conn = open_memory_database().unwrap();
        // Run migrations again — should not error
        let result = run_migrations(&conn);
        assert!(result.is_ok());
    }

    #[test]
    fn foreign_keys_enabled() {
        let conn = open_memory_database().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn ticket_position_unique_index_ignores_inactive_rows() {
        let conn = open_memory_database().unwrap();
        conn.execute(
            "INSERT INTO patients (id, first_name, last_name, created_at)
             VALUES ('p1', 'Ana', 'Reyes', '2026-03-01 08:00:00')",
            [],
        )
        .unwrap();
        // Two completed rows may share a stale position; two active rows may not.
        conn.execute(
            "INSERT INTO queue_entries (id, patient_id, scheduled_date, status, queue_day, queue_position, created_at, updated_at)
             VALUES ('e1', 'p1', '2026-03-01', 'completed', '2026-03-01', 1, '2026-03-01 08:00:00', '2026-03-01 08:00:00')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO queue_entries (id, patient_id, scheduled_date, status, queue_day, queue_position, created_at, updated_at)
             VALUES ('e2', 'p1', '2026-03-01', 'cancelled', '2026-03-01', 1, '2026-03-01 08:00:00', '2026-03-01 08:00:00')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO queue_entries (id, patient_id, scheduled_date, status, queue_day, queue_position, created_at, updated_at)
             VALUES ('e3', 'p1', '2026-03-01', 'checked_in', '2026-03-01', 1, '2026-03-01 08:00:00', '2026-03-01 08:00:00')",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO queue_entries (id, patient_id, scheduled_date, status, queue_day, queue_position, created_at, updated_at)
             VALUES ('e4', 'p1', '2026-03-01', 'checked_in', '2026-03-01', 1, '2026-03-01 08:00:00', '2026-03-01 08:00:00')",
            [],
        );
        assert!(dup.is_err(), "duplicate active position must be rejected");
    }
}
