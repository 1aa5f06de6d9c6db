//! Shared application state for the HTTP layer and background jobs.

use std::path::PathBuf;
use std::sync::Mutex;

use rusqlite::Connection;

use crate::db::{self, DatabaseError};
use crate::notify::Notifier;

/// Maximum audit buffer size before flush.
const AUDIT_BUFFER_CAPACITY: usize = 100;

/// Audit entries older than this are pruned at flush time.
const AUDIT_RETENTION_DAYS: i64 = 90;

/// Shared by all request handlers and the overnight reset job. Each
/// caller opens its own SQLite connection; cross-connection writer
/// contention is handled by the busy timeout.
pub struct AppState {
    pub db_path: PathBuf,
    audit: AuditLogger,
    notifier: Notifier,
}

impl AppState {
    pub fn new(db_path: PathBuf) -> Self {
        Self {
            db_path,
            audit: AuditLogger::new(),
            notifier: Notifier::new(),
        }
    }

    /// Open a database connection. Migrations already ran at startup, so
    /// this is cheap apart from the connection itself.
    pub fn open_db(&self) -> Result<Connection, DatabaseError> {
        db::open_database(&self.db_path)
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    // ── Audit logging ───────────────────────────────────────

    /// Record an audit event. Buffered; auto-flushes at capacity. A flush
    /// failure is logged and swallowed — audit must never fail the
    /// operation that produced the event.
    pub fn record_audit(
        &self,
        actor: &str,
        action: &str,
        resource_type: &str,
        resource_id: &str,
        status: &str,
    ) {
        let needs_flush = self
            .audit
            .log(actor, action, resource_type, resource_id, status);
        if needs_flush {
            if let Err(e) = self.flush_audit() {
                tracing::warn!("Audit auto-flush failed: {e}");
            }
        }
    }

    /// Flush the audit buffer to the database and prune old entries.
    pub fn flush_audit(&self) -> Result<usize, DatabaseError> {
        let conn = self.open_db()?;
        let flushed = self.audit.flush_to_db(&conn)?;
        if let Err(e) = db::repository::prune_audit_log(&conn, AUDIT_RETENTION_DAYS) {
            tracing::warn!("Failed to prune audit log: {e}");
        }
        Ok(flushed)
    }

    /// Current buffer contents (for testing).
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.entries()
    }
}

// ═══════════════════════════════════════════════════════════
// Audit logger
// ═══════════════════════════════════════════════════════════

/// A single audit log entry.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub actor: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub status: String,
}

/// In-memory audit buffer. Entries are flushed to SQLite when the buffer
/// reaches capacity or on explicit flush.
pub struct AuditLogger {
    buffer: Mutex<Vec<AuditEntry>>,
}

impl AuditLogger {
    pub fn new() -> Self {
        Self {
            buffer: Mutex::new(Vec::with_capacity(AUDIT_BUFFER_CAPACITY)),
        }
    }

    /// Log an event to the in-memory buffer.
    /// Returns `true` if the buffer has reached flush threshold.
    pub fn log(
        &self,
        actor: &str,
        action: &str,
        resource_type: &str,
        resource_id: &str,
        status: &str,
    ) -> bool {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.push(AuditEntry {
                timestamp: chrono::Utc::now(),
                actor: actor.to_string(),
                action: action.to_string(),
                resource_type: resource_type.to_string(),
                resource_id: resource_id.to_string(),
                status: status.to_string(),
            });
            buf.len() >= AUDIT_BUFFER_CAPACITY
        } else {
            false
        }
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.buffer
            .lock()
            .map(|buf| buf.clone())
            .unwrap_or_default()
    }

    /// Drain all buffered entries (for flush to SQLite).
    pub fn drain(&self) -> Vec<AuditEntry> {
        self.buffer
            .lock()
            .map(|mut buf| buf.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.lock().map(|buf| buf.len()).unwrap_or(0)
    }

    /// Flush buffered entries to SQLite.
    pub fn flush_to_db(&self, conn: &Connection) -> Result<usize, DatabaseError> {
        let entries = self.drain();
        if entries.is_empty() {
            return Ok(0);
        }

        let tuples: Vec<(String, String, String, String, String, String)> = entries
            .iter()
            .map(|e| {
                (
                    e.timestamp.to_rfc3339(),
                    e.actor.clone(),
                    e.action.clone(),
                    e.resource_type.clone(),
                    e.resource_id.clone(),
                    e.status.clone(),
                )
            })
            .collect();

        let count = tuples.len();
        db::repository::insert_audit_entries(conn, &tuples)?;

        tracing::debug!(count, "Flushed audit entries to database");
        Ok(count)
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}
