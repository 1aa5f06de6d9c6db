use rusqlite::{params, Connection};

use crate::db::DatabaseError;

/// Insert a batch of audit entries into the audit_log table.
pub fn insert_audit_entries(
    conn: &Connection,
    entries: &[(String, String, String, String, String, String)], // (timestamp, actor, action, resource_type, resource_id, status)
) -> Result<(), DatabaseError> {
    let mut stmt = conn.prepare(
        "INSERT INTO audit_log (timestamp, actor, action, resource_type, resource_id, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for (timestamp, actor, action, resource_type, resource_id, status) in entries {
        stmt.execute(params![timestamp, actor, action, resource_type, resource_id, status])?;
    }
    Ok(())
}

/// Prune audit entries older than the given number of days.
pub fn prune_audit_log(conn: &Connection, retention_days: i64) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM audit_log WHERE timestamp < datetime('now', ?1)",
        params![format!("-{retention_days} days")],
    )?;
    Ok(deleted)
}

/// Query audit entries touching a specific resource, newest first.
/// Returns (timestamp, actor, action, status) tuples.
pub fn query_audit_by_resource(
    conn: &Connection,
    resource_type: &str,
    resource_id: &str,
) -> Result<Vec<(String, String, String, String)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT timestamp, actor, action, status FROM audit_log
         WHERE resource_type = ?1 AND resource_id = ?2
         ORDER BY timestamp DESC",
    )?;
    let rows = stmt
        .query_map(params![resource_type, resource_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
