use chrono::Utc;
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::db::DatabaseError;
use crate::models::*;

/// One row of the draft audit trail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftAuditEntry {
    pub intake_id: String,
    pub artifact_type: String,
    pub action: String,
    pub status: Option<String>,
    pub error: Option<String>,
    pub recorded_at: String,
}

pub(crate) fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Append an audit entry. Callers write it in the same transaction as the change it records.
pub fn insert_audit_entry(
    conn: &Connection,
    intake_id: &str,
    artifact_type: ArtifactType,
    action: &str,
    status: Option<DraftStatus>,
    error: Option<&str>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO draft_audit (intake_id, artifact_type, action, status, error, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            intake_id,
            artifact_type.as_str(),
            action,
            status.map(|s| s.as_str()),
            error,
            now_timestamp(),
        ],
    )?;
    Ok(())
}

/// Full audit history for an intake, oldest first.
pub fn list_audit_for_intake(
    conn: &Connection,
    intake_id: &str,
) -> Result<Vec<DraftAuditEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT intake_id, artifact_type, action, status, error, recorded_at
         FROM draft_audit WHERE intake_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt
        .query_map(params![intake_id], |row| {
            Ok(DraftAuditEntry {
                intake_id: row.get(0)?,
                artifact_type: row.get(1)?,
                action: row.get(2)?,
                status: row.get(3)?,
                error: row.get(4)?,
                recorded_at: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Prune audit entries older than the given number of days.
pub fn prune_draft_audit(conn: &Connection, retention_days: i64) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM draft_audit WHERE recorded_at < strftime('%Y-%m-%dT%H:%M:%SZ', 'now', ?1)",
        params![format!("-{retention_days} days")],
    )?;
    Ok(deleted)
}
