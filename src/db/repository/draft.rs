use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::audit::{insert_audit_entry, now_timestamp};
use crate::db::DatabaseError;
use crate::models::*;

/// Insert or overwrite the draft for (intake, artifact type), recording the write in the audit trail.
pub fn upsert_draft(conn: &Connection, draft: &Draft) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    let now = now_timestamp();

    tx.execute(
        "INSERT INTO drafts (id, intake_id, artifact_type, status, content, error,
         validation_errors, ground_truth_errors, corrections, prompt_tokens, completion_tokens,
         generation_duration_ms, model_name, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)
         ON CONFLICT(intake_id, artifact_type) DO UPDATE SET
            status = excluded.status,
            content = excluded.content,
            error = excluded.error,
            validation_errors = excluded.validation_errors,
            ground_truth_errors = excluded.ground_truth_errors,
            corrections = excluded.corrections,
            prompt_tokens = excluded.prompt_tokens,
            completion_tokens = excluded.completion_tokens,
            generation_duration_ms = excluded.generation_duration_ms,
            model_name = excluded.model_name,
            updated_at = excluded.updated_at",
        params![
            Uuid::new_v4().to_string(),
            draft.intake_id,
            draft.artifact_type.as_str(),
            draft.status.as_str(),
            to_json("content", &draft.content)?,
            draft.error,
            optional_json("validation_errors", draft.validation_errors.as_ref())?,
            optional_json("ground_truth_errors", draft.ground_truth_errors.as_ref())?,
            optional_json("corrections", draft.corrections.as_ref())?,
            draft.prompt_tokens,
            draft.completion_tokens,
            draft.generation_duration_ms as i64,
            draft.model_name,
            now,
        ],
    )?;

    insert_audit_entry(
        &tx,
        &draft.intake_id,
        draft.artifact_type,
        "upsert",
        Some(draft.status),
        draft.error.as_deref(),
    )?;

    tx.commit()?;
    Ok(())
}

pub fn get_draft(
    conn: &Connection,
    intake_id: &str,
    artifact_type: ArtifactType,
) -> Result<Option<Draft>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT intake_id, artifact_type, status, content, error, validation_errors,
                    ground_truth_errors, corrections, prompt_tokens, completion_tokens,
                    generation_duration_ms, model_name
             FROM drafts WHERE intake_id = ?1 AND artifact_type = ?2",
            params![intake_id, artifact_type.as_str()],
            |row| {
                Ok(DraftRow {
                    intake_id: row.get(0)?,
                    artifact_type: row.get(1)?,
                    status: row.get(2)?,
                    content: row.get(3)?,
                    error: row.get(4)?,
                    validation_errors: row.get(5)?,
                    ground_truth_errors: row.get(6)?,
                    corrections: row.get(7)?,
                    prompt_tokens: row.get(8)?,
                    completion_tokens: row.get(9)?,
                    generation_duration_ms: row.get(10)?,
                    model_name: row.get(11)?,
                })
            },
        )
        .optional()?;

    row.map(draft_from_row).transpose()
}

/// True only when every artifact type has a stored draft for the intake.
pub fn drafts_exist(conn: &Connection, intake_id: &str) -> Result<bool, DatabaseError> {
    let present: i64 = conn.query_row(
        "SELECT COUNT(DISTINCT artifact_type) FROM drafts WHERE intake_id = ?1",
        params![intake_id],
        |row| row.get(0),
    )?;
    Ok(present as usize >= ArtifactType::all().len())
}

/// Remove all drafts for an intake in one transaction. Returns the number of rows deleted.
pub fn delete_drafts(conn: &Connection, intake_id: &str) -> Result<usize, DatabaseError> {
    let tx = conn.unchecked_transaction()?;

    let existing: Vec<String> = {
        let mut stmt = tx.prepare("SELECT artifact_type FROM drafts WHERE intake_id = ?1")?;
        let rows = stmt
            .query_map(params![intake_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };

    let deleted = tx.execute("DELETE FROM drafts WHERE intake_id = ?1", params![intake_id])?;

    for artifact in &existing {
        insert_audit_entry(&tx, intake_id, ArtifactType::from_str(artifact)?, "delete", None, None)?;
    }

    tx.commit()?;
    Ok(deleted)
}

// ═══════════════════════════════════════════
// Internal row mapping
// ═══════════════════════════════════════════

struct DraftRow {
    intake_id: String,
    artifact_type: String,
    status: String,
    content: String,
    error: Option<String>,
    validation_errors: Option<String>,
    ground_truth_errors: Option<String>,
    corrections: Option<String>,
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    generation_duration_ms: i64,
    model_name: Option<String>,
}

fn draft_from_row(row: DraftRow) -> Result<Draft, DatabaseError> {
    Ok(Draft {
        intake_id: row.intake_id,
        artifact_type: ArtifactType::from_str(&row.artifact_type)?,
        status: DraftStatus::from_str(&row.status)?,
        content: serde_json::from_str(&row.content).map_err(|e| DatabaseError::Json {
            field: "content".into(),
            reason: e.to_string(),
        })?,
        error: row.error,
        validation_errors: parse_optional_list("validation_errors", row.validation_errors)?,
        ground_truth_errors: parse_optional_list("ground_truth_errors", row.ground_truth_errors)?,
        corrections: parse_optional_list("corrections", row.corrections)?,
        prompt_tokens: row.prompt_tokens,
        completion_tokens: row.completion_tokens,
        generation_duration_ms: row.generation_duration_ms.max(0) as u64,
        model_name: row.model_name,
    })
}

fn to_json<T: serde::Serialize>(field: &str, value: &T) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::Json {
        field: field.into(),
        reason: e.to_string(),
    })
}

fn optional_json(field: &str, value: Option<&Vec<String>>) -> Result<Option<String>, DatabaseError> {
    value.map(|v| to_json(field, v)).transpose()
}

fn parse_optional_list(field: &str, raw: Option<String>) -> Result<Option<Vec<String>>, DatabaseError> {
    raw.map(|s| {
        serde_json::from_str(&s).map_err(|e| DatabaseError::Json {
            field: field.into(),
            reason: e.to_string(),
        })
    })
    .transpose()
}
