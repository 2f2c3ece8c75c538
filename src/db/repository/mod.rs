//! Repository layer: entity-scoped database operations.
//!
//! Intakes are read-only inputs; drafts are upserted per (intake, artifact type);
//! the audit trail is append-only.

mod audit;
mod draft;
mod intake;

pub use audit::*;
pub use draft::*;
pub use intake::*;

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rusqlite::Connection;
    use serde_json::json;

    use super::intake::parse_timestamp;
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::*;

    fn test_db() -> Connection {
        open_memory_database().expect("Failed to open in-memory DB")
    }

    fn seed_intake(conn: &Connection, intake_id: &str) {
        let _ = insert_service(
            conn,
            &Service {
                id: "svc-1".into(),
                name: "Medical certificate".into(),
                service_type: "med_certs".into(),
            },
        );
        let _ = insert_patient(
            conn,
            &Patient {
                id: "pat-1".into(),
                full_name: "Jordan Smith".into(),
                date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 12),
            },
        );
        insert_intake(
            conn,
            &Intake {
                id: intake_id.into(),
                service: Service {
                    id: "svc-1".into(),
                    name: "Medical certificate".into(),
                    service_type: "med_certs".into(),
                },
                patient_id: "pat-1".into(),
                answers: IntakeAnswers::from_value(json!({"certificateType": "work", "duration": "2"})),
                created_at: NaiveDate::from_ymd_opt(2026, 3, 10)
                    .unwrap()
                    .and_hms_opt(9, 30, 0)
                    .unwrap(),
            },
        )
        .unwrap();
    }

    fn ready_draft(intake_id: &str, artifact: ArtifactType) -> Draft {
        let mut draft = Draft::new(intake_id, artifact, DraftStatus::Ready, json!({"statement": "ok"}));
        draft.prompt_tokens = Some(100);
        draft.generation_duration_ms = 1234;
        draft.model_name = Some("medgemma:4b".into());
        draft
    }

    #[test]
    fn intake_record_round_trips() {
        let conn = test_db();
        seed_intake(&conn, "intake-1");

        let record = get_intake_record(&conn, "intake-1").unwrap();
        assert_eq!(record.intake.service.service_type, "med_certs");
        assert_eq!(record.patient.full_name, "Jordan Smith");
        assert_eq!(record.patient.date_of_birth, NaiveDate::from_ymd_opt(1990, 4, 12));
        assert_eq!(record.intake.request_date(), NaiveDate::from_ymd_opt(2026, 3, 10).unwrap());
        assert_eq!(record.intake.answers.duration_days(), Some(2));
    }

    #[test]
    fn missing_intake_is_not_found() {
        let conn = test_db();
        let err = get_intake_record(&conn, "nope").unwrap_err();
        assert!(matches!(err, crate::db::DatabaseError::NotFound { .. }));
    }

    #[test]
    fn upsert_overwrites_instead_of_appending() {
        let conn = test_db();
        seed_intake(&conn, "intake-1");

        upsert_draft(&conn, &ready_draft("intake-1", ArtifactType::MedCert)).unwrap();

        let mut failed = Draft::new("intake-1", ArtifactType::MedCert, DraftStatus::Failed, json!({"raw": "nope"}));
        failed.error = Some("Response is not valid JSON".into());
        failed.validation_errors = Some(vec!["expected value at line 1 column 1".into()]);
        upsert_draft(&conn, &failed).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM drafts WHERE intake_id = 'intake-1'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);

        let stored = get_draft(&conn, "intake-1", ArtifactType::MedCert).unwrap().unwrap();
        assert_eq!(stored, failed);
    }

    #[test]
    fn stored_draft_preserves_all_fields() {
        let conn = test_db();
        seed_intake(&conn, "intake-1");

        let mut draft = ready_draft("intake-1", ArtifactType::ClinicalNote);
        draft.corrections = Some(vec!["requiresReview forced to true".into()]);
        draft.completion_tokens = Some(42);
        upsert_draft(&conn, &draft).unwrap();

        let stored = get_draft(&conn, "intake-1", ArtifactType::ClinicalNote).unwrap().unwrap();
        assert_eq!(stored, draft);
        assert!(get_draft(&conn, "intake-1", ArtifactType::MedCert).unwrap().is_none());
    }

    #[test]
    fn drafts_exist_requires_both_types() {
        let conn = test_db();
        seed_intake(&conn, "intake-1");

        assert!(!drafts_exist(&conn, "intake-1").unwrap());
        upsert_draft(&conn, &ready_draft("intake-1", ArtifactType::ClinicalNote)).unwrap();
        assert!(!drafts_exist(&conn, "intake-1").unwrap(), "one type is a partial run");
        upsert_draft(&conn, &ready_draft("intake-1", ArtifactType::MedCert)).unwrap();
        assert!(drafts_exist(&conn, "intake-1").unwrap());
    }

    #[test]
    fn delete_removes_both_and_is_audited() {
        let conn = test_db();
        seed_intake(&conn, "intake-1");
        for artifact in ArtifactType::all() {
            upsert_draft(&conn, &ready_draft("intake-1", *artifact)).unwrap();
        }

        assert_eq!(delete_drafts(&conn, "intake-1").unwrap(), 2);
        assert!(get_draft(&conn, "intake-1", ArtifactType::ClinicalNote).unwrap().is_none());
        assert!(get_draft(&conn, "intake-1", ArtifactType::MedCert).unwrap().is_none());

        let audit = list_audit_for_intake(&conn, "intake-1").unwrap();
        let actions: Vec<&str> = audit.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, vec!["upsert", "upsert", "delete", "delete"]);
    }

    #[test]
    fn delete_with_nothing_stored_is_noop() {
        let conn = test_db();
        seed_intake(&conn, "intake-1");
        assert_eq!(delete_drafts(&conn, "intake-1").unwrap(), 0);
        assert!(list_audit_for_intake(&conn, "intake-1").unwrap().is_empty());
    }

    #[test]
    fn audit_records_status_and_error() {
        let conn = test_db();
        seed_intake(&conn, "intake-1");

        let mut failed = Draft::new("intake-1", ArtifactType::MedCert, DraftStatus::Failed, json!({}));
        failed.error = Some("Model call timed out after 120s".into());
        upsert_draft(&conn, &failed).unwrap();

        let audit = list_audit_for_intake(&conn, "intake-1").unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].artifact_type, "med_cert");
        assert_eq!(audit[0].status.as_deref(), Some("failed"));
        assert_eq!(audit[0].error.as_deref(), Some("Model call timed out after 120s"));
    }

    #[test]
    fn prune_keeps_recent_audit_entries() {
        let conn = test_db();
        seed_intake(&conn, "intake-1");
        upsert_draft(&conn, &ready_draft("intake-1", ArtifactType::MedCert)).unwrap();
        conn.execute(
            "INSERT INTO draft_audit (intake_id, artifact_type, action, status, recorded_at)
             VALUES ('intake-1', 'med_cert', 'upsert', 'ready', '2020-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

        assert_eq!(prune_draft_audit(&conn, 30).unwrap(), 1);
        assert_eq!(list_audit_for_intake(&conn, "intake-1").unwrap().len(), 1);
    }

    #[test]
    fn timestamps_parse_in_common_shapes() {
        assert!(parse_timestamp("2026-03-10 09:30:00").is_some());
        assert!(parse_timestamp("2026-03-10T09:30:00Z").is_some());
        assert!(parse_timestamp("2026-03-10T09:30:00.123Z").is_some());
        assert!(parse_timestamp("2026-03-10").is_some());
        assert!(parse_timestamp("last tuesday").is_none());
    }
}
