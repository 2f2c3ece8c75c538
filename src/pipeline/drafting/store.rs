//! Persistence seam for the drafting pipeline.
//!
//! The SQLite store runs every call on the blocking pool so a slow disk never
//! stalls the model calls running alongside it.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;

use super::DraftingError;
use crate::db::{self, DatabaseError, DraftAuditEntry};
use crate::models::{ArtifactType, Draft, IntakeRecord};

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Intake plus its patient, or `None` if the intake does not exist.
    async fn read_intake(&self, intake_id: &str) -> Result<Option<IntakeRecord>, DraftingError>;

    /// Insert or replace the draft for (intake, artifact type).
    async fn upsert_draft(&self, draft: &Draft) -> Result<(), DraftingError>;

    /// True only when both artifact types are stored for the intake.
    async fn drafts_exist(&self, intake_id: &str) -> Result<bool, DraftingError>;

    /// Remove every draft for the intake. Returns how many were removed.
    async fn delete_drafts(&self, intake_id: &str) -> Result<usize, DraftingError>;

    async fn get_draft(
        &self,
        intake_id: &str,
        artifact: ArtifactType,
    ) -> Result<Option<Draft>, DraftingError>;
}

/// [`RecordStore`] over a single shared SQLite connection.
#[derive(Clone)]
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Open (creating if needed) and migrate the database at `path`.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::new(db::open_database(path)?))
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::new(db::open_memory_database()?))
    }

    /// Audit history for an intake, oldest first.
    pub async fn audit_trail(&self, intake_id: &str) -> Result<Vec<DraftAuditEntry>, DraftingError> {
        let id = intake_id.to_string();
        self.with_conn(move |conn| db::list_audit_for_intake(conn, &id)).await
    }

    /// Delete audit entries older than `retention_days`. Returns the number removed.
    pub async fn prune_audit(&self, retention_days: i64) -> Result<usize, DraftingError> {
        self.with_conn(move |conn| db::prune_draft_audit(conn, retention_days)).await
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, DraftingError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, DatabaseError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| DraftingError::StoreTask("connection lock poisoned".into()))?;
            f(&guard).map_err(DraftingError::from)
        })
        .await
        .map_err(|e| DraftingError::StoreTask(e.to_string()))?
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn read_intake(&self, intake_id: &str) -> Result<Option<IntakeRecord>, DraftingError> {
        let id = intake_id.to_string();
        self.with_conn(move |conn| match db::get_intake_record(conn, &id) {
            Ok(record) => Ok(Some(record)),
            Err(DatabaseError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        })
        .await
    }

    async fn upsert_draft(&self, draft: &Draft) -> Result<(), DraftingError> {
        let draft = draft.clone();
        self.with_conn(move |conn| db::upsert_draft(conn, &draft)).await
    }

    async fn drafts_exist(&self, intake_id: &str) -> Result<bool, DraftingError> {
        let id = intake_id.to_string();
        self.with_conn(move |conn| db::drafts_exist(conn, &id)).await
    }

    async fn delete_drafts(&self, intake_id: &str) -> Result<usize, DraftingError> {
        let id = intake_id.to_string();
        self.with_conn(move |conn| db::delete_drafts(conn, &id)).await
    }

    async fn get_draft(
        &self,
        intake_id: &str,
        artifact: ArtifactType,
    ) -> Result<Option<Draft>, DraftingError> {
        let id = intake_id.to_string();
        self.with_conn(move |conn| db::get_draft(conn, &id, artifact)).await
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::testing::*;
    use super::*;
    use crate::models::DraftStatus;

    #[tokio::test]
    async fn missing_intake_reads_as_none() {
        let store = seeded_store(&[]);
        assert!(store.read_intake("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reads_intake_with_patient() {
        let store = seeded_store(&[intake(INTAKE_ID, "med_certs", standard_answers())]);
        let record = store.read_intake(INTAKE_ID).await.unwrap().unwrap();
        assert_eq!(record.intake.service.service_type, "med_certs");
        assert_eq!(record.patient.full_name, "Jordan Smith");
        assert_eq!(record.intake.answers.duration_days(), Some(2));
    }

    #[tokio::test]
    async fn draft_lifecycle_through_store() {
        let store = seeded_store(&[intake(INTAKE_ID, "med_certs", standard_answers())]);

        let note = Draft::new(INTAKE_ID, ArtifactType::ClinicalNote, DraftStatus::Ready, valid_note());
        store.upsert_draft(&note).await.unwrap();
        assert!(!store.drafts_exist(INTAKE_ID).await.unwrap());

        let cert = Draft::new(INTAKE_ID, ArtifactType::MedCert, DraftStatus::Failed, json!({}));
        store.upsert_draft(&cert).await.unwrap();
        assert!(store.drafts_exist(INTAKE_ID).await.unwrap());

        let stored = store
            .get_draft(INTAKE_ID, ArtifactType::ClinicalNote)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.content, valid_note());

        assert_eq!(store.delete_drafts(INTAKE_ID).await.unwrap(), 2);
        assert!(store
            .get_draft(INTAKE_ID, ArtifactType::MedCert)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn file_backed_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("drafts.db");

        {
            let store = SqliteRecordStore::open(&path).unwrap();
            let conn = store.conn.lock().unwrap();
            db::insert_patient(&conn, &patient()).unwrap();
            let i = intake(INTAKE_ID, "med_certs", standard_answers());
            db::insert_service(&conn, &i.service).unwrap();
            db::insert_intake(&conn, &i).unwrap();
        }

        let store = SqliteRecordStore::open(&path).unwrap();
        assert!(store.read_intake(INTAKE_ID).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn prune_audit_drops_only_expired_entries() {
        let store = seeded_store(&[intake(INTAKE_ID, "med_certs", standard_answers())]);
        let cert = Draft::new(INTAKE_ID, ArtifactType::MedCert, DraftStatus::Ready, valid_cert());
        store.upsert_draft(&cert).await.unwrap();
        assert_eq!(store.prune_audit(30).await.unwrap(), 0);

        store
            .conn
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO draft_audit (intake_id, artifact_type, action, status, recorded_at)
                 VALUES (?1, 'clinical_note', 'upsert', 'ready', '2020-01-01T00:00:00Z')",
                [INTAKE_ID],
            )
            .unwrap();
        assert_eq!(store.audit_trail(INTAKE_ID).await.unwrap().len(), 2);

        assert_eq!(store.prune_audit(30).await.unwrap(), 1);
        let trail = store.audit_trail(INTAKE_ID).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].artifact_type, "med_cert");
    }

    #[tokio::test]
    async fn upsert_for_unknown_intake_is_a_database_error() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let draft = Draft::new("ghost", ArtifactType::MedCert, DraftStatus::Failed, json!({}));
        let err = store.upsert_draft(&draft).await.unwrap_err();
        assert!(matches!(err, DraftingError::Database(_)));
    }
}
