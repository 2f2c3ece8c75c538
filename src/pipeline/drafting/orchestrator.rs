use std::sync::Arc;

use tracing::Instrument;

use super::artifact::{ArtifactPipeline, ClinicalNoteArtifact, MedCertArtifact};
use super::context::format_context;
use super::guard::{IdempotencyGuard, IntakeLocks};
use super::store::RecordStore;
use super::types::{GenerationOutcome, LlmClient};
use super::validation::GroundTruth;
use super::DraftingError;
use crate::config::DraftConfig;

pub const INTAKE_NOT_FOUND: &str = "Intake not found";

/// Entry point for draft generation.
///
/// Safe to share across tasks: concurrent calls for the same intake are serialized,
/// calls for different intakes run independently.
pub struct DraftOrchestrator {
    store: Arc<dyn RecordStore>,
    llm: Arc<dyn LlmClient>,
    config: DraftConfig,
    locks: IntakeLocks,
}

impl DraftOrchestrator {
    pub fn new(store: Arc<dyn RecordStore>, llm: Arc<dyn LlmClient>, config: DraftConfig) -> Self {
        Self {
            store,
            llm,
            config,
            locks: IntakeLocks::new(),
        }
    }

    pub fn config(&self) -> &DraftConfig {
        &self.config
    }

    /// Generate both drafts for an intake.
    ///
    /// Skips when a complete pair already exists (unless `force`) or the intake's
    /// service is not eligible. Never returns an error: whole-call failures come back
    /// as `success: false`, per-artifact failures as a failed artifact status.
    pub async fn generate_drafts(&self, intake_id: &str, force: bool) -> GenerationOutcome {
        let span = tracing::info_span!("generate_drafts", intake_id, force);
        async move {
            match self.generate_locked(intake_id, force).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(error = %e, "Draft generation aborted");
                    GenerationOutcome::failed(e.to_string())
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn generate_locked(
        &self,
        intake_id: &str,
        force: bool,
    ) -> Result<GenerationOutcome, DraftingError> {
        let _held = self.locks.acquire(intake_id).await;
        let guard = IdempotencyGuard::new(self.store.as_ref());

        if force {
            guard.delete_drafts(intake_id).await?;
        } else if guard.drafts_exist(intake_id).await? {
            tracing::info!("Drafts already exist, skipping");
            return Ok(GenerationOutcome::skipped());
        }

        let Some(record) = self.store.read_intake(intake_id).await? else {
            tracing::warn!("Intake not found");
            return Ok(GenerationOutcome::failed(INTAKE_NOT_FOUND));
        };

        let service_type = record.intake.service.service_type.as_str();
        if service_type != self.config.eligible_service_type {
            tracing::info!(service_type, "Service type not eligible for drafting, skipping");
            return Ok(GenerationOutcome::skipped());
        }

        let context = format_context(&record.intake, &record.patient, &record.intake.answers);
        let truth = GroundTruth::new(
            &record.intake,
            &record.patient,
            self.config.review_threshold_days,
        );
        let pipeline = ArtifactPipeline {
            llm: self.llm.as_ref(),
            store: self.store.as_ref(),
            model_name: &self.config.model_name,
            timeout: self.config.model_timeout(),
        };

        tracing::info!(model = %self.config.model_name, "Generating drafts");
        let (clinical_note, med_cert) = tokio::join!(
            pipeline.run::<ClinicalNoteArtifact>(intake_id, &context, &truth),
            pipeline.run::<MedCertArtifact>(intake_id, &context, &truth),
        );

        tracing::info!(
            clinical_note = %clinical_note.status,
            med_cert = %med_cert.status,
            "Draft generation complete"
        );
        Ok(GenerationOutcome::generated(clinical_note, med_cert))
    }
}
