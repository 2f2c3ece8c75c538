//! One artifact's trip through the pipeline:
//! model call → usage → strict parse → ground truth → upsert.
//!
//! Every path ends in a stored draft. Failures are recorded on the draft, never raised.

use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use super::parser::{parse_clinical_note, parse_med_cert, ParseFailure};
use super::prompt::{
    build_clinical_note_prompt, build_med_cert_prompt, CLINICAL_NOTE_SYSTEM_PROMPT,
    MED_CERT_SYSTEM_PROMPT,
};
use super::store::RecordStore;
use super::types::{ArtifactOutcome, ClinicalNote, LlmClient, MedCertDraft};
use super::validation::{validate_clinical_note, validate_med_cert, GroundTruth, GroundTruthReport};
use super::DraftingError;
use crate::models::{ArtifactType, Draft, DraftStatus, Patient, TokenUsage};

pub const GROUND_TRUTH_FAILED: &str = "Ground-truth validation failed";

/// Per-artifact behaviour plugged into [`ArtifactPipeline::run`].
pub trait DraftArtifact {
    type Content: Serialize + DeserializeOwned + Send;

    const ARTIFACT: ArtifactType;
    const SYSTEM_PROMPT: &'static str;

    fn build_prompt(context: &str, patient: &Patient) -> String;
    fn parse(text: &str) -> Result<Self::Content, ParseFailure>;
    fn validate(content: Self::Content, truth: &GroundTruth<'_>) -> GroundTruthReport<Self::Content>;
}

pub struct ClinicalNoteArtifact;

impl DraftArtifact for ClinicalNoteArtifact {
    type Content = ClinicalNote;

    const ARTIFACT: ArtifactType = ArtifactType::ClinicalNote;
    const SYSTEM_PROMPT: &'static str = CLINICAL_NOTE_SYSTEM_PROMPT;

    fn build_prompt(context: &str, patient: &Patient) -> String {
        build_clinical_note_prompt(context, patient)
    }

    fn parse(text: &str) -> Result<ClinicalNote, ParseFailure> {
        parse_clinical_note(text)
    }

    fn validate(content: ClinicalNote, truth: &GroundTruth<'_>) -> GroundTruthReport<ClinicalNote> {
        validate_clinical_note(content, truth)
    }
}

pub struct MedCertArtifact;

impl DraftArtifact for MedCertArtifact {
    type Content = MedCertDraft;

    const ARTIFACT: ArtifactType = ArtifactType::MedCert;
    const SYSTEM_PROMPT: &'static str = MED_CERT_SYSTEM_PROMPT;

    fn build_prompt(context: &str, patient: &Patient) -> String {
        build_med_cert_prompt(context, patient)
    }

    fn parse(text: &str) -> Result<MedCertDraft, ParseFailure> {
        parse_med_cert(text)
    }

    fn validate(content: MedCertDraft, truth: &GroundTruth<'_>) -> GroundTruthReport<MedCertDraft> {
        validate_med_cert(content, truth)
    }
}

/// Shared collaborators for generating a single artifact.
pub struct ArtifactPipeline<'a> {
    pub llm: &'a dyn LlmClient,
    pub store: &'a dyn RecordStore,
    pub model_name: &'a str,
    pub timeout: Duration,
}

impl ArtifactPipeline<'_> {
    /// Generate, validate and store one artifact. Always yields a status.
    pub async fn run<A: DraftArtifact>(
        &self,
        intake_id: &str,
        context: &str,
        truth: &GroundTruth<'_>,
    ) -> ArtifactOutcome {
        let artifact = A::ARTIFACT;
        let started = Instant::now();

        let mut draft = match self.generate::<A>(intake_id, context, truth).await {
            Ok(draft) => draft,
            Err(e) => {
                tracing::warn!(intake_id, artifact = %artifact, error = %e, "Draft generation failed");
                let mut draft = Draft::new(intake_id, artifact, DraftStatus::Failed, json!({}));
                draft.error = Some(e.to_string());
                draft
            }
        };
        draft.generation_duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        draft.model_name = Some(self.model_name.to_string());

        self.persist(draft).await
    }

    async fn generate<A: DraftArtifact>(
        &self,
        intake_id: &str,
        context: &str,
        truth: &GroundTruth<'_>,
    ) -> Result<Draft, DraftingError> {
        let artifact = A::ARTIFACT;
        let prompt = A::build_prompt(context, truth.patient);

        let response = tokio::time::timeout(
            self.timeout,
            self.llm.generate(self.model_name, &prompt, A::SYSTEM_PROMPT),
        )
        .await
        .map_err(|_| DraftingError::Timeout(self.timeout))??;

        let usage = TokenUsage::from_untrusted(response.usage.as_ref());
        let response_len = response.text.len();
        tracing::debug!(
            intake_id,
            artifact = %artifact,
            response_len,
            prompt_tokens = ?usage.prompt_tokens,
            completion_tokens = ?usage.completion_tokens,
            "Model responded"
        );

        let parsed = match A::parse(&response.text) {
            Ok(parsed) => parsed,
            Err(failure) => {
                tracing::warn!(
                    intake_id,
                    artifact = %artifact,
                    violations = failure.validation_errors.len(),
                    "Model output failed to parse"
                );
                let mut draft = Draft::new(
                    intake_id,
                    artifact,
                    DraftStatus::Failed,
                    json!({ "raw": response.text }),
                )
                .with_usage(usage);
                draft.error = Some(failure.error);
                draft.validation_errors = Some(failure.validation_errors);
                return Ok(draft);
            }
        };

        let report = A::validate(parsed, truth);
        let content = to_content(&report.content)?;
        let corrections = (!report.corrections.is_empty()).then(|| report.corrections.clone());
        if corrections.is_some() {
            tracing::info!(
                intake_id,
                artifact = %artifact,
                corrections = report.corrections.len(),
                "Applied review-policy corrections"
            );
        }

        let mut draft = if report.passed() {
            Draft::new(intake_id, artifact, DraftStatus::Ready, content)
        } else {
            tracing::warn!(
                intake_id,
                artifact = %artifact,
                errors = report.errors.len(),
                "Draft failed ground-truth validation"
            );
            let mut draft = Draft::new(intake_id, artifact, DraftStatus::Failed, content);
            draft.error = Some(GROUND_TRUTH_FAILED.to_string());
            draft.ground_truth_errors = Some(report.errors);
            draft
        };
        draft.corrections = corrections;
        Ok(draft.with_usage(usage))
    }

    /// Store the draft. If that fails, try once more with a bare failure record.
    async fn persist(&self, draft: Draft) -> ArtifactOutcome {
        let intake_id = draft.intake_id.clone();
        let artifact = draft.artifact_type;

        match self.store.upsert_draft(&draft).await {
            Ok(()) => {
                tracing::info!(
                    intake_id = %intake_id,
                    artifact = %artifact,
                    status = %draft.status,
                    duration_ms = draft.generation_duration_ms,
                    "Draft stored"
                );
                ArtifactOutcome {
                    status: draft.status,
                    error: draft.error,
                }
            }
            Err(e) => {
                tracing::error!(intake_id = %intake_id, artifact = %artifact, error = %e, "Failed to store draft");
                let error = format!("Failed to store draft: {e}");

                let mut fallback = Draft::new(&intake_id, artifact, DraftStatus::Failed, json!({}));
                fallback.error = Some(error.clone());
                fallback.generation_duration_ms = draft.generation_duration_ms;
                fallback.model_name = draft.model_name;
                if let Err(e) = self.store.upsert_draft(&fallback).await {
                    tracing::error!(intake_id = %intake_id, artifact = %artifact, error = %e, "Failed to store failure record");
                }

                ArtifactOutcome {
                    status: DraftStatus::Failed,
                    error: Some(error),
                }
            }
        }
    }
}

fn to_content<T: Serialize>(content: &T) -> Result<Value, DraftingError> {
    serde_json::to_value(content).map_err(|e| DraftingError::ResponseParsing(e.to_string()))
}
