use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::DraftingError;
use crate::models::DraftStatus;

/// Raw model reply. Nothing in it is trusted until parsed.
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    pub text: String,
    /// Usage counters exactly as the backend sent them, possibly malformed.
    pub usage: Option<Value>,
}

impl LlmResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// Generative model abstraction (allows mocking).
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
    ) -> Result<LlmResponse, DraftingError>;
}

/// Draft clinical note as authored by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalNote {
    pub presenting_complaint: String,
    pub history_of_present_illness: String,
    pub relevant_information: String,
    pub certificate_details: String,
    pub plan_and_advice: String,
    pub requires_review: bool,
    #[serde(default)]
    pub review_reason: Option<String>,
}

impl ClinicalNote {
    /// Free-text fields, named as they appear in the JSON.
    pub fn text_fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![
            ("presentingComplaint", self.presenting_complaint.as_str()),
            ("historyOfPresentIllness", self.history_of_present_illness.as_str()),
            ("relevantInformation", self.relevant_information.as_str()),
            ("certificateDetails", self.certificate_details.as_str()),
            ("planAndAdvice", self.plan_and_advice.as_str()),
        ];
        if let Some(reason) = self.review_reason.as_deref() {
            fields.push(("reviewReason", reason));
        }
        fields
    }
}

/// Draft medical certificate as authored by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedCertDraft {
    pub patient_name: String,
    pub certificate_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration_days: u32,
    pub symptoms_summary: String,
    pub statement: String,
    pub requires_review: bool,
    #[serde(default)]
    pub review_reason: Option<String>,
}

impl MedCertDraft {
    /// Free-text fields checked against the denylist. Name and type are checked separately.
    pub fn text_fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![
            ("symptomsSummary", self.symptoms_summary.as_str()),
            ("statement", self.statement.as_str()),
        ];
        if let Some(reason) = self.review_reason.as_deref() {
            fields.push(("reviewReason", reason));
        }
        fields
    }
}

/// Per-artifact status returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactOutcome {
    pub status: DraftStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ArtifactOutcome {
    pub fn is_ready(&self) -> bool {
        self.status == DraftStatus::Ready
    }
}

/// Combined result of `generate_drafts`.
///
/// `success` only means the call itself completed; check each artifact's status.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinical_note: Option<ArtifactOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub med_cert: Option<ArtifactOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationOutcome {
    pub fn skipped() -> Self {
        Self {
            success: true,
            skipped: true,
            clinical_note: None,
            med_cert: None,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            skipped: false,
            clinical_note: None,
            med_cert: None,
            error: Some(error.into()),
        }
    }

    pub fn generated(clinical_note: ArtifactOutcome, med_cert: ArtifactOutcome) -> Self {
        Self {
            success: true,
            skipped: false,
            clinical_note: Some(clinical_note),
            med_cert: Some(med_cert),
            error: None,
        }
    }
}
