use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::enums::{ArtifactType, DraftStatus};

/// Outcome of one generation attempt for one (intake, artifact type) pair.
/// There is at most one per pair; each attempt overwrites the previous row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub intake_id: String,
    pub artifact_type: ArtifactType,
    pub status: DraftStatus,
    /// Parsed object on success, `{"raw": text}` on parse failure, `{}` on unexpected failure.
    pub content: Value,
    pub error: Option<String>,
    pub validation_errors: Option<Vec<String>>,
    pub ground_truth_errors: Option<Vec<String>>,
    /// Fields the validator overrode (e.g. `requiresReview` forced on).
    pub corrections: Option<Vec<String>>,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub generation_duration_ms: u64,
    pub model_name: Option<String>,
}

impl Draft {
    /// A draft with the given outcome and no diagnostics attached yet.
    pub fn new(intake_id: &str, artifact_type: ArtifactType, status: DraftStatus, content: Value) -> Self {
        Self {
            intake_id: intake_id.to_string(),
            artifact_type,
            status,
            content,
            error: None,
            validation_errors: None,
            ground_truth_errors: None,
            corrections: None,
            prompt_tokens: None,
            completion_tokens: None,
            generation_duration_ms: 0,
            model_name: None,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.prompt_tokens = usage.prompt_tokens;
        self.completion_tokens = usage.completion_tokens;
        self
    }

    pub fn is_ready(&self) -> bool {
        self.status == DraftStatus::Ready
    }
}

/// Token counters reported by the model. Either may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

impl TokenUsage {
    /// Read usage counters from an untrusted payload.
    ///
    /// Accepts camelCase, snake_case and Ollama's `prompt_eval_count`/`eval_count` keys.
    /// Anything absent, negative, fractional, too large or of the wrong type becomes `None`.
    pub fn from_untrusted(value: Option<&Value>) -> Self {
        let Some(Value::Object(map)) = value else {
            if value.is_some_and(|v| !v.is_null()) {
                tracing::warn!("Ignoring usage payload that is not an object");
            }
            return Self::default();
        };

        let read = |keys: &[&str]| -> Option<u32> {
            let (key, raw) = keys.iter().find_map(|k| map.get(*k).map(|v| (*k, v)))?;
            let parsed = raw.as_u64().and_then(|n| u32::try_from(n).ok());
            if parsed.is_none() && !raw.is_null() {
                tracing::warn!(field = key, "Ignoring malformed usage counter");
            }
            parsed
        };

        Self {
            prompt_tokens: read(&["promptTokens", "prompt_tokens", "prompt_eval_count"]),
            completion_tokens: read(&["completionTokens", "completion_tokens", "eval_count"]),
        }
    }
}
