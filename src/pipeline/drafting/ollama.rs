use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use super::prompt::MED_CERT_SYSTEM_PROMPT;
use super::types::{LlmClient, LlmResponse};
use super::DraftingError;
use crate::models::ArtifactType;

/// Ollama HTTP client for local inference.
///
/// No overall request timeout is set here; callers bound each call themselves.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Result<Self, DraftingError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DraftingError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    format: &'a str,
}

/// Split an /api/generate body into reply text and raw usage counters.
///
/// Counters are passed through untouched; they are validated when the draft is built.
fn into_llm_response(body: Value) -> Result<LlmResponse, DraftingError> {
    let text = body
        .get("response")
        .and_then(Value::as_str)
        .ok_or_else(|| DraftingError::ResponseParsing("missing 'response' string".into()))?
        .to_string();

    let usage = match (body.get("prompt_eval_count"), body.get("eval_count")) {
        (None, None) => None,
        (prompt, completion) => Some(json!({
            "prompt_eval_count": prompt.cloned().unwrap_or(Value::Null),
            "eval_count": completion.cloned().unwrap_or(Value::Null),
        })),
    };

    Ok(LlmResponse { text, usage })
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
    ) -> Result<LlmResponse, DraftingError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model,
            prompt,
            system,
            stream: false,
            format: "json",
        };

        let response = self.client.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_connect() {
                DraftingError::OllamaConnection(self.base_url.clone())
            } else {
                DraftingError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DraftingError::OllamaError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| DraftingError::ResponseParsing(e.to_string()))?;

        into_llm_response(parsed)
    }
}

/// Mock LLM client for testing: returns the same response to every call.
pub struct MockLlmClient {
    response: LlmResponse,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: LlmResponse::text(response),
        }
    }

    pub fn with_usage(mut self, usage: Value) -> Self {
        self.response.usage = Some(usage);
        self
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(
        &self,
        _model: &str,
        _prompt: &str,
        _system: &str,
    ) -> Result<LlmResponse, DraftingError> {
        Ok(self.response.clone())
    }
}

/// What a [`ScriptedLlmClient`] does for one artifact.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Reply(LlmResponse),
    /// Reply after a delay, to let concurrent calls overlap.
    Delayed(Duration, LlmResponse),
    /// Fail with an HTTP client error carrying this message.
    Fail(String),
    /// Never complete.
    Hang,
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Reply(LlmResponse::text(text))
    }

    pub fn json(value: Value) -> Self {
        Self::text(value.to_string())
    }
}

/// Test client with a separate reply per artifact, chosen by system prompt.
///
/// Counts calls per artifact and tracks peak concurrency.
pub struct ScriptedLlmClient {
    clinical_note: ScriptedReply,
    med_cert: ScriptedReply,
    clinical_note_calls: AtomicUsize,
    med_cert_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedLlmClient {
    pub fn new(clinical_note: ScriptedReply, med_cert: ScriptedReply) -> Self {
        Self {
            clinical_note,
            med_cert,
            clinical_note_calls: AtomicUsize::new(0),
            med_cert_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self, artifact: ArtifactType) -> usize {
        match artifact {
            ArtifactType::ClinicalNote => self.clinical_note_calls.load(Ordering::SeqCst),
            ArtifactType::MedCert => self.med_cert_calls.load(Ordering::SeqCst),
        }
    }

    pub fn total_calls(&self) -> usize {
        ArtifactType::all().iter().map(|a| self.calls(*a)).sum()
    }

    /// Highest number of calls that were in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn generate(
        &self,
        _model: &str,
        _prompt: &str,
        system: &str,
    ) -> Result<LlmResponse, DraftingError> {
        let (reply, counter) = if system == MED_CERT_SYSTEM_PROMPT {
            (&self.med_cert, &self.med_cert_calls)
        } else {
            (&self.clinical_note, &self.clinical_note_calls)
        };
        counter.fetch_add(1, Ordering::SeqCst);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        match reply {
            ScriptedReply::Reply(response) => Ok(response.clone()),
            ScriptedReply::Delayed(delay, response) => {
                tokio::time::sleep(*delay).await;
                Ok(response.clone())
            }
            ScriptedReply::Fail(message) => Err(DraftingError::HttpClient(message.clone())),
            ScriptedReply::Hang => std::future::pending().await,
        }
    }
}
