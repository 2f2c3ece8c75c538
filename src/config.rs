use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

/// Application-level constants
pub const APP_NAME: &str = "DraftGen";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service type discriminator that is allowed through the drafting pipeline.
pub const DEFAULT_ELIGIBLE_SERVICE_TYPE: &str = "med_certs";

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "medgemma:4b";
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 120;

/// Certificates longer than this, or backdated by more than this, need a doctor's eye.
pub const DEFAULT_REVIEW_THRESHOLD_DAYS: i64 = 3;

/// Get the application data directory (~/DraftGen/)
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
}

/// Default location of the drafts database
pub fn default_database_path() -> PathBuf {
    app_data_dir().join("drafts.db")
}

/// Log filter used when RUST_LOG is not set.
pub fn default_log_filter() -> &'static str {
    "info,medcert_drafts=debug"
}

/// Runtime configuration for the drafting pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct DraftConfig {
    pub ollama_url: String,
    pub model_name: String,
    pub model_timeout_secs: u64,
    pub database_path: PathBuf,
    pub eligible_service_type: String,
    pub review_threshold_days: i64,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.into(),
            model_name: DEFAULT_MODEL.into(),
            model_timeout_secs: DEFAULT_MODEL_TIMEOUT_SECS,
            database_path: default_database_path(),
            eligible_service_type: DEFAULT_ELIGIBLE_SERVICE_TYPE.into(),
            review_threshold_days: DEFAULT_REVIEW_THRESHOLD_DAYS,
        }
    }
}

impl DraftConfig {
    /// Build from `DRAFTGEN_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Split out from `from_env` for tests.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("DRAFTGEN_OLLAMA_URL").filter(|v| !v.trim().is_empty()) {
            config.ollama_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(model) = lookup("DRAFTGEN_MODEL").filter(|v| !v.trim().is_empty()) {
            config.model_name = model.trim().to_string();
        }
        if let Some(raw) = lookup("DRAFTGEN_MODEL_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.model_timeout_secs = secs,
                _ => tracing::warn!(
                    value = %raw,
                    default = DEFAULT_MODEL_TIMEOUT_SECS,
                    "Invalid DRAFTGEN_MODEL_TIMEOUT_SECS, using default"
                ),
            }
        }
        if let Some(path) = lookup("DRAFTGEN_DATABASE").filter(|v| !v.trim().is_empty()) {
            config.database_path = PathBuf::from(path.trim());
        }
        if let Some(service) = lookup("DRAFTGEN_ELIGIBLE_SERVICE").filter(|v| !v.trim().is_empty()) {
            config.eligible_service_type = service.trim().to_string();
        }

        config
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }
}
