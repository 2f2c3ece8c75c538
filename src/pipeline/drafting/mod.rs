//! Draft generation pipeline.
//!
//! Turns a paid intake into two reviewable drafts (clinical note, medical certificate):
//! ```text
//! Orchestrator → Guard → Intake load → Context → [ClinicalNote | MedCert] → Store
//!                                                 model → parse → ground truth → upsert
//! ```
//! Each artifact fails independently; only a missing intake or a store failure before
//! generation starts fails the whole call.

pub mod artifact;
pub mod context;
pub mod guard;
pub mod ollama;
pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod safety;
pub mod store;
pub mod types;
pub mod validation;

pub use artifact::*;
pub use context::*;
pub use guard::*;
pub use ollama::*;
pub use orchestrator::*;
pub use parser::*;
pub use prompt::*;
pub use store::*;
pub use types::*;
pub use validation::*;

use std::time::Duration;

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum DraftingError {
    #[error("Ollama is not running at {0}")]
    OllamaConnection(String),

    #[error("Ollama returned error (status {status}): {body}")]
    OllamaError { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Store task failed: {0}")]
    StoreTask(String),
}
