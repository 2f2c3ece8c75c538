use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;

use medcert_drafts::config::DraftConfig;
use medcert_drafts::models::ArtifactType;
use medcert_drafts::pipeline::drafting::{
    DraftOrchestrator, OllamaClient, RecordStore, SqliteRecordStore,
};

#[derive(Parser)]
#[command(name = "draftgen")]
#[command(about = "Generate and inspect clinical note and medical certificate drafts")]
#[command(version)]
struct Cli {
    /// Database path (overrides DRAFTGEN_DATABASE)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate both drafts for a paid intake
    Generate {
        /// Intake ID
        intake_id: String,
        /// Delete existing drafts and regenerate
        #[arg(long)]
        force: bool,
    },
    /// Print the stored drafts for an intake
    Show {
        /// Intake ID
        intake_id: String,
    },
    /// Print the draft audit trail for an intake
    Audit {
        /// Intake ID
        intake_id: String,
    },
    /// Delete audit entries older than the retention window
    PruneAudit {
        /// Retention window in days
        #[arg(long, default_value_t = 90)]
        days: i64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    medcert_drafts::init_tracing();
    let cli = Cli::parse();

    let mut config = DraftConfig::from_env();
    if let Some(path) = cli.database {
        config.database_path = path;
    }

    match run(cli.command, config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: DraftConfig) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let store = SqliteRecordStore::open(&config.database_path)?;

    match command {
        Commands::Generate { intake_id, force } => {
            let llm = OllamaClient::new(&config.ollama_url)?;
            let orchestrator = DraftOrchestrator::new(Arc::new(store), Arc::new(llm), config);
            let outcome = orchestrator.generate_drafts(&intake_id, force).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);

            Ok(if outcome.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Show { intake_id } => {
            let mut drafts = serde_json::Map::new();
            for artifact in ArtifactType::all() {
                let draft = store.get_draft(&intake_id, *artifact).await?;
                drafts.insert(artifact.to_string(), json!(draft));
            }
            println!("{}", serde_json::to_string_pretty(&drafts)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Audit { intake_id } => {
            let trail = store.audit_trail(&intake_id).await?;
            println!("{}", serde_json::to_string_pretty(&trail)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::PruneAudit { days } => {
            let deleted = store.prune_audit(days).await?;
            println!("{}", json!({ "deleted": deleted, "retentionDays": days }));
            Ok(ExitCode::SUCCESS)
        }
    }
}
