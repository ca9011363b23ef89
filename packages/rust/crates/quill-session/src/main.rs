//! quill CLI: replay a transcript through the checkpoint planner, or count tokens.
//!
//! Logging: set `RUST_LOG=quill_session=debug` to see session events on stderr.

mod cli;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use quill_cache::ProviderBackend;
use quill_session::{
    AdapterError, AssembledPrompt, FragmentStream, ModelAdapter, SessionConfig, SessionManager,
    set_config_home_override,
};
use quill_tokenizer::{ApproxCounter, Cl100kCounter, TokenCounter};
use quill_window::TranscriptEntry;
use tracing_subscriber::EnvFilter;

use crate::cli::{BackendArg, Cli, Command};

/// The CLI never calls a model; replay only needs the memory side.
struct NoModel;

#[async_trait]
impl ModelAdapter for NoModel {
    async fn stream(&self, _prompt: &AssembledPrompt) -> Result<FragmentStream, AdapterError> {
        Err(AdapterError::Request(
            "no model adapter is configured for the quill CLI".to_string(),
        ))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if let Some(conf_dir) = cli.conf.clone() {
        set_config_home_override(conf_dir);
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quill_session=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match cli.command {
        Command::Replay {
            transcript,
            session_id,
            backend,
        } => run_replay(&transcript, &session_id, backend).await,
        Command::CountTokens { approx, text } => {
            let count = if approx {
                ApproxCounter.count(&text)
            } else {
                Cl100kCounter.count(&text)
            };
            println!("{count}");
            Ok(())
        }
    }
}

async fn run_replay(
    transcript: &std::path::Path,
    session_id: &str,
    backend: Option<BackendArg>,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(transcript)
        .with_context(|| format!("failed to read transcript {}", transcript.display()))?;
    let entries: Vec<TranscriptEntry> = serde_json::from_str(&raw)
        .with_context(|| format!("transcript {} is not a JSON entry list", transcript.display()))?;

    let config = SessionConfig::load();
    let backend = match backend {
        Some(BackendArg::Bedrock) => ProviderBackend::Bedrock,
        Some(BackendArg::Anthropic) => ProviderBackend::Anthropic,
        None => config.provider,
    };
    let manager = SessionManager::from_config(config, Arc::new(NoModel))?;

    manager.resume_session(session_id, entries).await?;
    let rendered = manager.rendered_history(session_id, backend).await?;
    let markers = manager.store().load(session_id).await;
    let output = serde_json::json!({
        "session_id": session_id,
        "backend": backend.as_str(),
        "markers": markers,
        "request": rendered,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
