use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "Conversation memory and prompt-cache checkpoint tooling.")]
pub(crate) struct Cli {
    /// Override config directory (holds `quill/settings.yaml`).
    #[arg(long, global = true)]
    pub(crate) conf: Option<PathBuf>,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum BackendArg {
    Bedrock,
    Anthropic,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Resume a session from a transcript and print the checkpointed request body.
    Replay {
        /// JSON array of transcript entries (`type`, `output`, `is_error`, `metadata`).
        #[arg(long)]
        transcript: PathBuf,

        /// Session id used for the store slots.
        #[arg(long, default_value = "replay")]
        session_id: String,

        /// Provider wire format (default: from settings).
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,
    },
    /// Print the estimated token count of TEXT.
    CountTokens {
        /// Use the length-based estimate instead of the reference encoding.
        #[arg(long)]
        approx: bool,

        text: String,
    },
}
