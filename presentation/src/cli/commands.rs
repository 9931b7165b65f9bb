//! CLI command definitions

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for pocketllm
#[derive(Parser, Debug)]
#[command(name = "pocketllm")]
#[command(author, version, about = "Chat with local quantized language models")]
#[command(long_about = r#"
pocketllm runs a quantized model on this machine with llama-server and keeps
one persistent conversation per model.

Models are GGUF files registered with --add-model (or dropped into the models
directory). Reopening a model resumes its most recently updated conversation.

Configuration files are loaded from (in priority order):
1. POCKETLLM_* environment variables
2. --config <path>     Explicit config file
3. ./pocketllm.toml    Project-level config
4. ~/.config/pocketllm/config.toml   Global config

Example:
  pocketllm --add-model ~/Downloads/qwen2.5-1.5b-instruct-q4_k_m.gguf
  pocketllm --model qwen2.5-1.5b-instruct-q4_k_m.gguf
  pocketllm --list-conversations
"#)]
pub struct Cli {
    /// Model to chat with (its file name in the model inventory)
    #[arg(short, long, value_name = "ID")]
    pub model: Option<String>,

    /// List registered models and exit
    #[arg(long)]
    pub list_models: bool,

    /// Register a local GGUF file and exit
    #[arg(long, value_name = "PATH")]
    pub add_model: Option<PathBuf>,

    /// Remove a model from the inventory and exit
    #[arg(long, value_name = "ID")]
    pub remove_model: Option<String>,

    /// List stored conversations and exit
    #[arg(long)]
    pub list_conversations: bool,

    /// Delete conversations not updated in the last N days and exit
    #[arg(long, value_name = "DAYS")]
    pub prune_days: Option<u32>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Also write diagnostic logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Skip the global and project config files (with --config, use only that file)
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

impl Cli {
    /// Whether a one-shot inventory or maintenance command was requested
    pub fn is_maintenance(&self) -> bool {
        self.list_models
            || self.add_model.is_some()
            || self.remove_model.is_some()
            || self.list_conversations
            || self.prune_days.is_some()
    }
}
