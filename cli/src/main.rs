//! CLI entrypoint for pocketllm
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use pocketllm_application::{
    ConversationLogger, ConversationRepository, KeyValueStore, NoConversationLogger, RuntimeHost,
    SessionController,
};
use pocketllm_domain::ModelId;
use pocketllm_infrastructure::{
    ConfigLoader, FileConfig, FileKeyValueStore, JsonlConversationLogger, LlamaServerConfig,
    LlamaServerRuntime, LocalModelCatalog,
};
use pocketllm_presentation::{ChatRepl, Cli, ConsoleFormatter, TerminalObserver};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    if cli.show_config {
        ConfigLoader::print_config_sources();
        return Ok(());
    }

    let config = match (cli.no_config, cli.config.as_ref()) {
        (true, None) => ConfigLoader::load_defaults(),
        (true, Some(path)) => ConfigLoader::load_file(path)
            .map_err(|e| anyhow!("Failed to load {}: {}", path.display(), e))?,
        (false, path) => ConfigLoader::load(path)
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?,
    };
    let issues = config.validate();
    if !issues.is_empty() {
        for issue in &issues {
            error!("{}", issue);
        }
        bail!("Invalid configuration ({} issue(s))", issues.len());
    }

    info!("Starting pocketllm");

    // === Dependency Injection ===
    let data_dir = config.storage.data_dir();
    let store: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::new(data_dir.join("store")));
    let catalog = Arc::new(LocalModelCatalog::new(
        store.clone(),
        config.models.dir(&data_dir),
    ));

    if cli.is_maintenance() {
        let repository = ConversationRepository::new(store);
        return run_maintenance(&cli, &catalog, &repository).await;
    }

    let Some(model) = cli.model.as_deref() else {
        bail!("No model given. Use --model <ID> (see --list-models).");
    };
    let model_id = ModelId::new(model.trim()).map_err(|e| anyhow!("{}", e))?;

    let host = Arc::new(RuntimeHost::new(
        Arc::new(LlamaServerRuntime::new(LlamaServerConfig::from(
            &config.runtime,
        ))),
        catalog,
        config.runtime.to_options(),
    ));
    let repository =
        Arc::new(ConversationRepository::new(store).with_warm_loader(host.clone()));
    let controller = Arc::new(
        SessionController::new(repository, host.clone())
            .with_settings(config.generation.to_settings())
            .with_observer(Arc::new(TerminalObserver::new()))
            .with_conversation_logger(transcript_logger(&config, &data_dir)),
    );

    let repl = ChatRepl::new(controller, model_id).with_history_file(data_dir.join("history.txt"));
    let outcome = repl.run().await;

    if let Err(e) = host.release().await {
        warn!("Failed to release model: {}", e);
    }
    outcome.context("Chat session failed")?;
    Ok(())
}

/// Stderr logging filtered by `-v` (or `RUST_LOG`), plus an optional file.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Cannot open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .init();

    Ok(guard)
}

fn transcript_logger(config: &FileConfig, data_dir: &Path) -> Arc<dyn ConversationLogger> {
    if !config.logging.transcript {
        return Arc::new(NoConversationLogger);
    }
    match JsonlConversationLogger::for_session(config.logging.dir(data_dir)) {
        Some(logger) => {
            info!("Transcript: {}", logger.path().display());
            Arc::new(logger)
        }
        None => Arc::new(NoConversationLogger),
    }
}

async fn run_maintenance(
    cli: &Cli,
    catalog: &LocalModelCatalog,
    repository: &ConversationRepository,
) -> Result<()> {
    if let Some(path) = &cli.add_model {
        let model = catalog
            .register(path)
            .await
            .with_context(|| format!("Cannot add model {}", path.display()))?;
        println!(
            "{}",
            ConsoleFormatter::notice(&format!("Added {} ({})", model.id, model.display_size()))
        );
    }

    if let Some(id) = &cli.remove_model {
        let model_id = ModelId::new(id.trim()).map_err(|e| anyhow!("{}", e))?;
        if catalog.remove(&model_id).await? {
            println!("{}", ConsoleFormatter::notice(&format!("Removed {}", model_id)));
        } else {
            println!("{}", ConsoleFormatter::notice(&format!("No model named {}", model_id)));
        }
    }

    if let Some(days) = cli.prune_days {
        let removed = repository.prune_older_than(days).await?;
        println!(
            "{}",
            ConsoleFormatter::notice(&format!(
                "Removed {} conversation(s) older than {} day(s)",
                removed, days
            ))
        );
    }

    if cli.list_models {
        print!("{}", ConsoleFormatter::models(&catalog.list().await?));
    }

    if cli.list_conversations {
        print!("{}", ConsoleFormatter::conversations(&repository.get_all().await?));
    }

    Ok(())
}
