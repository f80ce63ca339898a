//! Tenderfold CLI - Command-line interface for the tender version folding pipeline.

use clap::Parser;
use std::fs;
use std::sync::Arc;
use tenderfold_cli::commands;
use tenderfold_cli::{Cli, Command, Config, Formatter};
use tenderfold_store::SqliteStore;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Log to stderr so command output on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> tenderfold_cli::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::path()?,
    };
    let mut config = Config::load_from(&config_path)?;
    if let Some(db) = cli.db {
        config.database.path = Some(db);
    }

    // Determine output format
    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Config(args) => {
            commands::execute_config(args, &config, &config_path, &formatter)?;
        }
        cmd => {
            // Commands that need the database
            config.validate()?;
            let db_path = config.database_path()?;
            if let Some(parent) = db_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let store = Arc::new(SqliteStore::new(&db_path)?);

            match cmd {
                Command::Ingest(args) => {
                    let cancel = CancellationToken::new();
                    let on_interrupt = cancel.clone();
                    tokio::spawn(async move {
                        if tokio::signal::ctrl_c().await.is_ok() {
                            warn!("Interrupted, waiting for in-flight chunks; nothing will be committed");
                            on_interrupt.cancel();
                        }
                    });
                    commands::execute_ingest(args, store, &config, &formatter, &cancel).await?;
                }
                Command::Baseline(args) => {
                    commands::execute_baseline(args, store.as_ref(), &formatter)?;
                }
                Command::Versions(args) => {
                    commands::execute_versions(args, store.as_ref(), &formatter)?;
                }
                Command::History(args) => {
                    commands::execute_history(args, store.as_ref(), &formatter)?;
                }
                Command::Rebuild(args) => {
                    commands::execute_rebuild(args, store.as_ref(), &config, &formatter)?;
                }
                Command::Delete(args) => {
                    commands::execute_delete(args, store.as_ref(), &formatter)?;
                }
                Command::Projects => {
                    commands::execute_projects(store.as_ref(), &formatter)?;
                }
                Command::Config(_) => unreachable!(),
            }
        }
    }

    Ok(())
}
