//! Terminal front end for a codeshell workspace stored in a JSON file.

pub mod logging;
pub mod repl;
pub mod settings;
pub mod store;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use codeshell_core::core::{SessionManager, Workspace};

use crate::repl::Repl;
use crate::settings::Settings;
use crate::store::JsonFileStore;

/// Store document used when neither `--store` nor the settings name one.
pub const DEFAULT_STORE: &str = ".codeshell/workspace.json";

#[derive(Debug, Parser)]
#[command(name = "codeshell")]
#[command(about = "Shell over a persisted virtual project workspace")]
pub struct Cli {
    /// Workspace store document
    #[arg(long, env = "CODESHELL_STORE", global = true)]
    pub store: Option<PathBuf>,

    /// TOML settings file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Tracing filter, e.g. `debug` or `codeshell_core=trace`
    #[arg(long, env = "CODESHELL_LOG", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Interactive shell (default)
    Repl,
    /// Execute one line in a fresh session and print its output
    Run {
        line: String,
    },
    /// Write the workspace tree as JSON
    Export {
        out: PathBuf,
    },
    /// Replace the workspace tree with an exported JSON document
    Import {
        input: PathBuf,
        /// Confirm replacing the current tree
        #[arg(long)]
        yes: bool,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let settings = Settings::load(cli.config.as_deref())?;
    logging::init_logging(cli.log_level.as_deref(), settings.log_level.as_deref())?;

    let store_path = cli
        .store
        .or(settings.store)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE));
    let store = JsonFileStore::open(&store_path)
        .await
        .with_context(|| format!("failed to open store {}", store_path.display()))?;

    match cli.command.unwrap_or(Commands::Repl) {
        Commands::Repl => {
            let session_ids = store.session_ids();
            let workspace = Workspace::load_or_seed(store).await?;
            let mut repl = Repl::start(settings.shell, workspace, session_ids).await?;
            repl.run().await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run { line } => {
            let mut workspace = Workspace::load_or_seed(store).await?;
            let mut manager = SessionManager::new(settings.shell);
            let id = manager.create_session(None);
            let outcome = manager.submit(&id, &mut workspace, &line).await?;
            for text in &outcome.output_lines {
                println!("{}", text);
            }
            if outcome.streaming {
                manager.drive(&id, |text| println!("{}", text)).await?;
            }
            if outcome.error.is_some() {
                if let Some(entry) = manager.get(&id)?.history().last() {
                    eprintln!("{}", entry.content);
                }
            }
            manager.close_session(&id, workspace.store()).await?;
            Ok(if outcome.is_ok() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Export { out } => {
            let workspace = Workspace::load_or_seed(store).await?;
            let json = workspace.export_json()?;
            tokio::fs::write(&out, json)
                .await
                .with_context(|| format!("failed to write {}", out.display()))?;
            tracing::info!(path = %out.display(), "exported workspace");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Import { input, yes } => {
            if !yes {
                bail!("import replaces the whole workspace; pass --yes to confirm");
            }
            let json = tokio::fs::read_to_string(&input)
                .await
                .with_context(|| format!("failed to read {}", input.display()))?;
            let mut workspace = Workspace::load(store).await?;
            workspace.import_json(&json).await?;
            println!("imported {} nodes", workspace.tree().len());
            Ok(ExitCode::SUCCESS)
        }
    }
}
