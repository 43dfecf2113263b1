//! cike CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use cike_client::cli::{Cli, Command, ConfigAction};
use cike_client::commands;
use cike_client::commands::sync::SyncOptions;
use cike_client::config::ClientConfig;
use cike_client::error::{ClientError, ClientResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = cike_core::init_tracing(cli.tracing_config()) {
        eprintln!("error: {}", ClientError::from(e));
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "run failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config = match &cli.config {
        Some(path) => ClientConfig::load_from(path),
        None => ClientConfig::load(),
    }
    .map_err(ClientError::Config)?;

    match cli.command {
        Command::Sync {
            no_remote,
            no_export,
            export_path,
        } => {
            let options = SyncOptions {
                no_remote,
                no_export,
                export_path,
            };
            commands::sync::run(&config, options).await.map(|_| ())
        }
        Command::Scrape { json } => commands::scrape::run(&config, json).await,
        Command::Inspect { file, json } => commands::inspect::run(&file, json).await,
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, cli.config.as_deref()),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(cli.config.as_deref()),
        },
    }
}
