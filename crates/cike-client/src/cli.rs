//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use cike_core::{TracingConfig, TracingOutputFormat};

/// cike - Košice region events, collected into one calendar
#[derive(Debug, Parser)]
#[command(name = "cike")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CIKE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Log output format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Tracing setup for the selected flags.
    ///
    /// `--debug` starts from the debug preset, `--log-format json` from the
    /// scheduled preset; an explicit format always wins.
    pub fn tracing_config(&self) -> TracingConfig {
        let base = if self.debug {
            TracingConfig::cli_debug()
        } else if self.log_format == Some(LogFormat::Json) {
            TracingConfig::scheduled()
        } else {
            TracingConfig::default()
        };
        match self.log_format {
            Some(format) => base.with_format(format.into()),
            None => base,
        }
    }
}

/// Log output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Multi-line human-readable output
    Pretty,
    /// Single-line output
    Compact,
    /// JSON lines
    Json,
}

impl From<LogFormat> for TracingOutputFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
            LogFormat::Json => Self::Json,
        }
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scrape every source and publish to the configured destinations
    Sync {
        /// Skip the remote calendar even if one is configured
        #[arg(long)]
        no_remote: bool,

        /// Skip writing the calendar file
        #[arg(long)]
        no_export: bool,

        /// Write the calendar file here instead of the configured path
        #[arg(long)]
        export_path: Option<PathBuf>,
    },

    /// Scrape and aggregate without touching any destination
    Scrape {
        /// Print events as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the entries of an exported calendar file
    Inspect {
        /// Calendar file to read
        file: PathBuf,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
