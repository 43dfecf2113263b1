//! CLI, configuration and run orchestration
//!
//! This crate provides the `cike` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;
pub mod summary;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
pub use summary::RunSummary;
