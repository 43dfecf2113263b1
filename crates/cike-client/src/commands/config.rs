//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the effective configuration to stdout.
pub fn dump(config: &ClientConfig, path: Option<&Path>) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    let default_path = ClientConfig::default_path();
    println!("# config.toml ({})", path.unwrap_or(&default_path).display());
    println!("{}", toml_str);
    Ok(())
}

/// Validate the configuration, including the Google token reference.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    config.validate().map_err(ClientError::Config)?;
    let sources = config.enabled_sources().map_err(ClientError::Config)?;
    let names: Vec<_> = sources.iter().map(|tag| tag.as_str()).collect();
    println!("Enabled sources: {}", names.join(", "));

    if config.sources.amcham.render_command.is_none()
        && sources.contains(&cike_core::SourceTag::AmCham)
    {
        println!("AMCHAM has no render_command and will be skipped.");
    }

    #[cfg(feature = "google")]
    if let Some(google) = &config.google {
        let timezone = config.timezone().map_err(ClientError::Config)?;
        google
            .to_provider_config(timezone, config.fetch_config().retry)
            .map_err(|e| ClientError::Config(format!("invalid Google settings: {}", e)))?;
        println!("Google access token resolved.");
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: Option<&Path>) -> ClientResult<()> {
    let default_path = ClientConfig::default_path();
    println!("config: {}", path.unwrap_or(&default_path).display());
    Ok(())
}
