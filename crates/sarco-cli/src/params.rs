//! # Params Subcommand
//!
//! Prints the protocol configuration that would be used: the YAML file
//! given with `--config`, or else the `SARCO_*` environment variables.

use std::path::Path;

use anyhow::{Context, Result};

use sarco_protocol::ProtocolConfig;

/// Execute the params subcommand.
pub fn run_params(config: Option<&Path>) -> Result<u8> {
    let cfg = load_config(config)?;
    println!("{}", serde_json::to_string_pretty(&cfg)?);
    Ok(0)
}

/// Load configuration from `path`, or from the environment when absent.
pub fn load_config(path: Option<&Path>) -> Result<ProtocolConfig> {
    match path {
        Some(path) => ProtocolConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration: {}", path.display())),
        None => ProtocolConfig::from_env().context("failed to load configuration from environment"),
    }
}
