//! Command handlers for the agent CLI.
//!
//! Each submodule handles one subcommand. The dispatch itself lives in main.rs.

pub mod analyze;
pub mod cleanup;
pub mod parse;
pub mod serve;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use cupax_agent::Config;

/// Load the config file, then apply `AGENT_*` overrides from the environment.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    Config::load(path)?.apply_env(std::env::vars())
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize response")?;
    println!("{}", json);
    Ok(())
}
