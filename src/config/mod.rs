//! Configuration management for the agent
//!
//! The configuration is read once at startup (file, then `AGENT_*` environment
//! overrides) and handed to every component by reference. Nothing below this
//! point looks at the process environment.

mod io;
mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::extract::ExtractorKind;

impl Config {
    /// Get the config file path (~/.config/cupax-agent/config.toml)
    pub fn config_path() -> Result<PathBuf> {
        io::config_path()
    }

    /// Load configuration from file, or return defaults if not found
    pub fn load(path: Option<&Path>) -> Result<Self> {
        io::load(path)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        io::parse(contents)
    }

    /// Apply `AGENT_*` overrides from the given variables.
    ///
    /// Unknown keys are ignored. Numeric values that do not parse are an error
    /// so a typo does not silently fall back to a default.
    pub fn apply_env<I, K, V>(mut self, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let value = value.into();
            match key.as_ref() {
                "AGENT_NORIBEN_PATH" => self.monitor.noriben_path = value,
                "AGENT_PYTHON_PATH" => self.monitor.python_path = value,
                "AGENT_TIMEOUT" => {
                    self.monitor.timeout_secs = value
                        .parse()
                        .with_context(|| format!("AGENT_TIMEOUT is not a number: {}", value))?
                }
                "AGENT_WORK_DIR" => self.workspace.work_dir = value,
                "AGENT_HOST" => self.server.host = value,
                "AGENT_PORT" => {
                    self.server.port = value
                        .parse()
                        .with_context(|| format!("AGENT_PORT is not a port: {}", value))?
                }
                "AGENT_UNZIP_TOOL" => {
                    self.extraction.backend = value
                        .parse::<ExtractorKind>()
                        .map_err(|e| anyhow::anyhow!("AGENT_UNZIP_TOOL: {}", e))?
                }
                "AGENT_UNZIP_PATH" => self.extraction.tool_path = value,
                _ => {}
            }
        }
        self.validate()
            .map_err(|e| anyhow::anyhow!("Invalid config: {}", e))?;
        Ok(self)
    }

    /// Validate configuration values.
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), String> {
        if self.monitor.timeout_secs == 0 {
            return Err("monitor.timeout_secs must be > 0".to_string());
        }
        if self.monitor.noriben_path.trim().is_empty() {
            return Err("monitor.noriben_path must not be empty".to_string());
        }
        if self.monitor.python_path.trim().is_empty() {
            return Err("monitor.python_path must not be empty".to_string());
        }
        if self.extraction.timeout_secs == 0 {
            return Err("extraction.timeout_secs must be > 0".to_string());
        }
        if self.extraction.backend != ExtractorKind::Builtin
            && self.extraction.tool_path.trim().is_empty()
        {
            return Err("extraction.tool_path must not be empty".to_string());
        }
        Ok(())
    }

    /// Expand ~ in the working directory path
    pub fn work_directory(&self) -> PathBuf {
        let dir = &self.workspace.work_dir;
        if let Some(stripped) = dir.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        }
        PathBuf::from(dir)
    }

    /// Hard wall-clock limit for one Noriben run
    pub fn monitor_deadline(&self) -> Duration {
        Duration::from_secs(
            self.monitor
                .timeout_secs
                .saturating_add(self.monitor.shutdown_grace_secs),
        )
    }

    /// Limit for a single extraction attempt
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction.timeout_secs)
    }
}
