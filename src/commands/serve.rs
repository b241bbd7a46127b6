//! Serve command handler

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use cupax_agent::{server, AnalysisCoordinator, Config};

use super::load_config;

/// Run the HTTP agent until Ctrl+C.
#[cfg(not(tarpaulin_include))]
pub fn handle(config_path: Option<&Path>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    for line in banner_lines(&config) {
        info!("{}", line);
    }
    warn!("This agent executes untrusted code. Run it only inside an isolated VM.");

    let coordinator = AnalysisCoordinator::new(config);
    coordinator
        .workspace()
        .ensure_root()
        .context("Failed to create work directory")?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(server::serve(Arc::new(coordinator)))
}

fn banner_lines(config: &Config) -> Vec<String> {
    let rule = "=".repeat(60);
    vec![
        rule.clone(),
        "CUPAX Analysis Agent".to_string(),
        rule.clone(),
        format!("Noriben path: {}", config.monitor.noriben_path),
        format!("Python path: {}", config.monitor.python_path),
        format!("Work directory: {}", config.work_directory().display()),
        format!("Analysis timeout: {}s", config.monitor.timeout_secs),
        format!("Extraction backend: {}", config.extraction.backend),
        format!("Extraction tool path: {}", config.extraction.tool_path),
        format!("Listening on: {}:{}", config.server.host, config.server.port),
        rule,
    ]
}
