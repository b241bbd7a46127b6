//! Cleanup command handler

use anyhow::Result;
use std::path::Path;

use cupax_agent::AnalysisCoordinator;

use super::load_config;

/// Remove the output directory of an analysis. Succeeds if it is already gone.
#[cfg(not(tarpaulin_include))]
pub fn handle(config_path: Option<&Path>, analysis_id: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let coordinator = AnalysisCoordinator::new(config);
    coordinator.cleanup(analysis_id)?;
    println!("Cleaned up: {}", analysis_id);
    Ok(())
}
