//! Analyze command handler

use anyhow::{bail, Context, Result};
use std::path::Path;

use cupax_agent::{AnalysisCoordinator, AnalysisResponse, Upload};

use super::{load_config, print_json};

/// Run one analysis locally and print the JSON response.
///
/// The process exits non-zero when the analysis fails; the response is
/// printed either way.
#[cfg(not(tarpaulin_include))]
pub fn handle(
    config_path: Option<&Path>,
    file: &Path,
    analysis_id: &str,
    password: Option<&str>,
    is_zip: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let upload = Upload::from_path(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let coordinator = AnalysisCoordinator::new(config);
    let response = AnalysisResponse::from(coordinator.analyze(upload, analysis_id, password, is_zip));
    print_json(&response)?;

    if let Some(err) = response.error {
        bail!("Analysis {} failed: {}", analysis_id, err);
    }
    Ok(())
}
