//! Parse command handler

use anyhow::{Context, Result};
use std::path::Path;

use cupax_agent::ReportParser;

use super::print_json;

/// Parse an existing Noriben output directory and print the report.
///
/// Needs no configuration: nothing is executed.
#[cfg(not(tarpaulin_include))]
pub fn handle(output_dir: &Path) -> Result<()> {
    let report = ReportParser::new()
        .parse(output_dir)
        .with_context(|| format!("Failed to parse {}", output_dir.display()))?;
    print_json(&report)
}
