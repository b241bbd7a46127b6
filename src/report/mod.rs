//! Noriben output parsing.
//!
//! Noriben leaves two artifacts in its output directory:
//!
//! - `Noriben_<stamp>.txt` - narrative summary with timings and section lists
//! - `Noriben_<stamp>_timeline.csv` - one row per observed event
//!
//! [`ReportParser::parse`] finds both and combines them into a [`Report`].
//! Damage is contained: an unreadable file yields an empty section and a bad
//! row is skipped, so one broken part never loses the others.

mod summary;
mod timeline;
mod types;

pub use summary::parse_summary;
pub use timeline::parse_timeline;
pub use types::*;

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

const REPORT_PREFIX: &str = "Noriben_";
const SUMMARY_SUFFIX: &str = ".txt";
const TIMELINE_SUFFIX: &str = "_timeline.csv";

/// Errors from locating the Noriben artifacts.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Noriben output files not found in {}", .0.display())]
    OutputNotFound(PathBuf),

    #[error("Cannot read output directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Paths of the two artifacts inside an output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFiles {
    pub summary: PathBuf,
    pub timeline: PathBuf,
}

impl OutputFiles {
    /// Locate the summary and timeline files in `output_dir`.
    ///
    /// When several runs left files behind, the lexicographically first of each
    /// kind is used.
    pub fn locate(output_dir: &Path) -> Result<Self, ParseError> {
        let entries = fs::read_dir(output_dir).map_err(|source| ParseError::Io {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let mut names: Vec<String> = entries
            .flatten()
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|name| name.starts_with(REPORT_PREFIX))
            .collect();
        names.sort();

        let summary = names
            .iter()
            .find(|name| name.ends_with(SUMMARY_SUFFIX))
            .map(|name| output_dir.join(name));
        let timeline = names
            .iter()
            .find(|name| name.ends_with(TIMELINE_SUFFIX))
            .map(|name| output_dir.join(name));

        match (summary, timeline) {
            (Some(summary), Some(timeline)) => Ok(Self { summary, timeline }),
            _ => {
                error!("Noriben output files not found in {}", output_dir.display());
                Err(ParseError::OutputNotFound(output_dir.to_path_buf()))
            }
        }
    }
}

/// Builds a [`Report`] from a Noriben output directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportParser;

impl ReportParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, output_dir: &Path) -> Result<Report, ParseError> {
        let files = OutputFiles::locate(output_dir)?;
        info!(
            "Parsing results from: {}, {}",
            files.summary.display(),
            files.timeline.display()
        );

        let summary = match read_text(&files.summary) {
            Ok(text) => parse_summary(&text),
            Err(e) => {
                error!("Failed to parse TXT report {}: {}", files.summary.display(), e);
                SummaryReport::default()
            }
        };

        let timeline = match read_text(&files.timeline) {
            Ok(text) => parse_timeline(&text),
            Err(e) => {
                error!("Failed to parse CSV timeline {}: {}", files.timeline.display(), e);
                Timeline::default()
            }
        };

        let report = Report::from_parts(summary, timeline);
        info!(
            "Parsed {} process events, {} file events, {} registry events, {} network events",
            report.process_activity.len(),
            report.file_system.len(),
            report.registry.len(),
            report.network.len()
        );
        Ok(report)
    }
}

/// Read a Noriben artifact as text.
///
/// Invalid UTF-8 is replaced rather than rejected, a leading BOM is dropped
/// and Windows line endings become `\n`.
pub fn read_text(path: &Path) -> std::io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(decode_text(&bytes))
}

pub fn decode_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    text.replace("\r\n", "\n")
}
