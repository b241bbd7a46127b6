//! Error type for analysis requests.
//!
//! Every failure of an analysis ends up as one of these variants and is
//! reported to the caller as `{"success": false, "error": "<Display>"}`.
//! Cleanup problems are not errors; they are logged as warnings.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::extract::ExtractError;
use crate::process::truncate_output;
use crate::report::ParseError;

/// Result type for coordinator and supervisor operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Missing or unusable request input (file, analysis_id).
    #[error("{0}")]
    Upload(String),

    #[error("Failed to extract zip file: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Sample file not found: {}", .0.display())]
    SampleNotFound(PathBuf),

    #[error("Noriben execution failed (code {code}): {}", truncate_output(stderr, 2000))]
    Execution { code: i32, stderr: String },

    #[error("Noriben was terminated without an exit code: {}", truncate_output(stderr, 2000))]
    Terminated { stderr: String },

    #[error("Analysis timeout after {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("Failed to launch Noriben: {0}")]
    Launch(String),

    #[error("Failed to parse Noriben output: {0}")]
    Parse(#[from] ParseError),

    #[error("Workspace error during {operation}: {source}")]
    Workspace {
        operation: String,
        source: std::io::Error,
    },
}

impl AnalysisError {
    /// Whether the caller caused this failure (HTTP 400 rather than 500).
    ///
    /// An extraction directory that cannot be created is the agent's problem.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AnalysisError::Upload(_)
                | AnalysisError::Extraction(
                    ExtractError::ExtractionFailed { .. } | ExtractError::NoExecutable
                )
        )
    }

    pub(crate) fn workspace(operation: impl Into<String>, source: std::io::Error) -> Self {
        AnalysisError::Workspace {
            operation: operation.into(),
            source,
        }
    }
}
