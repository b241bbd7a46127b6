//! Archive extraction with password recovery.
//!
//! Uploaded samples usually arrive as password-protected ZIPs. This module
//! provides the Strategy pattern over the tools that can unpack them:
//!
//! - **7z**: `7z x <archive> -o<dir> -y -p<password>`
//! - **unzip**: `unzip -o <archive> -d <dir> [-P <password>]`
//! - **builtin**: the `zip` crate, in process
//!
//! The backend is picked once from configuration. Password handling lives in
//! [`ArchiveExtractor`] so every backend tries the same passwords in the same
//! order.

mod builtin;
mod seven_zip;
mod unzip;

pub use builtin::BuiltinBackend;
pub use seven_zip::SevenZipBackend;
pub use unzip::UnzipBackend;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::workspace::Workspace;

/// Passwords tried, in order, when the caller did not supply one.
pub const COMMON_PASSWORDS: [&str; 4] = ["infected", "malware", "virus", "password"];

/// Extensions accepted as a runnable sample, highest priority first.
pub const EXECUTABLE_EXTENSIONS: [&str; 6] = ["exe", "dll", "scr", "bat", "cmd", "ps1"];

/// Why a single backend attempt did not produce files.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("{0}")]
    Rejected(String),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for extraction backends (Strategy pattern).
///
/// A backend performs exactly one attempt with one password (or none). It does
/// not retry; the caller decides what to try next.
pub trait ExtractBackend: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &'static str;

    /// Unpack `archive` into `dest` using `password`, bounded by `timeout`.
    fn attempt(
        &self,
        archive: &Path,
        dest: &Path,
        password: Option<&str>,
        timeout: Duration,
    ) -> Result<(), AttemptError>;
}

/// Extraction backends selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtractorKind {
    #[default]
    #[serde(rename = "7z")]
    SevenZip,
    #[serde(rename = "unzip")]
    Unzip,
    #[serde(rename = "builtin", alias = "python")]
    Builtin,
}

impl ExtractorKind {
    /// Create the backend for this kind. `tool_path` is ignored by the builtin one.
    pub fn create_backend(&self, tool_path: &str) -> Box<dyn ExtractBackend> {
        match self {
            ExtractorKind::SevenZip => Box::new(SevenZipBackend::new(tool_path)),
            ExtractorKind::Unzip => Box::new(UnzipBackend::new(tool_path)),
            ExtractorKind::Builtin => Box::new(BuiltinBackend::new()),
        }
    }
}

impl FromStr for ExtractorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "7z" | "7zip" => Ok(ExtractorKind::SevenZip),
            "unzip" => Ok(ExtractorKind::Unzip),
            "builtin" | "python" => Ok(ExtractorKind::Builtin),
            other => Err(format!(
                "Unknown extraction backend '{}'. Valid: 7z, unzip, builtin",
                other
            )),
        }
    }
}

impl std::fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractorKind::SevenZip => write!(f, "7z"),
            ExtractorKind::Unzip => write!(f, "unzip"),
            ExtractorKind::Builtin => write!(f, "builtin"),
        }
    }
}

/// Errors from archive extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{backend} could not extract the archive: {reason}")]
    ExtractionFailed {
        backend: &'static str,
        reason: String,
    },

    #[error("No executable found in archive")]
    NoExecutable,

    #[error("Failed to prepare extraction directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Unpacks an uploaded archive and picks the sample inside it.
pub struct ArchiveExtractor {
    backend: Box<dyn ExtractBackend>,
    workspace: Workspace,
    timeout: Duration,
}

impl ArchiveExtractor {
    /// Build the extractor selected by `config`.
    pub fn new(config: &Config) -> Self {
        Self::with_backend(
            config
                .extraction
                .backend
                .create_backend(&config.extraction.tool_path),
            Workspace::new(config.work_directory()),
            config.extraction_timeout(),
        )
    }

    /// Build an extractor around an explicit backend.
    pub fn with_backend(
        backend: Box<dyn ExtractBackend>,
        workspace: Workspace,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            workspace,
            timeout,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Extract `archive` into `{work_dir}/{analysis_id}_extracted` and return
    /// the highest-priority executable found there.
    ///
    /// The extracted files are left on disk for the caller to clean up.
    pub fn extract(
        &self,
        archive: &Path,
        analysis_id: &str,
        password: Option<&str>,
    ) -> Result<PathBuf, ExtractError> {
        let dest = self.workspace.extract_dir(analysis_id);
        fs::create_dir_all(&dest).map_err(|source| ExtractError::Io {
            path: dest.clone(),
            source,
        })?;
        info!("Extracting to: {}", dest.display());

        self.unpack(archive, &dest, password)?;

        match find_executable(&dest) {
            Some(path) => {
                info!("Extracted executable: {}", path.display());
                Ok(path)
            }
            None => {
                error!("No executable found in archive");
                Err(ExtractError::NoExecutable)
            }
        }
    }

    /// Run the password policy against the configured backend.
    fn unpack(&self, archive: &Path, dest: &Path, password: Option<&str>) -> Result<(), ExtractError> {
        let name = self.backend.name();
        info!("Extracting with {}: {}", name, archive.display());

        let candidates: Vec<Option<&str>> = match password {
            Some(pw) => vec![Some(pw)],
            None => std::iter::once(None)
                .chain(COMMON_PASSWORDS.iter().copied().map(Some))
                .collect(),
        };

        let mut last_error = String::from("no attempt made");
        for (idx, candidate) in candidates.iter().enumerate() {
            match self.backend.attempt(archive, dest, *candidate, self.timeout) {
                Ok(()) => {
                    if password.is_none() && idx > 0 {
                        info!("{} extraction successful with common password #{}", name, idx);
                    } else {
                        info!("{} extraction successful", name);
                    }
                    return Ok(());
                }
                Err(AttemptError::TimedOut(limit)) => {
                    warn!("{} extraction timed out after {:?}", name, limit);
                    return Err(ExtractError::ExtractionFailed {
                        backend: name,
                        reason: format!("timed out after {:?}", limit),
                    });
                }
                Err(e) => last_error = e.to_string(),
            }
        }

        error!("{} extraction failed: {}", name, last_error);
        Err(ExtractError::ExtractionFailed {
            backend: name,
            reason: last_error,
        })
    }
}

/// Find the sample to run among extracted files.
///
/// Every file under `dir` is considered. A match on an earlier entry of
/// [`EXECUTABLE_EXTENSIONS`] always wins; ties go to the smallest path.
pub fn find_executable(dir: &Path) -> Option<PathBuf> {
    let mut best: Option<(usize, PathBuf)> = None;

    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let Some(rank) = extension_rank(entry.path()) else {
            continue;
        };
        let better = match &best {
            None => true,
            Some((best_rank, best_path)) => {
                rank < *best_rank || (rank == *best_rank && entry.path() < best_path.as_path())
            }
        };
        if better {
            best = Some((rank, entry.into_path()));
        }
    }

    best.map(|(_, path)| path)
}

/// Priority of a path's extension within [`EXECUTABLE_EXTENSIONS`].
fn extension_rank(path: &Path) -> Option<usize> {
    let ext = path.extension()?.to_str()?;
    EXECUTABLE_EXTENSIONS
        .iter()
        .position(|candidate| candidate.eq_ignore_ascii_case(ext))
}

/// Map the result of waiting on an external extraction tool to an attempt result.
fn attempt_result(
    result: std::io::Result<crate::process::CapturedOutput>,
    timeout: Duration,
) -> Result<(), AttemptError> {
    match result {
        Ok(output) if output.status.success() => Ok(()),
        Ok(output) => {
            let detail = if output.stderr.trim().is_empty() {
                &output.stdout
            } else {
                &output.stderr
            };
            Err(AttemptError::Rejected(format!(
                "exit code {}: {}",
                output.status.code().unwrap_or(-1),
                crate::process::truncate_output(detail, 200)
            )))
        }
        Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Err(AttemptError::TimedOut(timeout)),
        Err(e) => Err(AttemptError::Io(e)),
    }
}
