//! End-to-end analysis of one uploaded sample.
//!
//! `analyze` is the single entry point used by both the HTTP server and the
//! CLI: materialize the upload, optionally unpack it, run Noriben, parse its
//! output. Each call is blocking and sequential.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::config::Config;
use crate::error::{AnalysisError, AnalysisResult};
use crate::extract::ArchiveExtractor;
use crate::report::{Report, ReportParser};
use crate::supervisor::ExecutionSupervisor;
use crate::workspace::{
    remove_dir_if_exists, upload_extension, validate_analysis_id, CleanupGuard, Workspace,
};

/// An uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-side filename; only its extension is used.
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: Option<String>, bytes: Vec<u8>) -> Self {
        Self { filename, bytes }
    }

    /// Read a local file as an upload (used by the CLI).
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = fs::read(path)?;
        let filename = path.file_name().map(|n| n.to_string_lossy().to_string());
        Ok(Self { filename, bytes })
    }
}

/// Response body shared by `/analyze`, `/cleanup` and the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<Report>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResponse {
    pub fn ok(report: Report) -> Self {
        Self {
            success: true,
            report: Some(report),
            error: None,
        }
    }

    pub fn done() -> Self {
        Self {
            success: true,
            report: None,
            error: None,
        }
    }

    pub fn failed(err: &AnalysisError) -> Self {
        Self {
            success: false,
            report: None,
            error: Some(err.to_string()),
        }
    }
}

impl From<AnalysisResult<Report>> for AnalysisResponse {
    fn from(result: AnalysisResult<Report>) -> Self {
        match result {
            Ok(report) => Self::ok(report),
            Err(e) => Self::failed(&e),
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthInfo {
    pub status: &'static str,
    pub noriben_path: String,
    pub work_dir: String,
    pub timeout: u64,
}

/// Wires extraction, execution and parsing together.
pub struct AnalysisCoordinator {
    config: Config,
    workspace: Workspace,
    extractor: ArchiveExtractor,
    supervisor: ExecutionSupervisor,
    parser: ReportParser,
}

impl AnalysisCoordinator {
    pub fn new(config: Config) -> Self {
        let extractor = ArchiveExtractor::new(&config);
        Self::with_extractor(config, extractor)
    }

    /// Use a specific extractor instead of the configured one.
    pub fn with_extractor(config: Config, extractor: ArchiveExtractor) -> Self {
        Self {
            workspace: Workspace::new(config.work_directory()),
            supervisor: ExecutionSupervisor::new(&config),
            parser: ReportParser::new(),
            extractor,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Analyze one upload and return its behavioral report.
    ///
    /// Only the Noriben output directory `{work_dir}/{analysis_id}` survives
    /// the call; it stays until [`cleanup`](Self::cleanup).
    pub fn analyze(
        &self,
        upload: Upload,
        analysis_id: &str,
        password: Option<&str>,
        is_zip: bool,
    ) -> AnalysisResult<Report> {
        validate_analysis_id(analysis_id).map_err(AnalysisError::Upload)?;
        let password = password.filter(|p| !p.is_empty());

        self.workspace
            .ensure_root()
            .map_err(|e| AnalysisError::workspace("creating work directory", e))?;

        let ext = upload_extension(upload.filename.as_deref());
        let upload_path = self.workspace.upload_path(analysis_id, ext.as_deref());
        fs::write(&upload_path, &upload.bytes)
            .map_err(|e| AnalysisError::workspace("saving upload", e))?;
        info!(
            "Received file: {} ({} bytes)",
            upload.filename.as_deref().unwrap_or("<unnamed>"),
            upload.bytes.len()
        );

        let sample = if is_zip {
            self.unpack(&upload_path, analysis_id, password)?
        } else {
            upload_path
        };

        let output_dir = self
            .supervisor
            .run(&sample, analysis_id)?
            .into_output_dir()
            .inspect_err(|e| error!("Analysis {} failed: {}", analysis_id, e))?;

        let report = self.parser.parse(&output_dir).inspect_err(|e| {
            error!("Failed to parse Noriben output for {}: {}", analysis_id, e)
        })?;

        info!("Analysis {} complete", analysis_id);
        Ok(report)
    }

    /// Extract an uploaded archive; the archive itself never outlives this call.
    fn unpack(
        &self,
        archive: &Path,
        analysis_id: &str,
        password: Option<&str>,
    ) -> AnalysisResult<PathBuf> {
        let _archive = CleanupGuard::new().remove_file(archive);
        info!("Extracting zip file...");

        match self.extractor.extract(archive, analysis_id, password) {
            Ok(sample) => Ok(sample),
            Err(e) => {
                let _extracted =
                    CleanupGuard::new().remove_dir(self.workspace.extract_dir(analysis_id));
                error!("Failed to extract zip file: {}", e);
                Err(e.into())
            }
        }
    }

    /// Remove the output directory of a finished analysis.
    ///
    /// Idempotent: an unknown or already removed id is not an error.
    pub fn cleanup(&self, analysis_id: &str) -> AnalysisResult<()> {
        validate_analysis_id(analysis_id).map_err(AnalysisError::Upload)?;
        let dir = self.workspace.output_dir(analysis_id);
        match remove_dir_if_exists(&dir) {
            Ok(true) => info!("Cleaned up analysis: {}", analysis_id),
            Ok(false) => info!("Nothing to clean up for: {}", analysis_id),
            Err(e) => {
                error!("Cleanup failed for {}: {}", analysis_id, e);
                return Err(AnalysisError::workspace("removing output directory", e));
            }
        }
        Ok(())
    }

    pub fn health(&self) -> HealthInfo {
        HealthInfo {
            status: "healthy",
            noriben_path: self.config.monitor.noriben_path.clone(),
            work_dir: self.workspace.root().to_string_lossy().to_string(),
            timeout: self.config.monitor.timeout_secs,
        }
    }
}
