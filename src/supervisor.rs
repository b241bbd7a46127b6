//! Supervised Noriben execution.
//!
//! Runs `python Noriben.py --cmd <sample> --timeout <secs> --headless --output <dir>`
//! from Noriben's own directory, under a hard wall-clock limit of the analysis
//! timeout plus a shutdown grace period. The sample and the extraction
//! directory are removed however the run ends.

use humansize::{format_size, BINARY};
use std::fs;
use std::io;
use std::path::{self, Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{AnalysisError, AnalysisResult};
use crate::process::{truncate_output, wait_with_timeout};
use crate::workspace::{CleanupGuard, Workspace};

/// Characters of Noriben's stdout shown in the log on a normal run.
const STDOUT_LOG_CHARS: usize = 500;

/// How a Noriben run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    Success,
    ExitCode(i32),
    /// Killed by a signal; no exit code.
    Terminated,
    TimedOut(Duration),
    LaunchFailed(String),
}

/// Result of one supervised run.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub status: ExecutionStatus,
    pub stdout: String,
    pub stderr: String,
    pub output_dir: PathBuf,
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    /// The output directory on success, otherwise the matching error.
    pub fn into_output_dir(self) -> AnalysisResult<PathBuf> {
        match self.status {
            ExecutionStatus::Success => Ok(self.output_dir),
            ExecutionStatus::ExitCode(code) => Err(AnalysisError::Execution {
                code,
                stderr: self.stderr,
            }),
            ExecutionStatus::Terminated => Err(AnalysisError::Terminated {
                stderr: self.stderr,
            }),
            ExecutionStatus::TimedOut(limit) => Err(AnalysisError::Timeout(limit)),
            ExecutionStatus::LaunchFailed(msg) => Err(AnalysisError::Launch(msg)),
        }
    }
}

/// Runs Noriben against a sample and owns the sample's cleanup.
#[derive(Debug, Clone)]
pub struct ExecutionSupervisor {
    python_path: String,
    noriben_path: PathBuf,
    timeout_secs: u64,
    deadline: Duration,
    workspace: Workspace,
}

impl ExecutionSupervisor {
    pub fn new(config: &Config) -> Self {
        Self {
            python_path: config.monitor.python_path.clone(),
            noriben_path: PathBuf::from(&config.monitor.noriben_path),
            timeout_secs: config.monitor.timeout_secs,
            deadline: config.monitor_deadline(),
            workspace: Workspace::new(config.work_directory()),
        }
    }

    /// Wall-clock limit after which Noriben is killed.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Execute Noriben on `sample_path`.
    ///
    /// `Err` is returned only for problems before launch (missing sample,
    /// unusable workspace). Everything that happens to the child process is
    /// reported through [`ExecutionOutcome::status`].
    pub fn run(&self, sample_path: &Path, analysis_id: &str) -> AnalysisResult<ExecutionOutcome> {
        let _cleanup = CleanupGuard::new()
            .remove_file(sample_path)
            .remove_dir(self.workspace.extract_dir(analysis_id));

        info!("Starting Noriben analysis: {}", analysis_id);

        let output_dir = self.workspace.output_dir(analysis_id);
        fs::create_dir_all(&output_dir)
            .map_err(|e| AnalysisError::workspace("creating output directory", e))?;

        // Noriben runs from its own directory, so relative paths would break
        let abs_sample = path::absolute(sample_path)
            .map_err(|e| AnalysisError::workspace("resolving sample path", e))?;
        let abs_noriben = path::absolute(&self.noriben_path)
            .map_err(|e| AnalysisError::workspace("resolving Noriben path", e))?;
        let abs_output = path::absolute(&output_dir)
            .map_err(|e| AnalysisError::workspace("resolving output directory", e))?;

        if !abs_sample.is_file() {
            error!("Sample file not found: {}", abs_sample.display());
            return Err(AnalysisError::SampleNotFound(abs_sample));
        }
        if let Ok(meta) = fs::metadata(&abs_sample) {
            info!("Sample file size: {}", format_size(meta.len(), BINARY));
        }

        let mut cmd = Command::new(&self.python_path);
        cmd.arg(&abs_noriben)
            .arg("--cmd")
            .arg(&abs_sample)
            .args(["--timeout", &self.timeout_secs.to_string()])
            .arg("--headless")
            .arg("--output")
            .arg(&abs_output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = abs_noriben.parent() {
            cmd.current_dir(dir);
        }
        info!("Executing: {:?}", cmd);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("Failed to launch Noriben: {}", e);
                return Ok(self.outcome(
                    ExecutionStatus::LaunchFailed(e.to_string()),
                    String::new(),
                    String::new(),
                    abs_output,
                ));
            }
        };

        let output = match wait_with_timeout(&mut child, self.deadline) {
            Ok(output) => output,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                error!("Noriben execution timed out after {:?}", self.deadline);
                return Ok(self.outcome(
                    ExecutionStatus::TimedOut(self.deadline),
                    String::new(),
                    String::new(),
                    abs_output,
                ));
            }
            Err(e) => {
                error!("Failed while waiting for Noriben: {}", e);
                return Ok(self.outcome(
                    ExecutionStatus::LaunchFailed(e.to_string()),
                    String::new(),
                    String::new(),
                    abs_output,
                ));
            }
        };

        info!("Noriben returned with code: {:?}", output.status.code());
        if !output.stdout.is_empty() {
            info!("STDOUT: {}", truncate_output(&output.stdout, STDOUT_LOG_CHARS));
        }

        let status = match output.status.code() {
            Some(0) => ExecutionStatus::Success,
            Some(code) => ExecutionStatus::ExitCode(code),
            None => ExecutionStatus::Terminated,
        };
        if status != ExecutionStatus::Success {
            error!("Noriben failed: {:?}", status);
            error!("STDERR: {}", output.stderr);
            error!("STDOUT: {}", output.stdout);
        }

        Ok(self.outcome(status, output.stdout, output.stderr, abs_output))
    }

    fn outcome(
        &self,
        status: ExecutionStatus,
        stdout: String,
        stderr: String,
        output_dir: PathBuf,
    ) -> ExecutionOutcome {
        ExecutionOutcome {
            status,
            stdout,
            stderr,
            output_dir,
        }
    }
}
