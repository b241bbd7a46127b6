//! Info-ZIP `unzip` backend.
//!
//! Invokes `unzip -o <archive> -d <dir> [-P <password>]`. Only understands
//! ZipCrypto, not AES.

use super::{attempt_result, AttemptError, ExtractBackend};
use crate::process::wait_with_timeout;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

/// Backend for the `unzip` command line tool.
#[derive(Debug, Clone)]
pub struct UnzipBackend {
    tool: String,
}

impl UnzipBackend {
    pub fn new(tool: impl Into<String>) -> Self {
        Self { tool: tool.into() }
    }

    fn args(archive: &Path, dest: &Path, password: Option<&str>) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            archive.display().to_string(),
            "-d".to_string(),
            dest.display().to_string(),
        ];
        if let Some(pw) = password {
            args.push("-P".to_string());
            args.push(pw.to_string());
        }
        args
    }
}

impl ExtractBackend for UnzipBackend {
    fn name(&self) -> &'static str {
        "unzip"
    }

    fn attempt(
        &self,
        archive: &Path,
        dest: &Path,
        password: Option<&str>,
        timeout: Duration,
    ) -> Result<(), AttemptError> {
        // stdin closed so an encrypted entry cannot block on a password prompt
        let mut child = Command::new(&self.tool)
            .args(Self::args(archive, dest, password))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        attempt_result(wait_with_timeout(&mut child, timeout), timeout)
    }
}
