//! 7-Zip backend.
//!
//! Invokes `7z x <archive> -o<dir> -y -p<password>`. Handles every format 7-Zip
//! knows, including AES-encrypted ZIPs.

use super::{attempt_result, AttemptError, ExtractBackend};
use crate::process::wait_with_timeout;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

/// Backend for the 7-Zip command line tool.
#[derive(Debug, Clone)]
pub struct SevenZipBackend {
    tool: String,
}

impl SevenZipBackend {
    pub fn new(tool: impl Into<String>) -> Self {
        Self { tool: tool.into() }
    }

    /// Arguments for one attempt. An empty `-p` keeps 7z from prompting.
    fn args(archive: &Path, dest: &Path, password: Option<&str>) -> Vec<String> {
        vec![
            "x".to_string(),
            archive.display().to_string(),
            format!("-o{}", dest.display()),
            "-y".to_string(),
            format!("-p{}", password.unwrap_or("")),
        ]
    }
}

impl ExtractBackend for SevenZipBackend {
    fn name(&self) -> &'static str {
        "7z"
    }

    fn attempt(
        &self,
        archive: &Path,
        dest: &Path,
        password: Option<&str>,
        timeout: Duration,
    ) -> Result<(), AttemptError> {
        let mut child = Command::new(&self.tool)
            .args(Self::args(archive, dest, password))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        attempt_result(wait_with_timeout(&mut child, timeout), timeout)
    }
}
