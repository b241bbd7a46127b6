//! Per-analysis working directories and their cleanup.
//!
//! Every path is derived from the analysis identifier:
//!
//! - `{work_dir}/{id}` - Noriben output, kept until `cleanup`
//! - `{work_dir}/{id}_extracted` - unpacked archive contents
//! - `{work_dir}/{id}_upload{ext}` - the uploaded file as received

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Path layout under the working-directory root.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensure the working-directory root exists
    pub fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root)
    }

    pub fn output_dir(&self, analysis_id: &str) -> PathBuf {
        self.root.join(analysis_id)
    }

    pub fn extract_dir(&self, analysis_id: &str) -> PathBuf {
        self.root.join(format!("{}_extracted", analysis_id))
    }

    /// Upload path keeping the original extension (".exe", ".zip", ...).
    pub fn upload_path(&self, analysis_id: &str, extension: Option<&str>) -> PathBuf {
        match extension {
            Some(ext) => self.root.join(format!("{}_upload.{}", analysis_id, ext)),
            None => self.root.join(format!("{}_upload", analysis_id)),
        }
    }
}

/// Check that an analysis identifier is usable as a single path component.
pub fn validate_analysis_id(analysis_id: &str) -> Result<(), String> {
    if analysis_id.trim().is_empty() {
        return Err("analysis_id required".to_string());
    }
    if analysis_id == "." || analysis_id == ".." {
        return Err(format!("Invalid analysis_id: {}", analysis_id));
    }
    if analysis_id
        .chars()
        .any(|c| c == '/' || c == '\\' || c == ':' || c.is_control())
    {
        return Err(format!("Invalid analysis_id: {}", analysis_id));
    }
    Ok(())
}

/// Extension of an uploaded filename, if it is plain alphanumeric.
pub fn upload_extension(filename: Option<&str>) -> Option<String> {
    let name = filename?;
    // Browsers may send a full client path; only the final component matters
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let ext = Path::new(name).extension()?.to_str()?;
    if !ext.is_empty() && ext.len() <= 16 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(ext.to_string())
    } else {
        None
    }
}

/// Remove a directory tree; an absent directory is not an error.
pub fn remove_dir_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Remove a file; an absent file is not an error.
pub fn remove_file_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Removes the registered paths when dropped.
///
/// Runs on every exit from the owning scope: normal return, `?`, timeout, or a
/// panic unwinding through it. Failures become warnings and never replace the
/// result the scope is returning.
#[derive(Debug, Default)]
pub struct CleanupGuard {
    files: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
}

impl CleanupGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    pub fn remove_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.dirs.push(path.into());
        self
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        for file in &self.files {
            match remove_file_if_exists(file) {
                Ok(true) => info!("Cleaned up sample: {}", file.display()),
                Ok(false) => {}
                Err(e) => warn!("Failed to cleanup {}: {}", file.display(), e),
            }
        }
        for dir in &self.dirs {
            match remove_dir_if_exists(dir) {
                Ok(true) => info!("Cleaned up directory: {}", dir.display()),
                Ok(false) => {}
                Err(e) => warn!("Failed to cleanup directory {}: {}", dir.display(), e),
            }
        }
    }
}
