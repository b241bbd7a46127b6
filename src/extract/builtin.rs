//! In-process ZIP backend using the `zip` crate.
//!
//! Needs no external tool. Handles stored/deflated entries with ZipCrypto or
//! AES encryption.

use super::{AttemptError, ExtractBackend};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Backend that unpacks ZIP archives in process.
#[derive(Debug, Clone, Default)]
pub struct BuiltinBackend;

impl BuiltinBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ExtractBackend for BuiltinBackend {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn attempt(
        &self,
        archive: &Path,
        dest: &Path,
        password: Option<&str>,
        timeout: Duration,
    ) -> Result<(), AttemptError> {
        let start = Instant::now();
        let file = File::open(archive)?;
        let mut zip = zip::ZipArchive::new(file)
            .map_err(|e| AttemptError::Rejected(format!("not a readable ZIP archive: {}", e)))?;

        debug!(
            "Opening ZIP archive: {} ({} entries, password: {})",
            archive.display(),
            zip.len(),
            password.map(|_| "***").unwrap_or("none")
        );

        for i in 0..zip.len() {
            // Checked between entries; a single huge entry can overrun the limit
            if start.elapsed() >= timeout {
                return Err(AttemptError::TimedOut(timeout));
            }

            let mut entry = match password {
                Some(pw) => zip.by_index_decrypt(i, pw.as_bytes()),
                None => zip.by_index(i),
            }
            .map_err(|e| AttemptError::Rejected(e.to_string()))?;

            // Sanitize path to prevent zip slip
            let Some(relative) = entry.enclosed_name() else {
                warn!("Skipping unsafe entry path: {}", entry.name());
                continue;
            };
            let outpath = dest.join(relative);
            trace!("Entry {}: {}", i, outpath.display());

            if entry.is_dir() {
                fs::create_dir_all(&outpath)?;
                continue;
            }
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut out = File::create(&outpath)?;
            // A wrong ZipCrypto password can pass the header check and only
            // fail here, on decompression or CRC mismatch
            if let Err(e) = io::copy(&mut entry, &mut out) {
                drop(out);
                let _ = fs::remove_file(&outpath);
                return Err(AttemptError::Rejected(format!(
                    "failed to read {}: {}",
                    entry.name(),
                    e
                )));
            }
        }

        Ok(())
    }
}
