//! Test helper utilities

#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::unstable::write::FileOptionsExt;
use zip::write::SimpleFileOptions;

use cupax_agent::{Config, ExtractorKind};

/// Get the path to the fixtures directory
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Load a fixture file's contents
pub fn load_fixture(name: &str) -> String {
    let path = fixtures_dir().join(name);
    fs::read_to_string(&path).unwrap_or_else(|_| panic!("Failed to load fixture: {}", name))
}

/// Write an executable shell script.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    fs::create_dir_all(dir).expect("Failed to create script dir");
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}", body)).expect("Failed to write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("Failed to chmod script");
    path
}

/// A stand-in for Noriben.py that drops the fixture reports into `--output`.
///
/// Run as `sh Noriben.sh --cmd S --timeout T --headless --output O`, so the
/// output directory is `$7`.
#[cfg(unix)]
pub fn fake_noriben(dir: &Path) -> PathBuf {
    let body = format!(
        "echo \"$2\" > \"$7/sample_path.txt\"\ncp \"{}\"/Noriben_* \"$7\"/\necho 'Noriben finished'\n",
        fixtures_dir().display()
    );
    write_script(&dir.join("noriben"), "Noriben.sh", &body)
}

/// A Noriben stand-in with a custom script body.
#[cfg(unix)]
pub fn scripted_noriben(dir: &Path, body: &str) -> PathBuf {
    write_script(&dir.join("noriben"), "Noriben.sh", body)
}

/// Config rooted in `temp` that runs `noriben` through `sh`.
pub fn test_config(temp: &TempDir, noriben: &Path) -> Config {
    let mut config = Config::default();
    config.monitor.python_path = "sh".to_string();
    config.monitor.noriben_path = noriben.to_string_lossy().to_string();
    config.monitor.timeout_secs = 5;
    config.monitor.shutdown_grace_secs = 5;
    config.workspace.work_dir = temp.path().join("work").to_string_lossy().to_string();
    config.extraction.backend = ExtractorKind::Builtin;
    config.extraction.timeout_secs = 10;
    config
}

/// Write a zip archive, ZipCrypto-encrypted when `password` is given.
pub fn write_zip(path: &Path, password: Option<&str>, entries: &[(&str, &[u8])]) {
    let mut writer = zip::ZipWriter::new(File::create(path).expect("Failed to create zip"));
    for (name, data) in entries {
        let options = match password {
            Some(pw) => SimpleFileOptions::default().with_deprecated_encryption(pw.as_bytes()),
            None => SimpleFileOptions::default(),
        };
        writer.start_file(*name, options).expect("Failed to start zip entry");
        writer.write_all(data).expect("Failed to write zip entry");
    }
    writer.finish().expect("Failed to finish zip");
}

/// Zip bytes in memory, for uploads.
pub fn zip_bytes(password: Option<&str>, entries: &[(&str, &[u8])]) -> Vec<u8> {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = temp.path().join("upload.zip");
    write_zip(&path, password, entries);
    fs::read(&path).expect("Failed to read zip")
}

/// Names of the entries directly under `dir`, sorted.
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}
