//! Integration tests for archive extraction against real and fake tools

use std::fs;
use tempfile::TempDir;

use cupax_agent::{ArchiveExtractor, Config, ExtractError, ExtractorKind};

use crate::helpers::{write_zip, zip_bytes};

fn config_for(temp: &TempDir, backend: ExtractorKind, tool_path: &str) -> Config {
    let mut config = Config::default();
    config.workspace.work_dir = temp.path().join("work").to_string_lossy().to_string();
    config.extraction.backend = backend;
    config.extraction.tool_path = tool_path.to_string();
    config.extraction.timeout_secs = 5;
    config
}

#[test]
fn builtin_finds_list_password_without_hint() {
    let temp = TempDir::new().unwrap();
    let config = config_for(&temp, ExtractorKind::Builtin, "");
    let archive = temp.path().join("bundle.zip");
    write_zip(
        &archive,
        Some("virus"),
        &[("readme.txt", b"hello"), ("bin/dropper.exe", b"MZ\x90\x00")],
    );

    let sample = ArchiveExtractor::new(&config)
        .extract(&archive, "job", None)
        .unwrap();

    assert!(sample.ends_with("bin/dropper.exe"));
    assert_eq!(fs::read(&sample).unwrap(), b"MZ\x90\x00");
    assert!(sample.starts_with(config.work_directory().join("job_extracted")));
}

#[test]
fn builtin_unlisted_password_fails() {
    let temp = TempDir::new().unwrap();
    let config = config_for(&temp, ExtractorKind::Builtin, "");
    let archive = temp.path().join("bundle.zip");
    write_zip(&archive, Some("s3cr3t-not-listed"), &[("a.exe", b"MZ")]);

    let err = ArchiveExtractor::new(&config)
        .extract(&archive, "job", None)
        .unwrap_err();

    assert!(matches!(err, ExtractError::ExtractionFailed { backend: "builtin", .. }));
}

#[test]
fn builtin_supplied_password_is_used() {
    let temp = TempDir::new().unwrap();
    let config = config_for(&temp, ExtractorKind::Builtin, "");
    let archive = temp.path().join("bundle.zip");
    write_zip(&archive, Some("s3cr3t-not-listed"), &[("a.exe", b"MZ")]);

    let sample = ArchiveExtractor::new(&config)
        .extract(&archive, "job", Some("s3cr3t-not-listed"))
        .unwrap();
    assert!(sample.ends_with("a.exe"));
}

#[test]
fn builtin_archive_without_executable() {
    let temp = TempDir::new().unwrap();
    let config = config_for(&temp, ExtractorKind::Builtin, "");
    let archive = temp.path().join("bundle.zip");
    fs::write(&archive, zip_bytes(None, &[("notes.txt", b"x"), ("data.bin", b"y")])).unwrap();

    let err = ArchiveExtractor::new(&config)
        .extract(&archive, "job", None)
        .unwrap_err();
    assert!(matches!(err, ExtractError::NoExecutable));
}

#[test]
fn builtin_prefers_exe_over_dll() {
    let temp = TempDir::new().unwrap();
    let config = config_for(&temp, ExtractorKind::Builtin, "");
    let archive = temp.path().join("bundle.zip");
    write_zip(
        &archive,
        None,
        &[("aaa/loader.dll", b"MZ"), ("zzz/run.bat", b"@echo"), ("zzz/main.EXE", b"MZ")],
    );

    let sample = ArchiveExtractor::new(&config)
        .extract(&archive, "job", None)
        .unwrap();
    assert!(sample.ends_with("zzz/main.EXE"));
}

#[cfg(unix)]
mod external_tools {
    use super::*;
    use crate::helpers::write_script;

    /// Fake 7z: logs the `-p` argument, accepts only "malware".
    fn fake_7z(dir: &std::path::Path, log: &std::path::Path) -> String {
        let body = format!(
            r#"printf '%s\n' "$5" >> "{log}"
if [ "$5" != "-pmalware" ]; then
  echo "ERROR: Wrong password" >&2
  exit 2
fi
dest="${{3#-o}}"
mkdir -p "$dest"
printf 'MZ' > "$dest/payload.exe"
"#,
            log = log.display()
        );
        write_script(dir, "7z", &body).to_string_lossy().to_string()
    }

    #[test]
    fn seven_zip_tries_passwords_in_order() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("attempts.log");
        let tool = fake_7z(&temp.path().join("bin"), &log);
        let config = config_for(&temp, ExtractorKind::SevenZip, &tool);
        let archive = temp.path().join("bundle.zip");
        fs::write(&archive, b"PK").unwrap();

        let sample = ArchiveExtractor::new(&config)
            .extract(&archive, "job", None)
            .unwrap();

        assert!(sample.ends_with("payload.exe"));
        let attempts = fs::read_to_string(&log).unwrap();
        assert_eq!(
            attempts.lines().collect::<Vec<_>>(),
            vec!["-p", "-pinfected", "-pmalware"]
        );
    }

    #[test]
    fn seven_zip_wrong_supplied_password_is_single_attempt() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("attempts.log");
        let tool = fake_7z(&temp.path().join("bin"), &log);
        let config = config_for(&temp, ExtractorKind::SevenZip, &tool);
        let archive = temp.path().join("bundle.zip");
        fs::write(&archive, b"PK").unwrap();

        let err = ArchiveExtractor::new(&config)
            .extract(&archive, "job", Some("infected"))
            .unwrap_err();

        assert!(err.to_string().contains("Wrong password"));
        assert_eq!(fs::read_to_string(&log).unwrap().lines().count(), 1);
    }

    #[test]
    fn unzip_passes_password_with_flag() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("args.log");
        let body = format!(
            r#"printf '%s\n' "$*" >> "{log}"
[ "$6" = "infected" ] || exit 82
mkdir -p "$4"
printf 'MZ' > "$4/sample.scr"
"#,
            log = log.display()
        );
        let tool = write_script(&temp.path().join("bin"), "unzip", &body);
        let config = config_for(&temp, ExtractorKind::Unzip, &tool.to_string_lossy());
        let archive = temp.path().join("bundle.zip");
        fs::write(&archive, b"PK").unwrap();

        let sample = ArchiveExtractor::new(&config)
            .extract(&archive, "job", None)
            .unwrap();

        assert!(sample.ends_with("sample.scr"));
        let lines: Vec<String> = fs::read_to_string(&log)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("-o "));
        assert!(!lines[0].contains("-P"));
        assert!(lines[1].ends_with("-P infected"));
    }

    #[test]
    fn hung_tool_stops_password_loop() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("attempts.log");
        let body = format!("printf '%s\\n' \"$5\" >> \"{}\"\nsleep 30\n", log.display());
        let tool = write_script(&temp.path().join("bin"), "7z", &body);
        let mut config = config_for(&temp, ExtractorKind::SevenZip, &tool.to_string_lossy());
        config.extraction.timeout_secs = 1;
        let archive = temp.path().join("bundle.zip");
        fs::write(&archive, b"PK").unwrap();

        let err = ArchiveExtractor::new(&config)
            .extract(&archive, "job", None)
            .unwrap_err();

        assert!(err.to_string().contains("timed out"));
        assert_eq!(fs::read_to_string(&log).unwrap().lines().count(), 1);
    }
}
