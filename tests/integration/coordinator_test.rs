//! Integration tests for the end-to-end analysis pipeline

#![cfg(unix)]

use std::fs;
use tempfile::TempDir;

use cupax_agent::{AnalysisCoordinator, AnalysisError, AnalysisResponse, Upload};

use crate::helpers::{dir_entries, fake_noriben, scripted_noriben, test_config, zip_bytes};

#[test]
fn plain_upload_produces_report() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp, &fake_noriben(temp.path()));
    let work = config.work_directory();
    let coordinator = AnalysisCoordinator::new(config);

    let report = coordinator
        .analyze(
            Upload::new(Some("evil.exe".into()), b"MZ".to_vec()),
            "job1",
            None,
            false,
        )
        .unwrap();

    assert_eq!(report.summary.processes_created, 3);
    assert_eq!(report.summary.execution_time, 62.41);
    assert_eq!(report.process_activity.len(), 3);
    assert_eq!(report.network.len(), 2);

    // Noriben saw the upload under its derived name
    let seen = fs::read_to_string(work.join("job1").join("sample_path.txt")).unwrap();
    assert!(seen.trim().ends_with("job1_upload.exe"));

    // Only the output directory survives
    assert_eq!(dir_entries(&work), vec!["job1"]);
}

#[test]
fn zip_upload_runs_extracted_executable() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp, &fake_noriben(temp.path()));
    let work = config.work_directory();
    let coordinator = AnalysisCoordinator::new(config);
    let bytes = zip_bytes(
        Some("infected"),
        &[("readme.txt", b"x"), ("stage/loader.dll", b"MZ"), ("stage/run.exe", b"MZ")],
    );

    coordinator
        .analyze(Upload::new(Some("bundle.zip".into()), bytes), "job2", None, true)
        .unwrap();

    let seen = fs::read_to_string(work.join("job2").join("sample_path.txt")).unwrap();
    assert!(seen.trim().ends_with("job2_extracted/stage/run.exe"));
    assert_eq!(dir_entries(&work), vec!["job2"]);
}

#[test]
fn failed_extraction_skips_monitor_and_cleans_up() {
    let temp = TempDir::new().unwrap();
    let marker = temp.path().join("monitor_ran");
    let noriben = scripted_noriben(temp.path(), &format!("touch \"{}\"\n", marker.display()));
    let config = test_config(&temp, &noriben);
    let work = config.work_directory();
    let coordinator = AnalysisCoordinator::new(config);
    let bytes = zip_bytes(None, &[("notes.txt", b"no executables here")]);

    let err = coordinator
        .analyze(Upload::new(Some("bundle.zip".into()), bytes), "job3", None, true)
        .unwrap_err();

    assert!(matches!(err, AnalysisError::Extraction(_)));
    assert!(err.is_client_error());
    assert!(err.to_string().starts_with("Failed to extract zip file"));
    assert!(!marker.exists());
    assert!(dir_entries(&work).is_empty());
}

#[test]
fn nonzero_exit_reports_code_and_stderr() {
    let temp = TempDir::new().unwrap();
    let noriben = scripted_noriben(temp.path(), "echo 'Procmon.exe not found' >&2\nexit 1\n");
    let coordinator = AnalysisCoordinator::new(test_config(&temp, &noriben));

    let err = coordinator
        .analyze(Upload::new(Some("a.exe".into()), b"MZ".to_vec()), "job4", None, false)
        .unwrap_err();

    let msg = err.to_string();
    assert!(msg.starts_with("Noriben execution failed (code 1)"));
    assert!(msg.contains("Procmon.exe not found"));
    assert!(!err.is_client_error());
}

#[test]
fn missing_output_is_parse_failure() {
    let temp = TempDir::new().unwrap();
    let noriben = scripted_noriben(temp.path(), "echo 'nothing written'\n");
    let coordinator = AnalysisCoordinator::new(test_config(&temp, &noriben));

    let err = coordinator
        .analyze(Upload::new(Some("a.exe".into()), b"MZ".to_vec()), "job5", None, false)
        .unwrap_err();

    assert!(matches!(err, AnalysisError::Parse(_)));
    assert!(err.to_string().starts_with("Failed to parse Noriben output"));
}

#[test]
fn overrunning_monitor_times_out() {
    let temp = TempDir::new().unwrap();
    let noriben = scripted_noriben(temp.path(), "sleep 30\n");
    let mut config = test_config(&temp, &noriben);
    config.monitor.timeout_secs = 1;
    config.monitor.shutdown_grace_secs = 0;
    let work = config.work_directory();
    let coordinator = AnalysisCoordinator::new(config);

    let err = coordinator
        .analyze(Upload::new(Some("a.exe".into()), b"MZ".to_vec()), "job6", None, false)
        .unwrap_err();

    assert!(matches!(err, AnalysisError::Timeout(_)));
    assert!(!work.join("job6_upload.exe").exists());
}

#[test]
fn response_wraps_outcome() {
    let temp = TempDir::new().unwrap();
    let coordinator = AnalysisCoordinator::new(test_config(&temp, &fake_noriben(temp.path())));

    let ok = AnalysisResponse::from(coordinator.analyze(
        Upload::new(Some("a.exe".into()), b"MZ".to_vec()),
        "job7",
        None,
        false,
    ));
    assert!(ok.success);
    assert!(ok.report.is_some());
    assert!(ok.error.is_none());

    let failed = AnalysisResponse::from(coordinator.analyze(
        Upload::new(Some("a.exe".into()), b"MZ".to_vec()),
        "../escape",
        None,
        false,
    ));
    assert!(!failed.success);
    assert!(failed.error.unwrap().contains("Invalid analysis_id"));
}

#[test]
fn cleanup_after_analysis_twice() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp, &fake_noriben(temp.path()));
    let work = config.work_directory();
    let coordinator = AnalysisCoordinator::new(config);
    coordinator
        .analyze(Upload::new(None, b"MZ".to_vec()), "job8", None, false)
        .unwrap();
    assert!(work.join("job8").exists());

    coordinator.cleanup("job8").unwrap();
    coordinator.cleanup("job8").unwrap();
    assert!(!work.join("job8").exists());
}
