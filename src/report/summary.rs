//! Parser for the Noriben text report (`Noriben_*.txt`).
//!
//! The report is free-form text. Timings appear as `Execution time: 12.5 seconds`
//! and each activity section looks like:
//!
//! ```text
//! Processes Created:
//! ==================
//! [CreateProcess] Explorer.EXE:1432 > "C:\sample.exe"	[Child PID: 2210]
//!
//! ```
//!
//! A section ends at the first blank line or at end of text.

use regex::Regex;
use std::sync::LazyLock;

use super::types::{Summary, SummaryReport};

static EXECUTION_TIME: LazyLock<Regex> =
    LazyLock::new(|| timing_pattern("Execution time"));
static PROCESSING_TIME: LazyLock<Regex> =
    LazyLock::new(|| timing_pattern("Processing time"));
static ANALYSIS_TIME: LazyLock<Regex> = LazyLock::new(|| timing_pattern("Analysis time"));

static PROCESSES: LazyLock<Regex> = LazyLock::new(|| section_pattern("Processes Created"));
static FILES: LazyLock<Regex> = LazyLock::new(|| section_pattern("File Activity"));
static REGISTRY: LazyLock<Regex> = LazyLock::new(|| section_pattern("Registry Activity"));
static NETWORK: LazyLock<Regex> = LazyLock::new(|| section_pattern("Network Traffic"));
static HOSTS: LazyLock<Regex> = LazyLock::new(|| section_pattern("Unique Hosts"));

fn timing_pattern(label: &str) -> Regex {
    Regex::new(&format!(r"{}: ([\d.]+) seconds", regex::escape(label)))
        .unwrap_or_else(|e| panic!("invalid timing pattern for {}: {}", label, e))
}

fn section_pattern(heading: &str) -> Regex {
    Regex::new(&format!(r"{}:\n={{15,}}(?:\n|\z)", regex::escape(heading)))
        .unwrap_or_else(|e| panic!("invalid section pattern for {}: {}", heading, e))
}

/// Parse normalized report text (`\n` line endings, no BOM).
pub fn parse_summary(text: &str) -> SummaryReport {
    let summary = Summary {
        execution_time: timing(&EXECUTION_TIME, text),
        processing_time: timing(&PROCESSING_TIME, text),
        analysis_time: timing(&ANALYSIS_TIME, text),
        processes_created: section_lines(&PROCESSES, text).count(),
        files_created: section_lines(&FILES, text).count(),
        registry_modified: section_lines(&REGISTRY, text).count(),
        network_connections: section_lines(&NETWORK, text).count(),
    };

    let unique_hosts = section_lines(&HOSTS, text)
        .map(|line| line.trim().to_string())
        .collect();

    SummaryReport {
        summary,
        unique_hosts,
    }
}

/// Seconds for a timing label; 0.0 when missing or not a number (e.g. "1.2.3").
fn timing(pattern: &Regex, text: &str) -> f64 {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0)
}

/// Non-blank lines of a section body; empty when the section is absent.
///
/// The body starts after the underline and stops at the first empty line.
fn section_lines<'t>(pattern: &Regex, text: &'t str) -> impl Iterator<Item = &'t str> {
    let body = pattern.find(text).map(|m| &text[m.end()..]).unwrap_or("");
    body.split('\n')
        .take_while(|line| !line.is_empty())
        .filter(|line| !line.trim().is_empty())
}
