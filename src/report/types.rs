//! Report types emitted to the backend as JSON.

use serde::{Deserialize, Serialize};

/// Complete analysis report for one sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub summary: Summary,
    pub process_activity: Vec<ProcessEvent>,
    pub file_system: Vec<FileEvent>,
    pub registry: Vec<RegistryEvent>,
    pub network: Vec<NetworkEvent>,
    pub unique_hosts: Vec<String>,
}

impl Report {
    pub fn from_parts(summary: SummaryReport, timeline: Timeline) -> Self {
        Self {
            summary: summary.summary,
            process_activity: timeline.process_activity,
            file_system: timeline.file_system,
            registry: timeline.registry,
            network: timeline.network,
            unique_hosts: summary.unique_hosts,
        }
    }
}

/// Timing and section counts from the Noriben text report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub execution_time: f64,
    pub processing_time: f64,
    pub analysis_time: f64,
    pub processes_created: usize,
    pub files_created: usize,
    pub registry_modified: usize,
    pub network_connections: usize,
}

/// Everything taken from the text report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryReport {
    pub summary: Summary,
    pub unique_hosts: Vec<String>,
}

/// Events taken from the timeline CSV, each list in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    pub process_activity: Vec<ProcessEvent>,
    pub file_system: Vec<FileEvent>,
    pub registry: Vec<RegistryEvent>,
    pub network: Vec<NetworkEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessEvent {
    pub timestamp: String,
    pub process_name: String,
    pub pid: String,
    pub command_line: String,
    pub child_pid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEvent {
    pub timestamp: String,
    pub operation: String,
    pub process_name: String,
    pub pid: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yara_hits: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vt_hits: Option<String>,
    /// Destination of a `RenameFile`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEvent {
    pub timestamp: String,
    pub operation: String,
    pub process_name: String,
    pub pid: String,
    pub path: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEvent {
    pub timestamp: String,
    pub protocol: String,
    pub direction: String,
    pub process_name: String,
    pub pid: String,
    pub remote_addr: String,
}
