//! Configuration type definitions and defaults

use serde::{Deserialize, Serialize};

use crate::extract::ExtractorKind;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

/// Noriben invocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Path to Noriben.py
    #[serde(default = "default_noriben_path")]
    pub noriben_path: String,
    /// Interpreter used to launch Noriben ("python" on Windows)
    #[serde(default = "default_python_path")]
    pub python_path: String,
    /// Analysis duration handed to Noriben via --timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra time Noriben gets to stop Procmon and write its reports
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

pub fn default_noriben_path() -> String {
    "Noriben.py".to_string()
}

pub fn default_python_path() -> String {
    "python".to_string()
}

pub fn default_timeout_secs() -> u64 {
    300
}

pub fn default_shutdown_grace_secs() -> u64 {
    60
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            noriben_path: default_noriben_path(),
            python_path: default_python_path(),
            timeout_secs: default_timeout_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

/// Per-analysis working directory settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_work_dir")]
    pub work_dir: String,
}

pub fn default_work_dir() -> String {
    "./agent_work".to_string()
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
        }
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted multipart body
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_port() -> u16 {
    9090
}

pub fn default_max_upload_mb() -> usize {
    256
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

/// Archive extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Which backend unpacks uploaded archives ("7z", "unzip", "builtin")
    #[serde(default)]
    pub backend: ExtractorKind,
    /// Executable for the external backends
    #[serde(default = "default_tool_path")]
    pub tool_path: String,
    /// Limit for a single extraction attempt
    #[serde(default = "default_extraction_timeout_secs")]
    pub timeout_secs: u64,
}

pub fn default_tool_path() -> String {
    "7z".to_string()
}

pub fn default_extraction_timeout_secs() -> u64 {
    30
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            backend: ExtractorKind::default(),
            tool_path: default_tool_path(),
            timeout_secs: default_extraction_timeout_secs(),
        }
    }
}
