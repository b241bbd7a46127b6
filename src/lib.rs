//! CUPAX analysis agent library
//!
//! Runs a submitted sample under the Noriben/Procmon monitor inside an
//! isolated Windows VM and turns the monitor's output into a structured
//! behavioral report.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod extract;
pub mod process;
pub mod report;
pub mod server;
pub mod supervisor;
pub mod workspace;

pub use config::Config;
pub use coordinator::{AnalysisCoordinator, AnalysisResponse, HealthInfo, Upload};
pub use error::{AnalysisError, AnalysisResult};
pub use extract::{ArchiveExtractor, ExtractBackend, ExtractError, ExtractorKind};
pub use report::{ParseError, Report, ReportParser};
pub use supervisor::{ExecutionOutcome, ExecutionStatus, ExecutionSupervisor};
pub use workspace::{CleanupGuard, Workspace};
