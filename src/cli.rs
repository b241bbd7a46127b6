//! CLI definitions for the agent
//!
//! This module contains the clap CLI structure definitions, separated from
//! main.rs so the dispatch stays a plain match.

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Build clap styles for help output.
pub fn build_cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::White.on_default())
        .valid(AnsiColor::White.on_default())
        .invalid(AnsiColor::Red.on_default())
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
}

#[derive(Parser)]
#[command(name = "cupax-agent")]
#[command(about = "[ CUPAX Agent ] - run malware samples under Noriben and report what they did")]
#[command(long_about = "CUPAX analysis agent - runs inside an isolated Windows VM.

Accepts a sample (optionally inside a password-protected zip), executes it
under Noriben/Procmon for a fixed time window, and returns a structured
behavioral report as JSON.

QUICK START:
    cupax-agent serve                          Start the HTTP agent on 0.0.0.0:9090
    cupax-agent analyze sample.exe --id job1   Analyze one file locally
    cupax-agent parse agent_work/job1          Re-parse existing Noriben output
    cupax-agent cleanup job1                   Remove an analysis output directory

CONFIGURATION:
    ~/.config/cupax-agent/config.toml, overridden by AGENT_* environment
    variables (AGENT_NORIBEN_PATH, AGENT_TIMEOUT, AGENT_PORT, ...).

WARNING: this agent executes untrusted code. Only run it inside a disposable VM.")]
#[command(version)]
#[command(styles = build_cli_styles())]
pub struct Cli {
    /// Path to an alternative config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP agent
    #[command(long_about = "Run the HTTP agent.

ENDPOINTS:
    GET    /health                   Agent status and configuration
    POST   /analyze                  Multipart: file, analysis_id, password, is_zip
    DELETE /cleanup/<analysis_id>    Remove an analysis output directory")]
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Analyze a single file and print the JSON response
    #[command(long_about = "Analyze a single file and print the JSON response.

EXAMPLES:
    cupax-agent analyze sample.exe --id job1
    cupax-agent analyze bundle.zip --id job2 --zip
    cupax-agent analyze bundle.zip --id job3 --zip --password infected")]
    Analyze {
        /// Sample or archive to analyze
        file: PathBuf,
        /// Analysis identifier (names the output directory)
        #[arg(long)]
        id: String,
        /// Archive password (common passwords are tried when omitted)
        #[arg(long)]
        password: Option<String>,
        /// Treat FILE as a zip archive
        #[arg(long)]
        zip: bool,
    },

    /// Parse an existing Noriben output directory
    Parse {
        /// Directory containing Noriben_*.txt and Noriben_*_timeline.csv
        output_dir: PathBuf,
    },

    /// Remove the output directory of an analysis
    Cleanup {
        /// Analysis identifier
        id: String,
    },
}
