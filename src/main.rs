//! CUPAX analysis agent - CLI entry point

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "cupax_agent=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Serve { host, port } => commands::serve::handle(config, host, port),
        Commands::Analyze {
            file,
            id,
            password,
            zip,
        } => commands::analyze::handle(config, &file, &id, password.as_deref(), zip),
        Commands::Parse { output_dir } => commands::parse::handle(&output_dir),
        Commands::Cleanup { id } => commands::cleanup::handle(config, &id),
    }
}
