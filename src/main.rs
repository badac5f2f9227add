use clap::Parser;
use colored::*;
use std::process;

use metis::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // Verbosity flags win; otherwise METIS_LOG decides, defaulting to info
    let log_level = match cli.verbose {
        0 => std::env::var("METIS_LOG").unwrap_or_else(|_| "info".to_string()),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);

        // Use appropriate exit codes based on error type
        let exit_code = match e.downcast_ref::<metis::MetisError>() {
            Some(metis::MetisError::Config(_)) => 2,
            Some(metis::MetisError::Io(_)) => 3,
            Some(metis::MetisError::InvalidInput(_)) => 4,
            Some(metis::MetisError::Probe(_)) | Some(metis::MetisError::Sampling(_)) => 5,
            _ => 1,
        };
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Advise(args) => metis::cli::commands::advise::run(args),
        Commands::Probe(args) => metis::cli::commands::probe::run(args),
        Commands::Config(args) => metis::cli::commands::config::run(args),
    }
}
