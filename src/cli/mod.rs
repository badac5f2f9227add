pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "metis",
    version,
    about = "Auto-tuning advisor for data-parallel batch execution",
    long_about = "Samples a workload, probes the machine, and recommends worker count, \
                  chunk size and executor kind without manual benchmarking."
)]
pub struct Cli {
    /// Increase output verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Advise on a synthetic demo workload
    Advise(commands::advise::AdviseArgs),
    /// Show the probed system profile
    Probe(commands::probe::ProbeArgs),
    /// Inspect or write the advisor configuration
    Config(commands::config::ConfigArgs),
}
