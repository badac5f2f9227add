//! `metis config` — show or write the advisor configuration
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::config::{default_config, load_config, save_config};

#[derive(Args)]
pub struct ConfigArgs {
    /// Load and display this configuration file instead of the defaults
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Write the default configuration to this file
    #[arg(long)]
    pub write: Option<PathBuf>,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    if let Some(path) = &args.write {
        save_config(path, &default_config())?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let config = match &args.path {
        Some(path) => load_config(path)?,
        None => default_config(),
    };
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
