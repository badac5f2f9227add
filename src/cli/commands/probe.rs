//! `metis probe` — capture and display the system profile
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use humansize::{format_size, BINARY};

use crate::probe::{system_profile, MeasurementConfidence};

#[derive(Args)]
pub struct ProbeArgs {
    /// Discard the cached profile and re-measure
    #[arg(long)]
    pub refresh: bool,

    /// Emit the profile as JSON
    #[arg(long)]
    pub json: bool,
}

fn confidence_label(confidence: &MeasurementConfidence) -> String {
    match confidence {
        MeasurementConfidence::Measured => "measured".to_string(),
        MeasurementConfidence::Defaulted { reason } => format!("default ({})", reason),
    }
}

pub fn run(args: ProbeArgs) -> Result<()> {
    let profile = system_profile(args.refresh);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&*profile)?);
        return Ok(());
    }

    println!("{}", "System profile".bold());
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec![
        "Cores".to_string(),
        format!("{} physical / {} logical", profile.physical_cores, profile.logical_cores),
    ]);
    table.add_row(vec![
        "Memory".to_string(),
        format!(
            "{} available of {}{}",
            format_size(profile.available_memory_bytes, BINARY),
            format_size(profile.total_memory_bytes, BINARY),
            if profile.swap_pressure { " — swap pressure" } else { "" }
        ),
    ]);
    table.add_row(vec![
        "Worker creation".to_string(),
        format!(
            "{:.2} ms ({})",
            profile.worker_creation_cost_secs * 1000.0,
            confidence_label(&profile.worker_cost_confidence)
        ),
    ]);
    table.add_row(vec![
        "Chunk dispatch".to_string(),
        format!(
            "{:.3} ms ({})",
            profile.chunk_dispatch_cost_secs * 1000.0,
            confidence_label(&profile.dispatch_cost_confidence)
        ),
    ]);
    table.add_row(vec![
        "Process strategy".to_string(),
        format!("{:?}", profile.strategy),
    ]);
    table.add_row(vec![
        "Captured".to_string(),
        profile.captured_at.to_rfc3339(),
    ]);
    println!("{table}");

    Ok(())
}
