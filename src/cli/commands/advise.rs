//! `metis advise` — run the advisor against a synthetic workload
//!
//! Useful for exploring how recommendations shift with item count, per-item
//! cost and I/O share, without wiring the library into an application first.
use std::hint::black_box;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Args;

use crate::advisor::{advise_with_config, AdviseOptions};
use crate::config::{load_config, AdvisorConfig};
use crate::probe::system_profile_with;
use crate::report::{DecisionReport, Format, ReportGenerator, ReportOptions};

#[derive(Args)]
pub struct AdviseArgs {
    /// Number of synthetic items
    #[arg(long, default_value_t = 10_000)]
    pub items: usize,

    /// CPU-busy time per item, in microseconds
    #[arg(long, default_value_t = 1_000)]
    pub busy_micros: u64,

    /// Sleep time per item (simulates I/O wait), in microseconds
    #[arg(long, default_value_t = 0)]
    pub sleep_micros: u64,

    /// Payload size per item, in bytes
    #[arg(long, default_value_t = 256)]
    pub item_bytes: usize,

    /// Items sampled before deciding
    #[arg(long, default_value_t = 30)]
    pub sample_size: usize,

    /// Target duration for one chunk, in seconds
    #[arg(long, default_value_t = 0.2)]
    pub target_chunk_secs: f64,

    /// Emit the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Include the system profile in the report
    #[arg(long)]
    pub show_profile: bool,

    /// Advisor configuration file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

fn spin_for(duration: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        black_box(0u64);
    }
}

pub fn run(args: AdviseArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => AdvisorConfig::default(),
    };

    let items: Vec<Vec<u8>> = (0..args.items)
        .map(|i| vec![(i % 251) as u8; args.item_bytes])
        .collect();

    let busy = Duration::from_micros(args.busy_micros);
    let sleep = Duration::from_micros(args.sleep_micros);
    let work = move |payload: &Vec<u8>| -> u64 {
        spin_for(busy);
        if !sleep.is_zero() {
            std::thread::sleep(sleep);
        }
        payload.iter().map(|&b| b as u64).sum()
    };

    let options = AdviseOptions {
        sample_size: args.sample_size,
        target_chunk_secs: args.target_chunk_secs,
        // The demo closure captures its durations; it stands in for a plain
        // worker function, so declare it portable
        function_portable_hint: Some(true),
        ..Default::default()
    };

    let advice = advise_with_config(work, items, options, &config)?;

    let profile = system_profile_with(&config, false);
    let generator = ReportGenerator::new(ReportOptions {
        format: if args.json { Format::Json } else { Format::Text },
        include_sampling: true,
        include_profile: args.show_profile,
    });
    let rendered = generator.generate(&DecisionReport {
        decision: &advice.decision,
        summary: Some(&advice.summary),
        profile: Some(&profile),
    })?;
    println!("{}", rendered);

    Ok(())
}
