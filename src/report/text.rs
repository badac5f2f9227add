use anyhow::Result;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use humansize::{format_size, BINARY};

use crate::report::{DecisionReport, ReportOptions};

pub fn generate_text_report(report: &DecisionReport, options: &ReportOptions) -> Result<String> {
    let mut out = String::new();
    let decision = report.decision;

    out.push_str(&format!("{}\n", "Recommendation".bold()));

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec![Cell::new("Executor"), Cell::new(decision.executor.to_string())]);
    table.add_row(vec![
        Cell::new("Workers"),
        Cell::new(decision.worker_count.to_string()),
    ]);
    table.add_row(vec![
        Cell::new("Chunk size"),
        Cell::new(decision.chunk_size.to_string()),
    ]);
    table.add_row(vec![
        Cell::new("Projected speedup"),
        Cell::new(format!("{:.2}x", decision.estimated_speedup)),
    ]);
    table.add_row(vec![
        Cell::new("Probe data"),
        Cell::new(if decision.confidence.used_measured_probe_data {
            "measured"
        } else {
            "fallback defaults"
        }),
    ]);
    out.push_str(&format!("{table}\n"));

    out.push_str(&format!("\n{}\n", decision.rationale));

    if !decision.warnings.is_empty() {
        out.push_str(&format!("\n{}\n", "Warnings".yellow().bold()));
        for warning in &decision.warnings {
            out.push_str(&format!("  - {}\n", warning));
        }
    }

    if options.include_sampling {
        if let Some(summary) = report.summary {
            out.push_str(&format!("\n{}\n", "Sampling".bold()));
            out.push_str(&format!(
                "  {} items sampled, mean compute {:.4}s, CV {:.2}\n",
                summary.sample_count, summary.mean_compute_secs, summary.coefficient_of_variation
            ));
            if let Some(ratio) = summary.cpu_time_ratio {
                out.push_str(&format!("  CPU-time ratio {:.2}\n", ratio));
            }
            if !summary.errors.is_empty() {
                out.push_str(&format!("  {} sampled item(s) failed\n", summary.errors.len()));
            }
        }
    }

    if options.include_profile {
        if let Some(profile) = report.profile {
            out.push_str(&format!("\n{}\n", "System".bold()));
            out.push_str(&format!(
                "  {} physical / {} logical cores\n",
                profile.physical_cores, profile.logical_cores
            ));
            out.push_str(&format!(
                "  {} available of {} total memory{}\n",
                format_size(profile.available_memory_bytes, BINARY),
                format_size(profile.total_memory_bytes, BINARY),
                if profile.swap_pressure {
                    " (swap pressure)"
                } else {
                    ""
                }
            ));
            out.push_str(&format!(
                "  worker creation {:.2}ms, chunk dispatch {:.3}ms ({:?})\n",
                profile.worker_creation_cost_secs * 1000.0,
                profile.chunk_dispatch_cost_secs * 1000.0,
                profile.strategy
            ));
        }
    }

    Ok(out)
}
