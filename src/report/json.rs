use anyhow::Result;
use serde_json::json;

use crate::report::{DecisionReport, ReportOptions};

pub fn generate_json_report(report: &DecisionReport, options: &ReportOptions) -> Result<String> {
    let mut value = json!({
        "decision": report.decision,
    });

    if options.include_sampling {
        if let Some(summary) = report.summary {
            value["sampling"] = serde_json::to_value(summary)?;
        }
    }
    if options.include_profile {
        if let Some(profile) = report.profile {
            value["system"] = serde_json::to_value(profile)?;
        }
    }

    Ok(serde_json::to_string_pretty(&value)?)
}
