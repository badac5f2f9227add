use anyhow::Result;

use crate::model::DecisionResult;
use crate::probe::SystemProfile;
use crate::sample::SamplingSummary;

pub mod json;
pub mod text;

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub format: Format,
    pub include_sampling: bool,
    pub include_profile: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            format: Format::Text,
            include_sampling: true,
            include_profile: false,
        }
    }
}

/// Everything a report can draw on for one advisory run.
pub struct DecisionReport<'a> {
    pub decision: &'a DecisionResult,
    pub summary: Option<&'a SamplingSummary>,
    pub profile: Option<&'a SystemProfile>,
}

pub struct ReportGenerator {
    options: ReportOptions,
}

impl ReportGenerator {
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    pub fn generate(&self, report: &DecisionReport) -> Result<String> {
        match self.options.format {
            Format::Text => text::generate_text_report(report, &self.options),
            Format::Json => json::generate_json_report(report, &self.options),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConfidenceFlags, DominantFactor, ExecutorKind};

    pub(crate) fn sample_decision() -> DecisionResult {
        DecisionResult {
            worker_count: 8,
            chunk_size: 20,
            executor: ExecutorKind::ProcessPool,
            estimated_speedup: 6.4,
            dominant_factor: DominantFactor::CoreConstrained,
            rationale: "8 workers (core-constrained)".into(),
            warnings: vec!["example warning".into()],
            confidence: ConfidenceFlags {
                used_measured_probe_data: true,
            },
            decided_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn text_report_mentions_the_essentials() {
        let decision = sample_decision();
        let generator = ReportGenerator::new(ReportOptions::default());
        let rendered = generator
            .generate(&DecisionReport {
                decision: &decision,
                summary: None,
                profile: None,
            })
            .unwrap();
        assert!(rendered.contains("process pool"));
        assert!(rendered.contains("20"));
        assert!(rendered.contains("example warning"));
    }

    #[test]
    fn json_report_is_valid_json() {
        let decision = sample_decision();
        let generator = ReportGenerator::new(ReportOptions {
            format: Format::Json,
            ..Default::default()
        });
        let rendered = generator
            .generate(&DecisionReport {
                decision: &decision,
                summary: None,
                profile: None,
            })
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["decision"]["worker_count"], 8);
    }
}
