//! Logging collaborator seam
//!
//! Decisions and sampling summaries go out as structured tracing events.
//! Nothing here assumes a subscriber exists, let alone how events are
//! delivered or formatted; with no subscriber installed these are no-ops.
use tracing::info;

use crate::model::DecisionResult;
use crate::sample::SamplingSummary;

pub fn emit_decision(decision: &DecisionResult, summary: &SamplingSummary) {
    info!(
        target: "metis::decision",
        executor = %decision.executor,
        workers = decision.worker_count,
        chunk_size = decision.chunk_size,
        speedup = decision.estimated_speedup,
        measured_probe = decision.confidence.used_measured_probe_data,
        warnings = decision.warnings.len(),
        sample_count = summary.sample_count,
        mean_compute_secs = summary.mean_compute_secs,
        cv = summary.coefficient_of_variation,
        rationale = %decision.rationale,
        "decision emitted"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConfidenceFlags, DominantFactor, ExecutorKind};

    #[test]
    fn emitting_without_a_subscriber_is_harmless() {
        let decision = DecisionResult {
            worker_count: 2,
            chunk_size: 8,
            executor: ExecutorKind::ThreadPool,
            estimated_speedup: 1.8,
            dominant_factor: DominantFactor::CoreConstrained,
            rationale: "test".into(),
            warnings: Vec::new(),
            confidence: ConfidenceFlags {
                used_measured_probe_data: false,
            },
            decided_at: chrono::Utc::now(),
        };
        let summary = SamplingSummary {
            sample_count: 4,
            total_items: Some(4),
            mean_compute_secs: 0.001,
            variance_compute_secs: 0.0,
            coefficient_of_variation: 0.0,
            mean_input_serialization_secs: 0.0,
            mean_output_serialization_secs: 0.0,
            mean_input_bytes: 8.0,
            mean_output_bytes: 8.0,
            cpu_time_ratio: Some(1.0),
            function_portable: true,
            data_serializable: true,
            first_unserializable_index: None,
            thread_growth: None,
            errors: Vec::new(),
            observations: Vec::new(),
        };
        emit_decision(&decision, &summary);
    }
}
