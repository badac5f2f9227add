//! Workload classification
//!
//! Pure derivation from the sampling summary: is the workload dominated by
//! waiting or by computation, are per-item times uniform enough for fixed
//! chunking, and is the function already parallel inside. The cost model
//! consumes the tagged result instead of re-deriving flags.
use serde::{Deserialize, Serialize};

use crate::config::AdvisorConfig;
use crate::probe::SystemProfile;
use crate::sample::SamplingSummary;

/// What dominates the workload's wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkloadClass {
    /// Wall time is spent computing; process isolation pays off
    CpuBound,
    /// Wall time is spent waiting; threads suffice and cost less
    IoBound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadCharacteristics {
    pub class: WorkloadClass,
    /// Execution times vary enough that fixed chunks would create stragglers
    pub heterogeneous: bool,
    /// Oversubscription factor when the function is internally parallel:
    /// the worker count should be divided by this
    pub nested_parallelism: Option<f64>,
}

impl WorkloadCharacteristics {
    pub fn is_io_bound(&self) -> bool {
        self.class == WorkloadClass::IoBound
    }
}

/// Classifies a sampled workload. Pure function of its inputs.
pub fn classify(
    summary: &SamplingSummary,
    profile: &SystemProfile,
    config: &AdvisorConfig,
) -> WorkloadCharacteristics {
    // No CPU-time data reads as CPU-bound: the conservative direction, since
    // process pools are the safer default for unknown workloads
    let class = match summary.cpu_time_ratio {
        Some(ratio) if ratio < config.classify.io_cpu_ratio_threshold => WorkloadClass::IoBound,
        _ => WorkloadClass::CpuBound,
    };

    let heterogeneous = summary.coefficient_of_variation > config.classify.cv_threshold;

    let nested_parallelism = nested_parallelism_factor(summary, profile, config);

    WorkloadCharacteristics {
        class,
        heterogeneous,
        nested_parallelism,
    }
}

/// Detects a function that is already using multiple cores internally.
///
/// Two signals: observed thread growth during sampling, and well-known
/// environment variables declaring an internal thread pool. The larger
/// factor wins; anything at or below the growth threshold is ignored.
fn nested_parallelism_factor(
    summary: &SamplingSummary,
    profile: &SystemProfile,
    config: &AdvisorConfig,
) -> Option<f64> {
    let threshold = config.classify.nested_thread_growth_threshold;

    let observed = summary.thread_growth.filter(|g| *g > threshold);

    let declared = declared_internal_threads()
        .filter(|&n| n > 1)
        .map(|n| n as f64);

    let factor = match (observed, declared) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    };

    // Never claim more internal parallelism than the machine has cores
    factor.map(|f| f.min(profile.logical_cores as f64))
}

fn declared_internal_threads() -> Option<usize> {
    for var in ["RAYON_NUM_THREADS", "OMP_NUM_THREADS", "MKL_NUM_THREADS"] {
        if let Ok(value) = std::env::var(var) {
            if let Ok(parsed) = value.trim().parse::<usize>() {
                return Some(parsed);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{MeasurementConfidence, ProcessCreationStrategy};

    fn profile() -> SystemProfile {
        SystemProfile {
            physical_cores: 8,
            logical_cores: 16,
            available_memory_bytes: 16 * 1024 * 1024 * 1024,
            total_memory_bytes: 32 * 1024 * 1024 * 1024,
            swap_pressure: false,
            worker_creation_cost_secs: 0.015,
            chunk_dispatch_cost_secs: 0.0005,
            strategy: ProcessCreationStrategy::ForkLike,
            worker_cost_confidence: MeasurementConfidence::Measured,
            dispatch_cost_confidence: MeasurementConfidence::Measured,
            captured_at: chrono::Utc::now(),
        }
    }

    fn summary(cpu_ratio: Option<f64>, cv: f64, thread_growth: Option<f64>) -> SamplingSummary {
        SamplingSummary {
            sample_count: 30,
            total_items: Some(1000),
            mean_compute_secs: 0.01,
            variance_compute_secs: (cv * 0.01f64).powi(2),
            coefficient_of_variation: cv,
            mean_input_serialization_secs: 1e-6,
            mean_output_serialization_secs: 1e-6,
            mean_input_bytes: 64.0,
            mean_output_bytes: 64.0,
            cpu_time_ratio: cpu_ratio,
            function_portable: true,
            data_serializable: true,
            first_unserializable_index: None,
            thread_growth,
            errors: Vec::new(),
            observations: Vec::new(),
        }
    }

    #[test]
    fn low_cpu_ratio_reads_as_io_bound() {
        let config = AdvisorConfig::default();
        let characteristics = classify(&summary(Some(0.05), 0.0, None), &profile(), &config);
        assert_eq!(characteristics.class, WorkloadClass::IoBound);
    }

    #[test]
    fn high_cpu_ratio_reads_as_cpu_bound() {
        let config = AdvisorConfig::default();
        let characteristics = classify(&summary(Some(0.95), 0.0, None), &profile(), &config);
        assert_eq!(characteristics.class, WorkloadClass::CpuBound);
    }

    #[test]
    fn missing_cpu_time_defaults_to_cpu_bound() {
        let config = AdvisorConfig::default();
        let characteristics = classify(&summary(None, 0.0, None), &profile(), &config);
        assert_eq!(characteristics.class, WorkloadClass::CpuBound);
    }

    #[test]
    fn cv_above_threshold_is_heterogeneous() {
        let config = AdvisorConfig::default();
        assert!(!classify(&summary(Some(1.0), 0.1, None), &profile(), &config).heterogeneous);
        assert!(classify(&summary(Some(1.0), 0.8, None), &profile(), &config).heterogeneous);
    }

    #[test]
    fn thread_growth_flags_nested_parallelism() {
        let config = AdvisorConfig::default();
        let characteristics = classify(&summary(Some(1.0), 0.0, Some(4.0)), &profile(), &config);
        assert_eq!(characteristics.nested_parallelism, Some(4.0));
    }

    #[test]
    fn mild_thread_growth_is_ignored() {
        let config = AdvisorConfig::default();
        let characteristics = classify(&summary(Some(1.0), 0.0, Some(1.2)), &profile(), &config);
        assert_eq!(characteristics.nested_parallelism, None);
    }

    #[test]
    fn nested_factor_is_capped_by_core_count() {
        let config = AdvisorConfig::default();
        let characteristics =
            classify(&summary(Some(1.0), 0.0, Some(64.0)), &profile(), &config);
        assert_eq!(characteristics.nested_parallelism, Some(16.0));
    }
}
