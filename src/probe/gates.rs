//! Quality gates for empirical cost measurements
//!
//! Each micro-benchmark result runs through a fixed set of gates before it is
//! trusted: Measure -> Validate -> {Accept, Fallback}. Keeping validation out
//! of the benchmark loops makes every gate auditable and testable with
//! synthetic observations.
use crate::config::ProbeConfig;
use crate::probe::ProcessCreationStrategy;

/// One validated check applied to a raw measurement.
#[derive(Debug, Clone)]
pub struct GateReport {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

/// Terminal state of the per-measurement state machine.
#[derive(Debug, Clone)]
pub enum MeasurementOutcome {
    Accepted {
        value_secs: f64,
        gates: Vec<GateReport>,
    },
    Fallback {
        value_secs: f64,
        reason: String,
        gates: Vec<GateReport>,
    },
}

impl MeasurementOutcome {
    pub fn value_secs(&self) -> f64 {
        match self {
            MeasurementOutcome::Accepted { value_secs, .. } => *value_secs,
            MeasurementOutcome::Fallback { value_secs, .. } => *value_secs,
        }
    }

    pub fn is_measured(&self) -> bool {
        matches!(self, MeasurementOutcome::Accepted { .. })
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            MeasurementOutcome::Fallback { reason, .. } => Some(reason),
            MeasurementOutcome::Accepted { .. } => None,
        }
    }

    pub(crate) fn fallback(value_secs: f64, reason: impl Into<String>) -> Self {
        MeasurementOutcome::Fallback {
            value_secs,
            reason: reason.into(),
            gates: Vec::new(),
        }
    }
}

/// Raw timings from the worker-creation benchmark.
#[derive(Debug, Clone, Copy)]
pub struct WorkerCostObservation {
    /// Wall time with the baseline worker count
    pub base_secs: f64,
    /// Wall time with one extra worker
    pub extended_secs: f64,
    pub workers_base: usize,
    pub workers_extended: usize,
}

impl WorkerCostObservation {
    pub fn marginal_secs(&self) -> f64 {
        let extra = (self.workers_extended - self.workers_base).max(1) as f64;
        (self.extended_secs - self.base_secs) / extra
    }
}

/// Validates a worker-creation measurement against the four quality gates.
pub fn validate_worker_cost(
    obs: &WorkerCostObservation,
    strategy: ProcessCreationStrategy,
    config: &ProbeConfig,
) -> MeasurementOutcome {
    let marginal = obs.marginal_secs();
    let (lo, hi) = strategy.plausible_bounds_secs();
    let (expected_lo, expected_hi) = strategy.expected_range_secs();

    let implied_overhead = marginal * (obs.workers_extended - obs.workers_base).max(1) as f64;
    let gates = vec![
        GateReport {
            name: "plausible-bounds",
            passed: marginal >= lo && marginal <= hi,
            detail: format!("{:.6}s within [{:.6}, {:.6}]", marginal, lo, hi),
        },
        GateReport {
            name: "signal-over-noise",
            passed: obs.extended_secs >= obs.base_secs * (1.0 + config.worker_signal_fraction),
            detail: format!(
                "extended {:.6}s vs base {:.6}s (need +{:.0}%)",
                obs.extended_secs,
                obs.base_secs,
                config.worker_signal_fraction * 100.0
            ),
        },
        GateReport {
            name: "overhead-fraction",
            passed: obs.extended_secs > 0.0
                && implied_overhead < config.worker_max_overhead_fraction * obs.extended_secs,
            detail: format!(
                "implied overhead {:.6}s of {:.6}s total",
                implied_overhead, obs.extended_secs
            ),
        },
        GateReport {
            name: "order-of-magnitude",
            passed: marginal >= expected_lo / 10.0 && marginal <= expected_hi * 10.0,
            detail: format!(
                "{:.6}s vs expected [{:.6}, {:.6}]",
                marginal, expected_lo, expected_hi
            ),
        },
    ];

    resolve(marginal, strategy.fallback_cost_secs(), gates)
}

/// Raw timings from the chunk-dispatch benchmark.
#[derive(Debug, Clone, Copy)]
pub struct DispatchCostObservation {
    /// Wall time with few, large chunks
    pub coarse_secs: f64,
    /// Wall time with many, small chunks covering the same total work
    pub fine_secs: f64,
    pub coarse_chunks: usize,
    pub fine_chunks: usize,
}

impl DispatchCostObservation {
    pub fn per_dispatch_secs(&self) -> f64 {
        let extra = (self.fine_chunks - self.coarse_chunks).max(1) as f64;
        (self.fine_secs - self.coarse_secs) / extra
    }
}

/// Validates a chunk-dispatch measurement against its quality gates.
pub fn validate_dispatch_cost(
    obs: &DispatchCostObservation,
    config: &ProbeConfig,
) -> MeasurementOutcome {
    let per_dispatch = obs.per_dispatch_secs();
    let overhead = obs.fine_secs - obs.coarse_secs;

    let gates = vec![
        GateReport {
            name: "positive-and-bounded",
            passed: per_dispatch > 0.0 && per_dispatch < config.dispatch_upper_bound_secs,
            detail: format!(
                "{:.7}s per dispatch, bound {:.4}s",
                per_dispatch, config.dispatch_upper_bound_secs
            ),
        },
        GateReport {
            name: "signal-over-noise",
            passed: obs.fine_secs >= obs.coarse_secs * (1.0 + config.dispatch_signal_fraction),
            detail: format!(
                "fine {:.6}s vs coarse {:.6}s (need +{:.0}%)",
                obs.fine_secs,
                obs.coarse_secs,
                config.dispatch_signal_fraction * 100.0
            ),
        },
        GateReport {
            name: "overhead-fraction",
            passed: obs.fine_secs > 0.0
                && overhead < config.dispatch_max_overhead_fraction * obs.fine_secs,
            detail: format!("overhead {:.6}s of {:.6}s total", overhead, obs.fine_secs),
        },
        GateReport {
            name: "absolute-range",
            passed: per_dispatch >= config.dispatch_accept_min_secs
                && per_dispatch <= config.dispatch_accept_max_secs,
            detail: format!(
                "{:.7}s within [{:.4}, {:.4}]",
                per_dispatch, config.dispatch_accept_min_secs, config.dispatch_accept_max_secs
            ),
        },
    ];

    resolve(per_dispatch, config.dispatch_fallback_secs, gates)
}

fn resolve(measured: f64, fallback: f64, gates: Vec<GateReport>) -> MeasurementOutcome {
    match gates.iter().find(|g| !g.passed) {
        None => MeasurementOutcome::Accepted {
            value_secs: measured,
            gates,
        },
        Some(failed) => MeasurementOutcome::Fallback {
            value_secs: fallback,
            reason: format!("gate '{}' failed: {}", failed.name, failed.detail),
            gates,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProbeConfig {
        crate::config::AdvisorConfig::default().probe
    }

    #[test]
    fn clean_worker_measurement_is_accepted() {
        let obs = WorkerCostObservation {
            base_secs: 0.010,
            extended_secs: 0.022,
            workers_base: 1,
            workers_extended: 2,
        };
        let outcome =
            validate_worker_cost(&obs, ProcessCreationStrategy::ForkLike, &config());
        assert!(outcome.is_measured());
        assert!((outcome.value_secs() - 0.012).abs() < 1e-9);
    }

    #[test]
    fn weak_signal_falls_back() {
        // Extended run only 2% slower: below the 10% signal gate
        let obs = WorkerCostObservation {
            base_secs: 0.100,
            extended_secs: 0.102,
            workers_base: 1,
            workers_extended: 2,
        };
        let outcome =
            validate_worker_cost(&obs, ProcessCreationStrategy::ForkLike, &config());
        assert!(!outcome.is_measured());
        assert_eq!(
            outcome.value_secs(),
            ProcessCreationStrategy::ForkLike.fallback_cost_secs()
        );
        assert!(outcome.fallback_reason().unwrap().contains("signal-over-noise"));
    }

    #[test]
    fn implausible_worker_cost_falls_back() {
        let obs = WorkerCostObservation {
            base_secs: 0.010,
            extended_secs: 5.010,
            workers_base: 1,
            workers_extended: 2,
        };
        let outcome =
            validate_worker_cost(&obs, ProcessCreationStrategy::ForkLike, &config());
        assert!(!outcome.is_measured());
    }

    #[test]
    fn clean_dispatch_measurement_is_accepted() {
        let obs = DispatchCostObservation {
            coarse_secs: 0.100,
            fine_secs: 0.180,
            coarse_chunks: 8,
            fine_chunks: 256,
        };
        let outcome = validate_dispatch_cost(&obs, &config());
        assert!(outcome.is_measured());
        let per = outcome.value_secs();
        assert!(per > 0.0002 && per < 0.0005);
    }

    #[test]
    fn negative_dispatch_marginal_falls_back() {
        let obs = DispatchCostObservation {
            coarse_secs: 0.100,
            fine_secs: 0.095,
            coarse_chunks: 8,
            fine_chunks: 256,
        };
        let outcome = validate_dispatch_cost(&obs, &config());
        assert!(!outcome.is_measured());
        assert_eq!(outcome.value_secs(), config().dispatch_fallback_secs);
    }

    #[test]
    fn dispatch_outside_absolute_range_falls_back() {
        // 6ms per dispatch passes the 10ms bound and the earlier gates but
        // fails the 0.1-5ms acceptance range
        let obs = DispatchCostObservation {
            coarse_secs: 2.000,
            fine_secs: 3.488,
            coarse_chunks: 8,
            fine_chunks: 256,
        };
        let outcome = validate_dispatch_cost(&obs, &config());
        assert!(!outcome.is_measured());
        assert!(outcome.fallback_reason().unwrap().contains("absolute-range"));
    }
}
