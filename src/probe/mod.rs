//! System resource probe
//!
//! Detects compute and memory capacity and empirically measures the two fixed
//! costs the cost model depends on: creating one more worker and dispatching
//! one more chunk. The resulting `SystemProfile` is cached process-wide behind
//! double-checked locking; the first caller measures, everyone else reads.
pub mod benchmark;
pub mod gates;
pub mod topology;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::AdvisorConfig;
use crate::probe::gates::MeasurementOutcome;

/// How new worker processes come into existence on this OS.
///
/// The strategy selects which plausibility bounds and fallback constant apply
/// to the worker-creation measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessCreationStrategy {
    /// Cheap OS-level duplication of the parent (typical unix)
    ForkLike,
    /// Fresh interpreter/executable startup per worker (Windows)
    SpawnLike,
    /// Workers leased from a pre-warmed pool or service
    ServerLike,
}

impl ProcessCreationStrategy {
    pub fn detect() -> Self {
        if cfg!(windows) {
            ProcessCreationStrategy::SpawnLike
        } else if cfg!(unix) {
            ProcessCreationStrategy::ForkLike
        } else {
            ProcessCreationStrategy::ServerLike
        }
    }

    /// Hard bounds outside which a measured creation cost is rejected.
    pub fn plausible_bounds_secs(&self) -> (f64, f64) {
        match self {
            ProcessCreationStrategy::ForkLike => (0.0002, 0.5),
            ProcessCreationStrategy::SpawnLike => (0.002, 2.0),
            ProcessCreationStrategy::ServerLike => (0.001, 1.0),
        }
    }

    /// Typical range on healthy systems; measurements are allowed to deviate
    /// by at most an order of magnitude from it.
    pub fn expected_range_secs(&self) -> (f64, f64) {
        match self {
            ProcessCreationStrategy::ForkLike => (0.001, 0.1),
            ProcessCreationStrategy::SpawnLike => (0.020, 0.5),
            ProcessCreationStrategy::ServerLike => (0.005, 0.2),
        }
    }

    /// Conservative constant used when measurement fails its gates.
    pub fn fallback_cost_secs(&self) -> f64 {
        match self {
            ProcessCreationStrategy::ForkLike => 0.015,
            ProcessCreationStrategy::SpawnLike => 0.120,
            ProcessCreationStrategy::ServerLike => 0.050,
        }
    }
}

/// Whether a profile field was empirically measured or replaced by a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MeasurementConfidence {
    Measured,
    Defaulted { reason: String },
}

impl MeasurementConfidence {
    pub fn is_measured(&self) -> bool {
        matches!(self, MeasurementConfidence::Measured)
    }

    fn from_outcome(outcome: &MeasurementOutcome) -> Self {
        match outcome.fallback_reason() {
            None => MeasurementConfidence::Measured,
            Some(reason) => MeasurementConfidence::Defaulted {
                reason: reason.to_string(),
            },
        }
    }
}

/// Process-wide snapshot of compute, memory and measured overhead costs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemProfile {
    pub physical_cores: usize,
    pub logical_cores: usize,
    /// Memory the advisor may plan with, after cgroup ceilings and swap pressure
    pub available_memory_bytes: u64,
    pub total_memory_bytes: u64,
    /// Swap usage exceeded the pressure threshold when this profile was taken
    pub swap_pressure: bool,
    pub worker_creation_cost_secs: f64,
    pub chunk_dispatch_cost_secs: f64,
    pub strategy: ProcessCreationStrategy,
    pub worker_cost_confidence: MeasurementConfidence,
    pub dispatch_cost_confidence: MeasurementConfidence,
    pub captured_at: DateTime<Utc>,
}

impl SystemProfile {
    /// True when both measured costs passed their quality gates.
    pub fn used_measured_data(&self) -> bool {
        self.worker_cost_confidence.is_measured() && self.dispatch_cost_confidence.is_measured()
    }

    /// Memory available for workers after applying the headroom fraction.
    pub fn usable_memory_bytes(&self, headroom: f64) -> u64 {
        (self.available_memory_bytes as f64 * headroom.clamp(0.0, 1.0)) as u64
    }

    fn measure(config: &AdvisorConfig) -> Self {
        let logical_cores = topology::logical_cores();
        let physical_cores = topology::physical_cores(logical_cores);

        let memory = topology::memory_snapshot();
        let mut available = memory.effective_available_bytes();
        let swap_pressure = memory.swap_total_bytes > 0
            && memory.swap_used_bytes as f64
                > memory.swap_total_bytes as f64 * config.memory.swap_pressure_threshold;
        if swap_pressure {
            // Swapped-out pages will be paid for again; plan as if they were gone
            available = available.saturating_sub(memory.swap_used_bytes);
        }

        let strategy = ProcessCreationStrategy::detect();
        let worker_outcome = benchmark::measure_worker_creation_cost(strategy, &config.probe);
        let dispatch_outcome = benchmark::measure_chunk_dispatch_cost(&config.probe);

        let profile = SystemProfile {
            physical_cores,
            logical_cores,
            available_memory_bytes: available,
            total_memory_bytes: memory.total_bytes,
            swap_pressure,
            worker_creation_cost_secs: worker_outcome.value_secs(),
            chunk_dispatch_cost_secs: dispatch_outcome.value_secs(),
            strategy,
            worker_cost_confidence: MeasurementConfidence::from_outcome(&worker_outcome),
            dispatch_cost_confidence: MeasurementConfidence::from_outcome(&dispatch_outcome),
            captured_at: Utc::now(),
        };

        info!(
            physical = profile.physical_cores,
            logical = profile.logical_cores,
            available_mb = profile.available_memory_bytes / (1024 * 1024),
            worker_cost_secs = profile.worker_creation_cost_secs,
            dispatch_cost_secs = profile.chunk_dispatch_cost_secs,
            measured = profile.used_measured_data(),
            "system profile captured"
        );
        profile
    }
}

static PROFILE_CACHE: RwLock<Option<Arc<SystemProfile>>> = RwLock::new(None);

/// Returns the cached system profile, measuring it on first use.
///
/// The fast path is a shared read of the published profile. The first caller
/// to find the cache empty (or anyone passing `force_refresh`) takes the write
/// lock, measures once, and publishes; concurrent callers block on the same
/// lock rather than measuring twice.
pub fn system_profile(force_refresh: bool) -> Arc<SystemProfile> {
    system_profile_with(&AdvisorConfig::default(), force_refresh)
}

pub fn system_profile_with(config: &AdvisorConfig, force_refresh: bool) -> Arc<SystemProfile> {
    if !force_refresh {
        if let Some(profile) = PROFILE_CACHE.read().as_ref() {
            return Arc::clone(profile);
        }
    }

    let mut slot = PROFILE_CACHE.write();
    if !force_refresh {
        // Someone else may have published while we waited for the lock
        if let Some(profile) = slot.as_ref() {
            return Arc::clone(profile);
        }
    }
    let profile = Arc::new(SystemProfile::measure(config));
    *slot = Some(Arc::clone(&profile));
    profile
}

/// Drops the cached profile; the next caller re-measures.
pub fn invalidate_profile() {
    *PROFILE_CACHE.write() = None;
}
