//! Cost model and decision pipeline
//!
//! Consumes the probe, sampler and classifier outputs and produces the final
//! recommendation. The pipeline is a straight line with no cycles:
//! serial-rejection check, worker count, chunk size, executor selection,
//! speedup estimate.
pub mod speedup;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::advisor::AdviseOptions;
use crate::classify::WorkloadCharacteristics;
use crate::config::AdvisorConfig;
use crate::model::speedup::{estimated_speedup, SpeedupInputs};
use crate::probe::SystemProfile;
use crate::sample::SamplingSummary;

/// Hard cap on a computed chunk size; also the stand-in when mean compute
/// time is too small to measure.
const MAX_CHUNK_SIZE: usize = 1_000_000_000;

/// How the recommended workers should be realized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutorKind {
    Serial,
    ProcessPool,
    ThreadPool,
}

impl std::fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutorKind::Serial => write!(f, "serial"),
            ExecutorKind::ProcessPool => write!(f, "process pool"),
            ExecutorKind::ThreadPool => write!(f, "thread pool"),
        }
    }
}

/// Which constraint ended up shaping the recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DominantFactor {
    OverheadDominated,
    MemoryConstrained,
    CoreConstrained,
    HeterogeneityAdjusted,
}

impl DominantFactor {
    fn label(&self) -> &'static str {
        match self {
            DominantFactor::OverheadDominated => "overhead-dominated",
            DominantFactor::MemoryConstrained => "memory-constrained",
            DominantFactor::CoreConstrained => "core-constrained",
            DominantFactor::HeterogeneityAdjusted => "heterogeneity-adjusted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceFlags {
    /// False when any probe cost fell back to a default constant
    pub used_measured_probe_data: bool,
}

/// The immutable recommendation handed back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionResult {
    pub worker_count: usize,
    pub chunk_size: usize,
    pub executor: ExecutorKind,
    /// Projected speedup over sequential execution; always in (0, worker_count]
    pub estimated_speedup: f64,
    pub dominant_factor: DominantFactor,
    pub rationale: String,
    pub warnings: Vec<String>,
    pub confidence: ConfidenceFlags,
    pub decided_at: DateTime<Utc>,
}

/// Base chunk size before any heterogeneity adjustment: enough items that one
/// chunk runs for roughly the target duration.
fn base_chunk_size(mean_compute_secs: f64, target_chunk_secs: f64) -> usize {
    if mean_compute_secs <= 0.0 {
        return MAX_CHUNK_SIZE;
    }
    let chunk = (target_chunk_secs / mean_compute_secs).round() as i64;
    chunk.clamp(1, MAX_CHUNK_SIZE as i64) as usize
}

/// Chunk size after trading dispatch overhead for load balance.
///
/// Past the CV threshold the chunk shrinks by a factor growing with CV, so
/// stragglers in heterogeneous workloads can be rebalanced. Monotone: a
/// higher CV never yields a larger chunk.
pub fn chunk_size_for(
    mean_compute_secs: f64,
    coefficient_of_variation: f64,
    target_chunk_secs: f64,
    config: &AdvisorConfig,
) -> usize {
    let base = base_chunk_size(mean_compute_secs, target_chunk_secs);
    let excess = (coefficient_of_variation - config.classify.cv_threshold).max(0.0);
    let shrink = 1.0 + config.chunking.heterogeneity_gain * excess;
    (((base as f64) / shrink).round() as usize).max(1)
}

struct WorkerPlan {
    count: usize,
    factor: DominantFactor,
    notes: Vec<String>,
}

/// Worker count: physical cores capped by the memory-derived ceiling, then
/// reduced for swap pressure and nested parallelism.
fn plan_workers(
    summary: &SamplingSummary,
    profile: &SystemProfile,
    characteristics: &WorkloadCharacteristics,
    options: &AdviseOptions,
    config: &AdvisorConfig,
    tentative_chunk: usize,
) -> WorkerPlan {
    let mut notes = Vec::new();

    let per_item_bytes = options
        .memory_per_item_hint_bytes
        .unwrap_or((summary.mean_input_bytes + summary.mean_output_bytes) as u64)
        .max(1);
    // Saturating: an oversized hint times a large chunk must degrade the
    // ceiling, never overflow
    let per_worker_bytes = config.memory.base_worker_overhead_bytes.saturating_add(
        per_item_bytes.saturating_mul(tentative_chunk.min(MAX_CHUNK_SIZE) as u64),
    );

    let usable = profile.usable_memory_bytes(config.memory.headroom);
    let memory_ceiling = (usable / per_worker_bytes) as usize;

    let (mut count, mut factor) = if memory_ceiling < profile.physical_cores {
        (memory_ceiling.max(1), DominantFactor::MemoryConstrained)
    } else {
        (profile.physical_cores, DominantFactor::CoreConstrained)
    };
    if memory_ceiling == 0 {
        notes.push("estimated per-worker memory exceeds usable memory".to_string());
    }

    if profile.swap_pressure {
        count = (count / 2).max(1);
        factor = DominantFactor::MemoryConstrained;
        notes.push("swap pressure detected; worker count halved".to_string());
    }

    if let Some(nested) = characteristics.nested_parallelism {
        let reduced = ((count as f64) / nested).floor() as usize;
        count = reduced.max(1);
        notes.push(format!(
            "function is internally parallel (~{:.1}x); workers reduced to avoid oversubscription",
            nested
        ));
    }

    WorkerPlan {
        count: count.max(1),
        factor,
        notes,
    }
}

/// Runs the decision pipeline once.
pub fn decide(
    summary: &SamplingSummary,
    profile: &SystemProfile,
    characteristics: &WorkloadCharacteristics,
    options: &AdviseOptions,
    config: &AdvisorConfig,
) -> DecisionResult {
    let mut warnings = Vec::new();
    if !profile.used_measured_data() {
        warnings.push("probe measurements used fallback default constants".to_string());
    }

    let target_chunk_secs = options.target_chunk_secs;
    let total_items = summary.total_items;

    // Input-unusable and sampling-failure short circuits: degrade to serial,
    // never propagate an error
    if summary.all_failed() {
        let detail = summary
            .errors
            .first()
            .map(|e| format!("first failure at index {}: {}", e.index, e.message))
            .unwrap_or_default();
        warnings.push(format!("every sampled item failed ({})", detail));
        return serial_result(
            summary,
            total_items,
            target_chunk_secs,
            profile,
            config,
            "every sampled item raised an error; serial execution keeps failures observable"
                .to_string(),
            warnings,
        );
    }

    if !summary.data_serializable {
        let index = summary.first_unserializable_index.unwrap_or(0);
        warnings.push(format!("item at index {} is not serializable", index));
        return serial_result(
            summary,
            total_items,
            target_chunk_secs,
            profile,
            config,
            format!(
                "data cannot cross a process boundary (first unserializable item at index {}); \
                 falling back to serial execution",
                index
            ),
            warnings,
        );
    }

    if !summary.function_portable {
        warnings.push("function captures state and cannot be shipped to workers".to_string());
        return serial_result(
            summary,
            total_items,
            target_chunk_secs,
            profile,
            config,
            "function is not portable to worker processes; falling back to serial execution"
                .to_string(),
            warnings,
        );
    }

    // Serial rejection gate: too few items, or too little work to amortize
    // even one worker's creation cost
    if let Some(n) = total_items {
        if n <= 1 {
            return serial_result(
                summary,
                total_items,
                target_chunk_secs,
                profile,
                config,
                format!("{} item(s); nothing to parallelize", n),
                warnings,
            );
        }
        if n < config.serial_gate.min_items_for_parallel {
            return serial_result(
                summary,
                total_items,
                target_chunk_secs,
                profile,
                config,
                format!(
                    "{} items is below the parallel threshold of {}",
                    n, config.serial_gate.min_items_for_parallel
                ),
                warnings,
            );
        }
        let total_compute_secs = summary.mean_compute_secs * n as f64;
        let gate_secs =
            profile.worker_creation_cost_secs * config.serial_gate.creation_cost_multiplier;
        if total_compute_secs < gate_secs {
            return serial_result(
                summary,
                total_items,
                target_chunk_secs,
                profile,
                config,
                format!(
                    "estimated total compute ({:.3}s) is too small to amortize worker creation \
                     ({:.3}s each)",
                    total_compute_secs, profile.worker_creation_cost_secs
                ),
                warnings,
            );
        }
    }

    // Worker count
    let tentative_chunk = base_chunk_size(summary.mean_compute_secs, target_chunk_secs);
    let plan = plan_workers(summary, profile, characteristics, options, config, tentative_chunk);
    warnings.extend(plan.notes.iter().cloned());

    // Chunk size
    let mut chunk_size = chunk_size_for(
        summary.mean_compute_secs,
        summary.coefficient_of_variation,
        target_chunk_secs,
        config,
    );
    if let Some(n) = total_items {
        // No point dispatching chunks larger than one worker's fair share
        chunk_size = chunk_size.min((n / plan.count).max(1));
    }

    // Executor kind
    let executor = if characteristics.is_io_bound() && options.prefer_threads_for_io {
        warnings.push("workload appears I/O-bound; threads avoid process overhead".to_string());
        ExecutorKind::ThreadPool
    } else {
        ExecutorKind::ProcessPool
    };

    // Speedup estimate
    let effective_items = match total_items {
        Some(n) => n,
        None => {
            let assumed = summary.sample_count.max(1) * 100;
            warnings.push(format!(
                "input length unknown; speedup projected over {} items",
                assumed
            ));
            assumed
        }
    };
    let serial_secs = summary.mean_compute_secs * effective_items as f64;
    let num_chunks = (effective_items as f64 / chunk_size as f64).ceil();
    let estimated = estimated_speedup(&SpeedupInputs {
        serial_secs,
        worker_count: plan.count,
        worker_creation_cost_secs: profile.worker_creation_cost_secs,
        input_serialization_secs_per_item: summary.mean_input_serialization_secs,
        output_serialization_secs_per_item: summary.mean_output_serialization_secs,
        chunk_dispatch_cost_secs: profile.chunk_dispatch_cost_secs,
        total_items: effective_items as f64,
        num_chunks,
    });
    if estimated <= 1.0 {
        warnings.push("projected speedup does not beat serial execution".to_string());
    }

    let factor = if characteristics.heterogeneous {
        DominantFactor::HeterogeneityAdjusted
    } else {
        plan.factor
    };
    let rationale = format!(
        "{} workers ({}), {} with chunks of {} (~{:.2}s each); projected speedup {:.1}x over serial",
        plan.count,
        factor.label(),
        executor,
        chunk_size,
        chunk_size as f64 * summary.mean_compute_secs,
        estimated
    );

    debug!(
        workers = plan.count,
        chunk = chunk_size,
        executor = %executor,
        speedup = estimated,
        "decision pipeline complete"
    );

    DecisionResult {
        worker_count: plan.count,
        chunk_size,
        executor,
        estimated_speedup: estimated,
        dominant_factor: factor,
        rationale,
        warnings,
        confidence: ConfidenceFlags {
            used_measured_probe_data: profile.used_measured_data(),
        },
        decided_at: Utc::now(),
    }
}

/// Builds the Serial decision shared by every short-circuit path.
///
/// Chunk size is capped at the item count: a chunk larger than the data
/// itself is meaningless.
#[allow(clippy::too_many_arguments)]
fn serial_result(
    summary: &SamplingSummary,
    total_items: Option<usize>,
    target_chunk_secs: f64,
    profile: &SystemProfile,
    _config: &AdvisorConfig,
    rationale: String,
    warnings: Vec<String>,
) -> DecisionResult {
    let base = base_chunk_size(summary.mean_compute_secs, target_chunk_secs);
    let chunk_size = match total_items {
        Some(n) => base.min(n.max(1)),
        None => base,
    };

    DecisionResult {
        worker_count: 1,
        chunk_size,
        executor: ExecutorKind::Serial,
        estimated_speedup: 1.0,
        dominant_factor: DominantFactor::OverheadDominated,
        rationale,
        warnings,
        confidence: ConfidenceFlags {
            used_measured_probe_data: profile.used_measured_data(),
        },
        decided_at: Utc::now(),
    }
}
