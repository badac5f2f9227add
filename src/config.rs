use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable thresholds for the decision engine.
///
/// Every numeric constant that shapes a recommendation lives here rather than
/// being hard-coded at the point of use. The defaults are empirically chosen
/// and work well on commodity hardware, but none of them is universally
/// optimal; callers running on unusual machines should tune them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorConfig {
    pub classify: ClassifyConfig,
    pub chunking: ChunkingConfig,
    pub memory: MemoryConfig,
    pub probe: ProbeConfig,
    pub serial_gate: SerialGateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyConfig {
    /// CPU-time / wall-time ratio below which a workload counts as I/O-bound
    pub io_cpu_ratio_threshold: f64,
    /// Coefficient of variation above which execution times count as heterogeneous
    pub cv_threshold: f64,
    /// Observed thread growth factor above which nested parallelism is assumed
    pub nested_thread_growth_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target wall-clock duration of one dispatched chunk, in seconds
    pub target_chunk_secs: f64,
    /// How aggressively chunk size shrinks as CV rises past the threshold
    pub heterogeneity_gain: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Fraction of available memory the advisor is allowed to plan with
    pub headroom: f64,
    /// Used-swap / total-swap fraction that counts as memory pressure
    pub swap_pressure_threshold: f64,
    /// Fixed per-worker overhead assumed on top of item payloads, in bytes
    pub base_worker_overhead_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Hard deadline for one micro-benchmark pass, in seconds
    pub benchmark_deadline_secs: f64,
    /// N+1-worker run must be at least this much slower than the N-worker run
    pub worker_signal_fraction: f64,
    /// Implied worker-creation overhead must stay below this fraction of total time
    pub worker_max_overhead_fraction: f64,
    /// Fine-chunked run must be at least this much slower than the coarse run
    pub dispatch_signal_fraction: f64,
    /// Implied dispatch overhead must stay below this fraction of total time
    pub dispatch_max_overhead_fraction: f64,
    /// Accepted absolute range for a per-chunk dispatch cost, in seconds
    pub dispatch_accept_min_secs: f64,
    pub dispatch_accept_max_secs: f64,
    /// Hard upper bound on a plausible per-chunk dispatch cost, in seconds
    pub dispatch_upper_bound_secs: f64,
    /// Fallback per-chunk dispatch cost when measurement fails its gates
    pub dispatch_fallback_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialGateConfig {
    /// Below this many items, parallelism is never worth considering
    pub min_items_for_parallel: usize,
    /// Total compute must exceed this many worker-creation costs to go parallel
    pub creation_cost_multiplier: f64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            classify: ClassifyConfig {
                io_cpu_ratio_threshold: 0.3,
                cv_threshold: 0.3,
                nested_thread_growth_threshold: 1.5,
            },
            chunking: ChunkingConfig {
                target_chunk_secs: 0.2,
                heterogeneity_gain: 3.0,
            },
            memory: MemoryConfig {
                headroom: 0.8, // Plan with 80% of available memory
                swap_pressure_threshold: 0.25,
                base_worker_overhead_bytes: 32 * 1024 * 1024,
            },
            probe: ProbeConfig {
                benchmark_deadline_secs: 5.0,
                worker_signal_fraction: 0.10,
                worker_max_overhead_fraction: 0.90,
                dispatch_signal_fraction: 0.05,
                dispatch_max_overhead_fraction: 0.50,
                dispatch_accept_min_secs: 0.0001, // 0.1 ms
                dispatch_accept_max_secs: 0.005,  // 5 ms
                dispatch_upper_bound_secs: 0.010, // 10 ms
                dispatch_fallback_secs: 0.0005,   // 0.5 ms
            },
            serial_gate: SerialGateConfig {
                min_items_for_parallel: 10,
                creation_cost_multiplier: 10.0,
            },
        }
    }
}

pub fn default_config() -> AdvisorConfig {
    AdvisorConfig::default()
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AdvisorConfig, crate::MetisError> {
    let contents = std::fs::read_to_string(path)?;
    let config: AdvisorConfig = toml::from_str(&contents)
        .map_err(|e| crate::MetisError::Config(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &AdvisorConfig) -> Result<(), crate::MetisError> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| crate::MetisError::Config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}
