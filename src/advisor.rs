//! Public entry point
//!
//! Ties the pipeline together: sample a prefix, classify the workload, pull
//! the cached system profile, run the cost model, and hand back the decision
//! together with the losslessly reconstructed input.
use serde::Serialize;
use tracing::info;

use crate::classify::classify;
use crate::config::AdvisorConfig;
use crate::model::{decide, DecisionResult};
use crate::probe::system_profile_with;
use crate::sample::reconstruct::Reassembled;
use crate::sample::{sample, SampleOptions, SamplingSummary};
use crate::{MetisError, Result};

/// Caller-facing knobs for one advisory run.
#[derive(Debug, Clone)]
pub struct AdviseOptions {
    /// Items sampled from the front of the input
    pub sample_size: usize,
    /// Desired wall-clock duration of one dispatched chunk
    pub target_chunk_secs: f64,
    /// Recommend threads instead of processes for I/O-bound work
    pub prefer_threads_for_io: bool,
    /// Expected peak memory per in-flight item; measured payload sizes are
    /// used when absent
    pub memory_per_item_hint_bytes: Option<u64>,
    /// Overrides the inference of whether the function can run in a separate
    /// process
    pub function_portable_hint: Option<bool>,
}

impl Default for AdviseOptions {
    fn default() -> Self {
        let config = AdvisorConfig::default();
        Self {
            sample_size: 30,
            target_chunk_secs: config.chunking.target_chunk_secs,
            prefer_threads_for_io: true,
            memory_per_item_hint_bytes: None,
            function_portable_hint: None,
        }
    }
}

/// A decision plus the reconstructed input it was made for.
///
/// `items` yields exactly the original sequence: the sampled prefix followed
/// by everything the sampler never touched.
pub struct Advice<I, T>
where
    I: Iterator<Item = T>,
{
    pub decision: DecisionResult,
    /// Measurements the decision was based on, for logging collaborators
    pub summary: SamplingSummary,
    pub items: Reassembled<I, T>,
}

/// Recommends worker count, chunk size and executor kind for mapping `f`
/// over `items`.
///
/// Only caller-contract violations (zero sample size, empty input) surface as
/// errors; measurement problems and misbehaving functions degrade to a Serial
/// recommendation with warnings attached.
pub fn advise<F, T, R, I>(
    f: F,
    items: I,
    options: AdviseOptions,
) -> Result<Advice<I::IntoIter, T>>
where
    I: IntoIterator<Item = T>,
    T: Serialize,
    R: Serialize,
    F: Fn(&T) -> R,
{
    advise_with_config(f, items, options, &AdvisorConfig::default())
}

pub fn advise_with_config<F, T, R, I>(
    f: F,
    items: I,
    options: AdviseOptions,
    config: &AdvisorConfig,
) -> Result<Advice<I::IntoIter, T>>
where
    I: IntoIterator<Item = T>,
    T: Serialize,
    R: Serialize,
    F: Fn(&T) -> R,
{
    if options.sample_size == 0 {
        return Err(MetisError::InvalidInput(
            "sample_size must be at least 1".to_string(),
        ));
    }
    if options.target_chunk_secs <= 0.0 {
        return Err(MetisError::InvalidInput(
            "target_chunk_secs must be positive".to_string(),
        ));
    }

    let sample_options = SampleOptions {
        sample_size: options.sample_size,
        function_portable_hint: options.function_portable_hint,
    };
    let (summary, reassembled) = sample(&f, items, &sample_options);

    if summary.sample_count == 0 {
        return Err(MetisError::InvalidInput(
            "input yielded no items".to_string(),
        ));
    }

    let profile = system_profile_with(config, false);
    let characteristics = classify(&summary, &profile, config);
    let decision = decide(&summary, &profile, &characteristics, &options, config);

    crate::telemetry::emit_decision(&decision, &summary);
    info!(
        executor = %decision.executor,
        workers = decision.worker_count,
        chunk = decision.chunk_size,
        speedup = decision.estimated_speedup,
        "advice ready"
    );

    Ok(Advice {
        decision,
        summary,
        items: reassembled,
    })
}
