//! Sampling and dry-run engine
//!
//! Executes the target function against a bounded prefix of the input,
//! timing compute and serialization per item, and reconstructs the original
//! sequence afterwards so one-shot inputs lose nothing. Summary statistics
//! come from single-pass accumulators in `stats`.
pub mod reconstruct;
pub mod stats;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use sysinfo::{ProcessesToUpdate, System};
use tracing::{debug, warn};

use crate::sample::reconstruct::Reassembled;
use crate::sample::stats::{KahanSum, RunningStats};

/// Timings for one sampled item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleObservation {
    pub compute_secs: f64,
    pub input_serialization_secs: f64,
    pub output_serialization_secs: f64,
    pub serialized_input_bytes: usize,
    pub serialized_output_bytes: usize,
    pub error: Option<SampleError>,
}

/// A failure captured during sampling, attributed to an item position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleError {
    pub index: usize,
    pub message: String,
}

/// Aggregate view of a sampling pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingSummary {
    /// Items drawn from the input, successful or not
    pub sample_count: usize,
    /// Exact input length when the source reported one (or was exhausted)
    pub total_items: Option<usize>,
    pub mean_compute_secs: f64,
    pub variance_compute_secs: f64,
    pub coefficient_of_variation: f64,
    pub mean_input_serialization_secs: f64,
    pub mean_output_serialization_secs: f64,
    pub mean_input_bytes: f64,
    pub mean_output_bytes: f64,
    /// CPU-time / wall-time over the whole pass; None when the platform
    /// reported no process CPU time
    pub cpu_time_ratio: Option<f64>,
    /// Whether the function can be shipped to a separate process
    pub function_portable: bool,
    pub data_serializable: bool,
    pub first_unserializable_index: Option<usize>,
    /// Peak-thread over baseline-thread factor observed during sampling
    pub thread_growth: Option<f64>,
    pub errors: Vec<SampleError>,
    /// Per-item records in sampling order, failures included
    pub observations: Vec<SampleObservation>,
}

impl SamplingSummary {
    /// True when every sampled item failed and no timing data exists.
    pub fn all_failed(&self) -> bool {
        self.sample_count > 0 && self.errors.len() == self.sample_count
    }
}

/// Knobs for one sampling pass.
#[derive(Debug, Clone)]
pub struct SampleOptions {
    pub sample_size: usize,
    /// Overrides the capture-based portability inference when set
    pub function_portable_hint: Option<bool>,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            sample_size: 30,
            function_portable_hint: None,
        }
    }
}

/// Samples up to `sample_size` items from the front of `items`, running `f`
/// once per item, and returns the summary plus the losslessly reconstructed
/// input sequence.
///
/// Panics raised by `f` are captured per item and recorded; serialization
/// failures stop sampling at the offending index. Neither aborts the pass.
pub fn sample<F, T, R, I>(
    f: &F,
    items: I,
    options: &SampleOptions,
) -> (SamplingSummary, Reassembled<I::IntoIter, T>)
where
    I: IntoIterator<Item = T>,
    T: Serialize,
    R: Serialize,
    F: Fn(&T) -> R,
{
    let mut iter = items.into_iter();
    let (lower, upper) = iter.size_hint();
    let exact_total = match upper {
        Some(upper) if upper == lower => Some(lower),
        _ => None,
    };

    // A zero-sized closure captures no state, so a worker process can
    // reconstruct it; anything with captured state cannot cross the boundary.
    let function_portable = options
        .function_portable_hint
        .unwrap_or(std::mem::size_of::<F>() == 0);

    let mut buffered: Vec<T> = Vec::with_capacity(options.sample_size.min(1024));
    let mut compute_stats = RunningStats::new();
    let mut input_ser_sum = KahanSum::new();
    let mut output_ser_sum = KahanSum::new();
    let mut input_bytes_sum: u64 = 0;
    let mut output_bytes_sum: u64 = 0;
    let mut measured: usize = 0;
    let mut observations: Vec<SampleObservation> = Vec::new();
    let mut errors: Vec<SampleError> = Vec::new();
    let mut data_serializable = true;
    let mut first_unserializable_index = None;
    let mut source_exhausted = false;

    let threads_before = current_thread_count();
    let cpu_before = process_cpu_time_secs();
    let wall_start = Instant::now();

    for index in 0..options.sample_size {
        let item = match iter.next() {
            Some(item) => item,
            None => {
                source_exhausted = true;
                break;
            }
        };

        let ser_start = Instant::now();
        let encoded = bincode::serialize(&item);
        let input_ser_secs = ser_start.elapsed().as_secs_f64();

        let input_bytes = match encoded {
            Ok(bytes) => bytes.len(),
            Err(e) => {
                warn!(index, error = %e, "input failed serialization; stopping sample pass");
                data_serializable = false;
                first_unserializable_index = Some(index);
                let error = SampleError {
                    index,
                    message: format!("input serialization failed: {}", e),
                };
                observations.push(SampleObservation {
                    compute_secs: 0.0,
                    input_serialization_secs: input_ser_secs,
                    output_serialization_secs: 0.0,
                    serialized_input_bytes: 0,
                    serialized_output_bytes: 0,
                    error: Some(error.clone()),
                });
                errors.push(error);
                buffered.push(item);
                break;
            }
        };

        let compute_start = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| f(&item)));
        let compute_secs = compute_start.elapsed().as_secs_f64();

        match outcome {
            Ok(output) => {
                let out_start = Instant::now();
                let encoded_output = bincode::serialize(&output);
                let output_ser_secs = out_start.elapsed().as_secs_f64();

                match encoded_output {
                    Ok(bytes) => {
                        compute_stats.push(compute_secs);
                        input_ser_sum.add(input_ser_secs);
                        output_ser_sum.add(output_ser_secs);
                        input_bytes_sum += input_bytes as u64;
                        output_bytes_sum += bytes.len() as u64;
                        measured += 1;
                        observations.push(SampleObservation {
                            compute_secs,
                            input_serialization_secs: input_ser_secs,
                            output_serialization_secs: output_ser_secs,
                            serialized_input_bytes: input_bytes,
                            serialized_output_bytes: bytes.len(),
                            error: None,
                        });
                    }
                    Err(e) => {
                        warn!(index, error = %e, "output failed serialization; stopping sample pass");
                        data_serializable = false;
                        first_unserializable_index = Some(index);
                        let error = SampleError {
                            index,
                            message: format!("output serialization failed: {}", e),
                        };
                        observations.push(SampleObservation {
                            compute_secs,
                            input_serialization_secs: input_ser_secs,
                            output_serialization_secs: output_ser_secs,
                            serialized_input_bytes: input_bytes,
                            serialized_output_bytes: 0,
                            error: Some(error.clone()),
                        });
                        errors.push(error);
                        buffered.push(item);
                        break;
                    }
                }
            }
            Err(payload) => {
                let error = SampleError {
                    index,
                    message: panic_message(payload.as_ref()),
                };
                observations.push(SampleObservation {
                    compute_secs,
                    input_serialization_secs: input_ser_secs,
                    output_serialization_secs: 0.0,
                    serialized_input_bytes: input_bytes,
                    serialized_output_bytes: 0,
                    error: Some(error.clone()),
                });
                errors.push(error);
            }
        }

        buffered.push(item);
    }

    let wall_secs = wall_start.elapsed().as_secs_f64();
    let cpu_after = process_cpu_time_secs();
    let threads_after = current_thread_count();

    let cpu_time_ratio = match (cpu_before, cpu_after) {
        (Some(before), Some(after)) if wall_secs > 0.0 => {
            Some(((after - before) / wall_secs).clamp(0.0, 1.0))
        }
        _ => None,
    };
    let raw_cpu_factor = match (cpu_before, cpu_after) {
        (Some(before), Some(after)) if wall_secs > 0.0 => (after - before) / wall_secs,
        _ => 0.0,
    };

    // Thread growth from either direct thread counting or CPU time exceeding
    // wall time (only possible when the function fans out internally)
    let thread_growth = match (threads_before, threads_after) {
        (Some(before), Some(after)) if before > 0 => {
            let growth = after as f64 / before as f64;
            Some(growth.max(raw_cpu_factor))
        }
        _ if raw_cpu_factor > 1.0 => Some(raw_cpu_factor),
        _ => None,
    };

    let sample_count = buffered.len();
    let total_items = exact_total.or(if source_exhausted {
        Some(sample_count)
    } else {
        None
    });

    let summary = SamplingSummary {
        sample_count,
        total_items,
        mean_compute_secs: compute_stats.mean(),
        variance_compute_secs: compute_stats.variance(),
        coefficient_of_variation: compute_stats.coefficient_of_variation(),
        mean_input_serialization_secs: mean_of(input_ser_sum.value(), measured),
        mean_output_serialization_secs: mean_of(output_ser_sum.value(), measured),
        mean_input_bytes: mean_of(input_bytes_sum as f64, measured),
        mean_output_bytes: mean_of(output_bytes_sum as f64, measured),
        cpu_time_ratio,
        function_portable,
        data_serializable,
        first_unserializable_index,
        thread_growth,
        errors,
        observations,
    };

    debug!(
        sampled = summary.sample_count,
        mean_compute_secs = summary.mean_compute_secs,
        cv = summary.coefficient_of_variation,
        failures = summary.errors.len(),
        "sampling pass complete"
    );

    (summary, Reassembled::new(buffered, iter))
}

fn mean_of(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "function panicked".to_string()
    }
}

/// Accumulated CPU time of this process, in seconds.
fn process_cpu_time_secs() -> Option<f64> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    let process = sys.process(pid)?;
    Some(process.accumulated_cpu_time() as f64 / 1000.0)
}

/// Live thread count of this process (Linux procfs; None elsewhere).
fn current_thread_count() -> Option<usize> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("Threads:") {
            return rest.trim().parse().ok();
        }
    }
    None
}
