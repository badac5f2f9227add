//! Micro-benchmarks behind the system profile
//!
//! Two costs are measured empirically: the marginal cost of creating one more
//! worker process, and the marginal cost of dispatching one more chunk to an
//! already-running worker pool. Both are bounded by a hard deadline and both
//! reap every worker they start on every exit path.
use std::hint::black_box;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use crossbeam::channel;
use tracing::debug;

use crate::config::ProbeConfig;
use crate::probe::gates::{
    validate_dispatch_cost, validate_worker_cost, DispatchCostObservation, MeasurementOutcome,
    WorkerCostObservation,
};
use crate::probe::ProcessCreationStrategy;

const WORKER_BENCH_ATTEMPTS: usize = 3;
const DISPATCH_WORKER_THREADS: usize = 2;
const DISPATCH_COARSE_CHUNKS: usize = 8;
const DISPATCH_FINE_CHUNKS: usize = 512;

/// Kills and reaps a child process if it is still running when dropped.
struct ChildGuard(Option<Child>);

impl ChildGuard {
    fn new(child: Child) -> Self {
        ChildGuard(Some(child))
    }

    /// Waits for exit, polling so the deadline can interrupt a stuck child.
    fn wait_until(&mut self, deadline: Instant) -> Result<(), String> {
        let child = match self.0.as_mut() {
            Some(child) => child,
            None => return Ok(()),
        };
        loop {
            match child.try_wait() {
                Ok(Some(_)) => {
                    self.0 = None;
                    return Ok(());
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        return Err("worker did not exit before deadline".into());
                    }
                    std::thread::sleep(Duration::from_micros(200));
                }
                Err(e) => return Err(format!("wait failed: {}", e)),
            }
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Some(mut child) = self.0.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn trivial_command() -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "exit"]);
        cmd
    } else {
        Command::new("true")
    }
}

/// Spawns `count` trivial workers concurrently and waits for all of them.
///
/// Returns wall-clock seconds for the whole batch.
fn run_worker_batch(count: usize, deadline: Instant) -> Result<f64, String> {
    let start = Instant::now();
    let mut guards = Vec::with_capacity(count);
    for _ in 0..count {
        let child = trivial_command()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| format!("failed to spawn probe worker: {}", e))?;
        guards.push(ChildGuard::new(child));
    }
    for guard in guards.iter_mut() {
        guard.wait_until(deadline)?;
    }
    Ok(start.elapsed().as_secs_f64())
}

/// Measures the marginal cost of one additional worker process.
///
/// Compares a one-worker batch against a two-worker batch; the difference is
/// the creation cost of the extra worker. Retries until an attempt passes the
/// quality gates or the attempt budget runs out.
pub fn measure_worker_creation_cost(
    strategy: ProcessCreationStrategy,
    config: &ProbeConfig,
) -> MeasurementOutcome {
    let deadline = Instant::now() + Duration::from_secs_f64(config.benchmark_deadline_secs);
    let mut last: Option<MeasurementOutcome> = None;

    for attempt in 0..WORKER_BENCH_ATTEMPTS {
        if Instant::now() >= deadline {
            break;
        }
        let base_secs = match run_worker_batch(1, deadline) {
            Ok(t) => t,
            Err(reason) => {
                return MeasurementOutcome::fallback(strategy.fallback_cost_secs(), reason)
            }
        };
        let extended_secs = match run_worker_batch(2, deadline) {
            Ok(t) => t,
            Err(reason) => {
                return MeasurementOutcome::fallback(strategy.fallback_cost_secs(), reason)
            }
        };

        let obs = WorkerCostObservation {
            base_secs,
            extended_secs,
            workers_base: 1,
            workers_extended: 2,
        };
        let outcome = validate_worker_cost(&obs, strategy, config);
        debug!(
            attempt,
            base_secs,
            extended_secs,
            accepted = outcome.is_measured(),
            "worker creation probe"
        );
        if outcome.is_measured() {
            return outcome;
        }
        last = Some(outcome);
    }

    last.unwrap_or_else(|| {
        MeasurementOutcome::fallback(
            strategy.fallback_cost_secs(),
            "benchmark deadline exceeded before any attempt",
        )
    })
}

fn spin(iterations: u64) {
    let mut acc = 0u64;
    for i in 0..iterations {
        acc = acc.wrapping_add(black_box(i));
    }
    black_box(acc);
}

/// Runs a fixed amount of spin work through a small thread pool, split into
/// `chunks` dispatches. Returns wall-clock seconds.
fn run_dispatch_batch(total_spins: u64, chunks: usize) -> f64 {
    let (tx, rx) = channel::unbounded::<u64>();
    let per_chunk = (total_spins / chunks as u64).max(1);

    let start = Instant::now();
    std::thread::scope(|scope| {
        for _ in 0..DISPATCH_WORKER_THREADS {
            let rx = rx.clone();
            scope.spawn(move || {
                while let Ok(spins) = rx.recv() {
                    spin(spins);
                }
            });
        }
        drop(rx);
        for _ in 0..chunks {
            let _ = tx.send(per_chunk);
        }
        drop(tx);
    });
    start.elapsed().as_secs_f64()
}

/// Calibrates how many spin iterations fit in roughly the given duration.
fn calibrate_spins(target: Duration) -> u64 {
    const PROBE_SPINS: u64 = 1_000_000;
    let start = Instant::now();
    spin(PROBE_SPINS);
    let elapsed = start.elapsed().as_secs_f64();
    if elapsed <= 0.0 {
        return PROBE_SPINS;
    }
    let per_spin = elapsed / PROBE_SPINS as f64;
    ((target.as_secs_f64() / per_spin) as u64).clamp(PROBE_SPINS / 10, 2_000_000_000)
}

/// Measures the marginal cost of dispatching one additional chunk.
///
/// The same total work runs once with few large chunks and once with many
/// small chunks; the slowdown divided by the extra dispatch count is the
/// per-chunk cost.
pub fn measure_chunk_dispatch_cost(config: &ProbeConfig) -> MeasurementOutcome {
    let deadline = Instant::now() + Duration::from_secs_f64(config.benchmark_deadline_secs);
    let total_spins = calibrate_spins(Duration::from_millis(40));

    if Instant::now() >= deadline {
        return MeasurementOutcome::fallback(
            config.dispatch_fallback_secs,
            "benchmark deadline exceeded before dispatch probe",
        );
    }
    let coarse_secs = run_dispatch_batch(total_spins, DISPATCH_COARSE_CHUNKS);

    if Instant::now() >= deadline {
        return MeasurementOutcome::fallback(
            config.dispatch_fallback_secs,
            "benchmark deadline exceeded after coarse dispatch run",
        );
    }
    let fine_secs = run_dispatch_batch(total_spins, DISPATCH_FINE_CHUNKS);

    let obs = DispatchCostObservation {
        coarse_secs,
        fine_secs,
        coarse_chunks: DISPATCH_COARSE_CHUNKS,
        fine_chunks: DISPATCH_FINE_CHUNKS,
    };
    let outcome = validate_dispatch_cost(&obs, config);
    debug!(
        coarse_secs,
        fine_secs,
        accepted = outcome.is_measured(),
        "chunk dispatch probe"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_batches_take_time() {
        let deadline = Instant::now() + Duration::from_secs(5);
        let elapsed = run_worker_batch(1, deadline).unwrap();
        assert!(elapsed > 0.0);
    }

    #[test]
    fn dispatch_batch_completes_all_work() {
        let elapsed = run_dispatch_batch(1_000_000, 16);
        assert!(elapsed > 0.0);
    }

    #[test]
    fn worker_measurement_always_yields_a_cost() {
        let config = crate::config::AdvisorConfig::default().probe;
        let strategy = ProcessCreationStrategy::detect();
        let outcome = measure_worker_creation_cost(strategy, &config);
        // Measured or defaulted, the value must be usable either way
        assert!(outcome.value_secs() > 0.0);
    }

    #[test]
    fn dispatch_measurement_always_yields_a_cost() {
        let config = crate::config::AdvisorConfig::default().probe;
        let outcome = measure_chunk_dispatch_cost(&config);
        assert!(outcome.value_secs() > 0.0);
    }
}
