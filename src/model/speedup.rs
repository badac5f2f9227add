//! Extended Amdahl's-Law speedup estimate
//!
//! Serial time divided by the parallel time including every fixed overhead
//! the advisor knows about. All four overhead terms are always present:
//! worker creation, input serialization, output serialization, and chunk
//! dispatch. Dropping any one understates overhead and inflates the
//! estimate, so there is deliberately no "simplified" variant.

/// Inputs to the speedup formula, all in seconds and item counts.
#[derive(Debug, Clone, Copy)]
pub struct SpeedupInputs {
    pub serial_secs: f64,
    pub worker_count: usize,
    pub worker_creation_cost_secs: f64,
    pub input_serialization_secs_per_item: f64,
    pub output_serialization_secs_per_item: f64,
    pub chunk_dispatch_cost_secs: f64,
    pub total_items: f64,
    pub num_chunks: f64,
}

/// Projected speedup versus sequential execution, capped at the worker count.
///
/// `speedup = T_serial / (C_create*W + T_serial/W + C_in*N + C_out*N + C_dispatch*chunks)`
pub fn estimated_speedup(inputs: &SpeedupInputs) -> f64 {
    let workers = inputs.worker_count.max(1) as f64;
    if inputs.serial_secs <= 0.0 {
        return 1.0;
    }

    let parallel_secs = inputs.worker_creation_cost_secs * workers
        + inputs.serial_secs / workers
        + inputs.input_serialization_secs_per_item * inputs.total_items
        + inputs.output_serialization_secs_per_item * inputs.total_items
        + inputs.chunk_dispatch_cost_secs * inputs.num_chunks;

    if parallel_secs <= 0.0 {
        return workers;
    }

    (inputs.serial_secs / parallel_secs).min(workers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_inputs() -> SpeedupInputs {
        SpeedupInputs {
            serial_secs: 100.0,
            worker_count: 8,
            worker_creation_cost_secs: 0.015,
            input_serialization_secs_per_item: 1e-6,
            output_serialization_secs_per_item: 1e-6,
            chunk_dispatch_cost_secs: 0.0005,
            total_items: 10_000.0,
            num_chunks: 500.0,
        }
    }

    #[test]
    fn large_cpu_bound_job_approaches_worker_count() {
        let speedup = estimated_speedup(&base_inputs());
        assert!(speedup > 6.0, "speedup = {}", speedup);
        assert!(speedup <= 8.0);
    }

    #[test]
    fn speedup_never_exceeds_worker_count() {
        let mut inputs = base_inputs();
        inputs.worker_creation_cost_secs = 0.0;
        inputs.input_serialization_secs_per_item = 0.0;
        inputs.output_serialization_secs_per_item = 0.0;
        inputs.chunk_dispatch_cost_secs = 0.0;
        assert_eq!(estimated_speedup(&inputs), 8.0);
    }

    #[test]
    fn overhead_dominated_job_drops_below_one() {
        let mut inputs = base_inputs();
        inputs.serial_secs = 0.01; // Tiny job, big overheads
        inputs.total_items = 10.0;
        inputs.num_chunks = 10.0;
        let speedup = estimated_speedup(&inputs);
        assert!(speedup < 1.0);
        assert!(speedup > 0.0);
    }

    #[test]
    fn each_overhead_term_reduces_the_estimate() {
        let full = estimated_speedup(&base_inputs());
        for drop in 0..4 {
            let mut inputs = base_inputs();
            match drop {
                0 => inputs.worker_creation_cost_secs = 0.0,
                1 => inputs.input_serialization_secs_per_item = 0.0,
                2 => inputs.output_serialization_secs_per_item = 0.0,
                _ => inputs.chunk_dispatch_cost_secs = 0.0,
            }
            assert!(estimated_speedup(&inputs) >= full);
        }
    }

    #[test]
    fn zero_serial_time_is_neutral() {
        let mut inputs = base_inputs();
        inputs.serial_secs = 0.0;
        assert_eq!(estimated_speedup(&inputs), 1.0);
    }
}
