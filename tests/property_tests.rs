use proptest::prelude::*;

use metis::config::AdvisorConfig;
use metis::model::chunk_size_for;
use metis::model::speedup::{estimated_speedup, SpeedupInputs};
use metis::sample::{sample, SampleOptions};

fn double(x: &i64) -> i64 {
    x.wrapping_mul(2)
}

proptest! {
    #[test]
    fn speedup_stays_within_worker_bound(
        serial_secs in 1e-6f64..1e4,
        worker_count in 1usize..=64,
        creation in 0.0f64..1.0,
        ser_in in 0.0f64..1e-3,
        ser_out in 0.0f64..1e-3,
        dispatch in 0.0f64..1e-2,
        total_items in 1.0f64..1e6,
        num_chunks in 1.0f64..1e5,
    ) {
        let inputs = SpeedupInputs {
            serial_secs,
            worker_count,
            worker_creation_cost_secs: creation,
            input_serialization_secs_per_item: ser_in,
            output_serialization_secs_per_item: ser_out,
            chunk_dispatch_cost_secs: dispatch,
            total_items,
            num_chunks,
        };
        let speedup = estimated_speedup(&inputs);
        prop_assert!(speedup > 0.0, "speedup = {}", speedup);
        prop_assert!(speedup <= worker_count as f64, "speedup = {}", speedup);
    }

    #[test]
    fn higher_variance_never_grows_the_chunk(
        mean_secs in 1e-6f64..10.0,
        cv_low in 0.0f64..5.0,
        cv_delta in 0.0f64..5.0,
        target in 0.01f64..2.0,
    ) {
        let config = AdvisorConfig::default();
        let low = chunk_size_for(mean_secs, cv_low, target, &config);
        let high = chunk_size_for(mean_secs, cv_low + cv_delta, target, &config);
        prop_assert!(high <= low, "chunk grew from {} to {}", low, high);
        prop_assert!(high >= 1);
    }

    #[test]
    fn sampling_reconstructs_the_input_exactly(
        items in proptest::collection::vec(any::<i64>(), 0..200),
        sample_size in 1usize..50,
    ) {
        let options = SampleOptions {
            sample_size,
            function_portable_hint: None,
        };
        let (summary, reassembled) = sample(&double, items.clone(), &options);
        prop_assert_eq!(summary.sample_count, sample_size.min(items.len()));
        let recovered: Vec<i64> = reassembled.collect();
        prop_assert_eq!(recovered, items);
    }

    #[test]
    fn sampling_statistics_are_finite(
        items in proptest::collection::vec(any::<i64>(), 1..100),
    ) {
        let options = SampleOptions {
            sample_size: 30,
            function_portable_hint: None,
        };
        let (summary, _reassembled) = sample(&double, items, &options);
        prop_assert!(summary.mean_compute_secs.is_finite());
        prop_assert!(summary.coefficient_of_variation >= 0.0);
        prop_assert!(summary.errors.is_empty());
    }
}
