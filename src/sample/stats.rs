//! Numerically stable running statistics
//!
//! Timings are many small floats; naive accumulation loses precision and
//! storing every raw value wastes memory. Welford's update gives single-pass
//! mean/variance, and Kahan compensation keeps long sums of tiny durations
//! honest.

/// Single-pass mean and variance (Welford's algorithm).
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance (n-1 denominator); zero below two observations.
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Standard deviation over mean; zero when the mean is zero.
    pub fn coefficient_of_variation(&self) -> f64 {
        let mean = self.mean();
        if mean <= 0.0 {
            0.0
        } else {
            self.std_dev() / mean
        }
    }
}

/// Kahan compensated summation.
#[derive(Debug, Clone, Copy, Default)]
pub struct KahanSum {
    sum: f64,
    compensation: f64,
}

impl KahanSum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        let y = value - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }

    pub fn value(&self) -> f64 {
        self.sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welford_matches_direct_computation() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let mut stats = RunningStats::new();
        for v in values {
            stats.push(v);
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);

        assert!((stats.mean() - mean).abs() < 1e-12);
        assert!((stats.variance() - variance).abs() < 1e-12);
    }

    #[test]
    fn empty_and_single_observation_edge_cases() {
        let mut stats = RunningStats::new();
        assert_eq!(stats.mean(), 0.0);
        assert_eq!(stats.variance(), 0.0);
        assert_eq!(stats.coefficient_of_variation(), 0.0);

        stats.push(3.5);
        assert_eq!(stats.mean(), 3.5);
        assert_eq!(stats.variance(), 0.0);
    }

    #[test]
    fn cv_is_zero_for_constant_series() {
        let mut stats = RunningStats::new();
        for _ in 0..50 {
            stats.push(0.01);
        }
        assert!(stats.coefficient_of_variation() < 1e-9);
    }

    #[test]
    fn kahan_survives_many_tiny_increments() {
        let mut kahan = KahanSum::new();
        let mut naive = 0.0f64;
        for _ in 0..1_000_000 {
            kahan.add(1e-10);
            naive += 1e-10;
        }
        let expected = 1e-4;
        assert!((kahan.value() - expected).abs() <= (naive - expected).abs());
        assert!((kahan.value() - expected).abs() < 1e-12);
    }
}
