//! Decision cache collaborator seam
//!
//! The core never requires a cache: these types exist so a host application
//! can memoize decisions across runs. Fingerprints are deliberately coarse:
//! the function's type identity plus a log2 bucket of the item count, so
//! nearby input sizes share an entry.
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::DecisionResult;

/// Stable key for a (function, input-scale) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint for function type `F` applied to roughly `total_items`
    /// items.
    ///
    /// The type name pins the function identity (closures get distinct
    /// anonymous types); the bucket collapses item counts into powers of two.
    pub fn of<F>(total_items: usize) -> Self {
        let bucket = usize::BITS - total_items.leading_zeros();
        let mut hasher = Sha256::new();
        hasher.update(std::any::type_name::<F>().as_bytes());
        hasher.update([0u8]);
        hasher.update(std::mem::size_of::<F>().to_le_bytes());
        hasher.update(bucket.to_le_bytes());
        Fingerprint(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Storage interface for memoized decisions.
pub trait DecisionCache: Send + Sync {
    fn get(&self, fingerprint: &Fingerprint) -> Option<DecisionResult>;
    fn put(&self, fingerprint: Fingerprint, decision: DecisionResult);
}

/// In-process reference implementation.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<Fingerprint, DecisionResult>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DecisionCache for MemoryCache {
    fn get(&self, fingerprint: &Fingerprint) -> Option<DecisionResult> {
        self.entries.get(fingerprint).map(|entry| entry.clone())
    }

    fn put(&self, fingerprint: Fingerprint, decision: DecisionResult) {
        self.entries.insert(fingerprint, decision);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConfidenceFlags, DominantFactor, ExecutorKind};

    fn decision() -> DecisionResult {
        DecisionResult {
            worker_count: 4,
            chunk_size: 16,
            executor: ExecutorKind::ProcessPool,
            estimated_speedup: 3.2,
            dominant_factor: DominantFactor::CoreConstrained,
            rationale: "test".into(),
            warnings: Vec::new(),
            confidence: ConfidenceFlags {
                used_measured_probe_data: true,
            },
            decided_at: chrono::Utc::now(),
        }
    }

    fn alpha(x: &u32) -> u32 {
        *x
    }

    fn beta(x: &u32) -> u32 {
        *x
    }

    #[test]
    fn same_function_and_scale_share_a_fingerprint() {
        assert_eq!(
            Fingerprint::of::<fn(&u32) -> u32>(1000),
            Fingerprint::of::<fn(&u32) -> u32>(1000)
        );
        // 1000 and 1023 land in the same power-of-two bucket
        assert_eq!(
            Fingerprint::of::<fn(&u32) -> u32>(1000),
            Fingerprint::of::<fn(&u32) -> u32>(1023)
        );
    }

    #[test]
    fn different_scales_differ() {
        assert_ne!(
            Fingerprint::of::<fn(&u32) -> u32>(100),
            Fingerprint::of::<fn(&u32) -> u32>(100_000)
        );
    }

    #[test]
    fn distinct_closures_get_distinct_fingerprints() {
        // Each closure has its own anonymous type
        let first = |x: &u32| *x;
        let second = |x: &u32| *x + 1;
        fn fingerprint_for<F>(_: &F) -> Fingerprint {
            Fingerprint::of::<F>(100)
        }
        assert_ne!(fingerprint_for(&first), fingerprint_for(&second));
        // Named functions keep the distinction too
        let _ = (alpha, beta);
    }

    #[test]
    fn memory_cache_round_trips() {
        let cache = MemoryCache::new();
        let key = Fingerprint::of::<fn(&u32) -> u32>(500);
        assert!(cache.get(&key).is_none());

        cache.put(key.clone(), decision());
        let cached = cache.get(&key).unwrap();
        assert_eq!(cached.worker_count, 4);
        assert_eq!(cache.len(), 1);
    }
}
