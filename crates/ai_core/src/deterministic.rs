//! Deterministic utilities for reproducible training
//!
//! Provides LCG-based RNG, deterministic hashing, and tie-breaking logic
//! to ensure identical ensembles across platforms and runs.

use std::cmp::Ordering;
use std::num::Wrapping;

/// Linear Congruential Generator for deterministic pseudo-randomness
/// Uses constants from Numerical Recipes (glibc)
#[derive(Clone, Debug)]
pub struct LcgRng {
    state: Wrapping<i64>,
}

impl LcgRng {
    // LCG constants (compatible with glibc)
    const MULTIPLIER: i64 = 1103515245;
    const INCREMENT: i64 = 12345;
    const MODULUS: i64 = 1 << 31;

    pub fn new(seed: i64) -> Self {
        Self {
            state: Wrapping(seed.rem_euclid(Self::MODULUS)),
        }
    }

    /// Generate next random i64 in range [0, MODULUS)
    pub fn next_i64(&mut self) -> i64 {
        self.state = self.state * Wrapping(Self::MULTIPLIER) + Wrapping(Self::INCREMENT);
        self.state.0 & (Self::MODULUS - 1)
    }

    /// Generate an index in range [0, bound)
    ///
    /// Maps through the high bits of the state; the low bits of a
    /// power-of-two LCG cycle with short periods.
    pub fn next_index(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        let r = self.next_i64() as u128;
        ((r * bound as u128) >> 31) as usize
    }

    /// Fisher-Yates shuffle in place
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_index(i + 1);
            items.swap(i, j);
        }
    }

    /// Draw `k` distinct indices from [0, n) in draw order
    pub fn sample_indices(&mut self, n: usize, k: usize) -> Vec<usize> {
        let mut pool: Vec<usize> = (0..n).collect();
        let k = k.min(n);
        for i in 0..k {
            let j = i + self.next_index(n - i);
            pool.swap(i, j);
        }
        pool.truncate(k);
        pool
    }
}

/// Deterministic xxhash64-like hash in pure i64 arithmetic
/// Used to derive independent per-tree seeds from one ensemble seed
pub fn xxhash64_i64(data: &[i64], seed: i64) -> i64 {
    const PRIME1: i64 = 0x9E3779B185EBCA87_u64 as i64;
    const PRIME2: i64 = 0xC2B2AE3D27D4EB4F_u64 as i64;
    const PRIME3: i64 = 0x165667B19E3779F9_u64 as i64;
    const PRIME5: i64 = 0x85EBCA77C2B2AE63_u64 as i64;

    let mut h = seed.wrapping_add(PRIME5);

    for &val in data {
        h = h.wrapping_add(val.wrapping_mul(PRIME3));
        h = h.rotate_left(17).wrapping_mul(PRIME2);
    }

    h ^= h >> 33;
    h = h.wrapping_mul(PRIME1);
    h ^= h >> 29;
    h = h.wrapping_mul(PRIME2);
    h ^= h >> 32;

    h
}

/// Deterministic tie-breaker for split selection
/// Orders candidates by (feature_idx, threshold); lower wins
#[derive(Debug, Clone, Copy)]
pub struct SplitTieBreaker {
    pub feature_idx: usize,
    pub threshold: f64,
}

impl SplitTieBreaker {
    pub fn new(feature_idx: usize, threshold: f64) -> Self {
        Self {
            feature_idx,
            threshold,
        }
    }
}

impl PartialEq for SplitTieBreaker {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SplitTieBreaker {}

impl PartialOrd for SplitTieBreaker {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SplitTieBreaker {
    fn cmp(&self, other: &Self) -> Ordering {
        self.feature_idx
            .cmp(&other.feature_idx)
            .then_with(|| self.threshold.total_cmp(&other.threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lcg_determinism() {
        let mut rng1 = LcgRng::new(42);
        let mut rng2 = LcgRng::new(42);

        for _ in 0..100 {
            assert_eq!(rng1.next_i64(), rng2.next_i64());
        }
    }

    #[test]
    fn test_lcg_index_range() {
        let mut rng = LcgRng::new(42);
        for _ in 0..1000 {
            let val = rng.next_index(10);
            assert!(val < 10);
        }
        assert_eq!(rng.next_index(0), 0);
    }

    #[test]
    fn test_negative_seed_is_accepted() {
        let mut rng = LcgRng::new(i64::MIN);
        assert!(rng.next_i64() >= 0);
    }

    #[test]
    fn test_index_covers_small_bounds() {
        let mut rng = LcgRng::new(7);
        let mut seen = [false; 2];
        for _ in 0..64 {
            seen[rng.next_index(2)] = true;
        }
        assert!(seen[0] && seen[1]);
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = LcgRng::new(42);
        let mut items: Vec<usize> = (0..50).collect();
        rng.shuffle(&mut items);

        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_sample_indices_distinct() {
        let mut rng = LcgRng::new(3);
        let picked = rng.sample_indices(9, 3);
        assert_eq!(picked.len(), 3);
        assert!(picked.iter().all(|&i| i < 9));
        assert_ne!(picked[0], picked[1]);
        assert_ne!(picked[1], picked[2]);
        assert_ne!(picked[0], picked[2]);

        assert_eq!(rng.sample_indices(2, 5).len(), 2);
    }

    #[test]
    fn test_xxhash64_determinism() {
        let data = vec![1, 2, 3, 4, 5];
        let h1 = xxhash64_i64(&data, 42);
        let h2 = xxhash64_i64(&data, 42);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_xxhash64_different_seeds() {
        let data = vec![1, 2, 3, 4, 5];
        let h1 = xxhash64_i64(&data, 42);
        let h2 = xxhash64_i64(&data, 43);
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_tie_breaker_ordering() {
        let t1 = SplitTieBreaker::new(0, 0.5);
        let t2 = SplitTieBreaker::new(0, 1.5);
        let t3 = SplitTieBreaker::new(1, -3.0);

        assert!(t1 < t2);
        assert!(t1 < t3);
        assert!(t2 < t3);
        assert_eq!(t1, SplitTieBreaker::new(0, 0.5));
    }
}
