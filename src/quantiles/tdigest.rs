//! t-digest quantile estimator over a weighted order tree
//!
//! Streaming implementation of the t-digest algorithm. Centroids are kept
//! in a [`WeightedOrderTree`], whose prefix-weight query supplies each
//! centroid's rank in O(log n); the rank bounds how much weight the
//! centroid may absorb before new samples must open a centroid of their
//! own. A randomized recompression pass keeps the centroid count bounded
//! near `20 × compression`.
//!
//! # Thread Safety
//!
//! `TDigest` is plain mutable state with no internal locking: mutators
//! take `&mut self` and queries take `&self`. Share across threads only
//! behind external synchronization.

use crate::tree::{Centroid, WeightedOrderTree};
use core::time::Duration;

#[cfg(feature = "std")]
use std::vec::Vec;

#[cfg(not(feature = "std"))]
extern crate alloc;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Simple xorshift64 PRNG for no_std compatibility
#[derive(Clone, Debug)]
struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 0x853c49e6748fea9b } else { seed },
        }
    }

    fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Generate random usize in [0, bound)
    fn next_bounded(&mut self, bound: usize) -> usize {
        // Rejection sampling to eliminate modulo bias.
        let bound = bound as u64;
        let threshold = bound.wrapping_neg() % bound;
        loop {
            let r = self.next();
            if r >= threshold {
                return (r % bound) as usize;
            }
        }
    }
}

/// Streaming quantile digest backed by a weight-augmented red-black tree.
///
/// The digest folds `(value, weight)` samples into a bounded set of
/// centroids. A centroid at normalized rank `q` may hold at most
/// `24 · total_weight · q · (1 − q) / compression` weight, so centroids
/// stay small near the tails and the extreme percentiles stay sharp.
///
/// # Compression Parameter
///
/// Controls the accuracy/memory tradeoff:
/// - Higher compression = more centroids = better accuracy = more memory
/// - The centroid count is kept near `20 × compression`
///
/// # Randomness
///
/// Recompression shuffles the centroids before replaying them. The shuffle
/// is driven by a digest-owned PRNG; construct with
/// [`with_seed`](TDigest::with_seed) for reproducible behavior.
///
/// # Example
///
/// ```
/// use core::time::Duration;
/// use treedigest::quantiles::TDigest;
///
/// let mut digest = TDigest::new(100.0, Duration::from_secs(120));
///
/// // Stream in weighted samples
/// for i in 0..1000 {
///     digest.add(i as f64, 1.0);
/// }
///
/// let p50 = digest.percentile(0.5).unwrap();
/// let p95 = digest.percentile(0.95).unwrap();
/// assert!(p50 > 400.0 && p50 < 600.0);
/// assert!(p95 > 900.0);
/// ```
#[derive(Clone, Debug)]
pub struct TDigest {
    /// Compression parameter (higher = more accuracy, more memory)
    compression: f64,
    /// Advisory interval between caller-driven recompressions
    recompress_interval: Duration,
    /// Sum of all accepted sample weights
    total_weight: f64,
    /// Smallest value seen
    min: f64,
    /// Largest value seen
    max: f64,
    /// Centroids, keyed by mean
    tree: WeightedOrderTree,
    /// Shuffle source for recompression
    rng: Xorshift64,
}

impl TDigest {
    const DEFAULT_SEED: u64 = 0x12345678;

    /// Create a digest with the given compression parameter.
    ///
    /// # Arguments
    ///
    /// * `compression` - Accuracy/memory tradeoff, typically 50-500. Must
    ///   be finite and positive.
    /// * `recompress_interval` - Advisory cadence for callers that drive
    ///   periodic [`compress`](TDigest::compress) themselves; the digest
    ///   recompresses automatically whenever the centroid count exceeds
    ///   `20 × compression`, independent of this hint.
    ///
    /// # Panics
    ///
    /// Panics if `compression` is not finite or not positive.
    pub fn new(compression: f64, recompress_interval: Duration) -> Self {
        Self::with_seed(compression, recompress_interval, Self::DEFAULT_SEED)
    }

    /// Create a digest with an explicit shuffle seed, for reproducible
    /// recompression.
    ///
    /// # Panics
    ///
    /// Panics if `compression` is not finite or not positive.
    pub fn with_seed(compression: f64, recompress_interval: Duration, seed: u64) -> Self {
        assert!(
            compression.is_finite() && compression > 0.0,
            "compression must be finite and positive, got {}",
            compression
        );
        Self {
            compression,
            recompress_interval,
            total_weight: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            tree: WeightedOrderTree::new(),
            rng: Xorshift64::new(seed),
        }
    }

    /// Get the compression parameter.
    pub fn compression(&self) -> f64 {
        self.compression
    }

    /// Get the advisory recompression interval passed at construction.
    pub fn recompress_interval(&self) -> Duration {
        self.recompress_interval
    }

    /// Current number of centroids.
    pub fn num_centroids(&self) -> usize {
        self.tree.len()
    }

    /// Whether the digest has absorbed no samples.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Sum of all accepted sample weights.
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Smallest value seen, or `None` when empty.
    pub fn min(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.min)
        }
    }

    /// Largest value seen, or `None` when empty.
    pub fn max(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.max)
        }
    }

    /// In-order snapshot of the digest's centroids.
    pub fn centroids(&self) -> Vec<Centroid> {
        self.tree.centroids()
    }

    /// Reset the digest to its empty state.
    pub fn clear(&mut self) {
        self.tree.clear();
        self.total_weight = 0.0;
        self.min = f64::INFINITY;
        self.max = f64::NEG_INFINITY;
    }

    /// Absorb one weighted sample.
    ///
    /// NaN values and non-positive (or NaN) weights are silently ignored:
    /// they represent "nothing to add", not caller errors.
    ///
    /// The sample is folded into the centroid at or immediately below
    /// `value` when that centroid's capacity allows it; any weight the
    /// centroid cannot take becomes a new centroid at `value`. When the
    /// centroid count exceeds `20 × compression`, the digest recompresses
    /// itself.
    pub fn add(&mut self, value: f64, weight: f64) {
        if value.is_nan() || !(weight > 0.0) {
            return;
        }
        self.total_weight += weight;
        // Checked independently: one sample can extend either bound.
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }

        if self.tree.is_empty() {
            self.tree.insert(value, weight);
            return;
        }

        let mut remaining = weight;
        if let Some(closest) = self.tree.floor(value) {
            // Midpoint rank of the candidate centroid: everything strictly
            // below it plus half its own weight.
            let q = (self.tree.lower_weights(closest.mean) - closest.weight / 2.0)
                / self.total_weight;
            let capacity = 24.0 * self.total_weight * q * (1.0 - q) / self.compression;
            if closest.weight + remaining <= capacity {
                let delta = (capacity - closest.weight).min(remaining);
                self.merge_into(closest, value, delta);
                remaining -= delta;
            }
        }
        if remaining > 0.0 {
            self.tree.insert(value, remaining);
        }

        if self.tree.len() as f64 > 20.0 * self.compression {
            self.compress();
        }
    }

    /// Fold `w` units of weight at `value` into an existing centroid. The
    /// centroid's mean moves, so it is re-keyed: removed, updated,
    /// reinserted.
    fn merge_into(&mut self, centroid: Centroid, value: f64, w: f64) {
        let mut updated = centroid;
        self.tree.remove(updated.mean);
        updated.add(value, w);
        self.tree.insert(updated.mean, updated.weight);
    }

    /// Rebuild the digest from its own centroids in uniformly random order.
    ///
    /// Weight-preserving: the replay re-accumulates `total_weight` to
    /// exactly its prior value, and `min`/`max` are untouched since every
    /// centroid mean lies within them. Only centroid locality and count
    /// change.
    pub fn compress(&mut self) {
        let mut centroids = self.tree.centroids();
        // Fisher-Yates
        for i in (1..centroids.len()).rev() {
            let j = self.rng.next_bounded(i + 1);
            centroids.swap(i, j);
        }
        self.tree.clear();
        self.total_weight = 0.0;
        for c in centroids {
            self.add(c.mean, c.weight);
        }
    }

    /// Estimate the value at quantile `q`.
    ///
    /// Walks the centroids in increasing-mean order and interpolates
    /// within the half-weight region containing rank `q × total_weight`.
    /// The region below the first centroid's midpoint is anchored at the
    /// tracked minimum and the region above the last centroid's midpoint
    /// at the tracked maximum, so `percentile(0.0)` and `percentile(1.0)`
    /// reproduce the stream extremes.
    ///
    /// Returns `None` when the digest is empty.
    ///
    /// # Panics
    ///
    /// Panics if `q` is outside `[0, 1]`.
    pub fn percentile(&self, q: f64) -> Option<f64> {
        assert!(
            (0.0..=1.0).contains(&q),
            "percentile rank must be within [0, 1], got {}",
            q
        );
        if self.tree.is_empty() {
            return None;
        }
        if self.tree.len() == 1 {
            return self.tree.min().map(|c| c.mean);
        }

        let index = q * self.total_weight;
        let mut iter = self.tree.iter();
        let first = iter.next()?;

        // Anchor ranks at each centroid's half-weight midpoint.
        let mut weight_so_far = first.weight / 2.0;
        if index < weight_so_far {
            // Below the first midpoint: interpolate from the tracked
            // minimum (rank 0) up to the first mean.
            return Some(
                (self.min * (weight_so_far - index) + first.mean * index) / weight_so_far,
            );
        }

        let mut current = first;
        for next in iter {
            let span = (current.weight + next.weight) / 2.0;
            if weight_so_far + span > index {
                // Inverse-distance weighting between the two anchors.
                let above = index - weight_so_far;
                let below = weight_so_far + span - index;
                return Some((next.mean * above + current.mean * below) / (above + below));
            }
            weight_so_far += span;
            current = next;
        }

        // Past the last midpoint: interpolate up to the tracked maximum.
        let above = index - weight_so_far;
        let below = current.weight / 2.0 - above;
        Some((current.mean * below + self.max * above) / (above + below))
    }
}

// ============================================================================
// Tests
// ============================================================================
