//! # Treedigest
//!
//! Streaming quantile (percentile) estimation for Rust, backed by a
//! weight-augmented red-black tree.
//!
//! Treedigest keeps a bounded set of weighted *centroids* — representative
//! points summarizing one or more merged samples — inside a self-balancing
//! search tree whose nodes carry subtree weight aggregates. The aggregate
//! answers "how much total weight lies at or below this value?" in
//! O(log n), which is what lets the digest decide in logarithmic time
//! whether an incoming sample may be folded into an existing centroid or
//! must open a new one.
//!
//! ## Features
//!
//! - **Bounded memory**: the centroid count stays near `20 × compression`
//!   regardless of stream length
//! - **Weighted samples**: every sample carries an arbitrary positive weight
//! - **Accurate tails**: centroid capacity shrinks toward the extremes, so
//!   p01/p99 stay sharp
//! - **Deterministic testing**: the recompression shuffle is driven by a
//!   seedable PRNG
//! - **Standalone tree**: [`tree::WeightedOrderTree`] is usable on its own
//!   as an order-statistics structure over weighted keys
//!
//! ## Quick Start
//!
//! ```rust
//! use core::time::Duration;
//! use treedigest::prelude::*;
//!
//! let mut digest = TDigest::new(100.0, Duration::from_secs(120));
//!
//! // Stream in (value, weight) samples
//! for i in 1..=1000 {
//!     digest.add(i as f64, 1.0);
//! }
//!
//! // Query percentiles
//! let p50 = digest.percentile(0.5).unwrap();
//! let p99 = digest.percentile(0.99).unwrap();
//! assert!(p50 > 450.0 && p50 < 550.0);
//! assert!(p99 > 950.0);
//! ```
//!
//! ## The tree on its own
//!
//! ```rust
//! use treedigest::tree::WeightedOrderTree;
//!
//! let mut tree = WeightedOrderTree::new();
//! for v in [5.0, 6.0, 12.0, 1.0, 7.0, 9.0, 13.0] {
//!     tree.insert(v, 1.0);
//! }
//!
//! // Total weight at or below 6.0: the centroids at 1, 5 and 6
//! assert_eq!(tree.lower_weights(6.0), 3.0);
//! ```
//!
//! ## Platform features
//!
//! - `std` (default): standard library support. Disable for `no_std` use
//!   (an allocator is still required).

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod quantiles;
pub mod tree;

pub mod prelude {
    pub use crate::quantiles::TDigest;
    pub use crate::tree::{Centroid, WeightedOrderTree};
}

pub use quantiles::TDigest;
pub use tree::{Centroid, WeightedOrderTree};
