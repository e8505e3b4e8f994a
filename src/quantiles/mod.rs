//! Quantile estimation over a stream of weighted samples
//!
//! This module provides the digest that turns the weight-augmented tree in
//! [`crate::tree`] into a streaming percentile estimator.
//!
//! # Algorithm
//!
//! - [`TDigest`]: t-digest variant whose centroids live in a
//!   [`WeightedOrderTree`](crate::tree::WeightedOrderTree), with
//!   capacity-bounded merging and randomized recompression
//!
//! # Example
//!
//! ```
//! use core::time::Duration;
//! use treedigest::quantiles::TDigest;
//!
//! let mut digest = TDigest::new(100.0, Duration::from_secs(120));
//!
//! for value in [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0] {
//!     digest.add(value, 1.0);
//! }
//!
//! let median = digest.percentile(0.5);
//! println!("median: {:?}", median);
//! ```

mod tdigest;

pub use tdigest::TDigest;
