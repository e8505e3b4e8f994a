//! Weight-augmented ordered search tree
//!
//! This module provides the order-statistics structure underneath the
//! quantile digest: a red-black tree keyed by centroid mean in which every
//! node also maintains the total weight of its subtree.
//!
//! # Operations
//!
//! - [`WeightedOrderTree::insert`]: insert-or-merge keyed by mean
//! - [`WeightedOrderTree::remove`]: delete by mean (no-op when absent)
//! - [`WeightedOrderTree::floor`] / [`WeightedOrderTree::ceiling`] /
//!   [`WeightedOrderTree::neighbors`]: nearest-key lookups
//! - [`WeightedOrderTree::lower_weights`]: total weight at or below a key,
//!   in O(log n) via the subtree aggregates
//! - [`WeightedOrderTree::iter`]: lazy in-order traversal
//!
//! # Example
//!
//! ```
//! use treedigest::tree::WeightedOrderTree;
//!
//! let mut tree = WeightedOrderTree::new();
//! tree.insert(10.0, 2.0);
//! tree.insert(20.0, 1.0);
//! tree.insert(10.0, 1.0); // merges into the existing centroid
//!
//! assert_eq!(tree.len(), 2);
//! assert_eq!(tree.lower_weights(15.0), 3.0);
//! ```

mod rbtree;

pub use rbtree::{Centroid, Iter, WeightedOrderTree};
