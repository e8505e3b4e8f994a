//! Red-black tree over weighted centroids with subtree weight aggregates
//!
//! Nodes live in a flat arena (`Vec` plus a free list) and reference each
//! other by index, so rotations are plain handle reassignments with no
//! ownership cycles. Every node carries the total weight of its subtree,
//! maintained eagerly through every insert, merge, delete and rotation —
//! the prefix-weight query depends on it.

use core::fmt;

#[cfg(feature = "std")]
use std::{string::String, vec::Vec};

#[cfg(not(feature = "std"))]
extern crate alloc;
#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

/// A weighted representative point summarizing one or more merged samples.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Centroid {
    /// Mean value of the merged samples
    pub mean: f64,
    /// Accumulated weight (positive)
    pub weight: f64,
}

impl Centroid {
    /// Create a new centroid.
    pub fn new(mean: f64, weight: f64) -> Self {
        Self { mean, weight }
    }

    /// Fold `w` units of weight at `value` into the centroid, moving the
    /// mean by the weighted average.
    pub fn add(&mut self, value: f64, w: f64) {
        self.weight += w;
        self.mean += (value - self.mean) * w / self.weight;
    }
}

type NodeId = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

#[derive(Clone, Debug)]
struct Node {
    centroid: Centroid,
    /// centroid.weight + subtree_weight(left) + subtree_weight(right)
    subtree_weight: f64,
    color: Color,
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
}

/// Self-balancing search tree keyed by centroid mean, augmented with
/// subtree weight totals.
///
/// Means are unique: inserting a key that already exists merges the weight
/// into the existing centroid instead of creating a duplicate. The weight
/// aggregate makes [`lower_weights`](WeightedOrderTree::lower_weights) —
/// "how much total weight lies at or below this key" — an O(log n) query.
///
/// All operations run to completion on the caller's thread; there is no
/// internal locking. Shared access across threads must be serialized by the
/// caller.
///
/// # Example
///
/// ```
/// use treedigest::tree::WeightedOrderTree;
///
/// let mut tree = WeightedOrderTree::new();
/// for (mean, weight) in [(4.0, 1.0), (9.0, 2.5), (1.0, 1.0)] {
///     tree.insert(mean, weight);
/// }
///
/// assert_eq!(tree.lower_weights(9.0), 4.5);
/// assert_eq!(tree.floor(8.0).unwrap().mean, 4.0);
/// ```
#[derive(Clone, Debug)]
pub struct WeightedOrderTree {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
    len: usize,
}

impl WeightedOrderTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            len: 0,
        }
    }

    /// Number of centroids in the tree.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no centroids.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total weight across all centroids.
    pub fn total_weight(&self) -> f64 {
        self.weight_of(self.root)
    }

    /// Drop all centroids.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.root = None;
        self.len = 0;
    }

    /// Insert `weight` at key `mean`.
    ///
    /// If a centroid with exactly this mean exists the weight is merged
    /// into it and no structural change happens; otherwise a new centroid
    /// is attached at its leaf position and the tree rebalances. NaN keys
    /// are ignored.
    pub fn insert(&mut self, mean: f64, weight: f64) {
        if mean.is_nan() {
            return;
        }
        let Some(mut cur) = self.root else {
            let id = self.alloc(Centroid::new(mean, weight), Color::Black);
            self.root = Some(id);
            self.len = 1;
            return;
        };
        let inserted = loop {
            let m = self.nodes[cur].centroid.mean;
            if mean == m {
                self.nodes[cur].centroid.add(mean, weight);
                self.bump_weights(Some(cur), weight);
                return;
            }
            let side = if mean < m { Side::Left } else { Side::Right };
            match self.child(cur, side) {
                Some(next) => cur = next,
                None => {
                    let id = self.alloc(Centroid::new(mean, weight), Color::Red);
                    self.nodes[id].parent = Some(cur);
                    self.set_child(cur, side, Some(id));
                    self.bump_weights(Some(cur), weight);
                    break id;
                }
            }
        };
        self.len += 1;
        self.insert_fixup(inserted);
    }

    /// Remove the centroid at exactly `mean`. No-op when absent.
    pub fn remove(&mut self, mean: f64) {
        let Some(found) = self.find(mean) else {
            return;
        };
        let mut target = found;
        if let (Some(left), Some(_)) = (self.nodes[target].left, self.nodes[target].right) {
            // Interior node: lift the in-order predecessor's payload into
            // this slot and remove the predecessor node instead.
            let pred = self.rightmost(left);
            let payload = self.nodes[pred].centroid;
            let delta = payload.weight - self.nodes[target].centroid.weight;
            self.nodes[target].centroid = payload;
            self.bump_weights(Some(target), delta);
            target = pred;
        }
        // `target` has at most one child. Its centroid leaves the tree:
        // take the weight out of every ancestor aggregate and neutralize
        // the node itself so fixup rotations recompute consistent values.
        let w = self.nodes[target].centroid.weight;
        self.bump_weights(self.nodes[target].parent, -w);
        self.nodes[target].subtree_weight -= w;
        self.nodes[target].centroid.weight = 0.0;

        let child = self.nodes[target].left.or(self.nodes[target].right);
        if self.nodes[target].color == Color::Black {
            self.nodes[target].color = self.color_of(child);
            self.delete_fixup(target);
        }
        let was_root = self.nodes[target].parent.is_none();
        self.replace_subtree(target, child);
        if was_root {
            if let Some(c) = child {
                self.nodes[c].color = Color::Black;
            }
        }
        self.release(target);
        self.len -= 1;
    }

    /// Centroid with the greatest mean at or below `x`.
    pub fn floor(&self, x: f64) -> Option<Centroid> {
        let mut floor = None;
        let mut cur = self.root;
        while let Some(id) = cur {
            let c = self.nodes[id].centroid;
            if x == c.mean {
                return Some(c);
            }
            if x < c.mean {
                cur = self.nodes[id].left;
            } else {
                floor = Some(c);
                cur = self.nodes[id].right;
            }
        }
        floor
    }

    /// Centroid with the smallest mean at or above `x`.
    pub fn ceiling(&self, x: f64) -> Option<Centroid> {
        let mut ceiling = None;
        let mut cur = self.root;
        while let Some(id) = cur {
            let c = self.nodes[id].centroid;
            if x == c.mean {
                return Some(c);
            }
            if x < c.mean {
                ceiling = Some(c);
                cur = self.nodes[id].left;
            } else {
                cur = self.nodes[id].right;
            }
        }
        ceiling
    }

    /// Floor and ceiling of `x` in a single descent. An exact match
    /// returns the same centroid on both sides.
    pub fn neighbors(&self, x: f64) -> (Option<Centroid>, Option<Centroid>) {
        let mut floor = None;
        let mut ceiling = None;
        let mut cur = self.root;
        while let Some(id) = cur {
            let c = self.nodes[id].centroid;
            if x == c.mean {
                return (Some(c), Some(c));
            }
            if x < c.mean {
                ceiling = Some(c);
                cur = self.nodes[id].left;
            } else {
                floor = Some(c);
                cur = self.nodes[id].right;
            }
        }
        (floor, ceiling)
    }

    /// Centroid with the smallest mean.
    pub fn min(&self) -> Option<Centroid> {
        self.root.map(|r| self.nodes[self.leftmost(r)].centroid)
    }

    /// Centroid with the greatest mean.
    pub fn max(&self) -> Option<Centroid> {
        self.root.map(|r| self.nodes[self.rightmost(r)].centroid)
    }

    /// Total weight of all centroids whose mean is at or below `x`.
    ///
    /// Runs in O(log n): whenever the key is at or above a node's mean,
    /// that node's own weight plus its left subtree's full aggregate are
    /// counted and the descent continues right; otherwise the descent
    /// continues left, contributing nothing at this node. Equals the
    /// weight sum a full in-order scan would produce.
    pub fn lower_weights(&self, x: f64) -> f64 {
        self.lower_weights_in(self.root, x)
    }

    fn lower_weights_in(&self, node: Option<NodeId>, x: f64) -> f64 {
        let Some(id) = node else {
            return 0.0;
        };
        let n = &self.nodes[id];
        if x >= n.centroid.mean {
            n.centroid.weight + self.weight_of(n.left) + self.lower_weights_in(n.right, x)
        } else {
            self.lower_weights_in(n.left, x)
        }
    }

    /// Lazy in-order iterator yielding centroid copies in increasing-mean
    /// order.
    ///
    /// The iterator walks successor links through parent references; the
    /// shared borrow it holds statically prevents the tree from being
    /// mutated while the iterator is live.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            tree: self,
            next: self.root.map(|r| self.leftmost(r)),
        }
    }

    /// In-order snapshot of all centroids.
    pub fn centroids(&self) -> Vec<Centroid> {
        self.iter().collect()
    }

    // ---- arena ----

    fn alloc(&mut self, centroid: Centroid, color: Color) -> NodeId {
        let node = Node {
            centroid,
            subtree_weight: centroid.weight,
            color,
            parent: None,
            left: None,
            right: None,
        };
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        self.nodes[id].parent = None;
        self.nodes[id].left = None;
        self.nodes[id].right = None;
        self.free.push(id);
    }

    // ---- structural helpers ----

    fn color_of(&self, id: Option<NodeId>) -> Color {
        id.map_or(Color::Black, |i| self.nodes[i].color)
    }

    fn weight_of(&self, id: Option<NodeId>) -> f64 {
        id.map_or(0.0, |i| self.nodes[i].subtree_weight)
    }

    fn child(&self, id: NodeId, side: Side) -> Option<NodeId> {
        match side {
            Side::Left => self.nodes[id].left,
            Side::Right => self.nodes[id].right,
        }
    }

    fn set_child(&mut self, id: NodeId, side: Side, child: Option<NodeId>) {
        match side {
            Side::Left => self.nodes[id].left = child,
            Side::Right => self.nodes[id].right = child,
        }
    }

    fn side_of(&self, id: NodeId, parent: NodeId) -> Side {
        if self.nodes[parent].left == Some(id) {
            Side::Left
        } else {
            Side::Right
        }
    }

    fn sibling(&self, id: NodeId) -> Option<NodeId> {
        let p = self.nodes[id].parent?;
        self.child(p, self.side_of(id, p).opposite())
    }

    fn find(&self, mean: f64) -> Option<NodeId> {
        let mut cur = self.root;
        while let Some(id) = cur {
            let m = self.nodes[id].centroid.mean;
            if mean == m {
                return Some(id);
            }
            cur = if mean < m {
                self.nodes[id].left
            } else {
                self.nodes[id].right
            };
        }
        None
    }

    fn leftmost(&self, mut id: NodeId) -> NodeId {
        while let Some(l) = self.nodes[id].left {
            id = l;
        }
        id
    }

    fn rightmost(&self, mut id: NodeId) -> NodeId {
        while let Some(r) = self.nodes[id].right {
            id = r;
        }
        id
    }

    fn successor(&self, id: NodeId) -> Option<NodeId> {
        if let Some(r) = self.nodes[id].right {
            return Some(self.leftmost(r));
        }
        let mut cur = id;
        while let Some(p) = self.nodes[cur].parent {
            if self.nodes[p].left == Some(cur) {
                return Some(p);
            }
            cur = p;
        }
        None
    }

    // ---- aggregate maintenance ----

    /// Recompute one node's aggregate from its own weight and children.
    fn refresh_weight(&mut self, id: NodeId) {
        let left = self.weight_of(self.nodes[id].left);
        let right = self.weight_of(self.nodes[id].right);
        self.nodes[id].subtree_weight = self.nodes[id].centroid.weight + left + right;
    }

    /// Apply a weight delta to `start` and every ancestor above it.
    fn bump_weights(&mut self, start: Option<NodeId>, delta: f64) {
        let mut cur = start;
        while let Some(id) = cur {
            self.nodes[id].subtree_weight += delta;
            cur = self.nodes[id].parent;
        }
    }

    // ---- rotation ----

    /// Rotate the subtree rooted at `id` toward `side`, promoting the
    /// child on the opposite side. Both pivoting nodes' aggregates are
    /// recomputed before returning; nothing above `id` changes membership.
    fn rotate(&mut self, id: NodeId, side: Side) {
        let pivot = self
            .child(id, side.opposite())
            .expect("rotation requires a child opposite the rotation direction");
        self.replace_subtree(id, Some(pivot));
        let inner = self.child(pivot, side);
        self.set_child(id, side.opposite(), inner);
        if let Some(c) = inner {
            self.nodes[c].parent = Some(id);
        }
        self.set_child(pivot, side, Some(id));
        self.nodes[id].parent = Some(pivot);
        self.refresh_weight(id);
        self.refresh_weight(pivot);
    }

    /// Replace the subtree rooted at `old` with `new` in `old`'s parent
    /// slot (or at the root). `old` keeps its own parent link.
    fn replace_subtree(&mut self, old: NodeId, new: Option<NodeId>) {
        match self.nodes[old].parent {
            None => self.root = new,
            Some(p) => {
                let side = self.side_of(old, p);
                self.set_child(p, side, new);
            }
        }
        if let Some(n) = new {
            self.nodes[n].parent = self.nodes[old].parent;
        }
    }

    // ---- rebalancing ----

    fn insert_fixup(&mut self, mut id: NodeId) {
        while let Some(parent) = self.nodes[id].parent {
            if self.nodes[parent].color == Color::Black {
                break;
            }
            // A red parent implies a grandparent: the root is always black.
            let Some(grand) = self.nodes[parent].parent else {
                break;
            };
            let side = self.side_of(parent, grand);
            let uncle = self.child(grand, side.opposite());
            if self.color_of(uncle) == Color::Red {
                // Red uncle: push the conflict two levels up.
                self.nodes[parent].color = Color::Black;
                if let Some(u) = uncle {
                    self.nodes[u].color = Color::Black;
                }
                self.nodes[grand].color = Color::Red;
                id = grand;
            } else {
                let mut cur = id;
                if self.child(parent, side.opposite()) == Some(cur) {
                    // Inner child: straighten the zig-zag first.
                    self.rotate(parent, side);
                    cur = parent;
                }
                if let Some(p) = self.nodes[cur].parent {
                    self.nodes[p].color = Color::Black;
                }
                self.nodes[grand].color = Color::Red;
                self.rotate(grand, side.opposite());
                break;
            }
        }
        if let Some(root) = self.root {
            self.nodes[root].color = Color::Black;
        }
    }

    fn delete_fixup(&mut self, id: NodeId) {
        // Reaching the root absorbs the missing blackness.
        let Some(parent) = self.nodes[id].parent else {
            return;
        };
        let side = self.side_of(id, parent);

        // A red sibling is rotated above the parent so the cases below
        // always see a black one.
        if self.color_of(self.sibling(id)) == Color::Red {
            self.nodes[parent].color = Color::Red;
            if let Some(s) = self.sibling(id) {
                self.nodes[s].color = Color::Black;
            }
            self.rotate(parent, side);
        }

        let Some(sib) = self.sibling(id) else {
            return;
        };
        let parent_color = self.nodes[parent].color;
        let sib_left = self.nodes[sib].left;
        let sib_right = self.nodes[sib].right;
        let nephews_black = self.color_of(sib_left) == Color::Black
            && self.color_of(sib_right) == Color::Black;

        if parent_color == Color::Black
            && self.nodes[sib].color == Color::Black
            && nephews_black
        {
            // Everything black: push the deficit one level up.
            self.nodes[sib].color = Color::Red;
            self.delete_fixup(parent);
            return;
        }
        if parent_color == Color::Red && self.nodes[sib].color == Color::Black && nephews_black {
            // The red parent donates its blackness.
            self.nodes[sib].color = Color::Red;
            self.nodes[parent].color = Color::Black;
            return;
        }

        // Near nephew red, far nephew black: rotate the sibling so the red
        // node ends up on the far side.
        if self.nodes[sib].color == Color::Black {
            if side == Side::Left
                && self.color_of(sib_left) == Color::Red
                && self.color_of(sib_right) == Color::Black
            {
                self.nodes[sib].color = Color::Red;
                if let Some(n) = sib_left {
                    self.nodes[n].color = Color::Black;
                }
                self.rotate(sib, Side::Right);
            } else if side == Side::Right
                && self.color_of(sib_right) == Color::Red
                && self.color_of(sib_left) == Color::Black
            {
                self.nodes[sib].color = Color::Red;
                if let Some(n) = sib_right {
                    self.nodes[n].color = Color::Black;
                }
                self.rotate(sib, Side::Left);
            }
        }

        // Far nephew red: one rotation through the parent pays the debt.
        let Some(sib) = self.sibling(id) else {
            return;
        };
        self.nodes[sib].color = self.nodes[parent].color;
        self.nodes[parent].color = Color::Black;
        if side == Side::Left && self.color_of(self.nodes[sib].right) == Color::Red {
            if let Some(n) = self.nodes[sib].right {
                self.nodes[n].color = Color::Black;
            }
            self.rotate(parent, Side::Left);
        } else if self.color_of(self.nodes[sib].left) == Color::Red {
            if let Some(n) = self.nodes[sib].left {
                self.nodes[n].color = Color::Black;
            }
            self.rotate(parent, Side::Right);
        }
    }

    fn render(
        &self,
        f: &mut fmt::Formatter<'_>,
        id: NodeId,
        prefix: &str,
        tail: bool,
    ) -> fmt::Result {
        if let Some(r) = self.nodes[id].right {
            let mut next = String::from(prefix);
            next.push_str(if tail { "│   " } else { "    " });
            self.render(f, r, &next, false)?;
        }
        let n = &self.nodes[id];
        writeln!(
            f,
            "{}{}mean={:.3} weight={:.3} subtree={:.3}",
            prefix,
            if tail { "└── " } else { "┌── " },
            n.centroid.mean,
            n.centroid.weight,
            n.subtree_weight
        )?;
        if let Some(l) = self.nodes[id].left {
            let mut next = String::from(prefix);
            next.push_str(if tail { "    " } else { "│   " });
            self.render(f, l, &next, true)?;
        }
        Ok(())
    }
}

impl Default for WeightedOrderTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WeightedOrderTree {
    /// Box-drawing rendering of the tree structure, right subtrees above.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "WeightedOrderTree")?;
        if let Some(root) = self.root {
            self.render(f, root, "", true)?;
        }
        Ok(())
    }
}

/// In-order tree iterator. See [`WeightedOrderTree::iter`].
#[derive(Clone, Debug)]
pub struct Iter<'a> {
    tree: &'a WeightedOrderTree,
    next: Option<NodeId>,
}

impl Iterator for Iter<'_> {
    type Item = Centroid;

    fn next(&mut self) -> Option<Centroid> {
        let id = self.next?;
        self.next = self.tree.successor(id);
        Some(self.tree.nodes[id].centroid)
    }
}

impl<'a> IntoIterator for &'a WeightedOrderTree {
    type Item = Centroid;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    /// Full structural audit: balance invariants, parent links, BST order,
    /// and the subtree weight aggregate recomputed from scratch.
    fn assert_invariants(tree: &WeightedOrderTree) {
        match tree.root {
            Some(root) => {
                assert_eq!(tree.nodes[root].color, Color::Black, "root must be black");
                assert_eq!(tree.nodes[root].parent, None);
                check_node(tree, root, f64::NEG_INFINITY, f64::INFINITY);
            }
            None => assert_eq!(tree.len(), 0),
        }
        assert_eq!(tree.iter().count(), tree.len());
    }

    /// Returns (black height, recomputed subtree weight).
    fn check_node(tree: &WeightedOrderTree, id: usize, lo: f64, hi: f64) -> (usize, f64) {
        let n = &tree.nodes[id];
        assert!(
            n.centroid.mean > lo && n.centroid.mean < hi,
            "ordering violated at mean {}",
            n.centroid.mean
        );
        if n.color == Color::Red {
            assert_eq!(
                tree.color_of(n.parent),
                Color::Black,
                "red node with red parent at mean {}",
                n.centroid.mean
            );
        }
        let (bh_left, w_left) = match n.left {
            Some(l) => {
                assert_eq!(tree.nodes[l].parent, Some(id));
                check_node(tree, l, lo, n.centroid.mean)
            }
            None => (1, 0.0),
        };
        let (bh_right, w_right) = match n.right {
            Some(r) => {
                assert_eq!(tree.nodes[r].parent, Some(id));
                check_node(tree, r, n.centroid.mean, hi)
            }
            None => (1, 0.0),
        };
        assert_eq!(bh_left, bh_right, "black height mismatch");
        let recomputed = n.centroid.weight + w_left + w_right;
        assert!(
            (n.subtree_weight - recomputed).abs() < 1e-9,
            "stale aggregate: stored {} recomputed {}",
            n.subtree_weight,
            recomputed
        );
        (bh_left + usize::from(n.color == Color::Black), recomputed)
    }

    /// Reference prefix-weight: full in-order scan.
    fn scan_lower_weights(tree: &WeightedOrderTree, x: f64) -> f64 {
        tree.iter().filter(|c| c.mean <= x).map(|c| c.weight).sum()
    }

    #[test]
    fn test_insert_iterates_in_order() {
        let mut tree = WeightedOrderTree::new();
        for v in [5.0, 6.0, 12.0, 1.0, 7.0, 9.0, 13.0] {
            tree.insert(v, 1.0);
        }
        let means: Vec<f64> = tree.iter().map(|c| c.mean).collect();
        assert_eq!(means, vec![1.0, 5.0, 6.0, 7.0, 9.0, 12.0, 13.0]);
        assert_eq!(tree.len(), 7);
        assert_invariants(&tree);
    }

    #[test]
    fn test_insert_merges_equal_mean() {
        let mut tree = WeightedOrderTree::new();
        tree.insert(10.0, 2.0);
        tree.insert(20.0, 1.0);
        tree.insert(10.0, 3.0);
        assert_eq!(tree.len(), 2);
        let c = tree.floor(10.0).unwrap();
        assert_eq!(c.mean, 10.0);
        assert_eq!(c.weight, 5.0);
        assert_eq!(tree.total_weight(), 6.0);
        assert_invariants(&tree);
    }

    #[test]
    fn test_lower_weights_inclusive() {
        let mut tree = WeightedOrderTree::new();
        for v in [5.0, 6.0, 12.0, 1.0, 7.0, 9.0, 13.0] {
            tree.insert(v, 1.0);
        }
        // At or below 6: the centroids at 1, 5 and 6.
        assert_eq!(tree.lower_weights(6.0), 3.0);
        assert_eq!(tree.lower_weights(0.5), 0.0);
        assert_eq!(tree.lower_weights(13.0), 7.0);
        assert_eq!(tree.lower_weights(100.0), 7.0);

        tree.remove(6.0);
        // 6 is gone: 1, 5, 7 and 9 remain at or below 9.
        assert_eq!(tree.lower_weights(9.0), 4.0);
        assert_invariants(&tree);
    }

    #[test]
    fn test_floor_ceiling_neighbors() {
        let mut tree = WeightedOrderTree::new();
        for v in [10.0, 20.0, 30.0] {
            tree.insert(v, 1.0);
        }

        assert_eq!(tree.floor(25.0).unwrap().mean, 20.0);
        assert_eq!(tree.ceiling(25.0).unwrap().mean, 30.0);
        assert!(tree.floor(5.0).is_none());
        assert!(tree.ceiling(35.0).is_none());

        // Exact match returns the same centroid on all three lookups.
        assert_eq!(tree.floor(20.0).unwrap().mean, 20.0);
        assert_eq!(tree.ceiling(20.0).unwrap().mean, 20.0);
        let (lo, hi) = tree.neighbors(20.0);
        assert_eq!(lo.unwrap().mean, 20.0);
        assert_eq!(hi.unwrap().mean, 20.0);

        let (lo, hi) = tree.neighbors(25.0);
        assert_eq!(lo.unwrap().mean, 20.0);
        assert_eq!(hi.unwrap().mean, 30.0);

        let (lo, hi) = tree.neighbors(5.0);
        assert!(lo.is_none());
        assert_eq!(hi.unwrap().mean, 10.0);
    }

    #[test]
    fn test_min_max() {
        let mut tree = WeightedOrderTree::new();
        assert!(tree.min().is_none());
        assert!(tree.max().is_none());
        for v in [7.0, 3.0, 11.0, 5.0] {
            tree.insert(v, 1.0);
        }
        assert_eq!(tree.min().unwrap().mean, 3.0);
        assert_eq!(tree.max().unwrap().mean, 11.0);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut tree = WeightedOrderTree::new();
        tree.insert(1.0, 1.0);
        tree.remove(2.0);
        assert_eq!(tree.len(), 1);
        tree.remove(2.0);
        assert_eq!(tree.len(), 1);
        assert_invariants(&tree);

        let mut empty = WeightedOrderTree::new();
        empty.remove(1.0);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_remove_leaf_single_child_and_interior() {
        let mut tree = WeightedOrderTree::new();
        for v in [50.0, 25.0, 75.0, 12.0, 37.0, 62.0, 87.0, 6.0] {
            tree.insert(v, v);
        }
        assert_invariants(&tree);

        tree.remove(87.0); // leaf
        assert_invariants(&tree);
        tree.remove(12.0); // single child
        assert_invariants(&tree);
        tree.remove(50.0); // interior with two children (the root)
        assert_invariants(&tree);

        let means: Vec<f64> = tree.iter().map(|c| c.mean).collect();
        assert_eq!(means, vec![6.0, 25.0, 37.0, 62.0, 75.0]);
        assert_eq!(tree.total_weight(), 6.0 + 25.0 + 37.0 + 62.0 + 75.0);
    }

    #[test]
    fn test_remove_all_descending() {
        let mut tree = WeightedOrderTree::new();
        for v in 0..64 {
            tree.insert(v as f64, 1.0);
        }
        for v in (0..64).rev() {
            tree.remove(v as f64);
            assert_invariants(&tree);
        }
        assert!(tree.is_empty());
        assert_eq!(tree.total_weight(), 0.0);
    }

    #[test]
    fn test_clear() {
        let mut tree = WeightedOrderTree::new();
        for v in 0..32 {
            tree.insert(v as f64, 1.0);
        }
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert!(tree.min().is_none());
        assert_eq!(tree.iter().count(), 0);
        // Reusable after clear.
        tree.insert(1.0, 1.0);
        assert_eq!(tree.len(), 1);
        assert_invariants(&tree);
    }

    #[test]
    fn test_nan_key_ignored() {
        let mut tree = WeightedOrderTree::new();
        tree.insert(f64::NAN, 1.0);
        assert!(tree.is_empty());
        tree.insert(1.0, 1.0);
        tree.insert(f64::NAN, 1.0);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.total_weight(), 1.0);
    }

    #[test]
    fn test_randomized_inserts_and_removes_hold_invariants() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut tree = WeightedOrderTree::new();
        // A small key grid forces plenty of merges and exact-match removals.
        for step in 0..2000 {
            let key = rng.gen_range(0..100) as f64;
            if rng.gen_bool(0.7) {
                tree.insert(key, rng.gen_range(1..5) as f64);
            } else {
                tree.remove(key);
            }
            if step % 50 == 0 {
                assert_invariants(&tree);
            }
        }
        assert_invariants(&tree);

        // Prefix weights agree with a full scan at every probe point.
        for probe in 0..=100 {
            let x = probe as f64 - 0.5;
            let fast = tree.lower_weights(x);
            let slow = scan_lower_weights(&tree, x);
            assert!(
                (fast - slow).abs() < 1e-9,
                "lower_weights({}) = {} but scan says {}",
                x,
                fast,
                slow
            );
        }
    }

    #[test]
    fn test_iterator_matches_centroids_snapshot() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut tree = WeightedOrderTree::new();
        for _ in 0..200 {
            tree.insert(rng.gen::<f64>() * 1000.0, 1.0);
        }
        let snapshot = tree.centroids();
        let walked: Vec<Centroid> = tree.iter().collect();
        assert_eq!(snapshot, walked);
        assert!(snapshot.windows(2).all(|w| w[0].mean < w[1].mean));
    }

    #[test]
    fn test_display_renders_structure() {
        let mut tree = WeightedOrderTree::new();
        for v in [2.0, 1.0, 3.0] {
            tree.insert(v, 1.0);
        }
        let out = format!("{}", tree);
        assert!(out.starts_with("WeightedOrderTree"));
        assert_eq!(out.matches("mean=").count(), 3);
        assert!(out.contains("subtree=3.000"), "root aggregate missing: {}", out);
    }

    #[test]
    fn test_centroid_add_moves_mean_by_weighted_average() {
        let mut c = Centroid::new(10.0, 1.0);
        c.add(20.0, 1.0);
        assert!((c.mean - 15.0).abs() < 1e-12);
        assert_eq!(c.weight, 2.0);
        c.add(15.0, 2.0);
        assert!((c.mean - 15.0).abs() < 1e-12);
        assert_eq!(c.weight, 4.0);
    }
}
