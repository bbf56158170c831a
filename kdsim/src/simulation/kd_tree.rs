//! # k-d Tree (D dimensions)
//!
//! This module implements a **balanced k-d tree** for answering k-nearest
//! and fixed-radius neighbor queries over a snapshot of particle positions.
//! It replaces the naive `O(N²)` all-pairs neighbor scan with an
//! `O(N log N)` build and roughly `O(log N)` per query.
//!
//! ## Core Concepts
//!
//! - The point set is recursively split in two at the **median** along the
//!   axis with the largest spread inside the current subset.
//! - Splitting on the median (not the spatial midpoint) keeps the tree
//!   balanced no matter how clustered the particles are.
//! - Subsets of at most [`LEAF_SIZE`] points become leaves that are scanned
//!   linearly.
//! - A subset whose points all coincide has zero spread and cannot be split
//!   meaningfully, so it also becomes a leaf. This is the degenerate
//!   fallback: no division by zero, no recursion without progress.
//!
//! Nodes live in one `Vec` arena and refer to each other by index. Leaves
//! refer to a contiguous range of the `order` permutation, so the tree never
//! copies a point more than once.
//!
//! ## Ordering
//!
//! Query results are sorted by squared distance, ties broken by ascending
//! point index. The same input therefore always yields the same neighbor
//! list, whatever the traversal order.

use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;

use crate::simulation::states::NVec;

/// Largest number of points kept in a leaf before splitting
pub const LEAF_SIZE: usize = 8;

/// One neighbor returned by a query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize, // index into the positions the tree was built from
    pub dist2: f64,   // squared distance to the query point
}

/// A single tree node.
///
/// - Internal nodes split on `axis` at `split`; every point in `left` has a
///   coordinate `<= split` on that axis, every point in `right` has `>= split`.
/// - Leaves own the range `order[start..end]`.
#[derive(Debug, Clone)]
pub enum KdNode {
    Internal {
        axis: usize,
        split: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        start: usize,
        end: usize,
    },
}

/// A complete k-d tree over a fixed point snapshot.
///
/// This structure owns:
/// - a copy of the positions it was built from (`points`)
/// - a permutation of point indices grouped by leaf (`order`)
/// - the node arena (`nodes`) and the index of the root, if any
#[derive(Debug, Clone)]
pub struct KdTree<const D: usize> {
    points: Vec<NVec<D>>,
    order: Vec<usize>,
    nodes: Vec<KdNode>,
    root: Option<usize>,
}

/// Candidate in the bounded max-heap: worst (farthest, then highest index) on top
type Candidate = (OrderedFloat<f64>, usize);

impl<const D: usize> KdTree<D> {
    /// Build a k-d tree from a slice of positions.
    ///
    /// An empty slice gives a tree that answers every query with an empty set.
    pub fn build(positions: &[NVec<D>]) -> Self {
        let mut tree = KdTree {
            points: positions.to_vec(),
            order: (0..positions.len()).collect(),
            nodes: Vec::new(),
            root: None,
        };
        if !positions.is_empty() {
            let root = tree.build_node(0, positions.len());
            tree.root = Some(root);
        }
        tree
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of nodes in the arena
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The `k` nearest indexed points to `point`, self included if indexed
    pub fn query_k_nearest(&self, point: &NVec<D>, k: usize) -> Vec<Neighbor> {
        self.query_k_nearest_excluding(point, k, None)
    }

    /// The `k` nearest indexed points to `point`, skipping `exclude`.
    ///
    /// Exclusion is by identity: a different point sitting at the exact same
    /// coordinates is still returned.
    pub fn query_k_nearest_excluding(
        &self,
        point: &NVec<D>,
        k: usize,
        exclude: Option<usize>,
    ) -> Vec<Neighbor> {
        let Some(root) = self.root else {
            return Vec::new();
        };
        if k == 0 {
            return Vec::new();
        }

        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);
        self.search_k(root, point, k, exclude, &mut heap);

        let mut found: Vec<Neighbor> = heap
            .into_iter()
            .map(|(d, index)| Neighbor {
                index,
                dist2: d.into_inner(),
            })
            .collect();
        sort_neighbors(&mut found);
        found
    }

    /// Every indexed point within `radius` of `point` (inclusive)
    pub fn query_radius(&self, point: &NVec<D>, radius: f64) -> Vec<Neighbor> {
        let mut found = Vec::new();
        if let Some(root) = self.root {
            if radius >= 0.0 {
                self.search_radius(root, point, radius * radius, &mut found);
            }
        }
        sort_neighbors(&mut found);
        found
    }

    // helpers ==============================================================================

    /// Recursively build the subtree over `order[start..end]` and return its node index.
    ///
    /// - Small or zero-spread ranges become leaves.
    /// - Otherwise the range is partitioned around its median on the widest
    ///   axis with `select_nth_unstable_by`, which is linear in the range size.
    ///   Every level halves the range, so recursion depth is `O(log N)`.
    fn build_node(&mut self, start: usize, end: usize) -> usize {
        let count = end - start;

        let (axis, spread) = if count > LEAF_SIZE {
            self.widest_axis(start, end)
        } else {
            (0, 0.0)
        };

        // Leaf: small enough, or every point coincides on every axis
        if count <= LEAF_SIZE || !(spread > 0.0) {
            let idx = self.nodes.len();
            self.nodes.push(KdNode::Leaf { start, end });
            return idx;
        }

        let mid = start + count / 2;
        {
            let points = &self.points;
            self.order[start..end].select_nth_unstable_by(count / 2, |&a, &b| {
                points[a][axis]
                    .total_cmp(&points[b][axis])
                    .then(a.cmp(&b))
            });
        }
        let split = self.points[self.order[mid]][axis];

        // Reserve the slot first so the parent precedes its children
        let idx = self.nodes.len();
        self.nodes.push(KdNode::Leaf { start, end });

        let left = self.build_node(start, mid);
        let right = self.build_node(mid, end);
        self.nodes[idx] = KdNode::Internal {
            axis,
            split,
            left,
            right,
        };
        idx
    }

    /// Axis with the largest extent over `order[start..end]`, and that extent
    fn widest_axis(&self, start: usize, end: usize) -> (usize, f64) {
        let mut min = NVec::<D>::repeat(f64::INFINITY);
        let mut max = NVec::<D>::repeat(f64::NEG_INFINITY);

        for &i in &self.order[start..end] {
            let p = &self.points[i];
            for a in 0..D {
                min[a] = min[a].min(p[a]);
                max[a] = max[a].max(p[a]);
            }
        }

        let mut best = (0, 0.0);
        for a in 0..D {
            let spread = max[a] - min[a];
            if spread > best.1 {
                best = (a, spread);
            }
        }
        best
    }

    /// Bounded best-first descent for the k-nearest query.
    ///
    /// The heap holds at most `k` candidates keyed by `(dist2, index)` with the
    /// worst on top. The far side of a split is visited unless the heap is full
    /// and the split plane is strictly farther than the current worst, so
    /// equidistant points with lower indices are never pruned away.
    fn search_k(
        &self,
        node_idx: usize,
        point: &NVec<D>,
        k: usize,
        exclude: Option<usize>,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        match self.nodes[node_idx] {
            KdNode::Leaf { start, end } => {
                for &i in &self.order[start..end] {
                    if Some(i) == exclude {
                        continue;
                    }
                    let cand = (OrderedFloat((self.points[i] - point).norm_squared()), i);
                    if heap.len() < k {
                        heap.push(cand);
                    } else if let Some(worst) = heap.peek() {
                        if cand < *worst {
                            heap.pop();
                            heap.push(cand);
                        }
                    }
                }
            }
            KdNode::Internal {
                axis,
                split,
                left,
                right,
            } => {
                let diff = point[axis] - split;
                let (near, far) = if diff < 0.0 { (left, right) } else { (right, left) };

                self.search_k(near, point, k, exclude, heap);

                let plane2 = diff * diff;
                let visit_far = match heap.peek() {
                    Some(worst) if heap.len() >= k => plane2 <= worst.0.into_inner(),
                    _ => true,
                };
                if visit_far {
                    self.search_k(far, point, k, exclude, heap);
                }
            }
        }
    }

    fn search_radius(&self, node_idx: usize, point: &NVec<D>, r2: f64, out: &mut Vec<Neighbor>) {
        match self.nodes[node_idx] {
            KdNode::Leaf { start, end } => {
                for &i in &self.order[start..end] {
                    let dist2 = (self.points[i] - point).norm_squared();
                    if dist2 <= r2 {
                        out.push(Neighbor { index: i, dist2 });
                    }
                }
            }
            KdNode::Internal {
                axis,
                split,
                left,
                right,
            } => {
                let diff = point[axis] - split;
                let (near, far) = if diff < 0.0 { (left, right) } else { (right, left) };
                self.search_radius(near, point, r2, out);
                if diff * diff <= r2 {
                    self.search_radius(far, point, r2, out);
                }
            }
        }
    }
}

/// Sort by squared distance, then by index
fn sort_neighbors(found: &mut [Neighbor]) {
    found.sort_by(|a, b| a.dist2.total_cmp(&b.dist2).then(a.index.cmp(&b.index)));
}
