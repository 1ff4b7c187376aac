//! k-nearest-neighbor distance kernel.

use crate::kernels::Kernel;
use crate::spatial::states::{Aggregate, SpatialPoint};

/// The `k` smallest distances seen so far, ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct KnnSet {
    k: usize,
    dists: Vec<f64>,
}

impl KnnSet {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            dists: Vec::with_capacity(k),
        }
    }

    pub fn insert(&mut self, dist: f64) {
        if self.dists.len() == self.k {
            match self.dists.last() {
                Some(&worst) if dist < worst => {
                    self.dists.pop();
                }
                _ => return,
            }
        }
        let at = self.dists.partition_point(|&d| d <= dist);
        self.dists.insert(at, dist);
    }

    /// Current pruning radius: the k-th distance, or infinity while the set
    /// still has room.
    pub fn bound(&self) -> f64 {
        if self.dists.len() < self.k {
            f64::INFINITY
        } else {
            self.dists.last().copied().unwrap_or(f64::INFINITY)
        }
    }

    pub fn distances(&self) -> &[f64] {
        &self.dists
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Knn {
    pub k: usize,
}

impl<P: SpatialPoint> Kernel<P> for Knn {
    type Output = KnnSet;

    fn identity(&self) -> KnnSet {
        KnnSet::new(self.k)
    }

    fn reduce_leaf(&self, query: &P, leaf: &[P], acc: &mut KnnSet) {
        let q = query.position();
        for p in leaf {
            acc.insert((p.position() - q).norm());
        }
    }

    // Nearest-neighbor traversals never approximate a subtree.
    fn reduce_branch(&self, _query: &P, _aggregate: &Aggregate, _acc: &mut KnnSet) {}

    fn combine(&self, acc: &mut KnnSet, partial: KnnSet) {
        for d in partial.dists {
            acc.insert(d);
        }
    }
}
