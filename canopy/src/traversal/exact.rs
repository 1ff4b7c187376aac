//! Single-query traversal that reduces inline.
//!
//! This is the CPU baseline and the reference the batched paths are checked
//! against: the same admission decisions as the blocked traversal, but every
//! leaf or aggregate is reduced on the spot instead of being deferred.

use crate::kernels::Kernel;
use crate::spatial::octree::{NodeId, Octree};
use crate::spatial::states::SpatialPoint;
use crate::traversal::admission::{Admission, ThetaPolicy};

/// Reductions performed by the last query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExactStats {
    pub leaf_node_reduced: usize,
    pub branch_node_reduced: usize,
}

pub struct ExactTraversal<'t, P, K> {
    tree: &'t Octree<P>,
    policy: ThetaPolicy,
    kernel: &'t K,
    stats: ExactStats,
}

impl<'t, P, K> ExactTraversal<'t, P, K>
where
    P: SpatialPoint,
    K: Kernel<P>,
{
    pub fn new(tree: &'t Octree<P>, policy: ThetaPolicy, kernel: &'t K) -> Self {
        Self {
            tree,
            policy,
            kernel,
            stats: ExactStats::default(),
        }
    }

    /// Full result for one query point.
    pub fn query(&mut self, q: &P) -> K::Output {
        self.stats = ExactStats::default();
        let mut acc = self.kernel.identity();
        self.traverse_node(self.tree.root(), q, &mut acc);
        acc
    }

    pub fn stats(&self) -> ExactStats {
        self.stats
    }

    /// Recursively accumulate the contribution of a subtree.
    ///
    /// - empty leaf: nothing
    /// - leaf: exact reduction over its points
    /// - internal node far enough away: reduction against its aggregate
    /// - otherwise: visit every child
    fn traverse_node(&mut self, node_idx: NodeId, q: &P, acc: &mut K::Output) {
        let node = self.tree.node(node_idx);

        match self.policy.classify(node, q) {
            Admission::Skip => {}
            Admission::Leaf(_) => {
                self.stats.leaf_node_reduced += 1;
                self.kernel.reduce_leaf(q, &node.bodies, acc);
            }
            Admission::Approximate(aggregate) => {
                self.stats.branch_node_reduced += 1;
                self.kernel.reduce_branch(q, &aggregate, acc);
            }
            Admission::Descend => {
                for child in node.children.into_iter().flatten() {
                    self.traverse_node(child, q, acc);
                }
            }
        }
    }
}
