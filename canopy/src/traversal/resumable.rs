//! Resumable nearest-neighbor traversal.
//!
//! An executor walks the tree depth-first, nearest child first, and suspends
//! every time it reaches a non-empty leaf. The caller decides what to do with
//! the leaf (usually: push it into a dispatcher) and calls [`NnExecutor::resume`]
//! again with the query's current pruning radius. Nodes whose box lies
//! farther than that radius are dropped when popped, so the radius can be
//! stale: a looser bound only costs extra leaves, never a wrong answer.

use crate::spatial::octree::{LeafId, NodeId, Octree};
use crate::spatial::states::{Query, SpatialPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Working,
    Finished,
}

/// What a call to `resume` produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Leaf(LeafId),
    Finished,
}

#[derive(Debug, Clone)]
pub struct NnExecutor<P> {
    query: Query<P>,
    stack: Vec<NodeId>,
    state: ExecutionState,
    leaves_reached: usize,
    pruned: usize,
}

impl<P: SpatialPoint> NnExecutor<P> {
    /// An executor positioned at the root of `tree`.
    pub fn start(query: Query<P>, tree: &Octree<P>) -> Self {
        Self {
            query,
            stack: vec![tree.root()],
            state: ExecutionState::Working,
            leaves_reached: 0,
            pruned: 0,
        }
    }

    pub fn query(&self) -> &Query<P> {
        &self.query
    }

    pub fn finished(&self) -> bool {
        self.state == ExecutionState::Finished
    }

    pub fn leaves_reached(&self) -> usize {
        self.leaves_reached
    }

    pub fn pruned(&self) -> usize {
        self.pruned
    }

    /// Advance to the next leaf within `bound` of the query.
    pub fn resume(&mut self, tree: &Octree<P>, bound: f64) -> Step {
        if self.state == ExecutionState::Finished {
            return Step::Finished;
        }

        let q = self.query.point.position();
        let bound2 = bound * bound;

        while let Some(node_idx) = self.stack.pop() {
            let node = tree.node(node_idx);
            if node.bbox.distance2_to(&q) > bound2 {
                self.pruned += 1;
                continue;
            }

            if let Some(uid) = node.uid {
                if node.bodies.is_empty() {
                    continue;
                }
                self.leaves_reached += 1;
                return Step::Leaf(uid);
            }

            // Push far to near so the nearest child is popped first
            let mut near = [(0.0_f64, 0_usize); 8];
            let mut n = 0;
            for child in node.children.into_iter().flatten() {
                near[n] = (tree.node(child).bbox.distance2_to(&q), child);
                n += 1;
            }
            near[..n].sort_unstable_by(|a, b| b.0.total_cmp(&a.0));
            self.stack.extend(near[..n].iter().map(|&(_, child)| child));
        }

        self.state = ExecutionState::Finished;
        Step::Finished
    }
}
