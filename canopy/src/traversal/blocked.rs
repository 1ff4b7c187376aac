//! Point-blocked traversal.
//!
//! Instead of walking one query through the whole tree, a *block* of queries
//! is pushed through the tree one level at a time. At each node every query
//! still alive in the current block is classified:
//!
//! - `Leaf` / `Approximate`: the reduction goes to the [`WorkSink`] and the
//!   query is done with this subtree,
//! - `Descend`: the query is appended to the next level's block,
//! - `Skip`: nothing happens.
//!
//! When the next block is non-empty the traversal recurses into every child
//! with it. A query is tested against each child it reaches independently;
//! siblings never prune each other. Blocks are recycled between passes, so a
//! worker allocates its per-level storage once.
//!
//! Passes are triggered when the depth-0 block reaches `block_size`. A block
//! size of 1 degenerates into the plain per-query traversal.

use crate::error::DispatchError;
use crate::spatial::octree::{NodeId, Octree, TreeStats};
use crate::spatial::states::{Query, SpatialPoint};
use crate::traversal::admission::{Admission, ThetaPolicy};
use crate::traversal::WorkSink;

/// Queries alive at one tree depth.
#[derive(Debug, Clone)]
pub struct Block<P> {
    queries: Vec<Query<P>>,
}

impl<P: Copy> Block<P> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queries: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, query: Query<P>) {
        self.queries.push(query);
    }

    /// Empty the block, keeping its allocation.
    pub fn recycle(&mut self) {
        self.queries.clear();
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn is_full(&self, block_size: usize) -> bool {
        self.queries.len() >= block_size
    }

    pub fn iter(&self) -> impl Iterator<Item = &Query<P>> + '_ {
        self.queries.iter()
    }
}

/// One block per tree depth.
#[derive(Debug, Clone)]
pub struct BlockStack<P> {
    levels: Vec<Block<P>>,
    block_size: usize,
}

impl<P: Copy> BlockStack<P> {
    /// Room for `depth_levels` levels; more are added on demand.
    pub fn new(block_size: usize, depth_levels: usize) -> Self {
        Self {
            levels: (0..depth_levels.max(1))
                .map(|_| Block::with_capacity(block_size))
                .collect(),
            block_size,
        }
    }

    /// Sized for a tree: its max depth + 1 levels.
    pub fn for_tree(block_size: usize, stats: &TreeStats) -> Self {
        Self::new(block_size, stats.max_depth + 1)
    }

    pub fn depth_levels(&self) -> usize {
        self.levels.len()
    }

    fn ensure_level(&mut self, level: usize) {
        while self.levels.len() <= level {
            self.levels.push(Block::with_capacity(self.block_size));
        }
    }
}

/// Counters kept by a blocked traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    pub passes: usize,
    pub queries: usize,
    pub leaf_items: usize,
    pub branch_items: usize,
    pub node_visits: usize,
}

/// Per-worker blocked traversal over a shared tree.
pub struct BlockedTraversal<'t, P> {
    tree: &'t Octree<P>,
    policy: ThetaPolicy,
    block_size: usize,
    stack: BlockStack<P>,
    stats: TraversalStats,
}

impl<'t, P: SpatialPoint> BlockedTraversal<'t, P> {
    /// `block_size` must be positive.
    pub fn new(tree: &'t Octree<P>, policy: ThetaPolicy, block_size: usize) -> Self {
        Self {
            tree,
            policy,
            block_size,
            stack: BlockStack::for_tree(block_size, &tree.stats()),
            stats: TraversalStats::default(),
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn stats(&self) -> TraversalStats {
        self.stats
    }

    pub fn stack(&self) -> &BlockStack<P> {
        &self.stack
    }

    /// Queue a query; runs a pass once the root block is full.
    pub fn add_query<S>(&mut self, query: Query<P>, sink: &mut S) -> Result<(), DispatchError>
    where
        S: WorkSink<P>,
    {
        self.stats.queries += 1;
        self.stack.levels[0].push(query);
        if self.stack.levels[0].is_full(self.block_size) {
            self.run_pass(sink)?;
        }
        Ok(())
    }

    /// Run a pass over whatever is left in the root block.
    pub fn flush<S>(&mut self, sink: &mut S) -> Result<(), DispatchError>
    where
        S: WorkSink<P>,
    {
        if !self.stack.levels[0].is_empty() {
            self.run_pass(sink)?;
        }
        Ok(())
    }

    fn run_pass<S>(&mut self, sink: &mut S) -> Result<(), DispatchError>
    where
        S: WorkSink<P>,
    {
        self.stats.passes += 1;
        let root = self.tree.root();
        let outcome = self.visit(root, 0, sink);
        self.stack.levels[0].recycle();
        outcome
    }

    /// Classify the block at `level` against `node_idx`, then recurse with
    /// the queries that must descend.
    fn visit<S>(&mut self, node_idx: NodeId, level: usize, sink: &mut S) -> Result<(), DispatchError>
    where
        S: WorkSink<P>,
    {
        let tree = self.tree;
        let node = tree.node(node_idx);
        self.stats.node_visits += 1;

        self.stack.ensure_level(level + 1);
        let (head, tail) = self.stack.levels.split_at_mut(level + 1);
        let current = &head[level];
        let next = &mut tail[0];
        next.recycle();

        for query in current.iter() {
            match self.policy.classify(node, &query.point) {
                Admission::Skip => {}
                Admission::Leaf(uid) => {
                    self.stats.leaf_items += 1;
                    sink.push_leaf(query, uid)?;
                }
                Admission::Approximate(aggregate) => {
                    self.stats.branch_items += 1;
                    sink.push_branch(query, &aggregate)?;
                }
                Admission::Descend => next.push(*query),
            }
        }

        if next.is_empty() {
            return Ok(());
        }

        for child in node.children.into_iter().flatten() {
            self.visit(child, level + 1, sink)?;
        }
        Ok(())
    }
}
