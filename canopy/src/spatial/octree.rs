//! # Octree
//!
//! A bucketed octree over a static point set. Space is recursively split
//! into 8 equal octants until a region holds few enough points to be stored
//! directly in a leaf.
//!
//! ## Layout
//!
//! - Nodes live in a single arena (`Vec<OctreeNode>`) and refer to their
//!   children by index, so there are no parent/child pointers to manage.
//! - Subdividing a node always creates all 8 children. Octants that receive
//!   no points become empty leaves.
//! - Every leaf gets a dense `uid` in creation order. The leaf payload table
//!   (see [`crate::spatial::payload`]) is laid out in that order.
//! - Each node stores an [`Aggregate`]: total weight of its subtree and the
//!   weighted center of mass, computed bottom-up once the split is done.
//!
//! ## Termination
//!
//! A node becomes a leaf when it holds at most `max_leaf_size` points, when
//! all of its points share one position, **or** when it sits at `max_depth`.
//! Such leaves may hold more than `max_leaf_size` points; that is normal.
//! `max_depth` itself is capped at [`MAX_DEPTH_LIMIT`] so that traversal
//! stacks stay shallow.
//!
//! The tree has no mutating methods after [`Octree::build`] returns, so it can
//! be shared read-only between traversal workers.

use log::{debug, warn};

use crate::error::ConfigError;
use crate::spatial::payload::LeafPayloadTable;
use crate::spatial::states::{Aggregate, BoundingBox, SpatialPoint};

/// Index of a node in [`Octree::nodes`].
pub type NodeId = usize;

/// Dense id of a leaf, `0..num_leaf_nodes`.
pub type LeafId = usize;

/// Largest accepted `max_depth`. Boxes this deep are already far below f64
/// resolution for any sane root extent.
pub const MAX_DEPTH_LIMIT: usize = 128;

/// Build parameters.
#[derive(Debug, Clone, Copy)]
pub struct OctreeParams {
    pub max_leaf_size: usize,         // split nodes holding more points than this
    pub max_depth: usize,             // nodes at this depth are always leaves
    pub bounds: Option<BoundingBox>,  // root region, enclosing cube if `None`
}

impl OctreeParams {
    pub fn new(max_leaf_size: usize, max_depth: usize) -> Self {
        Self {
            max_leaf_size,
            max_depth,
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, bounds: BoundingBox) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_leaf_size == 0 {
            return Err(ConfigError::NonPositive {
                name: "max_leaf_size",
            });
        }
        if self.max_depth == 0 {
            return Err(ConfigError::NonPositive { name: "max_depth" });
        }
        if self.max_depth > MAX_DEPTH_LIMIT {
            return Err(ConfigError::DepthTooLarge {
                max_depth: self.max_depth,
                limit: MAX_DEPTH_LIMIT,
            });
        }
        Ok(())
    }
}

/// A single octree node.
#[derive(Debug, Clone)]
pub struct OctreeNode<P> {
    pub bbox: BoundingBox,
    pub aggregate: Aggregate,
    pub children: [Option<NodeId>; 8],
    pub uid: Option<LeafId>, // Some(..) iff this node is a leaf
    pub bodies: Vec<P>,      // leaf contents, empty for internal nodes
    pub depth: usize,
}

impl<P> OctreeNode<P> {
    fn new(bbox: BoundingBox, depth: usize) -> Self {
        Self {
            bbox,
            aggregate: Aggregate::empty(),
            children: [None; 8],
            uid: None,
            bodies: Vec::new(),
            depth,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }
}

/// Shape of a built tree, used to size per-worker traversal state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub num_nodes: usize,
    pub num_leaf_nodes: usize,
    pub max_depth: usize, // deepest node actually created (root = 0)
    pub num_points: usize,
    pub capped_leaves: usize, // leaves over max_leaf_size (max_depth or coincident points)
}

/// An octree built once over a point set, read-only afterwards.
#[derive(Debug, Clone)]
pub struct Octree<P> {
    nodes: Vec<OctreeNode<P>>,
    root: NodeId,
    leaves: Vec<NodeId>, // node index of each leaf, indexed by uid
    params: OctreeParams,
    stats: TreeStats,
}

impl<P: SpatialPoint> Octree<P> {
    /// Build an octree over `points`.
    ///
    /// This:
    /// 1. Validates the parameters (`max_leaf_size` positive, `max_depth` in `1..=MAX_DEPTH_LIMIT`).
    /// 2. Creates a root covering `params.bounds`, or the enclosing cube of the points.
    /// 3. Splits the points into octants, depth first.
    /// 4. Computes mass and center of mass for every node, bottom-up.
    ///
    /// An empty point set yields a root that is a single empty leaf.
    pub fn build(points: &[P], params: OctreeParams) -> Result<Self, ConfigError> {
        params.validate()?;

        let bbox = params
            .bounds
            .unwrap_or_else(|| BoundingBox::enclosing_cube(points));

        let mut tree = Octree {
            nodes: vec![OctreeNode::new(bbox, 0)],
            root: 0,
            leaves: Vec::new(),
            params,
            stats: TreeStats {
                num_points: points.len(),
                ..TreeStats::default()
            },
        };

        tree.split(points.to_vec());
        tree.compute_mass_and_com();

        tree.stats.num_nodes = tree.nodes.len();
        tree.stats.num_leaf_nodes = tree.leaves.len();
        if tree.stats.capped_leaves > 0 {
            warn!(
                "{} leaves hold more than {} points (coincident points or max_depth {})",
                tree.stats.capped_leaves, params.max_leaf_size, params.max_depth
            );
        }
        debug!("built octree: {:?}", tree.stats);

        Ok(tree)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &OctreeNode<P> {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[OctreeNode<P>] {
        &self.nodes
    }

    pub fn stats(&self) -> TreeStats {
        self.stats
    }

    pub fn params(&self) -> &OctreeParams {
        &self.params
    }

    /// Leaf nodes in uid order.
    pub fn leaves(&self) -> impl Iterator<Item = &OctreeNode<P>> + '_ {
        self.leaves.iter().map(move |&id| &self.nodes[id])
    }

    /// Flatten every leaf's points into a contiguous table, in uid order.
    pub fn load_payload(&self) -> LeafPayloadTable<P> {
        LeafPayloadTable::from_leaves(
            self.stats.num_points,
            self.leaves().map(|leaf| leaf.bodies.as_slice()),
        )
    }

    // helpers ==============================================================================

    /// Place `points` under the root, subdividing nodes while they are too full.
    ///
    /// A node turns into a leaf (and takes the next uid) when its points fit,
    /// when they all sit at one position, or when the depth limit is reached.
    /// Otherwise 8 children are created and the points are partitioned by
    /// octant. Children are pushed in reverse so octant 0 is visited first,
    /// which keeps leaf uids in depth-first order.
    fn split(&mut self, points: Vec<P>) {
        let mut pending = vec![(self.root, points)];

        while let Some((node_idx, bodies)) = pending.pop() {
            let depth = self.nodes[node_idx].depth;
            self.stats.max_depth = self.stats.max_depth.max(depth);

            let fits = bodies.len() <= self.params.max_leaf_size;
            if fits || depth >= self.params.max_depth || all_coincident(&bodies) {
                if !fits {
                    self.stats.capped_leaves += 1;
                }
                let node = &mut self.nodes[node_idx];
                node.uid = Some(self.leaves.len());
                node.bodies = bodies;
                self.leaves.push(node_idx);
                continue;
            }

            // Copy the bbox out by value so no borrow is held while pushing nodes
            let bbox = self.nodes[node_idx].bbox;

            let mut buckets: [Vec<P>; 8] = Default::default();
            for body in bodies {
                buckets[bbox.octant_of(&body.position())].push(body);
            }

            let mut children = [None; 8];
            for (octant, slot) in children.iter_mut().enumerate() {
                let new_idx = self.nodes.len();
                self.nodes.push(OctreeNode::new(bbox.octant(octant), depth + 1));
                *slot = Some(new_idx);
            }
            self.nodes[node_idx].children = children;

            for (child, bucket) in children.into_iter().zip(buckets).rev() {
                if let Some(child_idx) = child {
                    pending.push((child_idx, bucket));
                }
            }
        }
    }

    /// Compute total mass and center of mass for every node.
    ///
    /// Children are always stored after their parent, so a reverse sweep over
    /// the arena sees every child before the node that owns it. Leaves
    /// aggregate their own points; internal nodes aggregate their children's
    /// results. Zero-weight children contribute nothing. A node whose total
    /// weight is zero keeps its box center as center of mass.
    fn compute_mass_and_com(&mut self) {
        for node_idx in (0..self.nodes.len()).rev() {
            let mut mass = 0.0;
            let mut com = crate::spatial::states::NVec3::zeros();

            for body in &self.nodes[node_idx].bodies {
                let w = body.weight();
                mass += w;
                com += body.position() * w;
            }

            let children = self.nodes[node_idx].children; // [Option<usize>; 8] is Copy
            for child_idx in children.into_iter().flatten() {
                let child = &self.nodes[child_idx].aggregate;
                if child.mass > 0.0 {
                    mass += child.mass;
                    com += child.com * child.mass;
                }
            }

            let node = &mut self.nodes[node_idx];
            node.aggregate = if mass > 0.0 {
                Aggregate {
                    com: com / mass,
                    mass,
                }
            } else {
                Aggregate {
                    com: node.bbox.center,
                    mass: 0.0,
                }
            };
        }
    }
}

/// True when every point shares the first one's position; splitting such a
/// set only moves all of it into one child.
fn all_coincident<P: SpatialPoint>(bodies: &[P]) -> bool {
    match bodies.split_first() {
        Some((first, rest)) => {
            let at = first.position();
            rest.iter().all(|b| b.position() == at)
        }
        None => true,
    }
}
