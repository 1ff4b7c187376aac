//! Barnes-Hut opening criterion.
//!
//! For an internal node the ratio `extent / distance(com, q)` decides whether
//! the node is far enough away to be replaced by its aggregate. `theta` is
//! the only accuracy knob of a run: `0` never approximates, very large values
//! approximate at the first internal node reached.

use crate::error::ConfigError;
use crate::spatial::octree::{LeafId, OctreeNode};
use crate::spatial::states::{Aggregate, SpatialPoint};

/// Added to the squared distance so a query on top of a center of mass
/// does not divide by zero.
pub const THETA_EPSILON: f64 = 1e-9;

/// Outcome of testing one node against one query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission {
    /// Empty leaf, contributes nothing.
    Skip,
    /// Reduce every point of this leaf exactly.
    Leaf(LeafId),
    /// Far enough: use the node's aggregate.
    Approximate(Aggregate),
    /// Too close: test the children.
    Descend,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThetaPolicy {
    theta: f64,
}

impl ThetaPolicy {
    pub fn new(theta: f64) -> Result<Self, ConfigError> {
        if theta.is_nan() || theta < 0.0 {
            return Err(ConfigError::InvalidTheta(theta));
        }
        Ok(Self { theta })
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// `extent / |com - pos|` using only x, y, z.
    pub fn theta_value<P>(node: &OctreeNode<P>, pos: &P) -> f64
    where
        P: SpatialPoint,
    {
        let diff = node.aggregate.com - pos.position();
        let norm = (diff.norm_squared() + THETA_EPSILON).sqrt();
        node.bbox.extent() / norm
    }

    pub fn classify<P>(&self, node: &OctreeNode<P>, query: &P) -> Admission
    where
        P: SpatialPoint,
    {
        if let Some(uid) = node.uid {
            if node.bodies.is_empty() {
                Admission::Skip
            } else {
                Admission::Leaf(uid)
            }
        } else if Self::theta_value(node, query) < self.theta {
            Admission::Approximate(node.aggregate)
        } else {
            Admission::Descend
        }
    }
}
