//! Core point and geometry types.
//!
//! Defines the point capability used by the tree and the kernels:
//! - `NVec3` points (position only, unit weight)
//! - `NVec4` points (position + weight/mass in the 4th slot)
//!
//! plus the axis-aligned `BoundingBox`, the per-node `Aggregate`
//! (center of mass + total mass) and the `Query` handed to traversals.

use nalgebra::{Vector3, Vector4};

pub type NVec3 = Vector3<f64>;
pub type NVec4 = Vector4<f64>;

/// Position in the caller's result array.
pub type QueryId = usize;

/// Fixed-size numeric point the octree can index.
///
/// Only the first three components take part in geometry. The weight is the
/// mass used for centers of mass and by weighted kernels.
pub trait SpatialPoint: Copy + Send + Sync + std::fmt::Debug + 'static {
    fn position(&self) -> NVec3;
    fn weight(&self) -> f64;
}

impl SpatialPoint for NVec3 {
    fn position(&self) -> NVec3 {
        *self
    }

    fn weight(&self) -> f64 {
        1.0
    }
}

impl SpatialPoint for NVec4 {
    fn position(&self) -> NVec3 {
        self.xyz()
    }

    fn weight(&self) -> f64 {
        self.w
    }
}

/// Total mass and center of mass of everything under a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    pub com: NVec3, // weighted center of mass
    pub mass: f64,  // sum of weights
}

impl Aggregate {
    pub fn empty() -> Self {
        Self {
            com: NVec3::zeros(),
            mass: 0.0,
        }
    }
}

/// A query point tagged with the slot its result goes to.
#[derive(Debug, Clone, Copy)]
pub struct Query<P> {
    pub id: QueryId,
    pub point: P,
}

impl<P> Query<P> {
    pub fn new(id: QueryId, point: P) -> Self {
        Self { id, point }
    }
}

/// Axis-aligned box stored as center + half extent per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub center: NVec3,
    pub half_extent: NVec3,
}

impl BoundingBox {
    pub fn new(center: NVec3, half_extent: NVec3) -> Self {
        Self {
            center,
            half_extent,
        }
    }

    pub fn from_min_max(min: NVec3, max: NVec3) -> Self {
        Self {
            center: (min + max) * 0.5,
            half_extent: (max - min) * 0.5,
        }
    }

    /// Smallest cube enclosing every point.
    ///
    /// Using a cube keeps the node "size" in the opening criterion well
    /// defined. An empty point set gets a unit cube at the origin.
    pub fn enclosing_cube<P: SpatialPoint>(points: &[P]) -> Self {
        if points.is_empty() {
            return Self::new(NVec3::zeros(), NVec3::new(0.5, 0.5, 0.5));
        }

        let mut min = NVec3::repeat(f64::INFINITY);
        let mut max = NVec3::repeat(f64::NEG_INFINITY);
        for p in points {
            let x = p.position();
            min = min.inf(&x);
            max = max.sup(&x);
        }

        let center = (min + max) * 0.5;
        let half = (max - min) * 0.5;
        let max_half = half.x.max(half.y).max(half.z);
        Self::new(center, NVec3::repeat(max_half))
    }

    pub fn min(&self) -> NVec3 {
        self.center - self.half_extent
    }

    pub fn max(&self) -> NVec3 {
        self.center + self.half_extent
    }

    /// Full side length along the widest axis.
    pub fn extent(&self) -> f64 {
        2.0 * self.half_extent.x.max(self.half_extent.y).max(self.half_extent.z)
    }

    pub fn contains(&self, p: &NVec3) -> bool {
        let d = p - self.center;
        d.x.abs() <= self.half_extent.x
            && d.y.abs() <= self.half_extent.y
            && d.z.abs() <= self.half_extent.z
    }

    /// Octant index of `p` relative to the box center.
    ///
    /// Bit 0 is x, bit 1 is y, bit 2 is z; a set bit means the upper half.
    /// This matches the layout of a node's `children` array.
    pub fn octant_of(&self, p: &NVec3) -> usize {
        let mut idx = 0;
        if p.x >= self.center.x {
            idx |= 1;
        }
        if p.y >= self.center.y {
            idx |= 2;
        }
        if p.z >= self.center.z {
            idx |= 4;
        }
        idx
    }

    /// Box of child octant `idx`, same bit encoding as [`Self::octant_of`].
    pub fn octant(&self, idx: usize) -> Self {
        let half = self.half_extent * 0.5;
        let sign = |bit: usize| if idx & bit == 0 { -1.0 } else { 1.0 };
        let offset = NVec3::new(half.x * sign(1), half.y * sign(2), half.z * sign(4));
        Self::new(self.center + offset, half)
    }

    /// Squared distance from `p` to the closest point of the box (0 inside).
    pub fn distance2_to(&self, p: &NVec3) -> f64 {
        let d = (p - self.center).abs() - self.half_extent;
        d.sup(&NVec3::zeros()).norm_squared()
    }
}
