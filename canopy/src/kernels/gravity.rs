//! Softened Newtonian gravity.
//!
//! Acceleration at the query point due to weighted source points:
//!   a += G * m_j * r / (|r|^2 + eps2)^(3/2),   r = x_j - q
//! The softening also keeps a query sitting exactly on a source finite.

use crate::kernels::Kernel;
use crate::spatial::states::{Aggregate, NVec3, SpatialPoint};

/// Softening used when none is configured.
pub const DEFAULT_EPS2: f64 = 1e-9;

#[allow(non_snake_case)]
#[derive(Debug, Clone, Copy)]
pub struct Gravity {
    pub G: f64,    // gravitational constant
    pub eps2: f64, // softening
}

impl Default for Gravity {
    fn default() -> Self {
        Self {
            G: 1.0,
            eps2: DEFAULT_EPS2,
        }
    }
}

impl Gravity {
    /// Contribution of one mass `m` at `source` on a query at `pos`.
    #[inline]
    pub fn pair(&self, pos: &NVec3, source: &NVec3, m: f64) -> NVec3 {
        let r = source - pos;
        let dist2 = r.dot(&r) + self.eps2;
        let inv_r = dist2.sqrt().recip();
        let inv_r3 = inv_r * inv_r * inv_r;
        self.G * m * inv_r3 * r
    }
}

impl<P: SpatialPoint> Kernel<P> for Gravity {
    type Output = NVec3;

    fn identity(&self) -> NVec3 {
        NVec3::zeros()
    }

    fn reduce_leaf(&self, query: &P, leaf: &[P], acc: &mut NVec3) {
        let pos = query.position();
        for body in leaf {
            *acc += self.pair(&pos, &body.position(), body.weight());
        }
    }

    fn reduce_branch(&self, query: &P, aggregate: &Aggregate, acc: &mut NVec3) {
        *acc += self.pair(&query.position(), &aggregate.com, aggregate.mass);
    }

    fn combine(&self, acc: &mut NVec3, partial: NVec3) {
        *acc += partial;
    }
}
