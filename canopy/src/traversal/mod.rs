//! Tree traversals.
//!
//! - [`admission`]: the per-node decision (skip, reduce leaf, approximate, descend)
//! - [`blocked`]: many queries advanced one tree level at a time
//! - [`exact`]: single-query recursive baseline that reduces inline
//! - [`resumable`]: suspend-at-leaf executor used by nearest-neighbor search
//!
//! Deferred traversals report their decisions to a [`WorkSink`] instead of
//! computing anything themselves.

pub mod admission;
pub mod blocked;
pub mod exact;
pub mod resumable;

use crate::error::DispatchError;
use crate::spatial::octree::LeafId;
use crate::spatial::states::{Aggregate, Query};

/// Receiver of the reductions a traversal decided on.
pub trait WorkSink<P> {
    fn push_leaf(&mut self, query: &Query<P>, leaf: LeafId) -> Result<(), DispatchError>;
    fn push_branch(&mut self, query: &Query<P>, aggregate: &Aggregate) -> Result<(), DispatchError>;
}
