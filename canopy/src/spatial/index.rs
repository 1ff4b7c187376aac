//! Octree + payload table bundle shared by every worker of a run.

use std::sync::Arc;

use crate::error::ConfigError;
use crate::spatial::octree::{Octree, OctreeParams, TreeStats};
use crate::spatial::payload::LeafPayloadTable;
use crate::spatial::states::SpatialPoint;

/// A built octree together with its leaf payload table.
///
/// Building through here runs the tree split and the payload load back to
/// back, so traversals never see a tree without its leaf data. Both halves
/// are behind `Arc` and cheap to hand to workers and backends.
#[derive(Debug, Clone)]
pub struct SpatialIndex<P> {
    tree: Arc<Octree<P>>,
    payload: Arc<LeafPayloadTable<P>>,
}

impl<P: SpatialPoint> SpatialIndex<P> {
    pub fn build(points: &[P], params: OctreeParams) -> Result<Self, ConfigError> {
        let tree = Octree::build(points, params)?;
        let payload = tree.load_payload();
        Ok(Self {
            tree: Arc::new(tree),
            payload: Arc::new(payload),
        })
    }

    pub fn tree(&self) -> &Octree<P> {
        &self.tree
    }

    pub fn payload(&self) -> &Arc<LeafPayloadTable<P>> {
        &self.payload
    }

    pub fn stats(&self) -> TreeStats {
        self.tree.stats()
    }
}
