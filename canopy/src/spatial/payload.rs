//! Flattened leaf payload table.
//!
//! All leaf points are copied into one contiguous array grouped by leaf uid,
//! with per-leaf offsets and counts. Backends address a leaf by its bare uid
//! instead of walking the tree.

use crate::spatial::octree::LeafId;

#[derive(Debug, Clone)]
pub struct LeafPayloadTable<P> {
    data: Vec<P>,
    offsets: Vec<usize>,
    counts: Vec<usize>,
}

impl<P: Copy> LeafPayloadTable<P> {
    /// Lay out `leaves` back to back, in iteration order.
    pub fn from_leaves<'a, I>(num_points: usize, leaves: I) -> Self
    where
        I: IntoIterator<Item = &'a [P]>,
        P: 'a,
    {
        let mut data = Vec::with_capacity(num_points);
        let mut offsets = Vec::new();
        let mut counts = Vec::new();

        for bodies in leaves {
            offsets.push(data.len());
            counts.push(bodies.len());
            data.extend_from_slice(bodies);
        }

        Self {
            data,
            offsets,
            counts,
        }
    }

    pub fn num_leaves(&self) -> usize {
        self.counts.len()
    }

    /// Points stored for `leaf`, `None` if the uid is out of range.
    pub fn leaf(&self, leaf: LeafId) -> Option<&[P]> {
        let start = *self.offsets.get(leaf)?;
        Some(&self.data[start..start + self.counts[leaf]])
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn data(&self) -> &[P] {
        &self.data
    }
}
