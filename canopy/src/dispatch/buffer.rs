//! Work items and the fixed-capacity buffers that collect them.

use crate::dispatch::backend::SlotId;
use crate::error::DispatchError;
use crate::spatial::octree::LeafId;
use crate::spatial::states::{Aggregate, QueryId};

/// What a work item has to be reduced against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    Leaf(LeafId),        // exact reduction over a leaf's points
    Branch(Aggregate),   // approximate reduction against a subtree aggregate
}

/// A deferred reduction: one query against one leaf or aggregate.
#[derive(Debug, Clone, Copy)]
pub struct WorkItem<P> {
    pub query: QueryId,
    pub point: P,
    pub target: Target,
}

/// Lifecycle of a buffer. `Empty -> Collecting -> Dispatched -> Synced -> Empty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    Empty,
    Collecting,
    Dispatched,
    Synced,
}

/// Fixed-capacity item storage bound to one backend slot.
///
/// While a batch is in flight its storage is owned by the backend, so the
/// buffer holds an empty vector and cannot be written until synchronization
/// hands the storage back.
#[derive(Debug)]
pub struct Buffer<P> {
    slot: SlotId,
    capacity: usize,
    items: Vec<WorkItem<P>>,
    state: BufferState,
}

impl<P> Buffer<P> {
    pub fn new(slot: SlotId, capacity: usize) -> Self {
        Self {
            slot,
            capacity,
            items: Vec::with_capacity(capacity),
            state: BufferState::Empty,
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn state(&self) -> BufferState {
        self.state
    }

    pub fn items(&self) -> &[WorkItem<P>] {
        &self.items
    }

    pub fn start_collecting(&mut self) {
        debug_assert!(matches!(self.state, BufferState::Empty | BufferState::Collecting));
        self.state = BufferState::Collecting;
    }

    pub fn push(&mut self, item: WorkItem<P>) -> Result<(), DispatchError> {
        if self.state != BufferState::Collecting {
            return Err(DispatchError::NotCollecting {
                slot: self.slot,
                state: self.state,
            });
        }
        if self.is_full() {
            return Err(DispatchError::CapacityExceeded {
                slot: self.slot,
                capacity: self.capacity,
            });
        }
        self.items.push(item);
        Ok(())
    }

    /// Hand the collected items over for submission.
    pub(crate) fn take_for_dispatch(&mut self) -> Vec<WorkItem<P>> {
        self.state = BufferState::Dispatched;
        std::mem::take(&mut self.items)
    }

    /// Mark the in-flight batch as finished without getting storage back.
    pub(crate) fn mark_synced(&mut self) {
        self.state = BufferState::Synced;
    }

    /// Take back storage from a completed batch, cleared for reuse.
    pub(crate) fn recycle(&mut self, mut storage: Vec<WorkItem<P>>) {
        storage.clear();
        self.items = storage;
        self.state = BufferState::Empty;
    }
}
