//! Double-buffered batch dispatcher.
//!
//! Each worker owns one dispatcher with two buffers ("ping" and "pong").
//! Traversals push work items into whichever buffer is collecting. When it
//! fills up:
//!
//! 1. the buffer is submitted to the backend on its own slot,
//! 2. collection moves to the other buffer,
//! 3. the other buffer's previous submission is synchronized first, since its
//!    storage is still held by the backend until then,
//! 4. the completed partials are folded into the result store and the storage
//!    comes back cleared.
//!
//! Step 3 is the only place a worker ever blocks. If the backend is slower
//! than collection the worker simply waits there, so at most one batch per
//! worker is ever waiting to be synchronized.

use std::sync::Arc;

use log::debug;

use crate::dispatch::backend::{Batch, Completed, ComputeBackend, SlotId, NUM_SLOTS};
use crate::dispatch::buffer::{Buffer, BufferState, Target, WorkItem};
use crate::dispatch::results::ResultStore;
use crate::error::{BackendError, DispatchError};
use crate::kernels::Kernel;
use crate::spatial::octree::LeafId;
use crate::spatial::states::{Aggregate, Query, SpatialPoint};
use crate::traversal::WorkSink;

/// Counters kept by a dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub leaf_items: usize,
    pub branch_items: usize,
    pub batches_submitted: usize,
    pub batches_synced: usize,
}

pub struct BatchDispatcher<P, K, B>
where
    P: SpatialPoint,
    K: Kernel<P>,
    B: ComputeBackend<P, Output = K::Output>,
{
    kernel: Arc<K>,
    backend: B,
    buffers: [Buffer<P>; NUM_SLOTS],
    collecting: SlotId,
    in_flight: [Option<BatchContext>; NUM_SLOTS],
    sequence: u64,
    results: ResultStore<K::Output>,
    stats: DispatchStats,
}

impl<P, K, B> BatchDispatcher<P, K, B>
where
    P: SpatialPoint,
    K: Kernel<P>,
    B: ComputeBackend<P, Output = K::Output>,
{
    /// `batch_size` must be positive; callers validate it with the rest of
    /// the run configuration.
    pub fn new(kernel: Arc<K>, backend: B, batch_size: usize, results: ResultStore<K::Output>) -> Self {
        let mut buffers: [Buffer<P>; NUM_SLOTS] =
            std::array::from_fn(|slot| Buffer::new(slot, batch_size));
        buffers[0].start_collecting();

        Self {
            kernel,
            backend,
            buffers,
            collecting: 0,
            in_flight: std::array::from_fn(|_| None),
            sequence: 0,
            results,
            stats: DispatchStats::default(),
        }
    }

    pub fn push_leaf(&mut self, query: &Query<P>, leaf: LeafId) -> Result<(), DispatchError> {
        self.stats.leaf_items += 1;
        self.push(WorkItem {
            query: query.id,
            point: query.point,
            target: Target::Leaf(leaf),
        })
    }

    pub fn push_branch(&mut self, query: &Query<P>, aggregate: &Aggregate) -> Result<(), DispatchError> {
        self.stats.branch_items += 1;
        self.push(WorkItem {
            query: query.id,
            point: query.point,
            target: Target::Branch(*aggregate),
        })
    }

    fn push(&mut self, item: WorkItem<P>) -> Result<(), DispatchError> {
        let buffer = &mut self.buffers[self.collecting];
        buffer.push(item)?;
        if buffer.is_full() {
            self.dispatch_current()?;
        }
        Ok(())
    }

    /// Submit the collecting buffer (if it holds anything) and swap.
    pub fn dispatch_current(&mut self) -> Result<(), DispatchError> {
        let slot = self.collecting;
        if self.buffers[slot].is_empty() {
            return Ok(());
        }

        let items = self.buffers[slot].take_for_dispatch();
        let sequence = self.sequence;
        self.sequence += 1;

        let context = BatchContext::of(slot, sequence, &items);
        debug!(
            "submitting batch {sequence} on slot {slot} ({} items)",
            items.len()
        );
        self.backend
            .submit_batch(Batch {
                slot,
                sequence,
                items,
            })
            .map_err(|source| context.to_error(source))?;
        self.in_flight[slot] = Some(context);
        self.stats.batches_submitted += 1;

        let next = (NUM_SLOTS - 1) - slot;
        self.sync_slot(next)?;
        self.buffers[next].start_collecting();
        self.collecting = next;
        Ok(())
    }

    /// Submit whatever is still collected and wait for every slot.
    ///
    /// After this returns every pushed item is reflected in the results.
    pub fn flush(&mut self) -> Result<(), DispatchError> {
        self.dispatch_current()?;
        for slot in 0..NUM_SLOTS {
            self.sync_slot(slot)?;
        }
        Ok(())
    }

    fn sync_slot(&mut self, slot: SlotId) -> Result<(), DispatchError> {
        let Some(context) = self.in_flight[slot].take() else {
            return Ok(());
        };

        let Completed {
            sequence,
            items,
            partials,
            ..
        } = self
            .backend
            .synchronize(slot)
            .map_err(|source| context.to_error(source))?
            .ok_or_else(|| context.to_error(BackendError::Disconnected(slot)))?;

        debug!("synchronized batch {sequence} on slot {slot}");
        self.buffers[slot].mark_synced();

        let kernel = &self.kernel;
        for partial in partials {
            self.results.apply(partial, |acc, value| kernel.combine(acc, value));
        }

        self.buffers[slot].recycle(items);
        self.stats.batches_synced += 1;
        Ok(())
    }

    pub fn results(&self) -> &ResultStore<K::Output> {
        &self.results
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn collecting_slot(&self) -> SlotId {
        self.collecting
    }

    pub fn buffer_state(&self, slot: SlotId) -> BufferState {
        self.buffers[slot].state()
    }

    /// Flush and hand back the result store.
    pub fn finish(mut self) -> Result<(ResultStore<K::Output>, DispatchStats), DispatchError> {
        self.flush()?;
        Ok((self.results, self.stats))
    }
}

impl<P, K, B> WorkSink<P> for BatchDispatcher<P, K, B>
where
    P: SpatialPoint,
    K: Kernel<P>,
    B: ComputeBackend<P, Output = K::Output>,
{
    fn push_leaf(&mut self, query: &Query<P>, leaf: LeafId) -> Result<(), DispatchError> {
        BatchDispatcher::push_leaf(self, query, leaf)
    }

    fn push_branch(&mut self, query: &Query<P>, aggregate: &Aggregate) -> Result<(), DispatchError> {
        BatchDispatcher::push_branch(self, query, aggregate)
    }
}

/// What is known about a batch, kept for error reports after its items moved.
#[derive(Debug, Clone, Copy)]
struct BatchContext {
    slot: SlotId,
    sequence: u64,
    items: usize,
    first_query: Option<usize>,
    last_query: Option<usize>,
}

impl BatchContext {
    fn of<P>(slot: SlotId, sequence: u64, items: &[WorkItem<P>]) -> Self {
        Self {
            slot,
            sequence,
            items: items.len(),
            first_query: items.first().map(|i| i.query),
            last_query: items.last().map(|i| i.query),
        }
    }

    fn to_error(&self, source: BackendError) -> DispatchError {
        DispatchError::Backend {
            slot: self.slot,
            sequence: self.sequence,
            items: self.items,
            first_query: self.first_query,
            last_query: self.last_query,
            source,
        }
    }
}
