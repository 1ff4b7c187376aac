//! Compute backends.
//!
//! A backend executes one batch of work items at a time per slot and hands
//! back per-query partial results. The dispatcher talks to it through two
//! calls only:
//!
//! - [`ComputeBackend::submit_batch`] schedules a batch and returns without
//!   waiting for it to run.
//! - [`ComputeBackend::synchronize`] blocks until the batch on a slot has
//!   finished and returns its results together with the item storage, which
//!   the dispatcher recycles.
//!
//! Two implementations ship with the crate: [`InlineBackend`] runs the kernel
//! on the calling thread at submit time, [`ThreadedBackend`] keeps one
//! executor thread per slot, fed over channels, so batches run while the
//! traversal keeps collecting.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use log::debug;

use crate::dispatch::buffer::{Target, WorkItem};
use crate::error::BackendError;
use crate::kernels::Kernel;
use crate::spatial::payload::LeafPayloadTable;
use crate::spatial::states::{QueryId, SpatialPoint};

/// Identifies one of the double-buffering streams.
pub type SlotId = usize;

/// Buffers (and backend streams) per worker.
pub const NUM_SLOTS: usize = 2;

/// A full buffer on its way to the backend.
#[derive(Debug)]
pub struct Batch<P> {
    pub slot: SlotId,
    pub sequence: u64,
    pub items: Vec<WorkItem<P>>,
}

/// Result of a run of consecutive items for the same query.
#[derive(Debug, Clone)]
pub struct Partial<R> {
    pub query: QueryId,
    pub value: R,
    pub items: usize, // work items folded into `value`
}

/// A finished batch.
#[derive(Debug)]
pub struct Completed<P, R> {
    pub slot: SlotId,
    pub sequence: u64,
    pub items: Vec<WorkItem<P>>, // storage handed back for reuse
    pub partials: Vec<Partial<R>>,
}

pub trait ComputeBackend<P: SpatialPoint> {
    type Output: Send + 'static;

    /// Schedule `batch` on `batch.slot`. Must not wait for it to execute.
    fn submit_batch(&mut self, batch: Batch<P>) -> Result<(), BackendError>;

    /// Wait for the batch on `slot`. `Ok(None)` when nothing is in flight.
    fn synchronize(&mut self, slot: SlotId) -> Result<Option<Completed<P, Self::Output>>, BackendError>;
}

/// Run `kernel` over `items`.
///
/// Consecutive items for the same query are folded into one partial, so a
/// query that descended into many leaves produces a single entry per run.
pub fn execute_batch<P, K>(
    kernel: &K,
    payload: &LeafPayloadTable<P>,
    slot: SlotId,
    items: &[WorkItem<P>],
) -> Result<Vec<Partial<K::Output>>, BackendError>
where
    P: SpatialPoint,
    K: Kernel<P>,
{
    let mut partials: Vec<Partial<K::Output>> = Vec::new();

    for item in items {
        if partials.last().map_or(true, |p| p.query != item.query) {
            partials.push(Partial {
                query: item.query,
                value: kernel.identity(),
                items: 0,
            });
        }
        let last = partials.len() - 1;
        let partial = &mut partials[last];

        match &item.target {
            Target::Leaf(uid) => {
                let leaf = payload.leaf(*uid).ok_or(BackendError::InvalidLeaf {
                    slot,
                    leaf: *uid,
                    num_leaves: payload.num_leaves(),
                })?;
                kernel.reduce_leaf(&item.point, leaf, &mut partial.value);
            }
            Target::Branch(aggregate) => {
                kernel.reduce_branch(&item.point, aggregate, &mut partial.value);
            }
        }
        partial.items += 1;
    }

    Ok(partials)
}

fn check_slot(slot: SlotId) -> Result<(), BackendError> {
    if slot < NUM_SLOTS {
        Ok(())
    } else {
        Err(BackendError::UnknownSlot(slot))
    }
}

// =========================================================================================
// Inline backend
// =========================================================================================

/// Executes each batch synchronously inside `submit_batch`.
///
/// Useful as a CPU loop and as a deterministic reference for the threaded
/// backend; synchronization just hands back the stored result.
pub struct InlineBackend<P, K: Kernel<P>>
where
    P: SpatialPoint,
{
    kernel: Arc<K>,
    payload: Arc<LeafPayloadTable<P>>,
    done: [Option<Completed<P, K::Output>>; NUM_SLOTS],
}

impl<P: SpatialPoint, K: Kernel<P>> InlineBackend<P, K> {
    pub fn new(kernel: Arc<K>, payload: Arc<LeafPayloadTable<P>>) -> Self {
        Self {
            kernel,
            payload,
            done: std::array::from_fn(|_| None),
        }
    }
}

impl<P: SpatialPoint, K: Kernel<P>> ComputeBackend<P> for InlineBackend<P, K> {
    type Output = K::Output;

    fn submit_batch(&mut self, batch: Batch<P>) -> Result<(), BackendError> {
        check_slot(batch.slot)?;
        if self.done[batch.slot].is_some() {
            return Err(BackendError::SlotBusy(batch.slot));
        }

        let partials = execute_batch(&*self.kernel, &self.payload, batch.slot, &batch.items)?;
        self.done[batch.slot] = Some(Completed {
            slot: batch.slot,
            sequence: batch.sequence,
            items: batch.items,
            partials,
        });
        Ok(())
    }

    fn synchronize(&mut self, slot: SlotId) -> Result<Option<Completed<P, K::Output>>, BackendError> {
        check_slot(slot)?;
        Ok(self.done[slot].take())
    }
}

// =========================================================================================
// Threaded backend
// =========================================================================================

type Outcome<P, R> = Result<Completed<P, R>, BackendError>;

struct Stream<P, R> {
    jobs: Option<Sender<Batch<P>>>,
    done: Receiver<Outcome<P, R>>,
    in_flight: bool,
    handle: Option<JoinHandle<()>>,
}

/// One executor thread per slot, standing in for device streams.
///
/// Submitting only enqueues the batch on the slot's channel; the thread runs
/// the kernel and posts the outcome back. Dropping the backend closes the job
/// channels and joins the threads.
pub struct ThreadedBackend<P, K: Kernel<P>>
where
    P: SpatialPoint,
{
    streams: Vec<Stream<P, K::Output>>,
}

impl<P: SpatialPoint, K: Kernel<P>> ThreadedBackend<P, K> {
    pub fn new(kernel: Arc<K>, payload: Arc<LeafPayloadTable<P>>) -> Result<Self, BackendError> {
        let mut streams = Vec::with_capacity(NUM_SLOTS);

        for slot in 0..NUM_SLOTS {
            let (job_tx, job_rx) = crossbeam_channel::bounded::<Batch<P>>(1);
            let (done_tx, done_rx) = crossbeam_channel::bounded::<Outcome<P, K::Output>>(1);
            let kernel = Arc::clone(&kernel);
            let payload = Arc::clone(&payload);

            let handle = std::thread::Builder::new()
                .name(format!("canopy-slot-{slot}"))
                .spawn(move || {
                    for batch in job_rx.iter() {
                        let outcome = execute_batch(&*kernel, &payload, batch.slot, &batch.items)
                            .map(|partials| Completed {
                                slot: batch.slot,
                                sequence: batch.sequence,
                                items: batch.items,
                                partials,
                            });
                        if done_tx.send(outcome).is_err() {
                            break;
                        }
                    }
                })
                .map_err(|source| BackendError::Spawn { slot, source })?;

            streams.push(Stream {
                jobs: Some(job_tx),
                done: done_rx,
                in_flight: false,
                handle: Some(handle),
            });
        }

        Ok(Self { streams })
    }
}

impl<P: SpatialPoint, K: Kernel<P>> ComputeBackend<P> for ThreadedBackend<P, K> {
    type Output = K::Output;

    fn submit_batch(&mut self, batch: Batch<P>) -> Result<(), BackendError> {
        check_slot(batch.slot)?;
        let slot = batch.slot;
        let stream = &mut self.streams[slot];
        if stream.in_flight {
            return Err(BackendError::SlotBusy(slot));
        }

        let jobs = stream.jobs.as_ref().ok_or(BackendError::Disconnected(slot))?;
        jobs.send(batch).map_err(|_| BackendError::Disconnected(slot))?;
        stream.in_flight = true;
        Ok(())
    }

    fn synchronize(&mut self, slot: SlotId) -> Result<Option<Completed<P, K::Output>>, BackendError> {
        check_slot(slot)?;
        let stream = &mut self.streams[slot];
        if !stream.in_flight {
            return Ok(None);
        }

        stream.in_flight = false;
        let outcome = stream
            .done
            .recv()
            .map_err(|_| BackendError::Disconnected(slot))?;
        outcome.map(Some)
    }
}

impl<P, K> Drop for ThreadedBackend<P, K>
where
    P: SpatialPoint,
    K: Kernel<P>,
{
    fn drop(&mut self) {
        for stream in &mut self.streams {
            stream.jobs.take();
        }
        for (slot, stream) in self.streams.iter_mut().enumerate() {
            // Unread outcomes would block the executor on a full channel
            while stream.done.try_recv().is_ok() {}
            if let Some(handle) = stream.handle.take() {
                if handle.join().is_err() {
                    debug!("executor for slot {slot} panicked");
                }
            }
        }
    }
}
