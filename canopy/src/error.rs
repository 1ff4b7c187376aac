//! Error types shared across the crate.
//!
//! Configuration problems are caught before any tree is built. Dispatch and
//! backend failures are fatal for a run: nothing is retried, the error travels
//! back to the caller with enough context to tell which batch went wrong.

use thiserror::Error;

use crate::dispatch::backend::SlotId;
use crate::dispatch::buffer::BufferState;
use crate::spatial::octree::LeafId;
use crate::spatial::states::QueryId;

/// Rejected configuration values.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A count or size that has to be at least one.
    #[error("{name} must be positive")]
    NonPositive { name: &'static str },

    /// Octree depth above the supported limit.
    #[error("max_depth {max_depth} exceeds the limit of {limit}")]
    DepthTooLarge { max_depth: usize, limit: usize },

    /// Theta must be a non-negative number (infinity is allowed).
    #[error("theta must be a non-negative number, got {0}")]
    InvalidTheta(f64),

    /// Softening added to squared distances must be non-negative.
    #[error("softening eps2 must be non-negative, got {0}")]
    InvalidSoftening(f64),

    /// Neither a dataset file nor a generated dataset was given.
    #[error("no dataset configured")]
    MissingDataset,
}

/// Failures reported by a compute backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// A batch was submitted to a slot whose previous batch was never synchronized.
    #[error("slot {0} already has a batch in flight")]
    SlotBusy(SlotId),

    /// Slot id outside the backend's stream table.
    #[error("slot {0} does not exist")]
    UnknownSlot(SlotId),

    /// A work item referenced a leaf that is not in the payload table.
    #[error("slot {slot}: leaf {leaf} is out of range ({num_leaves} leaves)")]
    InvalidLeaf {
        slot: SlotId,
        leaf: LeafId,
        num_leaves: usize,
    },

    /// The executor behind a slot went away (panicked or was shut down).
    #[error("executor for slot {0} disconnected")]
    Disconnected(SlotId),

    /// The executor thread for a slot could not be started.
    #[error("failed to spawn executor for slot {slot}: {source}")]
    Spawn {
        slot: SlotId,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while collecting or dispatching work items.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A push went past `batch_size`; the dispatcher should have fired first.
    #[error("buffer for slot {slot} exceeded its capacity of {capacity} items")]
    CapacityExceeded { slot: SlotId, capacity: usize },

    /// A push reached a buffer that is not the one currently collecting.
    #[error("buffer for slot {slot} is {state:?}, not collecting")]
    NotCollecting { slot: SlotId, state: BufferState },

    /// The backend failed to run or hand back a batch.
    #[error(
        "batch {sequence} on slot {slot} failed ({items} items, queries {first_query:?}..={last_query:?}): {source}"
    )]
    Backend {
        slot: SlotId,
        sequence: u64,
        items: usize,
        first_query: Option<QueryId>,
        last_query: Option<QueryId>,
        #[source]
        source: BackendError,
    },
}

/// Dataset loading failures.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    /// The file length is not a whole number of 4 x f32 records.
    #[error("dataset is {len} bytes, not a multiple of 16")]
    Truncated { len: usize },
}

/// Anything that can end a run early.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
