pub mod buffer;
pub mod backend;
pub mod results;
pub mod dispatcher;

pub use backend::{ComputeBackend, InlineBackend, ThreadedBackend};
pub use dispatcher::{BatchDispatcher, DispatchStats};
pub use results::ResultStore;
