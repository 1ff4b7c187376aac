pub mod error;
pub mod spatial;
pub mod traversal;
pub mod dispatch;
pub mod kernels;
pub mod engine;
pub mod configuration;
pub mod benchmark;

pub use spatial::states::{Aggregate, BoundingBox, NVec3, NVec4, Query, QueryId, SpatialPoint};
pub use spatial::octree::{LeafId, NodeId, Octree, OctreeNode, OctreeParams, TreeStats, MAX_DEPTH_LIMIT};
pub use spatial::payload::LeafPayloadTable;
pub use spatial::index::SpatialIndex;

pub use traversal::WorkSink;
pub use traversal::admission::{Admission, ThetaPolicy};
pub use traversal::blocked::{BlockedTraversal, TraversalStats};
pub use traversal::exact::ExactTraversal;
pub use traversal::resumable::{NnExecutor, Step};

pub use dispatch::{BatchDispatcher, ComputeBackend, DispatchStats, InlineBackend, ResultStore, ThreadedBackend};

pub use kernels::{Gravity, Kernel, Knn, KnnSet};

pub use engine::params::{Algorithm, BackendKind, RunConfig};
pub use engine::runner::{partition, run_blocked, run_knn, RunReport, WorkerReport};
pub use engine::scenario::{RunSummary, Scenario};

pub use configuration::config::{AlgorithmConfig, BackendConfig, DatasetConfig, EngineConfig, ParametersConfig, ScenarioConfig, UniformConfig};

pub use error::{BackendError, ConfigError, DatasetError, DispatchError, EngineError};

pub use benchmark::benchmark::bench_traversal;
