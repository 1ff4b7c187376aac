//! Worker pool and run orchestration.
//!
//! Queries are split into contiguous, disjoint id ranges, one per worker.
//! Every worker owns a [`WorkerContext`]: its traversal state, its two
//! buffers, its backend streams and the result slots for its range. Nothing
//! mutable is shared between workers; the spatial index is shared read-only.
//! Results are stitched back together in id order once all workers are done.

use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};
use rayon::prelude::*;

use crate::dispatch::{BatchDispatcher, ComputeBackend, DispatchStats, InlineBackend, ResultStore, ThreadedBackend};
use crate::engine::params::{BackendKind, RunConfig};
use crate::error::{DispatchError, EngineError};
use crate::kernels::{Kernel, Knn, KnnSet};
use crate::spatial::index::SpatialIndex;
use crate::spatial::octree::Octree;
use crate::spatial::states::{Query, QueryId, SpatialPoint};
use crate::traversal::admission::ThetaPolicy;
use crate::traversal::blocked::{BlockedTraversal, TraversalStats};
use crate::traversal::exact::ExactTraversal;
use crate::traversal::resumable::{NnExecutor, Step};

/// What one worker did.
#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub tid: usize,
    pub queries: Range<QueryId>,
    pub traversal: TraversalStats,
    pub dispatch: DispatchStats,
    pub folded_items: usize, // work items reflected in this worker's results
}

#[derive(Debug, Clone)]
pub struct RunReport<R> {
    pub results: Vec<R>,
    pub workers: Vec<WorkerReport>,
    pub elapsed: Duration,
}

impl<R> RunReport<R> {
    pub fn total_batches(&self) -> usize {
        self.workers.iter().map(|w| w.dispatch.batches_submitted).sum()
    }

    pub fn total_passes(&self) -> usize {
        self.workers.iter().map(|w| w.traversal.passes).sum()
    }
}

/// Split `0..num_queries` into at most `num_workers` contiguous ranges.
///
/// Earlier workers take one extra query when the split is uneven.
pub fn partition(num_queries: usize, num_workers: usize) -> Vec<Range<QueryId>> {
    let num_workers = num_workers.max(1);
    let base = num_queries / num_workers;
    let extra = num_queries % num_workers;

    let mut ranges = Vec::with_capacity(num_workers);
    let mut start = 0;
    for tid in 0..num_workers {
        let len = base + usize::from(tid < extra);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

fn worker_pool(num_threads: usize) -> Result<rayon::ThreadPool, EngineError> {
    Ok(rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("canopy-worker-{i}"))
        .build()?)
}

/// Per-worker private state for a blocked run.
pub struct WorkerContext<'t, P, K, B>
where
    P: SpatialPoint,
    K: Kernel<P>,
    B: ComputeBackend<P, Output = K::Output>,
{
    pub tid: usize,
    range: Range<QueryId>,
    traversal: BlockedTraversal<'t, P>,
    dispatcher: BatchDispatcher<P, K, B>,
}

impl<'t, P, K, B> WorkerContext<'t, P, K, B>
where
    P: SpatialPoint,
    K: Kernel<P>,
    B: ComputeBackend<P, Output = K::Output>,
{
    pub fn new(
        tid: usize,
        range: Range<QueryId>,
        tree: &'t Octree<P>,
        policy: ThetaPolicy,
        kernel: Arc<K>,
        backend: B,
        config: &RunConfig,
    ) -> Self {
        let results = ResultStore::new(range.clone(), kernel.identity());
        Self {
            tid,
            range,
            traversal: BlockedTraversal::new(tree, policy, config.block_size),
            dispatcher: BatchDispatcher::new(kernel, backend, config.batch_size, results),
        }
    }

    /// Push every query of this worker through the tree, then drain.
    pub fn run(mut self, queries: &[P]) -> Result<(ResultStore<K::Output>, WorkerReport), DispatchError> {
        for id in self.range.clone() {
            self.traversal
                .add_query(Query::new(id, queries[id]), &mut self.dispatcher)?;
        }
        self.traversal.flush(&mut self.dispatcher)?;

        let traversal = self.traversal.stats();
        let (results, dispatch) = self.dispatcher.finish()?;
        let folded_items = results.ids().map(|id| results.folded(id)).sum();
        debug!(
            "worker {} done: {} passes, {} batches",
            self.tid, traversal.passes, dispatch.batches_submitted
        );

        Ok((
            results,
            WorkerReport {
                tid: self.tid,
                queries: self.range,
                traversal,
                dispatch,
                folded_items,
            },
        ))
    }
}

/// Run a theta-admitted traversal (Barnes-Hut style) over `queries`.
///
/// `queries[i]` gets result slot `i`. With `config.cpu` set every query is
/// reduced inline by the exact traversal instead of being batched.
pub fn run_blocked<P, K>(
    index: &SpatialIndex<P>,
    queries: &[P],
    config: &RunConfig,
    kernel: K,
) -> Result<RunReport<K::Output>, EngineError>
where
    P: SpatialPoint,
    K: Kernel<P>,
{
    config.validate()?;
    let policy = config.policy()?;
    let kernel = Arc::new(kernel);
    let ranges = partition(queries.len(), config.num_threads);
    let pool = worker_pool(config.num_threads)?;

    info!(
        "traversal over {} queries: {} workers, theta {}, cpu {}",
        queries.len(),
        ranges.len(),
        config.theta,
        config.cpu
    );
    let start = Instant::now();

    let outputs: Vec<(ResultStore<K::Output>, WorkerReport)> = pool.install(|| {
        ranges
            .into_par_iter()
            .enumerate()
            .map(|(tid, range)| {
                if config.cpu {
                    return Ok(run_exact_worker(tid, range, index.tree(), policy, &*kernel, queries));
                }
                let kernel = Arc::clone(&kernel);
                let payload = Arc::clone(index.payload());
                match config.backend {
                    BackendKind::Inline => {
                        let backend = InlineBackend::new(Arc::clone(&kernel), payload);
                        WorkerContext::new(tid, range, index.tree(), policy, kernel, backend, config)
                            .run(queries)
                            .map_err(EngineError::from)
                    }
                    BackendKind::Threaded => {
                        let backend = ThreadedBackend::new(Arc::clone(&kernel), payload)?;
                        WorkerContext::new(tid, range, index.tree(), policy, kernel, backend, config)
                            .run(queries)
                            .map_err(EngineError::from)
                    }
                }
            })
            .collect::<Result<Vec<_>, EngineError>>()
    })?;

    let report = assemble(outputs, start.elapsed());
    info!(
        "traversal finished in {:.3?}: {} passes, {} batches",
        report.elapsed,
        report.total_passes(),
        report.total_batches()
    );
    Ok(report)
}

/// CPU baseline: one query at a time, reduced inline.
fn run_exact_worker<P, K>(
    tid: usize,
    range: Range<QueryId>,
    tree: &Octree<P>,
    policy: ThetaPolicy,
    kernel: &K,
    queries: &[P],
) -> (ResultStore<K::Output>, WorkerReport)
where
    P: SpatialPoint,
    K: Kernel<P>,
{
    let mut results = ResultStore::new(range.clone(), kernel.identity());
    let mut exe = ExactTraversal::new(tree, policy, kernel);
    let mut traversal = TraversalStats::default();

    for id in range.clone() {
        let value = exe.query(&queries[id]);
        let stats = exe.stats();
        let items = stats.leaf_node_reduced + stats.branch_node_reduced;
        results.set(id, value, items);

        traversal.passes += 1;
        traversal.queries += 1;
        traversal.leaf_items += stats.leaf_node_reduced;
        traversal.branch_items += stats.branch_node_reduced;
    }

    let folded_items = traversal.leaf_items + traversal.branch_items;
    (
        results,
        WorkerReport {
            tid,
            queries: range,
            traversal,
            dispatch: DispatchStats::default(),
            folded_items,
        },
    )
}

/// Exact k nearest neighbor distances for every query.
///
/// Each worker keeps up to `block_size` resumable executors alive and
/// round-robins them: every round each executor advances to its next leaf,
/// which is pushed into the dispatcher. Pruning radii come from the
/// worker's result slots and tighten as batches are synchronized.
///
/// With `config.cpu` set, queries run one at a time instead and every leaf
/// is reduced on the spot, so no batch is ever submitted.
pub fn run_knn<P>(
    index: &SpatialIndex<P>,
    queries: &[P],
    config: &RunConfig,
    k: usize,
) -> Result<RunReport<KnnSet>, EngineError>
where
    P: SpatialPoint,
{
    config.validate()?;
    let kernel = Arc::new(Knn { k });
    let ranges = partition(queries.len(), config.num_threads);
    let pool = worker_pool(config.num_threads)?;

    info!(
        "knn over {} queries: {} workers, k {}, cpu {}",
        queries.len(),
        ranges.len(),
        k,
        config.cpu
    );
    let start = Instant::now();

    let outputs: Vec<(ResultStore<KnnSet>, WorkerReport)> = pool.install(|| {
        ranges
            .into_par_iter()
            .enumerate()
            .map(|(tid, range)| {
                if config.cpu {
                    return Ok(run_exact_knn_worker(tid, range, index, &*kernel, queries));
                }
                let results = ResultStore::new(range.clone(), KnnSet::new(k));
                let payload = Arc::clone(index.payload());
                match config.backend {
                    BackendKind::Inline => {
                        let backend = InlineBackend::new(Arc::clone(&kernel), payload);
                        let dispatcher = BatchDispatcher::new(Arc::clone(&kernel), backend, config.batch_size, results);
                        knn_worker(tid, range, index.tree(), queries, config.block_size, dispatcher)
                    }
                    BackendKind::Threaded => {
                        let backend = ThreadedBackend::new(Arc::clone(&kernel), payload)?;
                        let dispatcher = BatchDispatcher::new(Arc::clone(&kernel), backend, config.batch_size, results);
                        knn_worker(tid, range, index.tree(), queries, config.block_size, dispatcher)
                    }
                }
            })
            .collect::<Result<Vec<_>, EngineError>>()
    })?;

    let report = assemble(outputs, start.elapsed());
    info!(
        "knn finished in {:.3?}: {} batches",
        report.elapsed,
        report.total_batches()
    );
    Ok(report)
}

/// CPU baseline for k-NN: each query walks the tree alone, tightening its
/// pruning radius after every leaf.
fn run_exact_knn_worker<P>(
    tid: usize,
    range: Range<QueryId>,
    index: &SpatialIndex<P>,
    kernel: &Knn,
    queries: &[P],
) -> (ResultStore<KnnSet>, WorkerReport)
where
    P: SpatialPoint,
{
    let tree = index.tree();
    let payload = index.payload();
    let mut results = ResultStore::new(range.clone(), KnnSet::new(kernel.k));
    let mut traversal = TraversalStats::default();

    for id in range.clone() {
        let query = Query::new(id, queries[id]);
        let mut set = KnnSet::new(kernel.k);
        let mut exe = NnExecutor::start(query, tree);
        let mut leaves = 0;

        while let Step::Leaf(uid) = exe.resume(tree, set.bound()) {
            // uids come from the same build as the payload
            if let Some(points) = payload.leaf(uid) {
                kernel.reduce_leaf(&query.point, points, &mut set);
                leaves += 1;
            }
        }
        results.set(id, set, leaves);

        traversal.passes += 1;
        traversal.queries += 1;
        traversal.leaf_items += leaves;
    }

    let folded_items = traversal.leaf_items;
    (
        results,
        WorkerReport {
            tid,
            queries: range,
            traversal,
            dispatch: DispatchStats::default(),
            folded_items,
        },
    )
}

fn knn_worker<P, B>(
    tid: usize,
    range: Range<QueryId>,
    tree: &Octree<P>,
    queries: &[P],
    block_size: usize,
    mut dispatcher: BatchDispatcher<P, Knn, B>,
) -> Result<(ResultStore<KnnSet>, WorkerReport), EngineError>
where
    P: SpatialPoint,
    B: ComputeBackend<P, Output = KnnSet>,
{
    let mut pending = range.clone().map(|id| Query::new(id, queries[id]));
    let mut live: Vec<NnExecutor<P>> = Vec::with_capacity(block_size);
    let mut traversal = TraversalStats::default();

    loop {
        while live.len() < block_size {
            match pending.next() {
                Some(query) => {
                    traversal.queries += 1;
                    live.push(NnExecutor::start(query, tree));
                }
                None => break,
            }
        }
        if live.is_empty() {
            break;
        }

        traversal.passes += 1;
        for exe in live.iter_mut() {
            let query = *exe.query();
            let bound = dispatcher.results().get(query.id).bound();
            if let Step::Leaf(uid) = exe.resume(tree, bound) {
                traversal.leaf_items += 1;
                dispatcher.push_leaf(&query, uid)?;
            }
        }
        live.retain(|exe| !exe.finished());
    }

    let (results, dispatch) = dispatcher.finish()?;
    let folded_items = results.ids().map(|id| results.folded(id)).sum();
    Ok((
        results,
        WorkerReport {
            tid,
            queries: range,
            traversal,
            dispatch,
            folded_items,
        },
    ))
}

fn assemble<R>(outputs: Vec<(ResultStore<R>, WorkerReport)>, elapsed: Duration) -> RunReport<R> {
    let total = outputs.iter().map(|(store, _)| store.len()).sum();
    let mut results = Vec::with_capacity(total);
    let mut workers = Vec::with_capacity(outputs.len());

    // Ranges were handed out in order, so concatenation restores id order
    for (store, report) in outputs {
        results.extend(store.into_values());
        workers.push(report);
    }

    RunReport {
        results,
        workers,
        elapsed,
    }
}
