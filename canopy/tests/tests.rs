use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use canopy::dispatch::backend::{execute_batch, Batch, Completed, SlotId};
use canopy::engine::dataset::uniform_points;
use canopy::{
    partition, run_blocked, run_knn, Aggregate, BackendError, BackendKind, BatchDispatcher, BoundingBox,
    ComputeBackend, ConfigError, DispatchError, EngineError, Gravity, LeafPayloadTable, NVec3, NVec4,
    Octree, OctreeParams, Query, ResultStore, RunConfig, RunSummary, Scenario, ScenarioConfig, SpatialIndex,
    SpatialPoint, MAX_DEPTH_LIMIT,
};

/// `n` uniform points (mass included) in `[0, extent)^4`
pub fn uniform(n: usize, extent: f64, seed: u64) -> Vec<NVec4> {
    let mut rng = StdRng::seed_from_u64(seed);
    uniform_points(n, extent, &mut rng)
}

/// Octree parameters whose root is the cube `[0, extent]^3`
pub fn cube_params(max_leaf_size: usize, extent: f64) -> OctreeParams {
    OctreeParams::new(max_leaf_size, 20)
        .with_bounds(BoundingBox::from_min_max(NVec3::zeros(), NVec3::repeat(extent)))
}

/// The reference run: 1000 points in a 1000^3 cube, leaf size 32
pub fn reference_index() -> SpatialIndex<NVec4> {
    let points = uniform(1000, 1000.0, 1);
    SpatialIndex::build(&points, cube_params(32, 1000.0)).unwrap()
}

/// Small single-threaded run settings
pub fn test_config(theta: f64) -> RunConfig {
    RunConfig {
        theta,
        num_threads: 1,
        batch_size: 128,
        block_size: 64,
        ..RunConfig::default()
    }
}

pub fn rel_err(a: &NVec3, b: &NVec3) -> f64 {
    (a - b).norm() / b.norm().max(1e-300)
}

// ==================================================================================
// Octree tests
// ==================================================================================

#[test]
fn octree_leaves_hold_every_point_once() {
    let points = uniform(5000, 100.0, 3);
    let tree = Octree::build(&points, cube_params(16, 100.0)).unwrap();

    let total: usize = tree.leaves().map(|leaf| leaf.bodies.len()).sum();
    assert_eq!(total, points.len());
    assert_eq!(tree.stats().num_leaf_nodes, tree.leaves().count());

    for (uid, leaf) in tree.leaves().enumerate() {
        assert_eq!(leaf.uid, Some(uid));
        assert!(leaf.bodies.len() <= 16 || leaf.depth == tree.params().max_depth);
    }
}

#[test]
fn octree_center_of_mass_inside_box() {
    let points = uniform(2000, 50.0, 4);
    let tree = Octree::build(&points, cube_params(8, 50.0)).unwrap();

    for node in tree.nodes() {
        if node.aggregate.mass > 0.0 {
            let (lo, hi) = (node.bbox.min(), node.bbox.max());
            for i in 0..3 {
                assert!(node.aggregate.com[i] >= lo[i] - 1e-9 && node.aggregate.com[i] <= hi[i] + 1e-9);
            }
        }
    }

    let root = tree.node(tree.root());
    let mass: f64 = points.iter().map(|p| p.weight()).sum();
    assert!((root.aggregate.mass - mass).abs() / mass < 1e-12);
}

#[test]
fn octree_empty_dataset_is_single_empty_leaf() {
    let tree = Octree::<NVec4>::build(&[], OctreeParams::new(8, 20)).unwrap();
    let root = tree.node(tree.root());

    assert!(root.is_leaf());
    assert!(root.bodies.is_empty());
    assert_eq!(tree.stats().num_nodes, 1);
    assert_eq!(tree.stats().num_leaf_nodes, 1);
}

#[test]
fn octree_duplicate_points_stop_splitting() {
    let points = vec![NVec4::new(1.0, 2.0, 3.0, 1.0); 200];
    let tree = Octree::build(&points, OctreeParams::new(4, 6)).unwrap();

    assert_eq!(tree.stats().max_depth, 0);
    assert_eq!(tree.stats().num_leaf_nodes, 1);
    assert_eq!(tree.stats().capped_leaves, 1);
    assert_eq!(tree.node(tree.root()).bodies.len(), 200);
}

#[test]
fn octree_duplicates_with_deepest_allowed_depth() {
    // 64 copies of one point plus a single outlier: the copies must not be
    // chased all the way down to max_depth
    let mut points = vec![NVec4::new(0.25, 0.25, 0.25, 1.0); 64];
    points.push(NVec4::new(0.75, 0.75, 0.75, 1.0));
    let params = OctreeParams::new(4, MAX_DEPTH_LIMIT)
        .with_bounds(BoundingBox::from_min_max(NVec3::zeros(), NVec3::repeat(1.0)));
    let index = SpatialIndex::build(&points, params).unwrap();
    let tree = index.tree();

    assert_eq!(tree.stats().max_depth, 1);
    assert_eq!(tree.stats().capped_leaves, 1);
    let full: Vec<_> = tree.leaves().filter(|l| !l.bodies.is_empty()).collect();
    assert_eq!(full.len(), 2);
    assert_eq!(full[0].bodies.len(), 64);

    let root = tree.node(tree.root());
    assert_eq!(root.aggregate.mass, 65.0);

    let queries = uniform(10, 1.0, 40);
    let report = run_blocked(&index, &queries, &test_config(0.5), Gravity::default()).unwrap();
    assert_eq!(report.results.len(), 10);
    let knn = run_knn(&index, &queries, &test_config(0.5), 3).unwrap();
    for (q, set) in queries.iter().zip(&knn.results) {
        assert_eq!(set.distances(), brute_force_knn(&points, q, 3).as_slice());
    }
}

#[test]
fn octree_near_duplicates_stay_within_depth_limit() {
    // Distinct but extremely close points force real subdivision
    let points: Vec<NVec4> = (0..40)
        .map(|i| NVec4::new(0.5 + i as f64 * 1e-15, 0.5, 0.5, 1.0))
        .collect();
    let tree = Octree::build(&points, OctreeParams::new(1, MAX_DEPTH_LIMIT)).unwrap();

    assert!(tree.stats().max_depth <= MAX_DEPTH_LIMIT);
    let total: usize = tree.leaves().map(|l| l.bodies.len()).sum();
    assert_eq!(total, 40);
    for (uid, leaf) in tree.leaves().enumerate() {
        assert_eq!(leaf.uid, Some(uid));
    }
}

#[test]
fn octree_rejects_depth_over_limit() {
    let points = vec![NVec4::new(1.0, 1.0, 1.0, 1.0); 64];
    assert_eq!(
        Octree::build(&points, OctreeParams::new(4, 50_000)).unwrap_err(),
        ConfigError::DepthTooLarge {
            max_depth: 50_000,
            limit: MAX_DEPTH_LIMIT
        }
    );
    let config = RunConfig {
        max_depth: MAX_DEPTH_LIMIT + 1,
        ..test_config(0.5)
    };
    assert!(matches!(config.validate(), Err(ConfigError::DepthTooLarge { .. })));
}

#[test]
fn octree_leaf_uids_follow_depth_first_order() {
    let points = uniform(500, 1.0, 41);
    let tree = Octree::build(&points, cube_params(8, 1.0)).unwrap();

    // Walk the tree recursively, octant 0 first, and collect leaves
    fn walk(tree: &Octree<NVec4>, id: usize, out: &mut Vec<usize>) {
        let node = tree.node(id);
        match node.uid {
            Some(uid) => out.push(uid),
            None => {
                for child in node.children.iter().flatten() {
                    assert!(*child > id);
                    walk(tree, *child, out);
                }
            }
        }
    }
    let mut order = Vec::new();
    walk(&tree, tree.root(), &mut order);
    assert_eq!(order, (0..tree.stats().num_leaf_nodes).collect::<Vec<_>>());
}

#[test]
fn octree_rejects_zero_sizes() {
    let points = uniform(10, 1.0, 5);
    assert_eq!(
        Octree::build(&points, OctreeParams::new(0, 20)).unwrap_err(),
        ConfigError::NonPositive { name: "max_leaf_size" }
    );
    assert_eq!(
        Octree::build(&points, OctreeParams::new(4, 0)).unwrap_err(),
        ConfigError::NonPositive { name: "max_depth" }
    );
}

#[test]
fn payload_layout_matches_leaves() {
    let points = uniform(3000, 10.0, 6);
    let tree = Octree::build(&points, cube_params(24, 10.0)).unwrap();
    let payload: LeafPayloadTable<NVec4> = tree.load_payload();

    assert_eq!(payload.num_leaves(), tree.stats().num_leaf_nodes);
    assert_eq!(payload.data().len(), points.len());

    let mut offset = 0;
    for (uid, leaf) in tree.leaves().enumerate() {
        assert_eq!(payload.offsets()[uid], offset);
        assert_eq!(payload.counts()[uid], leaf.bodies.len());
        assert_eq!(payload.leaf(uid).unwrap(), leaf.bodies.as_slice());
        offset += leaf.bodies.len();
    }
    assert!(payload.leaf(payload.num_leaves()).is_none());
}

// ==================================================================================
// Barnes-Hut traversal tests
// ==================================================================================

#[test]
fn batched_matches_exact_baseline() {
    let index = reference_index();
    let queries = uniform(100, 1000.0, 2);

    let batched = run_blocked(&index, &queries, &test_config(0.2), Gravity::default()).unwrap();
    let exact = run_blocked(
        &index,
        &queries,
        &RunConfig {
            cpu: true,
            ..test_config(0.2)
        },
        Gravity::default(),
    )
    .unwrap();

    assert_eq!(batched.results.len(), 100);
    for (b, e) in batched.results.iter().zip(&exact.results) {
        assert!(b.iter().all(|c| c.is_finite()), "non-finite result {:?}", b);
        assert!(rel_err(b, e) < 1e-4, "batched {:?} vs exact {:?}", b, e);
    }
}

#[test]
fn infinite_theta_resolves_at_root() {
    let index = reference_index();
    let queries = uniform(100, 1000.0, 2);
    let gravity = Gravity::default();

    let report = run_blocked(&index, &queries, &test_config(f64::INFINITY), gravity).unwrap();

    let root = index.tree().node(index.tree().root());
    for (q, acc) in queries.iter().zip(&report.results) {
        let expected = gravity.pair(&q.position(), &root.aggregate.com, root.aggregate.mass);
        assert!(rel_err(acc, &expected) < 1e-12);
    }
    let branch: usize = report.workers.iter().map(|w| w.traversal.branch_items).sum();
    let leaf: usize = report.workers.iter().map(|w| w.traversal.leaf_items).sum();
    assert_eq!(branch, 100);
    assert_eq!(leaf, 0);
}

#[test]
fn zero_theta_never_approximates() {
    let index = reference_index();
    let queries = uniform(20, 1000.0, 9);

    let report = run_blocked(&index, &queries, &test_config(0.0), Gravity::default()).unwrap();
    let branch: usize = report.workers.iter().map(|w| w.traversal.branch_items).sum();
    assert_eq!(branch, 0);
}

#[test]
fn block_size_only_changes_grouping() {
    let index = reference_index();
    let queries = uniform(100, 1000.0, 2);

    let one = run_blocked(
        &index,
        &queries,
        &RunConfig {
            block_size: 1,
            ..test_config(0.2)
        },
        Gravity::default(),
    )
    .unwrap();
    let many = run_blocked(&index, &queries, &test_config(0.2), Gravity::default()).unwrap();

    for (a, b) in one.results.iter().zip(&many.results) {
        assert!(rel_err(a, b) < 1e-10);
    }
    let items = |r: &canopy::RunReport<NVec3>| -> (usize, usize) {
        let w = &r.workers[0].traversal;
        (w.leaf_items, w.branch_items)
    };
    assert_eq!(items(&one), items(&many));
    assert_eq!(one.total_passes(), 100);
    assert_eq!(many.total_passes(), 2);
}

#[test]
fn repeated_runs_are_identical() {
    let queries = uniform(100, 1000.0, 2);
    let first = run_blocked(&reference_index(), &queries, &test_config(0.2), Gravity::default()).unwrap();
    let second = run_blocked(&reference_index(), &queries, &test_config(0.2), Gravity::default()).unwrap();
    assert_eq!(first.results, second.results);
}

#[test]
fn threaded_backend_matches_inline() {
    let index = reference_index();
    let queries = uniform(100, 1000.0, 2);

    let inline = RunConfig {
        backend: BackendKind::Inline,
        ..test_config(0.2)
    };
    let threaded = RunConfig {
        backend: BackendKind::Threaded,
        ..test_config(0.2)
    };

    let a = run_blocked(&index, &queries, &inline, Gravity::default()).unwrap();
    let b = run_blocked(&index, &queries, &threaded, Gravity::default()).unwrap();
    assert_eq!(a.results, b.results);
}

#[test]
fn worker_count_does_not_change_results() {
    let index = reference_index();
    let queries = uniform(100, 1000.0, 2);

    let single = run_blocked(&index, &queries, &test_config(0.2), Gravity::default()).unwrap();
    let multi = run_blocked(
        &index,
        &queries,
        &RunConfig {
            num_threads: 4,
            ..test_config(0.2)
        },
        Gravity::default(),
    )
    .unwrap();

    assert_eq!(multi.workers.len(), 4);
    for (a, b) in single.results.iter().zip(&multi.results) {
        assert!(rel_err(a, b) < 1e-10);
    }
}

#[test]
fn every_pushed_item_is_folded() {
    let index = reference_index();
    let queries = uniform(100, 1000.0, 2);
    let config = RunConfig {
        batch_size: 7,
        num_threads: 3,
        ..test_config(0.2)
    };

    let report = run_blocked(&index, &queries, &config, Gravity::default()).unwrap();
    for w in &report.workers {
        let pushed = w.dispatch.leaf_items + w.dispatch.branch_items;
        assert_eq!(pushed, w.traversal.leaf_items + w.traversal.branch_items);
        assert_eq!(w.folded_items, pushed);
        assert_eq!(w.dispatch.batches_submitted, w.dispatch.batches_synced);
        assert_eq!(w.dispatch.batches_submitted, pushed.div_ceil(7));
    }
}

#[test]
fn empty_dataset_gives_zero_results() {
    let index = SpatialIndex::<NVec4>::build(&[], OctreeParams::new(8, 20)).unwrap();
    let queries = uniform(10, 1.0, 11);

    let report = run_blocked(&index, &queries, &test_config(0.2), Gravity::default()).unwrap();
    assert_eq!(report.results, vec![NVec3::zeros(); 10]);
}

// ==================================================================================
// k-NN tests
// ==================================================================================

fn brute_force_knn(points: &[NVec4], q: &NVec4, k: usize) -> Vec<f64> {
    let mut d: Vec<f64> = points.iter().map(|p| (p.position() - q.position()).norm()).collect();
    d.sort_by(|a, b| a.partial_cmp(b).unwrap());
    d.truncate(k);
    d
}

#[test]
fn knn_matches_brute_force() {
    let points = uniform(2000, 100.0, 12);
    let index = SpatialIndex::build(&points, cube_params(16, 100.0)).unwrap();
    let queries = uniform(60, 100.0, 13);

    for backend in [BackendKind::Inline, BackendKind::Threaded] {
        let config = RunConfig {
            backend,
            num_threads: 2,
            batch_size: 32,
            block_size: 8,
            ..test_config(0.0)
        };
        let report = run_knn(&index, &queries, &config, 5).unwrap();

        for (q, set) in queries.iter().zip(&report.results) {
            assert_eq!(set.distances(), brute_force_knn(&points, q, 5).as_slice());
        }
    }
}

#[test]
fn knn_cpu_baseline_matches_batched() {
    let points = uniform(1500, 100.0, 16);
    let index = SpatialIndex::build(&points, cube_params(16, 100.0)).unwrap();
    let queries = uniform(50, 100.0, 17);

    let batched = run_knn(&index, &queries, &test_config(0.0), 6).unwrap();
    let cpu_config = RunConfig {
        cpu: true,
        ..test_config(0.0)
    };
    let cpu = run_knn(&index, &queries, &cpu_config, 6).unwrap();

    assert_eq!(cpu.total_batches(), 0);
    assert_eq!(cpu.results.len(), queries.len());
    for ((q, a), b) in queries.iter().zip(&cpu.results).zip(&batched.results) {
        assert_eq!(a.distances(), b.distances());
        assert_eq!(a.distances(), brute_force_knn(&points, q, 6).as_slice());
    }
    let leaves: usize = cpu.workers.iter().map(|w| w.traversal.leaf_items).sum();
    assert!(leaves > 0);
    assert!(leaves < queries.len() * index.tree().stats().num_leaf_nodes);
}

#[test]
fn knn_with_fewer_points_than_k() {
    let points = uniform(3, 1.0, 14);
    let index = SpatialIndex::build(&points, OctreeParams::new(1, 20)).unwrap();
    let queries = uniform(4, 1.0, 15);

    let report = run_knn(&index, &queries, &test_config(0.0), 8).unwrap();
    for set in &report.results {
        assert_eq!(set.distances().len(), 3);
        assert_eq!(set.bound(), f64::INFINITY);
    }
}

// ==================================================================================
// Dispatcher tests
// ==================================================================================

/// Inline execution that records every batch it is handed
struct RecordingBackend {
    payload: Arc<LeafPayloadTable<NVec4>>,
    sizes: Vec<usize>,
    done: Vec<Option<Completed<NVec4, NVec3>>>,
    fail_on_submit: bool,
}

impl RecordingBackend {
    fn new(fail_on_submit: bool) -> Self {
        Self {
            payload: Arc::new(LeafPayloadTable::from_leaves(0, std::iter::empty::<&[NVec4]>())),
            sizes: Vec::new(),
            done: vec![None, None],
            fail_on_submit,
        }
    }
}

impl ComputeBackend<NVec4> for RecordingBackend {
    type Output = NVec3;

    fn submit_batch(&mut self, batch: Batch<NVec4>) -> Result<(), BackendError> {
        if self.fail_on_submit {
            return Err(BackendError::Disconnected(batch.slot));
        }
        self.sizes.push(batch.items.len());
        let partials = execute_batch(&Gravity::default(), &self.payload, batch.slot, &batch.items)?;
        self.done[batch.slot] = Some(Completed {
            slot: batch.slot,
            sequence: batch.sequence,
            items: batch.items,
            partials,
        });
        Ok(())
    }

    fn synchronize(&mut self, slot: SlotId) -> Result<Option<Completed<NVec4, NVec3>>, BackendError> {
        Ok(self.done[slot].take())
    }
}

type Dispatcher = BatchDispatcher<NVec4, Gravity, RecordingBackend>;

fn far_aggregate() -> Aggregate {
    Aggregate {
        com: NVec3::new(10.0, 0.0, 0.0),
        mass: 1.0,
    }
}

#[test]
fn dispatcher_fires_exactly_at_batch_size() {
    let results = ResultStore::new(0..4, NVec3::zeros());
    let mut dispatcher: Dispatcher = BatchDispatcher::new(Arc::new(Gravity::default()), RecordingBackend::new(false), 8, results);
    let aggregate = far_aggregate();

    for i in 0..19 {
        let q = Query::new(i % 4, NVec4::new(0.0, 0.0, 0.0, 1.0));
        dispatcher.push_branch(&q, &aggregate).unwrap();
        let expected = (i + 1) / 8;
        assert_eq!(dispatcher.stats().batches_submitted, expected, "after {} pushes", i + 1);
    }

    let (results, stats) = dispatcher.finish().unwrap();
    assert_eq!(stats.batches_submitted, 3);
    assert_eq!(stats.batches_synced, 3);

    let counts: Vec<usize> = results.ids().map(|id| results.folded(id)).collect();
    assert_eq!(counts, vec![5, 5, 5, 4]);

    let single = Gravity::default().pair(&NVec3::zeros(), &aggregate.com, aggregate.mass);
    assert!(rel_err(results.get(0), &(single * 5.0)) < 1e-12);
}

#[test]
fn dispatcher_alternates_slots() {
    let results = ResultStore::new(0..1, NVec3::zeros());
    let mut dispatcher: Dispatcher = BatchDispatcher::new(Arc::new(Gravity::default()), RecordingBackend::new(false), 2, results);
    let q = Query::new(0, NVec4::new(0.0, 0.0, 0.0, 1.0));

    assert_eq!(dispatcher.collecting_slot(), 0);
    dispatcher.push_branch(&q, &far_aggregate()).unwrap();
    dispatcher.push_branch(&q, &far_aggregate()).unwrap();
    assert_eq!(dispatcher.collecting_slot(), 1);
    dispatcher.push_branch(&q, &far_aggregate()).unwrap();
    dispatcher.push_branch(&q, &far_aggregate()).unwrap();
    assert_eq!(dispatcher.collecting_slot(), 0);
    assert_eq!(dispatcher.stats().batches_synced, 1);
}

#[test]
fn dispatcher_reports_failed_batch() {
    let results = ResultStore::new(0..3, NVec3::zeros());
    let mut dispatcher: Dispatcher = BatchDispatcher::new(Arc::new(Gravity::default()), RecordingBackend::new(true), 4, results);
    let aggregate = far_aggregate();

    let mut outcome = Ok(());
    for i in 0..4 {
        outcome = dispatcher.push_branch(&Query::new(i % 3, NVec4::zeros()), &aggregate);
    }

    match outcome {
        Err(DispatchError::Backend {
            slot,
            sequence,
            items,
            first_query,
            last_query,
            ..
        }) => {
            assert_eq!((slot, sequence, items), (0, 0, 4));
            assert_eq!(first_query, Some(0));
            assert_eq!(last_query, Some(0));
        }
        other => panic!("expected backend error, got {:?}", other),
    }
}

// ==================================================================================
// Engine & configuration tests
// ==================================================================================

#[test]
fn partition_covers_all_queries() {
    let ranges = partition(10, 3);
    assert_eq!(ranges, vec![0..4, 4..7, 7..10]);
    assert_eq!(partition(2, 4), vec![0..1, 1..2, 2..2, 2..2]);
}

#[test]
fn config_rejects_bad_values() {
    let zero_batch = RunConfig {
        batch_size: 0,
        ..RunConfig::default()
    };
    assert_eq!(zero_batch.validate(), Err(ConfigError::NonPositive { name: "batch_size" }));

    let bad_theta = RunConfig {
        theta: -1.0,
        ..RunConfig::default()
    };
    assert_eq!(bad_theta.validate(), Err(ConfigError::InvalidTheta(-1.0)));

    let index = reference_index();
    let err = run_blocked(&index, &uniform(4, 1.0, 1), &zero_batch, Gravity::default()).unwrap_err();
    assert!(matches!(err, EngineError::Config(ConfigError::NonPositive { name: "batch_size" })));
}

const KNN_YAML: &str = r#"
engine:
  algorithm: "knn"
  backend: "inline"
  k: 3

parameters:
  num_threads: 2
  max_leaf_size: 8
  batch_size: 64
  block_size: 16
  num_queries: 25
  seed: 5

dataset:
  uniform:
    count: 500
    extent: 10.0
"#;

#[test]
fn scenario_from_yaml_runs() {
    let cfg = ScenarioConfig::from_yaml(KNN_YAML).unwrap();
    let scenario = Scenario::build_scenario(&cfg).unwrap();
    assert_eq!(scenario.points.len(), 500);
    assert_eq!(scenario.queries.len(), 25);

    let (summary, stats) = scenario.run().unwrap();
    assert_eq!(stats.num_points, 500);
    match summary {
        RunSummary::Knn(report) => {
            assert_eq!(report.results.len(), 25);
            for (q, set) in scenario.queries.iter().zip(&report.results) {
                assert_eq!(set.distances(), brute_force_knn(&scenario.points, q, 3).as_slice());
            }
        }
        RunSummary::BarnesHut(_) => panic!("expected a knn run"),
    }
}

#[test]
fn scenario_without_dataset_is_rejected() {
    let yaml = KNN_YAML.split("dataset:").next().unwrap();
    let cfg = ScenarioConfig::from_yaml(yaml).unwrap();
    assert!(matches!(
        Scenario::build_scenario(&cfg),
        Err(EngineError::Config(ConfigError::MissingDataset))
    ));
}

#[test]
fn scenario_with_zero_queries_is_rejected() {
    let yaml = KNN_YAML.replace("num_queries: 25", "num_queries: 0");
    let cfg = ScenarioConfig::from_yaml(&yaml).unwrap();
    assert!(matches!(
        Scenario::build_scenario(&cfg),
        Err(EngineError::Config(ConfigError::NonPositive { name: "num_queries" }))
    ));
}

#[test]
fn runner_sizes_results_from_query_slice() {
    let index = reference_index();
    for n in [0, 1, 37] {
        let queries = uniform(n, 1000.0, 21);
        let report = run_blocked(&index, &queries, &test_config(0.2), Gravity::default()).unwrap();
        assert_eq!(report.results.len(), n);
        let covered: usize = report.workers.iter().map(|w| w.queries.len()).sum();
        assert_eq!(covered, n);
    }
}

#[test]
fn scenario_with_zero_k_is_rejected() {
    let yaml = KNN_YAML.replace("k: 3", "k: 0");
    let cfg = ScenarioConfig::from_yaml(&yaml).unwrap();
    assert!(matches!(
        Scenario::build_scenario(&cfg),
        Err(EngineError::Config(ConfigError::NonPositive { name: "k" }))
    ));
}
