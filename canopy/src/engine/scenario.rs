//! Build fully-initialized runs from configuration
//!
//! Takes a `ScenarioConfig` (YAML-facing) and produces a runtime bundle
//! containing:
//! - run settings (`RunConfig`, validated)
//! - the dataset the octree is built over
//! - the query points, one result slot each
//! - the root bounds for the tree, when the dataset has a known domain
//!
//! [`Scenario::run`] then builds the spatial index and hands everything to
//! the worker pool.

use rand::rngs::StdRng;
use rand::SeedableRng;

use log::info;

use crate::configuration::config::ScenarioConfig;
use crate::engine::dataset::{load_points, uniform_points};
use crate::engine::params::{Algorithm, RunConfig};
use crate::engine::runner::{run_blocked, run_knn, RunReport};
use crate::error::{ConfigError, EngineError};
use crate::kernels::KnnSet;
use crate::spatial::index::SpatialIndex;
use crate::spatial::octree::TreeStats;
use crate::spatial::states::{BoundingBox, NVec3, NVec4};

/// Results of a finished run, by algorithm.
#[derive(Debug, Clone)]
pub enum RunSummary {
    BarnesHut(RunReport<NVec3>),
    Knn(RunReport<KnnSet>),
}

impl RunSummary {
    pub fn len(&self) -> usize {
        match self {
            RunSummary::BarnesHut(r) => r.results.len(),
            RunSummary::Knn(r) => r.results.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn elapsed(&self) -> std::time::Duration {
        match self {
            RunSummary::BarnesHut(r) => r.elapsed,
            RunSummary::Knn(r) => r.elapsed,
        }
    }
}

/// A fully-initialized run
///
/// This is the main "runtime bundle" constructed from a [`ScenarioConfig`]:
/// validated settings, the points to index and the points to query
pub struct Scenario {
    pub config: RunConfig,
    pub points: Vec<NVec4>,
    pub queries: Vec<NVec4>,
    pub bounds: Option<BoundingBox>,
}

impl Scenario {
    pub fn build_scenario(cfg: &ScenarioConfig) -> Result<Self, EngineError> {
        let config = RunConfig::from_scenario(cfg);
        config.validate()?;
        let num_queries = cfg.parameters.num_queries;
        if num_queries == 0 {
            return Err(ConfigError::NonPositive { name: "num_queries" }.into());
        }

        let mut rng = StdRng::seed_from_u64(config.seed);

        // Dataset: a file wins over a generated set
        let (points, bounds, extent) = match (&cfg.dataset.file, &cfg.dataset.uniform) {
            (Some(path), _) => {
                let points = load_points(path)?;
                let bbox = BoundingBox::enclosing_cube(&points);
                (points, None, bbox)
            }
            (None, Some(uniform)) => {
                let points = uniform_points(uniform.count, uniform.extent, &mut rng);
                let bbox = BoundingBox::from_min_max(NVec3::zeros(), NVec3::repeat(uniform.extent));
                (points, Some(bbox), bbox)
            }
            (None, None) => return Err(ConfigError::MissingDataset.into()),
        };

        // Queries are drawn over the same region as the data
        let lo = extent.min();
        let width = extent.extent();
        let queries = uniform_points(num_queries, 1.0, &mut rng)
            .into_iter()
            .map(|u| {
                let x = lo + u.xyz() * width;
                NVec4::new(x.x, x.y, x.z, u.w)
            })
            .collect();

        info!(
            "scenario: {} points, {} queries, {:?}",
            points.len(),
            num_queries,
            config.algorithm
        );

        Ok(Self {
            config,
            points,
            queries,
            bounds,
        })
    }

    pub fn build_index(&self) -> Result<SpatialIndex<NVec4>, ConfigError> {
        let mut params = self.config.octree_params();
        if let Some(bounds) = self.bounds {
            params = params.with_bounds(bounds);
        }
        SpatialIndex::build(&self.points, params)
    }

    pub fn run(&self) -> Result<(RunSummary, TreeStats), EngineError> {
        let index = self.build_index()?;
        let stats = index.stats();
        info!(
            "octree: {} nodes, {} leaves, depth {}",
            stats.num_nodes, stats.num_leaf_nodes, stats.max_depth
        );

        let summary = match self.config.algorithm {
            Algorithm::BarnesHut => {
                RunSummary::BarnesHut(run_blocked(&index, &self.queries, &self.config, self.config.gravity)?)
            }
            Algorithm::Knn { k } => RunSummary::Knn(run_knn(&index, &self.queries, &self.config, k)?),
        };
        Ok((summary, stats))
    }
}
