//! Runtime run settings.
//!
//! `RunConfig` is what the engine actually consumes: algorithm, backend,
//! tree and batching sizes, worker count and kernel constants. It is
//! validated as a whole before any tree is built. The number of queries is
//! not part of it; runners size everything from the query slice they get.

use crate::configuration::config::{AlgorithmConfig, BackendConfig, ScenarioConfig};
use crate::error::ConfigError;
use crate::kernels::Gravity;
use crate::spatial::octree::OctreeParams;
use crate::traversal::admission::ThetaPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    BarnesHut,
    Knn { k: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Inline,
    Threaded,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub algorithm: Algorithm,
    pub backend: BackendKind,
    pub cpu: bool,            // exact per-query baseline, no dispatch
    pub theta: f64,
    pub num_threads: usize,
    pub max_leaf_size: usize,
    pub max_depth: usize,
    pub batch_size: usize,    // work items per buffer
    pub block_size: usize,    // queries per traversal pass
    pub seed: u64,
    pub gravity: Gravity,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::BarnesHut,
            backend: BackendKind::Threaded,
            cpu: false,
            theta: 0.2,
            num_threads: 1,
            max_leaf_size: 32,
            max_depth: 20,
            batch_size: 1024,
            block_size: 64,
            seed: 0,
            gravity: Gravity::default(),
        }
    }
}

impl RunConfig {
    /// Map a parsed scenario onto runtime settings (not yet validated).
    pub fn from_scenario(cfg: &ScenarioConfig) -> Self {
        let p = &cfg.parameters;
        let algorithm = match cfg.engine.algorithm {
            AlgorithmConfig::BarnesHut => Algorithm::BarnesHut,
            AlgorithmConfig::Knn => Algorithm::Knn {
                k: cfg.engine.k.unwrap_or(1),
            },
        };
        let backend = match cfg.engine.backend {
            BackendConfig::Inline => BackendKind::Inline,
            BackendConfig::Threaded => BackendKind::Threaded,
        };

        Self {
            algorithm,
            backend,
            cpu: cfg.engine.cpu,
            theta: cfg.engine.theta,
            num_threads: p.num_threads,
            max_leaf_size: p.max_leaf_size,
            max_depth: p.max_depth,
            batch_size: p.batch_size,
            block_size: p.block_size,
            seed: p.seed,
            gravity: Gravity {
                G: p.G,
                eps2: p.eps2,
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("num_threads", self.num_threads),
            ("max_leaf_size", self.max_leaf_size),
            ("max_depth", self.max_depth),
            ("batch_size", self.batch_size),
            ("block_size", self.block_size),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::NonPositive { name });
            }
        }
        if let Algorithm::Knn { k: 0 } = self.algorithm {
            return Err(ConfigError::NonPositive { name: "k" });
        }
        if self.gravity.eps2.is_nan() || self.gravity.eps2 < 0.0 {
            return Err(ConfigError::InvalidSoftening(self.gravity.eps2));
        }
        self.octree_params().validate()?;
        ThetaPolicy::new(self.theta)?;
        Ok(())
    }

    pub fn policy(&self) -> Result<ThetaPolicy, ConfigError> {
        ThetaPolicy::new(self.theta)
    }

    pub fn octree_params(&self) -> OctreeParams {
        OctreeParams::new(self.max_leaf_size, self.max_depth)
    }
}
