//! Configuration types for loading run scenarios from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! run. A scenario consists of:
//!
//! - [`EngineConfig`]     – algorithm, backend and approximation options
//! - [`ParametersConfig`] – worker, tree, batching and physical parameters
//! - [`DatasetConfig`]    – where the points come from
//! - [`ScenarioConfig`]   – top-level wrapper used to load a scenario from YAML
//!
//! # YAML format
//!
//! ```yaml
//! engine:
//!   algorithm: "barnes_hut"   # or "knn"
//!   backend: "threaded"       # or "inline"
//!   cpu: false                # true -> exact per-query CPU baseline
//!   theta: 0.2
//!   k: 8                      # knn only
//!
//! parameters:
//!   num_threads: 4
//!   max_leaf_size: 32
//!   max_depth: 20
//!   batch_size: 2048
//!   block_size: 64
//!   num_queries: 100000
//!   seed: 42
//!   G: 1.0
//!   eps2: 1.0e-9
//!
//! dataset:
//!   uniform:
//!     count: 1000000
//!     extent: 1000.0
//!   # or: file: "data/1m_uniform.dat"
//! ```
//!
//! The engine maps this into its runtime [`crate::engine::params::RunConfig`]
//! and rejects bad values before building anything.

use std::path::PathBuf;

use serde::Deserialize;

/// Which tree algorithm runs.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmConfig {
    #[serde(rename = "barnes_hut")] // theta-approximated gravity
    BarnesHut,

    #[serde(rename = "knn")] // exact k nearest neighbor distances
    Knn,
}

/// Where batches are executed.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendConfig {
    #[serde(rename = "inline")] // run at submit, on the worker thread
    Inline,

    #[default]
    #[serde(rename = "threaded")] // one executor thread per buffer slot
    Threaded,
}

#[derive(Deserialize, Debug, Clone)]
pub struct EngineConfig {
    pub algorithm: AlgorithmConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub cpu: bool, // exact CPU baseline instead of batched dispatch
    #[serde(default = "default_theta")]
    pub theta: f64,
    pub k: Option<usize>, // neighbors per query, knn only
}

#[allow(non_snake_case)]
#[derive(Deserialize, Debug, Clone)]
pub struct ParametersConfig {
    pub num_threads: usize,
    pub max_leaf_size: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    pub batch_size: usize,
    pub block_size: usize,
    pub num_queries: usize,
    #[serde(default)]
    pub seed: u64, // deterministic seed for generated data and queries
    #[serde(default = "default_g")]
    pub G: f64,
    #[serde(default = "default_eps2")]
    pub eps2: f64,
}

/// Uniform random points in `[0, extent)` on every component.
#[derive(Deserialize, Debug, Clone)]
pub struct UniformConfig {
    pub count: usize,
    pub extent: f64,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct DatasetConfig {
    pub file: Option<PathBuf>, // raw little-endian f32 x4 records
    pub uniform: Option<UniformConfig>,
}

/// Top-level scenario configuration loaded from YAML.
#[derive(Deserialize, Debug, Clone)]
pub struct ScenarioConfig {
    pub engine: EngineConfig,
    pub parameters: ParametersConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
}

impl ScenarioConfig {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }
}

fn default_theta() -> f64 {
    0.2
}

fn default_max_depth() -> usize {
    20
}

fn default_g() -> f64 {
    1.0
}

fn default_eps2() -> f64 {
    crate::kernels::gravity::DEFAULT_EPS2
}
