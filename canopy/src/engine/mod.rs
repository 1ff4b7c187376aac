pub mod dataset;
pub mod params;
pub mod runner;
pub mod scenario;
