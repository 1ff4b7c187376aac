pub mod states;
pub mod octree;
pub mod payload;
pub mod index;
