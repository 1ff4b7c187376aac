//! Numeric reductions executed behind a compute backend.
//!
//! A kernel turns "query + leaf points" or "query + aggregate" into a
//! contribution and knows how to fold contributions together. Traversal and
//! dispatch code never look inside a kernel's output.

pub mod gravity;
pub mod knn;

use crate::spatial::states::{Aggregate, SpatialPoint};

pub trait Kernel<P: SpatialPoint>: Send + Sync + 'static {
    type Output: Clone + Send + std::fmt::Debug + 'static;

    /// Value of a query that has received no contributions.
    fn identity(&self) -> Self::Output;

    /// Exact reduction of every point in one leaf.
    fn reduce_leaf(&self, query: &P, leaf: &[P], acc: &mut Self::Output);

    /// Approximate reduction against a subtree's aggregate.
    fn reduce_branch(&self, query: &P, aggregate: &Aggregate, acc: &mut Self::Output);

    /// Fold a partial result computed elsewhere into `acc`.
    fn combine(&self, acc: &mut Self::Output, partial: Self::Output);
}

pub use gravity::Gravity;
pub use knn::{Knn, KnnSet};
