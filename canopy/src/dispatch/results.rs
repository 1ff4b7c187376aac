//! Per-query result slots.
//!
//! A store covers a contiguous range of query ids owned by one worker.
//! Completed batches fold their partials in; reads only make sense for a
//! query once the batches carrying its work have been synchronized.

use std::ops::Range;

use crate::dispatch::backend::Partial;
use crate::spatial::states::QueryId;

#[derive(Debug, Clone)]
pub struct ResultStore<R> {
    base: QueryId,
    values: Vec<R>,
    folded: Vec<usize>, // work items folded into each slot
}

impl<R: Clone> ResultStore<R> {
    /// Slots for `ids`, each starting at `identity`.
    pub fn new(ids: Range<QueryId>, identity: R) -> Self {
        let len = ids.len();
        Self {
            base: ids.start,
            values: vec![identity; len],
            folded: vec![0; len],
        }
    }
}

impl<R> ResultStore<R> {
    pub fn ids(&self) -> Range<QueryId> {
        self.base..self.base + self.values.len()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn index(&self, query: QueryId) -> usize {
        debug_assert!(
            self.ids().contains(&query),
            "query {query} outside {:?}",
            self.ids()
        );
        query - self.base
    }

    pub fn get(&self, query: QueryId) -> &R {
        &self.values[self.index(query)]
    }

    /// Work items folded into `query` so far.
    pub fn folded(&self, query: QueryId) -> usize {
        self.folded[self.index(query)]
    }

    /// Fold one partial in using `combine`.
    pub fn apply<F>(&mut self, partial: Partial<R>, combine: F)
    where
        F: FnOnce(&mut R, R),
    {
        let idx = self.index(partial.query);
        combine(&mut self.values[idx], partial.value);
        self.folded[idx] += partial.items;
    }

    /// Overwrite a slot, used by the inline CPU path.
    pub fn set(&mut self, query: QueryId, value: R, items: usize) {
        let idx = self.index(query);
        self.values[idx] = value;
        self.folded[idx] += items;
    }

    pub fn values(&self) -> &[R] {
        &self.values
    }

    pub fn into_values(self) -> Vec<R> {
        self.values
    }
}
