use crate::api::{Variable, WorkPool};
use crate::cache::QueryCache;

use super::binder::QueryBinder;

/// The process-wide query state: one binder plus a cache per result type.
///
/// Every list view of an endpoint shares these caches, and counts of all
/// endpoints share one cache since their keys start with the endpoint name.
#[derive(Clone)]
pub struct QueryClient {
  binder: QueryBinder,
  counts: QueryCache<u64>,
  variables: QueryCache<Vec<Variable>>,
  work_pools: QueryCache<Vec<WorkPool>>,
}

impl QueryClient {
  pub fn new(binder: QueryBinder) -> Self {
    Self {
      binder,
      counts: QueryCache::new(),
      variables: QueryCache::new(),
      work_pools: QueryCache::new(),
    }
  }

  pub fn binder(&self) -> &QueryBinder {
    &self.binder
  }

  pub fn counts(&self) -> &QueryCache<u64> {
    &self.counts
  }

  pub fn variables(&self) -> &QueryCache<Vec<Variable>> {
    &self.variables
  }

  pub fn work_pools(&self) -> &QueryCache<Vec<WorkPool>> {
    &self.work_pools
  }
}
