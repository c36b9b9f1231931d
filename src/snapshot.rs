//! A `Snapshot` bundles every store in a placement and the allocator used
//! to mint ids for regions split by the single-dimension balancer (the
//! `DomRegions`-based balancers carry their own allocator internally).

use crate::model::{mean_of, IdAllocator, StoreInfo};

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub dims: usize,
    pub stores: Vec<StoreInfo>,
}

impl Snapshot {
    pub fn new(dims: usize, stores: Vec<StoreInfo>) -> Self {
        Snapshot { dims, stores }
    }

    pub fn mean(&self, dim: usize) -> f64 {
        mean_of(&self.stores, dim)
    }

    pub fn means(&self) -> Vec<f64> {
        (0..self.dims).map(|d| self.mean(d)).collect()
    }

    pub fn max_mean_ratio(&self, dim: usize) -> f64 {
        let mean = self.mean(dim);
        self.stores
            .iter()
            .map(|s| s.act_vals_sum[dim])
            .fold(f64::NEG_INFINITY, f64::max)
            / mean
    }

    pub fn min_mean_ratio(&self, dim: usize) -> f64 {
        let mean = self.mean(dim);
        self.stores
            .iter()
            .map(|s| s.act_vals_sum[dim])
            .fold(f64::INFINITY, f64::min)
            / mean
    }

    pub fn max_mean_ratios(&self) -> Vec<f64> {
        (0..self.dims).map(|d| self.max_mean_ratio(d)).collect()
    }

    pub fn min_mean_ratios(&self) -> Vec<f64> {
        (0..self.dims).map(|d| self.min_mean_ratio(d)).collect()
    }

    pub fn region_count(&self) -> usize {
        self.stores.iter().map(|s| s.regions.len()).sum()
    }

    /// An id allocator seeded above every id currently present, for solvers
    /// (the single-dimension balancer) that mint split-child ids from a
    /// per-snapshot counter rather than the `DomRegions` high-offset scheme.
    pub fn fresh_id_allocator(&self) -> IdAllocator {
        let ids = self.stores.iter().flat_map(|s| s.regions.keys());
        IdAllocator::above_max(ids, 1)
    }

    pub fn store_index(&self, id: &str) -> Option<usize> {
        self.stores.iter().position(|s| s.id == id)
    }
}
