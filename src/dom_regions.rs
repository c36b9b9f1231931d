//! Transient holding area for regions detached from their store while the
//! dominance-split balancer (`greedy` / `greedySplit`) works out where they
//! belong. See SPEC_FULL.md §4.2.

use rustc_hash::FxHashMap;

use crate::model::{IdAllocator, RegionId, RegionInfo, StoreId};
use crate::plan::{Plan, PlanEntry};

const SPLIT_ID_OFFSET: u64 = 100_000_000;

pub struct DomRegions {
    buckets: [FxHashMap<StoreId, Vec<RegionInfo>>; 2],
    count: [usize; 2],
    /// Shadow of every region ever pushed, keyed by id. Kept in sync with
    /// `dst_sid` on every `pop` so that a region's *final* destination is
    /// recorded here even while it is still sitting unresolved in a bucket.
    migrated: FxHashMap<RegionId, RegionInfo>,
    id_alloc: IdAllocator,
}

impl DomRegions {
    pub fn new() -> Self {
        DomRegions {
            buckets: [FxHashMap::default(), FxHashMap::default()],
            count: [0, 0],
            migrated: FxHashMap::default(),
            id_alloc: IdAllocator::starting_at(SPLIT_ID_OFFSET),
        }
    }

    pub fn push(&mut self, which: usize, region: RegionInfo) {
        self.migrated.insert(region.id.clone(), region.clone());
        self.buckets[which]
            .entry(region.src_sid.clone())
            .or_default()
            .push(region);
        self.count[which] += 1;
    }

    pub fn empty(&self, which: usize) -> bool {
        self.count[which] == 0
    }

    pub fn count(&self, which: usize) -> usize {
        self.count[which]
    }

    /// Pop a region bound for `candidate_sid`. Prefers a region originally
    /// from `candidate_sid` itself; otherwise picks the lowest store id for
    /// determinism. When `ratio_bases` is given and the popped region's
    /// load exceeds `ratio * bases[which]`, only a split-off fraction is
    /// returned and the residual is pushed back into the bucket.
    pub fn pop(
        &mut self,
        which: usize,
        candidate_sid: &str,
        ratio_bases: Option<(f64, &[f64])>,
    ) -> Option<RegionInfo> {
        let sid = if self.buckets[which].contains_key(candidate_sid) {
            candidate_sid.to_string()
        } else {
            let mut keys: Vec<&StoreId> = self.buckets[which].keys().collect();
            keys.sort();
            keys.into_iter().next()?.clone()
        };

        let bucket = self.buckets[which].get_mut(&sid)?;
        let mut region = bucket.pop()?;
        region.dst_sid = candidate_sid.to_string();
        if let Some(shadow) = self.migrated.get_mut(&region.id) {
            shadow.dst_sid = region.dst_sid.clone();
        }

        let result = match ratio_bases {
            None => {
                self.count[which] -= 1;
                region
            }
            Some((ratio, bases)) if region.vals[which] / bases[which] <= ratio => {
                self.count[which] -= 1;
                region
            }
            Some((ratio, bases)) => {
                let split_ratio = bases[which] * ratio / region.vals[which];
                let split_vals: Vec<f64> = region.vals.iter().map(|v| v * split_ratio).collect();
                let mut child = RegionInfo::new(self.id_alloc.next_id(), split_vals.clone(), region.src_sid.clone());
                child.dst_sid = region.dst_sid.clone();
                child.parent_id = Some(region.id.clone());

                for i in 0..region.vals.len() {
                    region.vals[i] -= split_vals[i];
                }
                debug_assert!(region.vals.iter().all(|v| *v >= -1e-9));

                self.buckets[which]
                    .entry(sid.clone())
                    .or_default()
                    .push(region);
                child
            }
        };

        if self.buckets[which].get(&sid).map_or(false, |b| b.is_empty()) {
            self.buckets[which].remove(&sid);
        }
        Some(result)
    }

    /// Compute the portion that, removed from `region`, equalizes the
    /// store's two normalized dimensions, without materializing it.
    /// Returns the projected normalized loads `[vals[0]/bases[0], vals[1]/bases[1]]`
    /// of that portion. Assumes `D == 2`.
    pub fn project_split_with_val(region: &RegionInfo, higher: usize, bases: &[f64], diff: f64) -> Vec<f64> {
        let lower = 1 - higher;
        let val_upper = region.vals[higher] / bases[higher];
        let val_lower = region.vals[lower] / bases[lower];
        let x = diff / (val_upper - val_lower);
        region
            .vals
            .iter()
            .zip(bases.iter())
            .map(|(v, b)| (v * x) / b)
            .collect()
    }

    /// Materialize the sibling described by [`DomRegions::project_split_with_val`],
    /// leaving it attached to `region.src_sid` (`dst_sid == src_sid`).
    pub fn split_region_with_val(&mut self, region: &mut RegionInfo, higher: usize, bases: &[f64], diff: f64) -> RegionInfo {
        let lower = 1 - higher;
        let val_upper = region.vals[higher] / bases[higher];
        let val_lower = region.vals[lower] / bases[lower];
        let x = diff / (val_upper - val_lower);
        let split_vals: Vec<f64> = region.vals.iter().map(|v| v * x).collect();

        let mut sibling = RegionInfo::new(self.id_alloc.next_id(), split_vals.clone(), region.src_sid.clone());
        sibling.parent_id = Some(region.id.clone());

        for i in 0..region.vals.len() {
            region.vals[i] -= split_vals[i];
        }
        debug_assert!(region.vals.iter().all(|v| *v >= -1e-9));
        sibling
    }

    /// Every region ever pushed whose `src_sid != dst_sid`.
    pub fn build_solution(&self) -> Plan {
        let mut plan: Plan = self
            .migrated
            .values()
            .filter(|r| r.moved())
            .map(|r| PlanEntry::single(r.id.clone(), r.src_sid.clone(), r.dst_sid.clone()))
            .collect();
        plan.sort_by(|a, b| a.region_id.cmp(&b.region_id));
        plan
    }

    /// Leftover regions in either bucket after solving, used for the
    /// `NumericalResidual` diagnostic.
    pub fn residual_count(&self) -> usize {
        self.count[0] + self.count[1]
    }
}

impl Default for DomRegions {
    fn default() -> Self {
        DomRegions::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(id: &str, src: &str, vals: Vec<f64>) -> RegionInfo {
        RegionInfo::new(id.to_string(), vals, src.to_string())
    }

    #[test]
    fn push_then_pop_round_trips_without_ratio() {
        let mut dr = DomRegions::new();
        dr.push(0, region("r1", "s1", vec![10.0, 1.0]));
        assert_eq!(dr.count(0), 1);

        let popped = dr.pop(0, "s2", None).expect("present");
        assert_eq!(popped.id, "r1");
        assert_eq!(popped.dst_sid, "s2");
        assert!(dr.empty(0));

        let plan = dr.build_solution();
        assert_eq!(plan, vec![PlanEntry::single("r1", "s1", "s2")]);
    }

    #[test]
    fn pop_prefers_candidate_store_bucket() {
        let mut dr = DomRegions::new();
        dr.push(0, region("a", "s1", vec![5.0, 1.0]));
        dr.push(0, region("b", "s2", vec![5.0, 1.0]));

        let popped = dr.pop(0, "s2", None).expect("present");
        assert_eq!(popped.id, "b");
    }

    #[test]
    fn ratio_bounded_pop_splits_and_leaves_residual() {
        let mut dr = DomRegions::new();
        dr.push(0, region("r1", "s1", vec![10.0, 0.0]));

        let bases = [1.0, 1.0];
        let child = dr.pop(0, "s2", Some((0.3, &bases))).expect("present");
        assert!((child.vals[0] - 3.0).abs() < 1e-9);
        assert_eq!(child.parent_id.as_deref(), Some("r1"));
        assert!(!dr.empty(0), "residual should remain in the bucket");
        assert_eq!(dr.count(0), 1);
    }

    #[test]
    fn unmoved_regions_are_excluded_from_the_plan() {
        let mut dr = DomRegions::new();
        dr.push(0, region("r1", "s1", vec![10.0, 1.0]));
        let popped = dr.pop(0, "s1", None).expect("present");
        assert_eq!(popped.dst_sid, "s1");
        assert!(dr.build_solution().is_empty());
    }
}
