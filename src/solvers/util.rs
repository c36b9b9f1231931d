//! Helpers shared by more than one solver family.

use crate::model::StoreInfo;
use crate::plan::{Plan, PlanEntry};

/// Migrate `region_id` between two stores addressed by index into the same
/// slice, setting `dst_sid` to the destination store's id. Uses
/// `split_at_mut` to get two simultaneous mutable borrows without upsetting
/// the borrow checker.
pub fn migrate_by_index(stores: &mut [StoreInfo], from: usize, to: usize, region_id: &str) {
    assert_ne!(from, to);
    let (lo, hi) = (from.min(to), from.max(to));
    let (left, right) = stores.split_at_mut(hi);
    let (first, second) = (&mut left[lo], &mut right[0]);
    let (src, dst) = if from < to { (first, second) } else { (second, first) };

    let mut region = src
        .remove(region_id)
        .expect("region id must belong to the source store");
    region.dst_sid = dst.id.clone();
    dst.add_without_anchor(region)
        .expect("fresh move cannot collide with an existing id");
}

/// Build a [`Plan`] from every region whose `dst_sid != src_sid`, scanning
/// every store's current membership (used by balancers that mutate
/// `StoreInfo` directly rather than staging through `DomRegions`).
pub fn plan_from_moved_regions(stores: &[StoreInfo]) -> Plan {
    let mut plan: Plan = Vec::new();
    for store in stores {
        for region in store.regions.values() {
            if region.moved() {
                plan.push(PlanEntry::single(
                    region.id.clone(),
                    region.src_sid.clone(),
                    region.dst_sid.clone(),
                ));
            }
        }
    }
    plan.sort_by(|a, b| a.region_id.cmp(&b.region_id));
    plan
}
