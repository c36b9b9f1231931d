//! Multi-dimensional greedy balancer, pinning variant
//! ("greedy-multi (with pinning)"). Not bound to any CLI tag: a
//! library-only entry point for callers willing to trade some balance
//! quality for keeping each store's best-fitting regions in place. See
//! SPEC_FULL.md §4.4 variant D.

use std::collections::VecDeque;

use crate::model::{RegionInfo, StoreInfo};
use crate::plan::Plan;
use crate::snapshot::Snapshot;

use super::multi_without_pinning::{normalized, place_tail_by_best_fit, reorder_by_running_spread, spread};
use super::util::plan_from_moved_regions;

/// Mark, per store, the prefix of its own regions (by descending max load)
/// that can stay together locally within `ratio` spread and without
/// exceeding a normalized sum of 1.
fn pin_local_regions(stores: &mut [StoreInfo], means: &[f64], ratio: f64) {
    let dims = means.len();
    for store in stores.iter_mut() {
        let mut order: Vec<String> = store.regions.keys().cloned().collect();
        order.sort_by(|a, b| {
            store.regions[b]
                .max_val()
                .partial_cmp(&store.regions[a].max_val())
                .unwrap()
                .then_with(|| a.cmp(b))
        });

        let mut acc = vec![0.0; dims];
        for region_id in order {
            let n = normalized(&store.regions[&region_id], means);
            let combined: Vec<f64> = acc.iter().zip(n.iter()).map(|(a, b)| a + b).collect();
            let max_combined = combined.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            if spread(&combined) <= ratio && max_combined <= 1.0 {
                acc = combined;
                store.regions.get_mut(&region_id).unwrap().pinned = true;
            }
        }
    }
}

pub fn multi_with_pinning(snapshot: &mut Snapshot, ratio: f64) -> Plan {
    log::debug!("multi-with-pinning balancer: ratio={ratio}");
    let means = snapshot.means();
    let dims = snapshot.dims;

    pin_local_regions(&mut snapshot.stores, &means, ratio);
    let pinned_count = snapshot.stores.iter().flat_map(|s| s.regions.values()).filter(|r| r.pinned).count();
    log::trace!("multi-with-pinning: {pinned_count} region(s) pinned locally");

    let mut list: Vec<RegionInfo> = Vec::new();
    for store in snapshot.stores.iter_mut() {
        list.extend(store.regions.drain().map(|(_, r)| r));
        store.act_vals_sum = vec![0.0; dims];
    }

    list.sort_by(|a, b| {
        let ma = normalized(a, &means).into_iter().fold(f64::NEG_INFINITY, f64::max);
        let mb = normalized(b, &means).into_iter().fold(f64::NEG_INFINITY, f64::max);
        mb.partial_cmp(&ma).unwrap().then_with(|| a.id.cmp(&b.id))
    });

    reorder_by_running_spread(&mut list, &means, ratio);

    let mut remaining: VecDeque<RegionInfo> = list.into_iter().collect();
    let mut deferred: Vec<RegionInfo> = Vec::new();
    place_respecting_pins(&mut snapshot.stores, &mut remaining, &mut deferred, &means, ratio);

    for mut region in deferred {
        let dst = region.src_sid.clone();
        region.dst_sid = dst.clone();
        let store = snapshot
            .stores
            .iter_mut()
            .find(|s| s.id == dst)
            .expect("a pinned region's src_sid always names an existing store");
        store
            .add_without_anchor(region)
            .expect("region drained from its own store cannot collide");
    }

    place_tail_by_best_fit(&mut snapshot.stores, remaining, &means);

    plan_from_moved_regions(&snapshot.stores)
}

/// Like the plain front-to-back walk, but a pinned region may only land on
/// its own `src_sid`; a pinned region that doesn't fit there when reached is
/// set aside in `deferred` instead of competing for another store.
fn place_respecting_pins(
    stores: &mut [StoreInfo],
    remaining: &mut VecDeque<RegionInfo>,
    deferred: &mut Vec<RegionInfo>,
    means: &[f64],
    ratio: f64,
) {
    'store_walk: for store in stores.iter_mut() {
        loop {
            let front = match remaining.front() {
                Some(r) => r,
                None => break 'store_walk,
            };

            if front.pinned && front.src_sid != store.id {
                break;
            }

            let n = normalized(front, means);
            let would_max = (0..means.len())
                .map(|d| store.act_vals_sum[d] / means[d] + n[d])
                .fold(f64::NEG_INFINITY, f64::max);

            if would_max > 1.0 + ratio {
                if front.pinned {
                    let region = remaining.pop_front().expect("front() just returned Some");
                    deferred.push(region);
                    continue;
                }
                break;
            }

            let mut region = remaining.pop_front().expect("front() just returned Some");
            region.dst_sid = store.id.clone();
            store
                .add_without_anchor(region)
                .expect("region drained from its own store cannot collide");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StoreInfo;

    fn store(id: &str, regions: &[(f64, f64)]) -> StoreInfo {
        let mut s = StoreInfo::new(id, 2);
        for (i, (a, b)) in regions.iter().enumerate() {
            s.add(RegionInfo::new(format!("{id}-r{i}"), vec![*a, *b], id)).unwrap();
        }
        s
    }

    #[test]
    fn every_region_survives_the_pinning_pass() {
        let before = 3;
        let mut snap = Snapshot::new(
            2,
            vec![store("a", &[(30.0, 5.0), (5.0, 30.0)]), store("b", &[(5.0, 5.0)])],
        );
        assert_eq!(snap.region_count(), before);
        let _plan = multi_with_pinning(&mut snap, 0.2);
        assert_eq!(snap.region_count(), before);
    }
}
