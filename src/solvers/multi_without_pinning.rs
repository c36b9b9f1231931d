//! Multi-dimensional greedy balancer, global-reorder variant
//! ("greedy-multi-without-pinning", tag `GREEDY-MULTI`). See SPEC_FULL.md
//! §4.4 variant C.

use std::collections::VecDeque;

use crate::model::RegionInfo;
use crate::plan::Plan;
use crate::snapshot::Snapshot;

use super::util::plan_from_moved_regions;

pub(super) fn normalized(region: &RegionInfo, means: &[f64]) -> Vec<f64> {
    region.vals.iter().zip(means.iter()).map(|(v, m)| v / m).collect()
}

pub(super) fn spread(vals: &[f64]) -> f64 {
    vals.iter().cloned().fold(f64::NEG_INFINITY, f64::max) - vals.iter().cloned().fold(f64::INFINITY, f64::min)
}

pub fn multi_without_pinning(snapshot: &mut Snapshot, ratio: f64) -> Plan {
    log::debug!("multi-without-pinning (global reorder) balancer: ratio={ratio}");
    let means = snapshot.means();
    let dims = snapshot.dims;

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
    place_front_to_back(&mut snapshot.stores, &mut remaining, &means, ratio);
    log::trace!("multi-without-pinning: {} region(s) left for best-fit placement", remaining.len());
    place_tail_by_best_fit(&mut snapshot.stores, remaining, &means);

    plan_from_moved_regions(&snapshot.stores)
}

/// At each position, pull in the first not-yet-placed region whose addition
/// to the running sum keeps the normalized spread within `ratio`; failing
/// that, the one that minimizes the spread.
pub(super) fn reorder_by_running_spread(list: &mut [RegionInfo], means: &[f64], ratio: f64) {
    let dims = means.len();
    let mut acc = vec![0.0; dims];

    for i in 0..list.len() {
        let mut chosen = None;
        let mut best_idx = i;
        let mut best_spread = f64::INFINITY;

        for j in i..list.len() {
            let n = normalized(&list[j], means);
            let combined: Vec<f64> = acc.iter().zip(n.iter()).map(|(a, b)| a + b).collect();
            let s = spread(&combined);
            if s <= ratio {
                chosen = Some(j);
                break;
            }
            if s < best_spread {
                best_spread = s;
                best_idx = j;
            }
        }

        let pick = chosen.unwrap_or(best_idx);
        list.swap(i, pick);
        let n = normalized(&list[i], means);
        for d in 0..dims {
            acc[d] += n[d];
        }
    }
}

fn place_front_to_back(
    stores: &mut [crate::model::StoreInfo],
    remaining: &mut VecDeque<RegionInfo>,
    means: &[f64],
    ratio: f64,
) {
    'store_walk: for store in stores.iter_mut() {
        loop {
            let front = match remaining.front() {
                Some(r) => r,
                None => break 'store_walk,
            };
            let n = normalized(front, means);
            let would_max = (0..means.len())
                .map(|d| store.act_vals_sum[d] / means[d] + n[d])
                .fold(f64::NEG_INFINITY, f64::max);
            if would_max > 1.0 + ratio {
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

pub(super) fn place_tail_by_best_fit(stores: &mut [crate::model::StoreInfo], remaining: VecDeque<RegionInfo>, means: &[f64]) {
    for mut region in remaining {
        let n = normalized(&region, means);
        let dest = stores
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let ma = (0..means.len())
                    .map(|d| a.act_vals_sum[d] / means[d] + n[d])
                    .fold(f64::NEG_INFINITY, f64::max);
                let mb = (0..means.len())
                    .map(|d| b.act_vals_sum[d] / means[d] + n[d])
                    .fold(f64::NEG_INFINITY, f64::max);
                ma.partial_cmp(&mb).unwrap()
            })
            .map(|(i, _)| i);

        if let Some(idx) = dest {
            region.dst_sid = stores[idx].id.clone();
            stores[idx]
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
    fn redistributes_every_region_somewhere() {
        let before = 3;
        let mut snap = Snapshot::new(
            2,
            vec![
                store("a", &[(30.0, 5.0), (5.0, 30.0)]),
                store("b", &[(5.0, 5.0)]),
            ],
        );
        assert_eq!(snap.region_count(), before);
        let _plan = multi_without_pinning(&mut snap, 0.2);
        assert_eq!(snap.region_count(), before);
    }
}
