//! Single-dimension two-pointer balancer. See SPEC_FULL.md §4.3.

use crate::model::LoadState;
use crate::plan::Plan;
use crate::snapshot::Snapshot;

use super::util::{migrate_by_index, plan_from_moved_regions};

fn median(sorted: &[f64]) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

fn split_oversized_regions(snapshot: &mut Snapshot, dim: usize) {
    let mut id_alloc = snapshot.fresh_id_allocator();
    for store in snapshot.stores.iter_mut() {
        store.sort(dim);
        let take = store.sorted_regions.len().min(10);
        let top = &store.sorted_regions[store.sorted_regions.len() - take..];
        let mut sample: Vec<f64> = top.iter().map(|id| store.regions[id].vals[dim]).collect();
        sample.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let med = median(&sample);
        if med <= 0.0 {
            continue;
        }

        let oversized: Vec<String> = store
            .sorted_regions
            .iter()
            .filter(|id| store.regions[*id].vals[dim] >= 2.0 * med)
            .cloned()
            .collect();
        for region_id in oversized {
            let load = store.regions[&region_id].vals[dim];
            let pieces = ((load / med) * 2.0).ceil().max(1.0) as usize;
            store
                .split_region(&region_id, pieces, &mut id_alloc)
                .expect("split of a region owned by this store cannot fail");
        }
        store.sort(dim);
    }
}

/// Balance a single dimension `dim` to within `ratio` of the mean. Returns
/// the plan of moves performed on `snapshot` (mutated in place) and whether
/// the two pointers met, meeting being this balancer's signal of success.
pub fn balance_single(
    snapshot: &mut Snapshot,
    ratio: f64,
    dim: usize,
    enable_splitting: bool,
) -> (Plan, bool) {
    log::debug!("single-dim balancer: dim={dim} ratio={ratio} splitting={enable_splitting}");
    for store in snapshot.stores.iter_mut() {
        store.sort(dim);
    }

    if enable_splitting {
        split_oversized_regions(snapshot, dim);
    }

    let mean = snapshot.mean(dim);
    let upper = mean * (1.0 + ratio);
    let lower = mean * (1.0 - ratio);
    let state_of = |val: f64| LoadState::classify(val, mean, upper, lower);

    let mut order: Vec<usize> = (0..snapshot.stores.len()).collect();
    order.sort_by(|&a, &b| {
        snapshot.stores[a].act_vals_sum[dim]
            .partial_cmp(&snapshot.stores[b].act_vals_sum[dim])
            .unwrap()
            .then_with(|| snapshot.stores[a].id.cmp(&snapshot.stores[b].id))
    });

    let low = 0usize;
    let mut high = order.len().saturating_sub(1);

    while low < high {
        while low < high && state_of(snapshot.stores[order[high]].act_vals_sum[dim]).code().abs() <= 1 {
            high -= 1;
        }
        if low >= high {
            break;
        }
        let high_idx = order[high];
        let hot_state = state_of(snapshot.stores[high_idx].act_vals_sum[dim]);
        if hot_state == LoadState::BelowMean || hot_state == LoadState::BelowLower {
            break;
        }

        snapshot.stores[high_idx].sort(dim);
        let hottest_first: Vec<String> = snapshot.stores[high_idx]
            .sorted_regions
            .iter()
            .rev()
            .cloned()
            .collect();

        for region_id in hottest_first {
            let region_val = snapshot.stores[high_idx].regions[&region_id].vals[dim];
            let after_remove = snapshot.stores[high_idx].act_vals_sum[dim] - region_val;
            if after_remove < lower {
                continue;
            }

            let dest = (low..high).find(|&i| {
                let cand = order[i];
                snapshot.stores[cand].act_vals_sum[dim] + region_val <= upper
            });

            if let Some(pos) = dest {
                log::trace!(
                    "single-dim balancer: moving region {region_id} from {} to {}",
                    snapshot.stores[high_idx].id,
                    snapshot.stores[order[pos]].id
                );
                migrate_by_index(&mut snapshot.stores, high_idx, order[pos], &region_id);
                if state_of(snapshot.stores[high_idx].act_vals_sum[dim]).code().abs() <= 1 {
                    break;
                }
            }
        }

        high -= 1;
    }

    let balanced = low == high;
    if !balanced {
        log::warn!("single-dim balancer: pointers collapsed with dim {dim} still out of band");
    }
    (plan_from_moved_regions(&snapshot.stores), balanced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RegionInfo, StoreInfo};

    fn store(id: &str, loads: &[f64]) -> StoreInfo {
        let mut s = StoreInfo::new(id, 1);
        for (i, load) in loads.iter().enumerate() {
            s.add(RegionInfo::new(format!("{id}-r{i}"), vec![*load], id)).unwrap();
        }
        s
    }

    #[test]
    fn moves_load_from_a_hot_store_to_a_cold_one() {
        let mut snap = Snapshot::new(1, vec![store("hot", &[50.0, 40.0]), store("cold", &[10.0])]);
        let (plan, _balanced) = balance_single(&mut snap, 0.1, 0, false);
        assert!(!plan.is_empty());
        assert!(snap.max_mean_ratio(0) <= 1.1 + 1e-9);
    }

    #[test]
    fn already_balanced_stores_produce_no_moves() {
        let mut snap = Snapshot::new(1, vec![store("a", &[50.0]), store("b", &[50.0])]);
        let (plan, balanced) = balance_single(&mut snap, 0.1, 0, false);
        assert!(plan.is_empty());
        assert!(balanced);
    }
}
