//! Multi-dimensional greedy balancer, dominance-classified variant
//! ("greedy-multi-greedy", tag `GREEDY-MULTI-GREEDY`). See SPEC_FULL.md §4.4
//! variant A.

use crate::model::StoreInfo;
use crate::plan::Plan;
use crate::snapshot::Snapshot;

use super::util::{self, plan_from_moved_regions};

fn norm(store: &StoreInfo, means: &[f64], dim: usize) -> f64 {
    store.act_vals_sum[dim] / means[dim]
}

fn max_dim(store: &StoreInfo, means: &[f64]) -> usize {
    (0..means.len())
        .max_by(|&a, &b| norm(store, means, a).partial_cmp(&norm(store, means, b)).unwrap())
        .unwrap_or(0)
}

fn best_fit_destination(
    stores: &[StoreInfo],
    from: usize,
    region_vals: &[f64],
    peer_stores: &[String],
    dim: usize,
    means: &[f64],
    ratio: f64,
) -> Option<usize> {
    (0..stores.len())
        .filter(|&j| j != from && !peer_stores.contains(&stores[j].id))
        .map(|j| {
            let after = (stores[j].act_vals_sum[dim] + region_vals[dim]) / means[dim];
            (j, after)
        })
        .filter(|&(_, after)| after <= 1.0 + ratio)
        .min_by(|&(_, a), &(_, b)| a.partial_cmp(&b).unwrap())
        .map(|(j, _)| j)
}

fn move_marking_peer(stores: &mut [StoreInfo], from: usize, to: usize, region_id: &str) {
    let from_id = stores[from].id.clone();
    util::migrate_by_index(stores, from, to, region_id);
    if let Some(region) = stores[to].regions.get_mut(region_id) {
        region.has_moved = true;
        region.peer_stores.push(from_id);
    }
}

pub fn multi_greedy(snapshot: &mut Snapshot, ratio: f64) -> Plan {
    log::debug!("multi-greedy (dominance-classified) balancer: ratio={ratio}");
    let means = snapshot.means();
    let sweep_cap = snapshot.region_count() * 4 + snapshot.stores.len();

    for _ in 0..sweep_cap {
        let mut progressed = false;

        let mut order: Vec<usize> = (0..snapshot.stores.len()).collect();
        order.sort_by(|&a, &b| {
            snapshot.stores[b].act_vals_sum[0]
                .partial_cmp(&snapshot.stores[a].act_vals_sum[0])
                .unwrap()
                .then_with(|| snapshot.stores[a].id.cmp(&snapshot.stores[b].id))
        });

        for idx in order {
            loop {
                let dim = max_dim(&snapshot.stores[idx], &means);
                if norm(&snapshot.stores[idx], &means, dim) <= 1.0 + ratio {
                    break;
                }

                snapshot.stores[idx].classify_regions(&means);
                let region_id = match snapshot.stores[idx].dom_regions[dim].last() {
                    Some(id) => id.clone(),
                    None => break,
                };

                let region = &snapshot.stores[idx].regions[&region_id];
                let after_remove = (snapshot.stores[idx].act_vals_sum[dim] - region.vals[dim]) / means[dim];
                if after_remove < 1.0 - ratio {
                    break;
                }

                let region_vals = region.vals.clone();
                let peers = region.peer_stores.clone();
                match best_fit_destination(&snapshot.stores, idx, &region_vals, &peers, dim, &means, ratio) {
                    Some(dest) => {
                        log::trace!(
                            "multi-greedy: region {region_id} dominates dim {dim}, moving {} -> {}",
                            snapshot.stores[idx].id,
                            snapshot.stores[dest].id
                        );
                        move_marking_peer(&mut snapshot.stores, idx, dest, &region_id);
                        progressed = true;
                    }
                    None => break,
                }
            }
        }

        if !progressed {
            break;
        }
    }

    plan_from_moved_regions(&snapshot.stores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RegionInfo;

    fn store(id: &str, regions: &[(f64, f64)]) -> StoreInfo {
        let mut s = StoreInfo::new(id, 2);
        for (i, (a, b)) in regions.iter().enumerate() {
            s.add(RegionInfo::new(format!("{id}-r{i}"), vec![*a, *b], id)).unwrap();
        }
        s
    }

    #[test]
    fn drains_an_overloaded_store_in_its_dominant_dimension() {
        let mut snap = Snapshot::new(
            2,
            vec![store("hot", &[(80.0, 5.0), (5.0, 5.0)]), store("cold", &[(5.0, 5.0)])],
        );
        let plan = multi_greedy(&mut snap, 0.2);
        assert!(!plan.is_empty());
        assert!(snap.max_mean_ratio(0) <= 1.2 + 1e-6 || plan.iter().any(|e| e.src == "hot"));
    }
}
