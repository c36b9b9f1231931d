//! Multi-dimensional greedy balancer, per-dimension queue variant
//! ("greedy-multi-greedy-general", tag `GREEDY-MULTI-GREEDY-GENERAL`). See
//! SPEC_FULL.md §4.4 variant B.

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

fn post_move_max_norm(store: &StoreInfo, means: &[f64], region_vals: &[f64]) -> f64 {
    (0..means.len())
        .map(|d| (store.act_vals_sum[d] + region_vals[d]) / means[d])
        .fold(f64::NEG_INFINITY, f64::max)
}

fn best_destination(
    stores: &[StoreInfo],
    from: usize,
    src_norm_in_dim: f64,
    region_vals: &[f64],
    dim: usize,
    means: &[f64],
) -> Option<usize> {
    (0..stores.len())
        .filter(|&j| j != from && norm(&stores[j], means, dim) <= src_norm_in_dim)
        .min_by(|&a, &b| {
            post_move_max_norm(&stores[a], means, region_vals)
                .partial_cmp(&post_move_max_norm(&stores[b], means, region_vals))
                .unwrap()
        })
}

fn move_marking(stores: &mut [StoreInfo], from: usize, to: usize, region_id: &str) {
    util::migrate_by_index(stores, from, to, region_id);
    if let Some(region) = stores[to].regions.get_mut(region_id) {
        region.has_moved = true;
    }
}

pub fn multi_greedy_general(snapshot: &mut Snapshot, ratio: f64) -> Plan {
    log::debug!("multi-greedy-general (per-dimension queue) balancer: ratio={ratio}");
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
                let src_norm = norm(&snapshot.stores[idx], &means, dim);
                if src_norm <= 1.0 + ratio {
                    break;
                }

                snapshot.stores[idx].sort_all();
                let region_id = match snapshot.stores[idx].sorted_regions_by_dim[dim].last() {
                    Some(id) => id.clone(),
                    None => break,
                };
                let region_vals = snapshot.stores[idx].regions[&region_id].vals.clone();

                let after_remove = src_norm - region_vals[dim] / means[dim];
                if after_remove < 1.0 - ratio {
                    break;
                }

                match best_destination(&snapshot.stores, idx, src_norm, &region_vals, dim, &means) {
                    Some(dest) => {
                        log::trace!(
                            "multi-greedy-general: region {region_id} queued on dim {dim}, moving {} -> {}",
                            snapshot.stores[idx].id,
                            snapshot.stores[dest].id
                        );
                        move_marking(&mut snapshot.stores, idx, dest, &region_id);
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
    fn moves_the_largest_region_in_the_overloaded_dimension() {
        let mut snap = Snapshot::new(
            2,
            vec![
                store("hot", &[(80.0, 5.0), (5.0, 5.0)]),
                store("cold", &[(5.0, 5.0)]),
            ],
        );
        let plan = multi_greedy_general(&mut snap, 0.2);
        assert!(!plan.is_empty());
    }
}
