//! Dominance-split balancer ("greedy" / "greedySplit"). See SPEC_FULL.md §4.5.
//!
//! Works exclusively on two-dimensional snapshots: every store load is
//! tracked as a pair of dimensions and a region is always attributed to
//! whichever of the two it dominates.

use crate::dom_regions::DomRegions;
use crate::model::StoreInfo;
use crate::plan::Plan;
use crate::snapshot::Snapshot;

/// Returns `(plan, feasible, residual)`, where `residual` is the count of
/// regions `DomRegions` could not place anywhere (SPEC_FULL.md §7's
/// `NumericalResidual` diagnostic) — `0.0` whenever `feasible` is `true`.
pub fn greedy_global(snapshot: &mut Snapshot, ratio: f64) -> (Plan, bool, f64) {
    run(snapshot, ratio, false)
}

pub fn greedy_global_split(snapshot: &mut Snapshot, ratio: f64) -> (Plan, bool, f64) {
    run(snapshot, ratio, true)
}

fn run(snapshot: &mut Snapshot, ratio: f64, allow_split: bool) -> (Plan, bool, f64) {
    assert_eq!(snapshot.dims, 2, "the dominance-split balancer only supports two load dimensions");
    log::debug!("dominance-split balancer: ratio={ratio} allow_split={allow_split}");
    let means = snapshot.means();
    let mut dr = DomRegions::new();

    balance_intra_store(&mut snapshot.stores, &means, ratio, &mut dr, allow_split);
    log::trace!(
        "dominance-split: phase 1 done, dr buckets = [{}, {}]",
        dr.count(0),
        dr.count(1)
    );
    fill_deficient_stores(&mut snapshot.stores, &means, ratio, &mut dr, allow_split);
    log::trace!(
        "dominance-split: phase 2 done, dr buckets = [{}, {}]",
        dr.count(0),
        dr.count(1)
    );
    place_leftovers(&mut snapshot.stores, &means, ratio, &mut dr);
    log::trace!(
        "dominance-split: phase 3 done, dr buckets = [{}, {}]",
        dr.count(0),
        dr.count(1)
    );
    final_sweep(&mut snapshot.stores, &mut dr);

    let residual = dr.residual_count();
    if residual > 0 {
        log::warn!("dominance-split balancer left {residual} region(s) unresolved in DomRegions");
    }

    (dr.build_solution(), residual == 0, residual as f64)
}

fn norm(store: &StoreInfo, means: &[f64], dim: usize) -> f64 {
    store.act_vals_sum[dim] / means[dim]
}

/// Phase 1: drain each store's most-skewed regions into `dr` until the
/// store's two normalized dimensions are within `ratio` of each other (and
/// not both above 1). When `allow_split`, the last pop that would overcorrect
/// past the target only carves off the exact fraction needed.
fn balance_intra_store(stores: &mut [StoreInfo], means: &[f64], ratio: f64, dr: &mut DomRegions, allow_split: bool) {
    for store in stores.iter_mut() {
        loop {
            if store.regions.is_empty() {
                break;
            }
            store.classify_regions(means);
            let norm0 = norm(store, means, 0);
            let norm1 = norm(store, means, 1);
            let both_over = norm0 > 1.0 && norm1 > 1.0;
            let diff = (norm0 - norm1).abs();
            if diff <= ratio && !both_over {
                break;
            }

            let dominating = if norm0 >= norm1 { 0 } else { 1 };
            let region_id = match store.dom_regions[dominating].last() {
                Some(id) => id.clone(),
                None => break,
            };

            let mut region = store
                .remove(&region_id)
                .expect("id came from this store's own dominance bucket");
            let region_span = (region.vals[0] / means[0] - region.vals[1] / means[1]).abs();

            if allow_split && region_span > diff && diff > 0.0 {
                let carve = dr.split_region_with_val(&mut region, dominating, means, diff);
                store
                    .add_without_anchor(region)
                    .expect("re-adding the reduced residual cannot collide with an existing id");
                dr.push(dominating, carve);
            } else {
                dr.push(dominating, region);
            }
        }
    }
}

fn capacity_left(store: &StoreInfo, means: &[f64], ratio: f64, dim: usize) -> f64 {
    means[dim] * (1.0 + ratio) - store.act_vals_sum[dim]
}

/// Phase 2: stores under 1 in both dimensions pull from `dr`'s bucket for
/// their currently-higher dimension, preferring their own prior regions
/// (DomRegions' pop already does that). When `allow_split`, the pop is
/// bounded by remaining capacity and may return a fractional split; the
/// plain `greedy_global` tag takes whatever `dr` hands back whole.
fn fill_deficient_stores(stores: &mut [StoreInfo], means: &[f64], ratio: f64, dr: &mut DomRegions, allow_split: bool) {
    let mut order: Vec<usize> = (0..stores.len()).collect();
    order.sort_by(|&a, &b| {
        stores[a].act_vals_sum[0]
            .partial_cmp(&stores[b].act_vals_sum[0])
            .unwrap()
            .then_with(|| stores[a].id.cmp(&stores[b].id))
    });

    for idx in order {
        loop {
            let norm0 = norm(&stores[idx], means, 0);
            let norm1 = norm(&stores[idx], means, 1);
            if !(norm0 < 1.0 && norm1 < 1.0) {
                break;
            }
            let which = if norm0 >= norm1 { 0 } else { 1 };

            let picked = if allow_split {
                let cap = capacity_left(&stores[idx], means, ratio, which);
                if cap <= 0.0 {
                    break;
                }
                let bases = [
                    if which == 0 { cap } else { means[0] },
                    if which == 1 { cap } else { means[1] },
                ];
                dr.pop(which, &stores[idx].id, Some((1.0, &bases)))
            } else {
                dr.pop(which, &stores[idx].id, None)
            };
            match picked {
                Some(region) => {
                    stores[idx]
                        .add_without_anchor(region)
                        .expect("pop returns a region not already resident in this store");
                }
                None => break,
            }
        }
    }
}

/// Phase 3: one pass per dimension, filling stores not already above 1 in
/// that dimension, rolling back any pick that would cross `1 + ratio` in
/// either dimension.
fn place_leftovers(stores: &mut [StoreInfo], means: &[f64], ratio: f64, dr: &mut DomRegions) {
    for dim in 0..means.len() {
        let mut order: Vec<usize> = (0..stores.len()).collect();
        order.sort_by(|&a, &b| {
            norm(&stores[a], means, dim)
                .partial_cmp(&norm(&stores[b], means, dim))
                .unwrap()
                .then_with(|| stores[a].id.cmp(&stores[b].id))
        });

        for idx in order {
            loop {
                if norm(&stores[idx], means, dim) > 1.0 {
                    break;
                }
                let mut candidate = match dr.pop(dim, &stores[idx].id, None) {
                    Some(r) => r,
                    None => break,
                };
                let would0 = (stores[idx].act_vals_sum[0] + candidate.vals[0]) / means[0];
                let would1 = (stores[idx].act_vals_sum[1] + candidate.vals[1]) / means[1];
                if would0 > 1.0 + ratio || would1 > 1.0 + ratio {
                    candidate.dst_sid = candidate.src_sid.clone();
                    dr.push(dim, candidate);
                    break;
                }
                stores[idx]
                    .add_without_anchor(candidate)
                    .expect("pop returns a region not already resident in this store");
            }
        }
    }
}

/// Phase 4: whatever is left in `dr` goes to whichever store is currently
/// most deficient in that dimension, without further bound checks.
fn final_sweep(stores: &mut [StoreInfo], dr: &mut DomRegions) {
    for dim in 0..2 {
        loop {
            if dr.empty(dim) {
                break;
            }
            let idx = match stores
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| a.act_vals_sum[dim].partial_cmp(&b.act_vals_sum[dim]).unwrap())
                .map(|(i, _)| i)
            {
                Some(i) => i,
                None => break,
            };
            match dr.pop(dim, &stores[idx].id, None) {
                Some(region) => {
                    stores[idx]
                        .add_without_anchor(region)
                        .expect("pop returns a region not already resident in this store");
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RegionInfo;

    fn two_dim_store(id: &str, regions: &[(f64, f64)]) -> StoreInfo {
        let mut s = StoreInfo::new(id, 2);
        for (i, (a, b)) in regions.iter().enumerate() {
            s.add(RegionInfo::new(format!("{id}-r{i}"), vec![*a, *b], id)).unwrap();
        }
        s
    }

    #[test]
    fn balanced_snapshot_produces_no_moves() {
        let mut snap = Snapshot::new(
            2,
            vec![two_dim_store("a", &[(10.0, 10.0)]), two_dim_store("b", &[(10.0, 10.0)])],
        );
        let (plan, feasible, residual) = greedy_global(&mut snap, 0.1);
        assert!(plan.is_empty());
        assert!(feasible);
        assert_eq!(residual, 0.0);
    }

    #[test]
    fn skewed_store_sheds_its_dominant_region() {
        let mut snap = Snapshot::new(
            2,
            vec![
                two_dim_store("hot", &[(80.0, 5.0), (5.0, 5.0)]),
                two_dim_store("cold", &[(5.0, 5.0)]),
            ],
        );
        let (plan, _feasible, _residual) = greedy_global(&mut snap, 0.2);
        assert!(!plan.is_empty());
    }
}
