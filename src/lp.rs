//! LP/ILP balancer. Builds the placement problem described in
//! SPEC_FULL.md §4.6 and hands it to `good_lp`'s pure-Rust `microlp`
//! backend, which needs no system solver installed.

use rustc_hash::{FxHashMap, FxHashSet};

use good_lp::{constraint, variable, Expression, ResolutionError, Solution, SolverModel};

use crate::error::Error;
use crate::model::StoreId;
use crate::plan::{Plan, PlanEntry};
use crate::snapshot::Snapshot;

const ZERO_EPSILON: f64 = 1e-9;

pub struct LpResult {
    pub plan: Plan,
    pub feasible: bool,
    pub aft_max_mean: f64,
    /// `0.0` when `feasible`; otherwise the count of regions left
    /// unplaced by the infeasible solve (SPEC_FULL.md §7's residual
    /// imbalance metric for `InfeasibleProblem`).
    pub residual: f64,
}

fn sum_expr(terms: impl IntoIterator<Item = Expression>) -> Expression {
    let mut iter = terms.into_iter();
    let mut acc = iter.next().unwrap_or_else(|| Expression::from(0.0));
    for term in iter {
        acc = acc + term;
    }
    acc
}

/// Build and solve the LP placement problem for `snapshot`. Does not mutate
/// `snapshot`; the reconstructed plan describes the moves a caller would
/// need to apply to reach the solved placement.
pub fn lp_balance(snapshot: &Snapshot, ratio: f64, allow_split: bool) -> Result<LpResult, Error> {
    let dims = snapshot.dims;
    let means = snapshot.means();

    let mut store_ids: Vec<StoreId> = snapshot.stores.iter().map(|s| s.id.clone()).collect();
    store_ids.sort();

    let mut region_ids: Vec<String> = Vec::new();
    let mut region_src: FxHashMap<String, StoreId> = FxHashMap::default();
    let mut region_vals: FxHashMap<String, Vec<f64>> = FxHashMap::default();
    for store in &snapshot.stores {
        let mut ids: Vec<&String> = store.regions.keys().collect();
        ids.sort();
        for id in ids {
            region_ids.push(id.clone());
            region_src.insert(id.clone(), store.id.clone());
            region_vals.insert(id.clone(), store.regions[id].vals.clone());
        }
    }

    // Split-allowed regions: per SPEC_FULL.md §4.6, when splitting is
    // permitted every region becomes split-eligible once pre-sorted by
    // dimension 0 (the sort only matters for the reference's logging; the
    // set of eligible ids is simply "all regions").
    let split_eligible: FxHashSet<&str> = if allow_split {
        region_ids.iter().map(|s| s.as_str()).collect()
    } else {
        FxHashSet::default()
    };

    let mut upper: Vec<FxHashMap<StoreId, f64>> = vec![Default::default(); dims];
    let mut lower: Vec<FxHashMap<StoreId, f64>> = vec![Default::default(); dims];
    for store in &snapshot.stores {
        for dim in 0..dims {
            let band_upper = means[dim] * (1.0 + ratio);
            let band_lower = means[dim] * (1.0 - ratio);
            upper[dim].insert(
                store.id.clone(),
                band_upper - store.act_vals_sum[dim] + store.vals_sum[dim],
            );
            lower[dim].insert(
                store.id.clone(),
                band_lower - store.act_vals_sum[dim] + store.vals_sum[dim],
            );
        }
    }

    let mut problem_vars = good_lp::variables!();
    let mut x: FxHashMap<(String, StoreId), good_lp::Variable> = FxHashMap::default();
    for rid in &region_ids {
        for sid in &store_ids {
            let def = if split_eligible.contains(rid.as_str()) {
                variable().min(0.0).max(1.0)
            } else {
                variable().integer().min(0.0).max(1.0)
            };
            x.insert((rid.clone(), sid.clone()), problem_vars.add(def));
        }
    }

    let location_cost = |rid: &str, sid: &StoreId| -> f64 {
        if region_src.get(rid).map(|s| s == sid).unwrap_or(false) {
            0.0
        } else {
            1.0
        }
    };

    let objective = sum_expr(region_ids.iter().flat_map(|rid| {
        store_ids.iter().filter_map(|sid| {
            let cost = location_cost(rid, sid);
            if cost == 0.0 {
                None
            } else {
                Some(cost * x[&(rid.clone(), sid.clone())])
            }
        })
    }));

    let mut model = problem_vars.minimise(objective).using(good_lp::microlp);

    for rid in &region_ids {
        let placement = sum_expr(store_ids.iter().map(|sid| Expression::from(x[&(rid.clone(), sid.clone())])));
        model = model.with(constraint!(placement == 1.0));
    }

    for sid in &store_ids {
        for dim in 0..dims {
            let load_expr = sum_expr(region_ids.iter().map(|rid| {
                region_vals[rid][dim] * x[&(rid.clone(), sid.clone())]
            }));
            model = model.with(constraint!(load_expr.clone() >= lower[dim][sid]));
            model = model.with(constraint!(load_expr <= upper[dim][sid]));
        }
    }

    let solution = match model.solve() {
        Ok(solution) => solution,
        Err(ResolutionError::Infeasible) => {
            log::warn!("LP balancer: problem infeasible, returning empty plan");
            return Ok(LpResult {
                plan: Vec::new(),
                feasible: false,
                aft_max_mean: f64::INFINITY,
                residual: region_ids.len() as f64,
            });
        }
        Err(other) => return Err(Error::Lp(other.to_string())),
    };

    let mut plan = Vec::new();
    for rid in &region_ids {
        let src = region_src[rid].clone();
        let mut dsts: Vec<(StoreId, f64)> = Vec::new();
        let mut cost = 0.0;
        for sid in &store_ids {
            let frac = solution.value(x[&(rid.clone(), sid.clone())]);
            cost += frac * location_cost(rid, sid);
            if frac > ZERO_EPSILON {
                dsts.push((sid.clone(), frac));
            }
        }
        if cost > ZERO_EPSILON {
            plan.push(PlanEntry {
                region_id: rid.clone(),
                src,
                dsts,
            });
        }
    }
    plan.sort_by(|a, b| a.region_id.cmp(&b.region_id));

    let mut aft_max_mean = f64::NEG_INFINITY;
    for sid in &store_ids {
        for dim in 0..dims {
            let load: f64 = region_ids
                .iter()
                .map(|rid| solution.value(x[&(rid.clone(), sid.clone())]) * region_vals[rid][dim])
                .sum();
            let ratio_here = load / means[dim];
            if ratio_here > aft_max_mean {
                aft_max_mean = ratio_here;
            }
        }
    }

    log::debug!("LP balancer: migration cost {}, aft_max_mean {:.4}", plan.len(), aft_max_mean);

    Ok(LpResult {
        plan,
        feasible: true,
        aft_max_mean,
        residual: 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RegionInfo, StoreInfo};

    fn store(id: &str, regions: &[(f64, f64)]) -> StoreInfo {
        let mut s = StoreInfo::new(id, 2);
        for (i, (a, b)) in regions.iter().enumerate() {
            s.add(RegionInfo::new(format!("{id}-r{i}"), vec![*a, *b], id)).unwrap();
        }
        s
    }

    #[test]
    fn balanced_snapshot_needs_no_moves() {
        let snap = Snapshot::new(2, vec![store("a", &[(10.0, 10.0)]), store("b", &[(10.0, 10.0)])]);
        let result = lp_balance(&snap, 0.1, false).expect("solves");
        assert!(result.feasible);
        assert!(result.plan.is_empty());
    }

    #[test]
    fn one_heavy_store_sheds_load_when_split_allowed() {
        let snap = Snapshot::new(2, vec![store("a", &[(30.0, 30.0)]), StoreInfo::new("b", 2), StoreInfo::new("c", 2)]);
        let result = lp_balance(&snap, 0.1, true).expect("solves");
        assert!(result.feasible);
        assert!(!result.plan.is_empty());
        assert!(result.aft_max_mean <= 1.1 + 1e-6);
    }
}
