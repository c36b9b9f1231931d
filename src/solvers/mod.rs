//! The balancing solvers. Every solver is a pure function of
//! `(snapshot, ratio, ...)`: it works against its own clone of the input
//! snapshot and returns a [`Plan`] describing the moves that clone
//! underwent, per SPEC_FULL.md §3's mutation discipline.

mod dominance_split;
mod multi_greedy;
mod multi_greedy_general;
mod multi_with_pinning;
mod multi_without_pinning;
mod single;
mod util;

pub use dominance_split::{greedy_global, greedy_global_split};
pub use multi_greedy::multi_greedy;
pub use multi_greedy_general::multi_greedy_general;
pub use multi_with_pinning::multi_with_pinning;
pub use multi_without_pinning::multi_without_pinning;
pub use single::balance_single;

use std::str::FromStr;
use std::time::Instant;

use crate::error::Error;
use crate::plan::Plan;
use crate::snapshot::Snapshot;

/// The result of a solver run: the plan it produced, whether it believes
/// the placement it reached is within tolerance, the post-solve max/mean
/// ratio per dimension for diagnostics, and — when infeasible — the
/// residual imbalance metric SPEC_FULL.md §7 promises callers
/// (`0.0` whenever `feasible` is `true`).
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub plan: Plan,
    pub feasible: bool,
    pub residual: f64,
    pub aft_max_mean: Vec<f64>,
    pub aft_min_mean: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Ilp,
    GreedySingle,
    GreedyGlobal,
    GreedyGlobalSplit,
    GreedyMulti,
    GreedyMultiGreedy,
    GreedyMultiGreedyGeneral,
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ILP" => Ok(Algorithm::Ilp),
            "GREEDY-SINGLE" => Ok(Algorithm::GreedySingle),
            "GREEDY-GLOBAL" => Ok(Algorithm::GreedyGlobal),
            "GREEDY-GLOBAL-SPLIT" => Ok(Algorithm::GreedyGlobalSplit),
            "GREEDY-MULTI" => Ok(Algorithm::GreedyMulti),
            "GREEDY-MULTI-GREEDY" => Ok(Algorithm::GreedyMultiGreedy),
            "GREEDY-MULTI-GREEDY-GENERAL" => Ok(Algorithm::GreedyMultiGreedyGeneral),
            other => Err(Error::UnknownAlgorithm(other.to_string())),
        }
    }
}

impl Algorithm {
    pub fn tag(self) -> &'static str {
        match self {
            Algorithm::Ilp => "ILP",
            Algorithm::GreedySingle => "GREEDY-SINGLE",
            Algorithm::GreedyGlobal => "GREEDY-GLOBAL",
            Algorithm::GreedyGlobalSplit => "GREEDY-GLOBAL-SPLIT",
            Algorithm::GreedyMulti => "GREEDY-MULTI",
            Algorithm::GreedyMultiGreedy => "GREEDY-MULTI-GREEDY",
            Algorithm::GreedyMultiGreedyGeneral => "GREEDY-MULTI-GREEDY-GENERAL",
        }
    }
}

/// Dispatch to the solver named by `algorithm`, on a clone of `snapshot`.
/// Returns the outcome and how long the solver call itself took.
pub fn balance(
    algorithm: Algorithm,
    snapshot: &Snapshot,
    ratio: f64,
    allow_split: bool,
) -> Result<(SolveOutcome, std::time::Duration), Error> {
    let mut work = snapshot.clone();
    let started = Instant::now();

    let outcome = match algorithm {
        Algorithm::GreedySingle => {
            let mut plan = Plan::new();
            let mut feasible = true;
            let mut residual = 0.0;
            for dim in 0..work.dims {
                let (dim_plan, ok) = balance_single(&mut work, ratio, dim, allow_split);
                plan.extend(dim_plan);
                feasible &= ok;
                if !ok {
                    residual += 1.0;
                }
            }
            SolveOutcome {
                plan,
                feasible,
                residual,
                aft_max_mean: work.max_mean_ratios(),
                aft_min_mean: work.min_mean_ratios(),
            }
        }
        Algorithm::GreedyGlobal => {
            let (plan, feasible, residual) = greedy_global(&mut work, ratio);
            SolveOutcome {
                plan,
                feasible,
                residual,
                aft_max_mean: work.max_mean_ratios(),
                aft_min_mean: work.min_mean_ratios(),
            }
        }
        Algorithm::GreedyGlobalSplit => {
            let (plan, feasible, residual) = greedy_global_split(&mut work, ratio);
            SolveOutcome {
                plan,
                feasible,
                residual,
                aft_max_mean: work.max_mean_ratios(),
                aft_min_mean: work.min_mean_ratios(),
            }
        }
        Algorithm::GreedyMulti => {
            let plan = multi_without_pinning(&mut work, ratio);
            SolveOutcome {
                plan,
                feasible: true,
                residual: 0.0,
                aft_max_mean: work.max_mean_ratios(),
                aft_min_mean: work.min_mean_ratios(),
            }
        }
        Algorithm::GreedyMultiGreedy => {
            let plan = multi_greedy(&mut work, ratio);
            SolveOutcome {
                plan,
                feasible: true,
                residual: 0.0,
                aft_max_mean: work.max_mean_ratios(),
                aft_min_mean: work.min_mean_ratios(),
            }
        }
        Algorithm::GreedyMultiGreedyGeneral => {
            let plan = multi_greedy_general(&mut work, ratio);
            SolveOutcome {
                plan,
                feasible: true,
                residual: 0.0,
                aft_max_mean: work.max_mean_ratios(),
                aft_min_mean: work.min_mean_ratios(),
            }
        }
        Algorithm::Ilp => {
            let result = crate::lp::lp_balance(&work, ratio, allow_split)?;
            SolveOutcome {
                plan: result.plan,
                feasible: result.feasible,
                residual: result.residual,
                aft_max_mean: vec![result.aft_max_mean],
                aft_min_mean: vec![result.aft_max_mean],
            }
        }
    };

    Ok((outcome, started.elapsed()))
}
