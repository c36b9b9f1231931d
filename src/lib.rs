//! Region-to-store migration planning for a sharded, multi-dimensional
//! load-balanced storage cluster. See SPEC_FULL.md for the full design;
//! in short: a [`snapshot::Snapshot`] describes the current placement of
//! regions on stores, a balancing solver under [`solvers`] mutates a clone
//! of it to bring every store's per-dimension load within a tolerance
//! ratio of the cluster mean, and the resulting [`plan::Plan`] lists the
//! moves that would apply.

pub mod dom_regions;
pub mod error;
pub mod generator;
pub mod harness;
pub mod lp;
pub mod model;
pub mod plan;
pub mod snapshot;
pub mod solvers;

pub use error::Error;
pub use plan::{Plan, PlanEntry};
pub use snapshot::Snapshot;
pub use solvers::{balance, Algorithm, SolveOutcome};
