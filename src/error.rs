use thiserror::Error;

/// Errors that propagate out of a solver call. Infeasibility and numerical
/// residuals are *not* represented here — they are handled locally by each
/// solver and reflected in its returned [`crate::solvers::SolveOutcome`]
/// instead of raised as an error (see SPEC_FULL.md §7).
#[derive(Debug, Error)]
pub enum Error {
    #[error("region {id:?} already exists in store {store:?}")]
    DuplicateRegion { id: String, store: String },

    #[error("split of region {id:?} produced a negative residual load")]
    NegativeResidual { id: String },

    #[error("unknown algorithm tag: {0:?}")]
    UnknownAlgorithm(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] region_balance_parser::ParseError),

    #[error("LP solver failed: {0}")]
    Lp(String),
}
