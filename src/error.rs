//! Error type shared by the formula model, the evaluators and the MILP encoder.

use thiserror::Error;

use crate::milp::model::SolverModelError;
use crate::stl::signal::Identifier;

/// Convenience alias used across the crate.
pub type StlResult<T> = Result<T, StlError>;

#[derive(Debug, Error)]
pub enum StlError {
    /// A temporal interval is malformed, or its discretized window is empty.
    #[error("invalid temporal bounds [{start}, {end}]: {reason}")]
    InvalidBounds {
        start: f64,
        end: f64,
        reason: &'static str,
    },

    /// An n-ary operator was built with too few arguments.
    #[error("`{operator}` takes at least {expected} arguments, {found} given")]
    InvalidArity {
        operator: &'static str,
        expected: usize,
        found: usize,
    },

    /// A query time or a temporal window falls outside the trajectory domain `[0, len)`.
    #[error("index {index} is outside the trajectory domain [0, {len})")]
    OutOfRange { index: usize, len: usize },

    /// The trajectory (or the MILP context) has no value bound to this identifier.
    #[error("no value bound to signal `{0}`")]
    UnknownSignal(Identifier),

    #[error("invalid signal: {0}")]
    InvalidSignal(String),

    #[error("invalid trajectory: {0}")]
    InvalidTrajectory(String),

    /// The operator has no rule in the requested semantics.
    #[error("operator `{operator}` is not supported: {reason}")]
    UnsupportedOperator {
        operator: &'static str,
        reason: String,
    },

    /// The big-M policy cannot produce a sound constant.
    #[error("invalid big-M: {0}")]
    InvalidBigM(String),

    /// The external solver model rejected a variable or a constraint.
    #[error(transparent)]
    SolverModel(#[from] SolverModelError),
}

impl StlError {
    pub(crate) fn invalid_bounds(start: f64, end: f64, reason: &'static str) -> Self {
        StlError::InvalidBounds { start, end, reason }
    }
}
