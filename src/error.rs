//! Error types for boundary-precondition violations.
//!
//! The search core itself never fails: "no improving move", "all moves
//! tabu", and the other [`crate::result::TerminationStatus`] values are
//! normal outcomes, not errors. Only violations of a precondition at the
//! public API boundary (an invalid option combination, mutating a fixed
//! variable, inconsistent bounds, ...) produce a [`SolverError`].

use thiserror::Error;

/// Errors surfaced at the boundary of the solver API.
#[derive(Debug, Error)]
pub enum SolverError {
    /// An option combination is invalid, or the model is unsupported by the
    /// requested phase (e.g. a non-linear objective routed into a phase that
    /// assumes linearity).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An operation would violate a model invariant (mutating a fixed
    /// variable, inconsistent bounds, a duplicate solve on the same model).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A variable or constraint index was not found in the model's arenas.
    #[error("unknown {kind} index: {index}")]
    UnknownIndex {
        /// `"variable"` or `"constraint"`.
        kind: &'static str,
        /// The offending index.
        index: usize,
    },
}

/// Result alias used throughout the boundary API.
pub type Result<T> = std::result::Result<T, SolverError>;
