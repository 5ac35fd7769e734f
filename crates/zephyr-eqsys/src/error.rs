//! Error types for equation systems and their configuration.

use zephyr_core::{FieldError, MeshError};

/// Errors in equation-system configuration.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A system declaration names a kind outside the closed set.
    #[error("unknown equation system type '{name}'")]
    UnknownEquationSystemKind {
        /// The unrecognised kind tag.
        name: String,
    },
    /// No solver block is mapped for an equation.
    #[error("issue with solver name mapping; none supplied for '{equation}'")]
    MissingSolverMapping {
        /// The equation (or dof) name that was looked up.
        equation: String,
    },
    /// The input document could not be parsed.
    #[error("parse error: {reason}")]
    Parse {
        /// Parser message.
        reason: String,
    },
    /// A required key is absent.
    #[error("missing required key '{key}' in {context}")]
    MissingKey {
        /// The missing key.
        key: String,
        /// Where it was expected.
        context: String,
    },
    /// A key holds an unusable value.
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue {
        /// The offending key.
        key: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// Errors raised by equation-system hooks.
///
/// Solver divergence is not an error: it shows up in the norms and the
/// convergence query.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EquationSystemError {
    /// Field registration or lookup failed.
    #[error(transparent)]
    Field(#[from] FieldError),
    /// Part resolution failed.
    #[error(transparent)]
    Mesh(#[from] MeshError),
    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A hook was called before the state it depends on exists.
    #[error("equation system '{system}' not ready: {reason}")]
    NotReady {
        /// System name.
        system: String,
        /// What is missing.
        reason: String,
    },
    /// An algorithm failed while executing.
    #[error("algorithm '{name}' failed: {reason}")]
    AlgorithmFailed {
        /// Algorithm name.
        name: String,
        /// Failure description.
        reason: String,
    },
    /// The linear-system back end failed.
    #[error("linear system '{system}' failed: {reason}")]
    LinearSolve {
        /// Linear-system name.
        system: String,
        /// Failure description.
        reason: String,
    },
}
