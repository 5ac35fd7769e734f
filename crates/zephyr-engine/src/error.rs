//! Errors at the orchestrator boundary.

use zephyr_core::{FieldError, MeshError};
use zephyr_eqsys::{ConfigError, EquationSystemError};

/// Errors raised by [`EquationSystems`](crate::EquationSystems) and
/// [`Simulation`](crate::Simulation).
///
/// Every variant is fatal to the run. Non-convergence is not an error; it
/// is reported in [`TimestepReport`](crate::TimestepReport).
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// Input could not be loaded or resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A part name or rank check failed.
    #[error(transparent)]
    Mesh(#[from] MeshError),
    /// Field registration failed outside any equation system.
    #[error(transparent)]
    Field(#[from] FieldError),
    /// An equation system hook failed.
    #[error(transparent)]
    EquationSystem(#[from] EquationSystemError),
    /// A phase was entered before the phase it depends on.
    #[error("equation systems not ready: {reason}")]
    NotReady {
        /// What has not happened yet.
        reason: String,
    },
}
