//! The overset-exchange collaborator.

use zephyr_core::FieldId;
use zephyr_mesh::MeshDatabase;

use crate::error::EquationSystemError;

/// Interpolates fringe values between overlapping meshes.
///
/// The realm owns at most one exchange. The orchestrator's fringe driver
/// calls [`update_fringe`](Self::update_fringe) once per registered field
/// at the start of every nonlinear pass.
pub trait OversetExchange: Send {
    /// Name for logging.
    fn name(&self) -> &str {
        "overset"
    }

    /// Refresh the fringe values of `field`, treated as an
    /// `nrows x ncols` block per entity.
    fn update_fringe(
        &mut self,
        mesh: &mut MeshDatabase,
        field: FieldId,
        nrows: usize,
        ncols: usize,
    ) -> Result<(), EquationSystemError>;
}

/// Exchange that touches nothing. Stands in for meshes without fringe
/// connectivity, e.g. when overset is declared only to select the
/// solution strategy.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFringeExchange;

impl OversetExchange for NoFringeExchange {
    fn name(&self) -> &str {
        "no_fringe"
    }

    fn update_fringe(
        &mut self,
        _mesh: &mut MeshDatabase,
        _field: FieldId,
        _nrows: usize,
        _ncols: usize,
    ) -> Result<(), EquationSystemError> {
        Ok(())
    }
}
