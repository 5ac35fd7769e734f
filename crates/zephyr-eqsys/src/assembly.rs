//! Solver algorithms: contributions to a system's linear operator.
//!
//! Physical discretization kernels live outside this workspace. The two
//! assemblies here are enough to advance a nodal dof in time: a
//! backward-Euler mass term with an optional constant source, and
//! Dirichlet rows from boundary data.

use zephyr_core::{EntityRank, FieldId, FieldState, PartId};
use zephyr_mesh::MeshDatabase;

use crate::error::EquationSystemError;
use crate::linsys::LinearSystem;
use crate::realm::Realm;

/// An assembly step run by [`assemble_and_solve`](crate::update::assemble_and_solve).
pub trait SolverAlgorithm: Send {
    /// Name for logging and error reporting.
    fn name(&self) -> &str;

    /// Sum this algorithm's rows into `linsys`.
    fn execute(
        &mut self,
        realm: &Realm,
        linsys: &mut dyn LinearSystem,
    ) -> Result<(), EquationSystemError>;
}

fn nodal_real<'m>(
    mesh: &'m MeshDatabase,
    field: FieldId,
    alg: &str,
) -> Result<&'m [f64], EquationSystemError> {
    mesh.real(field)
        .ok_or_else(|| EquationSystemError::AlgorithmFailed {
            name: alg.to_string(),
            reason: format!("field #{field} has no real storage"),
        })
}

// ── TimeTermAssembly ───────────────────────────────────────────────

/// Backward-Euler mass term for a nodal dof.
///
/// Row per node and component: `diag = V / dt`,
/// `rhs = diag * (phi_N - phi_NP1) + source * V`, where `V` is
/// `dual_nodal_volume`. A single-state field uses `phi_NP1` for `phi_N`.
#[derive(Clone, Debug)]
pub struct TimeTermAssembly {
    name: String,
    field: FieldId,
    parts: Vec<PartId>,
    source: Option<Vec<f64>>,
}

impl TimeTermAssembly {
    /// Mass term for `field` on `parts`, with an optional constant source.
    pub fn new(field: FieldId, parts: Vec<PartId>, source: Option<Vec<f64>>) -> Self {
        Self {
            name: format!("time_term_{field}"),
            field,
            parts,
            source,
        }
    }

    /// Add `parts` to the assembled region.
    pub fn extend_parts(&mut self, parts: &[PartId]) {
        for &p in parts {
            if !self.parts.contains(&p) {
                self.parts.push(p);
            }
        }
    }
}

impl SolverAlgorithm for TimeTermAssembly {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(
        &mut self,
        realm: &Realm,
        linsys: &mut dyn LinearSystem,
    ) -> Result<(), EquationSystemError> {
        let mesh = realm.mesh();
        let dt = realm.time().dt;
        let volume_id = mesh
            .get_field(EntityRank::Node, "dual_nodal_volume")
            .ok_or_else(|| EquationSystemError::AlgorithmFailed {
                name: self.name.clone(),
                reason: "dual_nodal_volume is not registered".to_string(),
            })?;
        let volume = nodal_real(mesh, volume_id, &self.name)?;
        let n = linsys.num_dof();
        let np1 = nodal_real(mesh, self.field, &self.name)?;
        let old = match mesh.field_of_state(self.field, FieldState::N) {
            Ok(id) => nodal_real(mesh, id, &self.name)?,
            Err(_) => np1,
        };

        for e in mesh.selected_entities(EntityRank::Node, &self.parts) {
            let v = volume.get(e).copied().unwrap_or(0.0);
            let diag = v / dt;
            for c in 0..n {
                let i = e * n + c;
                let (Some(&phi_n), Some(&phi_np1)) = (old.get(i), np1.get(i)) else {
                    continue;
                };
                let src = self
                    .source
                    .as_ref()
                    .and_then(|s| s.get(c).or(s.last()))
                    .copied()
                    .unwrap_or(0.0);
                linsys.sum_into(e, c, diag, diag * (phi_n - phi_np1) + src * v);
            }
        }
        Ok(())
    }
}

// ── DirichletAssembly ──────────────────────────────────────────────

/// Pins a nodal dof to boundary data: `delta = bc - phi_NP1` on every
/// node of the boundary parts.
#[derive(Clone, Debug)]
pub struct DirichletAssembly {
    name: String,
    bc_field: FieldId,
    field: FieldId,
    parts: Vec<PartId>,
}

impl DirichletAssembly {
    /// Pin `field` to `bc_field` on `parts`.
    pub fn new(bc_field: FieldId, field: FieldId, parts: Vec<PartId>) -> Self {
        Self {
            name: format!("dirichlet_{field}"),
            bc_field,
            field,
            parts,
        }
    }
}

impl SolverAlgorithm for DirichletAssembly {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(
        &mut self,
        realm: &Realm,
        linsys: &mut dyn LinearSystem,
    ) -> Result<(), EquationSystemError> {
        let mesh = realm.mesh();
        let n = linsys.num_dof();
        let bc = nodal_real(mesh, self.bc_field, &self.name)?;
        let phi = nodal_real(mesh, self.field, &self.name)?;
        for e in mesh.selected_entities(EntityRank::Node, &self.parts) {
            for c in 0..n {
                let i = e * n + c;
                if let (Some(&b), Some(&p)) = (bc.get(i), phi.get(i)) {
                    linsys.set_dirichlet(e, c, b - p);
                }
            }
        }
        Ok(())
    }
}
