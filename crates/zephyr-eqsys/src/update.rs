//! Assemble-solve-update helpers shared by the concrete systems.

use std::time::Instant;

use zephyr_core::{EntityRank, FieldId};
use zephyr_mesh::MeshDatabase;

use crate::error::EquationSystemError;
use crate::realm::Realm;
use crate::system::EquationSystemCore;

/// Damped update `field = field_frac * field + delta_frac * delta` over
/// the `rank` entities of the parts `field` is defined on.
///
/// `delta` and `field` share a layout of `components` values per entity.
pub fn solution_update(
    mesh: &mut MeshDatabase,
    delta_frac: f64,
    delta: FieldId,
    field_frac: f64,
    field: FieldId,
    components: usize,
    rank: EntityRank,
) -> Result<(), EquationSystemError> {
    let parts = mesh
        .schema(field)
        .map(|s| s.parts().to_vec())
        .unwrap_or_default();
    let entities = mesh.selected_entities(rank, &parts);
    let delta_values = mesh
        .real(delta)
        .map(<[f64]>::to_vec)
        .ok_or_else(|| EquationSystemError::AlgorithmFailed {
            name: "solution_update".to_string(),
            reason: format!("delta field #{delta} has no real storage"),
        })?;
    let values = mesh
        .real_mut(field)
        .ok_or_else(|| EquationSystemError::AlgorithmFailed {
            name: "solution_update".to_string(),
            reason: format!("field #{field} has no real storage"),
        })?;
    for e in entities {
        for c in 0..components {
            let i = e * components + c;
            if let (Some(v), Some(&d)) = (values.get_mut(i), delta_values.get(i)) {
                *v = field_frac * *v + delta_frac * d;
            }
        }
    }
    Ok(())
}

/// Zero the system, run the solver algorithms, solve into `delta`, and
/// record timings and linear iteration counts in `core`.
pub fn assemble_and_solve(
    core: &mut EquationSystemCore,
    realm: &mut Realm,
    delta: FieldId,
) -> Result<(), EquationSystemError> {
    let linsys = core
        .linsys
        .as_deref_mut()
        .ok_or_else(|| EquationSystemError::NotReady {
            system: core.name.clone(),
            reason: "no linear system".to_string(),
        })?;

    let start = Instant::now();
    linsys.zero_system();
    for alg in core.solver_algorithms.iter_mut() {
        alg.execute(realm, linsys)?;
    }
    core.timers.assemble += start.elapsed();

    let start = Instant::now();
    linsys.load_complete();
    core.timers.load_complete += start.elapsed();

    let start = Instant::now();
    let buffer = realm
        .mesh_mut()
        .real_mut(delta)
        .ok_or_else(|| EquationSystemError::NotReady {
            system: core.name.clone(),
            reason: format!("delta field #{delta} has no real storage"),
        })?;
    let summary = linsys.solve(buffer)?;
    core.timers.solve += start.elapsed();

    core.statistics.update(summary.iterations);
    log::debug!(
        "{:<22} linear iterations: {:>4}  residual: {:.6e}  scaled: {:.6e}",
        linsys.name(),
        summary.iterations,
        summary.residual,
        linsys.scaled_nonlinear_residual()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zephyr_core::{FieldState, FieldType, PartId, ScalarField};

    #[test]
    fn relaxed_update_blends_field_and_delta() {
        let mut mesh = MeshDatabase::new(3);
        mesh.set_entity_count(EntityRank::Node, 2);
        let mut realm = Realm::new(mesh, 2).unwrap();
        let fm = realm.field_manager();
        let p: ScalarField = fm
            .register_field(
                realm.mesh_mut(),
                "pressure",
                &[PartId::UNIVERSAL],
                Some(&[4.0]),
                FieldState::NONE,
            )
            .unwrap();
        let dp: ScalarField = fm
            .register_field(
                realm.mesh_mut(),
                "p_delta",
                &[PartId::UNIVERSAL],
                Some(&[2.0]),
                FieldState::NONE,
            )
            .unwrap();
        solution_update(
            realm.mesh_mut(),
            0.5,
            dp.id(),
            1.0,
            p.id(),
            1,
            EntityRank::Node,
        )
        .unwrap();
        assert_eq!(realm.mesh().real(p.id()).unwrap(), &[5.0, 5.0]);
    }
}
