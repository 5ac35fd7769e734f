//! Construction of concrete systems from resolved configuration.

use zephyr_eqsys::{
    EquationSystem, EquationSystemError, EquationSystemFactory, EquationSystemKind, Realm,
    SolverSpecification, SystemConfig,
};

use crate::coupled::CoupledEquationSystem;
use crate::transport::TransportEquationSystem;

/// Builds every kind in [`EquationSystemKind::ALL`].
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardFactory;

impl EquationSystemFactory for StandardFactory {
    fn create(
        &self,
        config: &SystemConfig,
        realm: &Realm,
        solvers: &SolverSpecification,
    ) -> Result<Box<dyn EquationSystem>, EquationSystemError> {
        log::debug!("constructing {} system", config.kind);
        let system: Box<dyn EquationSystem> = match config.kind {
            EquationSystemKind::LowMachEOM => {
                Box::new(CoupledEquationSystem::low_mach(config, realm, solvers)?)
            }
            EquationSystemKind::ShearStressTransport => Box::new(
                CoupledEquationSystem::shear_stress_transport(config, realm, solvers)?,
            ),
            EquationSystemKind::WilcoxKOmega => {
                Box::new(CoupledEquationSystem::wilcox_k_omega(config, realm, solvers)?)
            }
            EquationSystemKind::ChienKEpsilon => {
                Box::new(CoupledEquationSystem::chien_k_epsilon(config, realm, solvers)?)
            }
            EquationSystemKind::VolumeOfFluid => {
                Box::new(TransportEquationSystem::volume_of_fluid(config, realm, solvers)?)
            }
            EquationSystemKind::TurbKineticEnergy => Box::new(
                TransportEquationSystem::turbulent_kinetic_energy(config, realm, solvers)?,
            ),
            EquationSystemKind::Enthalpy => {
                Box::new(TransportEquationSystem::enthalpy(config, realm, solvers)?)
            }
            EquationSystemKind::HeatConduction => {
                Box::new(TransportEquationSystem::heat_conduction(config, realm, solvers)?)
            }
            EquationSystemKind::WallDistance => {
                Box::new(TransportEquationSystem::wall_distance(config, realm, solvers)?)
            }
        };
        Ok(system)
    }
}
