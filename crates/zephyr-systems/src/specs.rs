//! Field names of each transported dof.

/// Catalog names a transported dof registers and solves with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransportSpec {
    /// System name, e.g. `MomentumEQS`.
    pub name: &'static str,
    /// Solved field; also the key of its solver block.
    pub dof: &'static str,
    /// Linear-solve increment.
    pub delta: &'static str,
    /// Boundary data for Dirichlet conditions.
    pub bc: &'static str,
    /// Nodal gradient, if the system carries one.
    pub gradient: Option<&'static str>,
    /// Effective diffusivity, if the system carries one.
    pub diffusivity: Option<&'static str>,
    /// Dirichlet value on walls when the input gives none.
    pub wall_value: Option<f64>,
}

/// Momentum: velocity, no-slip walls.
pub const MOMENTUM: TransportSpec = TransportSpec {
    name: "MomentumEQS",
    dof: "velocity",
    delta: "u_delta",
    bc: "velocity_bc",
    gradient: Some("dudx"),
    diffusivity: Some("effective_viscosity_u"),
    wall_value: Some(0.0),
};

/// Continuity: pressure.
pub const CONTINUITY: TransportSpec = TransportSpec {
    name: "ContinuityEQS",
    dof: "pressure",
    delta: "p_delta",
    bc: "pressure_bc",
    gradient: Some("dpdx"),
    diffusivity: None,
    wall_value: None,
};

/// Static enthalpy.
pub const ENTHALPY: TransportSpec = TransportSpec {
    name: "EnthalpyEQS",
    dof: "enthalpy",
    delta: "h_delta",
    bc: "enthalpy_bc",
    gradient: Some("dhdx"),
    diffusivity: Some("effective_viscosity_h"),
    wall_value: None,
};

/// Solid conduction.
pub const HEAT_CONDUCTION: TransportSpec = TransportSpec {
    name: "HeatCondEQS",
    dof: "temperature",
    delta: "temperature_delta",
    bc: "temperature_bc",
    gradient: Some("dtdx"),
    diffusivity: Some("thermal_conductivity"),
    wall_value: None,
};

/// Turbulent kinetic energy, zero on walls.
pub const TURBULENT_KE: TransportSpec = TransportSpec {
    name: "TurbKineticEnergyEQS",
    dof: "turbulent_ke",
    delta: "tke_delta",
    bc: "turbulent_ke_bc",
    gradient: Some("dkdx"),
    diffusivity: Some("effective_viscosity_tke"),
    wall_value: Some(0.0),
};

/// Specific dissipation rate (omega).
pub const SPECIFIC_DISSIPATION_RATE: TransportSpec = TransportSpec {
    name: "SpecDissRateEQS",
    dof: "specific_dissipation_rate",
    delta: "sdr_delta",
    bc: "specific_dissipation_rate_bc",
    gradient: Some("dwdx"),
    diffusivity: Some("effective_viscosity_sdr"),
    wall_value: None,
};

/// Total dissipation rate (epsilon).
pub const TOTAL_DISSIPATION_RATE: TransportSpec = TransportSpec {
    name: "TotDissRateEQS",
    dof: "total_dissipation_rate",
    delta: "tdr_delta",
    bc: "total_dissipation_rate_bc",
    gradient: Some("dedx"),
    diffusivity: Some("effective_viscosity_tdr"),
    wall_value: None,
};

/// Volume fraction.
pub const VOLUME_OF_FLUID: TransportSpec = TransportSpec {
    name: "VolumeOfFluidEQS",
    dof: "volume_of_fluid",
    delta: "vof_delta",
    bc: "volume_of_fluid_bc",
    gradient: Some("dvofdx"),
    diffusivity: None,
    wall_value: None,
};

/// Wall-distance potential, zero on walls.
pub const WALL_DISTANCE: TransportSpec = TransportSpec {
    name: "WallDistEQS",
    dof: "wall_distance_phi",
    delta: "wall_distance_phi_delta",
    bc: "wall_distance_phi_bc",
    gradient: Some("dwalldistdx"),
    diffusivity: None,
    wall_value: Some(0.0),
};

/// Every spec, for catalog checks.
pub const ALL: [TransportSpec; 9] = [
    MOMENTUM,
    CONTINUITY,
    ENTHALPY,
    HEAT_CONDUCTION,
    TURBULENT_KE,
    SPECIFIC_DISSIPATION_RATE,
    TOTAL_DISSIPATION_RATE,
    VOLUME_OF_FLUID,
    WALL_DISTANCE,
];

#[cfg(test)]
mod tests {
    use super::*;
    use zephyr_fields::FieldRegistry;

    #[test]
    fn every_spec_name_is_in_the_catalog() {
        let reg = FieldRegistry::get(3, 2).unwrap();
        for spec in ALL {
            for name in [spec.dof, spec.delta, spec.bc]
                .into_iter()
                .chain(spec.gradient)
                .chain(spec.diffusivity)
            {
                assert!(reg.contains(name), "{} missing {name}", spec.name);
            }
        }
    }
}
