//! [`CoupledEquationSystem`]: a wrapper that sequences child systems.
//!
//! The wrapper holds no linear system of its own. Low-Mach flow wraps
//! momentum and continuity; two-equation turbulence models wrap their
//! two transported quantities and close the turbulent viscosity after
//! each pass.

use indexmap::IndexMap;
use zephyr_core::{FieldId, PartId, Topology};
use zephyr_eqsys::{
    BoundaryConditionData, EquationSystem, EquationSystemCore, EquationSystemError, KindOptions,
    Lifecycle, PostProcessingData, Realm, SolverSpecification, SystemConfig,
};
use zephyr_fields::FieldOverrides;

use crate::specs;
use crate::transport::{DerivedUpdate, TransportEquationSystem};

/// Lower bound for dissipation variables in the viscosity closure.
const DISSIPATION_FLOOR: f64 = 1.0e-16;

/// `C_mu` of the k-epsilon model.
const C_MU: f64 = 0.09;

/// Turbulent-viscosity closure run after the children solve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Closure {
    /// No closure.
    None,
    /// `mu_t = rho * k / omega`.
    KOmega,
    /// `mu_t = C_mu * rho * k^2 / epsilon`.
    KEpsilon,
}

/// How continuity carries mass flux.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MassFlux {
    /// Per sub-control surface on elements (`mass_flow_rate_scs`).
    Element,
    /// Per edge (`mass_flow_rate`).
    Edge,
}

/// Sub-control surfaces of an element topology.
pub fn num_sub_control_surfaces(topology: Topology) -> u32 {
    match topology {
        Topology::Tri3 => 3,
        Topology::Quad4 => 4,
        Topology::Tet4 => 6,
        Topology::Pyramid5 => 8,
        Topology::Wedge6 => 9,
        Topology::Hex8 => 12,
        _ => 1,
    }
}

/// A composite of transport systems.
#[derive(Debug)]
pub struct CoupledEquationSystem {
    core: EquationSystemCore,
    children: Vec<TransportEquationSystem>,
    closure: Closure,
    mass_flux: Option<MassFlux>,
    properties: Vec<(&'static str, f64)>,
    fields: IndexMap<&'static str, FieldId>,
}

impl CoupledEquationSystem {
    /// A wrapper named `name` around `children`.
    pub fn new(
        name: &str,
        eqn_type_name: &str,
        config: &SystemConfig,
        children: Vec<TransportEquationSystem>,
    ) -> Self {
        let mut core = EquationSystemCore::new(name, eqn_type_name, "undefined");
        core.apply_config(config);
        Self {
            core,
            children,
            closure: Closure::None,
            mass_flux: None,
            properties: Vec::new(),
            fields: IndexMap::new(),
        }
    }

    /// Momentum and continuity for low-Mach flow.
    pub fn low_mach(
        config: &SystemConfig,
        realm: &Realm,
        solvers: &SolverSpecification,
    ) -> Result<Self, EquationSystemError> {
        let child = child_config(config);
        let children = vec![
            TransportEquationSystem::new(specs::MOMENTUM, &child, realm, solvers)?,
            TransportEquationSystem::new(specs::CONTINUITY, &child, realm, solvers)?,
        ];
        let element_continuity = match config.options {
            KindOptions::LowMach {
                element_continuity_eqs: Some(e),
            } => e,
            _ => !realm.uses_edges(),
        };
        let mut sys = Self::new("LowMachEOM", "LowMachEOM", config, children);
        sys.mass_flux = Some(if element_continuity {
            MassFlux::Element
        } else {
            MassFlux::Edge
        });
        sys.properties = vec![("density", 1.0), ("viscosity", 1.8e-5)];
        Ok(sys)
    }

    /// SST: k and omega with blending.
    pub fn shear_stress_transport(
        config: &SystemConfig,
        realm: &Realm,
        solvers: &SolverSpecification,
    ) -> Result<Self, EquationSystemError> {
        let mut sys = Self::two_equation(
            "ShearStressTransportWrap",
            config,
            realm,
            solvers,
            specs::SPECIFIC_DISSIPATION_RATE,
            Closure::KOmega,
        )?;
        sys.properties.push(("sst_f_one_blending", 1.0));
        Ok(sys)
    }

    /// Wilcox k-omega.
    pub fn wilcox_k_omega(
        config: &SystemConfig,
        realm: &Realm,
        solvers: &SolverSpecification,
    ) -> Result<Self, EquationSystemError> {
        Self::two_equation(
            "WilcoxKOmegaWrap",
            config,
            realm,
            solvers,
            specs::SPECIFIC_DISSIPATION_RATE,
            Closure::KOmega,
        )
    }

    /// Chien k-epsilon.
    pub fn chien_k_epsilon(
        config: &SystemConfig,
        realm: &Realm,
        solvers: &SolverSpecification,
    ) -> Result<Self, EquationSystemError> {
        Self::two_equation(
            "ChienKEpsilonWrap",
            config,
            realm,
            solvers,
            specs::TOTAL_DISSIPATION_RATE,
            Closure::KEpsilon,
        )
    }

    fn two_equation(
        name: &str,
        config: &SystemConfig,
        realm: &Realm,
        solvers: &SolverSpecification,
        dissipation: specs::TransportSpec,
        closure: Closure,
    ) -> Result<Self, EquationSystemError> {
        let child = child_config(config);
        let positive = DerivedUpdate::Clip {
            min: 0.0,
            max: f64::MAX,
        };
        let floor = DerivedUpdate::Clip {
            min: DISSIPATION_FLOOR,
            max: f64::MAX,
        };
        let children = vec![
            TransportEquationSystem::new(specs::TURBULENT_KE, &child, realm, solvers)?
                .with_derived(positive),
            TransportEquationSystem::new(dissipation, &child, realm, solvers)?.with_derived(floor),
        ];
        let mut sys = Self::new(name, config.kind.tag(), config, children);
        sys.closure = closure;
        sys.properties = vec![("density", 1.0), ("turbulent_viscosity", 0.0)];
        Ok(sys)
    }

    /// The wrapped systems.
    pub fn children(&self) -> &[TransportEquationSystem] {
        &self.children
    }

    /// The turbulent-viscosity closure.
    pub fn closure(&self) -> Closure {
        self.closure
    }

    /// Mass-flux layout of a low-Mach wrapper.
    pub fn mass_flux(&self) -> Option<MassFlux> {
        self.mass_flux
    }

    fn for_children(
        &mut self,
        mut f: impl FnMut(&mut TransportEquationSystem) -> Result<(), EquationSystemError>,
    ) -> Result<(), EquationSystemError> {
        for child in self.children.iter_mut() {
            f(child)?;
        }
        Ok(())
    }

    fn compute_turbulent_viscosity(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        if self.closure == Closure::None {
            return Ok(());
        }
        let (Some(k), Some(d)) = (
            self.children.first().and_then(|c| c.field()),
            self.children.get(1).and_then(|c| c.field()),
        ) else {
            return Ok(());
        };
        let (Some(&rho), Some(&mu_t)) = (
            self.fields.get("density"),
            self.fields.get("turbulent_viscosity"),
        ) else {
            return Ok(());
        };
        let mesh = realm.mesh_mut();
        let read = |id: FieldId| mesh.real(id).map(<[f64]>::to_vec).unwrap_or_default();
        let (k, d, rho) = (read(k), read(d), read(rho));
        let closure = self.closure;
        if let Some(out) = mesh.real_mut(mu_t) {
            for (i, m) in out.iter_mut().enumerate() {
                let (Some(&k), Some(&d), Some(&r)) = (k.get(i), d.get(i), rho.get(i)) else {
                    continue;
                };
                let d = d.max(DISSIPATION_FLOOR);
                *m = match closure {
                    Closure::KOmega => r * k / d,
                    Closure::KEpsilon => C_MU * r * k * k / d,
                    Closure::None => *m,
                };
            }
        }
        Ok(())
    }
}

fn child_config(config: &SystemConfig) -> SystemConfig {
    let mut child = config.clone();
    child.name = None;
    child.max_iterations = 1;
    child.options = KindOptions::None;
    child
}

impl EquationSystem for CoupledEquationSystem {
    fn core(&self) -> &EquationSystemCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EquationSystemCore {
        &mut self.core
    }

    fn register_nodal_fields(
        &mut self,
        realm: &mut Realm,
        part: PartId,
    ) -> Result<(), EquationSystemError> {
        let fm = realm.field_manager();
        for &(name, init) in &self.properties {
            let overrides = FieldOverrides {
                init: Some(vec![init]),
                ..FieldOverrides::default()
            };
            let id = fm
                .register_field_with(realm.mesh_mut(), name, &[part], &overrides)?
                .id();
            self.fields.insert(name, id);
        }
        self.for_children(|c| {
            c.register_nodal_fields(realm, part)?;
            c.core_mut().set_lifecycle(Lifecycle::FieldsRegistered);
            Ok(())
        })
    }

    fn register_edge_fields(
        &mut self,
        realm: &mut Realm,
        part: PartId,
    ) -> Result<(), EquationSystemError> {
        if self.mass_flux == Some(MassFlux::Edge) {
            let fm = realm.field_manager();
            let none = FieldOverrides::default();
            for name in ["mass_flow_rate", "edge_area_vector"] {
                let id = fm
                    .register_field_with(realm.mesh_mut(), name, &[part], &none)?
                    .id();
                self.fields.insert(name, id);
            }
        }
        self.for_children(|c| c.register_edge_fields(realm, part))
    }

    fn register_element_fields(
        &mut self,
        realm: &mut Realm,
        part: PartId,
        topology: Topology,
    ) -> Result<(), EquationSystemError> {
        if self.mass_flux == Some(MassFlux::Element) {
            let fm = realm.field_manager();
            let overrides = FieldOverrides {
                num_components: Some(num_sub_control_surfaces(topology)),
                ..FieldOverrides::default()
            };
            let id = fm
                .register_field_with(realm.mesh_mut(), "mass_flow_rate_scs", &[part], &overrides)?
                .id();
            self.fields.insert("mass_flow_rate_scs", id);
        }
        self.for_children(|c| c.register_element_fields(realm, part, topology))
    }

    fn register_interior_algorithm(
        &mut self,
        realm: &mut Realm,
        part: PartId,
    ) -> Result<(), EquationSystemError> {
        self.for_children(|c| c.register_interior_algorithm(realm, part))
    }

    fn register_wall_bc(
        &mut self,
        realm: &mut Realm,
        part: PartId,
        topology: Topology,
        data: &BoundaryConditionData,
    ) -> Result<(), EquationSystemError> {
        self.for_children(|c| c.register_wall_bc(realm, part, topology, data))
    }

    fn register_inflow_bc(
        &mut self,
        realm: &mut Realm,
        part: PartId,
        topology: Topology,
        data: &BoundaryConditionData,
    ) -> Result<(), EquationSystemError> {
        self.for_children(|c| c.register_inflow_bc(realm, part, topology, data))
    }

    fn register_open_bc(
        &mut self,
        realm: &mut Realm,
        part: PartId,
        topology: Topology,
        data: &BoundaryConditionData,
    ) -> Result<(), EquationSystemError> {
        self.for_children(|c| c.register_open_bc(realm, part, topology, data))
    }

    fn register_symmetry_bc(
        &mut self,
        realm: &mut Realm,
        part: PartId,
        topology: Topology,
        data: &BoundaryConditionData,
    ) -> Result<(), EquationSystemError> {
        self.for_children(|c| c.register_symmetry_bc(realm, part, topology, data))
    }

    fn register_abltop_bc(
        &mut self,
        realm: &mut Realm,
        part: PartId,
        topology: Topology,
        data: &BoundaryConditionData,
    ) -> Result<(), EquationSystemError> {
        self.for_children(|c| c.register_abltop_bc(realm, part, topology, data))
    }

    fn register_non_conformal_bc(
        &mut self,
        realm: &mut Realm,
        part: PartId,
        topology: Topology,
    ) -> Result<(), EquationSystemError> {
        self.for_children(|c| c.register_non_conformal_bc(realm, part, topology))
    }

    fn register_overset_bc(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.for_children(|c| c.register_overset_bc(realm))
    }

    fn register_surface_pp_algorithm(
        &mut self,
        realm: &mut Realm,
        data: &PostProcessingData,
        parts: &[PartId],
    ) -> Result<(), EquationSystemError> {
        for &p in parts {
            if !self.core.surface_pp_parts.contains(&p) {
                self.core.surface_pp_parts.push(p);
            }
        }
        self.for_children(|c| c.register_surface_pp_algorithm(realm, data, parts))
    }

    fn register_initial_condition_fcn(
        &mut self,
        realm: &mut Realm,
        part: PartId,
        functions: &IndexMap<String, String>,
        params: &IndexMap<String, Vec<f64>>,
    ) -> Result<(), EquationSystemError> {
        self.for_children(|c| c.register_initial_condition_fcn(realm, part, functions, params))
    }

    fn initialize(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.for_children(|c| {
            c.initialize(realm)?;
            c.core_mut().set_lifecycle(Lifecycle::Initialized);
            Ok(())
        })
    }

    fn reinitialize_linear_system(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.for_children(|c| c.reinitialize_linear_system(realm))
    }

    fn populate_derived_quantities(
        &mut self,
        realm: &mut Realm,
    ) -> Result<(), EquationSystemError> {
        self.for_children(|c| c.populate_derived_quantities(realm))
    }

    fn initial_work(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        zephyr_eqsys::run_all(&mut self.core.initial_condition_algorithms, realm)?;
        self.for_children(|c| c.initial_work(realm))?;
        self.compute_turbulent_viscosity(realm)
    }

    fn populate_boundary_data(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        zephyr_eqsys::run_all(&mut self.core.bc_data_algorithms, realm)?;
        self.for_children(|c| c.populate_boundary_data(realm))
    }

    fn boundary_data_to_state_data(
        &mut self,
        realm: &mut Realm,
    ) -> Result<(), EquationSystemError> {
        zephyr_eqsys::run_all(&mut self.core.bc_data_map_algorithms, realm)?;
        self.for_children(|c| c.boundary_data_to_state_data(realm))
    }

    fn evaluate_properties(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        zephyr_eqsys::run_all(&mut self.core.property_algorithms, realm)?;
        self.for_children(|c| c.evaluate_properties(realm))
    }

    fn pre_timestep_work(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.for_children(|c| c.pre_timestep_work(realm))
    }

    fn predict_state(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.for_children(|c| c.predict_state(realm))
    }

    fn solve_and_update(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        for _ in 0..self.core.max_iterations {
            for child in self.children.iter_mut() {
                child.pre_iter_work(realm)?;
                child.solve_and_update(realm)?;
                child.post_iter_work(realm)?;
            }
            self.compute_turbulent_viscosity(realm)?;
        }
        Ok(())
    }

    fn post_iter_work_dep(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.for_children(|c| c.post_iter_work_dep(realm))
    }

    fn post_converged_work(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.for_children(|c| c.post_converged_work(realm))
    }

    fn post_adapt_work(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.for_children(|c| c.post_adapt_work(realm))
    }

    fn provide_output(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.for_children(|c| c.provide_output(realm))
    }

    fn dump_eq_time(&self) {
        log::info!("{}: wrapper of {} systems", self.core.user_name, self.children.len());
        for child in &self.children {
            child.dump_eq_time();
        }
    }

    fn system_is_converged(&mut self) -> bool {
        let mut converged = true;
        for child in self.children.iter_mut() {
            converged &= child.system_is_converged();
        }
        self.core.record_convergence(converged);
        converged
    }

    fn provide_scaled_norm(&self) -> f64 {
        self.children
            .iter()
            .map(|c| c.provide_scaled_norm())
            .fold(0.0, f64::max)
    }

    // Each child counts in the mean system norm as a system of its own.
    fn provide_norm(&self) -> f64 {
        self.children.iter().map(|c| c.provide_norm()).sum()
    }

    fn provide_norm_increment(&self) -> f64 {
        self.children
            .iter()
            .map(|c| c.provide_norm_increment())
            .sum()
    }

    fn sub_systems(&self) -> Vec<&dyn EquationSystem> {
        self.children
            .iter()
            .map(|c| c as &dyn EquationSystem)
            .collect()
    }

    fn sub_systems_mut(&mut self) -> Vec<&mut dyn EquationSystem> {
        self.children
            .iter_mut()
            .map(|c| c as &mut dyn EquationSystem)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scs_counts_follow_topology() {
        assert_eq!(num_sub_control_surfaces(Topology::Hex8), 12);
        assert_eq!(num_sub_control_surfaces(Topology::Tet4), 6);
        assert_eq!(num_sub_control_surfaces(Topology::Quad4), 4);
    }

    #[test]
    fn child_config_keeps_overset_flags_but_not_the_name() {
        let mut cfg = SystemConfig::new(zephyr_eqsys::EquationSystemKind::LowMachEOM);
        cfg.name = Some("myLowMach".into());
        cfg.max_iterations = 4;
        cfg.decoupled_overset_solve = true;
        let child = child_config(&cfg);
        assert_eq!(child.name, None);
        assert_eq!(child.max_iterations, 1);
        assert!(child.decoupled_overset_solve);
        assert_eq!(child.options, KindOptions::None);
    }
}
