//! [`TransportEquationSystem`]: one nodal dof with its own linear system.
//!
//! Every solved variable in the workspace is an instance of this type,
//! parameterized by a [`TransportSpec`] and an optional
//! [`DerivedUpdate`] applied after all systems of a pass have solved.

use indexmap::IndexMap;
use zephyr_core::{EntityRank, FieldId, FieldState, PartId, Topology};
use zephyr_eqsys::{
    assemble_and_solve, run_all, solution_update, BoundaryConditionData, ConstantFieldAlgorithm,
    CopyFieldAlgorithm, CopyStateAlgorithm, DirichletAssembly, EquationSystem,
    EquationSystemCore, EquationSystemError, KindOptions, Realm, SolverSpecification,
    SystemConfig, TimeTermAssembly, UserFunction, UserFunctionAlgorithm,
};
use zephyr_fields::FieldOverrides;

use crate::specs::{self, TransportSpec};

/// Post-solve work on the solved field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DerivedUpdate {
    /// Nothing.
    None,
    /// Clamp the dof into `[min, max]`.
    Clip {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// `temperature = enthalpy / specific_heat`, clipped.
    TemperatureFromEnthalpy {
        /// Lower temperature bound.
        min: f64,
        /// Upper temperature bound.
        max: f64,
        /// Log how many nodes were clipped.
        diagnostic: bool,
    },
    /// `minimum_distance_to_wall = sqrt(2 * phi)`.
    WallDistance,
}

/// A single transported dof.
#[derive(Debug)]
pub struct TransportEquationSystem {
    core: EquationSystemCore,
    spec: TransportSpec,
    num_dof: usize,
    derived: DerivedUpdate,
    solve_once: bool,
    solved: bool,
    time_term_added: bool,
    interior_parts: Vec<PartId>,
    field: Option<FieldId>,
    delta: Option<FieldId>,
    auxiliary: IndexMap<&'static str, FieldId>,
}

impl TransportEquationSystem {
    /// Build a system for `spec`, creating its linear system from the
    /// solver block mapped to the dof.
    pub fn new(
        spec: TransportSpec,
        config: &SystemConfig,
        realm: &Realm,
        solvers: &SolverSpecification,
    ) -> Result<Self, EquationSystemError> {
        let num_dof = realm.field_manager().descriptor(spec.dof)?.num_components as usize;
        let mut core = EquationSystemCore::new(spec.name, spec.name, spec.dof);
        core.apply_config(config);
        core.create_linear_system(realm, solvers, num_dof)?;
        Ok(Self {
            core,
            spec,
            num_dof,
            derived: DerivedUpdate::None,
            solve_once: false,
            solved: false,
            time_term_added: false,
            interior_parts: Vec::new(),
            field: None,
            delta: None,
            auxiliary: IndexMap::new(),
        })
    }

    /// Enthalpy with temperature extraction.
    pub fn enthalpy(
        config: &SystemConfig,
        realm: &Realm,
        solvers: &SolverSpecification,
    ) -> Result<Self, EquationSystemError> {
        let derived = match config.options {
            KindOptions::Enthalpy {
                minimum_temperature,
                maximum_temperature,
                output_clipping_diagnostic,
            } => DerivedUpdate::TemperatureFromEnthalpy {
                min: minimum_temperature,
                max: maximum_temperature,
                diagnostic: output_clipping_diagnostic,
            },
            _ => DerivedUpdate::TemperatureFromEnthalpy {
                min: 250.0,
                max: 3000.0,
                diagnostic: true,
            },
        };
        Ok(Self::new(specs::ENTHALPY, config, realm, solvers)?.with_derived(derived))
    }

    /// Solid heat conduction.
    pub fn heat_conduction(
        config: &SystemConfig,
        realm: &Realm,
        solvers: &SolverSpecification,
    ) -> Result<Self, EquationSystemError> {
        Self::new(specs::HEAT_CONDUCTION, config, realm, solvers)
    }

    /// Volume of fluid, clipped to `[0, 1]`.
    pub fn volume_of_fluid(
        config: &SystemConfig,
        realm: &Realm,
        solvers: &SolverSpecification,
    ) -> Result<Self, EquationSystemError> {
        Ok(Self::new(specs::VOLUME_OF_FLUID, config, realm, solvers)?
            .with_derived(DerivedUpdate::Clip { min: 0.0, max: 1.0 }))
    }

    /// One-equation turbulent kinetic energy, kept non-negative.
    pub fn turbulent_kinetic_energy(
        config: &SystemConfig,
        realm: &Realm,
        solvers: &SolverSpecification,
    ) -> Result<Self, EquationSystemError> {
        Ok(Self::new(specs::TURBULENT_KE, config, realm, solvers)?.with_derived(
            DerivedUpdate::Clip {
                min: 0.0,
                max: f64::MAX,
            },
        ))
    }

    /// Wall distance. Solved on the first pass only, with a unit source
    /// unless the input gives one.
    pub fn wall_distance(
        config: &SystemConfig,
        realm: &Realm,
        solvers: &SolverSpecification,
    ) -> Result<Self, EquationSystemError> {
        let mut config = config.clone();
        config.source.get_or_insert_with(|| vec![1.0]);
        let mut sys = Self::new(specs::WALL_DISTANCE, &config, realm, solvers)?
            .with_derived(DerivedUpdate::WallDistance);
        sys.solve_once = true;
        Ok(sys)
    }

    /// Replace the post-solve update.
    pub fn with_derived(mut self, derived: DerivedUpdate) -> Self {
        self.derived = derived;
        self
    }

    /// The dof description.
    pub fn spec(&self) -> &TransportSpec {
        &self.spec
    }

    /// Components of the dof.
    pub fn num_dof(&self) -> usize {
        self.num_dof
    }

    /// `StateNP1` slot of the solved field, once registered.
    pub fn field(&self) -> Option<FieldId> {
        self.field
    }

    fn registered(&self) -> Result<(FieldId, FieldId), EquationSystemError> {
        match (self.field, self.delta) {
            (Some(f), Some(d)) => Ok((f, d)),
            _ => Err(EquationSystemError::NotReady {
                system: self.core.name.clone(),
                reason: format!("'{}' is not registered", self.spec.dof),
            }),
        }
    }

    fn add_dirichlet(
        &mut self,
        realm: &mut Realm,
        part: PartId,
        values: Vec<f64>,
        label: &str,
    ) -> Result<(), EquationSystemError> {
        let (field, _) = self.registered()?;
        let fm = realm.field_manager();
        let bc = fm
            .register_field_with(realm.mesh_mut(), self.spec.bc, &[part], &FieldOverrides::default())?
            .id();
        let dof = self.spec.dof;
        self.core.bc_data_algorithms.push(Box::new(ConstantFieldAlgorithm::new(
            format!("{label}_{dof}_bc_data"),
            bc,
            vec![part],
            values,
        )));
        self.core.bc_data_map_algorithms.push(Box::new(CopyFieldAlgorithm::new(
            format!("{label}_{dof}_bc_to_state"),
            bc,
            field,
            vec![part],
        )));
        self.core
            .solver_algorithms
            .push(Box::new(DirichletAssembly::new(bc, field, vec![part])));
        Ok(())
    }

    fn apply_derived(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        let (field, _) = self.registered()?;
        let mesh = realm.mesh_mut();
        match self.derived {
            DerivedUpdate::None => {}
            DerivedUpdate::Clip { min, max } => {
                if let Some(values) = mesh.real_mut(field) {
                    values.iter_mut().for_each(|v| *v = v.clamp(min, max));
                }
            }
            DerivedUpdate::TemperatureFromEnthalpy {
                min,
                max,
                diagnostic,
            } => {
                let (Some(&t_id), Some(&cp_id)) = (
                    self.auxiliary.get("temperature"),
                    self.auxiliary.get("specific_heat"),
                ) else {
                    return Ok(());
                };
                let h: Vec<f64> = mesh.real(field).map(<[f64]>::to_vec).unwrap_or_default();
                let cp: Vec<f64> = mesh.real(cp_id).map(<[f64]>::to_vec).unwrap_or_default();
                let mut clipped = 0usize;
                if let Some(temperature) = mesh.real_mut(t_id) {
                    for ((t, &h), &cp) in temperature.iter_mut().zip(&h).zip(&cp) {
                        if cp <= 0.0 {
                            continue;
                        }
                        let raw = h / cp;
                        if raw < min || raw > max {
                            clipped += 1;
                        }
                        *t = raw.clamp(min, max);
                    }
                }
                if diagnostic && clipped > 0 {
                    log::info!(
                        "{}: {clipped} nodes clipped to [{min}, {max}]",
                        self.core.user_name
                    );
                }
            }
            DerivedUpdate::WallDistance => {
                let Some(&d) = self.auxiliary.get("minimum_distance_to_wall") else {
                    return Ok(());
                };
                let phi: Vec<f64> = mesh.real(field).map(<[f64]>::to_vec).unwrap_or_default();
                if let Some(dist) = mesh.real_mut(d) {
                    for (d, &p) in dist.iter_mut().zip(&phi) {
                        *d = (2.0 * p.max(0.0)).sqrt();
                    }
                }
            }
        }
        Ok(())
    }

    fn enthalpy_from_temperature(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        let (field, _) = self.registered()?;
        let (Some(&t_id), Some(&cp_id)) = (
            self.auxiliary.get("temperature"),
            self.auxiliary.get("specific_heat"),
        ) else {
            return Ok(());
        };
        let mesh = realm.mesh_mut();
        let t: Vec<f64> = mesh.real(t_id).map(<[f64]>::to_vec).unwrap_or_default();
        let cp: Vec<f64> = mesh.real(cp_id).map(<[f64]>::to_vec).unwrap_or_default();
        if let Some(h) = mesh.real_mut(field) {
            for ((h, &t), &cp) in h.iter_mut().zip(&t).zip(&cp) {
                *h = cp * t;
            }
        }
        Ok(())
    }

    fn register_auxiliary(
        &mut self,
        realm: &mut Realm,
        name: &'static str,
        part: PartId,
        init: Option<Vec<f64>>,
    ) -> Result<(), EquationSystemError> {
        let fm = realm.field_manager();
        let overrides = FieldOverrides {
            init,
            ..FieldOverrides::default()
        };
        let id = fm
            .register_field_with(realm.mesh_mut(), name, &[part], &overrides)?
            .id();
        self.auxiliary.insert(name, id);
        Ok(())
    }
}

impl EquationSystem for TransportEquationSystem {
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
        let parts = [part];
        let none = FieldOverrides::default();
        let field = fm
            .register_field_with(realm.mesh_mut(), self.spec.dof, &parts, &none)?
            .id();
        let delta = fm
            .register_field_with(realm.mesh_mut(), self.spec.delta, &parts, &none)?
            .id();
        for name in self.spec.gradient.into_iter().chain(self.spec.diffusivity) {
            fm.register_field_with(realm.mesh_mut(), name, &parts, &none)?;
        }
        match self.derived {
            DerivedUpdate::TemperatureFromEnthalpy { .. } => {
                self.register_auxiliary(realm, "temperature", part, None)?;
                self.register_auxiliary(realm, "specific_heat", part, Some(vec![1000.0]))?;
            }
            DerivedUpdate::WallDistance => {
                self.register_auxiliary(realm, "minimum_distance_to_wall", part, None)?;
            }
            _ => {}
        }

        if self.field.is_none() {
            let states = realm.mesh().schema(field).map_or(1, |s| s.num_states());
            for index in 1..states {
                if let Some(to) = FieldState::from_index(index as usize) {
                    self.core.copy_state_algorithms.push(Box::new(CopyStateAlgorithm::new(
                        field,
                        FieldState::NP1,
                        to,
                    )));
                }
            }
        }
        self.field = Some(field);
        self.delta = Some(delta);
        Ok(())
    }

    fn register_interior_algorithm(
        &mut self,
        _realm: &mut Realm,
        part: PartId,
    ) -> Result<(), EquationSystemError> {
        if !self.interior_parts.contains(&part) {
            self.interior_parts.push(part);
        }
        Ok(())
    }

    fn register_wall_bc(
        &mut self,
        realm: &mut Realm,
        part: PartId,
        _topology: Topology,
        data: &BoundaryConditionData,
    ) -> Result<(), EquationSystemError> {
        let values = match data.value(self.spec.dof) {
            Some(v) => v.to_vec(),
            None => match self.spec.wall_value {
                Some(w) => vec![w; self.num_dof],
                None => return Ok(()),
            },
        };
        self.add_dirichlet(realm, part, values, "wall")
    }

    fn register_inflow_bc(
        &mut self,
        realm: &mut Realm,
        part: PartId,
        _topology: Topology,
        data: &BoundaryConditionData,
    ) -> Result<(), EquationSystemError> {
        match data.value(self.spec.dof) {
            Some(v) => self.add_dirichlet(realm, part, v.to_vec(), "inflow"),
            None => {
                log::debug!(
                    "{}: inflow on '{}' gives no '{}'",
                    self.core.name,
                    data.target_name,
                    self.spec.dof
                );
                Ok(())
            }
        }
    }

    fn register_open_bc(
        &mut self,
        realm: &mut Realm,
        part: PartId,
        _topology: Topology,
        data: &BoundaryConditionData,
    ) -> Result<(), EquationSystemError> {
        match data.value(self.spec.dof) {
            Some(v) => self.add_dirichlet(realm, part, v.to_vec(), "open"),
            None => Ok(()),
        }
    }

    fn register_initial_condition_fcn(
        &mut self,
        _realm: &mut Realm,
        part: PartId,
        functions: &IndexMap<String, String>,
        params: &IndexMap<String, Vec<f64>>,
    ) -> Result<(), EquationSystemError> {
        let Some(function) = functions.get(self.spec.dof) else {
            return Ok(());
        };
        let (field, _) = self.registered()?;
        let params = params.get(self.spec.dof).map(Vec::as_slice).unwrap_or(&[]);
        let function = UserFunction::parse(function, params)?;
        self.core
            .initial_condition_algorithms
            .push(Box::new(UserFunctionAlgorithm::new(field, vec![part], function)));
        Ok(())
    }

    fn initial_work(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        run_all(&mut self.core.initial_condition_algorithms, realm)?;
        if let DerivedUpdate::TemperatureFromEnthalpy { .. } = self.derived {
            self.enthalpy_from_temperature(realm)?;
        }
        run_all(&mut self.core.copy_state_algorithms, realm)
    }

    fn initialize(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        let (field, _) = self.registered()?;
        let nodes = realm.mesh().entity_count(EntityRank::Node);
        if let Some(linsys) = self.core.linsys.as_deref_mut() {
            linsys.build_graph(nodes);
        }
        if !self.time_term_added {
            let parts = if self.interior_parts.is_empty() {
                vec![PartId::UNIVERSAL]
            } else {
                self.interior_parts.clone()
            };
            self.core.solver_algorithms.push(Box::new(TimeTermAssembly::new(
                field,
                parts,
                self.core.source.clone(),
            )));
            self.time_term_added = true;
        }
        Ok(())
    }

    fn reinitialize_linear_system(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        let nodes = realm.mesh().entity_count(EntityRank::Node);
        if let Some(linsys) = self.core.linsys.as_deref_mut() {
            linsys.build_graph(nodes);
        }
        Ok(())
    }

    fn predict_state(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        let (field, _) = self.registered()?;
        let mesh = realm.mesh_mut();
        if mesh.schema(field).is_some_and(|s| s.num_states() > 1) {
            mesh.copy_state(field, FieldState::N, FieldState::NP1)?;
        }
        Ok(())
    }

    fn solve_and_update(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        if self.solve_once && self.solved {
            return Ok(());
        }
        let (field, delta) = self.registered()?;
        let relax = self.core.relaxation;
        for _ in 0..self.core.max_iterations {
            assemble_and_solve(&mut self.core, realm, delta)?;
            solution_update(
                realm.mesh_mut(),
                relax.delta_fraction,
                delta,
                relax.field_fraction,
                field,
                self.num_dof,
                EntityRank::Node,
            )?;
        }
        self.solved = true;
        Ok(())
    }

    fn post_iter_work_dep(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.apply_derived(realm)
    }

    fn system_is_converged(&mut self) -> bool {
        let converged = (self.solve_once && self.solved) || self.core.is_converged();
        self.core.record_convergence(converged);
        converged
    }
}
