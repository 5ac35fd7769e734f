//! [`EquationSystems`]: the ordered collection of equation systems in a
//! realm and the fixed per-timestep state machine that drives them.
//!
//! # Pass order
//!
//! ```text
//! solve_and_update():
//!   pre_iter_work        overset fringe update, then global pre drivers
//!   for each system      pre_iter_work -> solve_and_update -> post_iter_work
//!   for each system      post_iter_work_dep
//!   post_iter_work       global post drivers
//!   convergence          AND over every system, every system queried
//! ```
//!
//! Registration calls go to the realm first and then to every system in
//! registration order.

use std::fmt;
use std::time::{Duration, Instant};

use smallvec::SmallVec;
use zephyr_core::{EntityRank, FieldId, MeshError, PartId, Topology};
use zephyr_eqsys::{
    run_driver, AlgorithmDriver, BoundaryConditionData, EquationSystem, EquationSystemFactory,
    Lifecycle, NonConformalBoundaryConditionData, OversetBoundaryConditionData,
    PeriodicBoundaryConditionData, PostProcessingData, Realm, SolverSpecification,
    UserFunctionInitialConditionData,
};
use zephyr_fields::FieldOverrides;

use crate::config::EquationSystemsConfig;
use crate::error::EngineError;
use crate::metrics::TimestepReport;
use crate::overset::{OversetFieldUpdate, OversetUpdateDriver};

/// Norm reported by an empty collection.
pub const EMPTY_SYSTEM_NORM: f64 = -1.0e16;

/// Side-rank boundary conditions that share one registration path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SideCondition {
    Wall,
    Inflow,
    Open,
    Symmetry,
    AblTop,
}

impl SideCondition {
    fn label(self) -> &'static str {
        match self {
            Self::Wall => "wall",
            Self::Inflow => "inflow",
            Self::Open => "open",
            Self::Symmetry => "symmetry",
            Self::AblTop => "abltop",
        }
    }
}

/// The equation systems of one realm, in registration order.
pub struct EquationSystems {
    name: String,
    max_iterations: u32,
    solvers: SolverSpecification,
    systems: Vec<Box<dyn EquationSystem>>,
    system_time: Vec<Duration>,
    pre_iter_drivers: Vec<Box<dyn AlgorithmDriver>>,
    post_iter_drivers: Vec<Box<dyn AlgorithmDriver>>,
    overset_updater: OversetUpdateDriver,
    initialized: bool,
}

impl fmt::Debug for EquationSystems {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.systems.iter().map(|s| s.name()).collect();
        f.debug_struct("EquationSystems")
            .field("name", &self.name)
            .field("max_iterations", &self.max_iterations)
            .field("systems", &names)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

impl EquationSystems {
    /// An empty collection.
    pub fn new(name: impl Into<String>, max_iterations: u32, solvers: SolverSpecification) -> Self {
        Self {
            name: name.into(),
            max_iterations: max_iterations.max(1),
            solvers,
            systems: Vec::new(),
            system_time: Vec::new(),
            pre_iter_drivers: Vec::new(),
            post_iter_drivers: Vec::new(),
            overset_updater: OversetUpdateDriver::new(),
            initialized: false,
        }
    }

    /// Build every declared system through `factory`.
    ///
    /// Every declaration is resolved before the first system is built, so
    /// an unknown kind aborts the load with nothing constructed.
    pub fn load(
        config: &EquationSystemsConfig,
        realm: &Realm,
        factory: &dyn EquationSystemFactory,
    ) -> Result<Self, EngineError> {
        let resolved = config.resolve(realm.has_overset())?;
        let mut eqs = Self::new(
            config.name.clone(),
            config.max_iterations,
            config.solver_system_specification.clone(),
        );
        for system in &resolved {
            let built = factory.create(system, realm, &eqs.solvers)?;
            log::debug!("eqSys = {} ({})", built.core().user_name, system.kind);
            eqs.push(built);
        }
        log::info!(
            "EquationSystems::load(): {} with {} systems",
            eqs.name,
            eqs.systems.len()
        );
        Ok(eqs)
    }

    /// Append a system. It runs after every system already present.
    pub fn push(&mut self, system: Box<dyn EquationSystem>) {
        self.systems.push(system);
        self.system_time.push(Duration::ZERO);
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nonlinear passes per timestep.
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Number of systems.
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Systems in registration order.
    pub fn systems(&self) -> impl Iterator<Item = &dyn EquationSystem> + '_ {
        self.systems.iter().map(|s| s.as_ref())
    }

    /// The first system whose name or user name is `name`.
    pub fn system(&self, name: &str) -> Option<&dyn EquationSystem> {
        self.systems()
            .find(|s| s.name() == name || s.core().user_name == name)
    }

    /// Whether [`initialize`](Self::initialize) has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The solver block mapped to `equation`.
    pub fn get_solver_block_name(&self, equation: &str) -> Result<&str, EngineError> {
        Ok(self.solvers.block_name(equation)?)
    }

    /// Append a global driver run before every pass.
    pub fn add_pre_iter_driver(&mut self, driver: Box<dyn AlgorithmDriver>) {
        self.pre_iter_drivers.push(driver);
    }

    /// Append a global driver run after every pass.
    pub fn add_post_iter_driver(&mut self, driver: Box<dyn AlgorithmDriver>) {
        self.post_iter_drivers.push(driver);
    }

    /// Refresh `field`'s fringe values at the start of every pass.
    pub fn register_overset_field_update(&mut self, field: FieldId, nrows: usize, ncols: usize) {
        self.overset_updater.register(field, nrows, ncols);
    }

    /// Fields the fringe driver refreshes.
    pub fn overset_fields(&self) -> &[OversetFieldUpdate] {
        self.overset_updater.fields()
    }

    // ── Part resolution ─────────────────────────────────────────

    fn resolve_parts(
        realm: &Realm,
        names: &[String],
        element_rank: bool,
    ) -> Result<Vec<PartId>, EngineError> {
        let mut parts = Vec::with_capacity(names.len());
        for name in names {
            let part = realm.part(name).inspect_err(|_| {
                log::warn!("Trouble with part {name}");
            })?;
            if element_rank && part.primary_entity_rank() != Some(EntityRank::Element) {
                return Err(MeshError::WrongEntityRank {
                    part: name.clone(),
                    expected: EntityRank::Element,
                    actual: part.primary_entity_rank(),
                }
                .into());
            }
            parts.push(part.id());
        }
        Ok(parts)
    }

    /// Subsets of `name` (or the part itself when it has none), each
    /// required to have side rank.
    fn side_subsets(
        realm: &Realm,
        name: &str,
    ) -> Result<SmallVec<[(PartId, Topology); 4]>, EngineError> {
        let part = realm.part(name)?;
        let side_rank = realm.side_rank();
        let mut out = SmallVec::new();
        for id in realm.mesh().part_subsets_or_self(part.id()) {
            let sub = realm.mesh().part(id).ok_or_else(|| MeshError::UnknownPart {
                name: format!("#{id}"),
            })?;
            if sub.primary_entity_rank() != Some(side_rank) {
                log::warn!("Sorry, part is not a face {name}");
                return Err(MeshError::WrongEntityRank {
                    part: sub.name().to_string(),
                    expected: side_rank,
                    actual: sub.primary_entity_rank(),
                }
                .into());
            }
            out.push((id, sub.topology()));
        }
        Ok(out)
    }

    // ── Field registration ──────────────────────────────────────

    /// Register nodal fields on `target_names`: the realm's geometric
    /// fields first, then every system's.
    pub fn register_nodal_fields(
        &mut self,
        realm: &mut Realm,
        target_names: &[String],
    ) -> Result<(), EngineError> {
        let parts = Self::resolve_parts(realm, target_names, false)?;
        for &part in &parts {
            realm.register_nodal_fields(part)?;
        }
        for sys in self.systems.iter_mut() {
            for &part in &parts {
                sys.register_nodal_fields(realm, part)?;
            }
            sys.core_mut().set_lifecycle(Lifecycle::FieldsRegistered);
        }
        Ok(())
    }

    /// Register edge fields on `target_names`. The realm is not notified.
    pub fn register_edge_fields(
        &mut self,
        realm: &mut Realm,
        target_names: &[String],
    ) -> Result<(), EngineError> {
        let parts = Self::resolve_parts(realm, target_names, false)?;
        for sys in self.systems.iter_mut() {
            for &part in &parts {
                sys.register_edge_fields(realm, part)?;
            }
        }
        Ok(())
    }

    /// Register element fields on the element blocks `target_names`,
    /// then declare `element_volume` on all of them.
    pub fn register_element_fields(
        &mut self,
        realm: &mut Realm,
        target_names: &[String],
    ) -> Result<(), EngineError> {
        let parts = Self::resolve_parts(realm, target_names, true)?;
        for &part in &parts {
            let topology = realm.mesh().part(part).map_or(Topology::Invalid, |p| p.topology());
            for sys in self.systems.iter_mut() {
                sys.register_element_fields(realm, part, topology)?;
            }
        }
        let fm = realm.field_manager();
        fm.register_field_with(
            realm.mesh_mut(),
            "element_volume",
            &parts,
            &FieldOverrides::default(),
        )?;
        Ok(())
    }

    /// Register interior algorithms on the element blocks `target_names`.
    pub fn register_interior_algorithm(
        &mut self,
        realm: &mut Realm,
        target_names: &[String],
    ) -> Result<(), EngineError> {
        let parts = Self::resolve_parts(realm, target_names, true)?;
        for &part in &parts {
            realm.register_interior_algorithm(part);
            for sys in self.systems.iter_mut() {
                sys.register_interior_algorithm(realm, part)?;
            }
        }
        Ok(())
    }

    // ── Boundary conditions ─────────────────────────────────────

    fn register_side_condition(
        &mut self,
        realm: &mut Realm,
        kind: SideCondition,
        data: &BoundaryConditionData,
    ) -> Result<(), EngineError> {
        let subsets = Self::side_subsets(realm, &data.target_name)?;
        for (part, topo) in subsets {
            match kind {
                SideCondition::Wall => realm.register_wall_bc(part, topo, data),
                SideCondition::Inflow => realm.register_inflow_bc(part, topo, data),
                SideCondition::Open => realm.register_open_bc(part, topo, data),
                SideCondition::Symmetry => realm.register_symmetry_bc(part, topo, data),
                SideCondition::AblTop => realm.register_abltop_bc(part, topo, data),
            }
            for sys in self.systems.iter_mut() {
                match kind {
                    SideCondition::Wall => sys.register_wall_bc(realm, part, topo, data)?,
                    SideCondition::Inflow => sys.register_inflow_bc(realm, part, topo, data)?,
                    SideCondition::Open => sys.register_open_bc(realm, part, topo, data)?,
                    SideCondition::Symmetry => sys.register_symmetry_bc(realm, part, topo, data)?,
                    SideCondition::AblTop => sys.register_abltop_bc(realm, part, topo, data)?,
                }
            }
        }
        log::debug!("registered {} bc on {}", kind.label(), data.target_name);
        Ok(())
    }

    /// Wall condition on every subset of the target part.
    pub fn register_wall_bc(
        &mut self,
        realm: &mut Realm,
        data: &BoundaryConditionData,
    ) -> Result<(), EngineError> {
        self.register_side_condition(realm, SideCondition::Wall, data)
    }

    /// Inflow condition on every subset of the target part.
    pub fn register_inflow_bc(
        &mut self,
        realm: &mut Realm,
        data: &BoundaryConditionData,
    ) -> Result<(), EngineError> {
        self.register_side_condition(realm, SideCondition::Inflow, data)
    }

    /// Open condition on every subset of the target part.
    pub fn register_open_bc(
        &mut self,
        realm: &mut Realm,
        data: &BoundaryConditionData,
    ) -> Result<(), EngineError> {
        self.register_side_condition(realm, SideCondition::Open, data)
    }

    /// Symmetry condition on every subset of the target part.
    pub fn register_symmetry_bc(
        &mut self,
        realm: &mut Realm,
        data: &BoundaryConditionData,
    ) -> Result<(), EngineError> {
        self.register_side_condition(realm, SideCondition::Symmetry, data)
    }

    /// ABL-top condition on every subset of the target part.
    pub fn register_abltop_bc(
        &mut self,
        realm: &mut Realm,
        data: &BoundaryConditionData,
    ) -> Result<(), EngineError> {
        self.register_side_condition(realm, SideCondition::AblTop, data)
    }

    /// Periodic pairing. Forwarded to the realm only.
    ///
    /// A subset-count mismatch between master and slave is logged, not
    /// rejected.
    pub fn register_periodic_bc(
        &mut self,
        realm: &mut Realm,
        data: &PeriodicBoundaryConditionData,
    ) -> Result<(), EngineError> {
        let master = realm.part(&data.master)?;
        let slave = realm.part(&data.slave)?;
        let (master_id, master_subsets) = (master.id(), master.subsets().len());
        let (slave_id, slave_subsets) = (slave.id(), slave.subsets().len());
        Self::side_subsets(realm, &data.master)?;
        Self::side_subsets(realm, &data.slave)?;

        if master_subsets != slave_subsets {
            log::warn!("Mesh part subsets for master slave do not match in size");
        }
        if master_subsets > 1 {
            log::warn!("Surface has subsets active; please make sure that the topologies match");
        }
        realm.register_periodic_bc(
            master_id,
            slave_id,
            data.search_tolerance,
            &data.search_method,
        );
        Ok(())
    }

    /// Non-conformal interface. The realm sets up the interface, then
    /// every subset of the current side is registered.
    pub fn register_non_conformal_bc(
        &mut self,
        realm: &mut Realm,
        data: &NonConformalBoundaryConditionData,
    ) -> Result<(), EngineError> {
        Self::resolve_parts(realm, &data.current_target_names, false)?;
        Self::resolve_parts(realm, &data.opposing_target_names, false)?;
        realm.setup_non_conformal_bc(data);

        for name in &data.current_target_names {
            for (part, topo) in Self::side_subsets(realm, name)? {
                realm.register_non_conformal_bc(part, topo);
                for sys in self.systems.iter_mut() {
                    sys.register_non_conformal_bc(realm, part, topo)?;
                }
            }
        }
        Ok(())
    }

    /// Overset assembly.
    pub fn register_overset_bc(
        &mut self,
        realm: &mut Realm,
        data: &OversetBoundaryConditionData,
    ) -> Result<(), EngineError> {
        realm.register_overset_bc(data);
        for sys in self.systems.iter_mut() {
            sys.register_overset_bc(realm)?;
        }
        Ok(())
    }

    /// Surface post-processing. Missing parts and subsets without side
    /// rank are logged; the remaining subsets are forwarded.
    pub fn register_surface_pp_algorithm(
        &mut self,
        realm: &mut Realm,
        data: &PostProcessingData,
    ) -> Result<(), EngineError> {
        let side_rank = realm.side_rank();
        let mut parts = Vec::new();
        for name in &data.target_names {
            let Ok(target) = realm.part(name) else {
                log::warn!("SurfacePP: can not find part with name: {name}");
                continue;
            };
            for id in realm.mesh().part_subsets_or_self(target.id()) {
                let is_face = realm
                    .mesh()
                    .part(id)
                    .is_some_and(|p| p.primary_entity_rank() == Some(side_rank));
                if !is_face {
                    log::warn!("SurfacePP: part is not a face: {name}");
                }
                parts.push(id);
            }
        }
        for sys in self.systems.iter_mut() {
            sys.register_surface_pp_algorithm(realm, data, &parts)?;
        }
        Ok(())
    }

    /// User-function initial condition on every target part.
    pub fn register_initial_condition_fcn(
        &mut self,
        realm: &mut Realm,
        data: &UserFunctionInitialConditionData,
    ) -> Result<(), EngineError> {
        let parts = Self::resolve_parts(realm, &data.target_names, false)?;
        for part in parts {
            for sys in self.systems.iter_mut() {
                sys.register_initial_condition_fcn(
                    realm,
                    part,
                    &data.function_names,
                    &data.function_params,
                )?;
            }
        }
        Ok(())
    }

    // ── Setup ───────────────────────────────────────────────────

    /// Initialize every system, timing each into its `init` timer.
    pub fn initialize(&mut self, realm: &mut Realm) -> Result<(), EngineError> {
        log::info!("EquationSystems::initialize(): Begin ");
        for sys in self.systems.iter_mut() {
            let start = Instant::now();
            sys.initialize(realm)?;
            let core = sys.core_mut();
            core.timers.init += start.elapsed();
            core.set_lifecycle(Lifecycle::Initialized);
        }
        log::info!("EquationSystems::initialize(): End ");

        if realm.has_overset() {
            log::info!("EquationSystems: overset solution strategy");
            for sys in &self.systems {
                log_overset_strategy(sys.as_ref());
            }
        }
        self.initialized = true;
        Ok(())
    }

    /// Rebuild every linear system.
    pub fn reinitialize_linear_system(&mut self, realm: &mut Realm) -> Result<(), EngineError> {
        self.for_each(realm, |s, r| s.reinitialize_linear_system(r))
    }

    /// Forward to every system.
    pub fn populate_derived_quantities(&mut self, realm: &mut Realm) -> Result<(), EngineError> {
        self.for_each(realm, |s, r| s.populate_derived_quantities(r))
    }

    /// Forward to every system.
    pub fn initial_work(&mut self, realm: &mut Realm) -> Result<(), EngineError> {
        self.for_each(realm, |s, r| s.initial_work(r))
    }

    /// Forward to every system after mesh adaptation.
    pub fn post_adapt_work(&mut self, realm: &mut Realm) -> Result<(), EngineError> {
        self.for_each(realm, |s, r| s.post_adapt_work(r))
    }

    /// Run every system's property algorithms.
    pub fn evaluate_properties(&mut self, realm: &mut Realm) -> Result<(), EngineError> {
        self.for_each(realm, |s, r| s.evaluate_properties(r))
    }

    /// Run every system's boundary-data algorithms.
    pub fn populate_boundary_data(&mut self, realm: &mut Realm) -> Result<(), EngineError> {
        self.for_each(realm, |s, r| s.populate_boundary_data(r))
    }

    /// Run every system's boundary-data map algorithms.
    pub fn boundary_data_to_state_data(&mut self, realm: &mut Realm) -> Result<(), EngineError> {
        self.for_each(realm, |s, r| s.boundary_data_to_state_data(r))
    }

    /// Notify each system, children of composites included, once per
    /// boundary-data algorithm it owns.
    pub fn post_external_data_transfer_work(
        &mut self,
        realm: &mut Realm,
    ) -> Result<(), EngineError> {
        for sys in self.systems.iter_mut() {
            notify_external_transfers(sys.as_mut(), realm)?;
        }
        Ok(())
    }

    // ── Timestep ────────────────────────────────────────────────

    /// Forward to every system.
    pub fn pre_timestep_work(&mut self, realm: &mut Realm) -> Result<(), EngineError> {
        self.for_each(realm, |s, r| s.pre_timestep_work(r))
    }

    /// Forward to every system.
    pub fn predict_state(&mut self, realm: &mut Realm) -> Result<(), EngineError> {
        self.for_each(realm, |s, r| s.predict_state(r))
    }

    /// Overset fringe update when the realm has overset, then the global
    /// pre-iteration drivers.
    pub fn pre_iter_work(&mut self, realm: &mut Realm) -> Result<(), EngineError> {
        if realm.has_overset() {
            run_driver(&mut self.overset_updater, realm)?;
        }
        for driver in self.pre_iter_drivers.iter_mut() {
            run_driver(driver.as_mut(), realm)?;
        }
        Ok(())
    }

    /// Global post-iteration drivers.
    pub fn post_iter_work(&mut self, realm: &mut Realm) -> Result<(), EngineError> {
        for driver in self.post_iter_drivers.iter_mut() {
            run_driver(driver.as_mut(), realm)?;
        }
        Ok(())
    }

    /// One nonlinear pass. Returns whether every system converged.
    ///
    /// Every system's convergence query runs, even after one reports
    /// `false`.
    pub fn solve_and_update(&mut self, realm: &mut Realm) -> Result<bool, EngineError> {
        self.require_initialized("solve_and_update")?;
        self.pre_iter_work(realm)?;

        for (sys, elapsed) in self.systems.iter_mut().zip(self.system_time.iter_mut()) {
            let start = Instant::now();
            sys.pre_iter_work(realm)?;
            sys.solve_and_update(realm)?;
            sys.post_iter_work(realm)?;
            *elapsed += start.elapsed();
        }

        for sys in self.systems.iter_mut() {
            sys.post_iter_work_dep(realm)?;
        }

        self.post_iter_work(realm)?;

        let mut converged = true;
        for sys in self.systems.iter_mut() {
            converged &= sys.system_is_converged();
        }
        Ok(converged)
    }

    /// Forward to every system.
    pub fn post_converged_work(&mut self, realm: &mut Realm) -> Result<(), EngineError> {
        self.for_each(realm, |s, r| s.post_converged_work(r))
    }

    /// Forward to every system.
    pub fn provide_output(&mut self, realm: &mut Realm) -> Result<(), EngineError> {
        self.for_each(realm, |s, r| s.provide_output(r))
    }

    /// Log every system's timers.
    pub fn dump_eq_time(&self) {
        for sys in &self.systems {
            sys.dump_eq_time();
        }
    }

    /// Run one timestep: pre-timestep work, prediction, up to
    /// `max_iterations` nonlinear passes (stopping once all systems
    /// converge), then post-convergence work and output.
    pub fn advance_timestep(&mut self, realm: &mut Realm) -> Result<TimestepReport, EngineError> {
        self.require_initialized("advance_timestep")?;
        let start = Instant::now();
        self.system_time.iter_mut().for_each(|t| *t = Duration::ZERO);

        self.pre_timestep_work(realm)?;
        self.predict_state(realm)?;

        let mut converged = false;
        let mut passes = 0;
        while passes < self.max_iterations {
            passes += 1;
            converged = self.solve_and_update(realm)?;
            log::debug!(
                "{}: nonlinear pass {passes}, max scaled norm {:e}",
                self.name,
                self.provide_system_norm()
            );
            if converged {
                break;
            }
        }

        self.post_converged_work(realm)?;
        self.provide_output(realm)?;
        self.dump_eq_time();

        let system_us = self
            .systems
            .iter()
            .zip(&self.system_time)
            .map(|(s, t)| (s.name().to_string(), t.as_micros() as u64))
            .collect();
        Ok(TimestepReport {
            step: realm.time().step_count,
            nonlinear_iterations: passes,
            converged,
            max_scaled_norm: self.provide_system_norm(),
            mean_norm: self.provide_mean_system_norm(),
            total_us: start.elapsed().as_micros() as u64,
            system_us,
        })
    }

    // ── Norms ───────────────────────────────────────────────────

    /// Largest scaled norm over all systems; [`EMPTY_SYSTEM_NORM`] when
    /// the collection is empty.
    pub fn provide_system_norm(&self) -> f64 {
        self.systems
            .iter()
            .map(|s| s.provide_scaled_norm())
            .fold(EMPTY_SYSTEM_NORM, f64::max)
    }

    /// Sum of norms divided by sum of norm increments. Not finite when
    /// every increment is zero.
    pub fn provide_mean_system_norm(&self) -> f64 {
        let (norm, increment) = self
            .systems
            .iter()
            .fold((0.0, 0.0), |(n, i), s| {
                (n + s.provide_norm(), i + s.provide_norm_increment())
            });
        norm / increment
    }

    /// Whether every system iterates overset decoupled. Always `false`
    /// without overset.
    pub fn all_systems_decoupled(&self, realm: &Realm) -> bool {
        if !realm.has_overset() {
            return false;
        }
        self.systems.iter().all(|s| s.is_decoupled())
    }

    // ── Helpers ─────────────────────────────────────────────────

    fn for_each(
        &mut self,
        realm: &mut Realm,
        mut f: impl FnMut(
            &mut dyn EquationSystem,
            &mut Realm,
        ) -> Result<(), zephyr_eqsys::EquationSystemError>,
    ) -> Result<(), EngineError> {
        for sys in self.systems.iter_mut() {
            f(sys.as_mut(), realm)?;
        }
        Ok(())
    }

    fn require_initialized(&self, phase: &str) -> Result<(), EngineError> {
        if self.initialized {
            Ok(())
        } else {
            Err(EngineError::NotReady {
                reason: format!("{phase} called before initialize"),
            })
        }
    }
}

fn log_overset_strategy(sys: &dyn EquationSystem) {
    if sys.has_linear_system() {
        let core = sys.core();
        log::info!(
            " - {}: {}",
            core.eqn_type_name,
            if sys.is_decoupled() {
                "decoupled"
            } else {
                "coupled"
            }
        );
    }
    for child in sys.sub_systems() {
        log_overset_strategy(child);
    }
}

fn notify_external_transfers(
    sys: &mut dyn EquationSystem,
    realm: &mut Realm,
) -> Result<(), EngineError> {
    for _ in 0..sys.core().bc_data_algorithms.len() {
        sys.post_external_data_transfer_work(realm)?;
    }
    for child in sys.sub_systems_mut() {
        notify_external_transfers(child, realm)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use zephyr_eqsys::{EquationSystemCore, EquationSystemError};
    use zephyr_mesh::MeshDatabase;

    struct Scripted {
        core: EquationSystemCore,
        converged: bool,
        scaled: f64,
        norm: f64,
        increment: f64,
        queries: usize,
    }

    impl Scripted {
        fn boxed(name: &str, converged: bool, scaled: f64) -> Box<Self> {
            Box::new(Self {
                core: EquationSystemCore::new(name, name, "undefined"),
                converged,
                scaled,
                norm: 0.0,
                increment: 0.0,
                queries: 0,
            })
        }

        fn normed(name: &str, scaled: f64, norm: f64, increment: f64) -> Box<Self> {
            let mut sys = Self::boxed(name, true, scaled);
            sys.norm = norm;
            sys.increment = increment;
            sys
        }
    }

    impl EquationSystem for Scripted {
        fn core(&self) -> &EquationSystemCore {
            &self.core
        }
        fn core_mut(&mut self) -> &mut EquationSystemCore {
            &mut self.core
        }
        fn system_is_converged(&mut self) -> bool {
            self.queries += 1;
            self.converged
        }
        fn provide_scaled_norm(&self) -> f64 {
            self.scaled
        }
        fn provide_norm(&self) -> f64 {
            self.norm
        }
        fn provide_norm_increment(&self) -> f64 {
            self.increment
        }
        fn solve_and_update(&mut self, _realm: &mut Realm) -> Result<(), EquationSystemError> {
            Ok(())
        }
    }

    fn realm() -> Realm {
        Realm::new(MeshDatabase::new(3), 2).unwrap()
    }

    #[test]
    fn system_norm_is_the_maximum() {
        let mut eqs = EquationSystems::new("eqs", 1, SolverSpecification::default());
        eqs.push(Scripted::boxed("a", true, 0.2));
        eqs.push(Scripted::boxed("b", true, 0.9));
        eqs.push(Scripted::boxed("c", true, 0.05));
        assert_eq!(eqs.provide_system_norm(), 0.9);
    }

    #[test]
    fn empty_collection_reports_the_sentinel_norm() {
        let eqs = EquationSystems::new("eqs", 1, SolverSpecification::default());
        assert_eq!(eqs.provide_system_norm(), EMPTY_SYSTEM_NORM);
        assert!(eqs.provide_mean_system_norm().is_nan());
    }

    #[test]
    fn solving_before_initialize_is_not_ready() {
        let mut realm = realm();
        let mut eqs = EquationSystems::new("eqs", 1, SolverSpecification::default());
        assert!(matches!(
            eqs.solve_and_update(&mut realm),
            Err(EngineError::NotReady { .. })
        ));
    }

    #[test]
    fn convergence_is_a_non_short_circuit_and() {
        let mut realm = realm();
        let mut eqs = EquationSystems::new("eqs", 1, SolverSpecification::default());
        eqs.push(Scripted::boxed("a", true, 0.0));
        eqs.push(Scripted::boxed("b", false, 0.0));
        eqs.push(Scripted::boxed("c", true, 0.0));
        eqs.initialize(&mut realm).unwrap();
        assert!(!eqs.solve_and_update(&mut realm).unwrap());
    }

    #[test]
    fn missing_solver_block_is_reported() {
        let eqs = EquationSystems::new("eqs", 1, SolverSpecification::default());
        assert!(matches!(
            eqs.get_solver_block_name("velocity"),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn not_decoupled_without_overset() {
        let realm = realm();
        let mut eqs = EquationSystems::new("eqs", 1, SolverSpecification::default());
        let mut sys = Scripted::boxed("a", true, 0.0);
        sys.core.decoupled_overset = true;
        eqs.push(sys);
        assert!(!eqs.all_systems_decoupled(&realm));
    }

    proptest! {
        #[test]
        fn norms_aggregate_as_max_and_ratio_of_sums(
            norms in prop::collection::vec((0.0f64..10.0, 0.0f64..10.0, 0.1f64..10.0), 1..8),
        ) {
            let mut eqs = EquationSystems::new("eqs", 1, SolverSpecification::default());
            for (i, &(scaled, norm, increment)) in norms.iter().enumerate() {
                eqs.push(Scripted::normed(&format!("s{i}"), scaled, norm, increment));
            }

            let max = norms.iter().map(|n| n.0).fold(f64::MIN, f64::max);
            let sum_norm: f64 = norms.iter().map(|n| n.1).sum();
            let sum_increment: f64 = norms.iter().map(|n| n.2).sum();
            prop_assert_eq!(eqs.provide_system_norm(), max);
            prop_assert!((eqs.provide_mean_system_norm() - sum_norm / sum_increment).abs() < 1e-12);
        }
    }
}
