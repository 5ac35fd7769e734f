//! Recording mocks for the equation-system collaborators.
//!
//! Every mock shares a [`CallLog`] so a test can assert on the relative
//! order of calls across the realm, the systems, and the solvers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use zephyr_core::{PartId, Topology};
use zephyr_eqsys::{
    BoundaryConditionData, EquationSystem, EquationSystemCore, EquationSystemError,
    LinearSolverFactory, LinearSystem, NonConformalBoundaryConditionData,
    OversetBoundaryConditionData, PostProcessingData, Realm, RealmHooks, SolveSummary,
};
use zephyr_mesh::Part;

// ── CallLog ────────────────────────────────────────────────────────

/// Shared, ordered record of mock calls.
#[derive(Clone, Debug, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry.
    pub fn push(&self, entry: impl Into<String>) {
        if let Ok(mut e) = self.entries.lock() {
            e.push(entry.into());
        }
    }

    /// Snapshot of every entry so far.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Entries containing `pattern`.
    pub fn matching(&self, pattern: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.contains(pattern))
            .collect()
    }

    /// How many entries contain `pattern`.
    pub fn count(&self, pattern: &str) -> usize {
        self.matching(pattern).len()
    }

    /// Position of the first entry equal to `entry`.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }

    pub fn clear(&self) {
        if let Ok(mut e) = self.entries.lock() {
            e.clear();
        }
    }
}

// ── MockLinearSystem ───────────────────────────────────────────────

/// A linear system that reports scripted residuals.
///
/// Each `solve` pops the next scripted residual (the last one repeats)
/// and zeroes the delta.
#[derive(Debug)]
pub struct MockLinearSystem {
    name: String,
    num_dof: usize,
    rows: usize,
    residuals: VecDeque<f64>,
    iterations: usize,
    current: f64,
    first: Option<f64>,
    log: CallLog,
}

impl MockLinearSystem {
    pub fn new(name: impl Into<String>, num_dof: usize, log: CallLog) -> Self {
        Self {
            name: name.into(),
            num_dof,
            rows: 0,
            residuals: VecDeque::new(),
            iterations: 1,
            current: 0.0,
            first: None,
            log,
        }
    }

    /// Residuals returned by successive solves.
    pub fn with_residuals(mut self, residuals: impl IntoIterator<Item = f64>) -> Self {
        self.residuals = residuals.into_iter().collect();
        self
    }

    /// Linear iterations each solve reports.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}

impl LinearSystem for MockLinearSystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_dof(&self) -> usize {
        self.num_dof
    }

    fn build_graph(&mut self, num_entities: usize) {
        self.rows = num_entities * self.num_dof;
        self.log.push(format!("{}.build_graph", self.name));
    }

    fn zero_system(&mut self) {
        self.log.push(format!("{}.zero_system", self.name));
    }

    fn sum_into(&mut self, _entity: usize, _component: usize, _diag: f64, _rhs: f64) {}

    fn set_dirichlet(&mut self, _entity: usize, _component: usize, _rhs: f64) {}

    fn load_complete(&mut self) {
        self.log.push(format!("{}.load_complete", self.name));
    }

    fn solve(&mut self, delta: &mut [f64]) -> Result<SolveSummary, EquationSystemError> {
        self.log.push(format!("{}.solve", self.name));
        let residual = if self.residuals.len() > 1 {
            self.residuals.pop_front().unwrap_or(0.0)
        } else {
            self.residuals.front().copied().unwrap_or(0.0)
        };
        self.current = residual;
        self.first.get_or_insert(residual);
        delta.iter_mut().for_each(|d| *d = 0.0);
        Ok(SolveSummary {
            iterations: self.iterations,
            residual,
            increment: 0.0,
        })
    }

    fn nonlinear_residual(&self) -> f64 {
        self.current
    }

    fn first_nonlinear_residual(&self) -> f64 {
        self.first.unwrap_or(0.0)
    }

    fn scaled_nonlinear_residual(&self) -> f64 {
        match self.first {
            Some(f) if f > 0.0 => self.current / f,
            _ => 0.0,
        }
    }

    fn linear_solution_increment(&self) -> f64 {
        0.0
    }
}

/// Creates [`MockLinearSystem`]s and logs `solver.create:{system}:{block}`.
#[derive(Clone, Debug, Default)]
pub struct RecordingSolverFactory {
    log: CallLog,
}

impl RecordingSolverFactory {
    pub fn new(log: CallLog) -> Self {
        Self { log }
    }
}

impl LinearSolverFactory for RecordingSolverFactory {
    fn create(&self, system_name: &str, block_name: &str, num_dof: usize) -> Box<dyn LinearSystem> {
        self.log
            .push(format!("solver.create:{system_name}:{block_name}"));
        Box::new(MockLinearSystem::new(system_name, num_dof, self.log.clone()))
    }
}

// ── RecordingEquationSystem ────────────────────────────────────────

/// An equation system that logs `{name}.{hook}` for every hook call and
/// answers convergence and norm queries from a script.
#[derive(Debug)]
pub struct RecordingEquationSystem {
    core: EquationSystemCore,
    log: CallLog,
    convergence: VecDeque<bool>,
    scaled_norm: f64,
    norm: f64,
    increment: f64,
    fail_on: Option<&'static str>,
    children: Vec<RecordingEquationSystem>,
}

impl RecordingEquationSystem {
    /// A converged system with zero norms and no linear system.
    pub fn new(name: &str, log: CallLog) -> Self {
        Self {
            core: EquationSystemCore::new(name, name, "undefined"),
            log,
            convergence: VecDeque::new(),
            scaled_norm: 0.0,
            norm: 0.0,
            increment: 0.0,
            fail_on: None,
            children: Vec::new(),
        }
    }

    /// Answers of successive `system_is_converged` calls. The last one
    /// repeats; an empty script answers `true`.
    pub fn with_convergence(mut self, answers: impl IntoIterator<Item = bool>) -> Self {
        self.convergence = answers.into_iter().collect();
        self
    }

    pub fn with_norms(mut self, scaled: f64, norm: f64, increment: f64) -> Self {
        self.scaled_norm = scaled;
        self.norm = norm;
        self.increment = increment;
        self
    }

    /// Own a [`MockLinearSystem`].
    pub fn with_linear_system(mut self) -> Self {
        let name = self.core.name.clone();
        self.core.linsys = Some(Box::new(MockLinearSystem::new(name, 1, self.log.clone())));
        self
    }

    pub fn with_decoupled_overset(mut self, decoupled: bool) -> Self {
        self.core.decoupled_overset = decoupled;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.core.max_iterations = max_iterations;
        self
    }

    /// Expose `children` as sub-systems. Hooks are not forwarded to them.
    pub fn with_children(mut self, children: Vec<RecordingEquationSystem>) -> Self {
        self.children = children;
        self
    }

    /// Return an error from the named hook.
    pub fn failing_on(mut self, hook: &'static str) -> Self {
        self.fail_on = Some(hook);
        self
    }

    fn record(&self, hook: &'static str) -> Result<(), EquationSystemError> {
        self.log.push(format!("{}.{hook}", self.core.name));
        if self.fail_on == Some(hook) {
            return Err(EquationSystemError::AlgorithmFailed {
                name: self.core.name.clone(),
                reason: format!("scripted failure in {hook}"),
            });
        }
        Ok(())
    }
}

impl EquationSystem for RecordingEquationSystem {
    fn core(&self) -> &EquationSystemCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EquationSystemCore {
        &mut self.core
    }

    fn register_nodal_fields(
        &mut self,
        _realm: &mut Realm,
        _part: PartId,
    ) -> Result<(), EquationSystemError> {
        self.record("register_nodal_fields")
    }

    fn register_edge_fields(
        &mut self,
        _realm: &mut Realm,
        _part: PartId,
    ) -> Result<(), EquationSystemError> {
        self.record("register_edge_fields")
    }

    fn register_element_fields(
        &mut self,
        _realm: &mut Realm,
        _part: PartId,
        _topology: Topology,
    ) -> Result<(), EquationSystemError> {
        self.record("register_element_fields")
    }

    fn register_interior_algorithm(
        &mut self,
        _realm: &mut Realm,
        _part: PartId,
    ) -> Result<(), EquationSystemError> {
        self.record("register_interior_algorithm")
    }

    fn register_wall_bc(
        &mut self,
        _realm: &mut Realm,
        _part: PartId,
        _topology: Topology,
        _data: &BoundaryConditionData,
    ) -> Result<(), EquationSystemError> {
        self.record("register_wall_bc")
    }

    fn register_inflow_bc(
        &mut self,
        _realm: &mut Realm,
        _part: PartId,
        _topology: Topology,
        _data: &BoundaryConditionData,
    ) -> Result<(), EquationSystemError> {
        self.record("register_inflow_bc")
    }

    fn register_open_bc(
        &mut self,
        _realm: &mut Realm,
        _part: PartId,
        _topology: Topology,
        _data: &BoundaryConditionData,
    ) -> Result<(), EquationSystemError> {
        self.record("register_open_bc")
    }

    fn register_symmetry_bc(
        &mut self,
        _realm: &mut Realm,
        _part: PartId,
        _topology: Topology,
        _data: &BoundaryConditionData,
    ) -> Result<(), EquationSystemError> {
        self.record("register_symmetry_bc")
    }

    fn register_abltop_bc(
        &mut self,
        _realm: &mut Realm,
        _part: PartId,
        _topology: Topology,
        _data: &BoundaryConditionData,
    ) -> Result<(), EquationSystemError> {
        self.record("register_abltop_bc")
    }

    fn register_non_conformal_bc(
        &mut self,
        _realm: &mut Realm,
        _part: PartId,
        _topology: Topology,
    ) -> Result<(), EquationSystemError> {
        self.record("register_non_conformal_bc")
    }

    fn register_overset_bc(&mut self, _realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.record("register_overset_bc")
    }

    fn register_surface_pp_algorithm(
        &mut self,
        _realm: &mut Realm,
        _data: &PostProcessingData,
        _parts: &[PartId],
    ) -> Result<(), EquationSystemError> {
        self.record("register_surface_pp_algorithm")
    }

    fn register_initial_condition_fcn(
        &mut self,
        _realm: &mut Realm,
        _part: PartId,
        _functions: &IndexMap<String, String>,
        _params: &IndexMap<String, Vec<f64>>,
    ) -> Result<(), EquationSystemError> {
        self.record("register_initial_condition_fcn")
    }

    fn initialize(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.record("initialize")?;
        let nodes = realm.mesh().entity_count(zephyr_core::EntityRank::Node);
        if let Some(l) = self.core.linsys.as_deref_mut() {
            l.build_graph(nodes);
        }
        Ok(())
    }

    fn reinitialize_linear_system(&mut self, _realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.record("reinitialize_linear_system")
    }

    fn populate_derived_quantities(
        &mut self,
        _realm: &mut Realm,
    ) -> Result<(), EquationSystemError> {
        self.record("populate_derived_quantities")
    }

    fn initial_work(&mut self, _realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.record("initial_work")
    }

    fn populate_boundary_data(&mut self, _realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.record("populate_boundary_data")
    }

    fn boundary_data_to_state_data(
        &mut self,
        _realm: &mut Realm,
    ) -> Result<(), EquationSystemError> {
        self.record("boundary_data_to_state_data")
    }

    fn evaluate_properties(&mut self, _realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.record("evaluate_properties")
    }

    fn pre_timestep_work(&mut self, _realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.record("pre_timestep_work")
    }

    fn predict_state(&mut self, _realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.record("predict_state")
    }

    fn pre_iter_work(&mut self, _realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.record("pre_iter_work")
    }

    fn solve_and_update(&mut self, _realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.record("solve_and_update")
    }

    fn post_iter_work(&mut self, _realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.record("post_iter_work")
    }

    fn post_iter_work_dep(&mut self, _realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.record("post_iter_work_dep")
    }

    fn post_converged_work(&mut self, _realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.record("post_converged_work")
    }

    fn post_adapt_work(&mut self, _realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.record("post_adapt_work")
    }

    fn post_external_data_transfer_work(
        &mut self,
        _realm: &mut Realm,
    ) -> Result<(), EquationSystemError> {
        self.record("post_external_data_transfer_work")
    }

    fn provide_output(&mut self, _realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.record("provide_output")
    }

    fn dump_eq_time(&self) {
        self.log.push(format!("{}.dump_eq_time", self.core.name));
    }

    fn system_is_converged(&mut self) -> bool {
        self.log
            .push(format!("{}.system_is_converged", self.core.name));
        let answer = if self.convergence.len() > 1 {
            self.convergence.pop_front().unwrap_or(true)
        } else {
            self.convergence.front().copied().unwrap_or(true)
        };
        self.core.record_convergence(answer);
        answer
    }

    fn provide_scaled_norm(&self) -> f64 {
        self.scaled_norm
    }

    fn provide_norm(&self) -> f64 {
        self.norm
    }

    fn provide_norm_increment(&self) -> f64 {
        self.increment
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

// ── RecordingRealmHooks ────────────────────────────────────────────

/// Realm hooks that log `realm.{hook}:{part}`.
#[derive(Clone, Debug, Default)]
pub struct RecordingRealmHooks {
    log: CallLog,
}

impl RecordingRealmHooks {
    pub fn new(log: CallLog) -> Self {
        Self { log }
    }

    fn record(&self, hook: &str, part: &Part) {
        self.log.push(format!("realm.{hook}:{}", part.name()));
    }
}

impl RealmHooks for RecordingRealmHooks {
    fn register_nodal_fields(&mut self, part: &Part) {
        self.record("register_nodal_fields", part);
    }

    fn register_interior_algorithm(&mut self, part: &Part) {
        self.record("register_interior_algorithm", part);
    }

    fn register_wall_bc(&mut self, part: &Part, _topology: Topology, _data: &BoundaryConditionData) {
        self.record("register_wall_bc", part);
    }

    fn register_inflow_bc(
        &mut self,
        part: &Part,
        _topology: Topology,
        _data: &BoundaryConditionData,
    ) {
        self.record("register_inflow_bc", part);
    }

    fn register_open_bc(&mut self, part: &Part, _topology: Topology, _data: &BoundaryConditionData) {
        self.record("register_open_bc", part);
    }

    fn register_symmetry_bc(
        &mut self,
        part: &Part,
        _topology: Topology,
        _data: &BoundaryConditionData,
    ) {
        self.record("register_symmetry_bc", part);
    }

    fn register_abltop_bc(
        &mut self,
        part: &Part,
        _topology: Topology,
        _data: &BoundaryConditionData,
    ) {
        self.record("register_abltop_bc", part);
    }

    fn register_periodic_bc(
        &mut self,
        master: &Part,
        slave: &Part,
        _search_tolerance: f64,
        _search_method: &str,
    ) {
        self.log.push(format!(
            "realm.register_periodic_bc:{}:{}",
            master.name(),
            slave.name()
        ));
    }

    fn setup_non_conformal_bc(&mut self, data: &NonConformalBoundaryConditionData) {
        self.log.push(format!(
            "realm.setup_non_conformal_bc:{}",
            data.current_target_names.join(",")
        ));
    }

    fn register_non_conformal_bc(&mut self, part: &Part, _topology: Topology) {
        self.record("register_non_conformal_bc", part);
    }

    fn register_overset_bc(&mut self, _data: &OversetBoundaryConditionData) {
        self.log.push("realm.register_overset_bc");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_convergence_repeats_the_last_answer() {
        let log = CallLog::new();
        let mut sys = RecordingEquationSystem::new("a", log.clone()).with_convergence([false, true]);
        assert!(!sys.system_is_converged());
        assert!(sys.system_is_converged());
        assert!(sys.system_is_converged());
        assert_eq!(log.count("a.system_is_converged"), 3);
    }

    #[test]
    fn mock_linear_system_scales_by_first_residual() {
        let mut l = MockLinearSystem::new("m", 1, CallLog::new()).with_residuals([4.0, 1.0]);
        let mut delta = vec![1.0; 2];
        l.solve(&mut delta).unwrap();
        l.solve(&mut delta).unwrap();
        assert_eq!(l.scaled_nonlinear_residual(), 0.25);
        assert_eq!(delta, vec![0.0, 0.0]);
    }
}
