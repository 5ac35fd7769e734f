//! The [`Realm`]: the mesh, its field manager, and realm-level collaborators.
//!
//! Equation systems never own the realm. Every hook receives it as a
//! context argument, so the back-reference of a system to its realm is a
//! borrow for the duration of one call.

use std::fmt;

use zephyr_core::{EntityRank, FieldError, FieldState, MeshError, PartId, Topology};
use zephyr_fields::FieldManager;
use zephyr_mesh::{MeshDatabase, Part};

use crate::bc::{
    BoundaryConditionData, NonConformalBoundaryConditionData, OversetBoundaryConditionData,
};
use crate::linsys::{DiagonalSolverFactory, LinearSolverFactory};
use crate::overset::OversetExchange;

// ── TimeInfo ───────────────────────────────────────────────────────

/// Time-integration state of a realm.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeInfo {
    /// Current timestep size.
    pub dt: f64,
    /// Simulation time at `StateNP1`.
    pub current_time: f64,
    /// Completed timesteps.
    pub step_count: u64,
}

impl Default for TimeInfo {
    fn default() -> Self {
        Self {
            dt: 1.0,
            current_time: 0.0,
            step_count: 0,
        }
    }
}

// ── RealmHooks ─────────────────────────────────────────────────────

/// Realm-level reactions to registration calls.
///
/// The orchestrator notifies the realm before any equation system. Every
/// method defaults to a no-op.
#[allow(unused_variables)]
pub trait RealmHooks: Send {
    /// Nodal fields were registered on `part`.
    fn register_nodal_fields(&mut self, part: &Part) {}

    /// An interior (element) part was registered.
    fn register_interior_algorithm(&mut self, part: &Part) {}

    /// A wall condition on `part`.
    fn register_wall_bc(&mut self, part: &Part, topology: Topology, data: &BoundaryConditionData) {
    }

    /// An inflow condition on `part`.
    fn register_inflow_bc(
        &mut self,
        part: &Part,
        topology: Topology,
        data: &BoundaryConditionData,
    ) {
    }

    /// An open condition on `part`.
    fn register_open_bc(&mut self, part: &Part, topology: Topology, data: &BoundaryConditionData) {
    }

    /// A symmetry condition on `part`.
    fn register_symmetry_bc(
        &mut self,
        part: &Part,
        topology: Topology,
        data: &BoundaryConditionData,
    ) {
    }

    /// An ABL-top condition on `part`.
    fn register_abltop_bc(
        &mut self,
        part: &Part,
        topology: Topology,
        data: &BoundaryConditionData,
    ) {
    }

    /// A periodic pairing.
    fn register_periodic_bc(
        &mut self,
        master: &Part,
        slave: &Part,
        search_tolerance: f64,
        search_method: &str,
    ) {
    }

    /// A non-conformal interface was declared.
    fn setup_non_conformal_bc(&mut self, data: &NonConformalBoundaryConditionData) {}

    /// One side of a non-conformal interface.
    fn register_non_conformal_bc(&mut self, part: &Part, topology: Topology) {}

    /// An overset assembly was declared.
    fn register_overset_bc(&mut self, data: &OversetBoundaryConditionData) {}
}

/// Hooks that ignore everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRealmHooks;

impl RealmHooks for NoRealmHooks {}

// ── Realm ──────────────────────────────────────────────────────────

/// Context shared by every equation system of one simulation domain.
pub struct Realm {
    mesh: MeshDatabase,
    field_manager: FieldManager,
    time: TimeInfo,
    uses_edges: bool,
    solvers: Box<dyn LinearSolverFactory>,
    overset: Option<Box<dyn OversetExchange>>,
    hooks: Box<dyn RealmHooks>,
}

impl fmt::Debug for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Realm")
            .field("spatial_dimension", &self.mesh.spatial_dimension())
            .field("num_states", &self.field_manager.num_states())
            .field("time", &self.time)
            .field("uses_edges", &self.uses_edges)
            .field("has_overset", &self.has_overset())
            .finish()
    }
}

impl Realm {
    /// Wrap `mesh` with a field manager for `num_states` time-states.
    ///
    /// Starts with a diagonal solver factory, no overset, and no hooks.
    pub fn new(mesh: MeshDatabase, num_states: u32) -> Result<Self, FieldError> {
        let field_manager = FieldManager::new(&mesh, num_states)?;
        Ok(Self {
            mesh,
            field_manager,
            time: TimeInfo::default(),
            uses_edges: false,
            solvers: Box::new(DiagonalSolverFactory),
            overset: None,
            hooks: Box::new(NoRealmHooks),
        })
    }

    /// Use `exchange` for overset fringe updates.
    pub fn with_overset(mut self, exchange: Box<dyn OversetExchange>) -> Self {
        self.overset = Some(exchange);
        self
    }

    /// Notify `hooks` of realm-level registrations.
    pub fn with_hooks(mut self, hooks: Box<dyn RealmHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Build linear systems with `factory`.
    pub fn with_solver_factory(mut self, factory: Box<dyn LinearSolverFactory>) -> Self {
        self.solvers = factory;
        self
    }

    /// Select edge-based discretization defaults.
    pub fn with_uses_edges(mut self, uses_edges: bool) -> Self {
        self.uses_edges = uses_edges;
        self
    }

    /// Set the timestep size.
    pub fn with_time_step(mut self, dt: f64) -> Self {
        self.time.dt = dt;
        self
    }

    /// The mesh database.
    pub fn mesh(&self) -> &MeshDatabase {
        &self.mesh
    }

    /// Mutable access to the mesh database.
    pub fn mesh_mut(&mut self) -> &mut MeshDatabase {
        &mut self.mesh
    }

    /// The realm's field manager.
    pub fn field_manager(&self) -> FieldManager {
        self.field_manager
    }

    /// Time-integration state.
    pub fn time(&self) -> TimeInfo {
        self.time
    }

    /// Move to the next timestep.
    pub fn advance_time(&mut self) {
        self.time.current_time += self.time.dt;
        self.time.step_count += 1;
    }

    /// Whether the discretization is edge-based.
    pub fn uses_edges(&self) -> bool {
        self.uses_edges
    }

    /// Whether the realm declares overset meshes.
    pub fn has_overset(&self) -> bool {
        self.overset.is_some()
    }

    /// The overset exchange together with the mesh it acts on.
    pub fn overset_and_mesh(&mut self) -> Option<(&mut dyn OversetExchange, &mut MeshDatabase)> {
        let exchange: &mut dyn OversetExchange = self.overset.as_deref_mut()?;
        Some((exchange, &mut self.mesh))
    }

    /// The linear solver factory.
    pub fn solver_factory(&self) -> &dyn LinearSolverFactory {
        self.solvers.as_ref()
    }

    /// Look up a part by name.
    pub fn part(&self, name: &str) -> Result<&Part, MeshError> {
        self.mesh
            .get_part(name)
            .ok_or_else(|| MeshError::UnknownPart {
                name: name.to_string(),
            })
    }

    /// Rank of boundary sides: faces in 3-D, edges in 2-D.
    pub fn side_rank(&self) -> EntityRank {
        self.mesh.side_rank()
    }

    // ── Realm-side registration ─────────────────────────────────

    /// Register the geometric nodal fields every system relies on.
    ///
    /// `coordinates`, `dual_nodal_volume` (initialised to 1), and when the
    /// realm has overset, `iblank` (initialised to 1, i.e. field points).
    pub fn register_nodal_fields(&mut self, part: PartId) -> Result<(), FieldError> {
        let fm = self.field_manager;
        let parts = [part];
        fm.register_field::<zephyr_core::VectorField>(
            &mut self.mesh,
            "coordinates",
            &parts,
            None,
            FieldState::NONE,
        )?;
        fm.register_field::<zephyr_core::ScalarField>(
            &mut self.mesh,
            "dual_nodal_volume",
            &parts,
            Some(&[1.0]),
            FieldState::NONE,
        )?;
        if self.has_overset() {
            fm.register_field::<zephyr_core::ScalarIntField>(
                &mut self.mesh,
                "iblank",
                &parts,
                Some(&[1.0]),
                FieldState::NONE,
            )?;
        }
        if let Some(p) = self.mesh.part(part) {
            self.hooks.register_nodal_fields(p);
        }
        Ok(())
    }

    /// Forward an interior part to the hooks.
    pub fn register_interior_algorithm(&mut self, part: PartId) {
        if let Some(p) = self.mesh.part(part) {
            self.hooks.register_interior_algorithm(p);
        }
    }

    /// Forward a wall condition to the hooks.
    pub fn register_wall_bc(&mut self, part: PartId, topo: Topology, data: &BoundaryConditionData) {
        if let Some(p) = self.mesh.part(part) {
            self.hooks.register_wall_bc(p, topo, data);
        }
    }

    /// Forward an inflow condition to the hooks.
    pub fn register_inflow_bc(
        &mut self,
        part: PartId,
        topo: Topology,
        data: &BoundaryConditionData,
    ) {
        if let Some(p) = self.mesh.part(part) {
            self.hooks.register_inflow_bc(p, topo, data);
        }
    }

    /// Forward an open condition to the hooks.
    pub fn register_open_bc(&mut self, part: PartId, topo: Topology, data: &BoundaryConditionData) {
        if let Some(p) = self.mesh.part(part) {
            self.hooks.register_open_bc(p, topo, data);
        }
    }

    /// Forward a symmetry condition to the hooks.
    pub fn register_symmetry_bc(
        &mut self,
        part: PartId,
        topo: Topology,
        data: &BoundaryConditionData,
    ) {
        if let Some(p) = self.mesh.part(part) {
            self.hooks.register_symmetry_bc(p, topo, data);
        }
    }

    /// Forward an ABL-top condition to the hooks.
    pub fn register_abltop_bc(
        &mut self,
        part: PartId,
        topo: Topology,
        data: &BoundaryConditionData,
    ) {
        if let Some(p) = self.mesh.part(part) {
            self.hooks.register_abltop_bc(p, topo, data);
        }
    }

    /// Forward a periodic pairing to the hooks.
    pub fn register_periodic_bc(
        &mut self,
        master: PartId,
        slave: PartId,
        search_tolerance: f64,
        search_method: &str,
    ) {
        if let (Some(m), Some(s)) = (self.mesh.part(master), self.mesh.part(slave)) {
            self.hooks
                .register_periodic_bc(m, s, search_tolerance, search_method);
        }
    }

    /// Forward a non-conformal interface declaration to the hooks.
    pub fn setup_non_conformal_bc(&mut self, data: &NonConformalBoundaryConditionData) {
        self.hooks.setup_non_conformal_bc(data);
    }

    /// Forward one side of a non-conformal interface to the hooks.
    pub fn register_non_conformal_bc(&mut self, part: PartId, topo: Topology) {
        if let Some(p) = self.mesh.part(part) {
            self.hooks.register_non_conformal_bc(p, topo);
        }
    }

    /// Forward an overset declaration to the hooks.
    pub fn register_overset_bc(&mut self, data: &OversetBoundaryConditionData) {
        self.hooks.register_overset_bc(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overset::NoFringeExchange;

    fn mesh() -> MeshDatabase {
        let mut mesh = MeshDatabase::new(3);
        mesh.set_entity_count(EntityRank::Node, 8);
        mesh
    }

    #[test]
    fn nodal_fields_include_iblank_only_with_overset() {
        let mut plain = Realm::new(mesh(), 2).unwrap();
        plain.register_nodal_fields(PartId::UNIVERSAL).unwrap();
        let fm = plain.field_manager();
        assert!(fm.field_exists(plain.mesh(), "dual_nodal_volume").unwrap());
        assert!(!fm.field_exists(plain.mesh(), "iblank").unwrap());

        let mut overset = Realm::new(mesh(), 2)
            .unwrap()
            .with_overset(Box::new(NoFringeExchange));
        overset.register_nodal_fields(PartId::UNIVERSAL).unwrap();
        let fm = overset.field_manager();
        assert!(fm.field_exists(overset.mesh(), "iblank").unwrap());
    }

    #[test]
    fn dual_volume_starts_at_one() {
        let mut realm = Realm::new(mesh(), 2).unwrap();
        realm.register_nodal_fields(PartId::UNIVERSAL).unwrap();
        let id = realm
            .mesh()
            .get_field(EntityRank::Node, "dual_nodal_volume")
            .unwrap();
        assert!(realm.mesh().real(id).unwrap().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn unknown_part_is_reported_by_name() {
        let realm = Realm::new(mesh(), 2).unwrap();
        match realm.part("inlet") {
            Err(MeshError::UnknownPart { name }) => assert_eq!(name, "inlet"),
            other => panic!("expected UnknownPart, got {other:?}"),
        }
    }

    #[test]
    fn advancing_time_accumulates_dt() {
        let mut realm = Realm::new(mesh(), 2).unwrap().with_time_step(0.25);
        realm.advance_time();
        realm.advance_time();
        assert_eq!(realm.time().current_time, 0.5);
        assert_eq!(realm.time().step_count, 2);
    }
}
