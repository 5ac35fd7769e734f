//! [`Simulation`]: a realm, its equation systems, and the input that
//! wired them, driven one timestep at a time.

use zephyr_core::{EntityRank, FieldError};
use zephyr_eqsys::{
    Algorithm, ConstantFieldAlgorithm, EquationSystem, EquationSystemFactory, NoFringeExchange,
    Realm,
};
use zephyr_mesh::MeshDatabase;

use crate::config::{BoundaryCondition, InitialCondition, SimulationConfig};
use crate::equation_systems::EquationSystems;
use crate::error::EngineError;
use crate::metrics::TimestepReport;

/// A configured realm and its equation systems.
#[derive(Debug)]
pub struct Simulation {
    realm: Realm,
    systems: EquationSystems,
    config: SimulationConfig,
}

impl Simulation {
    /// A realm over `mesh` shaped by `config`: time-states, timestep,
    /// discretization, and a fringe exchange when any boundary condition
    /// is overset.
    pub fn realm_for(mesh: MeshDatabase, config: &SimulationConfig) -> Result<Realm, EngineError> {
        let mut realm = Realm::new(mesh, config.num_states)?
            .with_time_step(config.time_step)
            .with_uses_edges(config.uses_edges);
        let has_overset = config
            .boundary_conditions
            .iter()
            .any(|bc| matches!(bc, BoundaryCondition::Overset(_)));
        if has_overset {
            realm = realm.with_overset(Box::new(NoFringeExchange));
        }
        Ok(realm)
    }

    /// Build every system and run all registration phases in order:
    /// fields, interior algorithms, boundary conditions, post-processing,
    /// then user-function initial conditions.
    pub fn new(
        mut realm: Realm,
        config: SimulationConfig,
        factory: &dyn EquationSystemFactory,
    ) -> Result<Self, EngineError> {
        let mut systems = EquationSystems::load(&config.equation_systems, &realm, factory)?;
        let targets = &config.target_names;

        systems.register_nodal_fields(&mut realm, targets)?;
        if realm.uses_edges() {
            systems.register_edge_fields(&mut realm, targets)?;
        }
        systems.register_element_fields(&mut realm, targets)?;
        systems.register_interior_algorithm(&mut realm, targets)?;

        for bc in &config.boundary_conditions {
            match bc {
                BoundaryCondition::Wall(data) => systems.register_wall_bc(&mut realm, data)?,
                BoundaryCondition::Inflow(data) => systems.register_inflow_bc(&mut realm, data)?,
                BoundaryCondition::Open(data) => systems.register_open_bc(&mut realm, data)?,
                BoundaryCondition::Symmetry(data) => {
                    systems.register_symmetry_bc(&mut realm, data)?
                }
                BoundaryCondition::Abltop(data) => systems.register_abltop_bc(&mut realm, data)?,
                BoundaryCondition::Periodic(data) => {
                    systems.register_periodic_bc(&mut realm, data)?
                }
                BoundaryCondition::NonConformal(data) => {
                    systems.register_non_conformal_bc(&mut realm, data)?
                }
                BoundaryCondition::Overset(data) => {
                    systems.register_overset_bc(&mut realm, data)?
                }
            }
        }

        for pp in &config.post_processing {
            systems.register_surface_pp_algorithm(&mut realm, pp)?;
        }

        for ic in &config.initial_conditions {
            if let InitialCondition::UserFunction(data) = ic {
                systems.register_initial_condition_fcn(&mut realm, data)?;
            }
        }

        Ok(Self {
            realm,
            systems,
            config,
        })
    }

    /// Copy interleaved nodal coordinates into the `coordinates` field.
    pub fn set_coordinates(&mut self, coordinates: &[f64]) -> Result<(), EngineError> {
        let mesh = self.realm.mesh_mut();
        let not_registered = || FieldError::NotRegistered {
            name: "coordinates".to_string(),
        };
        let id = mesh
            .get_field(EntityRank::Node, "coordinates")
            .ok_or_else(not_registered)?;
        let buf = mesh.real_mut(id).ok_or_else(not_registered)?;
        let n = buf.len().min(coordinates.len());
        buf[..n].copy_from_slice(&coordinates[..n]);
        Ok(())
    }

    /// Initialize the systems, apply constant initial conditions, and
    /// bring boundary data, derived quantities, and properties up to date.
    pub fn initialize(&mut self) -> Result<(), EngineError> {
        self.systems.initialize(&mut self.realm)?;
        self.apply_constant_initial_conditions()?;
        self.systems.populate_boundary_data(&mut self.realm)?;
        self.systems.boundary_data_to_state_data(&mut self.realm)?;
        self.systems.initial_work(&mut self.realm)?;
        self.systems.populate_derived_quantities(&mut self.realm)?;
        self.systems.evaluate_properties(&mut self.realm)?;
        Ok(())
    }

    fn apply_constant_initial_conditions(&mut self) -> Result<(), EngineError> {
        for ic in &self.config.initial_conditions {
            let InitialCondition::Constant(constant) = ic else {
                continue;
            };
            let mut parts = Vec::with_capacity(constant.target_names.len());
            for name in &constant.target_names {
                parts.push(self.realm.part(name)?.id());
            }
            for (field, values) in &constant.value {
                let id = self.realm.mesh().find_field(field).ok_or_else(|| {
                    FieldError::NotRegistered {
                        name: field.clone(),
                    }
                })?;
                log::debug!("constant initial condition on {field}");
                ConstantFieldAlgorithm::new(
                    format!("constant_ic_{field}"),
                    id,
                    parts.clone(),
                    values.clone(),
                )
                .execute(&mut self.realm)?;
            }
        }
        Ok(())
    }

    /// Advance one timestep: rotate states, advance time, refresh
    /// boundary data and properties, then run the nonlinear loop.
    pub fn step(&mut self) -> Result<TimestepReport, EngineError> {
        if !self.systems.is_initialized() {
            return Err(EngineError::NotReady {
                reason: "step called before initialize".to_string(),
            });
        }
        self.realm.mesh_mut().rotate_field_states();
        self.realm.advance_time();
        self.systems.populate_boundary_data(&mut self.realm)?;
        self.systems.boundary_data_to_state_data(&mut self.realm)?;
        self.systems.evaluate_properties(&mut self.realm)?;
        let report = self.systems.advance_timestep(&mut self.realm)?;
        log::info!(
            "step {} t={:.6e}: {} passes, converged={}, max norm {:e}",
            report.step,
            self.realm.time().current_time,
            report.nonlinear_iterations,
            report.converged,
            report.max_scaled_norm
        );
        Ok(report)
    }

    /// Run `steps` timesteps, returning every report.
    pub fn run(&mut self, steps: u64) -> Result<Vec<TimestepReport>, EngineError> {
        (0..steps).map(|_| self.step()).collect()
    }

    /// The realm.
    pub fn realm(&self) -> &Realm {
        &self.realm
    }

    /// Mutable realm, for seeding fields between steps.
    pub fn realm_mut(&mut self) -> &mut Realm {
        &mut self.realm
    }

    /// The equation systems.
    pub fn systems(&self) -> &EquationSystems {
        &self.systems
    }

    /// Mutable equation systems, for adding drivers.
    pub fn systems_mut(&mut self) -> &mut EquationSystems {
        &mut self.systems
    }

    /// The system named `name`.
    pub fn system(&self, name: &str) -> Option<&dyn EquationSystem> {
        self.systems.system(name)
    }

    /// The input the simulation was built from.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}
