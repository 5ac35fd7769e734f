//! Zephyr: equation-system orchestration for low-Mach CFD.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Zephyr sub-crates. For most users, adding `zephyr` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use zephyr::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // One hexahedron with a pinned inflow face.
//! let mut mesh = MeshDatabase::new(3);
//! mesh.set_entity_count(EntityRank::Node, 8);
//! mesh.set_entity_count(EntityRank::Element, 1);
//! mesh.set_entity_count(EntityRank::Face, 1);
//! let block = mesh.declare_part_with_topology("block_1", Topology::Hex8)?;
//! mesh.add_entities(block, EntityRank::Element, &[0])?;
//! mesh.add_entities(block, EntityRank::Node, &[0, 1, 2, 3, 4, 5, 6, 7])?;
//! let inflow = mesh.declare_part_with_topology("inflow", Topology::Quad4)?;
//! mesh.add_entities(inflow, EntityRank::Face, &[0])?;
//! mesh.add_entities(inflow, EntityRank::Node, &[0, 1, 2, 3])?;
//!
//! let config = SimulationConfig::from_yaml(
//!     r#"
//! target_names: [block_1]
//! boundary_conditions:
//!   - type: inflow
//!     target_name: inflow
//!     user_data:
//!       temperature: [2.0]
//! equation_systems:
//!   name: theEqSys
//!   solver_system_specification:
//!     temperature: solve_scalar
//!   systems:
//!     - HeatConduction:
//! "#,
//! )?;
//! let realm = Simulation::realm_for(mesh, &config)?;
//! let mut sim = Simulation::new(realm, config, &StandardFactory)?;
//! sim.initialize()?;
//! let report = sim.step()?;
//! assert_eq!(report.step, 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `zephyr-core` | IDs, ranks, topologies, field handles, errors |
//! | [`mesh`] | `zephyr-mesh` | Mesh database, parts, field storage |
//! | [`fields`] | `zephyr-fields` | Field catalog and field manager |
//! | [`eqsys`] | `zephyr-eqsys` | Equation-system trait, realm, algorithms, linear systems |
//! | [`systems`] | `zephyr-systems` | Concrete transport and coupled systems |
//! | [`engine`] | `zephyr-engine` | Orchestrator, input documents, simulation driver |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and IDs (`zephyr-core`).
pub use zephyr_core as types;

/// Mesh database (`zephyr-mesh`).
///
/// [`mesh::MeshDatabase`] holds parts, entity counts, and time-state
/// field storage.
pub use zephyr_mesh as mesh;

/// Field catalog and manager (`zephyr-fields`).
pub use zephyr_fields as fields;

/// Equation-system capability trait and realm (`zephyr-eqsys`).
///
/// The [`eqsys::EquationSystem`] trait is the main extension point for
/// user-defined physics.
pub use zephyr_eqsys as eqsys;

/// Concrete equation systems (`zephyr-systems`).
pub use zephyr_systems as systems;

/// Orchestration and simulation driving (`zephyr-engine`).
///
/// [`engine::EquationSystems`] runs the lifecycle of a realm's systems;
/// [`engine::Simulation`] wires one from an input document.
pub use zephyr_engine as engine;

/// Common imports for typical Zephyr usage.
///
/// ```rust
/// use zephyr::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use zephyr_core::{
        EntityRank, FieldError, FieldId, FieldState, FieldType, MeshError, PartId, ScalarField,
        Topology, VectorField,
    };

    // Mesh and fields
    pub use zephyr_fields::{FieldManager, FieldOverrides};
    pub use zephyr_mesh::MeshDatabase;

    // Equation systems
    pub use zephyr_eqsys::{
        BoundaryConditionData, EquationSystem, EquationSystemCore, EquationSystemError,
        EquationSystemFactory, EquationSystemKind, Realm, SolverSpecification, SystemConfig,
    };
    pub use zephyr_systems::StandardFactory;

    // Engine
    pub use zephyr_engine::{
        EngineError, EquationSystems, Simulation, SimulationConfig, TimestepReport,
    };
}
