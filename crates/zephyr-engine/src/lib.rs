//! Equation-system orchestration for Zephyr.
//!
//! [`EquationSystems`] owns the systems of one realm and drives them
//! through registration, initialization, and the per-timestep nonlinear
//! loop. [`Simulation`] wires a realm and its systems from a
//! [`SimulationConfig`] document and steps them.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod equation_systems;
pub mod error;
pub mod metrics;
pub mod overset;
pub mod simulation;

pub use config::{
    BoundaryCondition, ConstantInitialCondition, EquationSystemsConfig, InitialCondition,
    RelaxationBlock, SimulationConfig, SystemBlock,
};
pub use equation_systems::{EquationSystems, EMPTY_SYSTEM_NORM};
pub use error::EngineError;
pub use metrics::TimestepReport;
pub use overset::{OversetFieldUpdate, OversetUpdateDriver};
pub use simulation::Simulation;
