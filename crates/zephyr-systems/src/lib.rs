//! Concrete equation systems for Zephyr.
//!
//! Single-dof systems are [`TransportEquationSystem`]s described by a
//! [`TransportSpec`]. Low-Mach flow and the two-equation turbulence
//! models are [`CoupledEquationSystem`]s that sequence their children.
//! [`StandardFactory`] maps each
//! [`EquationSystemKind`](zephyr_eqsys::EquationSystemKind) to one of them.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod coupled;
pub mod factory;
pub mod specs;
pub mod transport;

pub use coupled::{num_sub_control_surfaces, Closure, CoupledEquationSystem, MassFlux};
pub use factory::StandardFactory;
pub use specs::TransportSpec;
pub use transport::{DerivedUpdate, TransportEquationSystem};
