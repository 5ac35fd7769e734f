//! Test utilities and mock types for Zephyr development.
//!
//! Provides recording implementations of the collaborator traits
//! ([`EquationSystem`](zephyr_eqsys::EquationSystem),
//! [`RealmHooks`](zephyr_eqsys::RealmHooks),
//! [`LinearSystem`](zephyr_eqsys::LinearSystem)) that write every call
//! into a shared [`CallLog`], plus mesh fixtures in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::{channel_mesh, channel_realm, fill_coordinates, ChannelMesh};
pub use mocks::{
    CallLog, MockLinearSystem, RecordingEquationSystem, RecordingRealmHooks,
    RecordingSolverFactory,
};
