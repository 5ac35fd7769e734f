//! Field registry and field manager for Zephyr.
//!
//! The [`FieldRegistry`] is a static catalog keyed by
//! (spatial dimension, number of states). It maps every field name the
//! solver knows to a [`FieldDescriptor`](zephyr_core::FieldDescriptor).
//! The [`FieldManager`] uses one registry to declare fields on a
//! [`MeshDatabase`](zephyr_mesh::MeshDatabase) and to hand out
//! type-checked handles.
//!
//! Two managers with the same key share one registry and therefore see
//! the same fields on a shared mesh database.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod manager;
pub mod registry;

pub use manager::{FieldManager, FieldOverrides};
pub use registry::{FieldRegistry, FieldTemplate, RankTemplate};
