//! In-memory mesh database for Zephyr.
//!
//! The [`MeshDatabase`] is the collaborator the field layer and the
//! equation systems talk to. It holds:
//!
//! - entity counts per [`EntityRank`](zephyr_core::EntityRank),
//! - named [`Part`]s with a rank, a topology, subsets, and members,
//! - a field schema: every declared field gets one
//!   [`FieldId`](zephyr_core::FieldId) per time-state slot,
//! - dense per-entity storage behind each slot, plus device mirrors.
//!
//! # Time-state storage
//!
//! ```text
//! slot:    NP1   N    NM1
//! buffer:  [2]  [0]   [1]    <- rotate_field_states() shifts the mapping
//! ```
//!
//! Slot identity is stable for the database's lifetime. Only the
//! slot-to-buffer mapping rotates, so a handle resolved for `StateN`
//! always reads "the previous step".
//!
//! The schema is append-only: fields and parts cannot be removed.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod database;
pub mod ngp;
pub mod part;
pub mod schema;

pub use database::MeshDatabase;
pub use ngp::NgpField;
pub use part::Part;
pub use schema::{FieldDeclaration, FieldSchema, FieldValues};
