//! Core types and traits for the Zephyr low-Mach flow solver.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the mesh database, the field registry, the
//! equation systems, and the orchestrator: identifiers, entity ranks and
//! topologies, field kinds and time-states, typed field handles, and the
//! error taxonomy.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod field;
pub mod id;
pub mod rank;

pub use error::{FieldError, MeshError};
pub use field::{
    FieldDescriptor, FieldKind, FieldPointer, FieldState, FieldType, GenericField,
    GlobalIdField, ScalarField, ScalarIntField, TensorField, VectorField, MAX_FIELD_STATES,
};
pub use id::{FieldId, PartId};
pub use rank::{EntityRank, Topology};
