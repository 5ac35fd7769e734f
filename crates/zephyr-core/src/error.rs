//! Error types shared by the mesh database and the field layer.
//!
//! Every variant here is fatal to the run that produced it: the caller is
//! expected to abort setup on `Err`. Soft-validation findings are logged,
//! never returned.

use crate::field::{FieldKind, FieldState};
use crate::rank::EntityRank;

/// Errors from field registration and lookup.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// The name has no registry entry for the manager's
    /// (spatial dimension, number of states) key.
    #[error("field '{name}' is not defined for dimension {spatial_dimension} with {num_states} states")]
    UnknownField {
        /// The unresolved field name.
        name: String,
        /// Spatial dimension of the registry key.
        spatial_dimension: u32,
        /// Number of states of the registry key.
        num_states: u32,
    },
    /// The requested handle type disagrees with the registry descriptor.
    #[error("field '{name}' is a {actual}, requested as {expected}")]
    TypeMismatch {
        /// Field name.
        name: String,
        /// Kind the caller asked for.
        expected: FieldKind,
        /// Kind declared by the registry.
        actual: FieldKind,
    },
    /// A repeated declaration would change an existing field's layout.
    #[error("field '{name}' already declared with {existing}, cannot redeclare with {requested}")]
    ConflictingRedefinition {
        /// Field name.
        name: String,
        /// The layout recorded on the mesh database.
        existing: String,
        /// The layout the new declaration asked for.
        requested: String,
    },
    /// The name is known but no storage was declared for it yet.
    #[error("field '{name}' has not been registered on the mesh")]
    NotRegistered {
        /// Field name.
        name: String,
    },
    /// The requested time-state exceeds the field's state count.
    #[error("field '{name}' has {num_states} states, {state} is out of range")]
    StateOutOfRange {
        /// Field name.
        name: String,
        /// The requested state.
        state: FieldState,
        /// Number of states the field was declared with.
        num_states: u32,
    },
    /// A declaration asked for an unusable state or component count.
    #[error("field '{name}' cannot have {num_states} states x {num_components} components")]
    InvalidLayout {
        /// Field name.
        name: String,
        /// Requested number of states.
        num_states: u32,
        /// Requested number of components.
        num_components: u32,
    },
    /// No registry exists for the given key.
    #[error("no field registry for dimension {spatial_dimension} with {num_states} states")]
    UnsupportedKey {
        /// Requested spatial dimension.
        spatial_dimension: u32,
        /// Requested number of states.
        num_states: u32,
    },
}

/// Errors from mesh-part resolution and construction.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MeshError {
    /// No part with this name exists on the mesh database.
    #[error("part '{name}' does not exist")]
    UnknownPart {
        /// The unresolved part name.
        name: String,
    },
    /// A part (or one of its subsets) has the wrong entity rank.
    #[error("part '{part}' has rank {}, expected {expected}", rank_label(.actual))]
    WrongEntityRank {
        /// Offending part or subset name.
        part: String,
        /// Rank required by the caller.
        expected: EntityRank,
        /// Rank the part actually has (`None` for rankless assembly parts).
        actual: Option<EntityRank>,
    },
    /// A part with this name was already declared.
    #[error("part '{name}' declared twice")]
    DuplicatePart {
        /// The duplicated name.
        name: String,
    },
    /// An entity index exceeds the rank's entity count.
    #[error("entity {index} out of range for {rank} with {count} entities")]
    EntityOutOfRange {
        /// Rank of the entity.
        rank: EntityRank,
        /// Offending index.
        index: usize,
        /// Number of entities of that rank.
        count: usize,
    },
}

fn rank_label(rank: &Option<EntityRank>) -> String {
    match rank {
        Some(r) => r.to_string(),
        None => "INVALID_RANK".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let e = FieldError::TypeMismatch {
            name: "velocity".into(),
            expected: FieldKind::Scalar,
            actual: FieldKind::Vector,
        };
        let msg = e.to_string();
        assert!(msg.contains("velocity"));
        assert!(msg.contains("VectorFieldType"));
        assert!(msg.contains("ScalarFieldType"));

        let e = MeshError::WrongEntityRank {
            part: "surface_1".into(),
            expected: EntityRank::Face,
            actual: Some(EntityRank::Element),
        };
        assert_eq!(
            e.to_string(),
            "part 'surface_1' has rank ELEMENT_RANK, expected FACE_RANK"
        );
    }
}
