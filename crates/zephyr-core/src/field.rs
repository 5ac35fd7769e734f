//! Field kinds, time-states, descriptors, and typed field handles.
//!
//! A field's *kind* is drawn from a small closed set ([`FieldKind`]). Every
//! lookup resolves the kind from the field registry and materialises a
//! [`FieldPointer`], a tagged union with one variant per kind. Callers ask
//! for a concrete handle type through [`FieldType::from_pointer`]; asking
//! for the wrong type yields the pointer's actual kind instead of a silent
//! coercion.

use std::fmt;

use crate::id::FieldId;
use crate::rank::EntityRank;

/// Maximum number of time-states a field may carry.
pub const MAX_FIELD_STATES: usize = 6;

// ── FieldState ─────────────────────────────────────────────────────

/// A named slot in a field's rotating time-state ring.
///
/// `NP1` is the current (most recent) state and is also the state used
/// when a caller does not care about time levels. Slot identity is stable;
/// the storage behind each slot rotates at a state-cycling boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum FieldState {
    /// Current state (`StateNP1`, `StateNew`, `StateNone`).
    #[default]
    NP1,
    /// Previous state (`StateN`, `StateOld`).
    N,
    /// Two steps back (`StateNM1`).
    NM1,
    /// Three steps back (`StateNM2`).
    NM2,
    /// Four steps back (`StateNM3`).
    NM3,
    /// Five steps back (`StateNM4`).
    NM4,
}

impl FieldState {
    /// The state used for single-state fields and state-agnostic access.
    pub const NONE: FieldState = FieldState::NP1;

    /// Position of this state in the ring (0 = current).
    pub fn index(self) -> usize {
        match self {
            Self::NP1 => 0,
            Self::N => 1,
            Self::NM1 => 2,
            Self::NM2 => 3,
            Self::NM3 => 4,
            Self::NM4 => 5,
        }
    }

    /// Inverse of [`index`](Self::index).
    pub fn from_index(index: usize) -> Option<FieldState> {
        match index {
            0 => Some(Self::NP1),
            1 => Some(Self::N),
            2 => Some(Self::NM1),
            3 => Some(Self::NM2),
            4 => Some(Self::NM3),
            5 => Some(Self::NM4),
            _ => None,
        }
    }
}

impl fmt::Display for FieldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NP1 => "StateNP1",
            Self::N => "StateN",
            Self::NM1 => "StateNM1",
            Self::NM2 => "StateNM2",
            Self::NM3 => "StateNM3",
            Self::NM4 => "StateNM4",
        };
        f.write_str(s)
    }
}

// ── FieldKind ──────────────────────────────────────────────────────

/// Classification of a field's value layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// One real value per entity.
    Scalar,
    /// `spatial_dimension` real values per entity.
    Vector,
    /// `spatial_dimension²` real values per entity.
    Tensor,
    /// Caller-sized real values per entity (generic scalar or vector).
    Generic,
    /// One integer value per entity (e.g. `iblank`).
    ScalarInt,
    /// One global identifier per entity.
    GlobalId,
}

impl FieldKind {
    /// Default component count for a field of this kind.
    pub fn default_components(self, spatial_dimension: u32) -> u32 {
        match self {
            Self::Scalar | Self::Generic | Self::ScalarInt | Self::GlobalId => 1,
            Self::Vector => spatial_dimension,
            Self::Tensor => spatial_dimension * spatial_dimension,
        }
    }

    /// Whether values of this kind are stored as `f64`.
    pub fn is_real(self) -> bool {
        matches!(self, Self::Scalar | Self::Vector | Self::Tensor | Self::Generic)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Scalar => "ScalarFieldType",
            Self::Vector => "VectorFieldType",
            Self::Tensor => "TensorFieldType",
            Self::Generic => "GenericFieldType",
            Self::ScalarInt => "ScalarIntFieldType",
            Self::GlobalId => "GlobalIdFieldType",
        };
        f.write_str(s)
    }
}

// ── FieldDescriptor ────────────────────────────────────────────────

/// Immutable registry entry describing how a named field is laid out.
///
/// Created when a registry is populated and never mutated afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    /// Value layout.
    pub kind: FieldKind,
    /// Entity rank the field lives on.
    pub rank: EntityRank,
    /// Default number of time-states.
    pub num_states: u32,
    /// Default number of components per entity.
    pub num_components: u32,
}

// ── Typed handles ──────────────────────────────────────────────────

/// A concrete field handle type that can be extracted from a [`FieldPointer`].
pub trait FieldType: Sized + Copy {
    /// The kind this handle type represents.
    const KIND: FieldKind;

    /// Extract a handle of this type, or `None` if the pointer holds
    /// another kind.
    fn from_pointer(pointer: FieldPointer) -> Option<Self>;

    /// Wrap this handle back into the tagged union.
    fn into_pointer(self) -> FieldPointer;

    /// The state slot this handle refers to.
    fn id(&self) -> FieldId;

    /// The time-state this handle was resolved for.
    fn state(&self) -> FieldState;
}

macro_rules! field_handle {
    ($(#[$doc:meta])* $name:ident, $variant:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub struct $name {
            id: FieldId,
            state: FieldState,
        }

        impl $name {
            /// Create a handle for the given state slot.
            pub fn new(id: FieldId, state: FieldState) -> Self {
                Self { id, state }
            }
        }

        impl FieldType for $name {
            const KIND: FieldKind = FieldKind::$variant;

            fn from_pointer(pointer: FieldPointer) -> Option<Self> {
                match pointer {
                    FieldPointer::$variant(h) => Some(h),
                    _ => None,
                }
            }

            fn into_pointer(self) -> FieldPointer {
                FieldPointer::$variant(self)
            }

            fn id(&self) -> FieldId {
                self.id
            }

            fn state(&self) -> FieldState {
                self.state
            }
        }
    };
}

field_handle!(
    /// Handle to a real scalar field state.
    ScalarField,
    Scalar
);
field_handle!(
    /// Handle to a real vector field state.
    VectorField,
    Vector
);
field_handle!(
    /// Handle to a real tensor field state.
    TensorField,
    Tensor
);
field_handle!(
    /// Handle to a caller-sized real field state.
    GenericField,
    Generic
);
field_handle!(
    /// Handle to an integer scalar field state.
    ScalarIntField,
    ScalarInt
);
field_handle!(
    /// Handle to a global-id field state.
    GlobalIdField,
    GlobalId
);

/// Tagged union over every field handle type.
///
/// The variant is chosen from the registry descriptor's [`FieldKind`],
/// never from the caller's expectation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldPointer {
    /// A scalar field.
    Scalar(ScalarField),
    /// A vector field.
    Vector(VectorField),
    /// A tensor field.
    Tensor(TensorField),
    /// A generic real field.
    Generic(GenericField),
    /// An integer scalar field.
    ScalarInt(ScalarIntField),
    /// A global-id field.
    GlobalId(GlobalIdField),
}

impl FieldPointer {
    /// Build the variant matching `kind` for a resolved state slot.
    pub fn from_kind(kind: FieldKind, id: FieldId, state: FieldState) -> Self {
        match kind {
            FieldKind::Scalar => Self::Scalar(ScalarField::new(id, state)),
            FieldKind::Vector => Self::Vector(VectorField::new(id, state)),
            FieldKind::Tensor => Self::Tensor(TensorField::new(id, state)),
            FieldKind::Generic => Self::Generic(GenericField::new(id, state)),
            FieldKind::ScalarInt => Self::ScalarInt(ScalarIntField::new(id, state)),
            FieldKind::GlobalId => Self::GlobalId(GlobalIdField::new(id, state)),
        }
    }

    /// The kind held by this pointer.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Scalar(_) => FieldKind::Scalar,
            Self::Vector(_) => FieldKind::Vector,
            Self::Tensor(_) => FieldKind::Tensor,
            Self::Generic(_) => FieldKind::Generic,
            Self::ScalarInt(_) => FieldKind::ScalarInt,
            Self::GlobalId(_) => FieldKind::GlobalId,
        }
    }

    /// The state slot this pointer refers to.
    pub fn id(&self) -> FieldId {
        match self {
            Self::Scalar(h) => h.id(),
            Self::Vector(h) => h.id(),
            Self::Tensor(h) => h.id(),
            Self::Generic(h) => h.id(),
            Self::ScalarInt(h) => h.id(),
            Self::GlobalId(h) => h.id(),
        }
    }

    /// The time-state this pointer was resolved for.
    pub fn state(&self) -> FieldState {
        match self {
            Self::Scalar(h) => h.state(),
            Self::Vector(h) => h.state(),
            Self::Tensor(h) => h.state(),
            Self::Generic(h) => h.state(),
            Self::ScalarInt(h) => h.state(),
            Self::GlobalId(h) => h.state(),
        }
    }

    /// Extract a typed handle, or `None` on kind disagreement.
    pub fn get<T: FieldType>(self) -> Option<T> {
        T::from_pointer(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const KINDS: [FieldKind; 6] = [
        FieldKind::Scalar,
        FieldKind::Vector,
        FieldKind::Tensor,
        FieldKind::Generic,
        FieldKind::ScalarInt,
        FieldKind::GlobalId,
    ];

    #[test]
    fn pointer_variant_follows_descriptor_kind() {
        for kind in KINDS {
            let p = FieldPointer::from_kind(kind, FieldId(7), FieldState::N);
            assert_eq!(p.kind(), kind);
            assert_eq!(p.id(), FieldId(7));
            assert_eq!(p.state(), FieldState::N);
        }
    }

    #[test]
    fn wrong_handle_type_is_rejected() {
        let p = FieldPointer::from_kind(FieldKind::Vector, FieldId(3), FieldState::NP1);
        assert!(p.get::<ScalarField>().is_none());
        assert!(p.get::<TensorField>().is_none());
        let v: VectorField = p.get().unwrap();
        assert_eq!(v.id(), FieldId(3));
        assert_eq!(v.into_pointer(), p);
    }

    #[test]
    fn default_components_by_kind() {
        assert_eq!(FieldKind::Scalar.default_components(3), 1);
        assert_eq!(FieldKind::Vector.default_components(3), 3);
        assert_eq!(FieldKind::Vector.default_components(2), 2);
        assert_eq!(FieldKind::Tensor.default_components(3), 9);
        assert_eq!(FieldKind::Generic.default_components(3), 1);
        assert!(!FieldKind::GlobalId.is_real());
        assert!(FieldKind::Generic.is_real());
    }

    #[test]
    fn state_none_is_current_state() {
        assert_eq!(FieldState::NONE, FieldState::NP1);
        assert_eq!(FieldState::default(), FieldState::NP1);
    }

    proptest! {
        #[test]
        fn state_index_roundtrip(i in 0usize..MAX_FIELD_STATES) {
            let s = FieldState::from_index(i).unwrap();
            prop_assert_eq!(s.index(), i);
        }

        #[test]
        fn state_index_out_of_range(i in MAX_FIELD_STATES..64usize) {
            prop_assert!(FieldState::from_index(i).is_none());
        }
    }
}
