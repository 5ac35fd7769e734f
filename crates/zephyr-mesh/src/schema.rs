//! Field schema entries and per-slot storage.

use smallvec::SmallVec;
use zephyr_core::{EntityRank, FieldId, FieldKind, PartId, MAX_FIELD_STATES};

/// A request to declare a field on a mesh database.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDeclaration {
    /// Field name, unique per rank.
    pub name: String,
    /// Value layout.
    pub kind: FieldKind,
    /// Entity rank the field lives on.
    pub rank: EntityRank,
    /// Number of time-states (1..=[`MAX_FIELD_STATES`]).
    pub num_states: u32,
    /// Values per entity.
    pub num_components: u32,
}

/// Schema entry for a declared field.
///
/// One schema entry owns `num_states` slots. The first slot is the
/// current state (`StateNP1`).
#[derive(Clone, Debug)]
pub struct FieldSchema {
    pub(crate) name: String,
    pub(crate) kind: FieldKind,
    pub(crate) rank: EntityRank,
    pub(crate) num_states: u32,
    pub(crate) num_components: u32,
    pub(crate) parts: SmallVec<[PartId; 4]>,
    pub(crate) slots: SmallVec<[FieldId; MAX_FIELD_STATES]>,
}

impl FieldSchema {
    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value layout.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Entity rank.
    pub fn rank(&self) -> EntityRank {
        self.rank
    }

    /// Number of time-states.
    pub fn num_states(&self) -> u32 {
        self.num_states
    }

    /// Values per entity.
    pub fn num_components(&self) -> u32 {
        self.num_components
    }

    /// Parts the field has been put on, in registration order.
    pub fn parts(&self) -> &[PartId] {
        &self.parts
    }

    /// State slots, indexed by [`FieldState::index`](zephyr_core::FieldState::index).
    pub fn slots(&self) -> &[FieldId] {
        &self.slots
    }

    pub(crate) fn describe(&self) -> String {
        format!(
            "{} states x {} components",
            self.num_states, self.num_components
        )
    }
}

/// Dense storage behind one state slot.
///
/// Sized `entity_count(rank) * num_components`; entities outside the
/// field's parts keep their zero values.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValues {
    /// Real-valued kinds.
    Real(Vec<f64>),
    /// [`FieldKind::ScalarInt`].
    Integer(Vec<i64>),
    /// [`FieldKind::GlobalId`].
    GlobalId(Vec<u64>),
}

impl FieldValues {
    pub(crate) fn zeroed(kind: FieldKind, len: usize) -> Self {
        match kind {
            FieldKind::ScalarInt => Self::Integer(vec![0; len]),
            FieldKind::GlobalId => Self::GlobalId(vec![0; len]),
            _ => Self::Real(vec![0.0; len]),
        }
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        match self {
            Self::Real(v) => v.len(),
            Self::Integer(v) => v.len(),
            Self::GlobalId(v) => v.len(),
        }
    }

    /// Whether no values are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Real values, if this is real storage.
    pub fn as_real(&self) -> Option<&[f64]> {
        match self {
            Self::Real(v) => Some(v),
            _ => None,
        }
    }

    /// Mutable real values, if this is real storage.
    pub fn as_real_mut(&mut self) -> Option<&mut [f64]> {
        match self {
            Self::Real(v) => Some(v),
            _ => None,
        }
    }

    /// Integer values, if this is integer storage.
    pub fn as_integer(&self) -> Option<&[i64]> {
        match self {
            Self::Integer(v) => Some(v),
            _ => None,
        }
    }

    /// Mutable integer values, if this is integer storage.
    pub fn as_integer_mut(&mut self) -> Option<&mut [i64]> {
        match self {
            Self::Integer(v) => Some(v),
            _ => None,
        }
    }

    /// Global ids, if this is id storage.
    pub fn as_global_id(&self) -> Option<&[u64]> {
        match self {
            Self::GlobalId(v) => Some(v),
            _ => None,
        }
    }

    /// Mutable global ids, if this is id storage.
    pub fn as_global_id_mut(&mut self) -> Option<&mut [u64]> {
        match self {
            Self::GlobalId(v) => Some(v),
            _ => None,
        }
    }

    /// Write `init` into every component of `entity`. Missing trailing
    /// components repeat the last init value. Entities past the end of
    /// the buffer are skipped.
    pub(crate) fn fill_entity(&mut self, entity: usize, components: usize, init: &[f64]) {
        let Some(&last) = init.last() else {
            return;
        };
        let base = entity * components;
        for c in 0..components {
            let v = init.get(c).copied().unwrap_or(last);
            match self {
                Self::Real(buf) => {
                    if let Some(x) = buf.get_mut(base + c) {
                        *x = v;
                    }
                }
                Self::Integer(buf) => {
                    if let Some(x) = buf.get_mut(base + c) {
                        *x = v as i64;
                    }
                }
                Self::GlobalId(buf) => {
                    if let Some(x) = buf.get_mut(base + c) {
                        *x = v as u64;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_follows_kind() {
        assert!(FieldValues::zeroed(FieldKind::Vector, 6).as_real().is_some());
        assert!(FieldValues::zeroed(FieldKind::ScalarInt, 2)
            .as_integer()
            .is_some());
        assert!(FieldValues::zeroed(FieldKind::GlobalId, 2)
            .as_global_id()
            .is_some());
    }

    #[test]
    fn fill_entity_repeats_last_init_value() {
        let mut v = FieldValues::zeroed(FieldKind::Vector, 6);
        v.fill_entity(1, 3, &[2.0]);
        assert_eq!(v.as_real().unwrap(), &[0.0, 0.0, 0.0, 2.0, 2.0, 2.0]);
        v.fill_entity(0, 3, &[1.0, 5.0]);
        assert_eq!(v.as_real().unwrap(), &[1.0, 5.0, 5.0, 2.0, 2.0, 2.0]);
        v.fill_entity(2, 3, &[9.0]);
        assert_eq!(v.len(), 6);
    }
}
