//! Strongly-typed identifiers for mesh-database objects.

use std::fmt;

/// Identifies one time-state slot of a field declared on a mesh database.
///
/// Each state of a multi-state field gets its own `FieldId`, assigned
/// sequentially at declaration. `FieldId(n)` is the n-th slot in the
/// database's field list; slot identity never changes for the lifetime
/// of the database, only the storage behind it rotates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub u32);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FieldId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a part (named mesh region) within a mesh database.
///
/// Parts are declared while the mesh is built and assigned sequential IDs.
/// `PartId(0)` is always the universal part.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartId(pub u32);

impl PartId {
    /// The universal part, containing every entity of the mesh.
    pub const UNIVERSAL: PartId = PartId(0);
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PartId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
