//! The [`FieldManager`]: registry-driven declaration and type-checked lookup.

use zephyr_core::{
    FieldDescriptor, FieldError, FieldPointer, FieldState, FieldType, GenericField, PartId,
};
use zephyr_mesh::{FieldDeclaration, MeshDatabase, NgpField};

use crate::registry::FieldRegistry;

/// Optional overrides of registry defaults at registration.
///
/// `None` (or zero for the counts) keeps the descriptor default. Use
/// these for fields whose layout depends on input options.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldOverrides {
    /// Number of time-states.
    pub num_states: Option<u32>,
    /// Values per entity.
    pub num_components: Option<u32>,
    /// Initial value per component.
    pub init: Option<Vec<f64>>,
}

/// Registers catalog fields on a mesh database and resolves typed handles.
///
/// A manager is keyed by the mesh's spatial dimension and the state count
/// passed at construction. It never owns field storage; every operation
/// takes the [`MeshDatabase`] it acts on. Declaring a field mutates the
/// database schema and cannot be undone.
#[derive(Clone, Copy, Debug)]
pub struct FieldManager {
    registry: &'static FieldRegistry,
    num_states: u32,
    num_dimensions: u32,
}

impl FieldManager {
    /// Create a manager for `mesh`'s spatial dimension and `num_states`.
    ///
    /// Fails with [`FieldError::UnsupportedKey`] when no registry exists
    /// for the key.
    pub fn new(mesh: &MeshDatabase, num_states: u32) -> Result<Self, FieldError> {
        let num_dimensions = mesh.spatial_dimension();
        let registry = FieldRegistry::get(num_dimensions, num_states)?;
        Ok(Self {
            registry,
            num_states,
            num_dimensions,
        })
    }

    /// The registry this manager resolves names against.
    pub fn registry(&self) -> &'static FieldRegistry {
        self.registry
    }

    /// State count of the registry key.
    pub fn num_states(&self) -> u32 {
        self.num_states
    }

    /// Spatial dimension of the registry key.
    pub fn num_dimensions(&self) -> u32 {
        self.num_dimensions
    }

    /// Registry descriptor for `name`.
    pub fn descriptor(&self, name: &str) -> Result<FieldDescriptor, FieldError> {
        self.registry.lookup(name)
    }

    /// Register `name` on `parts` with registry defaults and return a
    /// handle of type `T` for `state`.
    ///
    /// The handle type is checked against the descriptor before anything
    /// is declared.
    pub fn register_field<T: FieldType>(
        &self,
        mesh: &mut MeshDatabase,
        name: &str,
        parts: &[PartId],
        init: Option<&[f64]>,
        state: FieldState,
    ) -> Result<T, FieldError> {
        let desc = self.descriptor(name)?;
        check_kind::<T>(name, &desc)?;
        let overrides = FieldOverrides {
            init: init.map(<[f64]>::to_vec),
            ..FieldOverrides::default()
        };
        self.register_field_with(mesh, name, parts, &overrides)?;
        self.get_field_ptr(mesh, name, state)
    }

    /// Register `name` on `parts`, overriding descriptor defaults where
    /// `overrides` says so. Returns the `StateNone` pointer.
    ///
    /// Registering an already-declared field on more parts is allowed as
    /// long as the resolved state and component counts match; otherwise
    /// the call fails with [`FieldError::ConflictingRedefinition`].
    pub fn register_field_with(
        &self,
        mesh: &mut MeshDatabase,
        name: &str,
        parts: &[PartId],
        overrides: &FieldOverrides,
    ) -> Result<FieldPointer, FieldError> {
        let desc = self.descriptor(name)?;
        let num_states = overrides
            .num_states
            .filter(|&n| n > 0)
            .unwrap_or(desc.num_states);
        let num_components = overrides
            .num_components
            .filter(|&n| n > 0)
            .unwrap_or(desc.num_components);
        let id = mesh.declare_field(&FieldDeclaration {
            name: name.to_string(),
            kind: desc.kind,
            rank: desc.rank,
            num_states,
            num_components,
        })?;
        mesh.put_field_on_parts(id, parts, overrides.init.as_deref())?;
        Ok(FieldPointer::from_kind(desc.kind, id, FieldState::NONE))
    }

    /// Register a generic field with an explicit layout.
    #[allow(clippy::too_many_arguments)]
    pub fn register_generic_field(
        &self,
        mesh: &mut MeshDatabase,
        name: &str,
        parts: &[PartId],
        num_states: u32,
        num_components: u32,
        init: Option<&[f64]>,
        state: FieldState,
    ) -> Result<GenericField, FieldError> {
        let desc = self.descriptor(name)?;
        check_kind::<GenericField>(name, &desc)?;
        let overrides = FieldOverrides {
            num_states: Some(num_states),
            num_components: Some(num_components),
            init: init.map(<[f64]>::to_vec),
        };
        self.register_field_with(mesh, name, parts, &overrides)?;
        self.get_field_ptr(mesh, name, state)
    }

    /// Whether `name` has been declared on `mesh`.
    ///
    /// Fails with [`FieldError::UnknownField`] when `name` is not in the
    /// catalog: existence is only defined over known names.
    pub fn field_exists(&self, mesh: &MeshDatabase, name: &str) -> Result<bool, FieldError> {
        let desc = self.descriptor(name)?;
        Ok(mesh.get_field(desc.rank, name).is_some())
    }

    /// Untyped lookup of `name` at `state`.
    pub fn get_field_pointer(
        &self,
        mesh: &MeshDatabase,
        name: &str,
        state: FieldState,
    ) -> Result<FieldPointer, FieldError> {
        let desc = self.descriptor(name)?;
        let base = mesh
            .get_field(desc.rank, name)
            .ok_or_else(|| FieldError::NotRegistered {
                name: name.to_string(),
            })?;
        let id = mesh.field_of_state(base, state)?;
        Ok(FieldPointer::from_kind(desc.kind, id, state))
    }

    /// Typed lookup of `name` at `state`.
    ///
    /// Fails with [`FieldError::TypeMismatch`] when `T` disagrees with
    /// the catalog, [`FieldError::NotRegistered`] when the field was
    /// never declared, and [`FieldError::StateOutOfRange`] when the field
    /// has fewer states.
    pub fn get_field_ptr<T: FieldType>(
        &self,
        mesh: &MeshDatabase,
        name: &str,
        state: FieldState,
    ) -> Result<T, FieldError> {
        let pointer = self.get_field_pointer(mesh, name, state)?;
        pointer.get::<T>().ok_or_else(|| FieldError::TypeMismatch {
            name: name.to_string(),
            expected: T::KIND,
            actual: pointer.kind(),
        })
    }

    /// The device mirror of `name`'s `StateNone` slot, refreshed from the
    /// host when needed. Only real-valued fields have mirrors.
    pub fn get_ngp_field_ptr<'m>(
        &self,
        mesh: &'m mut MeshDatabase,
        name: &str,
    ) -> Result<&'m mut NgpField, FieldError> {
        let pointer = self.get_field_pointer(mesh, name, FieldState::NONE)?;
        let kind = pointer.kind();
        if !kind.is_real() {
            return Err(FieldError::TypeMismatch {
                name: name.to_string(),
                expected: zephyr_core::FieldKind::Generic,
                actual: kind,
            });
        }
        mesh.get_updated_ngp_field(pointer.id())
            .ok_or_else(|| FieldError::NotRegistered {
                name: name.to_string(),
            })
    }

    /// Number of field slots declared on `mesh`, by any manager.
    pub fn size(&self, mesh: &MeshDatabase) -> usize {
        mesh.field_count()
    }
}

fn check_kind<T: FieldType>(name: &str, desc: &FieldDescriptor) -> Result<(), FieldError> {
    if desc.kind == T::KIND {
        Ok(())
    } else {
        log::debug!("field '{name}' requested as {} but declared {}", T::KIND, desc.kind);
        Err(FieldError::TypeMismatch {
            name: name.to_string(),
            expected: T::KIND,
            actual: desc.kind,
        })
    }
}
