//! The static field catalog.
//!
//! Every field the solver can declare is listed once in [`CATALOG`] with a
//! [`FieldTemplate`]. A template is instantiated into a concrete
//! [`FieldDescriptor`] for a (spatial dimension, number of states) key:
//! multi-state templates take the key's state count, vector components
//! follow the dimension, side-rank templates resolve to faces in 3-D and
//! edges in 2-D.
//!
//! Registries are built lazily, once per supported key, and live for the
//! rest of the process.

use std::sync::OnceLock;

use indexmap::IndexMap;
use zephyr_core::{EntityRank, FieldDescriptor, FieldError, FieldKind};

/// Spatial dimensions with a registry.
pub const SUPPORTED_DIMENSIONS: std::ops::RangeInclusive<u32> = 2..=3;

/// State counts with a registry.
pub const SUPPORTED_STATES: std::ops::RangeInclusive<u32> = 1..=3;

// ── Templates ──────────────────────────────────────────────────────

/// Entity rank of a template, before the spatial dimension is known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RankTemplate {
    /// Node rank.
    Node,
    /// Edge rank.
    Edge,
    /// Element rank.
    Element,
    /// Side rank: faces in 3-D, edges in 2-D.
    Side,
}

impl RankTemplate {
    fn resolve(self, spatial_dimension: u32) -> EntityRank {
        match self {
            Self::Node => EntityRank::Node,
            Self::Edge => EntityRank::Edge,
            Self::Element => EntityRank::Element,
            Self::Side => EntityRank::side_rank(spatial_dimension),
        }
    }
}

/// Dimension- and state-independent description of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldTemplate {
    /// Value layout.
    pub kind: FieldKind,
    /// Entity rank.
    pub rank: RankTemplate,
    /// Whether the field takes the registry key's state count.
    pub multi_state: bool,
}

impl FieldTemplate {
    const fn new(kind: FieldKind, rank: RankTemplate, multi_state: bool) -> Self {
        Self {
            kind,
            rank,
            multi_state,
        }
    }

    /// Concrete descriptor for a registry key.
    pub fn instantiate(&self, spatial_dimension: u32, num_states: u32) -> FieldDescriptor {
        FieldDescriptor {
            kind: self.kind,
            rank: self.rank.resolve(spatial_dimension),
            num_states: if self.multi_state { num_states } else { 1 },
            num_components: self.kind.default_components(spatial_dimension),
        }
    }
}

use FieldKind::{Generic, GlobalId, Scalar, ScalarInt, Tensor, Vector};
use RankTemplate::{Edge, Element, Node, Side};

const MULTI_STATE_NODAL_SCALAR: FieldTemplate = FieldTemplate::new(Scalar, Node, true);
const MULTI_STATE_NODAL_VECTOR: FieldTemplate = FieldTemplate::new(Vector, Node, true);
const SINGLE_STATE_NODAL_SCALAR: FieldTemplate = FieldTemplate::new(Scalar, Node, false);
const SINGLE_STATE_NODAL_VECTOR: FieldTemplate = FieldTemplate::new(Vector, Node, false);
const SINGLE_STATE_NODAL_TENSOR: FieldTemplate = FieldTemplate::new(Tensor, Node, false);
const SINGLE_STATE_NODAL_GENERIC: FieldTemplate = FieldTemplate::new(Generic, Node, false);
const SINGLE_STATE_EDGE_SCALAR: FieldTemplate = FieldTemplate::new(Scalar, Edge, false);
const SINGLE_STATE_EDGE_VECTOR: FieldTemplate = FieldTemplate::new(Vector, Edge, false);
const SINGLE_STATE_ELEM_SCALAR: FieldTemplate = FieldTemplate::new(Scalar, Element, false);
const SINGLE_STATE_ELEM_VECTOR: FieldTemplate = FieldTemplate::new(Vector, Element, false);
const SINGLE_STATE_ELEM_GENERIC: FieldTemplate = FieldTemplate::new(Generic, Element, false);
const SINGLE_STATE_SIDE_GENERIC: FieldTemplate = FieldTemplate::new(Generic, Side, false);
const NODAL_SCALAR_INT: FieldTemplate = FieldTemplate::new(ScalarInt, Node, false);
const NODAL_GLOBAL_ID: FieldTemplate = FieldTemplate::new(GlobalId, Node, false);

/// Every field the solver knows, with its template.
pub const CATALOG: &[(&str, FieldTemplate)] = &[
    // flow
    ("velocity", MULTI_STATE_NODAL_VECTOR),
    ("pressure", MULTI_STATE_NODAL_SCALAR),
    ("density", MULTI_STATE_NODAL_SCALAR),
    ("viscosity", SINGLE_STATE_NODAL_SCALAR),
    ("effective_viscosity_u", SINGLE_STATE_NODAL_SCALAR),
    ("velocity_bc", SINGLE_STATE_NODAL_VECTOR),
    ("cont_velocity_bc", SINGLE_STATE_NODAL_VECTOR),
    ("pressure_bc", SINGLE_STATE_NODAL_SCALAR),
    ("u_delta", SINGLE_STATE_NODAL_VECTOR),
    ("p_delta", SINGLE_STATE_NODAL_SCALAR),
    ("dudx", SINGLE_STATE_NODAL_TENSOR),
    ("dpdx", SINGLE_STATE_NODAL_VECTOR),
    ("mass_flow_rate", SINGLE_STATE_EDGE_SCALAR),
    ("mass_flow_rate_scs", SINGLE_STATE_ELEM_GENERIC),
    ("open_mass_flow_rate", SINGLE_STATE_SIDE_GENERIC),
    // energy
    ("temperature", MULTI_STATE_NODAL_SCALAR),
    ("enthalpy", MULTI_STATE_NODAL_SCALAR),
    ("specific_heat", SINGLE_STATE_NODAL_SCALAR),
    ("thermal_conductivity", SINGLE_STATE_NODAL_SCALAR),
    ("effective_viscosity_h", SINGLE_STATE_NODAL_SCALAR),
    ("temperature_bc", SINGLE_STATE_NODAL_SCALAR),
    ("enthalpy_bc", SINGLE_STATE_NODAL_SCALAR),
    ("temperature_delta", SINGLE_STATE_NODAL_SCALAR),
    ("h_delta", SINGLE_STATE_NODAL_SCALAR),
    ("dtdx", SINGLE_STATE_NODAL_VECTOR),
    ("dhdx", SINGLE_STATE_NODAL_VECTOR),
    // turbulence
    ("turbulent_ke", MULTI_STATE_NODAL_SCALAR),
    ("specific_dissipation_rate", MULTI_STATE_NODAL_SCALAR),
    ("total_dissipation_rate", MULTI_STATE_NODAL_SCALAR),
    ("turbulent_viscosity", SINGLE_STATE_NODAL_SCALAR),
    ("sst_f_one_blending", SINGLE_STATE_NODAL_SCALAR),
    ("effective_viscosity_tke", SINGLE_STATE_NODAL_SCALAR),
    ("effective_viscosity_sdr", SINGLE_STATE_NODAL_SCALAR),
    ("effective_viscosity_tdr", SINGLE_STATE_NODAL_SCALAR),
    ("turbulent_ke_bc", SINGLE_STATE_NODAL_SCALAR),
    ("specific_dissipation_rate_bc", SINGLE_STATE_NODAL_SCALAR),
    ("total_dissipation_rate_bc", SINGLE_STATE_NODAL_SCALAR),
    ("tke_delta", SINGLE_STATE_NODAL_SCALAR),
    ("sdr_delta", SINGLE_STATE_NODAL_SCALAR),
    ("tdr_delta", SINGLE_STATE_NODAL_SCALAR),
    ("dkdx", SINGLE_STATE_NODAL_VECTOR),
    ("dwdx", SINGLE_STATE_NODAL_VECTOR),
    ("dedx", SINGLE_STATE_NODAL_VECTOR),
    // free surface
    ("volume_of_fluid", MULTI_STATE_NODAL_SCALAR),
    ("volume_of_fluid_bc", SINGLE_STATE_NODAL_SCALAR),
    ("vof_delta", SINGLE_STATE_NODAL_SCALAR),
    ("dvofdx", SINGLE_STATE_NODAL_VECTOR),
    // wall distance
    ("minimum_distance_to_wall", SINGLE_STATE_NODAL_SCALAR),
    ("wall_distance_phi", SINGLE_STATE_NODAL_SCALAR),
    ("wall_distance_phi_delta", SINGLE_STATE_NODAL_SCALAR),
    ("wall_distance_phi_bc", SINGLE_STATE_NODAL_SCALAR),
    ("dwalldistdx", SINGLE_STATE_NODAL_VECTOR),
    // geometry and bookkeeping
    ("dual_nodal_volume", MULTI_STATE_NODAL_SCALAR),
    ("coordinates", SINGLE_STATE_NODAL_VECTOR),
    ("current_coordinates", SINGLE_STATE_NODAL_VECTOR),
    ("mesh_displacement", MULTI_STATE_NODAL_VECTOR),
    ("nodal_scratch", SINGLE_STATE_NODAL_GENERIC),
    ("element_volume", SINGLE_STATE_ELEM_SCALAR),
    ("elemCentroid", SINGLE_STATE_ELEM_VECTOR),
    ("edge_area_vector", SINGLE_STATE_EDGE_VECTOR),
    ("exposed_area_vector", SINGLE_STATE_SIDE_GENERIC),
    ("iblank", NODAL_SCALAR_INT),
    ("nalu_global_id", NODAL_GLOBAL_ID),
];

// ── Registry ───────────────────────────────────────────────────────

/// The catalog instantiated for one (spatial dimension, states) key.
#[derive(Debug)]
pub struct FieldRegistry {
    spatial_dimension: u32,
    num_states: u32,
    entries: IndexMap<&'static str, FieldDescriptor>,
}

type Slots = [OnceLock<FieldRegistry>; 3];

static REGISTRIES: [Slots; 2] = [
    [OnceLock::new(), OnceLock::new(), OnceLock::new()],
    [OnceLock::new(), OnceLock::new(), OnceLock::new()],
];

impl FieldRegistry {
    fn build(spatial_dimension: u32, num_states: u32) -> Self {
        let entries = CATALOG
            .iter()
            .map(|(name, t)| (*name, t.instantiate(spatial_dimension, num_states)))
            .collect();
        Self {
            spatial_dimension,
            num_states,
            entries,
        }
    }

    /// The shared registry for a key.
    ///
    /// Every call with the same key returns the same instance.
    pub fn get(spatial_dimension: u32, num_states: u32) -> Result<&'static FieldRegistry, FieldError> {
        if !SUPPORTED_DIMENSIONS.contains(&spatial_dimension)
            || !SUPPORTED_STATES.contains(&num_states)
        {
            return Err(FieldError::UnsupportedKey {
                spatial_dimension,
                num_states,
            });
        }
        let slot = &REGISTRIES[(spatial_dimension - 2) as usize][(num_states - 1) as usize];
        Ok(slot.get_or_init(|| Self::build(spatial_dimension, num_states)))
    }

    /// Look up `name` under a key.
    pub fn query(
        spatial_dimension: u32,
        num_states: u32,
        name: &str,
    ) -> Result<FieldDescriptor, FieldError> {
        Self::get(spatial_dimension, num_states)?.lookup(name)
    }

    /// Look up `name` in this registry.
    pub fn lookup(&self, name: &str) -> Result<FieldDescriptor, FieldError> {
        self.entries
            .get(name)
            .copied()
            .ok_or_else(|| FieldError::UnknownField {
                name: name.to_string(),
                spatial_dimension: self.spatial_dimension,
                num_states: self.num_states,
            })
    }

    /// Whether `name` is in the catalog.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Catalog names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// Number of catalog entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Spatial dimension of this registry's key.
    pub fn spatial_dimension(&self) -> u32 {
        self.spatial_dimension
    }

    /// State count of this registry's key.
    pub fn num_states(&self) -> u32 {
        self.num_states
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn velocity_is_multi_state_nodal_vector() {
        let d = FieldRegistry::query(3, 2, "velocity").unwrap();
        assert_eq!(d.kind, FieldKind::Vector);
        assert_eq!(d.rank, EntityRank::Node);
        assert_eq!(d.num_states, 2);
        assert_eq!(d.num_components, 3);
    }

    #[test]
    fn single_state_templates_ignore_key_states() {
        let d = FieldRegistry::query(3, 3, "viscosity").unwrap();
        assert_eq!(d.num_states, 1);
        let d = FieldRegistry::query(2, 3, "dudx").unwrap();
        assert_eq!(d.kind, FieldKind::Tensor);
        assert_eq!(d.num_components, 4);
    }

    #[test]
    fn side_rank_follows_dimension() {
        assert_eq!(
            FieldRegistry::query(3, 1, "exposed_area_vector").unwrap().rank,
            EntityRank::Face
        );
        assert_eq!(
            FieldRegistry::query(2, 1, "exposed_area_vector").unwrap().rank,
            EntityRank::Edge
        );
    }

    #[test]
    fn unknown_name_is_an_error() {
        let err = FieldRegistry::query(3, 2, "acrazyqoi").unwrap_err();
        assert!(matches!(err, FieldError::UnknownField { .. }));
    }

    #[test]
    fn unsupported_key_is_an_error() {
        assert!(matches!(
            FieldRegistry::get(1, 2),
            Err(FieldError::UnsupportedKey { .. })
        ));
        assert!(matches!(
            FieldRegistry::get(3, 4),
            Err(FieldError::UnsupportedKey { .. })
        ));
    }

    #[test]
    fn same_key_shares_one_registry() {
        let a = FieldRegistry::get(3, 2).unwrap();
        let b = FieldRegistry::get(3, 2).unwrap();
        let c = FieldRegistry::get(3, 3).unwrap();
        assert!(std::ptr::eq(a, b));
        assert!(!std::ptr::eq(a, c));
    }

    #[test]
    fn catalog_names_are_unique() {
        let reg = FieldRegistry::get(3, 1).unwrap();
        assert_eq!(reg.len(), CATALOG.len());
    }

    proptest! {
        #[test]
        fn every_entry_resolves_for_every_key(dim in 2u32..=3, states in 1u32..=3, idx in 0usize..CATALOG.len()) {
            let (name, template) = CATALOG[idx];
            let d = FieldRegistry::query(dim, states, name).unwrap();
            prop_assert_eq!(d.kind, template.kind);
            prop_assert!(d.num_states == 1 || d.num_states == states);
            prop_assert_eq!(d.num_components, template.kind.default_components(dim));
        }
    }
}
