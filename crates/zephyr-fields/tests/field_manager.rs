//! Integration test: field registration on a channel mesh through one or
//! more managers sharing a registry.

use proptest::prelude::*;
use zephyr_core::{
    EntityRank, FieldError, FieldKind, FieldState, FieldType, GenericField, ScalarField,
    VectorField,
};
use zephyr_fields::{FieldManager, FieldOverrides, FieldRegistry};
use zephyr_test_utils::channel_mesh;

#[test]
fn managers_with_the_same_key_see_each_others_fields() {
    let mut c = channel_mesh(2);
    let first = FieldManager::new(&c.mesh, 2).unwrap();
    let second = FieldManager::new(&c.mesh, 2).unwrap();
    assert!(std::ptr::eq(first.registry(), second.registry()));

    first
        .register_field::<ScalarField>(&mut c.mesh, "pressure", &[c.block], None, FieldState::NONE)
        .unwrap();

    assert!(second.field_exists(&c.mesh, "pressure").unwrap());
    let p: ScalarField = second
        .get_field_ptr(&c.mesh, "pressure", FieldState::N)
        .unwrap();
    assert_eq!(p.state(), FieldState::N);
    assert_eq!(second.size(&c.mesh), 2);
}

#[test]
fn initial_values_touch_only_the_registered_parts() {
    let mut c = channel_mesh(2);
    let fm = FieldManager::new(&c.mesh, 2).unwrap();
    let inflow_subset = c.mesh.part(c.inflow).unwrap().subsets()[0];

    let id = fm
        .register_field_with(
            &mut c.mesh,
            "temperature_bc",
            &[inflow_subset],
            &FieldOverrides {
                init: Some(vec![300.0]),
                ..FieldOverrides::default()
            },
        )
        .unwrap()
        .id();

    let values = c.mesh.real(id).unwrap();
    assert_eq!(&values[0..4], &[300.0; 4]);
    assert!(values[4..].iter().all(|&v| v == 0.0));
}

#[test]
fn extending_a_field_to_more_parts_keeps_one_declaration() {
    let mut c = channel_mesh(2);
    let fm = FieldManager::new(&c.mesh, 2).unwrap();
    let none = FieldOverrides::default();

    let a = fm
        .register_field_with(&mut c.mesh, "velocity", &[c.block], &none)
        .unwrap();
    let b = fm
        .register_field_with(&mut c.mesh, "velocity", &[c.wall], &none)
        .unwrap();

    assert_eq!(a.id(), b.id());
    assert_eq!(a.kind(), FieldKind::Vector);
    let schema = c.mesh.schema(a.id()).unwrap();
    assert_eq!(schema.num_states(), 2);
    assert_eq!(schema.num_components(), 3);
    assert_eq!(schema.parts(), &[c.block, c.wall]);
}

#[test]
fn changing_the_layout_of_a_declared_field_is_rejected() {
    let mut c = channel_mesh(2);
    let fm = FieldManager::new(&c.mesh, 2).unwrap();
    fm.register_field_with(
        &mut c.mesh,
        "mass_flow_rate_scs",
        &[c.block],
        &FieldOverrides {
            num_components: Some(12),
            ..FieldOverrides::default()
        },
    )
    .unwrap();

    let err = fm
        .register_generic_field(
            &mut c.mesh,
            "mass_flow_rate_scs",
            &[c.block],
            1,
            6,
            None,
            FieldState::NONE,
        )
        .unwrap_err();

    assert!(matches!(err, FieldError::ConflictingRedefinition { .. }));
    let f: GenericField = fm
        .get_field_ptr(&c.mesh, "mass_flow_rate_scs", FieldState::NONE)
        .unwrap();
    assert_eq!(c.mesh.schema(f.id()).unwrap().num_components(), 12);
}

#[test]
fn three_state_fields_hand_out_a_distinct_handle_per_state() {
    let mut c = channel_mesh(1);
    let fm = FieldManager::new(&c.mesh, 3).unwrap();
    fm.register_field::<VectorField>(&mut c.mesh, "velocity", &[c.block], None, FieldState::NONE)
        .unwrap();

    let handles: Vec<VectorField> = [FieldState::NP1, FieldState::N, FieldState::NM1]
        .into_iter()
        .map(|s| fm.get_field_ptr(&c.mesh, "velocity", s).unwrap())
        .collect();

    assert_eq!(handles[0].state(), FieldState::NP1);
    assert_eq!(handles[1].state(), FieldState::N);
    assert_eq!(handles[2].state(), FieldState::NM1);
    assert_ne!(handles[0].id(), handles[1].id());
    assert_ne!(handles[1].id(), handles[2].id());
    assert_ne!(handles[0].id(), handles[2].id());
    assert!(matches!(
        fm.get_field_ptr::<VectorField>(&c.mesh, "velocity", FieldState::NM2),
        Err(FieldError::StateOutOfRange { num_states: 3, .. })
    ));
}

#[test]
fn redeclaring_with_another_state_count_is_rejected() {
    let mut c = channel_mesh(1);
    let three = FieldManager::new(&c.mesh, 3).unwrap();
    let two = FieldManager::new(&c.mesh, 2).unwrap();
    three
        .register_field::<VectorField>(&mut c.mesh, "velocity", &[c.block], None, FieldState::NONE)
        .unwrap();

    let err = two
        .register_field::<VectorField>(&mut c.mesh, "velocity", &[c.block], None, FieldState::NONE)
        .unwrap_err();

    assert!(matches!(err, FieldError::ConflictingRedefinition { .. }));
    let id = c.mesh.get_field(EntityRank::Node, "velocity").unwrap();
    assert_eq!(c.mesh.schema(id).unwrap().num_states(), 3);
}

#[test]
fn single_state_fields_have_no_old_state() {
    let mut c = channel_mesh(1);
    let fm = FieldManager::new(&c.mesh, 3).unwrap();
    fm.register_field::<VectorField>(&mut c.mesh, "coordinates", &[c.block], None, FieldState::NONE)
        .unwrap();

    assert!(matches!(
        fm.get_field_ptr::<VectorField>(&c.mesh, "coordinates", FieldState::N),
        Err(FieldError::StateOutOfRange { num_states: 1, .. })
    ));
}

#[test]
fn element_fields_live_on_element_rank() {
    let mut c = channel_mesh(3);
    let fm = FieldManager::new(&c.mesh, 2).unwrap();
    let id = fm
        .register_field_with(&mut c.mesh, "element_volume", &[c.block], &FieldOverrides::default())
        .unwrap()
        .id();

    assert_eq!(c.mesh.get_field(EntityRank::Element, "element_volume"), Some(id));
    assert_eq!(c.mesh.real(id).unwrap().len(), 3);
}

proptest! {
    #[test]
    fn every_catalog_name_registers_on_the_block(states in 1u32..=3, idx in 0usize..64) {
        let registry = FieldRegistry::get(3, states).unwrap();
        let names: Vec<&str> = registry.names().collect();
        let name = names[idx % names.len()];
        let mut c = channel_mesh(2);
        let fm = FieldManager::new(&c.mesh, states).unwrap();

        let ptr = fm
            .register_field_with(&mut c.mesh, name, &[c.block], &FieldOverrides::default())
            .unwrap();

        prop_assert!(fm.field_exists(&c.mesh, name).unwrap());
        prop_assert_eq!(ptr.kind(), fm.descriptor(name).unwrap().kind);
    }
}
