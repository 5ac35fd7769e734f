//! Integration test: the standard systems on a channel realm.

use indexmap::IndexMap;
use proptest::prelude::*;
use zephyr_core::{EntityRank, PartId, Topology};
use zephyr_eqsys::{
    BoundaryConditionData, ConfigError, EquationSystem, EquationSystemError,
    EquationSystemFactory, EquationSystemKind, Realm, SolverSpecification, SystemConfig,
};
use zephyr_systems::{CoupledEquationSystem, StandardFactory};
use zephyr_test_utils::{channel_realm, CallLog, ChannelMesh, RecordingSolverFactory};

fn all_blocks() -> SolverSpecification {
    let mut solvers = SolverSpecification::default();
    for dof in [
        "velocity",
        "pressure",
        "enthalpy",
        "temperature",
        "turbulent_ke",
        "specific_dissipation_rate",
        "total_dissipation_rate",
        "volume_of_fluid",
        "wall_distance_phi",
    ] {
        solvers.insert(dof, format!("solve_{dof}"));
    }
    solvers
}

fn build(kind: EquationSystemKind, realm: &Realm) -> Box<dyn EquationSystem> {
    StandardFactory
        .create(&SystemConfig::new(kind), realm, &all_blocks())
        .unwrap()
}

fn subset(realm: &Realm, side: PartId) -> PartId {
    realm.mesh().part(side).unwrap().subsets()[0]
}

fn values(realm: &Realm, name: &str) -> Vec<f64> {
    let mesh = realm.mesh();
    mesh.real(mesh.find_field(name).unwrap()).unwrap().to_vec()
}

/// A realm with nodal fields, `sys` registered on the block, and its
/// interior algorithm in place.
fn registered(kind: EquationSystemKind) -> (Realm, ChannelMesh, Box<dyn EquationSystem>) {
    let (mut realm, channel) = channel_realm(2, 2);
    let mut sys = build(kind, &realm);
    realm.register_nodal_fields(channel.block).unwrap();
    sys.register_nodal_fields(&mut realm, channel.block).unwrap();
    sys.register_interior_algorithm(&mut realm, channel.block)
        .unwrap();
    (realm, channel, sys)
}

#[test]
fn factory_names_every_kind() {
    let (realm, _) = channel_realm(1, 2);
    let names: Vec<String> = EquationSystemKind::ALL
        .iter()
        .map(|&kind| build(kind, &realm).name().to_string())
        .collect();
    assert_eq!(
        names,
        vec![
            "LowMachEOM",
            "VolumeOfFluidEQS",
            "ShearStressTransportWrap",
            "ChienKEpsilonWrap",
            "WilcoxKOmegaWrap",
            "TurbKineticEnergyEQS",
            "EnthalpyEQS",
            "HeatCondEQS",
            "WallDistEQS",
        ]
    );
}

#[test]
fn wrappers_have_no_linear_system_of_their_own() {
    let (realm, _) = channel_realm(1, 2);
    for kind in EquationSystemKind::ALL {
        let sys = build(kind, &realm);
        let wraps = !sys.sub_systems().is_empty();
        assert_eq!(sys.core().linsys.is_none(), wraps, "{kind}");
    }
}

#[test]
fn linear_systems_come_from_the_mapped_block() {
    let log = CallLog::new();
    let (realm, _) = channel_realm(1, 2);
    let realm = realm.with_solver_factory(Box::new(RecordingSolverFactory::new(log.clone())));
    build(EquationSystemKind::ShearStressTransport, &realm);

    assert_eq!(
        log.matching("solver.create"),
        vec![
            "solver.create:TurbKineticEnergyEQS:solve_turbulent_ke",
            "solver.create:SpecDissRateEQS:solve_specific_dissipation_rate",
        ]
    );
}

#[test]
fn missing_block_fails_construction() {
    let (realm, _) = channel_realm(1, 2);
    let mut solvers = SolverSpecification::default();
    solvers.insert("velocity", "solve_scalar");
    let err = StandardFactory
        .create(
            &SystemConfig::new(EquationSystemKind::LowMachEOM),
            &realm,
            &solvers,
        )
        .err()
        .expect("construction should fail");
    assert_eq!(
        err,
        EquationSystemError::Config(ConfigError::MissingSolverMapping {
            equation: "pressure".to_string()
        })
    );
}

#[test]
fn inflow_condition_pins_its_nodes() {
    let (mut realm, channel, mut sys) = registered(EquationSystemKind::HeatConduction);
    let inflow = subset(&realm, channel.inflow);
    let data = BoundaryConditionData::new("inflow").with("temperature", vec![300.0]);
    sys.register_inflow_bc(&mut realm, inflow, Topology::Quad4, &data)
        .unwrap();

    sys.initialize(&mut realm).unwrap();
    sys.populate_boundary_data(&mut realm).unwrap();
    sys.solve_and_update(&mut realm).unwrap();

    let t = values(&realm, "temperature");
    assert_eq!(&t[0..4], &[300.0; 4]);
    assert!(t[4..].iter().all(|&v| v == 0.0));
    assert!(!sys.system_is_converged());
}

#[test]
fn wall_distance_solves_once_and_derives_distance() {
    let (mut realm, channel, mut sys) = registered(EquationSystemKind::WallDistance);
    let wall = subset(&realm, channel.wall);
    sys.register_wall_bc(&mut realm, wall, Topology::Quad4, &BoundaryConditionData::new("wall"))
        .unwrap();
    sys.initialize(&mut realm).unwrap();
    sys.populate_boundary_data(&mut realm).unwrap();

    sys.solve_and_update(&mut realm).unwrap();
    sys.post_iter_work_dep(&mut realm).unwrap();
    assert!(sys.system_is_converged());
    sys.solve_and_update(&mut realm).unwrap();

    let phi = values(&realm, "wall_distance_phi");
    let distance = values(&realm, "minimum_distance_to_wall");
    for node in 0..channel.num_nodes() {
        let on_wall = (node / 2) % 2 == 0;
        let (p, d) = if on_wall { (0.0, 0.0) } else { (1.0, 2f64.sqrt()) };
        assert_eq!(phi[node], p, "phi at node {node}");
        assert!((distance[node] - d).abs() < 1e-12, "distance at node {node}");
    }
}

#[test]
fn volume_fraction_is_clipped_to_unit_interval() {
    let (mut realm, channel, mut sys) = registered(EquationSystemKind::VolumeOfFluid);
    let functions: IndexMap<String, String> =
        [("volume_of_fluid".to_string(), "constant".to_string())].into();
    let params: IndexMap<String, Vec<f64>> =
        [("volume_of_fluid".to_string(), vec![1.5])].into();
    sys.register_initial_condition_fcn(&mut realm, channel.block, &functions, &params)
        .unwrap();

    sys.initial_work(&mut realm).unwrap();
    assert!(values(&realm, "volume_of_fluid").iter().all(|&v| v == 1.5));

    sys.post_iter_work_dep(&mut realm).unwrap();
    assert!(values(&realm, "volume_of_fluid").iter().all(|&v| v == 1.0));
}

#[test]
fn enthalpy_round_trip_clips_temperature() {
    let (mut realm, _, mut sys) = registered(EquationSystemKind::Enthalpy);
    assert!(values(&realm, "specific_heat").iter().all(|&cp| cp == 1000.0));
    let t = realm.mesh().find_field("temperature").unwrap();
    realm.mesh_mut().real_mut(t).unwrap().fill(5000.0);

    sys.initial_work(&mut realm).unwrap();
    assert!(values(&realm, "enthalpy").iter().all(|&h| h == 5.0e6));

    sys.post_iter_work_dep(&mut realm).unwrap();
    assert!(values(&realm, "temperature").iter().all(|&t| t == 3000.0));
}

#[test]
fn k_omega_closure_runs_at_initial_work() {
    let (mut realm, channel, mut sys) = registered(EquationSystemKind::WilcoxKOmega);
    let functions: IndexMap<String, String> = [
        ("turbulent_ke".to_string(), "constant".to_string()),
        ("specific_dissipation_rate".to_string(), "constant".to_string()),
    ]
    .into();
    let params: IndexMap<String, Vec<f64>> = [
        ("turbulent_ke".to_string(), vec![2.0]),
        ("specific_dissipation_rate".to_string(), vec![4.0]),
    ]
    .into();
    sys.register_initial_condition_fcn(&mut realm, channel.block, &functions, &params)
        .unwrap();

    sys.initial_work(&mut realm).unwrap();

    assert!(values(&realm, "turbulent_viscosity").iter().all(|&m| m == 0.5));
}

#[test]
fn low_mach_mass_flux_follows_the_discretization() {
    let (realm, channel) = channel_realm(2, 2);
    let mut realm = realm.with_uses_edges(true);
    let mut sys = build(EquationSystemKind::LowMachEOM, &realm);
    sys.register_nodal_fields(&mut realm, channel.block).unwrap();
    sys.register_edge_fields(&mut realm, channel.block).unwrap();
    sys.register_element_fields(&mut realm, channel.block, Topology::Hex8)
        .unwrap();
    let mesh = realm.mesh();
    assert!(mesh.get_field(EntityRank::Edge, "mass_flow_rate").is_some());
    assert!(mesh.get_field(EntityRank::Element, "mass_flow_rate_scs").is_none());

    let (mut realm, channel) = channel_realm(2, 2);
    let mut sys = build(EquationSystemKind::LowMachEOM, &realm);
    sys.register_nodal_fields(&mut realm, channel.block).unwrap();
    sys.register_element_fields(&mut realm, channel.block, Topology::Hex8)
        .unwrap();
    let id = realm
        .mesh()
        .get_field(EntityRank::Element, "mass_flow_rate_scs")
        .unwrap();
    assert_eq!(realm.mesh().schema(id).unwrap().num_components(), 12);
}

#[test]
fn sst_wraps_k_and_omega() {
    let (realm, _) = channel_realm(1, 2);
    let sst = CoupledEquationSystem::shear_stress_transport(
        &SystemConfig::new(EquationSystemKind::ShearStressTransport),
        &realm,
        &all_blocks(),
    )
    .unwrap();
    let names: Vec<&str> = sst.children().iter().map(|c| c.name()).collect();
    assert_eq!(names, vec!["TurbKineticEnergyEQS", "SpecDissRateEQS"]);
}

#[test]
fn low_mach_norms_sum_over_momentum_and_continuity() {
    let (mut realm, channel) = channel_realm(2, 2);
    let mut config = SystemConfig::new(EquationSystemKind::LowMachEOM);
    config.source = Some(vec![1.0]);
    let mut sys = CoupledEquationSystem::low_mach(&config, &realm, &all_blocks()).unwrap();
    realm.register_nodal_fields(channel.block).unwrap();
    sys.register_nodal_fields(&mut realm, channel.block).unwrap();
    sys.register_interior_algorithm(&mut realm, channel.block)
        .unwrap();
    sys.initialize(&mut realm).unwrap();

    sys.solve_and_update(&mut realm).unwrap();

    let norms: Vec<f64> = sys.children().iter().map(|c| c.provide_norm()).collect();
    let increments: Vec<f64> = sys
        .children()
        .iter()
        .map(|c| c.provide_norm_increment())
        .collect();
    assert_eq!(norms.len(), 2);
    assert!(norms.iter().all(|&n| n > 0.0), "{norms:?}");
    assert!((sys.provide_norm() - norms.iter().sum::<f64>()).abs() < 1e-12);
    assert!((sys.provide_norm_increment() - increments.iter().sum::<f64>()).abs() < 1e-12);
    assert!(sys.provide_norm() > norms[0].max(norms[1]));
}

proptest! {
    #[test]
    fn relaxed_inflow_moves_by_the_delta_fraction(fraction in 0.1f64..=1.0, value in -50.0f64..50.0) {
        let (mut realm, channel) = channel_realm(1, 2);
        let mut config = SystemConfig::new(EquationSystemKind::HeatConduction);
        config.relaxation.delta_fraction = fraction;
        let mut sys = StandardFactory.create(&config, &realm, &all_blocks()).unwrap();
        realm.register_nodal_fields(channel.block).unwrap();
        sys.register_nodal_fields(&mut realm, channel.block).unwrap();
        let inflow = subset(&realm, channel.inflow);
        let data = BoundaryConditionData::new("inflow").with("temperature", vec![value]);
        sys.register_inflow_bc(&mut realm, inflow, Topology::Quad4, &data).unwrap();
        sys.initialize(&mut realm).unwrap();
        sys.populate_boundary_data(&mut realm).unwrap();

        sys.solve_and_update(&mut realm).unwrap();

        let t = values(&realm, "temperature");
        prop_assert!((t[0] - fraction * value).abs() < 1e-9);
    }
}
