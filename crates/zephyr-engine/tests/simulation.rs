//! Integration test: a channel simulation wired from YAML and stepped
//! with the standard systems.

use zephyr_core::{EntityRank, FieldError};
use zephyr_engine::{EngineError, Simulation, SimulationConfig};
use zephyr_systems::StandardFactory;
use zephyr_test_utils::{channel_mesh, ChannelMesh};

const HEAT: &str = r#"
target_names: [block_1]
time_step: 0.5
boundary_conditions:
  - type: inflow
    target_name: inflow
    user_data:
      temperature: [2.0]
  - type: open
    target_name: outflow
  - type: symmetry
    target_name: top
initial_conditions:
  - type: user_function
    target_names: [block_1]
    function_names:
      temperature: linear
    function_params:
      temperature: [0.0, 0.5]
equation_systems:
  name: theEqSys
  max_iterations: 2
  solver_system_specification:
    temperature: solve_scalar
  systems:
    - HeatConduction:
"#;

fn build(doc: &str, num_elements: usize) -> Result<(Simulation, ChannelMesh), EngineError> {
    let config = SimulationConfig::from_yaml(doc)?;
    let mut channel = channel_mesh(num_elements);
    let mesh = std::mem::replace(&mut channel.mesh, zephyr_mesh::MeshDatabase::new(3));
    let realm = Simulation::realm_for(mesh, &config)?;
    let sim = Simulation::new(realm, config, &StandardFactory)?;
    Ok((sim, channel))
}

fn temperature(sim: &Simulation) -> Vec<f64> {
    let mesh = sim.realm().mesh();
    let id = mesh.find_field("temperature").unwrap();
    mesh.real(id).unwrap().to_vec()
}

#[test]
fn heat_conduction_channel_pins_the_inflow() {
    let (mut sim, channel) = build(HEAT, 3).unwrap();
    sim.set_coordinates(&channel.coordinates).unwrap();
    sim.initialize().unwrap();

    let t = temperature(&sim);
    assert_eq!(t[4], 0.5);
    assert_eq!(t[8], 1.0);

    let report = sim.step().unwrap();

    assert_eq!(report.step, 1);
    assert!(report.converged);
    assert_eq!(report.nonlinear_iterations, 2);
    assert_eq!(sim.realm().time().current_time, 0.5);

    let t = temperature(&sim);
    assert_eq!(&t[0..4], &[2.0; 4]);
    assert_eq!(&t[4..8], &[0.5; 4]);
    assert_eq!(t[12], 1.5);
}

#[test]
fn run_returns_one_report_per_step() {
    let (mut sim, channel) = build(HEAT, 2).unwrap();
    sim.set_coordinates(&channel.coordinates).unwrap();
    sim.initialize().unwrap();

    let reports = sim.run(3).unwrap();

    assert_eq!(
        reports.iter().map(|r| r.step).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(reports.iter().all(|r| r.system_time_us("HeatCondEQS").is_some()));
    assert_eq!(temperature(&sim)[0], 2.0);
}

#[test]
fn constant_initial_conditions_apply_before_boundary_data() {
    let doc = HEAT.replace(
        "  - type: user_function\n    target_names: [block_1]\n    function_names:\n      temperature: linear\n    function_params:\n      temperature: [0.0, 0.5]\n",
        "  - type: constant\n    target_names: [block_1]\n    value:\n      temperature: [0.25]\n",
    );
    let (mut sim, _) = build(&doc, 2).unwrap();
    sim.initialize().unwrap();

    let t = temperature(&sim);
    assert_eq!(&t[0..4], &[2.0; 4]);
    assert!(t[4..].iter().all(|&v| v == 0.25));
}

#[test]
fn constant_initial_condition_on_unknown_field_fails() {
    let doc = HEAT.replace(
        "  - type: user_function\n    target_names: [block_1]\n    function_names:\n      temperature: linear\n    function_params:\n      temperature: [0.0, 0.5]\n",
        "  - type: constant\n    target_names: [block_1]\n    value:\n      salinity: [1.0]\n",
    );
    let (mut sim, _) = build(&doc, 2).unwrap();

    assert_eq!(
        sim.initialize().unwrap_err(),
        EngineError::Field(FieldError::NotRegistered {
            name: "salinity".to_string()
        })
    );
}

#[test]
fn stepping_before_initialize_is_not_ready() {
    let (mut sim, _) = build(HEAT, 2).unwrap();
    assert!(matches!(sim.step(), Err(EngineError::NotReady { .. })));
}

#[test]
fn unknown_kind_builds_nothing() {
    let doc = HEAT.replace("HeatConduction", "Vorticity");
    assert!(matches!(build(&doc, 2), Err(EngineError::Config(_))));
}

#[test]
fn missing_solver_block_is_reported_at_load() {
    let doc = HEAT.replace("temperature: solve_scalar", "velocity: solve_scalar");
    assert!(build(&doc, 2).is_err());
}

#[test]
fn low_mach_registers_children_and_element_mass_flux() {
    let doc = r#"
target_names: [block_1]
boundary_conditions:
  - type: wall
    target_name: wall
    user_data:
      velocity: [0.0, 0.0, 0.0]
equation_systems:
  name: theEqSys
  solver_system_specification:
    velocity: solve_scalar
    pressure: solve_cont
  systems:
    - LowMachEOM:
"#;
    let (sim, _) = build(doc, 2).unwrap();

    let low_mach = sim.system("LowMachEOM").unwrap();
    let children: Vec<&str> = low_mach.sub_systems().iter().map(|s| s.name()).collect();
    assert_eq!(children, vec!["MomentumEQS", "ContinuityEQS"]);

    let mesh = sim.realm().mesh();
    assert!(mesh.get_field(EntityRank::Element, "mass_flow_rate_scs").is_some());
    assert!(mesh.get_field(EntityRank::Element, "element_volume").is_some());
    assert!(mesh.find_field("velocity").is_some());
    assert!(mesh.find_field("pressure").is_some());
}
