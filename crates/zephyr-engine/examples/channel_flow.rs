//! Zephyr channel: a heated channel driven from a YAML input document.
//!
//! Demonstrates:
//!   1. Building a mesh with an element block and boundary sidesets
//!   2. Parsing a simulation document with boundary and initial conditions
//!   3. Loading equation systems through the standard factory
//!   4. Initializing and stepping, reading per-step reports and fields
//!
//! Run with:
//!   RUST_LOG=info cargo run --example channel_flow

use std::error::Error;

use log::LevelFilter;
use zephyr_core::{EntityRank, Topology};
use zephyr_engine::{Simulation, SimulationConfig};
use zephyr_mesh::MeshDatabase;
use zephyr_systems::StandardFactory;

// ─── Channel parameters ─────────────────────────────────────────

const CELLS: usize = 8;
const STEPS: u64 = 5;

const INPUT: &str = r#"
target_names: [block_1]
time_step: 0.1
boundary_conditions:
  - type: inflow
    target_name: inflow
    user_data:
      temperature: [400.0]
  - type: wall
    target_name: wall
    user_data:
      temperature: [300.0]
  - type: open
    target_name: outflow
initial_conditions:
  - type: user_function
    target_names: [block_1]
    function_names:
      temperature: linear
    function_params:
      temperature: [350.0, -5.0]
equation_systems:
  name: theEqSys
  max_iterations: 3
  solver_system_specification:
    temperature: solve_scalar
  systems:
    - HeatConduction:
        convergence_tolerance: 1.0e-3
"#;

// ─── Mesh ───────────────────────────────────────────────────────
//
// Node 4i + 2y + z sits at (i, y, z). Faces: 0 inflow, 1 outflow,
// 2..2+n wall.

fn channel(n: usize) -> Result<(MeshDatabase, Vec<f64>), Box<dyn Error>> {
    let nodes = 4 * (n + 1);
    let mut mesh = MeshDatabase::new(3);
    mesh.set_entity_count(EntityRank::Node, nodes);
    mesh.set_entity_count(EntityRank::Element, n);
    mesh.set_entity_count(EntityRank::Face, 2 + n);

    let block = mesh.declare_part_with_topology("block_1", Topology::Hex8)?;
    mesh.add_entities(block, EntityRank::Element, &(0..n).collect::<Vec<_>>())?;
    mesh.add_entities(block, EntityRank::Node, &(0..nodes).collect::<Vec<_>>())?;

    let sides: [(&str, Vec<usize>, Vec<usize>); 3] = [
        ("inflow", vec![0], (0..4).collect()),
        ("outflow", vec![1], (4 * n..4 * n + 4).collect()),
        (
            "wall",
            (2..2 + n).collect(),
            (0..=n).flat_map(|i| [4 * i, 4 * i + 1]).collect(),
        ),
    ];
    for (k, (name, faces, side_nodes)) in sides.iter().enumerate() {
        let side = mesh.declare_part(name, Some(EntityRank::Face))?;
        let sub = mesh.declare_part_with_topology(&format!("surface_{}_quad4", k + 1), Topology::Quad4)?;
        mesh.declare_part_subset(side, sub)?;
        mesh.add_entities(sub, EntityRank::Face, faces)?;
        mesh.add_entities(sub, EntityRank::Node, side_nodes)?;
    }

    let mut coordinates = Vec::with_capacity(3 * nodes);
    for i in 0..=n {
        for y in 0..2 {
            for z in 0..2 {
                coordinates.extend_from_slice(&[i as f64, y as f64, z as f64]);
            }
        }
    }
    Ok((mesh, coordinates))
}

// ─── Main ───────────────────────────────────────────────────────

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = SimulationConfig::from_yaml(INPUT)?;
    let (mesh, coordinates) = channel(CELLS)?;
    let realm = Simulation::realm_for(mesh, &config)?;
    let mut sim = Simulation::new(realm, config, &StandardFactory)?;
    sim.set_coordinates(&coordinates)?;
    sim.initialize()?;

    println!("{:>5} {:>6} {:>10} {:>14}", "step", "passes", "converged", "max norm");
    for report in sim.run(STEPS)? {
        println!(
            "{:>5} {:>6} {:>10} {:>14.6e}",
            report.step, report.nonlinear_iterations, report.converged, report.max_scaled_norm
        );
    }

    let mesh = sim.realm().mesh();
    if let Some(t) = mesh.find_field("temperature").and_then(|id| mesh.real(id)) {
        println!();
        println!("temperature along y = 1, z = 1:");
        for i in 0..=CELLS {
            println!("  x = {i:>2}  T = {:8.3}", t[4 * i + 3]);
        }
    }
    Ok(())
}
