//! Benchmark profiles for the Zephyr orchestration layer.
//!
//! - [`channel`]: a straight hexahedral channel with inflow, outflow, and
//!   wall sidesets
//! - [`reference_profile`]: heat conduction plus SST turbulence on a
//!   1000-element channel, initialized and ready to step
//! - [`REFERENCE_INPUT`]: the input document behind the reference profile

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use zephyr_core::{EntityRank, Topology};
use zephyr_engine::{EngineError, Simulation, SimulationConfig};
use zephyr_mesh::MeshDatabase;
use zephyr_systems::StandardFactory;

/// Input for the reference profile.
pub const REFERENCE_INPUT: &str = r#"
target_names: [block_1]
time_step: 0.01
boundary_conditions:
  - type: inflow
    target_name: inflow
    user_data:
      temperature: [400.0]
      turbulent_ke: [0.01]
      specific_dissipation_rate: [10.0]
  - type: wall
    target_name: wall
    user_data:
      temperature: [300.0]
  - type: open
    target_name: outflow
initial_conditions:
  - type: constant
    target_names: [block_1]
    value:
      temperature: [350.0]
      turbulent_ke: [0.01]
      specific_dissipation_rate: [10.0]
equation_systems:
  name: theEqSys
  max_iterations: 4
  solver_system_specification:
    temperature: solve_scalar
    turbulent_ke: solve_scalar
    specific_dissipation_rate: solve_scalar
  systems:
    - HeatConduction:
        convergence_tolerance: 1.0e-6
    - ShearStressTransport:
        convergence_tolerance: 1.0e-6
"#;

/// A channel of `n` unit hexahedra along `x` and its interleaved nodal
/// coordinates. Node `4i + 2y + z` sits at `(i, y, z)`.
pub fn channel(n: usize) -> Result<(MeshDatabase, Vec<f64>), EngineError> {
    let n = n.max(1);
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
        let sub =
            mesh.declare_part_with_topology(&format!("surface_{}_quad4", k + 1), Topology::Quad4)?;
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

/// An initialized simulation of [`REFERENCE_INPUT`] on `channel(1000)`.
pub fn reference_profile() -> Result<Simulation, EngineError> {
    profile(REFERENCE_INPUT, 1000)
}

/// An initialized simulation of `input` on a channel of `n` elements.
pub fn profile(input: &str, n: usize) -> Result<Simulation, EngineError> {
    let config = SimulationConfig::from_yaml(input)?;
    let (mesh, coordinates) = channel(n)?;
    let realm = Simulation::realm_for(mesh, &config)?;
    let mut sim = Simulation::new(realm, config, &StandardFactory)?;
    sim.set_coordinates(&coordinates)?;
    sim.initialize()?;
    Ok(sim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_profile_steps() {
        let mut sim = profile(REFERENCE_INPUT, 4).unwrap();
        let report = sim.step().unwrap();
        assert_eq!(report.step, 1);
        assert!(report.nonlinear_iterations >= 1);
        assert_eq!(sim.systems().len(), 2);
    }

    #[test]
    fn channel_sides_have_quad_subsets() {
        let (mesh, coordinates) = channel(3).unwrap();
        for name in ["inflow", "outflow", "wall"] {
            let part = mesh.get_part(name).unwrap();
            assert_eq!(part.subsets().len(), 1);
        }
        assert_eq!(coordinates.len(), 3 * 16);
    }
}
