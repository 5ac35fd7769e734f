//! Mesh fixtures.
//!
//! [`channel_mesh`] builds a straight 3-D channel of unit hexahedra along
//! `x`:
//!
//! ```text
//!   node 4i + 2y + z  sits at (i, y, z), y and z in {0, 1}
//!
//!   inflow (x = 0)  |hex 0|hex 1| ... |hex n-1|  outflow (x = n)
//!                    wall: y = 0,  top: y = 1
//! ```
//!
//! Every boundary part is a rankless-topology side part with one `Quad4`
//! subset, the way a mesh generator writes sidesets.

use zephyr_core::{EntityRank, PartId, Topology};
use zephyr_eqsys::Realm;
use zephyr_mesh::MeshDatabase;

/// Name of the element block.
pub const BLOCK: &str = "block_1";

/// A channel mesh and the ids of its parts.
#[derive(Debug)]
pub struct ChannelMesh {
    pub mesh: MeshDatabase,
    pub num_elements: usize,
    pub block: PartId,
    pub inflow: PartId,
    pub outflow: PartId,
    pub wall: PartId,
    pub top: PartId,
    /// Interleaved `x, y, z` per node.
    pub coordinates: Vec<f64>,
}

impl ChannelMesh {
    pub fn num_nodes(&self) -> usize {
        4 * (self.num_elements + 1)
    }
}

fn node(i: usize, y: usize, z: usize) -> usize {
    4 * i + 2 * y + z
}

/// A channel of `num_elements` hexahedra.
///
/// Faces: 0 inflow, 1 outflow, `2..2+n` wall, `2+n..2+2n` top.
pub fn channel_mesh(num_elements: usize) -> ChannelMesh {
    let n = num_elements.max(1);
    let nodes = 4 * (n + 1);
    let mut mesh = MeshDatabase::new(3);
    mesh.set_entity_count(EntityRank::Node, nodes);
    mesh.set_entity_count(EntityRank::Element, n);
    mesh.set_entity_count(EntityRank::Face, 2 + 2 * n);

    let block = mesh
        .declare_part_with_topology(BLOCK, Topology::Hex8)
        .unwrap();
    mesh.add_entities(block, EntityRank::Element, &(0..n).collect::<Vec<_>>())
        .unwrap();
    mesh.add_entities(block, EntityRank::Node, &(0..nodes).collect::<Vec<_>>())
        .unwrap();

    let inflow_nodes: Vec<usize> = (0..4).collect();
    let outflow_nodes: Vec<usize> = (0..4).map(|k| 4 * n + k).collect();
    let wall_nodes: Vec<usize> = (0..=n).flat_map(|i| [node(i, 0, 0), node(i, 0, 1)]).collect();
    let top_nodes: Vec<usize> = (0..=n).flat_map(|i| [node(i, 1, 0), node(i, 1, 1)]).collect();

    let inflow = side_part(&mut mesh, "inflow", "surface_1_quad4", &[0], &inflow_nodes);
    let outflow = side_part(&mut mesh, "outflow", "surface_2_quad4", &[1], &outflow_nodes);
    let wall_faces: Vec<usize> = (2..2 + n).collect();
    let wall = side_part(&mut mesh, "wall", "surface_3_quad4", &wall_faces, &wall_nodes);
    let top_faces: Vec<usize> = (2 + n..2 + 2 * n).collect();
    let top = side_part(&mut mesh, "top", "surface_4_quad4", &top_faces, &top_nodes);

    let mut coordinates = Vec::with_capacity(3 * nodes);
    for i in 0..=n {
        for y in 0..2 {
            for z in 0..2 {
                coordinates.extend_from_slice(&[i as f64, y as f64, z as f64]);
            }
        }
    }

    ChannelMesh {
        mesh,
        num_elements: n,
        block,
        inflow,
        outflow,
        wall,
        top,
        coordinates,
    }
}

fn side_part(
    mesh: &mut MeshDatabase,
    name: &str,
    subset: &str,
    faces: &[usize],
    nodes: &[usize],
) -> PartId {
    let side = mesh.declare_part(name, Some(EntityRank::Face)).unwrap();
    let sub = mesh
        .declare_part_with_topology(subset, Topology::Quad4)
        .unwrap();
    mesh.declare_part_subset(side, sub).unwrap();
    mesh.add_entities(sub, EntityRank::Face, faces).unwrap();
    mesh.add_entities(sub, EntityRank::Node, nodes).unwrap();
    side
}

/// A realm over a fresh channel with `num_states` time-states.
///
/// The returned fixture keeps the part ids and coordinates; its `mesh`
/// has moved into the realm and is left empty.
pub fn channel_realm(num_elements: usize, num_states: u32) -> (Realm, ChannelMesh) {
    let mut channel = channel_mesh(num_elements);
    let mesh = std::mem::replace(&mut channel.mesh, MeshDatabase::new(3));
    let realm = Realm::new(mesh, num_states).unwrap();
    (realm, channel)
}

/// Copy `coordinates` into the mesh's `coordinates` field. Returns
/// `false` when the field has not been registered yet.
pub fn fill_coordinates(mesh: &mut MeshDatabase, coordinates: &[f64]) -> bool {
    let Some(id) = mesh.get_field(EntityRank::Node, "coordinates") else {
        return false;
    };
    match mesh.real_mut(id) {
        Some(buf) => {
            let n = buf.len().min(coordinates.len());
            buf[..n].copy_from_slice(&coordinates[..n]);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_parts_have_one_quad_subset() {
        let c = channel_mesh(3);
        for part in [c.inflow, c.outflow, c.wall, c.top] {
            let p = c.mesh.part(part).unwrap();
            assert_eq!(p.subsets().len(), 1);
            let sub = c.mesh.part(p.subsets()[0]).unwrap();
            assert_eq!(sub.topology(), Topology::Quad4);
            assert_eq!(sub.primary_entity_rank(), Some(EntityRank::Face));
        }
    }

    #[test]
    fn members_propagate_to_the_side_part() {
        let c = channel_mesh(2);
        let inflow = c.mesh.part(c.inflow).unwrap();
        assert_eq!(inflow.members(EntityRank::Node), &[0, 1, 2, 3]);
        assert_eq!(c.mesh.part(c.wall).unwrap().members(EntityRank::Face), &[2, 3]);
        assert_eq!(c.coordinates.len(), 3 * c.num_nodes());
    }
}
