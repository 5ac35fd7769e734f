//! Mesh entity ranks and cell topologies.

use std::fmt;

/// The kind of mesh entity a field or part is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityRank {
    /// Mesh vertices.
    Node,
    /// One-dimensional entities (also the side rank of 2-D meshes).
    Edge,
    /// Two-dimensional entities (the side rank of 3-D meshes).
    Face,
    /// Cells.
    Element,
}

impl EntityRank {
    /// All ranks in ascending order.
    pub const ALL: [EntityRank; 4] = [Self::Node, Self::Edge, Self::Face, Self::Element];

    /// The rank of boundary sides for a mesh of the given spatial dimension.
    pub fn side_rank(spatial_dimension: u32) -> EntityRank {
        if spatial_dimension == 3 {
            Self::Face
        } else {
            Self::Edge
        }
    }

    /// Dense index of this rank, usable for per-rank arrays.
    pub fn index(self) -> usize {
        match self {
            Self::Node => 0,
            Self::Edge => 1,
            Self::Face => 2,
            Self::Element => 3,
        }
    }
}

impl fmt::Display for EntityRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Node => "NODE_RANK",
            Self::Edge => "EDGE_RANK",
            Self::Face => "FACE_RANK",
            Self::Element => "ELEMENT_RANK",
        };
        f.write_str(s)
    }
}

/// Cell or side topology of a part.
///
/// Volume topologies (`Hex8`, `Tet4`, ...) always have element rank. The
/// rank of surface topologies depends on the spatial dimension: a `Quad4`
/// is a side of a 3-D mesh, a `Line2` is a side of a 2-D mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topology {
    /// A single vertex.
    Node,
    /// Two-node line segment.
    Line2,
    /// Three-node triangle.
    Tri3,
    /// Four-node quadrilateral.
    Quad4,
    /// Four-node tetrahedron.
    Tet4,
    /// Five-node pyramid.
    Pyramid5,
    /// Six-node wedge.
    Wedge6,
    /// Eight-node hexahedron.
    Hex8,
    /// No topology (assembly parts, the universal part).
    Invalid,
}

impl Topology {
    /// Number of nodes of one entity of this topology.
    pub fn num_nodes(self) -> usize {
        match self {
            Self::Node => 1,
            Self::Line2 => 2,
            Self::Tri3 => 3,
            Self::Quad4 | Self::Tet4 => 4,
            Self::Pyramid5 => 5,
            Self::Wedge6 => 6,
            Self::Hex8 => 8,
            Self::Invalid => 0,
        }
    }

    /// The entity rank of this topology in a mesh of the given dimension.
    ///
    /// Returns `None` for [`Topology::Invalid`].
    pub fn rank(self, spatial_dimension: u32) -> Option<EntityRank> {
        match self {
            Self::Node => Some(EntityRank::Node),
            Self::Line2 => Some(EntityRank::Edge),
            Self::Tri3 | Self::Quad4 => Some(if spatial_dimension == 2 {
                EntityRank::Element
            } else {
                EntityRank::Face
            }),
            Self::Tet4 | Self::Pyramid5 | Self::Wedge6 | Self::Hex8 => Some(EntityRank::Element),
            Self::Invalid => None,
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Node => "NODE",
            Self::Line2 => "LINE_2",
            Self::Tri3 => "TRIANGLE_3",
            Self::Quad4 => "QUADRILATERAL_4",
            Self::Tet4 => "TETRAHEDRON_4",
            Self::Pyramid5 => "PYRAMID_5",
            Self::Wedge6 => "WEDGE_6",
            Self::Hex8 => "HEXAHEDRON_8",
            Self::Invalid => "INVALID_TOPOLOGY",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_rank_follows_dimension() {
        assert_eq!(EntityRank::side_rank(3), EntityRank::Face);
        assert_eq!(EntityRank::side_rank(2), EntityRank::Edge);
    }

    #[test]
    fn surface_topology_rank_depends_on_dimension() {
        assert_eq!(Topology::Quad4.rank(3), Some(EntityRank::Face));
        assert_eq!(Topology::Quad4.rank(2), Some(EntityRank::Element));
        assert_eq!(Topology::Line2.rank(2), Some(EntityRank::Edge));
        assert_eq!(Topology::Hex8.rank(3), Some(EntityRank::Element));
        assert_eq!(Topology::Invalid.rank(3), None);
    }

    #[test]
    fn rank_indices_are_dense() {
        for (i, rank) in EntityRank::ALL.iter().enumerate() {
            assert_eq!(rank.index(), i);
        }
    }
}
