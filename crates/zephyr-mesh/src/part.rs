//! Named mesh regions.

use smallvec::SmallVec;
use zephyr_core::{EntityRank, PartId, Topology};

/// A named, possibly overlapping region of the mesh.
///
/// Membership is tracked per entity rank, so an element block also knows
/// which nodes it touches. Entities added to a subset are members of every
/// superset as well.
#[derive(Clone, Debug)]
pub struct Part {
    pub(crate) id: PartId,
    pub(crate) name: String,
    pub(crate) rank: Option<EntityRank>,
    pub(crate) topology: Topology,
    pub(crate) subsets: SmallVec<[PartId; 4]>,
    pub(crate) supersets: SmallVec<[PartId; 2]>,
    /// Sorted, deduplicated member indices per rank.
    pub(crate) members: [Vec<usize>; 4],
}

impl Part {
    pub(crate) fn new(
        id: PartId,
        name: String,
        rank: Option<EntityRank>,
        topology: Topology,
    ) -> Self {
        Self {
            id,
            name,
            rank,
            topology,
            subsets: SmallVec::new(),
            supersets: SmallVec::new(),
            members: Default::default(),
        }
    }

    /// The part's identifier.
    pub fn id(&self) -> PartId {
        self.id
    }

    /// The part's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Primary entity rank, or `None` for the universal part and other
    /// rankless assemblies.
    pub fn primary_entity_rank(&self) -> Option<EntityRank> {
        self.rank
    }

    /// Topology of the part's primary entities.
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Direct subsets of this part, in declaration order.
    pub fn subsets(&self) -> &[PartId] {
        &self.subsets
    }

    /// Direct supersets of this part.
    pub fn supersets(&self) -> &[PartId] {
        &self.supersets
    }

    /// Member entity indices of the given rank, sorted ascending.
    pub fn members(&self, rank: EntityRank) -> &[usize] {
        &self.members[rank.index()]
    }

    /// Whether `entity` of `rank` belongs to this part.
    pub fn contains(&self, rank: EntityRank, entity: usize) -> bool {
        self.members[rank.index()].binary_search(&entity).is_ok()
    }

    pub(crate) fn insert_members(&mut self, rank: EntityRank, entities: &[usize]) {
        let list = &mut self.members[rank.index()];
        list.extend_from_slice(entities);
        list.sort_unstable();
        list.dedup();
    }

    /// Drop members of `rank` at or above `count`.
    pub(crate) fn truncate_members(&mut self, rank: EntityRank, count: usize) {
        let list = &mut self.members[rank.index()];
        let keep = list.partition_point(|&e| e < count);
        list.truncate(keep);
    }
}
