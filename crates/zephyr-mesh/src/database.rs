//! The [`MeshDatabase`]: parts, field schema, and field storage.

use indexmap::IndexMap;
use smallvec::SmallVec;
use zephyr_core::{
    EntityRank, FieldError, FieldId, FieldState, MeshError, PartId, Topology, MAX_FIELD_STATES,
};

use crate::ngp::NgpField;
use crate::part::Part;
use crate::schema::{FieldDeclaration, FieldSchema, FieldValues};

/// Name of the part that contains every entity.
pub const UNIVERSAL_PART_NAME: &str = "{UNIVERSAL}";

#[derive(Clone, Debug)]
struct Slot {
    schema: usize,
    state: FieldState,
    buffer: usize,
    revision: u64,
}

/// Mesh metadata and bulk storage for one realm.
///
/// Parts and fields are append-only. Field storage is dense per rank:
/// every slot holds `entity_count(rank) * num_components` values.
#[derive(Clone, Debug)]
pub struct MeshDatabase {
    spatial_dimension: u32,
    entity_counts: [usize; 4],
    parts: Vec<Part>,
    part_names: IndexMap<String, PartId>,
    schemas: Vec<FieldSchema>,
    schema_index: IndexMap<(EntityRank, String), usize>,
    slots: Vec<Slot>,
    buffers: Vec<FieldValues>,
    mirrors: IndexMap<FieldId, NgpField>,
}

impl MeshDatabase {
    /// Create an empty database. Only the universal part exists.
    pub fn new(spatial_dimension: u32) -> Self {
        let universal = Part::new(
            PartId::UNIVERSAL,
            UNIVERSAL_PART_NAME.to_string(),
            None,
            Topology::Invalid,
        );
        let mut part_names = IndexMap::new();
        part_names.insert(UNIVERSAL_PART_NAME.to_string(), PartId::UNIVERSAL);
        Self {
            spatial_dimension,
            entity_counts: [0; 4],
            parts: vec![universal],
            part_names,
            schemas: Vec::new(),
            schema_index: IndexMap::new(),
            slots: Vec::new(),
            buffers: Vec::new(),
            mirrors: IndexMap::new(),
        }
    }

    /// Spatial dimension of the mesh (2 or 3).
    pub fn spatial_dimension(&self) -> u32 {
        self.spatial_dimension
    }

    /// Rank of boundary sides for this mesh.
    pub fn side_rank(&self) -> EntityRank {
        EntityRank::side_rank(self.spatial_dimension)
    }

    // ── Entities ────────────────────────────────────────────────

    /// Number of entities of `rank`.
    pub fn entity_count(&self, rank: EntityRank) -> usize {
        self.entity_counts[rank.index()]
    }

    /// Set the number of entities of `rank`, resizing storage of every
    /// field on that rank. New entities start at zero; shrinking drops
    /// the removed entities from every part.
    pub fn set_entity_count(&mut self, rank: EntityRank, count: usize) {
        if count < self.entity_counts[rank.index()] {
            for part in &mut self.parts {
                part.truncate_members(rank, count);
            }
        }
        self.entity_counts[rank.index()] = count;
        for slot in &self.slots {
            let schema = &self.schemas[slot.schema];
            if schema.rank != rank {
                continue;
            }
            let len = count * schema.num_components as usize;
            match &mut self.buffers[slot.buffer] {
                FieldValues::Real(v) => v.resize(len, 0.0),
                FieldValues::Integer(v) => v.resize(len, 0),
                FieldValues::GlobalId(v) => v.resize(len, 0),
            }
        }
    }

    // ── Parts ───────────────────────────────────────────────────

    /// Declare a rankless or explicitly ranked part without topology.
    pub fn declare_part(
        &mut self,
        name: &str,
        rank: Option<EntityRank>,
    ) -> Result<PartId, MeshError> {
        self.insert_part(name, rank, Topology::Invalid)
    }

    /// Declare a part whose rank follows from its topology.
    pub fn declare_part_with_topology(
        &mut self,
        name: &str,
        topology: Topology,
    ) -> Result<PartId, MeshError> {
        let rank = topology.rank(self.spatial_dimension);
        self.insert_part(name, rank, topology)
    }

    fn insert_part(
        &mut self,
        name: &str,
        rank: Option<EntityRank>,
        topology: Topology,
    ) -> Result<PartId, MeshError> {
        if self.part_names.contains_key(name) {
            return Err(MeshError::DuplicatePart {
                name: name.to_string(),
            });
        }
        let id = PartId(self.parts.len() as u32);
        self.parts
            .push(Part::new(id, name.to_string(), rank, topology));
        self.part_names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Make `subset` a subset of `superset`. Existing members of the
    /// subset are added to the superset.
    pub fn declare_part_subset(
        &mut self,
        superset: PartId,
        subset: PartId,
    ) -> Result<(), MeshError> {
        self.part_checked(superset)?;
        self.part_checked(subset)?;
        if !self.parts[superset.0 as usize].subsets.contains(&subset) {
            self.parts[superset.0 as usize].subsets.push(subset);
            self.parts[subset.0 as usize].supersets.push(superset);
        }
        let inherited: Vec<(EntityRank, Vec<usize>)> = EntityRank::ALL
            .iter()
            .map(|&r| (r, self.parts[subset.0 as usize].members(r).to_vec()))
            .collect();
        for (rank, members) in inherited {
            self.propagate_members(superset, rank, &members);
        }
        Ok(())
    }

    /// Add entities of `rank` to `part` and, transitively, its supersets.
    pub fn add_entities(
        &mut self,
        part: PartId,
        rank: EntityRank,
        entities: &[usize],
    ) -> Result<(), MeshError> {
        self.part_checked(part)?;
        let count = self.entity_count(rank);
        if let Some(&bad) = entities.iter().find(|&&e| e >= count) {
            return Err(MeshError::EntityOutOfRange {
                rank,
                index: bad,
                count,
            });
        }
        self.propagate_members(part, rank, entities);
        Ok(())
    }

    fn propagate_members(&mut self, part: PartId, rank: EntityRank, entities: &[usize]) {
        let mut stack: SmallVec<[PartId; 4]> = SmallVec::new();
        stack.push(part);
        while let Some(p) = stack.pop() {
            let entry = &mut self.parts[p.0 as usize];
            entry.insert_members(rank, entities);
            stack.extend(entry.supersets.iter().copied());
        }
    }

    fn part_checked(&self, id: PartId) -> Result<&Part, MeshError> {
        self.parts
            .get(id.0 as usize)
            .ok_or_else(|| MeshError::UnknownPart {
                name: format!("#{id}"),
            })
    }

    /// Look up a part by name.
    pub fn get_part(&self, name: &str) -> Option<&Part> {
        self.part_names
            .get(name)
            .map(|id| &self.parts[id.0 as usize])
    }

    /// Look up a part by id.
    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.get(id.0 as usize)
    }

    /// Every part, universal part first.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Ids of every part, universal part first.
    pub fn part_ids(&self) -> Vec<PartId> {
        self.parts.iter().map(|p| p.id).collect()
    }

    /// The part containing every entity.
    pub fn universal_part(&self) -> &Part {
        &self.parts[0]
    }

    /// Direct subsets of `id`, or `[id]` when it has none.
    pub fn part_subsets_or_self(&self, id: PartId) -> SmallVec<[PartId; 4]> {
        match self.part(id) {
            Some(p) if !p.subsets.is_empty() => p.subsets.clone(),
            _ => smallvec::smallvec![id],
        }
    }

    /// Sorted union of the `rank` members of `parts`.
    ///
    /// The universal part selects every entity of the rank.
    pub fn selected_entities(&self, rank: EntityRank, parts: &[PartId]) -> Vec<usize> {
        if parts.contains(&PartId::UNIVERSAL) {
            return (0..self.entity_count(rank)).collect();
        }
        let mut out: Vec<usize> = parts
            .iter()
            .filter_map(|&p| self.part(p))
            .flat_map(|p| p.members(rank).iter().copied())
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    // ── Field schema ────────────────────────────────────────────

    /// Declare a field, or return the existing one if an identical
    /// declaration was made before. Returns the `StateNP1` slot.
    ///
    /// A repeated declaration with a different kind, state count, or
    /// component count fails with [`FieldError::ConflictingRedefinition`].
    pub fn declare_field(&mut self, decl: &FieldDeclaration) -> Result<FieldId, FieldError> {
        if decl.num_states == 0
            || decl.num_states as usize > MAX_FIELD_STATES
            || decl.num_components == 0
        {
            return Err(FieldError::InvalidLayout {
                name: decl.name.clone(),
                num_states: decl.num_states,
                num_components: decl.num_components,
            });
        }
        let key = (decl.rank, decl.name.clone());
        if let Some(&idx) = self.schema_index.get(&key) {
            let existing = &self.schemas[idx];
            if existing.kind != decl.kind
                || existing.num_states != decl.num_states
                || existing.num_components != decl.num_components
            {
                return Err(FieldError::ConflictingRedefinition {
                    name: decl.name.clone(),
                    existing: format!("{} {}", existing.kind, existing.describe()),
                    requested: format!(
                        "{} {} states x {} components",
                        decl.kind, decl.num_states, decl.num_components
                    ),
                });
            }
            return Ok(existing.slots[0]);
        }

        let schema_idx = self.schemas.len();
        let len = self.entity_count(decl.rank) * decl.num_components as usize;
        let mut slots = SmallVec::new();
        for s in 0..decl.num_states as usize {
            let id = FieldId(self.slots.len() as u32);
            let buffer = self.buffers.len();
            self.buffers.push(FieldValues::zeroed(decl.kind, len));
            self.slots.push(Slot {
                schema: schema_idx,
                state: FieldState::from_index(s).unwrap_or_default(),
                buffer,
                revision: 0,
            });
            slots.push(id);
        }
        let first = slots[0];
        self.schemas.push(FieldSchema {
            name: decl.name.clone(),
            kind: decl.kind,
            rank: decl.rank,
            num_states: decl.num_states,
            num_components: decl.num_components,
            parts: SmallVec::new(),
            slots,
        });
        self.schema_index.insert(key, schema_idx);
        Ok(first)
    }

    /// Attach a declared field to `parts`, optionally initialising the
    /// entities of those parts in every state.
    pub fn put_field_on_parts(
        &mut self,
        field: FieldId,
        parts: &[PartId],
        init: Option<&[f64]>,
    ) -> Result<(), FieldError> {
        let schema_idx = self.slot_checked(field)?.schema;
        for &p in parts {
            if self.part(p).is_none() {
                return Err(FieldError::NotRegistered {
                    name: format!("part #{p}"),
                });
            }
            let schema = &mut self.schemas[schema_idx];
            if !schema.parts.contains(&p) {
                schema.parts.push(p);
            }
        }
        if let Some(init) = init {
            let schema = &self.schemas[schema_idx];
            let components = schema.num_components as usize;
            let entities = self.selected_entities(schema.rank, parts);
            for &slot_id in &schema.slots {
                let slot = &mut self.slots[slot_id.0 as usize];
                slot.revision += 1;
                let buf = &mut self.buffers[slot.buffer];
                for &e in &entities {
                    buf.fill_entity(e, components, init);
                }
            }
        }
        Ok(())
    }

    /// The `StateNP1` slot of the field called `name` on `rank`.
    pub fn get_field(&self, rank: EntityRank, name: &str) -> Option<FieldId> {
        self.schema_index
            .get(&(rank, name.to_string()))
            .map(|&idx| self.schemas[idx].slots[0])
    }

    /// The `StateNP1` slot of the first field called `name` on any rank.
    pub fn find_field(&self, name: &str) -> Option<FieldId> {
        EntityRank::ALL
            .iter()
            .find_map(|&rank| self.get_field(rank, name))
    }

    /// Schema entry owning `field`.
    pub fn schema(&self, field: FieldId) -> Option<&FieldSchema> {
        self.slots
            .get(field.0 as usize)
            .map(|s| &self.schemas[s.schema])
    }

    /// Every declared field, in declaration order.
    pub fn schemas(&self) -> &[FieldSchema] {
        &self.schemas
    }

    /// Time-state of the slot `field`.
    pub fn field_state(&self, field: FieldId) -> Option<FieldState> {
        self.slots.get(field.0 as usize).map(|s| s.state)
    }

    /// The slot holding `state` of the field that owns `field`.
    pub fn field_of_state(&self, field: FieldId, state: FieldState) -> Result<FieldId, FieldError> {
        let schema = &self.schemas[self.slot_checked(field)?.schema];
        schema
            .slots
            .get(state.index())
            .copied()
            .ok_or_else(|| FieldError::StateOutOfRange {
                name: schema.name.clone(),
                state,
                num_states: schema.num_states,
            })
    }

    /// Number of declared field slots. Each state of a multi-state field
    /// counts once.
    pub fn field_count(&self) -> usize {
        self.slots.len()
    }

    fn slot_checked(&self, field: FieldId) -> Result<&Slot, FieldError> {
        self.slots
            .get(field.0 as usize)
            .ok_or_else(|| FieldError::NotRegistered {
                name: format!("#{field}"),
            })
    }

    // ── Field data ──────────────────────────────────────────────

    /// Storage behind a slot.
    pub fn values(&self, field: FieldId) -> Option<&FieldValues> {
        self.slots
            .get(field.0 as usize)
            .map(|s| &self.buffers[s.buffer])
    }

    /// Mutable storage behind a slot. Bumps the slot's host revision.
    pub fn values_mut(&mut self, field: FieldId) -> Option<&mut FieldValues> {
        let slot = self.slots.get_mut(field.0 as usize)?;
        slot.revision += 1;
        Some(&mut self.buffers[slot.buffer])
    }

    /// Real values behind a slot.
    pub fn real(&self, field: FieldId) -> Option<&[f64]> {
        self.values(field)?.as_real()
    }

    /// Mutable real values behind a slot.
    pub fn real_mut(&mut self, field: FieldId) -> Option<&mut [f64]> {
        self.values_mut(field)?.as_real_mut()
    }

    /// The components of one entity of a real field.
    pub fn entity_values(&self, field: FieldId, entity: usize) -> Option<&[f64]> {
        let n = self.schema(field)?.num_components as usize;
        self.real(field)?.get(entity * n..(entity + 1) * n)
    }

    /// Host revision of a slot. Changes whenever its data may have changed.
    pub fn revision(&self, field: FieldId) -> Option<u64> {
        self.slots.get(field.0 as usize).map(|s| s.revision)
    }

    /// Copy the data of state `from` into state `to` for the field owning
    /// `field`.
    pub fn copy_state(
        &mut self,
        field: FieldId,
        from: FieldState,
        to: FieldState,
    ) -> Result<(), FieldError> {
        let src = self.field_of_state(field, from)?;
        let dst = self.field_of_state(field, to)?;
        if src == dst {
            return Ok(());
        }
        let data = self.buffers[self.slots[src.0 as usize].buffer].clone();
        let dst_slot = &mut self.slots[dst.0 as usize];
        dst_slot.revision += 1;
        self.buffers[dst_slot.buffer] = data;
        Ok(())
    }

    /// Advance every multi-state field one step: `N` takes the old `NP1`
    /// data, `NM1` the old `N`, and the oldest buffer is recycled as the
    /// new `NP1`.
    pub fn rotate_field_states(&mut self) {
        for schema in &self.schemas {
            let n = schema.slots.len();
            if n < 2 {
                continue;
            }
            let old: SmallVec<[usize; MAX_FIELD_STATES]> = schema
                .slots
                .iter()
                .map(|id| self.slots[id.0 as usize].buffer)
                .collect();
            for (i, id) in schema.slots.iter().enumerate() {
                let slot = &mut self.slots[id.0 as usize];
                slot.buffer = old[(i + n - 1) % n];
                slot.revision += 1;
            }
        }
    }

    // ── Device mirrors ──────────────────────────────────────────

    /// The device mirror of a real-valued slot, refreshed from the host
    /// if the host changed since the last copy and the device holds no
    /// pending modifications. `None` for unknown or non-real slots.
    pub fn get_updated_ngp_field(&mut self, field: FieldId) -> Option<&mut NgpField> {
        let slot = self.slots.get(field.0 as usize)?;
        let host = self.buffers[slot.buffer].as_real()?;
        let revision = slot.revision;
        let mirror = self.mirrors.entry(field).or_insert_with(|| NgpField {
            field,
            values: host.to_vec(),
            synced_revision: revision,
            modified_on_device: false,
        });
        if mirror.synced_revision != revision && !mirror.modified_on_device {
            mirror.values.clear();
            mirror.values.extend_from_slice(host);
            mirror.synced_revision = revision;
        }
        Some(mirror)
    }

    /// Copy pending device modifications of `field` back to the host.
    /// Returns whether anything was copied.
    pub fn sync_to_host(&mut self, field: FieldId) -> bool {
        let Some(mirror) = self.mirrors.get_mut(&field) else {
            return false;
        };
        if !mirror.modified_on_device {
            return false;
        }
        let slot = &mut self.slots[field.0 as usize];
        if let Some(host) = self.buffers[slot.buffer].as_real_mut() {
            host.copy_from_slice(&mirror.values);
        }
        slot.revision += 1;
        mirror.synced_revision = slot.revision;
        mirror.modified_on_device = false;
        true
    }
}
