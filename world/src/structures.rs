//! Structure registry: everything standing on terrain vertices.
//!
//! Structures form a closed sum over [`StructureKind`]; per-kind behaviour
//! is expressed through the capability queries on the kind rather than
//! through downcasting. Houses additionally carry an owner, occupants, and
//! a health pool; natural features carry neither.

use std::collections::BTreeMap;

use godhand_core::{Faction, GridPoint, GridRect, Health, StructureId, StructureKind};

/// Followers a house can hold before it refuses entry.
pub const HOUSE_CAPACITY: u32 = 4;

/// Damage a fresh house can absorb before it collapses.
pub const HOUSE_HEALTH: Health = Health::new(20);

/// One structure standing on the grid.
#[derive(Clone, Debug)]
pub struct Structure {
    id: StructureId,
    kind: StructureKind,
    faction: Option<Faction>,
    region: GridRect,
    health: Health,
    occupants: u32,
}

impl Structure {
    /// Identifier of the structure.
    #[must_use]
    pub const fn id(&self) -> StructureId {
        self.id
    }

    /// Kind of the structure.
    #[must_use]
    pub const fn kind(&self) -> StructureKind {
        self.kind
    }

    /// Owning faction, for houses and ruins.
    #[must_use]
    pub const fn faction(&self) -> Option<Faction> {
        self.faction
    }

    /// Footprint of the structure in grid vertices.
    #[must_use]
    pub const fn region(&self) -> GridRect {
        self.region
    }

    /// Remaining health of the structure.
    #[must_use]
    pub const fn health(&self) -> Health {
        self.health
    }

    /// Followers currently sheltered inside.
    #[must_use]
    pub const fn occupants(&self) -> u32 {
        self.occupants
    }

    /// Reports whether another follower can still enter.
    #[must_use]
    pub const fn has_room(&self) -> bool {
        self.occupants < HOUSE_CAPACITY
    }
}

/// Owns every structure and an occupancy index over their vertices.
#[derive(Default)]
pub(crate) struct StructureRegistry {
    structures: BTreeMap<StructureId, Structure>,
    occupancy: BTreeMap<GridPoint, StructureId>,
    next_id: u32,
}

impl StructureRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Places a natural terrain feature on a single vertex.
    pub(crate) fn insert_feature(&mut self, kind: StructureKind, at: GridPoint) -> StructureId {
        self.insert(kind, None, GridRect::from_points(at, at), Health::new(1))
    }

    /// Places a freshly founded house with one occupant.
    pub(crate) fn insert_house(&mut self, faction: Faction, region: GridRect) -> StructureId {
        let id = self.insert(StructureKind::House, Some(faction), region, HOUSE_HEALTH);
        if let Some(house) = self.structures.get_mut(&id) {
            house.occupants = 1;
        }
        id
    }

    pub(crate) fn get(&self, id: StructureId) -> Option<&Structure> {
        self.structures.get(&id)
    }

    /// Structure whose footprint covers the vertex, if any.
    pub(crate) fn at(&self, point: GridPoint) -> Option<&Structure> {
        let id = self.occupancy.get(&point)?;
        self.structures.get(id)
    }

    /// Reports whether a structure on the vertex refuses unit movement.
    pub(crate) fn blocks(&self, point: GridPoint) -> bool {
        self.at(point)
            .is_some_and(|structure| structure.kind().blocks_movement())
    }

    /// Reports whether any structure footprint overlaps the rectangle.
    pub(crate) fn overlaps(&self, rect: GridRect) -> bool {
        rect.iter().any(|point| self.occupancy.contains_key(&point))
    }

    /// Iterates structures in ascending id order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Structure> {
        self.structures.values()
    }

    /// Admits one more follower into a house.
    pub(crate) fn admit_occupant(&mut self, id: StructureId) {
        if let Some(house) = self.structures.get_mut(&id) {
            house.occupants += 1;
        }
    }

    /// Applies assault damage; reports whether the structure collapsed.
    pub(crate) fn damage(&mut self, id: StructureId, points: u32) -> bool {
        match self.structures.get_mut(&id) {
            Some(structure) => {
                structure.health = structure.health.damaged(points);
                structure.health.is_depleted()
            }
            None => false,
        }
    }

    /// Collapses a house into a walkable ruin, keeping its id and footprint.
    pub(crate) fn collapse_into_ruin(&mut self, id: StructureId) {
        if let Some(structure) = self.structures.get_mut(&id) {
            structure.kind = StructureKind::Ruin;
            structure.health = Health::new(0);
            structure.occupants = 0;
        }
    }

    /// Removes a structure and frees its footprint entirely.
    pub(crate) fn remove(&mut self, id: StructureId) -> Option<Structure> {
        let structure = self.structures.remove(&id)?;
        for point in structure.region.iter() {
            let _ = self.occupancy.remove(&point);
        }
        Some(structure)
    }

    fn insert(
        &mut self,
        kind: StructureKind,
        faction: Option<Faction>,
        region: GridRect,
        health: Health,
    ) -> StructureId {
        let id = StructureId::new(self.next_id);
        self.next_id += 1;
        let _ = self.structures.insert(
            id,
            Structure {
                id,
                kind,
                faction,
                region,
                health,
                occupants: 0,
            },
        );
        for point in region.iter() {
            let _ = self.occupancy.insert(point, id);
        }
        id
    }
}
