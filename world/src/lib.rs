#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative match state.
//!
//! The world owns the terrain, every unit and structure, the faction mana
//! pools, and the match tallies. All mutation flows through [`apply`]: a
//! command either succeeds and produces events describing what happened, or
//! fails and produces a rejection event carrying a reason. Systems never
//! mutate the world directly; they observe events, read snapshots through
//! [`query`], and respond with new commands.

use std::collections::BTreeMap;
use std::time::Duration;

use godhand_core::{
    AssaultError, Behaviour, Command, DeathCause, EntryError, Event, Faction, GridPoint, GridRect,
    Health, Intervention, InterventionError, SettleError, StructureId, StructureKind, UnitId,
    UnitKind, WorldPos,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub mod seed;
mod structures;
mod terrain;

pub use structures::{Structure, HOUSE_CAPACITY, HOUSE_HEALTH};
pub use terrain::{Terrain, TerrainChange};

use structures::StructureRegistry;

/// Fixed quantum at which fights, assaults, and mana accrual resolve.
pub const ROUND_QUANTUM: Duration = Duration::from_millis(500);

/// Mana each faction holds when a match begins.
pub const STARTING_MANA: u32 = 300;

/// Mana a standing house yields to its faction per round.
const HOUSE_MANA_YIELD: u32 = 5;

/// Default edge length in tiles when no configuration command arrives.
const DEFAULT_GRID_SIZE: u32 = 32;

/// Default chunk edge length in tiles.
const DEFAULT_CHUNK_TILES: u32 = 8;

struct Unit {
    faction: Faction,
    kind: UnitKind,
    behaviour: Behaviour,
    position: WorldPos,
    health: Health,
    engagement: Engagement,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Engagement {
    None,
    Fighting(UnitId),
    Assaulting(StructureId),
}

#[derive(Default)]
struct ManaPools {
    red: u32,
    blue: u32,
}

impl ManaPools {
    const fn available(&self, faction: Faction) -> u32 {
        match faction {
            Faction::Red => self.red,
            Faction::Blue => self.blue,
        }
    }

    fn accrue(&mut self, faction: Faction, amount: u32) {
        let pool = match faction {
            Faction::Red => &mut self.red,
            Faction::Blue => &mut self.blue,
        };
        *pool = pool.saturating_add(amount);
    }

    fn spend(&mut self, faction: Faction, cost: u32) -> bool {
        let pool = match faction {
            Faction::Red => &mut self.red,
            Faction::Blue => &mut self.blue,
        };
        match pool.checked_sub(cost) {
            Some(rest) => {
                *pool = rest;
                true
            }
            None => false,
        }
    }
}

#[derive(Default, Clone, Copy)]
struct Tallies {
    slain: u32,
    drowned: u32,
    settlements: u32,
    interventions: u32,
}

/// Authoritative state of one match.
pub struct World {
    match_seed: u64,
    clock: Duration,
    round_accumulator: Duration,
    terrain: Terrain,
    units: BTreeMap<UnitId, Unit>,
    next_unit_id: u32,
    structures: StructureRegistry,
    mana: ManaPools,
    tallies: Tallies,
    quake_rng: ChaCha8Rng,
}

impl World {
    /// Creates a world with the default grid, awaiting configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::configured(DEFAULT_GRID_SIZE, DEFAULT_CHUNK_TILES, 0, 0)
    }

    fn configured(grid_size: u32, chunk_tiles: u32, water_level: i32, match_seed: u64) -> Self {
        let terrain = Terrain::new(grid_size, chunk_tiles, water_level);
        let quake_rng =
            ChaCha8Rng::seed_from_u64(seed::derive_stream_seed(match_seed, "terrain.quake"));
        let mut world = Self {
            match_seed,
            clock: Duration::ZERO,
            round_accumulator: Duration::ZERO,
            terrain,
            units: BTreeMap::new(),
            next_unit_id: 0,
            structures: StructureRegistry::new(),
            mana: ManaPools {
                red: STARTING_MANA,
                blue: STARTING_MANA,
            },
            tallies: Tallies::default(),
            quake_rng,
        };
        world.scatter_flora();
        world
    }

    /// Scatters natural features across dry land from a dedicated stream.
    fn scatter_flora(&mut self) {
        let mut rng =
            ChaCha8Rng::seed_from_u64(seed::derive_stream_seed(self.match_seed, "terrain.flora"));
        let limit = self.terrain.grid_size() as i32;
        for z in 0..=limit {
            for x in 0..=limit {
                let point = GridPoint::new(x, z);
                let roll: u32 = rng.gen_range(0..100);
                let kind = match roll {
                    0 | 1 => StructureKind::Tree,
                    2 => StructureKind::Rock,
                    3 => StructureKind::Swamp,
                    4 => StructureKind::Field,
                    _ => continue,
                };
                if self.terrain.height(point) > self.terrain.water_level() {
                    let _ = self.structures.insert_feature(kind, point);
                }
            }
        }
    }

    fn report(&self) -> godhand_core::MatchStats {
        let mut stats = godhand_core::MatchStats {
            units_slain: self.tallies.slain,
            units_drowned: self.tallies.drowned,
            settlements_founded: self.tallies.settlements,
            interventions_invoked: self.tallies.interventions,
            water_level: self.terrain.water_level(),
            ..godhand_core::MatchStats::default()
        };
        for unit in self.units.values() {
            match unit.faction {
                Faction::Red => stats.red_units += 1,
                Faction::Blue => stats.blue_units += 1,
            }
        }
        for structure in self.structures.iter() {
            if structure.kind().is_house() {
                match structure.faction() {
                    Some(Faction::Red) => stats.red_houses += 1,
                    Some(Faction::Blue) => stats.blue_houses += 1,
                    None => {}
                }
            }
        }
        stats
    }

    fn tick(&mut self, dt: Duration, out: &mut Vec<Event>) {
        self.clock += dt;
        self.round_accumulator += dt;
        out.push(Event::TimeAdvanced { dt });
        while self.round_accumulator >= ROUND_QUANTUM {
            self.round_accumulator -= ROUND_QUANTUM;
            self.resolve_round(out);
        }
    }

    fn resolve_round(&mut self, out: &mut Vec<Event>) {
        for unit in self.units.values() {
            self.mana.accrue(unit.faction, unit.kind.mana_yield());
        }
        let house_yields: Vec<Faction> = self
            .structures
            .iter()
            .filter(|structure| structure.kind().is_house())
            .filter_map(|structure| structure.faction())
            .collect();
        for faction in house_yields {
            self.mana.accrue(faction, HOUSE_MANA_YIELD);
        }
        self.resolve_fights(out);
        self.resolve_assaults(out);
    }

    fn resolve_fights(&mut self, out: &mut Vec<Event>) {
        let pairs: Vec<(UnitId, UnitId)> = self
            .units
            .iter()
            .filter_map(|(id, unit)| match unit.engagement {
                Engagement::Fighting(opponent) if *id < opponent => Some((*id, opponent)),
                _ => None,
            })
            .collect();
        for (first, second) in pairs {
            let Some(first_strength) = self.units.get(&first).map(|u| u.kind.strength()) else {
                continue;
            };
            let Some(second_strength) = self.units.get(&second).map(|u| u.kind.strength()) else {
                continue;
            };
            // The lower id strikes first; a killing blow prevents the riposte.
            if self.strike(second, first_strength) {
                self.kill_unit(second, DeathCause::Slain, out);
            } else if self.strike(first, second_strength) {
                self.kill_unit(first, DeathCause::Slain, out);
            }
        }
    }

    /// Applies damage to a unit, reporting whether it died.
    fn strike(&mut self, target: UnitId, points: u32) -> bool {
        match self.units.get_mut(&target) {
            Some(unit) => {
                unit.health = unit.health.damaged(points);
                unit.health.is_depleted()
            }
            None => false,
        }
    }

    fn resolve_assaults(&mut self, out: &mut Vec<Event>) {
        let assaults: Vec<(UnitId, StructureId)> = self
            .units
            .iter()
            .filter_map(|(id, unit)| match unit.engagement {
                Engagement::Assaulting(structure) => Some((*id, structure)),
                _ => None,
            })
            .collect();
        for (attacker, structure) in assaults {
            let Some(strength) = self.units.get(&attacker).map(|u| u.kind.strength()) else {
                continue;
            };
            if self.structures.get(structure).is_none() {
                continue;
            }
            if self.structures.damage(structure, strength) {
                self.destroy_structure(structure, out);
            }
        }
    }

    /// Removes or ruins a structure and releases everyone attacking it.
    fn destroy_structure(&mut self, id: StructureId, out: &mut Vec<Event>) {
        let Some(structure) = self.structures.get(id) else {
            return;
        };
        let region = structure.region();
        if structure.kind().is_house() {
            self.structures.collapse_into_ruin(id);
        } else {
            let _ = self.structures.remove(id);
        }
        out.push(Event::StructureDestroyed {
            structure: id,
            region,
        });
        for unit in self.units.values_mut() {
            if unit.engagement == Engagement::Assaulting(id) {
                unit.engagement = Engagement::None;
            }
        }
    }

    /// Removes a unit, settles its fight if any, and records the tally.
    fn kill_unit(&mut self, id: UnitId, cause: DeathCause, out: &mut Vec<Event>) {
        let Some(unit) = self.units.remove(&id) else {
            return;
        };
        match cause {
            DeathCause::Slain => self.tallies.slain += 1,
            DeathCause::Drowned => self.tallies.drowned += 1,
        }
        out.push(Event::UnitDied { unit: id, cause });
        if let Engagement::Fighting(opponent) = unit.engagement {
            if let Some(survivor) = self.units.get_mut(&opponent) {
                survivor.engagement = Engagement::None;
                out.push(Event::FightEnded { survivor: opponent });
            }
        }
    }

    fn spawn_unit(&mut self, faction: Faction, kind: UnitKind, at: GridPoint, out: &mut Vec<Event>) {
        if !self.terrain.is_in_bounds(at)
            || self.terrain.is_underwater(at)
            || self.structures.blocks(at)
        {
            return;
        }
        let id = UnitId::new(self.next_unit_id);
        self.next_unit_id += 1;
        let _ = self.units.insert(
            id,
            Unit {
                faction,
                kind,
                behaviour: Behaviour::Settle,
                position: at.position(),
                health: kind.max_health(),
                engagement: Engagement::None,
            },
        );
        out.push(Event::UnitSpawned {
            unit: id,
            faction,
            kind,
            at,
        });
    }

    fn move_unit(&mut self, id: UnitId, to: WorldPos, out: &mut Vec<Event>) {
        let Some(unit) = self.units.get_mut(&id) else {
            return;
        };
        unit.position = to;
        let vertex = to.nearest_vertex();
        out.push(Event::UnitMoved {
            unit: id,
            position: to,
            vertex,
        });
        let swallowed = self
            .structures
            .at(vertex)
            .is_some_and(|structure| structure.kind().is_swamp());
        if swallowed || self.terrain.is_underwater(vertex) {
            self.kill_unit(id, DeathCause::Drowned, out);
        }
    }

    fn found_settlement(&mut self, unit_id: UnitId, anchor: GridPoint, out: &mut Vec<Event>) {
        let reject = |reason| Event::SettlementRejected {
            unit: unit_id,
            reason,
        };
        let Some(unit) = self.units.get(&unit_id) else {
            out.push(reject(SettleError::MissingUnit));
            return;
        };
        let region = GridRect::from_points(anchor, anchor.offset(1, 1));
        if !self.terrain.is_in_bounds(region.min()) || !self.terrain.is_in_bounds(region.max()) {
            out.push(reject(SettleError::OutOfBounds));
            return;
        }
        if self.structures.overlaps(region) {
            out.push(reject(SettleError::Occupied));
            return;
        }
        if !self.terrain.is_flat_above_water(region) {
            out.push(reject(SettleError::Uneven));
            return;
        }
        let faction = unit.faction;
        let _ = self.units.remove(&unit_id);
        let structure = self.structures.insert_house(faction, region);
        self.tallies.settlements += 1;
        out.push(Event::SettlementFounded {
            structure,
            faction,
            region,
            founder: unit_id,
        });
    }

    fn enter_house(&mut self, unit_id: UnitId, structure_id: StructureId, out: &mut Vec<Event>) {
        let reject = |reason| Event::EntryRejected {
            unit: unit_id,
            structure: structure_id,
            reason,
        };
        let Some(unit) = self.units.get(&unit_id) else {
            out.push(reject(EntryError::MissingUnit));
            return;
        };
        let Some(house) = self.structures.get(structure_id) else {
            out.push(reject(EntryError::MissingStructure));
            return;
        };
        if !house.kind().is_house() {
            out.push(reject(EntryError::NotAHouse));
            return;
        }
        if house.faction() != Some(unit.faction) {
            out.push(reject(EntryError::WrongFaction));
            return;
        }
        if !house.has_room() {
            out.push(reject(EntryError::Full));
            return;
        }
        let _ = self.units.remove(&unit_id);
        self.structures.admit_occupant(structure_id);
        out.push(Event::UnitEnteredHouse {
            unit: unit_id,
            structure: structure_id,
        });
    }

    fn attack_house(&mut self, unit_id: UnitId, structure_id: StructureId, out: &mut Vec<Event>) {
        let reject = |reason| Event::AssaultRejected {
            unit: unit_id,
            structure: structure_id,
            reason,
        };
        let Some(unit) = self.units.get(&unit_id) else {
            out.push(reject(AssaultError::MissingUnit));
            return;
        };
        let Some(house) = self.structures.get(structure_id) else {
            out.push(reject(AssaultError::MissingStructure));
            return;
        };
        if !house.kind().is_house() {
            out.push(reject(AssaultError::NotAttackable));
            return;
        }
        if house.faction() == Some(unit.faction) {
            out.push(reject(AssaultError::SameFaction));
            return;
        }
        if let Some(unit) = self.units.get_mut(&unit_id) {
            unit.engagement = Engagement::Assaulting(structure_id);
        }
        out.push(Event::HouseAssaulted {
            unit: unit_id,
            structure: structure_id,
        });
    }

    fn engage_units(&mut self, first: UnitId, second: UnitId, out: &mut Vec<Event>) {
        let (low, high) = if first < second {
            (first, second)
        } else {
            (second, first)
        };
        let Some(a) = self.units.get(&low) else {
            return;
        };
        let Some(b) = self.units.get(&high) else {
            return;
        };
        if a.faction == b.faction
            || a.engagement != Engagement::None
            || b.engagement != Engagement::None
        {
            return;
        }
        if let Some(unit) = self.units.get_mut(&low) {
            unit.engagement = Engagement::Fighting(high);
        }
        if let Some(unit) = self.units.get_mut(&high) {
            unit.engagement = Engagement::Fighting(low);
        }
        out.push(Event::UnitsEngaged {
            first: low,
            second: high,
        });
    }

    fn invoke(
        &mut self,
        faction: Faction,
        intervention: Intervention,
        target: GridPoint,
        out: &mut Vec<Event>,
    ) {
        let reject = |reason| Event::InterventionRejected {
            faction,
            intervention,
            reason,
        };
        if !self.terrain.is_in_bounds(target) {
            out.push(reject(InterventionError::OutOfBounds));
            return;
        }
        if !self.mana.spend(faction, intervention.mana_cost()) {
            out.push(reject(InterventionError::InsufficientMana));
            return;
        }
        match intervention {
            Intervention::Mold { raise } => self.terrain.mold(target, raise),
            Intervention::Earthquake { radius } => {
                self.terrain
                    .cause_earthquake(target, radius, &mut self.quake_rng)
            }
            Intervention::Volcano { radius } => self.terrain.cause_volcano(target, radius),
            Intervention::Flood => self.terrain.raise_water_level(),
        }
        // Clamped no-ops keep the tally in step with the emitted events.
        let Some(change) = self.terrain.take_changes() else {
            return;
        };
        self.tallies.interventions += 1;
        out.push(Event::TerrainModified {
            region: change.region,
            chunks: change.chunks,
            cause: intervention,
        });
        if matches!(intervention, Intervention::Flood) {
            out.push(Event::WaterLevelRaised {
                level: self.terrain.water_level(),
            });
        }
        self.reconcile_terrain(change.region, out);
    }

    /// Settles the consequences of a terrain change within the same apply.
    ///
    /// Houses whose footprint is no longer flat and dry collapse, natural
    /// features on submerged vertices wash away, and units standing on
    /// submerged vertices drown.
    fn reconcile_terrain(&mut self, region: GridRect, out: &mut Vec<Event>) {
        let doomed: Vec<StructureId> = self
            .structures
            .iter()
            .filter(|structure| structure.region().intersects(&region))
            .filter(|structure| match structure.kind() {
                StructureKind::House => !self.terrain.is_flat_above_water(structure.region()),
                StructureKind::Ruin => false,
                _ => self.terrain.height(structure.region().min()) <= self.terrain.water_level(),
            })
            .map(Structure::id)
            .collect();
        for id in doomed {
            self.destroy_structure(id, out);
        }
        let drowned: Vec<UnitId> = self
            .units
            .iter()
            .filter(|(_, unit)| {
                self.terrain
                    .is_underwater(unit.position.nearest_vertex())
            })
            .map(|(id, _)| *id)
            .collect();
        for id in drowned {
            self.kill_unit(id, DeathCause::Drowned, out);
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Executes one command against the world, appending resulting events.
pub fn apply(world: &mut World, command: Command, out: &mut Vec<Event>) {
    match command {
        Command::ConfigureWorld {
            grid_size,
            chunk_tiles,
            water_level,
            seed,
        } => {
            *world = World::configured(grid_size, chunk_tiles, water_level, seed);
        }
        Command::Tick { dt } => world.tick(dt, out),
        Command::SpawnUnit { faction, kind, at } => world.spawn_unit(faction, kind, at, out),
        Command::MoveUnit { unit, to } => world.move_unit(unit, to, out),
        Command::FoundSettlement { unit, anchor } => world.found_settlement(unit, anchor, out),
        Command::EnterHouse { unit, structure } => world.enter_house(unit, structure, out),
        Command::AttackHouse { unit, structure } => world.attack_house(unit, structure, out),
        Command::EngageUnits { first, second } => world.engage_units(first, second, out),
        Command::SetBehaviour { unit, behaviour } => {
            if let Some(record) = world.units.get_mut(&unit) {
                record.behaviour = behaviour;
            }
        }
        Command::Invoke {
            faction,
            intervention,
            target,
        } => world.invoke(faction, intervention, target, out),
        Command::RequestStatsRefresh => {
            out.push(Event::StatsPublished {
                report: world.report(),
            });
        }
    }
}

/// Read-only snapshot access for systems and adapters.
pub mod query {
    use super::{Engagement, Structure, Terrain, World};
    use godhand_core::{
        Behaviour, Faction, GridPoint, GridRect, Health, MatchStats, StructureId, StructureKind,
        UnitId, UnitKind, WorldPos,
    };
    use std::time::Duration;

    /// Immutable copy of one unit's externally visible state.
    #[derive(Clone, Copy, Debug)]
    pub struct UnitSnapshot {
        /// Identifier of the unit.
        pub id: UnitId,
        /// Faction the unit fights for.
        pub faction: Faction,
        /// Kind of the unit.
        pub kind: UnitKind,
        /// Current behavioural mode.
        pub behaviour: Behaviour,
        /// Continuous position in tile units.
        pub position: WorldPos,
        /// Nearest lattice vertex to the position.
        pub vertex: GridPoint,
        /// Remaining health.
        pub health: Health,
        /// Whether the unit is locked in a fight or assault.
        pub engaged: bool,
    }

    /// Immutable copy of one structure's externally visible state.
    #[derive(Clone, Copy, Debug)]
    pub struct StructureSnapshot {
        /// Identifier of the structure.
        pub id: StructureId,
        /// Kind of the structure.
        pub kind: StructureKind,
        /// Owning faction, for houses and ruins.
        pub faction: Option<Faction>,
        /// Footprint in grid vertices.
        pub region: GridRect,
        /// Followers sheltered inside, for houses.
        pub occupants: u32,
        /// Whether another follower can still enter, for houses.
        pub has_room: bool,
    }

    /// Borrowing view over terrain and structure occupancy for navigation.
    #[derive(Clone, Copy)]
    pub struct NavView<'a> {
        world: &'a World,
    }

    impl NavView<'_> {
        /// Number of tiles along each edge of the grid.
        #[must_use]
        pub fn grid_size(&self) -> u32 {
            self.world.terrain.grid_size()
        }

        /// Current global water level.
        #[must_use]
        pub fn water_level(&self) -> i32 {
            self.world.terrain.water_level()
        }

        /// Reports whether the vertex lies on the grid.
        #[must_use]
        pub fn is_in_bounds(&self, point: GridPoint) -> bool {
            self.world.terrain.is_in_bounds(point)
        }

        /// Height of the vertex, with the water level as boundary value.
        #[must_use]
        pub fn height(&self, point: GridPoint) -> i32 {
            self.world.terrain.height(point)
        }

        /// Reports whether the vertex is fully submerged.
        #[must_use]
        pub fn is_underwater(&self, point: GridPoint) -> bool {
            self.world.terrain.is_underwater(point)
        }

        /// Reports whether units may stand on or path through the vertex.
        #[must_use]
        pub fn is_accessible(&self, point: GridPoint) -> bool {
            self.is_in_bounds(point)
                && !self.is_underwater(point)
                && !self.world.structures.blocks(point)
        }

        /// Reports whether the rectangle is flat, dry, and structure-free.
        #[must_use]
        pub fn is_open_block(&self, region: GridRect) -> bool {
            self.world.terrain.is_flat_above_water(region)
                && !self.world.structures.overlaps(region)
        }

        /// Snapshot of the structure covering the vertex, if any.
        #[must_use]
        pub fn structure_at(&self, point: GridPoint) -> Option<StructureSnapshot> {
            self.world.structures.at(point).map(snapshot_structure)
        }

        /// Snapshot of a structure looked up by id.
        #[must_use]
        pub fn structure_by_id(&self, id: StructureId) -> Option<StructureSnapshot> {
            self.world.structures.get(id).map(snapshot_structure)
        }
    }

    /// Navigation view over the world.
    #[must_use]
    pub fn nav(world: &World) -> NavView<'_> {
        NavView { world }
    }

    /// Borrow of the raw terrain, for mesh descriptors and diagnostics.
    #[must_use]
    pub fn terrain(world: &World) -> &Terrain {
        &world.terrain
    }

    /// Snapshots of every unit in ascending id order.
    #[must_use]
    pub fn units(world: &World) -> Vec<UnitSnapshot> {
        world
            .units
            .iter()
            .map(|(id, unit)| UnitSnapshot {
                id: *id,
                faction: unit.faction,
                kind: unit.kind,
                behaviour: unit.behaviour,
                position: unit.position,
                vertex: unit.position.nearest_vertex(),
                health: unit.health,
                engaged: unit.engagement != Engagement::None,
            })
            .collect()
    }

    /// Snapshot of a single unit.
    #[must_use]
    pub fn unit(world: &World, id: UnitId) -> Option<UnitSnapshot> {
        units(world).into_iter().find(|snapshot| snapshot.id == id)
    }

    /// Snapshots of every structure in ascending id order.
    #[must_use]
    pub fn structures(world: &World) -> Vec<StructureSnapshot> {
        world.structures.iter().map(snapshot_structure).collect()
    }

    /// Snapshot of a single structure.
    #[must_use]
    pub fn structure(world: &World, id: StructureId) -> Option<StructureSnapshot> {
        world.structures.get(id).map(snapshot_structure)
    }

    /// Mana currently available to the faction.
    #[must_use]
    pub fn mana(world: &World, faction: Faction) -> u32 {
        world.mana.available(faction)
    }

    /// Authoritative statistics report.
    #[must_use]
    pub fn stats(world: &World) -> MatchStats {
        world.report()
    }

    /// Seed the match was configured with.
    #[must_use]
    pub fn match_seed(world: &World) -> u64 {
        world.match_seed
    }

    /// Simulated time elapsed since configuration.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    fn snapshot_structure(structure: &Structure) -> StructureSnapshot {
        StructureSnapshot {
            id: structure.id(),
            kind: structure.kind(),
            faction: structure.faction(),
            region: structure.region(),
            occupants: structure.occupants(),
            has_room: structure.has_room(),
        }
    }
}
