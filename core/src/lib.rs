#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Godhand simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Godhand.";

/// Highest terrain step height the grid will hold.
pub const MAX_HEIGHT: i32 = 8;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Configures the terrain grid and reseeds the world's random streams.
    ConfigureWorld {
        /// Number of tiles along each edge of the square terrain grid.
        grid_size: u32,
        /// Number of tiles along each edge of a terrain chunk.
        chunk_tiles: u32,
        /// Initial global water level expressed in height steps.
        water_level: i32,
        /// Match seed from which every deterministic stream derives.
        seed: u64,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that a new unit enter the world at the provided vertex.
    SpawnUnit {
        /// Faction the unit fights for.
        faction: Faction,
        /// Kind of unit to create.
        kind: UnitKind,
        /// Vertex the unit occupies after spawning.
        at: GridPoint,
    },
    /// Updates a unit's interpolated position as computed by the movement system.
    MoveUnit {
        /// Identifier of the unit being moved.
        unit: UnitId,
        /// Continuous position the unit should occupy after this tick.
        to: WorldPos,
    },
    /// Requests that a unit found a settlement on the 2x2 block at `anchor`.
    FoundSettlement {
        /// Identifier of the founding unit; it is consumed on success.
        unit: UnitId,
        /// North-west vertex of the candidate block.
        anchor: GridPoint,
    },
    /// Requests that a unit enter an existing friendly house.
    EnterHouse {
        /// Identifier of the entering unit; it is consumed on success.
        unit: UnitId,
        /// Identifier of the house being entered.
        structure: StructureId,
    },
    /// Requests that a unit begin assaulting an enemy house.
    AttackHouse {
        /// Identifier of the attacking unit.
        unit: UnitId,
        /// Identifier of the house under assault.
        structure: StructureId,
    },
    /// Reports trigger contact between two units of opposing factions.
    EngageUnits {
        /// One of the colliding units.
        first: UnitId,
        /// The other colliding unit.
        second: UnitId,
    },
    /// Switches a unit between settling and battle behaviour.
    SetBehaviour {
        /// Identifier of the unit to adjust.
        unit: UnitId,
        /// Behaviour the unit should adopt.
        behaviour: Behaviour,
    },
    /// Invokes a divine intervention on behalf of a faction.
    Invoke {
        /// Faction paying the mana cost.
        faction: Faction,
        /// Intervention being invoked.
        intervention: Intervention,
        /// Vertex the intervention centers on.
        target: GridPoint,
    },
    /// Requests that the analytics system publish a fresh stats report.
    RequestStatsRefresh,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a unit entered the world.
    UnitSpawned {
        /// Identifier assigned to the new unit.
        unit: UnitId,
        /// Faction the unit fights for.
        faction: Faction,
        /// Kind of unit that spawned.
        kind: UnitKind,
        /// Vertex the unit occupies.
        at: GridPoint,
    },
    /// Confirms that a unit's position advanced.
    UnitMoved {
        /// Identifier of the unit that moved.
        unit: UnitId,
        /// Continuous position after the move.
        position: WorldPos,
        /// Nearest lattice vertex to the new position.
        vertex: GridPoint,
    },
    /// Reports that a unit left the world permanently.
    UnitDied {
        /// Identifier of the dead unit.
        unit: UnitId,
        /// What killed it.
        cause: DeathCause,
    },
    /// Confirms that two opposing units locked into a fight.
    UnitsEngaged {
        /// One of the fighting units.
        first: UnitId,
        /// The other fighting unit.
        second: UnitId,
    },
    /// Reports that a fight resolved and one unit survived.
    FightEnded {
        /// Identifier of the surviving unit.
        survivor: UnitId,
    },
    /// Confirms that a settlement was founded and its founder consumed.
    SettlementFounded {
        /// Identifier assigned to the new house.
        structure: StructureId,
        /// Faction owning the settlement.
        faction: Faction,
        /// Footprint of the settlement in grid vertices.
        region: GridRect,
        /// Unit consumed to found the settlement.
        founder: UnitId,
    },
    /// Reports that a settlement request was rejected.
    SettlementRejected {
        /// Unit whose request failed.
        unit: UnitId,
        /// Specific reason the request failed.
        reason: SettleError,
    },
    /// Confirms that a unit entered a friendly house and was consumed.
    UnitEnteredHouse {
        /// Identifier of the consumed unit.
        unit: UnitId,
        /// House the unit entered.
        structure: StructureId,
    },
    /// Reports that a house entry request was rejected.
    EntryRejected {
        /// Unit whose request failed.
        unit: UnitId,
        /// House the unit attempted to enter.
        structure: StructureId,
        /// Specific reason the request failed.
        reason: EntryError,
    },
    /// Confirms that a unit began assaulting an enemy house.
    HouseAssaulted {
        /// Identifier of the attacker.
        unit: UnitId,
        /// House under assault.
        structure: StructureId,
    },
    /// Reports that an assault request was rejected.
    AssaultRejected {
        /// Unit whose request failed.
        unit: UnitId,
        /// House the unit attempted to assault.
        structure: StructureId,
        /// Specific reason the request failed.
        reason: AssaultError,
    },
    /// Reports that a structure was removed from the world.
    StructureDestroyed {
        /// Identifier of the destroyed structure.
        structure: StructureId,
        /// Footprint the structure previously occupied.
        region: GridRect,
    },
    /// Reports that terrain heights changed within a bounded region.
    TerrainModified {
        /// Bounding box of every vertex whose height changed.
        region: GridRect,
        /// Chunks whose meshes must be regenerated.
        chunks: Vec<ChunkIndex>,
        /// Intervention responsible for the change.
        cause: Intervention,
    },
    /// Announces that the global water level rose by one step.
    WaterLevelRaised {
        /// Water level after the rise, in height steps.
        level: i32,
    },
    /// Reports that an intervention request was rejected.
    InterventionRejected {
        /// Faction whose request failed.
        faction: Faction,
        /// Intervention that was requested.
        intervention: Intervention,
        /// Specific reason the request failed.
        reason: InterventionError,
    },
    /// Publishes a refreshed analytics report.
    StatsPublished {
        /// The freshly computed report.
        report: MatchStats,
    },
}

/// Unique identifier assigned to a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a new unit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StructureId(u32);

impl StructureId {
    /// Creates a new structure identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Factions competing over the terrain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Faction {
    /// The red tribe.
    Red,
    /// The blue tribe.
    Blue,
}

impl Faction {
    /// Returns the opposing faction.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Red => Self::Blue,
            Self::Blue => Self::Red,
        }
    }
}

/// Kinds of units that roam the terrain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// Ordinary follower that settles and breeds.
    Brave,
    /// Trained fighter biased toward the enemy side.
    Warrior,
}

impl UnitKind {
    /// Health the unit spawns with.
    #[must_use]
    pub const fn max_health(self) -> Health {
        match self {
            Self::Brave => Health::new(6),
            Self::Warrior => Health::new(10),
        }
    }

    /// Damage dealt per fight round.
    #[must_use]
    pub const fn strength(self) -> u32 {
        match self {
            Self::Brave => 1,
            Self::Warrior => 3,
        }
    }

    /// Movement speed expressed in tiles per second.
    #[must_use]
    pub const fn speed(self) -> f32 {
        match self {
            Self::Brave => 1.5,
            Self::Warrior => 1.2,
        }
    }

    /// Mana contributed to the owning faction per accrual round.
    #[must_use]
    pub const fn mana_yield(self) -> u32 {
        match self {
            Self::Brave => 2,
            Self::Warrior => 1,
        }
    }
}

/// Behavioural mode steering a unit's autonomous decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Behaviour {
    /// Roam in search of flat land or houses to join.
    Settle,
    /// Advance toward the enemy side along faction lanes.
    Battle,
}

/// Movement state replicated for every unit.
///
/// The state determines what happens when the unit's current path completes;
/// the movement system owns the transition rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveState {
    /// No destination chosen yet; the unit roams.
    Free,
    /// A free, flat 2x2 block was found; path ends in settlement founding.
    FoundFlatSpace,
    /// An enterable friendly house was found; path ends in entry.
    FoundFriendlyHouse,
    /// An attackable enemy house was found; path ends in assault.
    FoundEnemyHouse,
    /// Movement suspended externally, e.g. while fighting.
    Stop,
}

/// Terminal causes of unit destruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeathCause {
    /// Killed in a fight.
    Slain,
    /// The vertex beneath the unit sank to or below the water level.
    Drowned,
}

/// Wound counter carried by units and houses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Health(u32);

impl Health {
    /// Creates a health value from a raw point count.
    #[must_use]
    pub const fn new(points: u32) -> Self {
        Self(points)
    }

    /// Retrieves the remaining points.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Subtracts damage, saturating at zero.
    #[must_use]
    pub const fn damaged(self, points: u32) -> Self {
        Self(self.0.saturating_sub(points))
    }

    /// Reports whether no points remain.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.0 == 0
    }
}

/// Kinds of structures occupying grid vertices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureKind {
    /// Natural tree; blocks movement.
    Tree,
    /// Natural rock; blocks movement.
    Rock,
    /// Cultivated field; walkable.
    Field,
    /// Swamp patch; walkable but lethal and never settleable.
    Swamp,
    /// Settlement house owned by a faction.
    House,
    /// Remains of a destroyed house; walkable and inert.
    Ruin,
}

impl StructureKind {
    /// Reports whether units may not path through vertices of this structure.
    #[must_use]
    pub const fn blocks_movement(self) -> bool {
        matches!(self, Self::Tree | Self::Rock | Self::House)
    }

    /// Reports whether the structure is a swamp patch.
    #[must_use]
    pub const fn is_swamp(self) -> bool {
        matches!(self, Self::Swamp)
    }

    /// Reports whether the structure is a settlement house.
    #[must_use]
    pub const fn is_house(self) -> bool {
        matches!(self, Self::House)
    }
}

/// Divine interventions available to players.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intervention {
    /// Raises or lowers a single vertex by one step.
    Mold {
        /// True raises the vertex, false lowers it.
        raise: bool,
    },
    /// Flattens a square region to water level plus random rubble.
    Earthquake {
        /// Chebyshev radius of the affected square.
        radius: u32,
    },
    /// Raises a cone of rock centered on the target vertex.
    Volcano {
        /// Chebyshev radius of the cone base.
        radius: u32,
    },
    /// Raises the global water level by one step.
    Flood,
}

impl Intervention {
    /// Mana a faction must spend to invoke this intervention.
    #[must_use]
    pub const fn mana_cost(self) -> u32 {
        match self {
            Self::Mold { .. } => 5,
            Self::Earthquake { radius } => 30 * (radius + 1),
            Self::Volcano { radius } => 60 * (radius + 1),
            Self::Flood => 250,
        }
    }
}

/// Reasons a settlement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettleError {
    /// The requesting unit no longer exists.
    MissingUnit,
    /// The candidate block extends beyond the grid bounds.
    OutOfBounds,
    /// The candidate block is no longer entirely free.
    Occupied,
    /// The candidate block is no longer height-flat.
    Uneven,
}

/// Reasons a house entry request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryError {
    /// The requesting unit no longer exists.
    MissingUnit,
    /// No structure with the provided identifier exists.
    MissingStructure,
    /// The target structure is not a house.
    NotAHouse,
    /// The house belongs to the opposing faction.
    WrongFaction,
    /// The house has no remaining capacity.
    Full,
}

/// Reasons an assault request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssaultError {
    /// The requesting unit no longer exists.
    MissingUnit,
    /// No structure with the provided identifier exists.
    MissingStructure,
    /// The target structure cannot be attacked.
    NotAttackable,
    /// The house belongs to the attacker's own faction.
    SameFaction,
}

/// Reasons an intervention request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterventionError {
    /// The faction's mana pool cannot cover the cost.
    InsufficientMana,
    /// The target vertex lies outside the grid.
    OutOfBounds,
}

/// Vertex on the terrain lattice expressed as signed tile coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPoint {
    x: i32,
    z: i32,
}

impl GridPoint {
    /// Creates a new lattice vertex.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// East-west coordinate of the vertex.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// North-south coordinate of the vertex.
    #[must_use]
    pub const fn z(&self) -> i32 {
        self.z
    }

    /// Returns the vertex displaced by the provided deltas.
    #[must_use]
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }

    /// Returns the adjacent vertex one step along `direction`.
    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        let (dx, dz) = direction.offsets();
        self.offset(dx, dz)
    }

    /// Computes the Chebyshev (square ring) distance between two vertices.
    #[must_use]
    pub const fn chebyshev_distance(self, other: GridPoint) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dz = self.z.abs_diff(other.z);
        if dx > dz {
            dx
        } else {
            dz
        }
    }

    /// Computes the Manhattan distance between two vertices.
    #[must_use]
    pub const fn manhattan_distance(self, other: GridPoint) -> u32 {
        self.x.abs_diff(other.x) + self.z.abs_diff(other.z)
    }

    /// Reports whether the two vertices share a row or column.
    #[must_use]
    pub const fn is_axis_aligned_with(self, other: GridPoint) -> bool {
        self.x == other.x || self.z == other.z
    }

    /// Continuous position of the vertex itself.
    #[must_use]
    pub fn position(self) -> WorldPos {
        WorldPos::new(self.x as f32, self.z as f32)
    }

    /// Continuous midpoint between this vertex and another.
    #[must_use]
    pub fn midpoint(self, other: GridPoint) -> WorldPos {
        WorldPos::new(
            (self.x as f32 + other.x as f32) / 2.0,
            (self.z as f32 + other.z as f32) / 2.0,
        )
    }
}

/// Continuous position expressed in tile units.
///
/// Units interpolate between lattice vertices, so their positions are not
/// grid-snapped; the nearest vertex determines which tile queries apply.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldPos {
    x: f32,
    z: f32,
}

impl WorldPos {
    /// Positional tolerance below which an axis counts as arrived.
    pub const ARRIVAL_TOLERANCE: f32 = 1.0e-3;

    /// Creates a new continuous position.
    #[must_use]
    pub const fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    /// East-west coordinate in tile units.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.x
    }

    /// North-south coordinate in tile units.
    #[must_use]
    pub const fn z(&self) -> f32 {
        self.z
    }

    /// Nearest lattice vertex to this position.
    #[must_use]
    pub fn nearest_vertex(self) -> GridPoint {
        GridPoint::new(self.x.round() as i32, self.z.round() as i32)
    }

    /// Moves toward `target`, clamping each axis to at most `max_delta`.
    #[must_use]
    pub fn stepped_toward(self, target: WorldPos, max_delta: f32) -> Self {
        Self {
            x: self.x + (target.x - self.x).clamp(-max_delta, max_delta),
            z: self.z + (target.z - self.z).clamp(-max_delta, max_delta),
        }
    }

    /// Reports whether both axes lie within the arrival tolerance of `target`.
    #[must_use]
    pub fn has_reached(self, target: WorldPos) -> bool {
        (self.x - target.x).abs() <= Self::ARRIVAL_TOLERANCE
            && (self.z - target.z).abs() <= Self::ARRIVAL_TOLERANCE
    }
}

/// Eight-way compass directions used for roaming and neighbor walks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Toward decreasing z.
    North,
    /// Toward increasing x and decreasing z.
    NorthEast,
    /// Toward increasing x.
    East,
    /// Toward increasing x and z.
    SouthEast,
    /// Toward increasing z.
    South,
    /// Toward decreasing x and increasing z.
    SouthWest,
    /// Toward decreasing x.
    West,
    /// Toward decreasing x and z.
    NorthWest,
}

impl Direction {
    /// Every direction in clockwise ring order starting from north.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Grid deltas for one step along this direction.
    #[must_use]
    pub const fn offsets(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::NorthEast => (1, -1),
            Self::East => (1, 0),
            Self::SouthEast => (1, 1),
            Self::South => (0, 1),
            Self::SouthWest => (-1, 1),
            Self::West => (-1, 0),
            Self::NorthWest => (-1, -1),
        }
    }

    /// Reports whether the direction moves along both axes.
    #[must_use]
    pub const fn is_diagonal(self) -> bool {
        let (dx, dz) = self.offsets();
        dx != 0 && dz != 0
    }

    /// Position of this direction within the clockwise ring.
    #[must_use]
    pub fn ring_index(self) -> usize {
        Self::ALL
            .iter()
            .position(|candidate| *candidate == self)
            .unwrap_or(0)
    }

    /// Direction rotated by `steps` positions around the ring.
    #[must_use]
    pub fn rotated(self, steps: i32) -> Self {
        let index = self.ring_index() as i32 + steps;
        Self::ALL[index.rem_euclid(8) as usize]
    }

    /// Direction pointing the opposite way.
    #[must_use]
    pub fn opposite(self) -> Self {
        self.rotated(4)
    }

    /// Direction mirrored across the north-south axis.
    ///
    /// Used to flip scripted battle lanes between factions.
    #[must_use]
    pub const fn mirrored(self) -> Self {
        match self {
            Self::North => Self::North,
            Self::NorthEast => Self::NorthWest,
            Self::East => Self::West,
            Self::SouthEast => Self::SouthWest,
            Self::South => Self::South,
            Self::SouthWest => Self::SouthEast,
            Self::West => Self::East,
            Self::NorthWest => Self::NorthEast,
        }
    }
}

/// Index of a terrain chunk within the chunk lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkIndex {
    cx: u32,
    cz: u32,
}

impl ChunkIndex {
    /// Creates a new chunk index.
    #[must_use]
    pub const fn new(cx: u32, cz: u32) -> Self {
        Self { cx, cz }
    }

    /// East-west chunk coordinate.
    #[must_use]
    pub const fn cx(&self) -> u32 {
        self.cx
    }

    /// North-south chunk coordinate.
    #[must_use]
    pub const fn cz(&self) -> u32 {
        self.cz
    }
}

/// Axis-aligned inclusive rectangle of lattice vertices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridRect {
    min: GridPoint,
    max: GridPoint,
}

impl GridRect {
    /// Constructs the smallest rectangle containing both vertices.
    #[must_use]
    pub fn from_points(a: GridPoint, b: GridPoint) -> Self {
        Self {
            min: GridPoint::new(a.x().min(b.x()), a.z().min(b.z())),
            max: GridPoint::new(a.x().max(b.x()), a.z().max(b.z())),
        }
    }

    /// Constructs the Chebyshev square of the given radius around a center.
    #[must_use]
    pub fn around(center: GridPoint, radius: u32) -> Self {
        let radius = radius as i32;
        Self {
            min: center.offset(-radius, -radius),
            max: center.offset(radius, radius),
        }
    }

    /// Vertex with the smallest coordinates on both axes.
    #[must_use]
    pub const fn min(&self) -> GridPoint {
        self.min
    }

    /// Vertex with the largest coordinates on both axes.
    #[must_use]
    pub const fn max(&self) -> GridPoint {
        self.max
    }

    /// Smallest rectangle containing both rectangles.
    #[must_use]
    pub fn union(self, other: GridRect) -> Self {
        Self {
            min: GridPoint::new(
                self.min.x().min(other.min.x()),
                self.min.z().min(other.min.z()),
            ),
            max: GridPoint::new(
                self.max.x().max(other.max.x()),
                self.max.z().max(other.max.z()),
            ),
        }
    }

    /// Rectangle grown by `steps` vertices on every side.
    #[must_use]
    pub fn expanded(self, steps: u32) -> Self {
        let steps = steps as i32;
        Self {
            min: self.min.offset(-steps, -steps),
            max: self.max.offset(steps, steps),
        }
    }

    /// Reports whether the vertex lies within the rectangle.
    #[must_use]
    pub const fn contains(&self, point: GridPoint) -> bool {
        point.x() >= self.min.x()
            && point.x() <= self.max.x()
            && point.z() >= self.min.z()
            && point.z() <= self.max.z()
    }

    /// Reports whether the two rectangles share at least one vertex.
    #[must_use]
    pub const fn intersects(&self, other: &GridRect) -> bool {
        self.min.x() <= other.max.x()
            && self.max.x() >= other.min.x()
            && self.min.z() <= other.max.z()
            && self.max.z() >= other.min.z()
    }

    /// Iterates every vertex of the rectangle in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = GridPoint> {
        let (min, max) = (self.min, self.max);
        (min.z()..=max.z()).flat_map(move |z| (min.x()..=max.x()).map(move |x| GridPoint::new(x, z)))
    }
}

/// Aggregated match statistics published by the analytics system.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MatchStats {
    /// Red units currently roaming the terrain.
    pub red_units: u32,
    /// Blue units currently roaming the terrain.
    pub blue_units: u32,
    /// Red houses currently standing.
    pub red_houses: u32,
    /// Blue houses currently standing.
    pub blue_houses: u32,
    /// Units killed in fights since the match began.
    pub units_slain: u32,
    /// Units drowned by terrain changes since the match began.
    pub units_drowned: u32,
    /// Settlements founded since the match began.
    pub settlements_founded: u32,
    /// Interventions successfully invoked since the match began.
    pub interventions_invoked: u32,
    /// Current global water level in height steps.
    pub water_level: i32,
}
