#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic movement system driving every autonomous unit.
//!
//! Each unit carries a movement record with one of five states: `Free`
//! units roam and scan for sites, the three `Found*` states walk a planned
//! path whose end triggers a settlement, entry, or assault command, and
//! `Stop` suspends movement while the world resolves a fight or assault.
//! The system is pure: it consumes world events and read-only views, keeps
//! its own per-unit arena, and emits commands. The world stays free to
//! reject any of them; rejections simply revert the unit to `Free`.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use godhand_core::{
    Behaviour, Command, Direction, Event, Faction, GridPoint, GridRect, MoveState, StructureId,
    UnitId, WorldPos,
};
use godhand_world::query::{NavView, UnitSnapshot};
use godhand_world::seed::derive_indexed_seed;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// How far directional site scans reach, in vertices.
pub const VIEW_DISTANCE: u32 = 8;

/// Distance in tile units below which opposing units lock into a fight.
const ENGAGE_RADIUS: f32 = 0.6;

/// What a candidate 2x2 block offers to a scanning unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SiteClass {
    /// Free, flat, dry land suitable for a new settlement.
    FlatSpace,
    /// A friendly house with room for one more occupant.
    FriendlyHouse(StructureId),
    /// An enemy house that can be assaulted.
    EnemyHouse(StructureId),
}

/// Presentation hint for the unit's current locomotion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimationCue {
    /// The unit advanced this tick.
    Walk,
    /// The unit stood still this tick.
    Idle,
}

/// Path planning seam consumed by the movement system.
pub trait Pathfinder {
    /// Plans a vertex path from `start` to `goal`, excluding `start`.
    ///
    /// `None` means the goal is unreachable; an empty path means the unit
    /// already stands on the goal.
    fn plan(&self, nav: &NavView<'_>, start: GridPoint, goal: GridPoint)
        -> Option<Vec<GridPoint>>;

    /// Picks the next vertex of a single pursuit step toward `toward`.
    fn follow_step(
        &self,
        nav: &NavView<'_>,
        from: GridPoint,
        toward: GridPoint,
    ) -> Option<GridPoint>;
}

/// Footprint a settlement founded at `anchor` would occupy.
#[must_use]
pub fn settlement_region(anchor: GridPoint) -> GridRect {
    GridRect::from_points(anchor, anchor.offset(1, 1))
}

/// Classifies the 2x2 block at `anchor` from `faction`'s point of view.
///
/// Houses dominate: a block touching a friendly house with room classifies
/// as enterable, an enemy house as attackable. Otherwise the block must be
/// flat, dry, and structure-free to count as settleable.
#[must_use]
pub fn classify_block(
    nav: &NavView<'_>,
    faction: Faction,
    anchor: GridPoint,
) -> Option<SiteClass> {
    let region = settlement_region(anchor);
    for point in region.iter() {
        let Some(structure) = nav.structure_at(point) else {
            continue;
        };
        if structure.kind.is_house() {
            return match structure.faction {
                Some(owner) if owner == faction => {
                    structure.has_room.then_some(SiteClass::FriendlyHouse(structure.id))
                }
                Some(_) => Some(SiteClass::EnemyHouse(structure.id)),
                None => None,
            };
        }
    }
    nav.is_open_block(region).then_some(SiteClass::FlatSpace)
}

struct MovementRecord {
    state: MoveState,
    heading: Direction,
    faction: Faction,
    path: VecDeque<WorldPos>,
    goal_anchor: Option<GridPoint>,
    goal_structure: Option<StructureId>,
    following: Option<UnitId>,
    awaiting_reply: bool,
    cue: AnimationCue,
    rng: ChaCha8Rng,
}

impl MovementRecord {
    fn new(faction: Faction, stream_seed: u64) -> Self {
        Self {
            state: MoveState::Free,
            heading: advance_direction(faction),
            faction,
            path: VecDeque::new(),
            goal_anchor: None,
            goal_structure: None,
            following: None,
            awaiting_reply: false,
            cue: AnimationCue::Idle,
            rng: ChaCha8Rng::seed_from_u64(stream_seed),
        }
    }

    /// Drops any plan and returns the unit to roaming.
    fn release(&mut self) {
        self.state = MoveState::Free;
        self.path.clear();
        self.goal_anchor = None;
        self.goal_structure = None;
        self.awaiting_reply = false;
    }

    fn halt(&mut self) {
        self.state = MoveState::Stop;
        self.path.clear();
        self.awaiting_reply = false;
    }
}

/// Direction a faction's battle lanes advance along.
const fn advance_direction(faction: Faction) -> Direction {
    match faction {
        Faction::Red => Direction::East,
        Faction::Blue => Direction::West,
    }
}

/// Pure system that turns world events and views into movement commands.
pub struct Movement {
    records: BTreeMap<UnitId, MovementRecord>,
    match_seed: u64,
}

impl Movement {
    /// Creates the system for a match with the given seed.
    #[must_use]
    pub fn new(match_seed: u64) -> Self {
        Self {
            records: BTreeMap::new(),
            match_seed,
        }
    }

    /// Current movement state of a unit, if the system tracks it.
    #[must_use]
    pub fn move_state(&self, unit: UnitId) -> Option<MoveState> {
        self.records.get(&unit).map(|record| record.state)
    }

    /// Current locomotion hint of a unit, if the system tracks it.
    #[must_use]
    pub fn animation_cue(&self, unit: UnitId) -> Option<AnimationCue> {
        self.records.get(&unit).map(|record| record.cue)
    }

    /// Orders a unit to shadow a leader instead of planning its own paths.
    ///
    /// The follower detaches again when the leader disappears, or when the
    /// leader locks into a fight while the follower is in battle mode.
    pub fn order_follow(&mut self, unit: UnitId, leader: UnitId) {
        if unit == leader {
            return;
        }
        if let Some(record) = self.records.get_mut(&unit) {
            record.release();
            record.following = Some(leader);
        }
    }

    /// Consumes world events and views, emitting commands for this tick.
    ///
    /// Events are absorbed unconditionally; movement itself only advances
    /// when the batch contains a `TimeAdvanced` event. Units are stepped in
    /// ascending id order so replays stay deterministic.
    pub fn handle(
        &mut self,
        events: &[Event],
        units: &[UnitSnapshot],
        nav: NavView<'_>,
        pathfinder: &dyn Pathfinder,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            self.absorb(event);
        }
        let Some(dt) = events.iter().rev().find_map(|event| match event {
            Event::TimeAdvanced { dt } => Some(*dt),
            _ => None,
        }) else {
            return;
        };

        let snapshots: BTreeMap<UnitId, UnitSnapshot> =
            units.iter().map(|snapshot| (snapshot.id, *snapshot)).collect();
        self.records.retain(|id, _| snapshots.contains_key(id));
        propose_engagements(&snapshots, out);

        let ids: Vec<UnitId> = self.records.keys().copied().collect();
        for id in ids {
            let Some(snapshot) = snapshots.get(&id) else {
                continue;
            };
            let Some(record) = self.records.get_mut(&id) else {
                continue;
            };
            step_unit(record, snapshot, &snapshots, &nav, pathfinder, dt, out);
        }
    }

    fn absorb(&mut self, event: &Event) {
        match event {
            Event::UnitSpawned { unit, faction, .. } => {
                let stream_seed = derive_indexed_seed(self.match_seed, "unit.roam", unit.get());
                let _ = self
                    .records
                    .insert(*unit, MovementRecord::new(*faction, stream_seed));
            }
            Event::UnitDied { unit, .. } | Event::UnitEnteredHouse { unit, .. } => {
                let _ = self.records.remove(unit);
            }
            Event::SettlementFounded { founder, .. } => {
                let _ = self.records.remove(founder);
            }
            Event::UnitsEngaged { first, second } => {
                for unit in [first, second] {
                    if let Some(record) = self.records.get_mut(unit) {
                        record.halt();
                    }
                }
            }
            Event::FightEnded { survivor } => {
                if let Some(record) = self.records.get_mut(survivor) {
                    record.release();
                }
            }
            Event::HouseAssaulted { unit, .. } => {
                if let Some(record) = self.records.get_mut(unit) {
                    record.halt();
                }
            }
            Event::SettlementRejected { unit, .. }
            | Event::EntryRejected { unit, .. }
            | Event::AssaultRejected { unit, .. } => {
                if let Some(record) = self.records.get_mut(unit) {
                    record.release();
                }
            }
            Event::StructureDestroyed { structure, .. } => {
                for record in self.records.values_mut() {
                    if record.goal_structure == Some(*structure) {
                        record.release();
                    }
                }
            }
            Event::TerrainModified { region, .. } => {
                for record in self.records.values_mut() {
                    let crossed = record
                        .path
                        .iter()
                        .any(|waypoint| region.contains(waypoint.nearest_vertex()));
                    if crossed {
                        record.release();
                    }
                }
            }
            _ => {}
        }
    }
}

/// Emits fight triggers for opposing units in contact.
fn propose_engagements(snapshots: &BTreeMap<UnitId, UnitSnapshot>, out: &mut Vec<Command>) {
    let list: Vec<&UnitSnapshot> = snapshots.values().collect();
    for (index, first) in list.iter().enumerate() {
        if first.engaged {
            continue;
        }
        for second in &list[index + 1..] {
            if second.engaged || first.faction == second.faction {
                continue;
            }
            let dx = (first.position.x() - second.position.x()).abs();
            let dz = (first.position.z() - second.position.z()).abs();
            if dx.max(dz) <= ENGAGE_RADIUS {
                out.push(Command::EngageUnits {
                    first: first.id,
                    second: second.id,
                });
            }
        }
    }
}

fn step_unit(
    record: &mut MovementRecord,
    snapshot: &UnitSnapshot,
    snapshots: &BTreeMap<UnitId, UnitSnapshot>,
    nav: &NavView<'_>,
    pathfinder: &dyn Pathfinder,
    dt: Duration,
    out: &mut Vec<Command>,
) {
    if snapshot.engaged || record.state == MoveState::Stop || record.awaiting_reply {
        record.cue = AnimationCue::Idle;
        return;
    }

    if let Some(leader) = record.following {
        pursue_leader(record, snapshot, snapshots.get(&leader), nav, pathfinder, dt, out);
        return;
    }

    if record.path.is_empty() {
        plan_next(record, snapshot, nav, pathfinder);
        if record.path.is_empty() && record.state != MoveState::Free {
            // Already standing on the goal.
            arrive(record, snapshot, nav, out);
            record.cue = AnimationCue::Idle;
            return;
        }
    }

    let Some(&target) = record.path.front() else {
        record.cue = AnimationCue::Idle;
        return;
    };
    advance_along_path(record, snapshot, target, nav, pathfinder, dt, out);
}

fn pursue_leader(
    record: &mut MovementRecord,
    snapshot: &UnitSnapshot,
    leader: Option<&UnitSnapshot>,
    nav: &NavView<'_>,
    pathfinder: &dyn Pathfinder,
    dt: Duration,
    out: &mut Vec<Command>,
) {
    let Some(leader) = leader else {
        record.following = None;
        record.cue = AnimationCue::Idle;
        return;
    };
    if leader.engaged && snapshot.behaviour == Behaviour::Battle {
        record.following = None;
        record.cue = AnimationCue::Idle;
        return;
    }
    let step = pathfinder.follow_step(nav, snapshot.vertex, leader.vertex);
    match step {
        Some(next) if next != snapshot.vertex => {
            let speed = snapshot.kind.speed();
            let position = snapshot
                .position
                .stepped_toward(next.position(), speed * dt.as_secs_f32());
            out.push(Command::MoveUnit {
                unit: snapshot.id,
                to: position,
            });
            record.cue = AnimationCue::Walk;
        }
        _ => record.cue = AnimationCue::Idle,
    }
}

fn advance_along_path(
    record: &mut MovementRecord,
    snapshot: &UnitSnapshot,
    target: WorldPos,
    nav: &NavView<'_>,
    pathfinder: &dyn Pathfinder,
    dt: Duration,
    out: &mut Vec<Command>,
) {
    let speed = snapshot.kind.speed();
    let position = snapshot
        .position
        .stepped_toward(target, speed * dt.as_secs_f32());
    out.push(Command::MoveUnit {
        unit: snapshot.id,
        to: position,
    });
    record.cue = AnimationCue::Walk;

    if !position.has_reached(target) {
        return;
    }
    let _ = record.path.pop_front();
    let vertex = target.nearest_vertex();
    let on_vertex = target.has_reached(vertex.position());
    if on_vertex && !goal_still_valid(record, nav) {
        record.release();
        return;
    }
    if record.path.is_empty() {
        arrive(record, snapshot, nav, out);
        return;
    }
    if on_vertex {
        retarget_if_closer(record, snapshot.behaviour, vertex, nav, pathfinder);
    }
}

/// Vertex the committed goal occupies, for distance comparisons.
fn goal_vertex(record: &MovementRecord, nav: &NavView<'_>) -> Option<GridPoint> {
    match record.state {
        MoveState::FoundFlatSpace => record.goal_anchor,
        MoveState::FoundFriendlyHouse | MoveState::FoundEnemyHouse => record
            .goal_structure
            .and_then(|id| lookup_house(nav, id))
            .map(|house| house.region.min()),
        MoveState::Free | MoveState::Stop => None,
    }
}

/// Re-runs the site scan on unguided vertex arrivals and switches to a
/// strictly closer qualifying hit. The committed goal survives when the
/// scan finds nothing better or the closer site turns out unreachable.
fn retarget_if_closer(
    record: &mut MovementRecord,
    behaviour: Behaviour,
    vertex: GridPoint,
    nav: &NavView<'_>,
    pathfinder: &dyn Pathfinder,
) {
    let Some(committed) = goal_vertex(record, nav) else {
        return;
    };
    let Some((site, anchor)) =
        search_for_site(nav, record.faction, behaviour, vertex, record.heading)
    else {
        return;
    };
    if vertex.manhattan_distance(anchor) >= vertex.manhattan_distance(committed) {
        return;
    }
    let _ = adopt_site(record, vertex, nav, pathfinder, site, anchor);
}

/// Re-validates the goal on vertex arrivals; stale goals drop the path.
fn goal_still_valid(record: &MovementRecord, nav: &NavView<'_>) -> bool {
    match record.state {
        MoveState::FoundFlatSpace => record
            .goal_anchor
            .is_some_and(|anchor| nav.is_open_block(settlement_region(anchor))),
        MoveState::FoundFriendlyHouse => record.goal_structure.is_some_and(|id| {
            lookup_house(nav, id).is_some_and(|house| {
                house.faction == Some(record.faction) && house.has_room
            })
        }),
        MoveState::FoundEnemyHouse => record.goal_structure.is_some_and(|id| {
            lookup_house(nav, id)
                .is_some_and(|house| house.faction.is_some_and(|owner| owner != record.faction))
        }),
        MoveState::Free | MoveState::Stop => true,
    }
}

fn lookup_house(
    nav: &NavView<'_>,
    id: StructureId,
) -> Option<godhand_world::query::StructureSnapshot> {
    nav.structure_by_id(id)
}

/// Terminal action once the planned path is exhausted.
fn arrive(
    record: &mut MovementRecord,
    snapshot: &UnitSnapshot,
    nav: &NavView<'_>,
    out: &mut Vec<Command>,
) {
    match record.state {
        MoveState::Free | MoveState::Stop => {}
        MoveState::FoundFlatSpace => {
            let Some(anchor) = record.goal_anchor else {
                record.release();
                return;
            };
            if nav.is_open_block(settlement_region(anchor)) {
                out.push(Command::FoundSettlement {
                    unit: snapshot.id,
                    anchor,
                });
                record.awaiting_reply = true;
            } else {
                record.release();
            }
        }
        MoveState::FoundFriendlyHouse => {
            let Some(structure) = record.goal_structure else {
                record.release();
                return;
            };
            out.push(Command::EnterHouse {
                unit: snapshot.id,
                structure,
            });
            record.awaiting_reply = true;
        }
        MoveState::FoundEnemyHouse => {
            let Some(structure) = record.goal_structure else {
                record.release();
                return;
            };
            out.push(Command::AttackHouse {
                unit: snapshot.id,
                structure,
            });
            record.awaiting_reply = true;
        }
    }
}

/// Scans for a site and plans toward it, or queues one roam step.
fn plan_next(
    record: &mut MovementRecord,
    snapshot: &UnitSnapshot,
    nav: &NavView<'_>,
    pathfinder: &dyn Pathfinder,
) {
    if record.state != MoveState::Free {
        record.release();
    }
    if let Some((site, anchor)) = search_for_site(
        nav,
        record.faction,
        snapshot.behaviour,
        snapshot.vertex,
        record.heading,
    ) {
        if adopt_site(record, snapshot.vertex, nav, pathfinder, site, anchor) {
            return;
        }
        record.release();
    }
    roam_step(record, snapshot, nav);
}

/// Locks onto a classified site; false when no path to it exists.
fn adopt_site(
    record: &mut MovementRecord,
    from: GridPoint,
    nav: &NavView<'_>,
    pathfinder: &dyn Pathfinder,
    site: SiteClass,
    anchor: GridPoint,
) -> bool {
    let goal = match site {
        SiteClass::FlatSpace => anchor,
        SiteClass::FriendlyHouse(id) | SiteClass::EnemyHouse(id) => {
            let Some(door) = nearest_door(nav, id, from) else {
                return false;
            };
            door
        }
    };
    let Some(steps) = pathfinder.plan(nav, from, goal) else {
        return false;
    };
    record.path = waypoints_for(from, &steps);
    match site {
        SiteClass::FlatSpace => {
            record.state = MoveState::FoundFlatSpace;
            record.goal_anchor = Some(anchor);
            record.goal_structure = None;
        }
        SiteClass::FriendlyHouse(id) => {
            record.state = MoveState::FoundFriendlyHouse;
            record.goal_structure = Some(id);
            record.goal_anchor = None;
        }
        SiteClass::EnemyHouse(id) => {
            record.state = MoveState::FoundEnemyHouse;
            record.goal_structure = Some(id);
            record.goal_anchor = None;
        }
    }
    true
}

/// Closest accessible vertex on the ring around a house's footprint.
fn nearest_door(nav: &NavView<'_>, house: StructureId, from: GridPoint) -> Option<GridPoint> {
    let region = lookup_house(nav, house)?.region;
    region
        .expanded(1)
        .iter()
        .filter(|point| !region.contains(*point))
        .filter(|point| nav.is_accessible(*point))
        .min_by_key(|point| (point.manhattan_distance(from), point.x(), point.z()))
}

/// Reports whether a unit in the given behavioural mode wants the site.
///
/// Settlers take anything; fighters only care about enemy houses.
const fn site_matches(behaviour: Behaviour, site: SiteClass) -> bool {
    match behaviour {
        Behaviour::Settle => true,
        Behaviour::Battle => matches!(site, SiteClass::EnemyHouse(_)),
    }
}

/// Finds the nearest interesting block: the four blocks touching the
/// unit's vertex first, then scans fanned around the heading out to
/// [`VIEW_DISTANCE`]. The first hit wins.
fn search_for_site(
    nav: &NavView<'_>,
    faction: Faction,
    behaviour: Behaviour,
    vertex: GridPoint,
    heading: Direction,
) -> Option<(SiteClass, GridPoint)> {
    for (dx, dz) in [(-1, -1), (0, -1), (-1, 0), (0, 0)] {
        let anchor = vertex.offset(dx, dz);
        if let Some(site) = classify_block(nav, faction, anchor) {
            if site_matches(behaviour, site) {
                return Some((site, anchor));
            }
        }
    }
    for distance in 1..=VIEW_DISTANCE as i32 {
        for direction in [heading, heading.rotated(-1), heading.rotated(1)] {
            let (dx, dz) = direction.offsets();
            let anchor = vertex.offset(dx * distance, dz * distance);
            if let Some(site) = classify_block(nav, faction, anchor) {
                if site_matches(behaviour, site) {
                    return Some((site, anchor));
                }
            }
        }
    }
    None
}

/// Queues one roam step along a freshly chosen heading.
fn roam_step(record: &mut MovementRecord, snapshot: &UnitSnapshot, nav: &NavView<'_>) {
    let Some(direction) = choose_roam_direction(record, snapshot, nav) else {
        record.cue = AnimationCue::Idle;
        return;
    };
    record.heading = direction;
    let next = snapshot.vertex.step(direction);
    record.path = waypoints_for(snapshot.vertex, &[next]);
}

/// Picks a roam direction from the first non-empty preference tier.
fn choose_roam_direction(
    record: &mut MovementRecord,
    snapshot: &UnitSnapshot,
    nav: &NavView<'_>,
) -> Option<Direction> {
    let passable = |direction: Direction| {
        let target = snapshot.vertex.step(direction);
        if !nav.is_accessible(target) {
            return false;
        }
        if direction.is_diagonal() {
            // No squeezing between two blocked corners.
            let (dx, dz) = direction.offsets();
            return nav.is_accessible(snapshot.vertex.offset(dx, 0))
                && nav.is_accessible(snapshot.vertex.offset(0, dz));
        }
        true
    };
    for tier in preference_tiers(snapshot.behaviour, record.faction, record.heading) {
        let open: Vec<Direction> = tier.into_iter().filter(|d| passable(*d)).collect();
        if !open.is_empty() {
            let index = record.rng.gen_range(0..open.len());
            return Some(open[index]);
        }
    }
    None
}

/// Direction preference tiers for one roam decision.
///
/// Battle mode biases toward the faction's advance lane and only reverses
/// as a last resort; settle mode meanders around the current heading.
fn preference_tiers(
    behaviour: Behaviour,
    faction: Faction,
    heading: Direction,
) -> Vec<Vec<Direction>> {
    match behaviour {
        Behaviour::Battle => {
            let lane = advance_direction(faction);
            vec![
                vec![lane, lane.rotated(-1), lane.rotated(1)],
                vec![lane.rotated(-2), lane.rotated(2)],
                vec![lane.rotated(-3), lane.rotated(3), lane.opposite()],
            ]
        }
        Behaviour::Settle => vec![
            vec![heading, heading.rotated(-1), heading.rotated(1)],
            vec![heading.rotated(-2), heading.rotated(2)],
            vec![heading.rotated(-3), heading.rotated(3)],
            vec![heading.opposite()],
        ],
    }
}

/// Expands a vertex path into continuous waypoints.
///
/// Diagonal legs split into two half-steps through the midpoint so units
/// visibly cut the corner instead of teleporting across it.
fn waypoints_for(start: GridPoint, steps: &[GridPoint]) -> VecDeque<WorldPos> {
    let mut waypoints = VecDeque::new();
    let mut previous = start;
    for &next in steps {
        let dx = next.x() - previous.x();
        let dz = next.z() - previous.z();
        if dx != 0 && dz != 0 {
            waypoints.push_back(previous.midpoint(next));
        }
        waypoints.push_back(next.position());
        previous = next;
    }
    waypoints
}
