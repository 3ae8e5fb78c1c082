use std::time::Duration;

use godhand_core::{
    Behaviour, Command, Event, Faction, GridPoint, GridRect, Intervention, MoveState, StructureId,
    UnitId, UnitKind,
};
use godhand_system_movement::{Movement, Pathfinder};
use godhand_world::query::NavView;
use godhand_world::{self as world, query, World};

/// Straight-line planner for tests; the terrain in these scenarios is open.
struct FakePathfinder;

impl Pathfinder for FakePathfinder {
    fn plan(
        &self,
        _nav: &NavView<'_>,
        start: GridPoint,
        goal: GridPoint,
    ) -> Option<Vec<GridPoint>> {
        let mut steps = Vec::new();
        let mut current = start;
        while current != goal {
            current = current.offset(
                (goal.x() - current.x()).signum(),
                (goal.z() - current.z()).signum(),
            );
            steps.push(current);
        }
        Some(steps)
    }

    fn follow_step(
        &self,
        _nav: &NavView<'_>,
        from: GridPoint,
        toward: GridPoint,
    ) -> Option<GridPoint> {
        if from == toward {
            return None;
        }
        Some(from.offset(
            (toward.x() - from.x()).signum(),
            (toward.z() - from.z()).signum(),
        ))
    }
}

fn configure(world: &mut World, seed: u64) {
    let mut events = Vec::new();
    world::apply(
        world,
        Command::ConfigureWorld {
            grid_size: 32,
            chunk_tiles: 8,
            water_level: 0,
            seed,
        },
        &mut events,
    );
}

/// Finds a vertex with a generous structure-free, flat clearing around it.
fn open_anchor(world: &World) -> GridPoint {
    let nav = query::nav(world);
    for z in 4..28 {
        for x in 4..28 {
            let anchor = GridPoint::new(x, z);
            let clearing = GridRect::from_points(anchor.offset(-3, -3), anchor.offset(4, 4));
            if nav.is_open_block(clearing) {
                return anchor;
            }
        }
    }
    panic!("no open clearing on a fresh grid");
}

/// Finds a vertex with a long structure-free strip east of it, wide enough
/// for a walk past several candidate sites.
fn open_corridor(world: &World) -> GridPoint {
    let nav = query::nav(world);
    for z in 3..28 {
        for x in 3..20 {
            let anchor = GridPoint::new(x, z);
            let strip = GridRect::from_points(anchor.offset(-1, -1), anchor.offset(8, 3));
            if nav.is_open_block(strip) {
                return anchor;
            }
        }
    }
    panic!("no open corridor on a fresh grid");
}

/// Founds a house for `faction` at `anchor` through a throwaway brave.
fn found_house(world: &mut World, faction: Faction, anchor: GridPoint) -> StructureId {
    let (founder, _) = spawn(world, faction, UnitKind::Brave, anchor);
    let mut events = Vec::new();
    world::apply(
        world,
        Command::FoundSettlement {
            unit: founder,
            anchor,
        },
        &mut events,
    );
    let Some(Event::SettlementFounded { structure, .. }) = events.first() else {
        panic!("expected a founding confirmation, found {events:?}");
    };
    *structure
}

fn spawn(world: &mut World, faction: Faction, kind: UnitKind, at: GridPoint) -> (UnitId, Vec<Event>) {
    let mut events = Vec::new();
    world::apply(world, Command::SpawnUnit { faction, kind, at }, &mut events);
    let Some(Event::UnitSpawned { unit, .. }) = events.first() else {
        panic!("expected a spawn confirmation, found {events:?}");
    };
    (*unit, events)
}

/// Feeds events to the system and applies its commands until it settles.
fn pump(
    world: &mut World,
    movement: &mut Movement,
    pathfinder: &FakePathfinder,
    seed_events: Vec<Event>,
) -> Vec<Event> {
    let mut all = seed_events.clone();
    let mut pending = seed_events;
    for _ in 0..8 {
        let units = query::units(world);
        let nav = query::nav(world);
        let mut commands = Vec::new();
        movement.handle(&pending, &units, nav, pathfinder, &mut commands);
        if commands.is_empty() {
            break;
        }
        pending = Vec::new();
        for command in commands {
            world::apply(world, command, &mut pending);
        }
        all.extend(pending.iter().cloned());
    }
    all
}

fn tick(
    world: &mut World,
    movement: &mut Movement,
    pathfinder: &FakePathfinder,
    dt: Duration,
) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, Command::Tick { dt }, &mut events);
    pump(world, movement, pathfinder, events)
}

#[test]
fn battle_units_roam_their_lane_when_no_target_exists() {
    let mut world = World::new();
    configure(&mut world, 21);
    let anchor = open_anchor(&world);
    let (unit, spawn_events) = spawn(&mut world, Faction::Red, UnitKind::Warrior, anchor);
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::SetBehaviour {
            unit,
            behaviour: Behaviour::Battle,
        },
        &mut events,
    );
    let mut movement = Movement::new(query::match_seed(&world));
    let pathfinder = FakePathfinder;
    let _ = pump(&mut world, &mut movement, &pathfinder, spawn_events);

    let mut moved = false;
    for _ in 0..5 {
        let events = tick(&mut world, &mut movement, &pathfinder, Duration::from_millis(100));
        moved |= events
            .iter()
            .any(|event| matches!(event, Event::UnitMoved { unit: id, .. } if *id == unit));
    }
    assert!(moved, "expected the warrior to roam");
    assert_eq!(movement.move_state(unit), Some(MoveState::Free));
    let snapshot = query::unit(&world, unit).expect("warrior alive");
    assert!(
        snapshot.position.x() > anchor.position().x(),
        "red battle lanes advance east"
    );
}

#[test]
fn settlers_found_a_settlement_on_open_land() {
    let mut world = World::new();
    configure(&mut world, 21);
    let anchor = open_anchor(&world);
    let (unit, spawn_events) = spawn(&mut world, Faction::Red, UnitKind::Brave, anchor);
    let mut movement = Movement::new(query::match_seed(&world));
    let pathfinder = FakePathfinder;
    let _ = pump(&mut world, &mut movement, &pathfinder, spawn_events);

    let mut founded = false;
    for _ in 0..50 {
        let events = tick(&mut world, &mut movement, &pathfinder, Duration::from_millis(100));
        if events
            .iter()
            .any(|event| matches!(event, Event::SettlementFounded { founder, .. } if *founder == unit))
        {
            founded = true;
            break;
        }
    }
    assert!(founded, "expected the brave to found a settlement");
    assert!(query::unit(&world, unit).is_none(), "founder is consumed");
    assert_eq!(movement.move_state(unit), None);
}

#[test]
fn terrain_changes_drop_paths_that_cross_the_region() {
    let mut world = World::new();
    configure(&mut world, 21);
    let anchor = open_anchor(&world);
    // Tilt the spawn vertex so the blocks touching it are uneven and the
    // scan locks onto a block one step east instead.
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::Invoke {
            faction: Faction::Red,
            intervention: Intervention::Mold { raise: true },
            target: anchor,
        },
        &mut events,
    );
    let (unit, spawn_events) = spawn(&mut world, Faction::Red, UnitKind::Brave, anchor);
    let mut movement = Movement::new(query::match_seed(&world));
    let pathfinder = FakePathfinder;
    let _ = pump(&mut world, &mut movement, &pathfinder, spawn_events);

    let _ = tick(&mut world, &mut movement, &pathfinder, Duration::from_millis(100));
    assert_eq!(movement.move_state(unit), Some(MoveState::FoundFlatSpace));

    // Sink a vertex on the queued path; the goal invalidates in response.
    let mut change_events = Vec::new();
    world::apply(
        &mut world,
        Command::Invoke {
            faction: Faction::Blue,
            intervention: Intervention::Mold { raise: false },
            target: anchor.offset(1, 0),
        },
        &mut change_events,
    );
    let _ = pump(&mut world, &mut movement, &pathfinder, change_events);
    assert_eq!(movement.move_state(unit), Some(MoveState::Free));
}

#[test]
fn rejected_settlements_revert_the_unit_to_free() {
    let mut world = World::new();
    configure(&mut world, 21);
    let anchor = open_anchor(&world);
    let (unit, spawn_events) = spawn(&mut world, Faction::Red, UnitKind::Brave, anchor);
    let mut movement = Movement::new(query::match_seed(&world));
    let pathfinder = FakePathfinder;
    let _ = pump(&mut world, &mut movement, &pathfinder, spawn_events);

    // Tick until the brave requests a settlement, intercepting the command
    // before it reaches the world.
    let mut found = None;
    'ticks: for _ in 0..60 {
        let mut pending = Vec::new();
        world::apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(100),
            },
            &mut pending,
        );
        for _ in 0..8 {
            let units = query::units(&world);
            let nav = query::nav(&world);
            let mut commands = Vec::new();
            movement.handle(&pending, &units, nav, &pathfinder, &mut commands);
            if commands.is_empty() {
                break;
            }
            pending = Vec::new();
            for command in commands {
                if let Command::FoundSettlement { unit, anchor } = command {
                    found = Some((unit, anchor));
                    break 'ticks;
                }
                world::apply(&mut world, command, &mut pending);
            }
        }
    }
    let (founder, site) = found.expect("the brave should request a settlement");
    assert_eq!(founder, unit);

    // The world changes under the request before it lands.
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::Invoke {
            faction: Faction::Blue,
            intervention: Intervention::Mold { raise: true },
            target: site,
        },
        &mut events,
    );
    events.clear();
    world::apply(
        &mut world,
        Command::FoundSettlement {
            unit: founder,
            anchor: site,
        },
        &mut events,
    );
    assert!(
        events
            .iter()
            .any(|event| matches!(event, Event::SettlementRejected { .. })),
        "expected a rejection, found {events:?}"
    );
    let _ = pump(&mut world, &mut movement, &pathfinder, events);
    assert_eq!(movement.move_state(unit), Some(MoveState::Free));
}

#[test]
fn contact_with_an_enemy_stops_both_units_until_the_fight_ends() {
    let mut world = World::new();
    configure(&mut world, 21);
    let anchor = open_anchor(&world);
    let (warrior, mut setup) = spawn(&mut world, Faction::Red, UnitKind::Warrior, anchor);
    let (brave, brave_events) = spawn(&mut world, Faction::Blue, UnitKind::Brave, anchor);
    setup.extend(brave_events);
    for unit in [warrior, brave] {
        world::apply(
            &mut world,
            Command::SetBehaviour {
                unit,
                behaviour: Behaviour::Battle,
            },
            &mut Vec::new(),
        );
    }
    let mut movement = Movement::new(query::match_seed(&world));
    let pathfinder = FakePathfinder;
    let _ = pump(&mut world, &mut movement, &pathfinder, setup);

    let events = tick(&mut world, &mut movement, &pathfinder, Duration::from_millis(100));
    assert!(
        events
            .iter()
            .any(|event| matches!(event, Event::UnitsEngaged { .. })),
        "expected contact to trigger a fight, found {events:?}"
    );
    assert_eq!(movement.move_state(warrior), Some(MoveState::Stop));
    assert_eq!(movement.move_state(brave), Some(MoveState::Stop));

    // Warrior strength 3 against brave health 6: two combat rounds.
    let mut survived = Vec::new();
    for _ in 0..2 {
        survived = tick(&mut world, &mut movement, &pathfinder, world::ROUND_QUANTUM);
    }
    assert!(survived
        .iter()
        .any(|event| matches!(event, Event::FightEnded { survivor } if *survivor == warrior)));
    assert_eq!(movement.move_state(warrior), Some(MoveState::Free));
    assert_eq!(movement.move_state(brave), None);
}

#[test]
fn mid_path_site_scans_switch_to_a_strictly_closer_house() {
    let mut world = World::new();
    configure(&mut world, 33);
    let anchor = open_corridor(&world);

    // A distant enemy house east of the warrior's spawn.
    let far = found_house(&mut world, Faction::Blue, anchor.offset(6, 0));

    let (warrior, spawn_events) = spawn(&mut world, Faction::Red, UnitKind::Warrior, anchor);
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::SetBehaviour {
            unit: warrior,
            behaviour: Behaviour::Battle,
        },
        &mut events,
    );
    let mut movement = Movement::new(query::match_seed(&world));
    let pathfinder = FakePathfinder;
    let _ = pump(&mut world, &mut movement, &pathfinder, spawn_events);

    // One tick commits the warrior to the distant house.
    let _ = tick(&mut world, &mut movement, &pathfinder, Duration::from_millis(100));

    // A closer enemy house appears beside the committed path.
    let near = found_house(&mut world, Faction::Blue, anchor.offset(3, 1));

    let mut assaulted = None;
    'ticks: for _ in 0..80 {
        let events = tick(&mut world, &mut movement, &pathfinder, Duration::from_millis(100));
        for event in &events {
            if let Event::HouseAssaulted { structure, .. } = event {
                assaulted = Some(*structure);
                break 'ticks;
            }
        }
    }
    assert_eq!(
        assaulted,
        Some(near),
        "expected the closer house to draw the assault instead of {far:?}"
    );
}

#[test]
fn followers_close_on_a_moving_leader() {
    let mut world = World::new();
    configure(&mut world, 21);
    let anchor = open_anchor(&world);
    let (leader, mut setup) = spawn(&mut world, Faction::Red, UnitKind::Warrior, anchor);
    let (follower, follower_events) =
        spawn(&mut world, Faction::Red, UnitKind::Brave, anchor.offset(-3, 0));
    setup.extend(follower_events);
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::SetBehaviour {
            unit: leader,
            behaviour: Behaviour::Battle,
        },
        &mut events,
    );
    let mut movement = Movement::new(query::match_seed(&world));
    let pathfinder = FakePathfinder;
    let _ = pump(&mut world, &mut movement, &pathfinder, setup);
    movement.order_follow(follower, leader);

    for _ in 0..20 {
        let _ = tick(&mut world, &mut movement, &pathfinder, Duration::from_millis(100));
    }
    let leader_at = query::unit(&world, leader)
        .expect("leader alive")
        .position
        .nearest_vertex();
    let follower_at = query::unit(&world, follower)
        .expect("follower alive")
        .position
        .nearest_vertex();
    assert!(
        follower_at.manhattan_distance(leader_at) <= 3,
        "the follower should stay on the roaming leader's heels, found {follower_at:?} vs {leader_at:?}"
    );
    assert!(
        follower_at.x() > anchor.offset(-3, 0).x(),
        "the follower trails the leader eastward"
    );
}

#[test]
fn battle_followers_detach_when_the_leader_engages() {
    let mut world = World::new();
    configure(&mut world, 21);
    let anchor = open_anchor(&world);
    let (leader, mut setup) = spawn(&mut world, Faction::Red, UnitKind::Warrior, anchor);
    let (enemy, enemy_events) =
        spawn(&mut world, Faction::Blue, UnitKind::Warrior, anchor.offset(3, 3));
    let (follower, follower_events) =
        spawn(&mut world, Faction::Red, UnitKind::Warrior, anchor.offset(2, 0));
    setup.extend(enemy_events);
    setup.extend(follower_events);
    for unit in [leader, enemy, follower] {
        world::apply(
            &mut world,
            Command::SetBehaviour {
                unit,
                behaviour: Behaviour::Battle,
            },
            &mut Vec::new(),
        );
    }
    let mut movement = Movement::new(query::match_seed(&world));
    let pathfinder = FakePathfinder;
    let _ = pump(&mut world, &mut movement, &pathfinder, setup);
    movement.order_follow(follower, leader);

    // The leader locks into a fight before anyone moves.
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::EngageUnits {
            first: leader,
            second: enemy,
        },
        &mut events,
    );
    let _ = pump(&mut world, &mut movement, &pathfinder, events);

    for _ in 0..18 {
        let _ = tick(&mut world, &mut movement, &pathfinder, Duration::from_millis(100));
    }
    let follower_at = query::unit(&world, follower)
        .expect("follower alive")
        .position
        .nearest_vertex();
    assert!(
        follower_at.x() > anchor.offset(2, 0).x(),
        "a battle follower resumes its own advance past the fight"
    );
    assert_eq!(movement.move_state(follower), Some(MoveState::Free));
}

#[test]
fn settle_followers_keep_trailing_an_engaged_leader() {
    let mut world = World::new();
    configure(&mut world, 21);
    let anchor = open_anchor(&world);
    let (leader, mut setup) = spawn(&mut world, Faction::Red, UnitKind::Brave, anchor);
    let (enemy, enemy_events) =
        spawn(&mut world, Faction::Blue, UnitKind::Brave, anchor.offset(3, 3));
    let (follower, follower_events) =
        spawn(&mut world, Faction::Red, UnitKind::Brave, anchor.offset(2, 0));
    setup.extend(enemy_events);
    setup.extend(follower_events);
    let mut movement = Movement::new(query::match_seed(&world));
    let pathfinder = FakePathfinder;
    let _ = pump(&mut world, &mut movement, &pathfinder, setup);
    movement.order_follow(follower, leader);

    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::EngageUnits {
            first: leader,
            second: enemy,
        },
        &mut events,
    );
    let _ = pump(&mut world, &mut movement, &pathfinder, events);

    let mut log = Vec::new();
    for _ in 0..25 {
        log.extend(tick(&mut world, &mut movement, &pathfinder, Duration::from_millis(100)));
    }
    assert!(
        !log.iter()
            .any(|event| matches!(event, Event::SettlementFounded { founder, .. } if *founder == follower)),
        "a trailing follower never breaks off to settle"
    );
    let leader_at = query::unit(&world, leader)
        .expect("leader alive")
        .position
        .nearest_vertex();
    let follower_at = query::unit(&world, follower)
        .expect("follower alive")
        .position
        .nearest_vertex();
    assert!(
        follower_at.manhattan_distance(leader_at) <= 1,
        "a settle follower stays on the engaged leader's heels"
    );
}

#[test]
fn identical_seeds_replay_identical_event_logs() {
    let run = || {
        let mut world = World::new();
        configure(&mut world, 77);
        let anchor = open_anchor(&world);
        let (_, mut setup) = spawn(&mut world, Faction::Red, UnitKind::Brave, anchor);
        let (_, blue_events) = spawn(
            &mut world,
            Faction::Blue,
            UnitKind::Brave,
            anchor.offset(2, 2),
        );
        setup.extend(blue_events);
        let mut movement = Movement::new(query::match_seed(&world));
        let pathfinder = FakePathfinder;
        let mut log = pump(&mut world, &mut movement, &pathfinder, setup);
        for _ in 0..30 {
            log.extend(tick(
                &mut world,
                &mut movement,
                &pathfinder,
                Duration::from_millis(100),
            ));
        }
        log
    };
    assert_eq!(run(), run());
}
