use std::time::Duration;

use godhand_core::{Behaviour, Command, Event, Faction, GridPoint, Intervention, UnitKind};
use godhand_system_movement::Movement;
use godhand_system_pathfinding::GridPathfinder;
use godhand_world::{self as world, query, World};

/// Feeds events to the movement system and applies its commands until the
/// command stream runs dry.
fn pump(
    world: &mut World,
    movement: &mut Movement,
    pathfinder: &GridPathfinder,
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

/// First accessible vertex at or after `from` in row-major order, so the
/// scripted spawns never land on scattered flora.
fn accessible_at_or_after(world: &World, from: GridPoint) -> GridPoint {
    let nav = query::nav(world);
    let size = nav.grid_size() as i32;
    for z in from.z()..=size {
        for x in 0..=size {
            if z == from.z() && x < from.x() {
                continue;
            }
            let point = GridPoint::new(x, z);
            if nav.is_accessible(point) {
                return point;
            }
        }
    }
    panic!("no accessible vertex on the grid");
}

fn run_match(seed: u64) -> Vec<Event> {
    let mut world = World::new();
    let mut log = Vec::new();
    world::apply(
        &mut world,
        Command::ConfigureWorld {
            grid_size: 32,
            chunk_tiles: 8,
            water_level: 0,
            seed,
        },
        &mut log,
    );
    let mut movement = Movement::new(query::match_seed(&world));
    let pathfinder = GridPathfinder::new();

    let spawns = [
        (Faction::Red, UnitKind::Brave, GridPoint::new(6, 6)),
        (Faction::Red, UnitKind::Warrior, GridPoint::new(6, 20)),
        (Faction::Blue, UnitKind::Brave, GridPoint::new(26, 6)),
        (Faction::Blue, UnitKind::Warrior, GridPoint::new(26, 20)),
    ];
    let mut setup = Vec::new();
    for (faction, kind, near) in spawns {
        let at = accessible_at_or_after(&world, near);
        world::apply(&mut world, Command::SpawnUnit { faction, kind, at }, &mut setup);
    }
    for event in &setup {
        if let Event::UnitSpawned { unit, kind, .. } = event {
            if *kind == UnitKind::Warrior {
                world::apply(
                    &mut world,
                    Command::SetBehaviour {
                        unit: *unit,
                        behaviour: Behaviour::Battle,
                    },
                    &mut Vec::new(),
                );
            }
        }
    }
    log.extend(pump(&mut world, &mut movement, &pathfinder, setup));

    for step in 0..120u32 {
        match step {
            30 => {
                let mut events = Vec::new();
                world::apply(
                    &mut world,
                    Command::Invoke {
                        faction: Faction::Red,
                        intervention: Intervention::Earthquake { radius: 2 },
                        target: GridPoint::new(16, 12),
                    },
                    &mut events,
                );
                log.extend(pump(&mut world, &mut movement, &pathfinder, events));
            }
            60 => {
                let mut events = Vec::new();
                world::apply(
                    &mut world,
                    Command::Invoke {
                        faction: Faction::Blue,
                        intervention: Intervention::Volcano { radius: 1 },
                        target: GridPoint::new(16, 20),
                    },
                    &mut events,
                );
                log.extend(pump(&mut world, &mut movement, &pathfinder, events));
            }
            _ => {}
        }
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(100),
            },
            &mut events,
        );
        log.extend(pump(&mut world, &mut movement, &pathfinder, events));
    }

    let mut events = Vec::new();
    world::apply(&mut world, Command::RequestStatsRefresh, &mut events);
    log.extend(events);
    log
}

#[test]
fn full_matches_replay_identically() {
    let first = run_match(2024);
    let second = run_match(2024);
    assert_eq!(first.len(), second.len());
    assert_eq!(first, second);
    assert!(
        first
            .iter()
            .any(|event| matches!(event, Event::UnitMoved { .. })),
        "a replayed match should contain movement"
    );
}

#[test]
fn different_seeds_diverge() {
    let first = run_match(2024);
    let second = run_match(2025);
    assert_ne!(first, second);
}
