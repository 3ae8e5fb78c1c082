#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs headless Godhand matches.

mod config;
mod scenario_transfer;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use godhand_core::{Command, Event, GridPoint, MatchStats};
use godhand_system_analytics::Analytics;
use godhand_system_bootstrap::Bootstrap;
use godhand_system_interventions::{InterventionInput, Interventions};
use godhand_system_movement::Movement;
use godhand_system_pathfinding::GridPathfinder;
use godhand_system_spawning::{Config as SpawningConfig, Spawning};
use godhand_world::{self as world, query, World};

use config::MatchConfig;
use scenario_transfer::{ScenarioSnapshot, ScenarioSpawn};

/// Headless match runner for the Godhand simulation.
#[derive(Debug, Parser)]
#[command(name = "godhand", version)]
struct Cli {
    /// Path to a TOML match configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scenario transfer string overriding the configured grid and spawns.
    #[arg(long)]
    scenario: Option<String>,

    /// Print the configured setup as a scenario transfer string and exit.
    #[arg(long)]
    export_scenario: bool,

    /// Override the configured match seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Override the configured tick count.
    #[arg(long)]
    ticks: Option<u32>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => MatchConfig::load(path)?,
        None => MatchConfig::default(),
    };
    if let Some(scenario) = &cli.scenario {
        apply_scenario(&mut config, ScenarioSnapshot::decode(scenario)?);
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(ticks) = cli.ticks {
        config.ticks = ticks;
    }

    if cli.export_scenario {
        println!("{}", snapshot_of(&config).encode());
        return Ok(());
    }

    let report = run_match(&config);
    print_report(&report);
    Ok(())
}

fn apply_scenario(config: &mut MatchConfig, scenario: ScenarioSnapshot) {
    config.grid_size = scenario.grid_size;
    config.water_level = scenario.water_level;
    config.seed = scenario.seed;
    config.spawns = scenario
        .spawns
        .into_iter()
        .map(|spawn| config::SpawnConfig {
            faction: spawn.faction,
            kind: spawn.kind,
            behaviour: spawn.behaviour,
            x: spawn.x,
            z: spawn.z,
        })
        .collect();
}

fn snapshot_of(config: &MatchConfig) -> ScenarioSnapshot {
    ScenarioSnapshot {
        grid_size: config.grid_size,
        water_level: config.water_level,
        seed: config.seed,
        spawns: config
            .spawns
            .iter()
            .map(|spawn| ScenarioSpawn {
                faction: spawn.faction,
                kind: spawn.kind,
                behaviour: spawn.behaviour,
                x: spawn.x,
                z: spawn.z,
            })
            .collect(),
    }
}

/// First accessible vertex at or after the preferred point in row-major
/// order, so scripted spawns never land on scattered flora.
fn accessible_at_or_after(world: &World, preferred: GridPoint) -> Option<GridPoint> {
    let nav = query::nav(world);
    let size = nav.grid_size() as i32;
    for z in preferred.z().max(0)..=size {
        for x in 0..=size {
            if z == preferred.z() && x < preferred.x() {
                continue;
            }
            let point = GridPoint::new(x, z);
            if nav.is_accessible(point) {
                return Some(point);
            }
        }
    }
    None
}

struct Systems {
    movement: Movement,
    pathfinder: GridPathfinder,
    spawning: Spawning,
    interventions: Interventions,
    analytics: Analytics,
}

/// Feeds an instant's events through every system and applies the commands
/// they emit, repeating until the command stream runs dry.
fn pump(world: &mut World, systems: &mut Systems, seed_events: Vec<Event>) {
    let mut pending = seed_events;
    for _ in 0..8 {
        let mut commands = Vec::new();
        {
            let units = query::units(world);
            let structures = query::structures(world);
            systems.movement.handle(
                &pending,
                &units,
                query::nav(world),
                &systems.pathfinder,
                &mut commands,
            );
            systems
                .spawning
                .handle(&pending, &structures, query::nav(world), &mut commands);
            systems.interventions.handle(
                &pending,
                query::nav(world),
                |faction| query::mana(world, faction),
                &mut commands,
            );
            systems.analytics.handle(&pending, &mut commands);
        }
        if commands.is_empty() {
            break;
        }
        pending = Vec::new();
        for command in commands {
            world::apply(world, command, &mut pending);
        }
    }
}

fn run_match(config: &MatchConfig) -> MatchStats {
    let bootstrap = Bootstrap;
    println!("{}", bootstrap.welcome_banner());

    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::ConfigureWorld {
            grid_size: config.grid_size,
            chunk_tiles: config.chunk_tiles,
            water_level: config.water_level,
            seed: config.seed,
        },
        &mut events,
    );

    let mut systems = Systems {
        movement: Movement::new(query::match_seed(&world)),
        pathfinder: GridPathfinder::new(),
        spawning: Spawning::new(SpawningConfig::new(
            Duration::from_secs(config.breed_interval_secs),
            query::match_seed(&world),
        )),
        interventions: Interventions::new(),
        analytics: Analytics::new(),
    };

    for spawn in &config.spawns {
        let preferred = GridPoint::new(spawn.x, spawn.z);
        let Some(at) = accessible_at_or_after(&world, preferred) else {
            eprintln!("no open vertex for a spawn near {preferred:?}; skipping");
            continue;
        };
        world::apply(
            &mut world,
            Command::SpawnUnit {
                faction: spawn.faction,
                kind: spawn.kind,
                at,
            },
            &mut events,
        );
        if let Some(Event::UnitSpawned { unit, .. }) = events.last().cloned() {
            world::apply(
                &mut world,
                Command::SetBehaviour {
                    unit,
                    behaviour: spawn.behaviour,
                },
                &mut events,
            );
        }
    }
    pump(&mut world, &mut systems, events);

    let dt = Duration::from_millis(config.tick_millis);
    for tick in 0..config.ticks {
        for scripted in &config.interventions {
            if scripted.at_tick == tick {
                systems.interventions.request(InterventionInput {
                    faction: scripted.faction,
                    intervention: scripted.intervention,
                    target: GridPoint::new(scripted.x, scripted.z),
                });
            }
        }
        let mut events = Vec::new();
        world::apply(&mut world, Command::Tick { dt }, &mut events);
        pump(&mut world, &mut systems, events);
    }

    let mut events = Vec::new();
    world::apply(&mut world, Command::RequestStatsRefresh, &mut events);
    systems.analytics.handle(&events, &mut Vec::new());
    systems.analytics.report()
}

fn print_report(report: &MatchStats) {
    println!("red units:      {}", report.red_units);
    println!("blue units:     {}", report.blue_units);
    println!("red houses:     {}", report.red_houses);
    println!("blue houses:    {}", report.blue_houses);
    println!("units slain:    {}", report.units_slain);
    println!("units drowned:  {}", report.units_drowned);
    println!("settlements:    {}", report.settlements_founded);
    println!("interventions:  {}", report.interventions_invoked);
    println!("water level:    {}", report.water_level);
}
