#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic breeding system: occupied houses raise new followers.

use std::time::Duration;

use godhand_core::{Command, Event, GridPoint, UnitKind};
use godhand_world::query::{NavView, StructureSnapshot};

const RNG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;
const RNG_INCREMENT: u64 = 1;

/// Configuration parameters required to construct the breeding system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    breed_interval: Duration,
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided cadence and seed.
    #[must_use]
    pub const fn new(breed_interval: Duration, rng_seed: u64) -> Self {
        Self {
            breed_interval,
            rng_seed,
        }
    }
}

/// Pure system that emits spawn commands on a fixed breeding cadence.
///
/// Every elapsed interval, each standing house with at least one occupant
/// raises one `Brave` at a doorstep vertex chosen from the system's own
/// random stream. Houses are visited in ascending id order so replays pick
/// identical doorsteps.
#[derive(Debug)]
pub struct Spawning {
    breed_interval: Duration,
    accumulator: Duration,
    rng_state: u64,
}

impl Spawning {
    /// Creates a new breeding system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            breed_interval: config.breed_interval,
            accumulator: Duration::ZERO,
            rng_state: config.rng_seed,
        }
    }

    /// Consumes events and immutable views to emit spawn commands.
    pub fn handle(
        &mut self,
        events: &[Event],
        structures: &[StructureSnapshot],
        nav: NavView<'_>,
        out: &mut Vec<Command>,
    ) {
        if self.breed_interval.is_zero() {
            return;
        }

        let mut accumulated = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                accumulated = accumulated.saturating_add(*dt);
            }
        }
        if accumulated.is_zero() {
            return;
        }

        self.accumulator = self.accumulator.saturating_add(accumulated);
        let litters = self.resolve_litters();
        for _ in 0..litters {
            self.breed(structures, &nav, out);
        }
    }

    fn resolve_litters(&mut self) -> usize {
        let mut litters = 0;
        while self.accumulator >= self.breed_interval {
            self.accumulator -= self.breed_interval;
            litters += 1;
        }
        litters
    }

    fn breed(
        &mut self,
        structures: &[StructureSnapshot],
        nav: &NavView<'_>,
        out: &mut Vec<Command>,
    ) {
        for house in structures {
            if !house.kind.is_house() || house.occupants == 0 {
                continue;
            }
            let Some(faction) = house.faction else {
                continue;
            };
            let doorsteps: Vec<GridPoint> = house
                .region
                .expanded(1)
                .iter()
                .filter(|point| !house.region.contains(*point))
                .filter(|point| nav.is_accessible(*point))
                .collect();
            if doorsteps.is_empty() {
                continue;
            }
            let value = self.advance_rng();
            let at = doorsteps[(value % doorsteps.len() as u64) as usize];
            out.push(Command::SpawnUnit {
                faction,
                kind: UnitKind::Brave,
                at,
            });
        }
    }

    fn advance_rng(&mut self) -> u64 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(RNG_MULTIPLIER)
            .wrapping_add(RNG_INCREMENT);
        self.rng_state
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, Spawning};
    use godhand_core::{Command, Event, Faction, GridPoint, GridRect, UnitKind};
    use godhand_world::{self as world, query, World};
    use std::time::Duration;

    fn world_with_house() -> (World, GridPoint) {
        let mut world = World::new();
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::ConfigureWorld {
                grid_size: 32,
                chunk_tiles: 8,
                water_level: 0,
                seed: 9,
            },
            &mut events,
        );
        let nav = query::nav(&world);
        let mut anchor = None;
        'search: for z in 2..30 {
            for x in 2..30 {
                let candidate = GridPoint::new(x, z);
                let clearing =
                    GridRect::from_points(candidate.offset(-2, -2), candidate.offset(3, 3));
                if nav.is_open_block(clearing) {
                    anchor = Some(candidate);
                    break 'search;
                }
            }
        }
        let anchor = anchor.expect("no open block on a fresh grid");
        events.clear();
        world::apply(
            &mut world,
            Command::SpawnUnit {
                faction: Faction::Red,
                kind: UnitKind::Brave,
                at: anchor,
            },
            &mut events,
        );
        let Some(Event::UnitSpawned { unit, .. }) = events.first().cloned() else {
            panic!("expected a spawn confirmation");
        };
        events.clear();
        world::apply(
            &mut world,
            Command::FoundSettlement { unit, anchor },
            &mut events,
        );
        assert!(matches!(events.first(), Some(Event::SettlementFounded { .. })));
        (world, anchor)
    }

    #[test]
    fn nothing_breeds_before_the_interval_elapses() {
        let (world, _) = world_with_house();
        let mut spawning = Spawning::new(Config::new(Duration::from_secs(4), 9));
        let mut commands = Vec::new();
        spawning.handle(
            &[Event::TimeAdvanced {
                dt: Duration::from_secs(1),
            }],
            &query::structures(&world),
            query::nav(&world),
            &mut commands,
        );
        assert!(commands.is_empty());
    }

    #[test]
    fn occupied_houses_breed_braves_at_their_doorstep() {
        let (world, anchor) = world_with_house();
        let mut spawning = Spawning::new(Config::new(Duration::from_secs(4), 9));
        let mut commands = Vec::new();
        spawning.handle(
            &[Event::TimeAdvanced {
                dt: Duration::from_secs(4),
            }],
            &query::structures(&world),
            query::nav(&world),
            &mut commands,
        );
        let Some(Command::SpawnUnit { faction, kind, at }) = commands.first() else {
            panic!("expected a breeding spawn, found {commands:?}");
        };
        assert_eq!(*faction, Faction::Red);
        assert_eq!(*kind, UnitKind::Brave);
        let region = GridRect::from_points(anchor, anchor.offset(1, 1));
        assert!(region.expanded(1).contains(*at));
        assert!(!region.contains(*at));
    }

    #[test]
    fn breeding_picks_the_same_doorsteps_for_the_same_seed() {
        let (world, _) = world_with_house();
        let run = || {
            let mut spawning = Spawning::new(Config::new(Duration::from_secs(2), 41));
            let mut commands = Vec::new();
            for _ in 0..4 {
                spawning.handle(
                    &[Event::TimeAdvanced {
                        dt: Duration::from_secs(2),
                    }],
                    &query::structures(&world),
                    query::nav(&world),
                    &mut commands,
                );
            }
            commands
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn a_zero_interval_disables_breeding() {
        let (world, _) = world_with_house();
        let mut spawning = Spawning::new(Config::new(Duration::ZERO, 9));
        let mut commands = Vec::new();
        spawning.handle(
            &[Event::TimeAdvanced {
                dt: Duration::from_secs(10),
            }],
            &query::structures(&world),
            query::nav(&world),
            &mut commands,
        );
        assert!(commands.is_empty());
    }
}
