#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Match analytics.
//!
//! The system folds the event stream into a running [`MatchStats`] replica
//! so adapters always have a report to draw, even between authoritative
//! refreshes. Death and destruction events carry no faction, so the system
//! remembers which faction each live unit and standing house belongs to.
//! Whenever the replica changed during an instant in which time advanced,
//! the system asks the world for an authoritative recount and adopts the
//! published report wholesale, squashing any drift in the replica.

use std::collections::BTreeMap;

use godhand_core::{Command, Event, Faction, MatchStats, StructureId, UnitId};

/// Pure system that maintains a live statistics report for adapters.
#[derive(Debug, Default)]
pub struct Analytics {
    report: MatchStats,
    unit_factions: BTreeMap<UnitId, Faction>,
    house_factions: BTreeMap<StructureId, Faction>,
    dirty: bool,
}

impl Analytics {
    /// Creates an analytics system with an all-zero report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent statistics report.
    #[must_use]
    pub const fn report(&self) -> MatchStats {
        self.report
    }

    /// Consumes events, updates the replica, and requests recounts.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        let mut time_advanced = false;
        for event in events {
            match event {
                Event::TimeAdvanced { .. } => time_advanced = true,
                _ => self.fold(event),
            }
        }
        if time_advanced && self.dirty {
            out.push(Command::RequestStatsRefresh);
        }
    }

    fn fold(&mut self, event: &Event) {
        match event {
            Event::UnitSpawned { unit, faction, .. } => {
                let _ = self.unit_factions.insert(*unit, *faction);
                *self.unit_tally(*faction) += 1;
                self.dirty = true;
            }
            Event::UnitDied { unit, cause } => {
                if let Some(faction) = self.unit_factions.remove(unit) {
                    *self.unit_tally(faction) = self.unit_tally(faction).saturating_sub(1);
                }
                match cause {
                    godhand_core::DeathCause::Slain => self.report.units_slain += 1,
                    godhand_core::DeathCause::Drowned => self.report.units_drowned += 1,
                }
                self.dirty = true;
            }
            Event::SettlementFounded {
                structure,
                faction,
                founder,
                ..
            } => {
                let _ = self.house_factions.insert(*structure, *faction);
                *self.house_tally(*faction) += 1;
                self.report.settlements_founded += 1;
                if self.unit_factions.remove(founder).is_some() {
                    *self.unit_tally(*faction) = self.unit_tally(*faction).saturating_sub(1);
                }
                self.dirty = true;
            }
            Event::UnitEnteredHouse { unit, .. } => {
                if let Some(faction) = self.unit_factions.remove(unit) {
                    *self.unit_tally(faction) = self.unit_tally(faction).saturating_sub(1);
                }
                self.dirty = true;
            }
            Event::StructureDestroyed { structure, .. } => {
                if let Some(faction) = self.house_factions.remove(structure) {
                    *self.house_tally(faction) = self.house_tally(faction).saturating_sub(1);
                }
                self.dirty = true;
            }
            Event::TerrainModified { .. } => {
                self.report.interventions_invoked += 1;
                self.dirty = true;
            }
            Event::WaterLevelRaised { level } => {
                self.report.water_level = *level;
                self.dirty = true;
            }
            Event::StatsPublished { report } => {
                self.report = *report;
                self.dirty = false;
            }
            _ => {}
        }
    }

    fn unit_tally(&mut self, faction: Faction) -> &mut u32 {
        match faction {
            Faction::Red => &mut self.report.red_units,
            Faction::Blue => &mut self.report.blue_units,
        }
    }

    fn house_tally(&mut self, faction: Faction) -> &mut u32 {
        match faction {
            Faction::Red => &mut self.report.red_houses,
            Faction::Blue => &mut self.report.blue_houses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Analytics;
    use godhand_core::{
        Command, DeathCause, Event, Faction, GridPoint, GridRect, Intervention, MatchStats,
        StructureId, UnitId, UnitKind,
    };
    use std::time::Duration;

    fn spawned(id: u32, faction: Faction) -> Event {
        Event::UnitSpawned {
            unit: UnitId::new(id),
            faction,
            kind: UnitKind::Brave,
            at: GridPoint::new(4, 4),
        }
    }

    fn tick() -> Event {
        Event::TimeAdvanced {
            dt: Duration::from_millis(100),
        }
    }

    #[test]
    fn the_replica_tracks_spawns_and_deaths_per_faction() {
        let mut analytics = Analytics::new();
        analytics.handle(
            &[
                spawned(1, Faction::Red),
                spawned(2, Faction::Red),
                spawned(3, Faction::Blue),
                Event::UnitDied {
                    unit: UnitId::new(2),
                    cause: DeathCause::Slain,
                },
            ],
            &mut Vec::new(),
        );
        let report = analytics.report();
        assert_eq!(report.red_units, 1);
        assert_eq!(report.blue_units, 1);
        assert_eq!(report.units_slain, 1);
        assert_eq!(report.units_drowned, 0);
    }

    #[test]
    fn founding_consumes_the_founder_and_raises_a_house() {
        let mut analytics = Analytics::new();
        let region = GridRect::from_points(GridPoint::new(4, 4), GridPoint::new(5, 5));
        analytics.handle(
            &[
                spawned(1, Faction::Blue),
                Event::SettlementFounded {
                    structure: StructureId::new(1),
                    faction: Faction::Blue,
                    region,
                    founder: UnitId::new(1),
                },
            ],
            &mut Vec::new(),
        );
        let report = analytics.report();
        assert_eq!(report.blue_units, 0);
        assert_eq!(report.blue_houses, 1);
        assert_eq!(report.settlements_founded, 1);

        analytics.handle(
            &[Event::StructureDestroyed {
                structure: StructureId::new(1),
                region,
            }],
            &mut Vec::new(),
        );
        assert_eq!(analytics.report().blue_houses, 0);
    }

    #[test]
    fn changes_request_a_recount_once_time_advances() {
        let mut analytics = Analytics::new();
        let mut commands = Vec::new();
        analytics.handle(&[spawned(1, Faction::Red)], &mut commands);
        assert!(commands.is_empty(), "no recount before time advances");

        analytics.handle(&[tick()], &mut commands);
        assert_eq!(commands, vec![Command::RequestStatsRefresh]);

        commands.clear();
        analytics.handle(
            &[Event::StatsPublished {
                report: analytics.report(),
            }],
            &mut commands,
        );
        analytics.handle(&[tick()], &mut commands);
        assert!(commands.is_empty(), "a clean replica stays quiet");
    }

    #[test]
    fn published_reports_replace_the_replica() {
        let mut analytics = Analytics::new();
        analytics.handle(
            &[
                spawned(1, Faction::Red),
                Event::TerrainModified {
                    region: GridRect::from_points(GridPoint::new(0, 0), GridPoint::new(2, 2)),
                    chunks: Vec::new(),
                    cause: Intervention::Mold { raise: true },
                },
            ],
            &mut Vec::new(),
        );
        let authoritative = MatchStats {
            red_units: 7,
            water_level: 2,
            ..MatchStats::default()
        };
        analytics.handle(
            &[Event::StatsPublished {
                report: authoritative,
            }],
            &mut Vec::new(),
        );
        assert_eq!(analytics.report(), authoritative);
    }

    #[test]
    fn the_replica_matches_the_world_recount() {
        use godhand_world::{self as world, query, World};

        let mut world = World::new();
        let mut analytics = Analytics::new();
        let mut log = Vec::new();
        world::apply(
            &mut world,
            Command::ConfigureWorld {
                grid_size: 32,
                chunk_tiles: 8,
                water_level: 0,
                seed: 77,
            },
            &mut log,
        );
        let nav = query::nav(&world);
        let mut at = GridPoint::new(2, 2);
        'search: for z in 2..30 {
            for x in 2..30 {
                if nav.is_accessible(GridPoint::new(x, z)) {
                    at = GridPoint::new(x, z);
                    break 'search;
                }
            }
        }
        world::apply(
            &mut world,
            Command::SpawnUnit {
                faction: Faction::Red,
                kind: UnitKind::Warrior,
                at,
            },
            &mut log,
        );
        world::apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(100),
            },
            &mut log,
        );

        let mut commands = Vec::new();
        analytics.handle(&log, &mut commands);
        assert_eq!(commands, vec![Command::RequestStatsRefresh]);
        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut world, command, &mut events);
        }
        analytics.handle(&events, &mut Vec::new());
        assert_eq!(analytics.report(), query::stats(&world));
    }
}
