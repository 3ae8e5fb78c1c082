//! Match configuration loaded from a TOML file.

use std::fs;
use std::path::Path;

use anyhow::Context as _;
use godhand_core::{Behaviour, Faction, Intervention, UnitKind};
use serde::Deserialize;

/// Everything needed to script one headless match.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct MatchConfig {
    /// Number of tiles along each edge of the terrain grid.
    pub grid_size: u32,
    /// Number of tiles along each edge of a terrain chunk.
    pub chunk_tiles: u32,
    /// Initial global water level in height steps.
    pub water_level: i32,
    /// Match seed from which every deterministic stream derives.
    pub seed: u64,
    /// Simulated milliseconds per tick.
    pub tick_millis: u64,
    /// Number of ticks to simulate before reporting.
    pub ticks: u32,
    /// Seconds between breeding litters.
    pub breed_interval_secs: u64,
    /// Units placed before the first tick.
    pub spawns: Vec<SpawnConfig>,
    /// Interventions staged at scripted ticks.
    pub interventions: Vec<InterventionConfig>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            grid_size: 32,
            chunk_tiles: 8,
            water_level: 0,
            seed: 0,
            tick_millis: 100,
            ticks: 300,
            breed_interval_secs: 4,
            spawns: default_spawns(),
            interventions: Vec::new(),
        }
    }
}

impl MatchConfig {
    /// Loads a configuration from the TOML file at `path`.
    pub(crate) fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("could not read match config '{}'", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("could not parse match config '{}'", path.display()))
    }
}

/// A unit placed on the grid before the first tick.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SpawnConfig {
    /// Faction the unit fights for.
    pub faction: Faction,
    /// Kind of unit to place.
    pub kind: UnitKind,
    /// Behaviour the unit adopts after spawning.
    #[serde(default = "default_behaviour")]
    pub behaviour: Behaviour,
    /// Preferred vertex column; the spawn slides to the nearest open vertex.
    pub x: i32,
    /// Preferred vertex row; the spawn slides to the nearest open vertex.
    pub z: i32,
}

/// An intervention staged when the match reaches a scripted tick.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct InterventionConfig {
    /// Tick on which the request is staged.
    pub at_tick: u32,
    /// Faction paying the mana cost.
    pub faction: Faction,
    /// Intervention to invoke.
    pub intervention: Intervention,
    /// Target vertex column.
    pub x: i32,
    /// Target vertex row.
    pub z: i32,
}

fn default_behaviour() -> Behaviour {
    Behaviour::Settle
}

fn default_spawns() -> Vec<SpawnConfig> {
    vec![
        SpawnConfig {
            faction: Faction::Red,
            kind: UnitKind::Brave,
            behaviour: Behaviour::Settle,
            x: 6,
            z: 6,
        },
        SpawnConfig {
            faction: Faction::Blue,
            kind: UnitKind::Brave,
            behaviour: Behaviour::Settle,
            x: 26,
            z: 26,
        },
    ]
}
