#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure bootstrap system that prepares the Godhand experience.

use godhand_core::WELCOME_BANNER;
use godhand_world::query::{self, StructureSnapshot, UnitSnapshot};
use godhand_world::{Terrain, World};

/// Produces data required to greet the player.
#[derive(Debug, Default)]
pub struct Bootstrap;

impl Bootstrap {
    /// Derives the banner that should be shown when the experience starts.
    #[must_use]
    pub fn welcome_banner(&self) -> &'static str {
        WELCOME_BANNER
    }

    /// Exposes the terrain required for rendering the height field.
    #[must_use]
    pub fn terrain<'world>(&self, world: &'world World) -> &'world Terrain {
        query::terrain(world)
    }

    /// Exposes the units currently roaming the grid for presentation purposes.
    #[must_use]
    pub fn units(&self, world: &World) -> Vec<UnitSnapshot> {
        query::units(world)
    }

    /// Exposes the structures currently standing for presentation purposes.
    #[must_use]
    pub fn structures(&self, world: &World) -> Vec<StructureSnapshot> {
        query::structures(world)
    }
}

#[cfg(test)]
mod tests {
    use super::Bootstrap;
    use godhand_core::Command;
    use godhand_world::{self as world, World};

    #[test]
    fn the_banner_greets_the_player() {
        let bootstrap = Bootstrap;
        assert_eq!(bootstrap.welcome_banner(), "Welcome to Godhand.");
    }

    #[test]
    fn a_configured_world_exposes_its_terrain() {
        let mut world = World::new();
        world::apply(
            &mut world,
            Command::ConfigureWorld {
                grid_size: 16,
                chunk_tiles: 8,
                water_level: 0,
                seed: 1,
            },
            &mut Vec::new(),
        );
        let bootstrap = Bootstrap;
        assert_eq!(bootstrap.terrain(&world).grid_size(), 16);
        assert!(!bootstrap.structures(&world).is_empty(), "flora is scattered");
        assert!(bootstrap.units(&world).is_empty());
    }
}
