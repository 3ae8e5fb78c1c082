#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Divine intervention staging.
//!
//! Player input lands here as [`InterventionInput`] requests. The system
//! previews each request against the caller's mana and the grid bounds,
//! holds it until the next simulated instant, and then either emits an
//! [`Command::Invoke`] or drops it with nothing more than the preview the
//! adapter already showed. The authoritative mana check still happens in
//! the world; the preview only exists so adapters can grey out buttons
//! without issuing doomed commands.

use std::collections::VecDeque;

use godhand_core::{Command, Event, Faction, GridPoint, Intervention};
use godhand_world::query::NavView;

/// A player's request to spend mana on an intervention.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InterventionInput {
    /// Faction paying for the intervention.
    pub faction: Faction,
    /// Which intervention to invoke.
    pub intervention: Intervention,
    /// Target vertex.
    pub target: GridPoint,
}

/// What an intervention would cost and whether it could land right now.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InterventionPreview {
    /// Mana the intervention would consume.
    pub cost: u32,
    /// Whether the faction currently holds enough mana.
    pub affordable: bool,
    /// Whether the target vertex lies on the grid.
    pub in_bounds: bool,
}

impl InterventionPreview {
    /// Whether the previewed intervention would be accepted as-is.
    #[must_use]
    pub const fn is_viable(&self) -> bool {
        self.affordable && self.in_bounds
    }
}

/// Pure system that turns staged intervention requests into commands.
#[derive(Debug, Default)]
pub struct Interventions {
    staged: VecDeque<InterventionInput>,
}

impl Interventions {
    /// Creates an empty staging queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a request for the next simulated instant.
    pub fn request(&mut self, input: InterventionInput) {
        self.staged.push_back(input);
    }

    /// Number of requests waiting for the next instant.
    #[must_use]
    pub fn staged(&self) -> usize {
        self.staged.len()
    }

    /// Previews a request without staging it.
    pub fn preview<F>(
        input: InterventionInput,
        nav: &NavView<'_>,
        mana_available: F,
    ) -> InterventionPreview
    where
        F: Fn(Faction) -> u32,
    {
        let cost = input.intervention.mana_cost();
        InterventionPreview {
            cost,
            affordable: mana_available(input.faction) >= cost,
            in_bounds: nav.is_in_bounds(input.target),
        }
    }

    /// Consumes events and releases viable staged requests as commands.
    ///
    /// Requests are only released when time advanced, so a burst of input
    /// between two ticks lands on a single simulated instant in arrival
    /// order. Requests that stopped being viable while queued are dropped.
    pub fn handle<F>(
        &mut self,
        events: &[Event],
        nav: NavView<'_>,
        mana_available: F,
        out: &mut Vec<Command>,
    ) where
        F: Fn(Faction) -> u32,
    {
        let time_advanced = events
            .iter()
            .any(|event| matches!(event, Event::TimeAdvanced { .. }));
        if !time_advanced {
            return;
        }
        while let Some(input) = self.staged.pop_front() {
            let preview = Self::preview(input, &nav, &mana_available);
            if !preview.is_viable() {
                continue;
            }
            out.push(Command::Invoke {
                faction: input.faction,
                intervention: input.intervention,
                target: input.target,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{InterventionInput, Interventions};
    use godhand_core::{Command, Event, Faction, GridPoint, Intervention};
    use godhand_world::{self as world, query, World, STARTING_MANA};
    use std::time::Duration;

    fn configured_world() -> World {
        let mut world = World::new();
        world::apply(
            &mut world,
            Command::ConfigureWorld {
                grid_size: 32,
                chunk_tiles: 8,
                water_level: 0,
                seed: 7,
            },
            &mut Vec::new(),
        );
        world
    }

    fn tick_event() -> Event {
        Event::TimeAdvanced {
            dt: Duration::from_millis(100),
        }
    }

    #[test]
    fn previews_report_cost_and_viability() {
        let world = configured_world();
        let nav = query::nav(&world);
        let input = InterventionInput {
            faction: Faction::Red,
            intervention: Intervention::Earthquake { radius: 2 },
            target: GridPoint::new(16, 16),
        };
        let preview = Interventions::preview(input, &nav, |_| STARTING_MANA);
        assert_eq!(preview.cost, 90);
        assert!(preview.is_viable());

        let broke = Interventions::preview(input, &nav, |_| 89);
        assert!(!broke.affordable);
        assert!(!broke.is_viable());

        let off_grid = Interventions::preview(
            InterventionInput {
                target: GridPoint::new(40, 40),
                ..input
            },
            &nav,
            |_| STARTING_MANA,
        );
        assert!(!off_grid.in_bounds);
    }

    #[test]
    fn staged_requests_wait_for_time_to_advance() {
        let world = configured_world();
        let mut interventions = Interventions::new();
        interventions.request(InterventionInput {
            faction: Faction::Red,
            intervention: Intervention::Mold { raise: true },
            target: GridPoint::new(10, 10),
        });
        let mut commands = Vec::new();
        interventions.handle(&[], query::nav(&world), |_| STARTING_MANA, &mut commands);
        assert!(commands.is_empty());
        assert_eq!(interventions.staged(), 1);

        interventions.handle(
            &[tick_event()],
            query::nav(&world),
            |_| STARTING_MANA,
            &mut commands,
        );
        assert_eq!(
            commands,
            vec![Command::Invoke {
                faction: Faction::Red,
                intervention: Intervention::Mold { raise: true },
                target: GridPoint::new(10, 10),
            }]
        );
        assert_eq!(interventions.staged(), 0);
    }

    #[test]
    fn unviable_requests_are_dropped_without_commands() {
        let world = configured_world();
        let mut interventions = Interventions::new();
        interventions.request(InterventionInput {
            faction: Faction::Blue,
            intervention: Intervention::Flood,
            target: GridPoint::new(10, 10),
        });
        interventions.request(InterventionInput {
            faction: Faction::Blue,
            intervention: Intervention::Mold { raise: false },
            target: GridPoint::new(50, 2),
        });
        let mut commands = Vec::new();
        interventions.handle(&[tick_event()], query::nav(&world), |_| 100, &mut commands);
        assert!(commands.is_empty());
        assert_eq!(interventions.staged(), 0);
    }

    #[test]
    fn released_commands_spend_mana_in_the_world() {
        let mut world = configured_world();
        let mut interventions = Interventions::new();
        interventions.request(InterventionInput {
            faction: Faction::Red,
            intervention: Intervention::Mold { raise: true },
            target: GridPoint::new(12, 12),
        });
        let mut commands = Vec::new();
        interventions.handle(
            &[tick_event()],
            query::nav(&world),
            |faction| query::mana(&world, faction),
            &mut commands,
        );
        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut world, command, &mut events);
        }
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::TerrainModified { .. })));
        assert_eq!(query::mana(&world, Faction::Red), STARTING_MANA - 5);
    }
}
