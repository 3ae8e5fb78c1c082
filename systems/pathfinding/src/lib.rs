#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Grid pathfinding over the terrain vertex lattice.
//!
//! [`GridPathfinder`] is the production implementation of the movement
//! system's planning seam: A* over the 8-connected lattice with octile
//! costs, refusing to cut corners past blocked vertices, and breaking
//! every tie deterministically so identical worlds always yield identical
//! paths.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use godhand_core::{Direction, GridPoint};
use godhand_system_movement::Pathfinder;
use godhand_world::query::NavView;

/// Cost of one orthogonal step.
const STRAIGHT_COST: u32 = 10;

/// Cost of one diagonal step.
const DIAGONAL_COST: u32 = 14;

/// Octile distance between two vertices in step-cost units.
fn octile_distance(from: GridPoint, to: GridPoint) -> u32 {
    let dx = from.x().abs_diff(to.x());
    let dz = from.z().abs_diff(to.z());
    let (long, short) = if dx > dz { (dx, dz) } else { (dz, dx) };
    DIAGONAL_COST * short + STRAIGHT_COST * (long - short)
}

/// Reports whether a unit may step from `from` along `direction`.
///
/// Diagonal steps require both flanking orthogonal vertices to be open, so
/// units never squeeze between two blocked corners.
fn can_step(nav: &NavView<'_>, from: GridPoint, direction: Direction) -> bool {
    let target = from.step(direction);
    if !nav.is_accessible(target) {
        return false;
    }
    if direction.is_diagonal() {
        let (dx, dz) = direction.offsets();
        return nav.is_accessible(from.offset(dx, 0)) && nav.is_accessible(from.offset(0, dz));
    }
    true
}

/// A* planner over the vertex lattice.
#[derive(Clone, Copy, Debug, Default)]
pub struct GridPathfinder;

impl GridPathfinder {
    /// Creates the planner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Pathfinder for GridPathfinder {
    /// Plans the cheapest path from `start` to `goal`, excluding `start`.
    ///
    /// Ties between equally cheap frontier nodes break on the heuristic
    /// first and then on the vertex coordinates, which keeps replays
    /// byte-identical across runs.
    fn plan(
        &self,
        nav: &NavView<'_>,
        start: GridPoint,
        goal: GridPoint,
    ) -> Option<Vec<GridPoint>> {
        if start == goal {
            return Some(Vec::new());
        }
        if !nav.is_accessible(goal) {
            return None;
        }

        let mut frontier: BinaryHeap<Reverse<(u32, u32, GridPoint)>> = BinaryHeap::new();
        let mut best_cost: BTreeMap<GridPoint, u32> = BTreeMap::new();
        let mut came_from: BTreeMap<GridPoint, GridPoint> = BTreeMap::new();

        let _ = best_cost.insert(start, 0);
        frontier.push(Reverse((octile_distance(start, goal), 0, start)));

        while let Some(Reverse((_, _, current))) = frontier.pop() {
            if current == goal {
                return Some(reconstruct(&came_from, start, goal));
            }
            let current_cost = best_cost.get(&current).copied().unwrap_or(u32::MAX);
            for direction in Direction::ALL {
                if !can_step(nav, current, direction) {
                    continue;
                }
                let next = current.step(direction);
                let step_cost = if direction.is_diagonal() {
                    DIAGONAL_COST
                } else {
                    STRAIGHT_COST
                };
                let tentative = current_cost.saturating_add(step_cost);
                if tentative < best_cost.get(&next).copied().unwrap_or(u32::MAX) {
                    let _ = best_cost.insert(next, tentative);
                    let _ = came_from.insert(next, current);
                    let heuristic = octile_distance(next, goal);
                    frontier.push(Reverse((tentative + heuristic, heuristic, next)));
                }
            }
        }
        None
    }

    /// Greedy single step toward `toward`, used for leader pursuit.
    ///
    /// Returns the neighboring vertex that shrinks the octile distance the
    /// most, or `None` when every improving step is blocked.
    fn follow_step(
        &self,
        nav: &NavView<'_>,
        from: GridPoint,
        toward: GridPoint,
    ) -> Option<GridPoint> {
        if from == toward {
            return None;
        }
        let current = octile_distance(from, toward);
        Direction::ALL
            .into_iter()
            .filter(|direction| can_step(nav, from, *direction))
            .map(|direction| from.step(direction))
            .filter(|next| octile_distance(*next, toward) < current)
            .min_by_key(|next| (octile_distance(*next, toward), next.x(), next.z()))
    }
}

fn reconstruct(
    came_from: &BTreeMap<GridPoint, GridPoint>,
    start: GridPoint,
    goal: GridPoint,
) -> Vec<GridPoint> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(previous) = came_from.get(&current) {
        if *previous == start {
            break;
        }
        path.push(*previous);
        current = *previous;
    }
    path.reverse();
    path
}
