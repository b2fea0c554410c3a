//! The agent's position and bounded sensor.
//!
//! `observe()` reports the *set of cost changes* it found rather than
//! silently mutating a `known_obstacles` set, so the host loop can feed
//! that set straight into `DStarLite::update()`.

use rustc_hash::FxHashMap;

use crate::cell::{CellGraph, GridCellId, GridMap};
use crate::num::approx_eq;

/// Default sensor radius (Chebyshev distance): 10.
const DEFAULT_FIELD_OF_VIEW: usize = 10;

pub struct Agent {
    pub position: GridCellId,
    pub field_of_view: usize,
}

impl Agent {
    pub fn new(start: GridCellId) -> Self {
        Agent {
            position: start,
            field_of_view: DEFAULT_FIELD_OF_VIEW,
        }
    }

    /// Scans the field-of-view square around the current position and
    /// reports every cell whose true cost in `world` differs from what's
    /// recorded in `known`. Updates `known` in place so a second call with
    /// no intervening change to `world` reports nothing.
    pub fn observe(&self, world: &GridMap, known: &mut FxHashMap<GridCellId, f64>) -> Vec<(GridCellId, f64)> {
        let fov = self.field_of_view as i64;
        let (cx, cy) = (self.position.x as i64, self.position.y as i64);
        let max_x = world.width() as i64 - 1;
        let max_y = world.height() as i64 - 1;

        let mut changes = Vec::new();
        for x in (cx - fov).max(0)..=(cx + fov).min(max_x) {
            for y in (cy - fov).max(0)..=(cy + fov).min(max_y) {
                let pos = GridCellId::new(x as usize, y as usize);
                let true_cost = world.cost(pos);
                let believed = known.get(&pos).copied().unwrap_or(1.0);

                if !approx_eq(believed, true_cost) {
                    known.insert(pos, true_cost);
                    changes.push((pos, true_cost));
                }
            }
        }
        changes
    }

    pub fn move_to(&mut self, pos: GridCellId) {
        self.position = pos;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_reports_nothing_on_an_empty_grid() {
        let grid = GridMap::new(5, 5);
        let agent = Agent::new(GridCellId::new(2, 2));
        let mut known = FxHashMap::default();
        assert!(agent.observe(&grid, &mut known).is_empty());
    }

    #[test]
    fn observe_reports_a_newly_placed_obstacle_within_view() {
        let mut grid = GridMap::new(5, 5);
        grid.set_cost(GridCellId::new(3, 3), f64::INFINITY);
        let agent = Agent::new(GridCellId::new(2, 2));
        let mut known = FxHashMap::default();
        let changes = agent.observe(&grid, &mut known);
        assert_eq!(changes, vec![(GridCellId::new(3, 3), f64::INFINITY)]);
    }

    #[test]
    fn observe_is_idempotent_without_intervening_changes() {
        let mut grid = GridMap::new(5, 5);
        grid.set_cost(GridCellId::new(3, 3), f64::INFINITY);
        let agent = Agent::new(GridCellId::new(2, 2));
        let mut known = FxHashMap::default();
        agent.observe(&grid, &mut known);
        assert!(agent.observe(&grid, &mut known).is_empty());
    }

    #[test]
    fn observe_ignores_cells_outside_the_field_of_view() {
        let mut grid = GridMap::new(20, 20);
        grid.set_cost(GridCellId::new(19, 19), f64::INFINITY);
        let mut agent = Agent::new(GridCellId::new(0, 0));
        agent.field_of_view = 2;
        let mut known = FxHashMap::default();
        assert!(agent.observe(&grid, &mut known).is_empty());
    }

    #[test]
    fn observe_reports_a_cleared_obstacle() {
        let mut grid = GridMap::new(5, 5);
        let pos = GridCellId::new(3, 3);
        grid.set_cost(pos, f64::INFINITY);
        let agent = Agent::new(GridCellId::new(2, 2));
        let mut known = FxHashMap::default();
        agent.observe(&grid, &mut known);

        grid.set_cost(pos, 1.0);
        let changes = agent.observe(&grid, &mut known);
        assert_eq!(changes, vec![(pos, 1.0)]);
    }
}
