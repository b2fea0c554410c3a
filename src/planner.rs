//! The incremental search engine: D* Lite (final, optimised), as described
//! by Koenig and Likhachev (2002/2005).
//!
//! Reconciles g and rhs estimates over a king-move, `f64`-cost grid using
//! the per-cell averaged cost function below, rather than a per-edge unit
//! cost.

use rustc_hash::FxHashSet;
use std::hash::Hash;

use crate::cell::CellGraph;
use crate::num::{approx_eq, approx_gt, INFINITY, SQRT_2};
use crate::queue::{key_less_than, Key, OpenQueue};
use crate::state::StateStore;

/// Hard cap on `_compute` iterations per call, guarding against divergence
/// on a pathological or inconsistent heuristic rather than spinning forever.
const MAX_STEPS: u64 = 1_000_000;

/// An incremental shortest-path planner over a [`CellGraph`].
///
/// The planner borrows the graph for the duration of each call rather than
/// owning it: `update`/`replan` each take the graph as a parameter instead
/// of storing it.
pub struct DStarLite<Id> {
    state: StateStore<Id>,
    queue: OpenQueue<Id>,
    km: f64,
    start: Id,
    goal: Id,
    last: Id,
    path: Vec<Id>,
}

impl<Id: Copy + Eq + Hash> DStarLite<Id> {
    /// Builds a planner anchored at `start`/`goal` and runs the initial
    /// full search. Equivalent to the paper's `Initialize()` plus an
    /// eager first `ComputeShortestPath()`.
    pub fn new<G: CellGraph<Id = Id>>(graph: &G, start: Id, goal: Id) -> Self {
        let mut planner = DStarLite {
            state: StateStore::new(goal),
            queue: OpenQueue::new(),
            km: 0.0,
            start,
            goal,
            last: start,
            path: Vec::new(),
        };
        planner.initialize(graph);
        planner
    }

    pub fn start(&self) -> Id {
        self.start
    }

    /// Sets the start cell. Does not call `update()` or trigger a replan;
    /// the host must call `replan()` itself to pick up the move.
    pub fn set_start(&mut self, start: Id) {
        self.start = start;
    }

    pub fn goal(&self) -> Id {
        self.goal
    }

    /// The path computed by the most recent successful `replan()`, empty
    /// otherwise.
    pub fn path(&self) -> &[Id] {
        &self.path
    }

    fn initialize<G: CellGraph<Id = Id>>(&mut self, graph: &G) {
        self.km = 0.0;
        self.last = self.start;
        self.queue.clear();
        self.state.reset(self.goal);
        self.path.clear();

        let key = self.key(graph, self.goal);
        self.queue.insert(self.goal, key);
    }

    /// h(a, b): admissible, consistent king-move heuristic. Diagonal
    /// steps cost `sqrt(2)`, orthogonal steps cost `1`.
    fn h<G: CellGraph<Id = Id>>(&self, graph: &G, a: Id, b: Id) -> f64 {
        let dx = (graph.x(a) - graph.x(b)).unsigned_abs() as f64;
        let dy = (graph.y(a) - graph.y(b)).unsigned_abs() as f64;
        (SQRT_2 - 1.0) * dx.min(dy) + dx.max(dy)
    }

    /// CalculateKey(s): `(min(g,rhs) + h(start,s) + km, min(g,rhs))`.
    fn key<G: CellGraph<Id = Id>>(&self, graph: &G, u: Id) -> Key {
        let min_val = self.state.g(u).min(self.state.rhs(u));
        Key::new(min_val + self.h(graph, self.start, u) + self.km, min_val)
    }

    /// c(a, b): the per-cell cost model. Either endpoint being
    /// [`crate::cell::UNWALKABLE`] makes the edge infinite, otherwise the
    /// cost is the scaled average of the two cells' costs.
    fn cost<G: CellGraph<Id = Id>>(&self, graph: &G, a: Id, b: Id) -> f64 {
        let ca = graph.cost(a);
        let cb = graph.cost(b);
        if !ca.is_finite() || !cb.is_finite() {
            return INFINITY;
        }
        let dx = (graph.x(a) - graph.x(b)).abs();
        let dy = (graph.y(a) - graph.y(b)).abs();
        let diagonal = dx + dy > 1;
        let scale = if diagonal { SQRT_2 } else { 1.0 };
        scale * (ca + cb) / 2.0
    }

    /// The one-step lookahead for `u`: min over non-null neighbours `v`
    /// of `cost(u, v) + g(v)`. Infinite if no finite candidate exists.
    fn lookahead<G: CellGraph<Id = Id>>(&self, graph: &G, u: Id) -> f64 {
        graph
            .neighbours(u)
            .into_iter()
            .flatten()
            .map(|v| self.cost(graph, u, v) + self.state.g(v))
            .fold(INFINITY, f64::min)
    }

    /// _update(u): reconciles `u`'s queue membership with its current
    /// local consistency. Never touches g or rhs itself.
    fn update_vertex<G: CellGraph<Id = Id>>(&mut self, graph: &G, u: Id) {
        let inconsistent = !approx_eq(self.state.g(u), self.state.rhs(u));
        let present = self.queue.contains(u);
        match (inconsistent, present) {
            (true, true) | (true, false) => {
                let key = self.key(graph, u);
                self.queue.update(u, key);
            }
            (false, true) => self.queue.remove(u),
            (false, false) => {}
        }
    }

    /// Recomputes rhs(u) from its current neighbours and reconciles its
    /// queue membership. Used by `update()` to bring a changed cell (and
    /// the neighbours whose edges into it just changed) back in sync
    /// before the next `_compute` pass, mirroring the edge-cost-change
    /// handling in the published algorithm's main loop.
    fn refresh_vertex<G: CellGraph<Id = Id>>(&mut self, graph: &G, u: Id) {
        if u != self.goal {
            let rhs = self.lookahead(graph, u);
            self.state.set_rhs(u, rhs);
        }
        self.update_vertex(graph, u);
    }

    /// Host notification that `u`'s traversal cost is now `new_cost`.
    /// A no-op for the goal cell.
    pub fn update<G: CellGraph<Id = Id>>(&mut self, graph: &mut G, u: Id, new_cost: f64) {
        if u == self.goal {
            return;
        }

        self.km += self.h(graph, self.last, self.start);
        self.last = self.start;

        graph.set_cost(u, new_cost);

        self.refresh_vertex(graph, u);
        for v in graph.neighbours(u).into_iter().flatten() {
            self.refresh_vertex(graph, v);
        }
    }

    /// ComputeShortestPath(): the repair loop. Returns `false` only if
    /// `MAX_STEPS` is exceeded without reaching the termination condition.
    fn compute<G: CellGraph<Id = Id>>(&mut self, graph: &G) -> bool {
        let mut steps = 0u64;
        loop {
            if self.queue.is_empty() {
                return true;
            }

            let start_key = self.key(graph, self.start);
            let (k_old, u) = self.queue.peek().expect("checked non-empty above");
            let start_consistent = approx_eq(self.state.rhs(self.start), self.state.g(self.start));
            if !key_less_than(k_old, start_key) && start_consistent {
                return true;
            }

            if steps >= MAX_STEPS {
                return false;
            }
            steps += 1;

            let k_new = self.key(graph, u);
            if key_less_than(k_old, k_new) {
                self.queue.update(u, k_new);
                continue;
            }

            let g_u = self.state.g(u);
            let rhs_u = self.state.rhs(u);

            if approx_gt(g_u, rhs_u) {
                // Overconsistent: commit the improvement and tighten neighbours.
                self.state.set_g(u, rhs_u);
                self.queue.remove(u);

                for v in graph.neighbours(u).into_iter().flatten() {
                    if v != self.goal {
                        let candidate = self.cost(graph, v, u) + self.state.g(u);
                        if candidate < self.state.rhs(v) {
                            self.state.set_rhs(v, candidate);
                        }
                    }
                    self.update_vertex(graph, v);
                }
            } else {
                // Underconsistent: retract the estimate and recompute from scratch.
                self.state.set_g(u, INFINITY);

                if u != self.goal {
                    let rhs = self.lookahead(graph, u);
                    self.state.set_rhs(u, rhs);
                }
                self.update_vertex(graph, u);

                for v in graph.neighbours(u).into_iter().flatten() {
                    self.update_vertex(graph, v);
                }
            }
        }
    }

    /// Runs `_compute` and, on success, extracts the path by greedily
    /// following the minimum-g successor from `start` to `goal`.
    pub fn replan<G: CellGraph<Id = Id>>(&mut self, graph: &G) -> bool {
        self.path.clear();

        if !self.compute(graph) {
            return false;
        }

        if !self.state.g(self.start).is_finite() {
            return false;
        }

        let mut current = self.start;
        let mut visited: FxHashSet<Id> = FxHashSet::default();
        visited.insert(current);
        self.path.push(current);

        while current != self.goal {
            let next = graph
                .neighbours(current)
                .into_iter()
                .flatten()
                .filter_map(|v| {
                    let c = self.cost(graph, current, v);
                    let g_v = self.state.g(v);
                    if c.is_finite() && g_v.is_finite() {
                        Some((v, c + g_v))
                    } else {
                        None
                    }
                })
                .min_by(|a, b| a.1.partial_cmp(&b.1).expect("costs are never NaN"));

            match next {
                Some((v, _)) if !visited.contains(&v) => {
                    self.path.push(v);
                    visited.insert(v);
                    current = v;
                }
                _ => {
                    self.path.clear();
                    return false;
                }
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{GridCellId, GridMap, UNWALKABLE};

    fn id(x: usize, y: usize) -> GridCellId {
        GridCellId::new(x, y)
    }

    #[test]
    fn scenario_1_straight_line() {
        let grid = GridMap::new(5, 1);
        let start = id(0, 0);
        let goal = id(4, 0);
        let mut planner = DStarLite::new(&grid, start, goal);
        assert!(planner.replan(&grid));
        assert_eq!(
            planner.path(),
            &[id(0, 0), id(1, 0), id(2, 0), id(3, 0), id(4, 0)]
        );
    }

    #[test]
    fn scenario_2_diagonal() {
        let grid = GridMap::new(3, 3);
        let start = id(0, 0);
        let goal = id(2, 2);
        let mut planner = DStarLite::new(&grid, start, goal);
        assert!(planner.replan(&grid));
        assert_eq!(planner.path().len(), 3);
        assert_eq!(*planner.path().last().unwrap(), goal);
        for w in planner.path().windows(2) {
            let dx = (w[0].x as i64 - w[1].x as i64).abs();
            let dy = (w[0].y as i64 - w[1].y as i64).abs();
            assert!(dx <= 1 && dy <= 1 && (dx, dy) != (0, 0));
        }
    }

    #[test]
    fn scenario_3_obstacle_insertion() {
        let mut grid = GridMap::new(5, 5);
        let start = id(0, 0);
        let goal = id(4, 4);
        let mut planner = DStarLite::new(&grid, start, goal);
        assert!(planner.replan(&grid));
        let initial_len = planner.path().len();
        assert_eq!(initial_len, 5); // diagonal straight shot, 4 steps + start

        planner.update(&mut grid, id(2, 2), UNWALKABLE);
        assert!(planner.replan(&grid));
        assert!(!planner.path().contains(&id(2, 2)));
        assert!(planner.path().len() >= initial_len);
    }

    #[test]
    fn scenario_4_wall_sealing() {
        let mut grid = GridMap::new(3, 3);
        grid.set_cost(id(0, 1), UNWALKABLE);
        grid.set_cost(id(1, 1), UNWALKABLE);
        grid.set_cost(id(2, 1), UNWALKABLE);
        let start = id(0, 0);
        let goal = id(0, 2);
        let mut planner = DStarLite::new(&grid, start, goal);
        assert!(!planner.replan(&grid));
        assert!(planner.path().is_empty());
    }

    #[test]
    fn scenario_5_opening_a_wall() {
        let mut grid = GridMap::new(3, 3);
        grid.set_cost(id(0, 1), UNWALKABLE);
        grid.set_cost(id(1, 1), UNWALKABLE);
        grid.set_cost(id(2, 1), UNWALKABLE);
        let start = id(0, 0);
        let goal = id(0, 2);
        let mut planner = DStarLite::new(&grid, start, goal);
        assert!(!planner.replan(&grid));

        planner.update(&mut grid, id(1, 1), 1.0);
        assert!(planner.replan(&grid));
        assert!(planner.path().contains(&id(1, 1)));
        assert_eq!(*planner.path().last().unwrap(), goal);
    }

    #[test]
    fn scenario_6_moving_start_reuses_search() {
        let mut grid = GridMap::new(5, 5);
        let start = id(0, 0);
        let goal = id(4, 4);
        let mut planner = DStarLite::new(&grid, start, goal);
        planner.replan(&grid);
        planner.update(&mut grid, id(2, 2), UNWALKABLE);
        assert!(planner.replan(&grid));

        let next_start = planner.path()[1];
        planner.set_start(next_start);
        assert!(planner.replan(&grid));
        assert_eq!(planner.path()[0], next_start);
        assert_eq!(*planner.path().last().unwrap(), goal);
    }

    #[test]
    fn replan_is_idempotent_without_intervening_changes() {
        let grid = GridMap::new(4, 4);
        let mut planner = DStarLite::new(&grid, id(0, 0), id(3, 3));
        let first = planner.replan(&grid);
        let first_path = planner.path().to_vec();
        let second = planner.replan(&grid);
        assert_eq!(first, second);
        assert_eq!(planner.path(), first_path.as_slice());
    }

    #[test]
    fn no_op_cost_update_preserves_path() {
        let mut grid = GridMap::new(4, 4);
        let mut planner = DStarLite::new(&grid, id(0, 0), id(3, 3));
        planner.replan(&grid);
        let before = planner.path().to_vec();

        let cell = id(1, 1);
        let current_cost = grid.cost(cell);
        planner.update(&mut grid, cell, current_cost);
        planner.replan(&grid);

        assert_eq!(planner.path(), before.as_slice());
    }

    #[test]
    fn raising_then_lowering_cost_restores_original_path() {
        let mut grid = GridMap::new(4, 4);
        let mut planner = DStarLite::new(&grid, id(0, 0), id(3, 3));
        planner.replan(&grid);
        let before = planner.path().to_vec();

        let cell = id(1, 2);
        let original_cost = grid.cost(cell);
        planner.update(&mut grid, cell, UNWALKABLE);
        planner.replan(&grid);
        planner.update(&mut grid, cell, original_cost);
        planner.replan(&grid);

        assert_eq!(planner.path(), before.as_slice());
    }

    #[test]
    fn quiescent_state_keeps_goal_rhs_pinned_to_zero() {
        let grid = GridMap::new(4, 4);
        let goal = id(3, 3);
        let mut planner = DStarLite::new(&grid, id(0, 0), goal);
        planner.replan(&grid);
        assert_eq!(planner.state.rhs(goal), 0.0);
    }
}
