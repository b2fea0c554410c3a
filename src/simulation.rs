//! The concrete host loop driving [`DStarLite`] end to end.
//!
//! Generates a random start/goal/wall/obstacle environment, runs a
//! full-information sanity check for an optimal path length, then drives
//! the per-step observe/update/replan loop against the agent's partial
//! knowledge of the grid, with an optional console visualisation and a
//! bounded move budget.

use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use crate::agent::Agent;
use crate::cell::{CellGraph, GridCellId, GridMap, UNWALKABLE};
use crate::config::Config;
use crate::planner::DStarLite;
use crate::statistics::Statistics;

#[derive(Debug, Clone)]
struct ObstacleGroup {
    positions: HashSet<GridCellId>,
    cycles_remaining: usize,
}

/// A randomly generated start/goal/wall layout plus a pre-rolled timeline
/// of obstacle groups that appear and disappear over the run. Generated
/// once so every step of a run (and, for `BatchSimulation`, every run in
/// a configuration) sees a reproducible environment.
#[derive(Debug, Clone)]
pub struct EnvironmentSetup {
    pub grid_size: usize,
    pub start: GridCellId,
    pub goal: GridCellId,
    pub walls: HashSet<GridCellId>,

    obstacle_timeline: Vec<HashSet<GridCellId>>,
    obstacle_cycle_interval: usize,
    obstacle_persistence_cycles: usize,
}

impl EnvironmentSetup {
    pub fn generate(config: &Config, seed: Option<u64>) -> Self {
        let mut rng = if let Some(seed) = seed {
            rand::rngs::StdRng::seed_from_u64(seed)
        } else {
            rand::rngs::StdRng::from_entropy()
        };

        let start = GridCellId::new(
            rng.gen_range(0..config.grid_size.max(1)),
            rng.gen_range(0..config.grid_size.max(1)),
        );
        let goal = GridCellId::new(
            rng.gen_range(0..config.grid_size.max(1)),
            rng.gen_range(0..config.grid_size.max(1)),
        );

        let mut walls = HashSet::new();
        let mut attempts = 0;
        while walls.len() < config.num_walls && attempts < config.num_walls * 3 + 1 {
            let pos = GridCellId::new(
                rng.gen_range(0..config.grid_size),
                rng.gen_range(0..config.grid_size),
            );
            if pos != start && pos != goal {
                walls.insert(pos);
            }
            attempts += 1;
        }

        let obstacle_cycle_interval = 5;
        let obstacle_persistence_cycles = 5;
        let max_cycles = config.grid_size * config.grid_size;
        let num_obstacle_cycles = max_cycles / obstacle_cycle_interval;

        let mut obstacle_timeline = Vec::new();
        for _ in 0..num_obstacle_cycles {
            let mut group = HashSet::new();
            let mut attempts = 0;
            let max_attempts = config.num_obstacles * 10 + 1;
            while group.len() < config.num_obstacles && attempts < max_attempts {
                let pos = GridCellId::new(
                    rng.gen_range(0..config.grid_size),
                    rng.gen_range(0..config.grid_size),
                );
                if pos != start && pos != goal && !walls.contains(&pos) {
                    group.insert(pos);
                }
                attempts += 1;
            }
            obstacle_timeline.push(group);
        }

        EnvironmentSetup {
            grid_size: config.grid_size,
            start,
            goal,
            walls,
            obstacle_timeline,
            obstacle_cycle_interval,
            obstacle_persistence_cycles,
        }
    }

    /// The grid the planner is told about: walls only, no obstacles yet.
    fn create_known_grid(&self) -> GridMap {
        let mut grid = GridMap::new(self.grid_size, self.grid_size);
        for &pos in &self.walls {
            grid.set_cost(pos, UNWALKABLE);
        }
        grid
    }
}

pub struct Simulation {
    world: GridMap,
    known_grid: GridMap,
    known: FxHashMap<GridCellId, f64>,
    agent: Agent,
    planner: DStarLite<GridCellId>,
    config: Config,
    optimal_path_length: usize,
    environment: EnvironmentSetup,
    active_obstacle_groups: Vec<ObstacleGroup>,
    cycles_since_last_obstacle: usize,
    current_obstacle_cycle: usize,
}

impl Simulation {
    pub fn new(config: Config) -> Result<Self, String> {
        Self::new_with_environment(config, None)
    }

    pub fn new_with_environment(
        config: Config,
        environment: Option<EnvironmentSetup>,
    ) -> Result<Self, String> {
        let environment = environment.unwrap_or_else(|| EnvironmentSetup::generate(&config, None));
        let world = environment.create_known_grid();
        let known_grid = environment.create_known_grid();
        let mut known = FxHashMap::default();
        for &pos in &environment.walls {
            known.insert(pos, UNWALKABLE);
        }

        let agent = Agent::new(environment.start);

        let mut sanity_planner = DStarLite::new(&world, environment.start, environment.goal);
        if !sanity_planner.replan(&world) {
            return Err(format!(
                "No valid path exists from start {:?} to goal {:?}! Grid has {} walls.",
                environment.start,
                environment.goal,
                environment.walls.len()
            ));
        }
        let optimal_path_length = sanity_planner.path().len().saturating_sub(1);

        let planner = DStarLite::new(&known_grid, environment.start, environment.goal);

        Ok(Simulation {
            world,
            known_grid,
            known,
            agent,
            planner,
            config,
            optimal_path_length,
            environment,
            active_obstacle_groups: Vec::new(),
            cycles_since_last_obstacle: 0,
            current_obstacle_cycle: 0,
        })
    }

    /// Whether the agent is currently at the goal.
    pub fn succeeded(&self) -> bool {
        self.agent.position == self.environment.goal
    }

    pub fn run(&mut self) -> Statistics {
        let mut stats = Statistics::new(
            self.config.num_walls,
            self.config.num_obstacles,
            self.optimal_path_length,
        );

        let max_iterations = self.environment.grid_size * self.environment.grid_size * 4;
        let mut total_iterations = 0;
        let mut stuck_attempts = 0;
        const MAX_STUCK_ATTEMPTS: usize = 5;

        if !self.planner.replan(&self.known_grid) {
            return stats;
        }
        stats.replans += 1;

        if !self.config.no_visualization {
            self.clear_screen();
            println!("=== PATHFINDING SIMULATION ===");
            println!("Step: 0 | Moves: 0 | Active obstacle groups: 0");
            println!("Optimal path length: {}", self.optimal_path_length);
            self.world.print_grid(self.environment.start, self.environment.goal, Some(self.agent.position));
            thread::sleep(Duration::from_millis(self.config.delay_ms));
        }

        while self.agent.position != self.environment.goal && total_iterations < max_iterations {
            let obstacles_changed = self.update_obstacles_from_timeline();
            let changes = self.agent.observe(&self.world, &mut self.known);

            if !changes.is_empty() || obstacles_changed {
                for (pos, cost) in &changes {
                    self.planner.update(&mut self.known_grid, *pos, *cost);
                }
                if !self.planner.replan(&self.known_grid) {
                    stuck_attempts += 1;
                    stats.replans += 1;
                    if stuck_attempts > MAX_STUCK_ATTEMPTS {
                        if !self.config.no_visualization {
                            println!("FAILURE: agent permanently stuck after {} attempts", MAX_STUCK_ATTEMPTS);
                        }
                        break;
                    }
                    stats.total_moves += 1;
                    total_iterations += 1;
                    continue;
                }
                stats.replans += 1;
                stuck_attempts = 0;
            }

            let next = self.planner.path().get(1).copied();
            match next {
                Some(next) => {
                    self.agent.move_to(next);
                    self.planner.set_start(next);
                    if !self.planner.replan(&self.known_grid) {
                        break;
                    }
                    stats.replans += 1;
                    stats.total_moves += 1;

                    if !self.config.no_visualization {
                        self.clear_screen();
                        println!("=== PATHFINDING SIMULATION ===");
                        println!(
                            "Step: {} | Moves: {} | Active obstacle groups: {}",
                            total_iterations + 1,
                            stats.total_moves,
                            self.active_obstacle_groups.len()
                        );
                        self.world.print_grid(self.environment.start, self.environment.goal, Some(self.agent.position));
                        thread::sleep(Duration::from_millis(self.config.delay_ms));
                    }
                }
                None => break,
            }

            total_iterations += 1;
        }

        self.clear_all_obstacles();

        if !self.config.no_visualization {
            self.clear_screen();
            println!("=== SIMULATION COMPLETE ===");
            if self.agent.position == self.environment.goal {
                println!("SUCCESS: agent reached the goal!");
            } else {
                println!("FAILED: agent did not reach the goal");
            }
            println!("Total steps: {} | Total moves: {}", total_iterations, stats.total_moves);
            self.world.print_grid(self.environment.start, self.environment.goal, Some(self.agent.position));
        }

        stats.calculate_efficiency();
        stats
    }

    fn update_obstacles_from_timeline(&mut self) -> bool {
        let mut obstacles_changed = false;
        self.cycles_since_last_obstacle += 1;

        let mut expired = Vec::new();
        for (i, group) in self.active_obstacle_groups.iter_mut().enumerate() {
            group.cycles_remaining = group.cycles_remaining.saturating_sub(1);
            if group.cycles_remaining == 0 {
                for &pos in &group.positions {
                    self.world.set_cost(pos, 1.0);
                }
                expired.push(i);
                obstacles_changed = true;
            }
        }
        for &i in expired.iter().rev() {
            self.active_obstacle_groups.remove(i);
        }

        if self.cycles_since_last_obstacle >= self.environment.obstacle_cycle_interval
            && self.current_obstacle_cycle < self.environment.obstacle_timeline.len()
        {
            obstacles_changed = self.place_obstacle_group_from_timeline() || obstacles_changed;
            self.current_obstacle_cycle += 1;
            self.cycles_since_last_obstacle = 0;
        }

        obstacles_changed
    }

    fn place_obstacle_group_from_timeline(&mut self) -> bool {
        let candidates = self.environment.obstacle_timeline[self.current_obstacle_cycle].clone();
        let mut group = ObstacleGroup {
            positions: HashSet::new(),
            cycles_remaining: self.environment.obstacle_persistence_cycles,
        };

        for pos in candidates {
            if self.is_valid_obstacle_position(pos) {
                group.positions.insert(pos);
                self.world.set_cost(pos, UNWALKABLE);
            }
        }

        if group.positions.is_empty() {
            false
        } else {
            self.active_obstacle_groups.push(group);
            true
        }
    }

    fn is_valid_obstacle_position(&self, pos: GridCellId) -> bool {
        if pos == self.environment.start || pos == self.environment.goal || pos == self.agent.position {
            return false;
        }
        self.world.cost(pos) != UNWALKABLE
    }

    fn clear_all_obstacles(&mut self) {
        for group in &self.active_obstacle_groups {
            for &pos in &group.positions {
                self.world.set_cost(pos, 1.0);
            }
        }
        self.active_obstacle_groups.clear();
    }

    fn clear_screen(&self) {
        print!("\x1B[2J\x1B[1;1H");
    }
}
