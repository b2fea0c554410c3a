//! CSV-sweeping batch harness.
//!
//! Runs a simulation for every combination of wall and obstacle counts in
//! a configured range, writing one CSV row per run and periodically
//! flushing results and progress to the console.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::simulation::Simulation;

#[derive(Debug, Clone)]
pub struct BatchResult {
    pub simulation_id: usize,
    pub grid_size: usize,
    pub num_walls: usize,
    pub num_obstacles: usize,
    pub success: bool,
    pub total_moves: usize,
    pub replans: usize,
    pub optimal_path_length: usize,
    pub route_efficiency: f64,
    pub execution_time_ms: u64,
}

pub struct BatchSimulation {
    config: Config,
    results: Vec<BatchResult>,
    start_time: Instant,
    batch_size: usize,
    total_results_written: usize,
}

impl BatchSimulation {
    pub fn new(config: Config) -> Self {
        BatchSimulation {
            config,
            results: Vec::new(),
            start_time: Instant::now(),
            batch_size: 100,
            total_results_written: 0,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn run(&mut self) -> Result<(), String> {
        self.initialize_csv_file()?;

        if !self.config.quiet {
            println!("=== BATCH SIMULATION STARTED ===");
            println!("Grid size: {}", self.config.grid_size);
            println!("Walls range: {} to {}", self.config.min_walls, self.config.max_walls);
            println!("Obstacles range: {} to {}", self.config.min_obstacles, self.config.max_obstacles);
            println!("Simulations per configuration: {}", self.config.num_simulations);
            println!("Timeout: {} seconds", self.config.timeout_seconds);
            println!("Output file: {}", self.config.output_file);
            println!();
        }

        let total_configurations = self.count_total_configurations();
        let total_simulations = total_configurations * self.config.num_simulations;
        let timeout_duration = Duration::from_secs(self.config.timeout_seconds);

        let mut configuration_count = 0;
        let mut completed_simulations = 0;
        let mut last_progress_report = Instant::now();
        let progress_interval = Duration::from_secs(10);

        for num_walls in self.config.min_walls..=self.config.max_walls {
            for num_obstacles in self.config.min_obstacles..=self.config.max_obstacles {
                configuration_count += 1;

                if self.start_time.elapsed() > timeout_duration {
                    if !self.config.quiet {
                        println!("Timeout reached after {} configurations", configuration_count - 1);
                    }
                    break;
                }

                if !self.config.quiet {
                    println!(
                        "Configuration {}/{}: {} walls, {} obstacles",
                        configuration_count, total_configurations, num_walls, num_obstacles
                    );
                }

                completed_simulations += self.run_configuration(num_walls, num_obstacles)?;

                if self.results.len() >= self.batch_size {
                    self.flush_results_to_csv()?;
                }

                if last_progress_report.elapsed() > progress_interval {
                    let progress_percentage =
                        (completed_simulations as f64 / total_simulations.max(1) as f64) * 100.0;
                    println!(
                        "Progress: {:.1}% ({}/{}) - Elapsed: {:.1}s",
                        progress_percentage,
                        completed_simulations,
                        total_simulations,
                        self.start_time.elapsed().as_secs_f64()
                    );
                    last_progress_report = Instant::now();
                }
            }

            if self.start_time.elapsed() > timeout_duration {
                break;
            }
        }

        if !self.results.is_empty() {
            self.flush_results_to_csv()?;
        }

        if !self.config.quiet {
            println!("\n=== BATCH SIMULATION COMPLETED ===");
            println!("Results saved to: {}", self.config.output_file);
            println!("Total time: {:.2?}", self.start_time.elapsed());
        }

        Ok(())
    }

    fn count_total_configurations(&self) -> usize {
        let wall_count = (self.config.max_walls - self.config.min_walls) + 1;
        let obstacle_count = (self.config.max_obstacles - self.config.min_obstacles) + 1;
        wall_count * obstacle_count
    }

    fn run_configuration(&mut self, num_walls: usize, num_obstacles: usize) -> Result<usize, String> {
        let mut run_config = self.config.clone();
        run_config.num_walls = num_walls;
        run_config.num_obstacles = num_obstacles;
        run_config.no_visualization = true;
        run_config.quiet = true;

        let timeout_duration = Duration::from_secs(self.config.timeout_seconds);
        let mut completed_count = 0;

        for sim_id in 0..self.config.num_simulations {
            if self.start_time.elapsed() > timeout_duration {
                return Ok(completed_count);
            }

            let simulation_start = Instant::now();
            let batch_result = match Simulation::new(run_config.clone()) {
                Ok(mut simulation) => {
                    let stats = simulation.run();
                    BatchResult {
                        simulation_id: sim_id,
                        grid_size: self.config.grid_size,
                        num_walls,
                        num_obstacles,
                        success: simulation.succeeded(),
                        total_moves: stats.total_moves,
                        replans: stats.replans,
                        optimal_path_length: stats.optimal_path_length,
                        route_efficiency: stats.route_efficiency,
                        execution_time_ms: simulation_start.elapsed().as_millis() as u64,
                    }
                }
                Err(_) => BatchResult {
                    simulation_id: sim_id,
                    grid_size: self.config.grid_size,
                    num_walls,
                    num_obstacles,
                    success: false,
                    total_moves: 0,
                    replans: 0,
                    optimal_path_length: 0,
                    route_efficiency: 0.0,
                    execution_time_ms: simulation_start.elapsed().as_millis() as u64,
                },
            };

            self.results.push(batch_result);
            completed_count += 1;
        }

        if self.results.len() >= self.batch_size {
            self.flush_results_to_csv()?;
        }
        Ok(completed_count)
    }

    fn flush_results_to_csv(&mut self) -> Result<(), String> {
        if self.results.is_empty() {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.config.output_file)
            .map_err(|e| format!("Failed to open output file for appending: {}", e))?;

        for result in &self.results {
            writeln!(
                file,
                "{},{},{},{},{},{},{},{:.6},{}",
                result.simulation_id,
                result.grid_size,
                result.num_walls,
                result.num_obstacles,
                result.success,
                result.total_moves,
                result.replans,
                result.route_efficiency,
                result.execution_time_ms
            )
            .map_err(|e| format!("Failed to write data row: {}", e))?;
        }

        self.total_results_written += self.results.len();
        if !self.config.quiet {
            println!("Flushed {} results to CSV (total: {})", self.results.len(), self.total_results_written);
        }
        self.results.clear();
        Ok(())
    }

    fn initialize_csv_file(&self) -> Result<(), String> {
        let mut file = std::fs::File::create(&self.config.output_file)
            .map_err(|e| format!("Failed to create output file: {}", e))?;

        writeln!(
            file,
            "simulation_id,grid_size,num_walls,num_obstacles,success,total_moves,replans,route_efficiency,execution_time_ms"
        )
        .map_err(|e| format!("Failed to write header: {}", e))?;

        if !self.config.quiet {
            println!("Initialized CSV file: {}", self.config.output_file);
        }
        Ok(())
    }

    pub fn print_summary(&self) {
        if self.results.is_empty() {
            println!("No results to summarize.");
            return;
        }

        println!("\n=== BATCH SIMULATION SUMMARY ===");

        let mut by_config: HashMap<(usize, usize), Vec<&BatchResult>> = HashMap::new();
        for result in &self.results {
            by_config
                .entry((result.num_walls, result.num_obstacles))
                .or_default()
                .push(result);
        }

        for ((num_walls, num_obstacles), results) in by_config {
            let successful = results.iter().filter(|r| r.success).count();
            let total = results.len();
            let success_rate = (successful as f64 / total as f64) * 100.0;

            println!(
                "\n{} walls, {} obstacles: {}/{} successful ({:.1}%)",
                num_walls, num_obstacles, successful, total, success_rate
            );

            if successful > 0 {
                let successful_results: Vec<_> = results.iter().filter(|r| r.success).collect();
                let avg_moves: f64 = successful_results.iter().map(|r| r.total_moves as f64).sum::<f64>()
                    / successful_results.len() as f64;
                let avg_efficiency: f64 = successful_results.iter().map(|r| r.route_efficiency).sum::<f64>()
                    / successful_results.len() as f64;

                println!("  Average moves: {:.1}", avg_moves);
                println!("  Average efficiency: {:.3}", avg_efficiency);
            }
        }
    }
}
