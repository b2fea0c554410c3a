//! CLI configuration surface.
//!
//! Covers both a single visualised simulation (grid size, wall/obstacle
//! counts, step delay) and a batch sweep over wall/obstacle ranges
//! (`batch_mode`, `quiet`, `num_simulations`, `timeout_seconds`,
//! `output_file`).

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    #[arg(long, default_value_t = 20)]
    pub grid_size: usize,

    #[arg(long, default_value_t = 50)]
    pub num_walls: usize,

    #[arg(long, default_value_t = 10)]
    pub num_obstacles: usize,

    #[arg(long, default_value_t = 50)]
    pub delay_ms: u64,

    #[arg(long, default_value_t = false)]
    pub no_visualization: bool,

    /// Run a batch sweep instead of a single visualised simulation.
    #[arg(long, default_value_t = false)]
    pub batch_mode: bool,

    /// Suppress per-step and per-configuration progress output.
    #[arg(long, default_value_t = false)]
    pub quiet: bool,

    #[arg(long, default_value_t = 10)]
    pub min_walls: usize,

    #[arg(long, default_value_t = 100)]
    pub max_walls: usize,

    #[arg(long, default_value_t = 0)]
    pub min_obstacles: usize,

    #[arg(long, default_value_t = 20)]
    pub max_obstacles: usize,

    /// Number of simulations run per wall/obstacle configuration.
    #[arg(long, default_value_t = 10)]
    pub num_simulations: usize,

    #[arg(long, default_value_t = 300)]
    pub timeout_seconds: u64,

    #[arg(long, default_value = "batch_results.csv")]
    pub output_file: String,
}
