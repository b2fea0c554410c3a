use clap::Parser;

use incremental_pathfinding::batch_simulation::BatchSimulation;
use incremental_pathfinding::config::Config;
use incremental_pathfinding::simulation::Simulation;

fn main() {
    let config = Config::parse();

    println!("Starting pathfinding simulation...");
    println!("Grid size: {}x{}", config.grid_size, config.grid_size);
    println!("Walls: {}, Obstacles: {}", config.num_walls, config.num_obstacles);

    if config.no_visualization || config.batch_mode {
        println!("Visualization disabled - running in fast mode");
    } else {
        println!("Visualization enabled with {}ms delay", config.delay_ms);
        println!("Press Ctrl+C to stop the simulation");
    }

    if config.quiet {
        println!("Quiet mode enabled - minimal output");
    }
    println!();

    if !config.no_visualization && !config.batch_mode {
        std::thread::sleep(std::time::Duration::from_millis(1000));
    }

    if config.batch_mode {
        let mut batch_sim = BatchSimulation::new(config.clone());
        match batch_sim.run() {
            Ok(()) => {
                if !config.quiet {
                    batch_sim.print_summary();
                }
            }
            Err(e) => {
                eprintln!("Batch simulation failed: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        match Simulation::new(config.clone()) {
            Ok(mut simulation) => {
                let stats = simulation.run();
                println!("\n=== FINAL RESULTS ===");
                println!("{}", stats);
            }
            Err(e) => {
                eprintln!("Failed to start simulation: {}", e);
                println!("Try reducing --num-walls or increasing --grid-size");
                std::process::exit(1);
            }
        }
    }
}
