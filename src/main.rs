use rust_taxi_pooling_sim::PoolingSimulator;


fn main() {
    env_logger::init();
    let config_path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("usage: rust_taxi_pooling_sim <config.yaml>");
            std::process::exit(2);
        }
    };

    let sim = match PoolingSimulator::from_cfg(&config_path) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("failed to load config {}: {}", config_path, err);
            std::process::exit(1);
        }
    };
    match sim.run() {
        Ok(results) => {
            println!("pooled {} passengers into {} vehicles",
                     results.stats.num_passengers - results.stats.num_skipped,
                     results.stats.num_vehicles_closed);
            match results.metrics.get_avo() {
                Some(avo) => println!("average vehicle occupancy: {:.2}", avo),
                None => println!("average vehicle occupancy: NaN"),
            }
        }
        Err(err) => {
            eprintln!("simulation failed: {}", err);
            std::process::exit(1);
        }
    }
}
