use std::collections::HashMap;
use std::error::Error;
use std::path::PathBuf;

use approx::assert_relative_eq;
use tempfile::tempdir;

use rust_taxi_pooling_sim::reports;
use rust_taxi_pooling_sim::trip_distance;
use rust_taxi_pooling_sim::LatLon;
use rust_taxi_pooling_sim::PoolingConfig;
use rust_taxi_pooling_sim::PoolingSimulator;
use rust_taxi_pooling_sim::TripCategory;


/// Loads an environment's config and points its output at a scratch directory.
fn sim_for_env(env_name: &str, output_dir: PathBuf) -> PoolingSimulator {
    let cfg_path = format!("tests/envs/{}/config.yaml", env_name);
    let mut config = PoolingConfig::from_file(&cfg_path).unwrap();
    config.output_dir = output_dir;
    PoolingSimulator::new(config)
}

#[test]
fn test_two_counties_groupings() {
    let dir = tempdir().unwrap();
    let sim = sim_for_env("two-counties", dir.path().to_path_buf());
    let results = sim.simulate().unwrap();

    let groupings: Vec<(u64, Vec<i64>)> = results.vehicles.iter().map(|vv| {
        (vv.id, vv.get_passengers().iter().map(|pp| pp.get_person_id()).collect())
    }).collect();
    // person 3 walks; person 5 arrives after person 4's vehicle has left
    assert_eq!(groupings, vec![(1, vec![1, 2]), (2, vec![4]), (3, vec![5]), (6, vec![6, 7, 8])]);

    let departures: Vec<u32> = results.vehicles.iter()
                                              .map(|vv| vv.get_departure_time_s())
                                              .collect();
    // the lone vehicle 2 was held until person 5 showed up
    assert_eq!(departures, vec![29100, 30000, 30420, 61800]);

    assert_eq!(results.stats.num_passengers, 8);
    assert_eq!(results.stats.num_skipped, 1);
    assert_eq!(results.stats.num_vehicles_closed, 4);
    assert_eq!(results.trips.len(), 4);
    assert!(results.report_paths.is_empty());
}

#[test]
fn test_two_counties_metrics() {
    let dir = tempdir().unwrap();
    let sim = sim_for_env("two-counties", dir.path().to_path_buf());
    let results = sim.simulate().unwrap();
    let metrics = &results.metrics;

    let short_hop = trip_distance(&LatLon::new(37.50, -122.30), &LatLon::new(37.52, -122.30));
    let bay_trip = trip_distance(&LatLon::new(37.60, -122.40), &LatLon::new(37.70, -122.40));
    let houston_trip = trip_distance(&LatLon::new(29.76, -95.37), &LatLon::new(29.96, -95.37));
    assert_eq!(TripCategory::from_distance(short_hop), TripCategory::Short);
    assert_eq!(TripCategory::from_distance(houston_trip), TripCategory::Normal);

    let county = metrics.get_county_miles()[&6081];
    assert_relative_eq!(county.pmt, 2. * short_hop + 2. * bay_trip, epsilon = 1e-9);
    assert_relative_eq!(county.vmt, short_hop + 2. * bay_trip, epsilon = 1e-9);
    // three riders to the same corner share one leg
    let houston = metrics.get_state_miles()[&48];
    assert_relative_eq!(houston.avo().unwrap(), 3., epsilon = 1e-9);

    assert_eq!(metrics.get_num_vehicles(), 4);
    assert_eq!(metrics.get_num_pooled_passengers(), 7);
    assert_eq!(metrics.get_category_counts(), &[1, 4, 3, 0, 0]);
    assert_eq!(metrics.cumulative_category_counts(), [1, 5, 8, 8, 8]);
    assert_eq!(metrics.get_hours()[8].num_passengers, 4);
    assert_eq!(metrics.get_hours()[17].num_passengers, 3);

    let sd = metrics.get_supply_demand(1).unwrap();
    let net: i64 = sd.sorted_flows().iter().map(|ff| ff.net).sum();
    assert_eq!(net, 0);
    assert_eq!(sd.net_at(rust_taxi_pooling_sim::Coordinate::new(0, 0)), -1);

    let active = metrics.active_vehicle_counts();
    // 17:10 is minute 1030
    assert_eq!(active[1029], 0);
    assert_eq!(active[1030], 1);
}

#[test]
fn test_run_writes_reports() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let out_dir = dir.path().join("out");
    let sim = sim_for_env("two-counties", out_dir.clone());
    let results = sim.run()?;

    assert_eq!(results.report_paths.len(), 14);
    for path in &results.report_paths {
        assert!(path.starts_with(&out_dir));
        assert!(path.exists(), "{:?} was not written", path);
    }
    let trips = reports::read_vehicle_trips(&out_dir.join(reports::VEHICLE_TRIPS_FILE))?;
    assert_eq!(trips, results.trips);

    let mut reader = csv::Reader::from_path(out_dir.join("state_avos.csv"))?;
    let mut state_avos = HashMap::new();
    for result in reader.deserialize() {
        let row: HashMap<String, String> = result?;
        state_avos.insert(row["state_fips"].clone(), row["avo"].clone());
    }
    assert_eq!(state_avos.len(), 2);
    assert_eq!(state_avos["48"], "3.00");
    Ok(())
}

#[test]
fn test_runs_are_deterministic() {
    let dir = tempdir().unwrap();
    let sim = sim_for_env("two-counties", dir.path().to_path_buf());
    let first = sim.simulate().unwrap();
    let second = sim.simulate().unwrap();
    assert_eq!(first.vehicles, second.vehicles);
    assert_eq!(first.trips, second.trips);
    assert_eq!(first.metrics, second.metrics);
}

#[test]
fn test_bad_trip_file_is_reported() {
    let dir = tempdir().unwrap();
    let sim = sim_for_env("bad-trips", dir.path().to_path_buf());
    let err = sim.run().unwrap_err().to_string();
    assert!(err.contains("trips_06081.csv"), "{}", err);
    assert!(err.contains("line 3"), "{}", err);
    assert!(!dir.path().join(reports::VEHICLE_TRIPS_FILE).exists());
}

#[test]
fn test_missing_config_keys() {
    let dir = tempdir().unwrap();
    let cfg_path = dir.path().join("config.yaml");
    std::fs::write(&cfg_path, "output_dir: out\n").unwrap();
    let err = PoolingSimulator::from_cfg(cfg_path.to_str().unwrap()).err().unwrap();
    assert!(err.to_string().contains("trips_dir"), "{}", err);
}

#[test]
fn test_empty_trips_dir() {
    let dir = tempdir().unwrap();
    let mut config = PoolingConfig::default();
    config.trips_dir = dir.path().to_path_buf();
    config.output_dir = dir.path().join("out");
    let results = PoolingSimulator::new(config).run().unwrap();
    assert!(results.vehicles.is_empty());
    assert_eq!(results.metrics.get_avo(), None);
    assert_eq!(results.report_paths.len(), 14);
}
