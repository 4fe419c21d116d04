use std::error::Error;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use super::config::PoolingConfig;
use super::config_utils;
use super::error::PoolingError;
use super::metrics::MetricsAggregator;
use super::passengers::{Passenger, TripRecord};
use super::pooling::{PoolingEngine, PoolingStats};
use super::reports;
use super::vehicles::{Vehicle, VehicleTrip};

const PROGRESS_INTERVAL: usize = 10000;

/// Everything a batch run produced.
#[derive(Debug)]
pub struct SimResults {
    pub vehicles: Vec<Vehicle>,
    pub trips: Vec<VehicleTrip>,
    pub metrics: MetricsAggregator,
    pub stats: PoolingStats,
    pub report_paths: Vec<PathBuf>,
}

// the outcome of pooling one trip file
struct StreamResults {
    vehicles: Vec<Vehicle>,
    metrics: MetricsAggregator,
    stats: PoolingStats,
}

/// Pools every trip file in a directory and aggregates the resulting vehicles.
pub struct PoolingSimulator {
    config: PoolingConfig,
}

impl PoolingSimulator {
    pub fn new(config: PoolingConfig) -> PoolingSimulator {
        PoolingSimulator { config }
    }

    pub fn from_cfg(config_path: &str) -> Result<PoolingSimulator, Box<dyn Error>> {
        Ok(PoolingSimulator::new(PoolingConfig::from_file(config_path)?))
    }

    pub fn get_config(&self) -> &PoolingConfig {
        &self.config
    }

    /// Pools one ordered stream of trips. Vehicle ids start at `first_vehicle_id`.
    fn pool_stream(&self, name: &str, records: Vec<TripRecord>, first_vehicle_id: u64)
                   -> Result<StreamResults, PoolingError> {
        let mut engine = PoolingEngine::with_first_vehicle_id(&self.config, first_vehicle_id);
        let mut metrics = MetricsAggregator::new(self.config.average_speed_mph);
        let mut vehicles: Vec<Vehicle> = vec![];
        for (ii, record) in records.into_iter().enumerate() {
            let passenger = Passenger::new(record, &self.config);
            metrics.record_passenger(&passenger);
            engine.handle_passenger(passenger, &mut vehicles)?;
            if (ii + 1) % PROGRESS_INTERVAL == 0 {
                log::debug!("{}: handled {} passengers", name, ii + 1);
            }
        }
        let stats = engine.finish(&mut vehicles)?;
        for vehicle in &vehicles {
            metrics.record_vehicle(vehicle);
        }
        log::info!("{}: {} passengers in {} vehicles", name,
                   stats.num_passengers - stats.num_skipped, stats.num_vehicles_closed);
        Ok(StreamResults { vehicles, metrics, stats })
    }

    /// Pools several streams in parallel and merges them in the order given.
    ///
    /// Each stream reserves one vehicle id per passenger, so ids are unique across streams and
    /// increase in stream order, though not contiguously.
    pub fn pool_streams(&self, streams: Vec<(String, Vec<TripRecord>)>)
                        -> Result<(Vec<Vehicle>, MetricsAggregator, PoolingStats), PoolingError> {
        let mut first_ids = Vec::with_capacity(streams.len());
        let mut next_id = 1;
        for (_, records) in &streams {
            first_ids.push(next_id);
            next_id += records.len() as u64;
        }

        let results = streams.into_par_iter()
                             .zip(first_ids.into_par_iter())
                             .map(|((name, records), first_id)| {
                                 self.pool_stream(&name, records, first_id)
                             })
                             .collect::<Result<Vec<StreamResults>, PoolingError>>()?;

        let mut vehicles = vec![];
        let mut metrics = MetricsAggregator::new(self.config.average_speed_mph);
        let mut stats = PoolingStats::default();
        for result in results {
            metrics.merge(&result.metrics);
            stats.num_passengers += result.stats.num_passengers;
            stats.num_skipped += result.stats.num_skipped;
            stats.num_vehicles_closed += result.stats.num_vehicles_closed;
            vehicles.extend(result.vehicles);
        }
        Ok((vehicles, metrics, stats))
    }

    /// Reads and pools every trip file without writing anything.
    pub fn simulate(&self) -> Result<SimResults, Box<dyn Error>> {
        let trip_paths = config_utils::csv_files_in_dir(&self.config.trips_dir)?;
        if trip_paths.is_empty() {
            log::warn!("no trip files found in {}", self.config.trips_dir.display());
        }

        let mut streams = vec![];
        for path in &trip_paths {
            let records = TripRecord::all_from_csv(path)
                .map_err(|err| format!("{}: {}", path.display(), err))?;
            log::debug!("read {} trips from {}", records.len(), path.display());
            streams.push((stream_name(path), records));
        }

        let (vehicles, metrics, stats) = self.pool_streams(streams)?;
        let trips = vehicles.iter()
                            .filter_map(|vv| vv.to_trip(self.config.average_speed_mph))
                            .collect();
        match metrics.get_avo() {
            Some(avo) => log::info!("regional average vehicle occupancy: {:.2}", avo),
            None => log::info!("no vehicle miles driven"),
        }
        Ok(SimResults { vehicles, trips, metrics, stats, report_paths: vec![] })
    }

    /// Pools every trip file and writes all reports to the output directory.
    pub fn run(&self) -> Result<SimResults, Box<dyn Error>> {
        let mut results = self.simulate()?;
        results.report_paths = reports::write_all(&self.config.output_dir, &results.trips,
                                                  &results.metrics)?;
        Ok(results)
    }
}

fn stream_name(path: &Path) -> String {
    path.file_stem()
        .map(|ss| ss.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
