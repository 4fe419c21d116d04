// imports of other modules from this crate
mod geometry;
pub use geometry::{band_index, trip_distance, Coordinate, LatLon, TripCategory,
                   NUM_TRIP_CATEGORIES};

mod error;
pub use error::{ConfigError, PoolingError};

mod config_utils;

mod config;
pub use config::PoolingConfig;

mod passengers;
pub use passengers::{Passenger, TripRecord};

mod vehicles;
pub use vehicles::{TripMiles, Vehicle, VehicleState, VehicleTrip, VmtStrategy};

mod pooling;
pub use pooling::{pool_passengers, Assignment, PoolingEngine, PoolingStats, TieBreak,
                  VehicleSink};

mod metrics;
pub use metrics::{ActiveVehicleCurve, MetricsAggregator, NetFlowGrid, SuperPixelFlow, TimeBand,
                  TimeBucket, SUPPLY_DEMAND_RESOLUTIONS};

pub mod reports;

mod simulator;
pub use simulator::{PoolingSimulator, SimResults};

#[cfg(test)]
mod test_utils;


/// The tunable rules the pooling engine applies to each passenger.
pub trait PoolingPolicy {
    fn get_max_occupancy(&self) -> usize;
    fn get_category_thresholds(&self) -> &[f64; 4];
    fn get_wait_thresholds(&self) -> &[f64; 4];
    fn get_wait_times_s(&self) -> &[u32; NUM_TRIP_CATEGORIES];
    fn get_cell_sizes(&self) -> &[i32; NUM_TRIP_CATEGORIES];
    fn get_tie_break(&self) -> TieBreak;
    fn get_vmt_strategy(&self) -> VmtStrategy;

    fn trip_category(&self, distance: f64) -> TripCategory {
        TripCategory::from_distance_with(distance, self.get_category_thresholds())
    }

    /// How long a passenger travelling `distance` miles will wait for a shared ride.
    fn max_wait_time_s(&self, distance: f64) -> u32 {
        self.get_wait_times_s()[band_index(distance, self.get_wait_thresholds())]
    }

    /// The destination cell a passenger of the given category is matched on.
    fn super_pixel(&self, location: &Coordinate, category: TripCategory) -> Coordinate {
        location.super_pixel(self.get_cell_sizes()[category.index()])
    }
}
