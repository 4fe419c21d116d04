use std::fmt;

use serde::{Deserialize, Serialize};

// polar radius of the earth, in km
const EARTH_RADIUS_KM: f64 = 6356.7523;
// real road distance is approximated by stretching the great-circle distance
pub const DETOUR_FACTOR: f64 = 1.2;
pub const KM_PER_MILE: f64 = 1.6;

pub const NUM_TRIP_CATEGORIES: usize = 5;
pub const DEFAULT_CATEGORY_THRESHOLDS: [f64; 4] = [0.5, 10., 100., 400.];
pub const DEFAULT_WAIT_THRESHOLDS: [f64; 4] = [2., 10., 100., 400.];
pub const DEFAULT_WAIT_TIMES_S: [u32; 5] = [300, 420, 600, 900, 1800];
pub const DEFAULT_CELL_SIZES: [i32; NUM_TRIP_CATEGORIES] = [2, 2, 3, 5, 10];

/// A location on the discretized grid, or the corner of a super-pixel cell.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    pub fn new(x: i32, y: i32) -> Coordinate {
        Coordinate { x, y }
    }

    /// Snaps both axes onto a grid of `cell_size` cells.
    pub fn super_pixel(&self, cell_size: i32) -> Coordinate {
        Coordinate::new(snap_to_cell(self.x, cell_size), snap_to_cell(self.y, cell_size))
    }

    /// Unique non-negative key for this coordinate, used to index per-cell counters.
    pub fn pairing_hash(&self) -> u64 {
        let xx = to_non_negative(self.x);
        let yy = to_non_negative(self.y);
        if xx >= yy {
            xx * xx + xx + yy
        } else {
            xx + yy * yy
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Floor division toward negative infinity, so that -1 and 1 land in different cells.
fn snap_to_cell(value: i32, cell_size: i32) -> i32 {
    value.div_euclid(cell_size) * cell_size
}

fn to_non_negative(value: i32) -> u64 {
    let value = value as i64;
    if value < 0 {
        (-2 * value - 1) as u64
    } else {
        (2 * value) as u64
    }
}

#[derive(PartialEq, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> LatLon {
        LatLon { lat, lon }
    }

    /// Haversine distance in km.
    pub fn great_circle_distance(&self, other: &LatLon) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let delta_lat = (other.lat - self.lat).to_radians();
        let delta_lon = (other.lon - self.lon).to_radians();

        let aa = (delta_lat / 2.).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.).sin().powi(2);
        let cc = 2. * aa.sqrt().atan2((1. - aa).sqrt());
        EARTH_RADIUS_KM * cc
    }
}

/// Road distance in miles between two points.
pub fn trip_distance(origin: &LatLon, destination: &LatLon) -> f64 {
    DETOUR_FACTOR * origin.great_circle_distance(destination) / KM_PER_MILE
}

/// Index of the first threshold that `value` falls below, or the number of thresholds if none.
pub fn band_index(value: f64, thresholds: &[f64]) -> usize {
    thresholds.iter().position(|&tt| value < tt).unwrap_or(thresholds.len())
}

#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, PartialOrd, Ord)]
pub enum TripCategory {
    Walk,
    Short,
    Normal,
    Long,
    ReallyLong,
}

impl TripCategory {
    pub const ALL: [TripCategory; NUM_TRIP_CATEGORIES] = [
        TripCategory::Walk,
        TripCategory::Short,
        TripCategory::Normal,
        TripCategory::Long,
        TripCategory::ReallyLong,
    ];

    pub fn from_distance(distance: f64) -> TripCategory {
        Self::from_distance_with(distance, &DEFAULT_CATEGORY_THRESHOLDS)
    }

    pub fn from_distance_with(distance: f64, thresholds: &[f64; 4]) -> TripCategory {
        Self::ALL[band_index(distance, thresholds)]
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn label(&self) -> &'static str {
        match self {
            TripCategory::Walk => "WalkTrips",
            TripCategory::Short => "ShortTrips",
            TripCategory::Normal => "NormalTrips",
            TripCategory::Long => "LongTrips",
            TripCategory::ReallyLong => "ReallyLongTrips",
        }
    }
}
