use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::PoolingError;
use super::geometry::{Coordinate, LatLon};
use super::passengers::Passenger;

pub const SECONDS_PER_DAY: u32 = 86400;

/// How the distance driven by a shared vehicle is chained through its passengers' destinations.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum VmtStrategy {
    /// Drop passengers off in the order they boarded.
    Naive,
    /// Always drive to the closest remaining destination next.
    NearestNeighbor,
}

impl FromStr for VmtStrategy {
    type Err = String;

    fn from_str(ss: &str) -> Result<Self, Self::Err> {
        match ss {
            "naive" => Ok(VmtStrategy::Naive),
            "nearest_neighbor" => Ok(VmtStrategy::NearestNeighbor),
            _ => Err(format!("unknown vmt strategy {:?}", ss)),
        }
    }
}

/// Person-miles and vehicle-miles for one vehicle, or summed over many.
#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub struct TripMiles {
    pub pmt: f64,
    pub vmt: f64,
}

impl TripMiles {
    pub fn new(pmt: f64, vmt: f64) -> TripMiles {
        TripMiles { pmt, vmt }
    }

    pub fn add(&mut self, other: &TripMiles) {
        self.pmt += other.pmt;
        self.vmt += other.vmt;
    }

    /// Average vehicle occupancy. Undefined when no vehicle miles were driven.
    pub fn avo(&self) -> Option<f64> {
        if self.vmt == 0. {
            None
        } else {
            Some(self.pmt / self.vmt)
        }
    }
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum VehicleState {
    Open,
    Closed(TripMiles),
}

/// A shared ride leaving one taxi stand for one destination super-pixel.
#[derive(PartialEq, Debug, Clone)]
pub struct Vehicle {
    pub id: u64,
    pub origin: Coordinate,
    pub origin_latlon: LatLon,
    pub origin_fips: u32,
    pub destination: Coordinate,
    pub destination_latlon: LatLon,
    pub destination_super_pixel: Coordinate,
    passengers: Vec<Passenger>,
    departure_time_s: u32,
    max_occupancy: usize,
    vmt_strategy: VmtStrategy,
    state: VehicleState,
}

impl Vehicle {
    pub fn new(id: u64, founder: Passenger, max_occupancy: usize, vmt_strategy: VmtStrategy)
               -> Vehicle {
        Vehicle {
            id,
            origin: founder.record.origin,
            origin_latlon: founder.record.origin_latlon,
            origin_fips: founder.record.origin_fips,
            destination: founder.record.destination,
            destination_latlon: founder.record.destination_latlon,
            destination_super_pixel: founder.destination_super_pixel,
            departure_time_s: founder.latest_pickup_time_s,
            passengers: vec![founder],
            max_occupancy,
            vmt_strategy,
            state: VehicleState::Open,
        }
    }

    pub fn get_passengers(&self) -> &Vec<Passenger> {
        &self.passengers
    }

    pub fn num_passengers(&self) -> usize {
        self.passengers.len()
    }

    pub fn get_departure_time_s(&self) -> u32 {
        self.departure_time_s
    }

    pub fn get_max_occupancy(&self) -> usize {
        self.max_occupancy
    }

    pub fn get_state(&self) -> VehicleState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == VehicleState::Open
    }

    pub fn is_full(&self) -> bool {
        self.passengers.len() >= self.max_occupancy
    }

    /// True if the vehicle leaves no later than `time_s`.
    pub fn has_departed(&self, time_s: u32) -> bool {
        self.departure_time_s <= time_s
    }

    pub fn add_passenger(&mut self, passenger: Passenger) -> Result<(), PoolingError> {
        if !self.is_open() {
            return Err(PoolingError::VehicleClosed(self.id));
        }
        if self.is_full() {
            return Err(PoolingError::VehicleFull { vehicle: self.id,
                                                   capacity: self.max_occupancy });
        }
        if passenger.get_origin() != self.origin {
            return Err(PoolingError::OriginMismatch {
                vehicle: self.id,
                person: passenger.get_person_id(),
                expected: self.origin,
                found: passenger.get_origin(),
            });
        }
        if passenger.destination_super_pixel != self.destination_super_pixel {
            return Err(PoolingError::DestinationMismatch {
                vehicle: self.id,
                person: passenger.get_person_id(),
                expected: self.destination_super_pixel,
                found: passenger.destination_super_pixel,
            });
        }
        self.passengers.push(passenger);
        Ok(())
    }

    /// Holds the vehicle at the stand until `time_s`. Departure times only ever move later.
    pub fn delay_departure_until(&mut self, time_s: u32) {
        if self.is_open() && time_s > self.departure_time_s {
            self.departure_time_s = time_s;
        }
    }

    /// Freezes the vehicle and records its trip miles.
    pub fn close(&mut self) -> Result<TripMiles, PoolingError> {
        if !self.is_open() {
            return Err(PoolingError::VehicleClosed(self.id));
        }
        let miles = TripMiles::new(self.person_miles_traveled(), self.vehicle_miles_traveled());
        self.state = VehicleState::Closed(miles);
        Ok(miles)
    }

    /// Trip miles if the vehicle has been closed.
    pub fn get_miles(&self) -> Option<TripMiles> {
        match self.state {
            VehicleState::Open => None,
            VehicleState::Closed(miles) => Some(miles),
        }
    }

    pub fn person_miles_traveled(&self) -> f64 {
        self.passengers.iter().map(|pp| pp.trip_distance).sum()
    }

    pub fn vehicle_miles_traveled(&self) -> f64 {
        match self.vmt_strategy {
            VmtStrategy::Naive => {
                let mut cur_latlon = self.origin_latlon;
                let mut vmt = 0.;
                for passenger in &self.passengers {
                    vmt += passenger.distance_to(&cur_latlon);
                    cur_latlon = passenger.record.destination_latlon;
                }
                vmt
            }
            VmtStrategy::NearestNeighbor => {
                let mut cur_latlon = self.origin_latlon;
                let mut remaining: Vec<&Passenger> = self.passengers.iter().collect();
                let mut vmt = 0.;
                while !remaining.is_empty() {
                    let mut nearest_idx = 0;
                    let mut nearest_dist = f64::INFINITY;
                    for (ii, passenger) in remaining.iter().enumerate() {
                        let dist = passenger.distance_to(&cur_latlon);
                        if dist < nearest_dist {
                            nearest_dist = dist;
                            nearest_idx = ii;
                        }
                    }
                    vmt += nearest_dist;
                    cur_latlon = remaining.remove(nearest_idx).record.destination_latlon;
                }
                vmt
            }
        }
    }

    /// Flattens a closed vehicle into a trip row. Returns `None` while the vehicle is open.
    pub fn to_trip(&self, average_speed_mph: f64) -> Option<VehicleTrip> {
        let miles = self.get_miles()?;
        let drive_time_s = (miles.vmt / average_speed_mph * 3600.).ceil() as u32;
        let origin5 = self.origin.super_pixel(5);
        let destination5 = self.destination.super_pixel(5);
        let origin10 = self.origin.super_pixel(10);
        let destination10 = self.destination.super_pixel(10);
        Some(VehicleTrip {
            origin_fips: self.origin_fips,
            origin_x: self.origin.x,
            origin_y: self.origin.y,
            departure_time_s: self.departure_time_s % SECONDS_PER_DAY,
            destination_x: self.destination.x,
            destination_y: self.destination.y,
            made_empty_time_s: ((self.departure_time_s as u64 + drive_time_s as u64)
                                % SECONDS_PER_DAY as u64) as u32,
            vehicle_trip_miles: miles.vmt,
            departure_occupancy: self.passengers.len() as u32,
            occupant_trip_miles: miles.pmt,
            origin_x_super5: origin5.x,
            origin_y_super5: origin5.y,
            destination_x_super5: destination5.x,
            destination_y_super5: destination5.y,
            origin_x_super10: origin10.x,
            origin_y_super10: origin10.y,
            destination_x_super10: destination10.x,
            destination_y_super10: destination10.y,
        })
    }
}

/// One row of the pooled trip table. Times are seconds since midnight.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VehicleTrip {
    pub origin_fips: u32,
    pub origin_x: i32,
    pub origin_y: i32,
    pub departure_time_s: u32,
    pub destination_x: i32,
    pub destination_y: i32,
    pub made_empty_time_s: u32,
    pub vehicle_trip_miles: f64,
    pub departure_occupancy: u32,
    pub occupant_trip_miles: f64,
    pub origin_x_super5: i32,
    pub origin_y_super5: i32,
    pub destination_x_super5: i32,
    pub destination_y_super5: i32,
    pub origin_x_super10: i32,
    pub origin_y_super10: i32,
    pub destination_x_super10: i32,
    pub destination_y_super10: i32,
}

impl VehicleTrip {
    pub fn get_miles(&self) -> TripMiles {
        TripMiles::new(self.occupant_trip_miles, self.vehicle_trip_miles)
    }

    pub fn get_origin(&self) -> Coordinate {
        Coordinate::new(self.origin_x, self.origin_y)
    }

    pub fn get_destination(&self) -> Coordinate {
        Coordinate::new(self.destination_x, self.destination_y)
    }
}
