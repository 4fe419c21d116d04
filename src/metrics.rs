//! Reductions over closed vehicles.
//!
//! Every accumulator here is a plain sum, so aggregators built over disjoint parts of a trip
//! table can be merged in any grouping and give the same totals.

use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;
use rayon::prelude::*;

use super::geometry::{Coordinate, NUM_TRIP_CATEGORIES};
use super::passengers::Passenger;
use super::pooling::VehicleSink;
use super::vehicles::{TripMiles, Vehicle, VehicleTrip, SECONDS_PER_DAY};

pub const NUM_HOURS: usize = 24;
pub const MINUTES_PER_DAY: usize = 1440;
pub const NUM_TIME_BANDS: usize = 6;
/// Edge lengths of the supply/demand grids.
pub const SUPPLY_DEMAND_RESOLUTIONS: [i32; 3] = [1, 5, 10];

pub fn hour_of_day(time_s: u32) -> usize {
    ((time_s % SECONDS_PER_DAY) / 3600) as usize
}

#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, PartialOrd, Ord)]
pub enum TimeBand {
    Overnight,
    MorningPeak,
    MorningLull,
    EarlyAfternoon,
    EveningRush,
    Evening,
}

impl TimeBand {
    pub const ALL: [TimeBand; NUM_TIME_BANDS] = [
        TimeBand::Overnight,
        TimeBand::MorningPeak,
        TimeBand::MorningLull,
        TimeBand::EarlyAfternoon,
        TimeBand::EveningRush,
        TimeBand::Evening,
    ];

    /// Bands start at 0:00, 6:00, 9:00, 12:00, 15:00 and 19:00.
    pub fn from_seconds(time_s: u32) -> TimeBand {
        match hour_of_day(time_s) {
            0..=5 => TimeBand::Overnight,
            6..=8 => TimeBand::MorningPeak,
            9..=11 => TimeBand::MorningLull,
            12..=14 => TimeBand::EarlyAfternoon,
            15..=18 => TimeBand::EveningRush,
            _ => TimeBand::Evening,
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeBand::Overnight => "Overnight",
            TimeBand::MorningPeak => "MorningPeak",
            TimeBand::MorningLull => "MorningLull",
            TimeBand::EarlyAfternoon => "EarlyAfternoon",
            TimeBand::EveningRush => "EveningRush",
            TimeBand::Evening => "Evening",
        }
    }
}

/// Occupants and miles of the vehicles departing within one time bucket.
#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub struct TimeBucket {
    pub num_passengers: u64,
    pub miles: TripMiles,
}

impl TimeBucket {
    fn add(&mut self, other: &TimeBucket) {
        self.num_passengers += other.num_passengers;
        self.miles.add(&other.miles);
    }

    pub fn avo(&self) -> Option<f64> {
        self.miles.avo()
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct SuperPixelFlow {
    pub cell: Coordinate,
    pub net: i64,
}

/// Net vehicle supply per grid cell: arrivals count up, departures count down.
#[derive(PartialEq, Debug, Clone)]
pub struct NetFlowGrid {
    cell_size: i32,
    cells: HashMap<u64, SuperPixelFlow>,
}

impl NetFlowGrid {
    pub fn new(cell_size: i32) -> NetFlowGrid {
        NetFlowGrid { cell_size, cells: HashMap::new() }
    }

    pub fn get_cell_size(&self) -> i32 {
        self.cell_size
    }

    fn shift(&mut self, location: Coordinate, delta: i64) {
        let cell = location.super_pixel(self.cell_size);
        self.cells.entry(cell.pairing_hash())
                  .or_insert(SuperPixelFlow { cell, net: 0 })
                  .net += delta;
    }

    pub fn record_arrival(&mut self, location: Coordinate) {
        self.shift(location, 1);
    }

    pub fn record_departure(&mut self, location: Coordinate) {
        self.shift(location, -1);
    }

    /// Net count of the cell containing `location`; zero for cells never touched.
    pub fn net_at(&self, location: Coordinate) -> i64 {
        let cell = location.super_pixel(self.cell_size);
        self.cells.get(&cell.pairing_hash()).map_or(0, |flow| flow.net)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All touched cells ordered by x, then y.
    pub fn sorted_flows(&self) -> Vec<SuperPixelFlow> {
        self.cells.values().cloned().sorted_by_key(|flow| (flow.cell.x, flow.cell.y)).collect()
    }

    pub fn merge(&mut self, other: &NetFlowGrid) {
        for (hash, flow) in &other.cells {
            self.cells.entry(*hash)
                      .or_insert(SuperPixelFlow { cell: flow.cell, net: 0 })
                      .net += flow.net;
        }
    }
}

/// Sweep line over the minutes of one day counting vehicles on the road.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct ActiveVehicleCurve {
    deltas: Vec<i64>,
}

impl Default for ActiveVehicleCurve {
    fn default() -> Self {
        ActiveVehicleCurve { deltas: vec![0; MINUTES_PER_DAY] }
    }
}

impl ActiveVehicleCurve {
    /// Both times are seconds since midnight. A trip that ends before it starts ran past midnight.
    pub fn record(&mut self, start_s: u32, end_s: u32) {
        let start = ((start_s % SECONDS_PER_DAY) / 60) as usize;
        let end = ((end_s % SECONDS_PER_DAY) / 60) as usize;
        self.deltas[start] += 1;
        if end < MINUTES_PER_DAY - 1 {
            self.deltas[end + 1] -= 1;
        }
        if start > end {
            self.deltas[0] += 1;
        }
    }

    /// Number of active vehicles in each minute of the day.
    pub fn counts(&self) -> Vec<i64> {
        self.deltas.iter()
                   .scan(0, |running, delta| {
                       *running += delta;
                       Some(*running)
                   })
                   .collect()
    }

    pub fn merge(&mut self, other: &ActiveVehicleCurve) {
        for (dd, od) in self.deltas.iter_mut().zip(other.deltas.iter()) {
            *dd += od;
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct MetricsAggregator {
    average_speed_mph: f64,
    num_vehicles: u64,
    num_pooled_passengers: u64,
    total: TripMiles,
    by_county: BTreeMap<u32, TripMiles>,
    by_state: BTreeMap<u32, TripMiles>,
    trip_categories: [u64; NUM_TRIP_CATEGORIES],
    hours: Vec<TimeBucket>,
    time_bands: Vec<TimeBucket>,
    supply_demand: Vec<NetFlowGrid>,
    active_vehicles: ActiveVehicleCurve,
}

/// The state part of a five-digit county FIPS code.
pub fn state_fips(county_fips: u32) -> u32 {
    county_fips / 1000
}

impl MetricsAggregator {
    pub fn new(average_speed_mph: f64) -> MetricsAggregator {
        MetricsAggregator {
            average_speed_mph,
            num_vehicles: 0,
            num_pooled_passengers: 0,
            total: TripMiles::default(),
            by_county: BTreeMap::new(),
            by_state: BTreeMap::new(),
            trip_categories: [0; NUM_TRIP_CATEGORIES],
            hours: vec![TimeBucket::default(); NUM_HOURS],
            time_bands: vec![TimeBucket::default(); NUM_TIME_BANDS],
            supply_demand: SUPPLY_DEMAND_RESOLUTIONS.iter().map(|&rr| NetFlowGrid::new(rr))
                                                          .collect(),
            active_vehicles: ActiveVehicleCurve::default(),
        }
    }

    /// Aggregates a trip table on the rayon pool.
    pub fn from_trips_parallel(trips: &[VehicleTrip], average_speed_mph: f64)
                               -> MetricsAggregator {
        trips.par_iter()
             .fold(|| MetricsAggregator::new(average_speed_mph), |mut agg, trip| {
                 agg.record_vehicle_trip(trip);
                 agg
             })
             .reduce(|| MetricsAggregator::new(average_speed_mph), |mut left, right| {
                 left.merge(&right);
                 left
             })
    }

    /// Counts a trip by distance category. Every trip counts, including walks.
    pub fn record_passenger(&mut self, passenger: &Passenger) {
        self.trip_categories[passenger.trip_category.index()] += 1;
    }

    /// Adds a closed vehicle. Open vehicles have no trip miles yet and are ignored.
    pub fn record_vehicle(&mut self, vehicle: &Vehicle) {
        match vehicle.to_trip(self.average_speed_mph) {
            Some(trip) => self.record_vehicle_trip(&trip),
            None => log::warn!("ignoring vehicle {} that is still open", vehicle.id),
        }
    }

    pub fn record_vehicle_trip(&mut self, trip: &VehicleTrip) {
        let miles = trip.get_miles();
        self.num_vehicles += 1;
        self.num_pooled_passengers += trip.departure_occupancy as u64;
        self.total.add(&miles);
        self.by_county.entry(trip.origin_fips).or_default().add(&miles);
        self.by_state.entry(state_fips(trip.origin_fips)).or_default().add(&miles);

        let bucket = TimeBucket { num_passengers: trip.departure_occupancy as u64, miles };
        self.hours[hour_of_day(trip.departure_time_s)].add(&bucket);
        self.time_bands[TimeBand::from_seconds(trip.departure_time_s).index()].add(&bucket);

        for grid in self.supply_demand.iter_mut() {
            grid.record_departure(trip.get_origin());
            grid.record_arrival(trip.get_destination());
        }
        self.active_vehicles.record(trip.departure_time_s, trip.made_empty_time_s);
    }

    pub fn merge(&mut self, other: &MetricsAggregator) {
        self.num_vehicles += other.num_vehicles;
        self.num_pooled_passengers += other.num_pooled_passengers;
        self.total.add(&other.total);
        for (fips, miles) in &other.by_county {
            self.by_county.entry(*fips).or_default().add(miles);
        }
        for (fips, miles) in &other.by_state {
            self.by_state.entry(*fips).or_default().add(miles);
        }
        for (cc, oc) in self.trip_categories.iter_mut().zip(other.trip_categories.iter()) {
            *cc += oc;
        }
        for (hh, oh) in self.hours.iter_mut().zip(other.hours.iter()) {
            hh.add(oh);
        }
        for (bb, ob) in self.time_bands.iter_mut().zip(other.time_bands.iter()) {
            bb.add(ob);
        }
        for (grid, other_grid) in self.supply_demand.iter_mut().zip(other.supply_demand.iter()) {
            grid.merge(other_grid);
        }
        self.active_vehicles.merge(&other.active_vehicles);
    }

    pub fn get_num_vehicles(&self) -> u64 {
        self.num_vehicles
    }

    pub fn get_num_pooled_passengers(&self) -> u64 {
        self.num_pooled_passengers
    }

    pub fn get_total(&self) -> TripMiles {
        self.total
    }

    pub fn get_avo(&self) -> Option<f64> {
        self.total.avo()
    }

    pub fn get_county_miles(&self) -> &BTreeMap<u32, TripMiles> {
        &self.by_county
    }

    pub fn get_state_miles(&self) -> &BTreeMap<u32, TripMiles> {
        &self.by_state
    }

    pub fn get_category_counts(&self) -> &[u64; NUM_TRIP_CATEGORIES] {
        &self.trip_categories
    }

    /// Number of trips in each category or any shorter one.
    pub fn cumulative_category_counts(&self) -> [u64; NUM_TRIP_CATEGORIES] {
        let mut cumulative = [0; NUM_TRIP_CATEGORIES];
        let mut running = 0;
        for (cc, count) in cumulative.iter_mut().zip(self.trip_categories.iter()) {
            running += count;
            *cc = running;
        }
        cumulative
    }

    pub fn get_hours(&self) -> &[TimeBucket] {
        &self.hours
    }

    pub fn get_time_bands(&self) -> &[TimeBucket] {
        &self.time_bands
    }

    /// The supply/demand grid with the given edge length, if it is one of the tracked ones.
    pub fn get_supply_demand(&self, resolution: i32) -> Option<&NetFlowGrid> {
        self.supply_demand.iter().find(|grid| grid.get_cell_size() == resolution)
    }

    pub fn active_vehicle_counts(&self) -> Vec<i64> {
        self.active_vehicles.counts()
    }
}

impl VehicleSink for MetricsAggregator {
    fn accept(&mut self, vehicle: Vehicle) {
        self.record_vehicle(&vehicle);
    }
}
