//! The streaming taxi-stand matcher.
//!
//! Passengers arrive one at a time, grouped by origin and ordered by departure time within each
//! origin. All vehicles open at the current origin ("taxi stand") wait for compatible passengers:
//! a passenger joins an open vehicle if it is headed to the same destination super-pixel and will
//! leave before the passenger's latest acceptable pickup time. Otherwise the passenger founds a new
//! vehicle. When the origin changes, every vehicle at the old stand is closed.

use std::str::FromStr;

use super::error::PoolingError;
use super::geometry::Coordinate;
use super::passengers::Passenger;
use super::vehicles::Vehicle;
use super::PoolingPolicy;

/// Which compatible open vehicle a passenger joins when several qualify.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum TieBreak {
    /// The earliest-created compatible vehicle.
    FirstMatch,
    /// The compatible vehicle that leaves soonest; creation order among equal times.
    EarliestDeparture,
}

impl FromStr for TieBreak {
    type Err = String;

    fn from_str(ss: &str) -> Result<Self, Self::Err> {
        match ss {
            "first_match" => Ok(TieBreak::FirstMatch),
            "earliest_departure" => Ok(TieBreak::EarliestDeparture),
            _ => Err(format!("unknown tie break {:?}", ss)),
        }
    }
}

/// Receives vehicles from the engine in the order they close.
pub trait VehicleSink {
    fn accept(&mut self, vehicle: Vehicle);
}

impl VehicleSink for Vec<Vehicle> {
    fn accept(&mut self, vehicle: Vehicle) {
        self.push(vehicle);
    }
}

/// What happened to a passenger handed to the engine.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Assignment {
    Joined(u64),
    Opened(u64),
    /// Walk trips are never pooled.
    Skipped,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub struct PoolingStats {
    pub num_passengers: usize,
    pub num_skipped: usize,
    pub num_vehicles_closed: usize,
}

pub struct PoolingEngine<'a, PP: PoolingPolicy + ?Sized> {
    policy: &'a PP,
    // in creation order, all at the same origin
    open_vehicles: Vec<Vehicle>,
    next_vehicle_id: u64,
    last_departure_s: Option<u32>,
    stats: PoolingStats,
}

impl<'a, PP: PoolingPolicy + ?Sized> PoolingEngine<'a, PP> {
    pub fn new(policy: &'a PP) -> PoolingEngine<'a, PP> {
        PoolingEngine::with_first_vehicle_id(policy, 1)
    }

    pub fn with_first_vehicle_id(policy: &'a PP, first_vehicle_id: u64) -> PoolingEngine<'a, PP> {
        PoolingEngine {
            policy,
            open_vehicles: vec![],
            next_vehicle_id: first_vehicle_id,
            last_departure_s: None,
            stats: PoolingStats::default(),
        }
    }

    pub fn get_open_vehicles(&self) -> &[Vehicle] {
        &self.open_vehicles
    }

    pub fn get_next_vehicle_id(&self) -> u64 {
        self.next_vehicle_id
    }

    pub fn get_stats(&self) -> PoolingStats {
        self.stats
    }

    fn current_stand(&self) -> Option<Coordinate> {
        self.open_vehicles.first().map(|vv| vv.origin)
    }

    pub fn handle_passenger<SS>(&mut self, passenger: Passenger, sink: &mut SS)
                                -> Result<Assignment, PoolingError>
        where SS: VehicleSink + ?Sized
    {
        self.stats.num_passengers += 1;
        if passenger.is_walk() {
            self.stats.num_skipped += 1;
            return Ok(Assignment::Skipped);
        }

        let now_s = passenger.get_departure_time_s();
        if let Some(last_s) = self.last_departure_s {
            if now_s < last_s && self.current_stand() == Some(passenger.get_origin()) {
                log::warn!("passenger {} departs at {} but the stand clock is already at {}",
                           passenger.get_person_id(), now_s, last_s);
            }
        }
        self.last_departure_s = Some(now_s);

        // decide which vehicles leave before touching any of them
        let (still_open, departing): (Vec<Vehicle>, Vec<Vehicle>) =
            std::mem::take(&mut self.open_vehicles)
                .into_iter()
                .partition(|vv| !vv.has_departed(now_s) && !vv.is_full());
        for mut vehicle in departing {
            if vehicle.num_passengers() == 1 {
                // a lone passenger keeps waiting as long as arrivals keep coming
                vehicle.delay_departure_until(now_s);
            }
            self.close_and_emit(vehicle, sink)?;
        }
        self.open_vehicles = still_open;

        if self.current_stand() != Some(passenger.get_origin()) {
            // new stand: nobody else will board at the old one
            for vehicle in std::mem::take(&mut self.open_vehicles) {
                self.close_and_emit(vehicle, sink)?;
            }
            let vehicle = self.open_vehicle(passenger);
            let id = vehicle.id;
            self.open_vehicles.push(vehicle);
            return Ok(Assignment::Opened(id));
        }

        match self.find_match(&passenger) {
            Some(idx) => {
                let vehicle = &mut self.open_vehicles[idx];
                vehicle.add_passenger(passenger)?;
                Ok(Assignment::Joined(vehicle.id))
            }
            None => {
                let vehicle = self.open_vehicle(passenger);
                let id = vehicle.id;
                self.open_vehicles.push(vehicle);
                Ok(Assignment::Opened(id))
            }
        }
    }

    /// Closes every vehicle still waiting. Call once the passenger stream is exhausted.
    pub fn finish<SS>(&mut self, sink: &mut SS) -> Result<PoolingStats, PoolingError>
        where SS: VehicleSink + ?Sized
    {
        for vehicle in std::mem::take(&mut self.open_vehicles) {
            self.close_and_emit(vehicle, sink)?;
        }
        self.last_departure_s = None;
        log::debug!("pooled {} passengers into {} vehicles ({} walk trips skipped)",
                    self.stats.num_passengers - self.stats.num_skipped,
                    self.stats.num_vehicles_closed, self.stats.num_skipped);
        Ok(self.stats)
    }

    fn find_match(&self, passenger: &Passenger) -> Option<usize> {
        let mut candidates = self.open_vehicles.iter().enumerate().filter(|(_, vv)| {
            vv.destination_super_pixel == passenger.destination_super_pixel &&
            vv.has_departed(passenger.latest_pickup_time_s)
        });
        match self.policy.get_tie_break() {
            TieBreak::FirstMatch => candidates.next().map(|(ii, _)| ii),
            TieBreak::EarliestDeparture => {
                candidates.min_by_key(|(_, vv)| vv.get_departure_time_s()).map(|(ii, _)| ii)
            }
        }
    }

    fn open_vehicle(&mut self, founder: Passenger) -> Vehicle {
        let id = self.next_vehicle_id;
        self.next_vehicle_id += 1;
        Vehicle::new(id, founder, self.policy.get_max_occupancy(), self.policy.get_vmt_strategy())
    }

    fn close_and_emit<SS>(&mut self, mut vehicle: Vehicle, sink: &mut SS)
                          -> Result<(), PoolingError>
        where SS: VehicleSink + ?Sized
    {
        vehicle.close()?;
        self.stats.num_vehicles_closed += 1;
        if self.stats.num_vehicles_closed % 10000 == 0 {
            log::debug!("closed {} vehicles", self.stats.num_vehicles_closed);
        }
        sink.accept(vehicle);
        Ok(())
    }
}

/// Runs one complete pass over `passengers`, emitting every vehicle into `sink`.
pub fn pool_passengers<PP, II, SS>(policy: &PP, passengers: II, sink: &mut SS)
                                   -> Result<PoolingStats, PoolingError>
    where PP: PoolingPolicy + ?Sized,
          II: IntoIterator<Item = Passenger>,
          SS: VehicleSink + ?Sized,
{
    let mut engine = PoolingEngine::new(policy);
    for passenger in passengers {
        engine.handle_passenger(passenger, sink)?;
    }
    engine.finish(sink)
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::super::config::PoolingConfig;
    use super::super::test_utils::trip_record;

    const ORIGIN_LATLON: (f64, f64) = (37.5, -122.3);

    /// A short trip. `far` ones (~8 miles) tolerate a 420 s wait, the others (~1.7 miles) 300 s.
    fn short_passenger(person_id: i64, origin: (i32, i32), destination: (i32, i32),
                       departure_time_s: u32, far: bool, config: &PoolingConfig) -> Passenger {
        let dest_latlon = if far { (37.6, -122.3) } else { (37.52, -122.3) };
        let record = trip_record(person_id, origin, ORIGIN_LATLON, destination, dest_latlon,
                                 departure_time_s);
        Passenger::new(record, config)
    }

    fn person_ids(vehicle: &Vehicle) -> Vec<i64> {
        vehicle.get_passengers().iter().map(|pp| pp.get_person_id()).collect()
    }

    #[test]
    fn test_two_compatible_passengers_share_a_vehicle() {
        let config = PoolingConfig::default();
        let first = short_passenger(1, (0, 0), (10, 10), 100, true, &config);
        let second = short_passenger(2, (0, 0), (11, 10), 200, true, &config);
        assert_eq!(first.latest_pickup_time_s, 520);
        assert_eq!(first.destination_super_pixel, second.destination_super_pixel);

        let mut engine = PoolingEngine::new(&config);
        let mut closed: Vec<Vehicle> = vec![];
        assert_eq!(engine.handle_passenger(first, &mut closed), Ok(Assignment::Opened(1)));
        assert_eq!(engine.handle_passenger(second, &mut closed), Ok(Assignment::Joined(1)));
        assert!(closed.is_empty());
        engine.finish(&mut closed).unwrap();

        assert_eq!(closed.len(), 1);
        assert_eq!(person_ids(&closed[0]), vec![1, 2]);
        assert_eq!(closed[0].get_departure_time_s(), 520);
        assert!(!closed[0].is_open());
    }

    #[test]
    fn test_new_stand_closes_old_vehicles_first() {
        let config = PoolingConfig::default();
        let passengers = vec![
            short_passenger(1, (0, 0), (10, 10), 0, true, &config),
            short_passenger(2, (0, 0), (-30, 4), 10, true, &config),
            short_passenger(3, (5, 5), (10, 10), 20, true, &config),
        ];
        let mut engine = PoolingEngine::new(&config);
        let mut closed: Vec<Vehicle> = vec![];
        let mut iter = passengers.into_iter();
        engine.handle_passenger(iter.next().unwrap(), &mut closed).unwrap();
        engine.handle_passenger(iter.next().unwrap(), &mut closed).unwrap();
        assert_eq!(engine.get_open_vehicles().len(), 2);
        assert!(closed.is_empty());

        let assignment = engine.handle_passenger(iter.next().unwrap(), &mut closed).unwrap();
        assert_eq!(assignment, Assignment::Opened(3));
        let closed_ids: Vec<u64> = closed.iter().map(|vv| vv.id).collect();
        assert_eq!(closed_ids, vec![1, 2]);
        assert_eq!(engine.get_open_vehicles().len(), 1);
        assert_eq!(engine.get_open_vehicles()[0].origin, Coordinate::new(5, 5));

        engine.finish(&mut closed).unwrap();
        let closed_ids: Vec<u64> = closed.iter().map(|vv| vv.id).collect();
        assert_eq!(closed_ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_lone_passenger_departure_is_delayed() {
        let config = PoolingConfig::default();
        let mut closed: Vec<Vehicle> = vec![];
        let mut engine = PoolingEngine::new(&config);
        engine.handle_passenger(short_passenger(1, (0, 0), (10, 10), 100, true, &config),
                                &mut closed).unwrap();
        // arrives after vehicle 1 was due to leave, heading elsewhere
        engine.handle_passenger(short_passenger(2, (0, 0), (-40, -40), 600, true, &config),
                                &mut closed).unwrap();

        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].id, 1);
        assert_eq!(closed[0].get_departure_time_s(), 600);

        engine.finish(&mut closed).unwrap();
        // closed at the end of the stream, so it keeps its own deadline
        assert_eq!(closed[1].get_departure_time_s(), 600 + 420);
    }

    #[test]
    fn test_departed_shared_vehicle_keeps_its_deadline() {
        let config = PoolingConfig::default();
        let passengers = vec![
            short_passenger(1, (0, 0), (10, 10), 100, true, &config),
            short_passenger(2, (0, 0), (10, 10), 150, true, &config),
            short_passenger(3, (0, 0), (10, 10), 900, true, &config),
        ];
        let mut closed: Vec<Vehicle> = vec![];
        pool_passengers(&config, passengers, &mut closed).unwrap();
        assert_eq!(closed.len(), 2);
        assert_eq!(person_ids(&closed[0]), vec![1, 2]);
        assert_eq!(closed[0].get_departure_time_s(), 520);
        assert_eq!(person_ids(&closed[1]), vec![3]);
    }

    #[test]
    fn test_full_vehicle_departs() {
        let config = PoolingConfig { max_occupancy: 2, ..PoolingConfig::default() };
        let passengers: Vec<Passenger> = (0..5)
            .map(|ii| short_passenger(ii, (0, 0), (10, 10), ii as u32, true, &config))
            .collect();
        let mut closed: Vec<Vehicle> = vec![];
        let stats = pool_passengers(&config, passengers, &mut closed).unwrap();
        let groups: Vec<Vec<i64>> = closed.iter().map(person_ids).collect();
        assert_eq!(groups, vec![vec![0, 1], vec![2, 3], vec![4]]);
        assert_eq!(stats.num_vehicles_closed, 3);
        assert!(closed.iter().all(|vv| vv.num_passengers() <= 2));
    }

    #[test]
    fn test_walk_trips_are_skipped() {
        let config = PoolingConfig::default();
        let walk = Passenger::new(trip_record(9, (0, 0), ORIGIN_LATLON, (0, 0), ORIGIN_LATLON, 50),
                                  &config);
        assert!(walk.is_walk());

        let mut closed: Vec<Vehicle> = vec![];
        let mut engine = PoolingEngine::new(&config);
        assert_eq!(engine.handle_passenger(walk, &mut closed), Ok(Assignment::Skipped));
        assert!(engine.get_open_vehicles().is_empty());
        engine.handle_passenger(short_passenger(1, (0, 0), (10, 10), 100, true, &config),
                                &mut closed).unwrap();
        let stats = engine.finish(&mut closed).unwrap();
        assert_eq!(stats, PoolingStats { num_passengers: 2, num_skipped: 1,
                                         num_vehicles_closed: 1 });
        assert_eq!(person_ids(&closed[0]), vec![1]);
    }

    #[test]
    fn test_impatient_passenger_opens_second_vehicle() {
        let config = PoolingConfig::default();
        let mut closed: Vec<Vehicle> = vec![];
        let mut engine = PoolingEngine::new(&config);
        // vehicle 1 leaves at 420
        engine.handle_passenger(short_passenger(1, (0, 0), (10, 10), 0, true, &config),
                                &mut closed).unwrap();
        // this passenger only waits until 400, so it can't take vehicle 1
        let assignment = engine.handle_passenger(
            short_passenger(2, (0, 0), (11, 11), 100, false, &config), &mut closed).unwrap();
        assert_eq!(assignment, Assignment::Opened(2));
        assert_eq!(engine.get_open_vehicles().len(), 2);
    }

    fn tie_break_assignment(tie_break: TieBreak) -> Assignment {
        let config = PoolingConfig { tie_break, ..PoolingConfig::default() };
        let mut closed: Vec<Vehicle> = vec![];
        let mut engine = PoolingEngine::new(&config);
        // vehicle 1 leaves at 420, vehicle 2 at 400, both for the same super-pixel
        engine.handle_passenger(short_passenger(1, (0, 0), (10, 10), 0, true, &config),
                                &mut closed).unwrap();
        engine.handle_passenger(short_passenger(2, (0, 0), (11, 11), 100, false, &config),
                                &mut closed).unwrap();
        let assignment = engine.handle_passenger(
            short_passenger(3, (0, 0), (10, 11), 110, true, &config), &mut closed).unwrap();
        assert!(closed.is_empty());
        assignment
    }

    #[test]
    fn test_tie_break_policies() {
        assert_eq!(tie_break_assignment(TieBreak::FirstMatch), Assignment::Joined(1));
        assert_eq!(tie_break_assignment(TieBreak::EarliestDeparture), Assignment::Joined(2));
        assert_eq!("first_match".parse::<TieBreak>(), Ok(TieBreak::FirstMatch));
        assert!("best".parse::<TieBreak>().is_err());
    }

    #[test]
    fn test_first_vehicle_id() {
        let config = PoolingConfig::default();
        let mut closed: Vec<Vehicle> = vec![];
        let mut engine = PoolingEngine::with_first_vehicle_id(&config, 100);
        engine.handle_passenger(short_passenger(1, (0, 0), (10, 10), 0, true, &config),
                                &mut closed).unwrap();
        engine.finish(&mut closed).unwrap();
        assert_eq!(closed[0].id, 100);
        assert_eq!(engine.get_next_vehicle_id(), 101);
    }
}
