use std::collections::HashMap;
use std::fmt::Debug;

use super::geometry::{Coordinate, LatLon};
use super::passengers::TripRecord;


/// Checks that the contents of two hashmaps are the same.
pub fn compare_hashmaps<KK, VV>(query_map: &HashMap<KK, VV>, true_map: &HashMap<KK, VV>)
    where KK: Debug + Eq + std::hash::Hash,
    VV: Debug + PartialEq,
{
    assert_eq!(query_map.len(), true_map.len());

    for (true_key, true_val) in true_map {
        match query_map.get(true_key) {
            Some(val) => assert_eq!(val, true_val),
            None => assert!(false, "Key {:?} missing!", true_key),
        }
    }
}

/// Builds a trip in county 06081 with the given grid and geographic endpoints.
pub fn trip_record(person_id: i64, origin: (i32, i32), origin_latlon: (f64, f64),
                   destination: (i32, i32), destination_latlon: (f64, f64),
                   departure_time_s: u32) -> TripRecord {
    TripRecord {
        person_id,
        origin_fips: 6081,
        origin: Coordinate::new(origin.0, origin.1),
        origin_latlon: LatLon::new(origin_latlon.0, origin_latlon.1),
        destination_fips: 6081,
        destination: Coordinate::new(destination.0, destination.1),
        destination_latlon: LatLon::new(destination_latlon.0, destination_latlon.1),
        departure_time_s,
    }
}
