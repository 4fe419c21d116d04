use std::collections::HashMap;
use std::error::Error;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::config_utils;
use super::geometry::{trip_distance, Coordinate, LatLon, TripCategory};
use super::PoolingPolicy;

/// One line of the trip log, exactly as the survey recorded it.
#[derive(PartialEq, Debug, Clone)]
pub struct TripRecord {
    pub person_id: i64,
    pub origin_fips: u32,
    pub origin: Coordinate,
    pub origin_latlon: LatLon,
    pub destination_fips: u32,
    pub destination: Coordinate,
    pub destination_latlon: LatLon,
    pub departure_time_s: u32,
}

// A convenience type for parsing csv data
type Row = HashMap<String, String>;

fn field<'a>(row: &'a Row, key: &str) -> Result<&'a str, Box<dyn Error>> {
    match row.get(key) {
        Some(value) => Ok(value.trim()),
        None => Err(format!("trip row is missing column {}", key).into()),
    }
}

fn parse_field<T>(row: &Row, key: &str) -> Result<T, Box<dyn Error>>
    where T: std::str::FromStr,
          T::Err: Error + 'static,
{
    let value = field(row, key)?;
    value.parse::<T>().map_err(|err| format!("bad value {:?} in column {}: {}", value, key, err)
                                         .into())
}

/// Departure times are either plain seconds or an HH:MM:SS clock string.
fn parse_departure_time(row: &Row) -> Result<u32, Box<dyn Error>> {
    let value = field(row, "departure_time")?;
    if let Ok(seconds) = value.parse::<u32>() {
        return Ok(seconds);
    }
    config_utils::get_num_seconds_from_time_str(value)
        .ok_or_else(|| format!("bad departure time {:?}", value).into())
}

impl TripRecord {
    pub fn all_from_csv(csvpath: &Path) -> Result<Vec<TripRecord>, Box<dyn Error>> {
        let file = File::open(csvpath)?;
        TripRecord::all_from_reader(file)
    }

    pub fn all_from_reader<R: Read>(reader: R) -> Result<Vec<TripRecord>, Box<dyn Error>> {
        let mut reader = csv::Reader::from_reader(reader);
        let mut records = vec![];
        for (line_idx, result) in reader.deserialize().enumerate() {
            let row: Row = result?;
            let record = TripRecord::from_row(&row).map_err(|err| {
                // header is line 1
                format!("trip line {}: {}", line_idx + 2, err)
            })?;
            records.push(record);
        }
        Ok(records)
    }

    fn from_row(row: &Row) -> Result<TripRecord, Box<dyn Error>> {
        Ok(TripRecord {
            person_id: parse_field(row, "person_id")?,
            origin_fips: parse_field(row, "o_fips")?,
            origin: Coordinate::new(parse_field(row, "o_x")?, parse_field(row, "o_y")?),
            origin_latlon: LatLon::new(parse_field(row, "o_lat")?, parse_field(row, "o_lon")?),
            destination_fips: parse_field(row, "d_fips")?,
            destination: Coordinate::new(parse_field(row, "d_x")?, parse_field(row, "d_y")?),
            destination_latlon: LatLon::new(parse_field(row, "d_lat")?,
                                            parse_field(row, "d_lon")?),
            departure_time_s: parse_departure_time(row)?,
        })
    }
}

/// A trip record together with everything the pooling engine needs to know about it.
#[derive(PartialEq, Debug, Clone)]
pub struct Passenger {
    pub record: TripRecord,
    pub trip_distance: f64,
    pub trip_category: TripCategory,
    pub latest_pickup_time_s: u32,
    pub destination_super_pixel: Coordinate,
}

impl Passenger {
    pub fn new<PP: PoolingPolicy + ?Sized>(record: TripRecord, policy: &PP) -> Passenger {
        let trip_distance = trip_distance(&record.origin_latlon, &record.destination_latlon);
        let trip_category = policy.trip_category(trip_distance);
        let latest_pickup_time_s = record.departure_time_s + policy.max_wait_time_s(trip_distance);
        let destination_super_pixel = policy.super_pixel(&record.destination, trip_category);
        Passenger {
            record,
            trip_distance,
            trip_category,
            latest_pickup_time_s,
            destination_super_pixel,
        }
    }

    pub fn get_person_id(&self) -> i64 {
        self.record.person_id
    }

    pub fn get_origin(&self) -> Coordinate {
        self.record.origin
    }

    pub fn get_departure_time_s(&self) -> u32 {
        self.record.departure_time_s
    }

    pub fn is_walk(&self) -> bool {
        self.trip_category == TripCategory::Walk
    }

    /// Road distance from `latlon` to this passenger's destination.
    pub fn distance_to(&self, latlon: &LatLon) -> f64 {
        trip_distance(&self.record.destination_latlon, latlon)
    }
}
