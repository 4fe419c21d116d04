//! CSV output for the pooled trip table and every aggregate table.

use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};

use super::geometry::TripCategory;
use super::metrics::{MetricsAggregator, TimeBand, TimeBucket, SUPPLY_DEMAND_RESOLUTIONS};
use super::vehicles::{TripMiles, VehicleTrip};

pub const VEHICLE_TRIPS_FILE: &str = "vehicle_trips.csv";

fn fmt_float(value: f64) -> String {
    format!("{:.2}", value)
}

fn fmt_avo(avo: Option<f64>) -> String {
    match avo {
        Some(avo) => fmt_float(avo),
        None => String::from("NaN"),
    }
}

fn miles_record(key: String, miles: &TripMiles) -> [String; 4] {
    [key, fmt_float(miles.pmt), fmt_float(miles.vmt), fmt_avo(miles.avo())]
}

/// Writes closed vehicles one per row, at full precision.
pub fn write_vehicle_trips(path: &Path, trips: &[VehicleTrip]) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for trip in trips {
        wtr.serialize(trip)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn read_vehicle_trips(path: &Path) -> Result<Vec<VehicleTrip>, Box<dyn Error>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut trips = vec![];
    for result in reader.deserialize() {
        trips.push(result?);
    }
    Ok(trips)
}

pub fn write_county_avos(path: &Path, metrics: &MetricsAggregator) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&["county_fips", "pmt", "vmt", "avo"])?;
    for (fips, miles) in metrics.get_county_miles() {
        wtr.write_record(&miles_record(format!("{:05}", fips), miles))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_state_avos(path: &Path, metrics: &MetricsAggregator) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&["state_fips", "pmt", "vmt", "avo"])?;
    for (fips, miles) in metrics.get_state_miles() {
        wtr.write_record(&miles_record(format!("{:02}", fips), miles))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_region_avo(path: &Path, metrics: &MetricsAggregator) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&["avo"])?;
    wtr.write_record(&[fmt_avo(metrics.get_avo())])?;
    wtr.flush()?;
    Ok(())
}

pub fn write_region_totals(path: &Path, metrics: &MetricsAggregator)
                           -> Result<(), Box<dyn Error>> {
    let total = metrics.get_total();
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&["num_vehicles", "num_pooled_passengers", "pmt", "vmt", "avo"])?;
    wtr.write_record(&[metrics.get_num_vehicles().to_string(),
                       metrics.get_num_pooled_passengers().to_string(),
                       fmt_float(total.pmt), fmt_float(total.vmt), fmt_avo(total.avo())])?;
    wtr.flush()?;
    Ok(())
}

/// Trip counts per distance category, with the running total over shorter categories.
pub fn write_cumulative(path: &Path, metrics: &MetricsAggregator) -> Result<(), Box<dyn Error>> {
    let counts = metrics.get_category_counts();
    let cumulative = metrics.cumulative_category_counts();
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&["category", "count", "cumulative_count"])?;
    for category in TripCategory::ALL.iter() {
        let ii = category.index();
        wtr.write_record(&[category.label().to_string(), counts[ii].to_string(),
                           cumulative[ii].to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_distribution(path: &Path, key_header: &str, keys: &[String], buckets: &[TimeBucket])
                      -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&[key_header, "num_passengers", "pmt", "vmt"])?;
    for (key, bucket) in keys.iter().zip(buckets.iter()) {
        wtr.write_record(&[key.clone(), bucket.num_passengers.to_string(),
                           fmt_float(bucket.miles.pmt), fmt_float(bucket.miles.vmt)])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_avos(path: &Path, key_header: &str, keys: &[String], buckets: &[TimeBucket])
              -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&[key_header, "avo"])?;
    for (key, bucket) in keys.iter().zip(buckets.iter()) {
        wtr.write_record(&[key.clone(), fmt_avo(bucket.avo())])?;
    }
    wtr.flush()?;
    Ok(())
}

fn hour_keys(metrics: &MetricsAggregator) -> Vec<String> {
    (0..metrics.get_hours().len()).map(|hh| hh.to_string()).collect()
}

fn band_keys() -> Vec<String> {
    TimeBand::ALL.iter().map(|bb| bb.label().to_string()).collect()
}

pub fn write_hour_distribution(path: &Path, metrics: &MetricsAggregator)
                               -> Result<(), Box<dyn Error>> {
    write_distribution(path, "hour", &hour_keys(metrics), metrics.get_hours())
}

pub fn write_hour_avos(path: &Path, metrics: &MetricsAggregator) -> Result<(), Box<dyn Error>> {
    write_avos(path, "hour", &hour_keys(metrics), metrics.get_hours())
}

pub fn write_time_band_distribution(path: &Path, metrics: &MetricsAggregator)
                                    -> Result<(), Box<dyn Error>> {
    write_distribution(path, "time_band", &band_keys(), metrics.get_time_bands())
}

pub fn write_time_band_avos(path: &Path, metrics: &MetricsAggregator)
                            -> Result<(), Box<dyn Error>> {
    write_avos(path, "time_band", &band_keys(), metrics.get_time_bands())
}

pub fn supply_demand_file_name(resolution: i32) -> String {
    format!("supplydemand_{}x{}.csv", resolution, resolution)
}

pub fn write_supply_demand(path: &Path, metrics: &MetricsAggregator, resolution: i32)
                           -> Result<(), Box<dyn Error>> {
    let grid = metrics.get_supply_demand(resolution)
                      .ok_or_else(|| format!("no supply/demand grid at resolution {}",
                                             resolution))?;
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&["x", "y", "net_vehicles"])?;
    for flow in grid.sorted_flows() {
        wtr.write_record(&[flow.cell.x.to_string(), flow.cell.y.to_string(),
                           flow.net.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_active_vehicles(path: &Path, metrics: &MetricsAggregator)
                             -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&["minute", "time", "active_vehicles"])?;
    for (minute, count) in metrics.active_vehicle_counts().iter().enumerate() {
        let time = format!("{:02}:{:02}", minute / 60, minute % 60);
        wtr.write_record(&[minute.to_string(), time, count.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes every report into `output_dir`, creating it if needed. Returns the written paths.
pub fn write_all(output_dir: &Path, trips: &[VehicleTrip], metrics: &MetricsAggregator)
                 -> Result<Vec<PathBuf>, Box<dyn Error>> {
    std::fs::create_dir_all(output_dir)?;
    let mut written = vec![];
    let mut output = |name: &str| {
        let path = output_dir.join(name);
        written.push(path.clone());
        path
    };

    write_vehicle_trips(&output(VEHICLE_TRIPS_FILE), trips)?;
    write_county_avos(&output("county_avos.csv"), metrics)?;
    write_state_avos(&output("state_avos.csv"), metrics)?;
    write_region_avo(&output("region_avo.csv"), metrics)?;
    write_region_totals(&output("region_totals.csv"), metrics)?;
    write_cumulative(&output("cumulative.csv"), metrics)?;
    write_hour_distribution(&output("trip_distribution_hours.csv"), metrics)?;
    write_hour_avos(&output("avo_hours.csv"), metrics)?;
    write_time_band_distribution(&output("trip_distribution_time_bands.csv"), metrics)?;
    write_time_band_avos(&output("avo_time_bands.csv"), metrics)?;
    for &resolution in SUPPLY_DEMAND_RESOLUTIONS.iter() {
        write_supply_demand(&output(&supply_demand_file_name(resolution)), metrics,
                            resolution)?;
    }
    write_active_vehicles(&output("active_vehicles.csv"), metrics)?;

    log::info!("wrote {} reports to {}", written.len(), output_dir.display());
    Ok(written)
}
