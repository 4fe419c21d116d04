use std::path::Path;
use std::path::PathBuf;

use glob::glob;


pub fn str_to_absolute_path(path_str: &str, default_base_dir: &Path) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        return path;
    } else {
        return [default_base_dir, Path::new(&path)].iter().collect();
    }
}

/// Lists the csv files in `dir`, sorted by name so runs are reproducible.
pub fn csv_files_in_dir(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let pattern = dir.join("*.csv");
    let pattern = pattern.to_str().ok_or("trips directory is not valid unicode")?;
    let mut paths = vec![];
    for entry in glob(pattern)? {
        paths.push(entry?);
    }
    paths.sort();
    Ok(paths)
}

pub fn get_num_seconds_from_time_str(timestr: &str) -> Option<u32> {
    let parts: Vec<&str> = timestr.split(":").collect();
    if parts.len() != 3 {
        return None;
    }
    let hours: u32 = parts[0].parse().ok()?;
    let minutes: u32 = parts[1].parse().ok()?;
    let seconds: u32 = parts[2].parse().ok()?;
    // absurd hour counts in a trip row must not wrap around
    hours.checked_mul(3600)?
         .checked_add(minutes.checked_mul(60)?)?
         .checked_add(seconds)
}
