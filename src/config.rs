use std::convert::TryFrom;
use std::error::Error;
use std::path::{Path, PathBuf};

use yaml_rust::{Yaml, YamlLoader};

use super::config_utils;
use super::error::ConfigError;
use super::geometry::{DEFAULT_CATEGORY_THRESHOLDS, DEFAULT_CELL_SIZES, DEFAULT_WAIT_THRESHOLDS,
                      DEFAULT_WAIT_TIMES_S, NUM_TRIP_CATEGORIES};
use super::pooling::TieBreak;
use super::vehicles::VmtStrategy;
use super::PoolingPolicy;

pub const DEFAULT_MAX_OCCUPANCY: usize = 5;
pub const DEFAULT_AVERAGE_SPEED_MPH: f64 = 30.;

#[derive(Clone, Debug, PartialEq)]
pub struct PoolingConfig {
    pub trips_dir: PathBuf,
    pub output_dir: PathBuf,
    pub max_occupancy: usize,
    pub category_thresholds: [f64; 4],
    pub wait_thresholds: [f64; 4],
    pub wait_times_s: [u32; 5],
    pub cell_sizes: [i32; NUM_TRIP_CATEGORIES],
    pub tie_break: TieBreak,
    pub vmt_strategy: VmtStrategy,
    pub average_speed_mph: f64,
}

impl Default for PoolingConfig {
    fn default() -> Self {
        PoolingConfig {
            trips_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            max_occupancy: DEFAULT_MAX_OCCUPANCY,
            category_thresholds: DEFAULT_CATEGORY_THRESHOLDS,
            wait_thresholds: DEFAULT_WAIT_THRESHOLDS,
            wait_times_s: DEFAULT_WAIT_TIMES_S,
            cell_sizes: DEFAULT_CELL_SIZES,
            tie_break: TieBreak::FirstMatch,
            vmt_strategy: VmtStrategy::Naive,
            average_speed_mph: DEFAULT_AVERAGE_SPEED_MPH,
        }
    }
}

impl PoolingConfig {
    pub fn from_file(path: &str) -> Result<PoolingConfig, Box<dyn Error>> {
        let file_contents = std::fs::read_to_string(path)?;
        let yaml_cfgs = YamlLoader::load_from_str(&file_contents)?;
        let yaml_cfg = yaml_cfgs.get(0).ok_or_else(|| ConfigError::Empty(path.to_string()))?;
        let config_dir = Path::new(path).parent().unwrap_or_else(|| Path::new("."));
        let config = PoolingConfig::from_yaml(yaml_cfg, config_dir)?;
        log::debug!("loaded config from {}: {:?}", path, config);
        Ok(config)
    }

    /// Reads a config from parsed yaml. Relative paths are resolved against `config_dir`.
    pub fn from_yaml(yaml_cfg: &Yaml, config_dir: &Path) -> Result<PoolingConfig, ConfigError> {
        let defaults = PoolingConfig::default();

        let trips_dir = read_scalar(yaml_cfg, "trips_dir", "a path", Yaml::as_str)?
            .ok_or(ConfigError::MissingKey("trips_dir"))?;
        let output_dir = read_scalar(yaml_cfg, "output_dir", "a path", Yaml::as_str)?
            .ok_or(ConfigError::MissingKey("output_dir"))?;

        let max_occupancy = match read_scalar(yaml_cfg, "max_occupancy", "an integer",
                                              Yaml::as_i64)? {
            Some(occ) if occ >= 1 => occ as usize,
            Some(occ) => return Err(ConfigError::invalid("max_occupancy",
                                                         format!("{} is not positive", occ))),
            None => defaults.max_occupancy,
        };

        let category_thresholds = read_f64_array(yaml_cfg, "category_thresholds")?
            .unwrap_or(defaults.category_thresholds);
        let wait_thresholds = read_f64_array(yaml_cfg, "wait_time_thresholds")?
            .unwrap_or(defaults.wait_thresholds);
        let wait_times_s = match read_int_array::<5>(yaml_cfg, "wait_times_s")? {
            Some(arr) => {
                let mut out = [0u32; 5];
                for (oo, ww) in out.iter_mut().zip(arr.iter()) {
                    *oo = u32::try_from(*ww).map_err(|_| {
                        ConfigError::invalid("wait_times_s", format!("{} s is too long", ww))
                    })?;
                }
                out
            }
            None => defaults.wait_times_s,
        };
        let cell_sizes = match read_int_array::<NUM_TRIP_CATEGORIES>(yaml_cfg,
                                                                     "super_pixel_cell_sizes")? {
            Some(arr) => {
                let mut out = [0i32; NUM_TRIP_CATEGORIES];
                for (oo, cs) in out.iter_mut().zip(arr.iter()) {
                    *oo = i32::try_from(*cs).ok().filter(|size| *size >= 1).ok_or_else(|| {
                        ConfigError::invalid("super_pixel_cell_sizes",
                                             format!("{} is not a usable cell size", cs))
                    })?;
                }
                out
            }
            None => defaults.cell_sizes,
        };

        let tie_break = match read_scalar(yaml_cfg, "tie_break", "a name", Yaml::as_str)? {
            Some(name) => name.parse::<TieBreak>()
                              .map_err(|err| ConfigError::invalid("tie_break", err))?,
            None => defaults.tie_break,
        };
        let vmt_strategy = match read_scalar(yaml_cfg, "vmt_strategy", "a name", Yaml::as_str)? {
            Some(name) => name.parse::<VmtStrategy>()
                          .map_err(|err| ConfigError::invalid("vmt_strategy", err))?,
            None => defaults.vmt_strategy,
        };
        let average_speed_mph = match read_scalar(yaml_cfg, "average_speed_mph", "a number",
                                                  as_number)? {
            Some(speed) if speed > 0. => speed,
            Some(speed) => return Err(ConfigError::invalid("average_speed_mph",
                                                           format!("{} is not positive", speed))),
            None => defaults.average_speed_mph,
        };

        Ok(PoolingConfig {
            trips_dir: config_utils::str_to_absolute_path(trips_dir, config_dir),
            output_dir: config_utils::str_to_absolute_path(output_dir, config_dir),
            max_occupancy,
            category_thresholds,
            wait_thresholds,
            wait_times_s,
            cell_sizes,
            tie_break,
            vmt_strategy,
            average_speed_mph,
        })
    }
}

impl PoolingPolicy for PoolingConfig {
    fn get_max_occupancy(&self) -> usize {
        self.max_occupancy
    }

    fn get_category_thresholds(&self) -> &[f64; 4] {
        &self.category_thresholds
    }

    fn get_wait_thresholds(&self) -> &[f64; 4] {
        &self.wait_thresholds
    }

    fn get_wait_times_s(&self) -> &[u32; 5] {
        &self.wait_times_s
    }

    fn get_cell_sizes(&self) -> &[i32; NUM_TRIP_CATEGORIES] {
        &self.cell_sizes
    }

    fn get_tie_break(&self) -> TieBreak {
        self.tie_break
    }

    fn get_vmt_strategy(&self) -> VmtStrategy {
        self.vmt_strategy
    }
}

// yaml-rust keeps `2` and `2.0` apart, so accept either
fn as_number(yaml: &Yaml) -> Option<f64> {
    yaml.as_f64().or_else(|| yaml.as_i64().map(|vv| vv as f64))
}

/// A missing key gives `None`; a key holding the wrong kind of value is an error.
fn read_scalar<'a, T, F>(yaml_cfg: &'a Yaml, key: &'static str, expected: &str, extract: F)
                         -> Result<Option<T>, ConfigError>
    where F: Fn(&'a Yaml) -> Option<T>
{
    let value = &yaml_cfg[key];
    if value.is_badvalue() || value.is_null() {
        return Ok(None);
    }
    match extract(value) {
        Some(extracted) => Ok(Some(extracted)),
        None => Err(ConfigError::invalid(key, format!("expected {}", expected))),
    }
}

fn read_f64_array<const N: usize>(yaml_cfg: &Yaml, key: &'static str)
                                  -> Result<Option<[f64; N]>, ConfigError> {
    let values = match yaml_cfg[key].as_vec() {
        Some(values) => values,
        None if yaml_cfg[key].is_badvalue() => return Ok(None),
        None => return Err(ConfigError::invalid(key, "expected a list")),
    };
    if values.len() != N {
        return Err(ConfigError::invalid(key, format!("expected {} values, got {}", N,
                                                     values.len())));
    }
    let mut out = [0.; N];
    for (oo, vv) in out.iter_mut().zip(values.iter()) {
        *oo = as_number(vv).ok_or_else(|| ConfigError::invalid(key, "expected numbers"))?;
    }
    if out.windows(2).any(|ww| ww[0] >= ww[1]) {
        return Err(ConfigError::invalid(key, "thresholds must be strictly increasing"));
    }
    Ok(Some(out))
}

fn read_int_array<const N: usize>(yaml_cfg: &Yaml, key: &'static str)
                                  -> Result<Option<[i64; N]>, ConfigError> {
    let values = match yaml_cfg[key].as_vec() {
        Some(values) => values,
        None if yaml_cfg[key].is_badvalue() => return Ok(None),
        None => return Err(ConfigError::invalid(key, "expected a list")),
    };
    if values.len() != N {
        return Err(ConfigError::invalid(key, format!("expected {} values, got {}", N,
                                                     values.len())));
    }
    let mut out = [0; N];
    for (oo, vv) in out.iter_mut().zip(values.iter()) {
        *oo = vv.as_i64().filter(|ii| *ii >= 0)
                .ok_or_else(|| ConfigError::invalid(key, "expected non-negative integers"))?;
    }
    Ok(Some(out))
}
