//! Error types for the pooling engine and its configuration.

use thiserror::Error;

use super::geometry::Coordinate;

/// Internal-consistency violations. None of these can be produced by well-formed input, so the
/// batch run aborts when one is raised.
#[derive(Debug, Error, PartialEq)]
pub enum PoolingError {
    #[error("vehicle {vehicle} departs from {expected} but passenger {person} boards at {found}")]
    OriginMismatch {
        vehicle: u64,
        person: i64,
        expected: Coordinate,
        found: Coordinate,
    },

    #[error("vehicle {vehicle} serves super-pixel {expected} but passenger {person} is headed to {found}")]
    DestinationMismatch {
        vehicle: u64,
        person: i64,
        expected: Coordinate,
        found: Coordinate,
    },

    #[error("vehicle {vehicle} is already at its capacity of {capacity}")]
    VehicleFull { vehicle: u64, capacity: usize },

    #[error("vehicle {0} has already departed")]
    VehicleClosed(u64),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file is empty: {0}")]
    Empty(String),

    #[error("missing required config key: {0}")]
    MissingKey(&'static str),

    #[error("invalid value for config key {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue { key, reason: reason.into() }
    }
}
