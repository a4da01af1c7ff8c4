use crate::stations::error::LocateStationError;
use crate::weather_data::error::WeatherDataError;
use chrono::NaiveDateTime;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeteoMapError {
    #[error(transparent)]
    WeatherData(#[from] WeatherDataError),

    #[error(transparent)]
    LocateStation(#[from] LocateStationError),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine cache directory")]
    CacheDirResolution(#[source] std::io::Error),

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Invalid date window: start {start} is after end {end}")]
    InvalidWindow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("Window bound {0} is not on a whole hour")]
    UnalignedWindow(NaiveDateTime),

    #[error("Observation table is missing required column '{0}'")]
    MissingColumn(String),

    #[error("Failed processing observation table")]
    Frame(#[from] PolarsError),

    #[error("Fetching hourly data failed for all {stations_tried} stations within {radius} km of ({lat}, {lon})")]
    NoDataFoundForNearbyStations {
        radius: f64,
        lat: f64,
        lon: f64,
        stations_tried: usize,
        #[source]
        last_error: Box<MeteoMapError>,
    },
}
