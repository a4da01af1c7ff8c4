//! Command-line flags of the `meteomap` server.

use chrono::NaiveDateTime;
use clap::Parser;
use meteomap::{DateWindow, MeteoMapError, ResponseMessages, ServerConfig, StationSearch};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Interactive weather map: click a point, get the latest nearby observation.
#[derive(Parser, Debug)]
#[command(name = "meteomap")]
#[command(version, about)]
pub struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// Folder for downloaded Meteostat bulk files [default: platform cache dir]
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// First hour of the observation window (inclusive)
    #[arg(long, default_value = "2024-08-19T00:00:00")]
    pub start: NaiveDateTime,

    /// Last hour of the observation window (inclusive)
    #[arg(long, default_value = "2024-08-20T00:00:00")]
    pub end: NaiveDateTime,

    /// Station name reported when no station is near the clicked point
    #[arg(long, default_value = meteomap::DEFAULT_FALLBACK_STATION_NAME)]
    pub fallback_station_name: String,

    /// Error text of the 404 answer
    #[arg(long, default_value = "Información no encontrada")]
    pub not_found_message: String,

    /// Error text of the 500 answer
    #[arg(long, default_value = "Internal server error")]
    pub internal_message: String,

    /// Search radius for the nearest station name, in km
    #[arg(long, default_value_t = 500.0)]
    pub station_radius_km: f64,

    /// Search radius for stations supplying observations, in km
    #[arg(long, default_value_t = 35.0)]
    pub observation_radius_km: f64,

    /// How many nearby stations to try for observations
    #[arg(long, default_value_t = 4)]
    pub observation_stations: usize,

    /// Re-download bulk files older than this many hours
    #[arg(long, default_value_t = 24)]
    pub max_age_hours: u64,
}

impl Cli {
    pub fn into_config(self) -> Result<ServerConfig, MeteoMapError> {
        let window = DateWindow::new(self.start, self.end)?;
        Ok(ServerConfig::builder()
            .bind(self.bind)
            .maybe_cache_dir(self.cache_dir)
            .window(window)
            .fallback_station_name(self.fallback_station_name)
            .search(StationSearch {
                station_radius_km: self.station_radius_km,
                observation_radius_km: self.observation_radius_km,
                observation_stations: self.observation_stations,
            })
            .max_age(Duration::from_secs(self.max_age_hours.saturating_mul(60 * 60)))
            .messages(ResponseMessages {
                not_found: self.not_found_message,
                internal: self.internal_message,
            })
            .build())
    }
}
