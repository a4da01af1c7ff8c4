//! Meteostat-backed implementation of the observation source and station directory.
//!
//! Stations come from the Meteostat bulk station list, observations from the per-station
//! hourly bulk files. Both are stored under one cache folder and refreshed once they are
//! older than the configured maximum age.

use crate::error::MeteoMapError;
use crate::source::{ObservationSource, StationDirectory};
use crate::stations::locate_station::StationLocator;
use crate::types::location::LatLon;
use crate::types::station::Station;
use crate::types::window::DateWindow;
use crate::utils::{ensure_cache_dir_exists, get_cache_dir};
use crate::weather_data::data_loader::WeatherDataLoader;
use async_trait::async_trait;
use bon::bon;
use log::{debug, info, warn};
use polars::frame::DataFrame;
use std::path::PathBuf;
use std::time::Duration;

/// Default maximum age of stored bulk files before they are downloaded again.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Distances and counts used when searching for stations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationSearch {
    /// Radius for the nearest-station name lookup.
    pub station_radius_km: f64,
    /// Radius for stations that may supply observations for a point.
    pub observation_radius_km: f64,
    /// How many stations to try, closest first, when looking for observations.
    pub observation_stations: usize,
}

impl Default for StationSearch {
    fn default() -> Self {
        Self {
            station_radius_km: 500.0,
            observation_radius_km: 35.0,
            observation_stations: 4,
        }
    }
}

/// Reads observations and stations from the Meteostat bulk data service.
///
/// # Examples
///
/// ```no_run
/// # use meteomap::{MeteostatSource, MeteoMapError};
/// # async fn run() -> Result<(), MeteoMapError> {
/// // Default cache folder, 24 h maximum age, default search radii
/// let source = MeteostatSource::open().call().await?;
/// # Ok(())
/// # }
/// ```
pub struct MeteostatSource {
    loader: WeatherDataLoader,
    station_locator: StationLocator,
    search: StationSearch,
}

#[bon]
impl MeteostatSource {
    /// Prepares the cache folder and loads (or downloads) the station list.
    ///
    /// # Errors
    ///
    /// Returns [`MeteoMapError::CacheDirResolution`] when no cache folder is given and the
    /// platform cache directory cannot be found, [`MeteoMapError::CacheDirCreation`] when
    /// the folder cannot be created, and [`MeteoMapError::LocateStation`] when the station
    /// list cannot be loaded.
    #[builder]
    pub async fn open(
        cache_folder: Option<PathBuf>,
        max_age: Option<Duration>,
        search: Option<StationSearch>,
    ) -> Result<Self, MeteoMapError> {
        let cache_folder = match cache_folder {
            Some(folder) => folder,
            None => get_cache_dir().map_err(MeteoMapError::CacheDirResolution)?,
        };
        let max_age = max_age.unwrap_or(DEFAULT_MAX_AGE);

        ensure_cache_dir_exists(&cache_folder)
            .await
            .map_err(|e| MeteoMapError::CacheDirCreation(cache_folder.clone(), e))?;

        Ok(Self {
            station_locator: StationLocator::new(&cache_folder, max_age).await?,
            loader: WeatherDataLoader::new(&cache_folder, max_age),
            search: search.unwrap_or_default(),
        })
    }

    pub fn from_parts(
        loader: WeatherDataLoader,
        station_locator: StationLocator,
        search: StationSearch,
    ) -> Self {
        Self {
            loader,
            station_locator,
            search,
        }
    }

    pub fn station_count(&self) -> usize {
        self.station_locator.len()
    }
}

#[async_trait]
impl ObservationSource for MeteostatSource {
    /// Rows from the closest station with hourly coverage of `window` that actually has
    /// data in it. Stations that fail to load are skipped; if all of them fail, the last
    /// error is returned.
    async fn hourly(
        &self,
        location: LatLon,
        window: &DateWindow,
    ) -> Result<DataFrame, MeteoMapError> {
        let candidates = self.station_locator.query(
            location.latitude(),
            location.longitude(),
            self.search.observation_stations,
            self.search.observation_radius_km,
            Some(window),
        );

        if candidates.is_empty() {
            info!(
                "No station with hourly data for {} within {} km of {}",
                window, self.search.observation_radius_km, location
            );
            return Ok(DataFrame::empty());
        }

        let mut last_error: Option<MeteoMapError> = None;
        let mut empty_frame: Option<DataFrame> = None;

        for (station, distance_km) in &candidates {
            match self.loader.hourly_window(&station.id, window).await {
                Ok(frame) if frame.height() > 0 => {
                    info!(
                        "Using {} rows from station {} ({:.1} km away)",
                        frame.height(),
                        station.id,
                        distance_km
                    );
                    return Ok(frame);
                }
                Ok(frame) => {
                    debug!("Station {} has no rows in {}", station.id, window);
                    empty_frame.get_or_insert(frame);
                }
                Err(e) => {
                    warn!("Hourly data for station {} unavailable: {}", station.id, e);
                    last_error = Some(e.into());
                }
            }
        }

        match (empty_frame, last_error) {
            (Some(frame), _) => Ok(frame),
            (None, Some(last_error)) => Err(MeteoMapError::NoDataFoundForNearbyStations {
                radius: self.search.observation_radius_km,
                lat: location.latitude(),
                lon: location.longitude(),
                stations_tried: candidates.len(),
                last_error: Box::new(last_error),
            }),
            (None, None) => Ok(DataFrame::empty()),
        }
    }
}

#[async_trait]
impl StationDirectory for MeteostatSource {
    async fn nearby(&self, location: LatLon, limit: usize) -> Result<Vec<Station>, MeteoMapError> {
        Ok(self
            .station_locator
            .query(
                location.latitude(),
                location.longitude(),
                limit,
                self.search.station_radius_km,
                None,
            )
            .into_iter()
            .map(|(station, _distance)| station)
            .collect())
    }
}
