//! Turns a clicked coordinate into the latest observation near it.

use crate::error::MeteoMapError;
use crate::source::{ObservationSource, StationDirectory};
use crate::types::location::LatLon;
use crate::types::schema::{COL_PRCP, COL_RHUM, COL_TAVG, COL_TEMP, COL_TMAX, COL_TMIN};
use crate::types::window::DateWindow;
use bon::Builder;
use log::info;
use polars::prelude::{Column, DataFrame, DataType};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Station name used when the directory has no station near the coordinate.
pub const DEFAULT_FALLBACK_STATION_NAME: &str = "Unknown station";

/// Precipitation of an observation, or the placeholder when none was reported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Precipitation {
    Measured(f64),
    NotAvailable,
}

impl Precipitation {
    pub const PLACEHOLDER: &'static str = "N/A";
}

impl Serialize for Precipitation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Precipitation::Measured(mm) => serializer.serialize_f64(*mm),
            Precipitation::NotAvailable => serializer.serialize_str(Self::PLACEHOLDER),
        }
    }
}

impl fmt::Display for Precipitation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precipitation::Measured(mm) => write!(f, "{mm} mm"),
            Precipitation::NotAvailable => f.write_str(Self::PLACEHOLDER),
        }
    }
}

/// The latest observation with temperature, humidity and precipitation.
#[derive(Debug, Clone, PartialEq)]
pub struct FullRecord {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub precipitation: Precipitation,
    pub station_name: String,
}

/// What is left when the table has no humidity column: a listing of the columns and
/// a printout of the last row's average/min/max temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct DegradedRecord {
    pub column_info: String,
    pub temperature_data: String,
    pub precipitation: Precipitation,
    pub station_name: String,
}

/// Outcome of resolving one coordinate. Exactly one variant per request.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherResult {
    Full(FullRecord),
    Degraded(DegradedRecord),
    /// No observations in the window. The station name is kept for callers that want it.
    Empty { station_name: String },
}

impl WeatherResult {
    /// Reduces an oldest-first observation table to the result for its last row.
    ///
    /// # Errors
    ///
    /// [`MeteoMapError::MissingColumn`] when the table has neither `rhum` nor all of
    /// `tavg`/`tmin`/`tmax`; [`MeteoMapError::Frame`] when a column cannot be read as
    /// a number.
    pub fn from_observations(
        observations: &DataFrame,
        station_name: String,
    ) -> Result<Self, MeteoMapError> {
        if observations.height() == 0 {
            return Ok(WeatherResult::Empty { station_name });
        }

        let last = observations.tail(Some(1));

        if has_column(&last, COL_RHUM) {
            let precipitation = match optional_f64(&last, COL_PRCP)? {
                Some(mm) => Precipitation::Measured(mm),
                None => Precipitation::NotAvailable,
            };
            return Ok(WeatherResult::Full(FullRecord {
                temperature: optional_f64(&last, COL_TEMP)?,
                humidity: optional_f64(&last, COL_RHUM)?,
                precipitation,
                station_name,
            }));
        }

        for column in [COL_TAVG, COL_TMIN, COL_TMAX] {
            if !has_column(&last, column) {
                return Err(MeteoMapError::MissingColumn(column.to_string()));
            }
        }
        let column_info = format!(
            "Available columns in weather data:\n{}",
            column_names(observations).join(", ")
        );
        let temperature_data = last.select([COL_TAVG, COL_TMIN, COL_TMAX])?.to_string();

        Ok(WeatherResult::Degraded(DegradedRecord {
            column_info,
            temperature_data,
            precipitation: Precipitation::NotAvailable,
            station_name,
        }))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            WeatherResult::Full(_) => "full",
            WeatherResult::Degraded(_) => "degraded",
            WeatherResult::Empty { .. } => "empty",
        }
    }
}

fn column_names(frame: &DataFrame) -> Vec<&str> {
    frame.get_column_names().into_iter().map(|c| c.as_str()).collect()
}

fn has_column(frame: &DataFrame, name: &str) -> bool {
    column_names(frame).contains(&name)
}

/// Value of `name` in the first row as `f64`; `None` when the column is absent or null.
fn optional_f64(frame: &DataFrame, name: &str) -> Result<Option<f64>, MeteoMapError> {
    if !has_column(frame, name) {
        return Ok(None);
    }
    let column: &Column = frame.column(name)?;
    let as_float = column.cast(&DataType::Float64)?;
    Ok(as_float.f64()?.get(0).filter(|v| v.is_finite()))
}

/// Resolves coordinates against an observation source and a station directory over a
/// fixed window.
///
/// # Examples
///
/// ```no_run
/// # use std::sync::Arc;
/// # use meteomap::{DateWindow, LatLon, MeteostatSource, MeteoMapError, WeatherResolver};
/// # async fn run() -> Result<(), MeteoMapError> {
/// let source = Arc::new(MeteostatSource::open().call().await?);
/// let resolver = WeatherResolver::builder()
///     .observations(source.clone())
///     .stations(source)
///     .window(DateWindow::default())
///     .build();
///
/// let result = resolver.resolve(LatLon::new(34.05, -118.25)?).await?;
/// println!("{:?}", result);
/// # Ok(())
/// # }
/// ```
#[derive(Builder, Clone)]
pub struct WeatherResolver {
    observations: Arc<dyn ObservationSource>,
    stations: Arc<dyn StationDirectory>,
    window: DateWindow,
    #[builder(into, default = DEFAULT_FALLBACK_STATION_NAME.to_string())]
    fallback_station_name: String,
}

impl WeatherResolver {
    /// Fetches observations, then the nearest station name, and reduces them.
    ///
    /// # Errors
    ///
    /// Any error of the observation source or station directory is returned unchanged;
    /// nothing is retried.
    pub async fn resolve(&self, location: LatLon) -> Result<WeatherResult, MeteoMapError> {
        let observations = self.observations.hourly(location, &self.window).await?;

        let station_name = self
            .stations
            .nearby(location, 1)
            .await?
            .first()
            .map(|station| station.display_name())
            .unwrap_or_else(|| self.fallback_station_name.clone());

        let result = WeatherResult::from_observations(&observations, station_name)?;
        info!(
            "Resolved {} to a {} record ({} rows in {})",
            location,
            result.kind(),
            observations.height(),
            self.window
        );
        Ok(result)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::types::station::test_support::station;
    use crate::types::station::Station;
    use crate::weather_data::error::WeatherDataError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves a fixed table (or a fixed failure) and counts calls.
    pub(crate) struct FixedObservations {
        pub(crate) frame: Option<DataFrame>,
        pub(crate) calls: AtomicUsize,
    }

    impl FixedObservations {
        pub(crate) fn new(frame: DataFrame) -> Self {
            Self {
                frame: Some(frame),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                frame: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ObservationSource for FixedObservations {
        async fn hourly(
            &self,
            _location: LatLon,
            _window: &DateWindow,
        ) -> Result<DataFrame, MeteoMapError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.frame.clone().ok_or_else(|| {
                MeteoMapError::from(WeatherDataError::DownloadIo(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                )))
            })
        }
    }

    pub(crate) struct FixedStations(pub(crate) Vec<Station>);

    impl FixedStations {
        pub(crate) fn named(name: &str) -> Self {
            Self(vec![station("00000", name, 0.0, 0.0)])
        }
    }

    #[async_trait]
    impl StationDirectory for FixedStations {
        async fn nearby(
            &self,
            _location: LatLon,
            limit: usize,
        ) -> Result<Vec<Station>, MeteoMapError> {
            Ok(self.0.iter().take(limit).cloned().collect())
        }
    }

    pub(crate) fn resolver(
        observations: FixedObservations,
        stations: FixedStations,
    ) -> WeatherResolver {
        WeatherResolver::builder()
            .observations(Arc::new(observations))
            .stations(Arc::new(stations))
            .window(DateWindow::default())
            .build()
    }
}
