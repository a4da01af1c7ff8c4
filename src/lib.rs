//! Backend of an interactive weather map.
//!
//! `GET /` serves a Leaflet map; clicking it calls `GET /add_marker?lat=..&lon=..`,
//! which looks up the latest hourly observation near the point in a fixed window,
//! together with the name of the nearest weather station, and answers with JSON.
//!
//! Observations and stations come from the Meteostat bulk data service through
//! [`MeteostatSource`]; anything implementing [`ObservationSource`] and
//! [`StationDirectory`] can stand in for it.
//!
//! ```
//! use meteomap::{LatLon, MeteoMapError};
//!
//! let la = LatLon::new(34.05, -118.25)?;
//! assert_eq!(la.latitude(), 34.05);
//! assert!(LatLon::new(95.0, 0.0).is_err());
//! # Ok::<(), MeteoMapError>(())
//! ```

mod config;
mod error;
mod meteostat;
mod page;
mod resolver;
mod response;
mod source;
mod stations;
mod types;
mod utils;
mod weather_data;
mod web;

pub use config::{ResponseMessages, ServerConfig, DEFAULT_BIND};
pub use error::MeteoMapError;
pub use meteostat::{MeteostatSource, StationSearch, DEFAULT_MAX_AGE};
pub use page::{example_markers, render as render_page, ExampleMarker};
pub use resolver::{
    DegradedRecord, FullRecord, Precipitation, WeatherResolver, WeatherResult,
    DEFAULT_FALLBACK_STATION_NAME,
};
pub use response::{
    format_timestamp, internal_error, shape, MarkerBody, ShapedResponse, TIMESTAMP_FORMAT,
};
pub use source::{ObservationSource, StationDirectory};
pub use web::{router, ApiError, AppState, MarkerQuery};

pub use stations::locate_station::StationLocator;
pub use types::location::LatLon;
pub use types::station::*;
pub use types::window::DateWindow;
pub use weather_data::data_loader::WeatherDataLoader;

pub use stations::error::LocateStationError;
pub use weather_data::error::WeatherDataError;
