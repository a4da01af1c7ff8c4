//! Seams between the resolver and the services it reads from.

use crate::error::MeteoMapError;
use crate::types::location::LatLon;
use crate::types::station::Station;
use crate::types::window::DateWindow;
use async_trait::async_trait;
use polars::frame::DataFrame;

/// Provides hourly observations for a coordinate.
#[async_trait]
pub trait ObservationSource: Send + Sync {
    /// Hourly rows for `location` inside `window`, oldest first.
    ///
    /// Columns are optional and may include `temp`, `rhum`, `prcp`, `tavg`, `tmin`
    /// and `tmax`. An empty frame means there is no data for the window.
    async fn hourly(
        &self,
        location: LatLon,
        window: &DateWindow,
    ) -> Result<DataFrame, MeteoMapError>;
}

/// Looks up weather stations by proximity.
#[async_trait]
pub trait StationDirectory: Send + Sync {
    /// Stations near `location`, closest first. May be empty.
    async fn nearby(&self, location: LatLon, limit: usize) -> Result<Vec<Station>, MeteoMapError>;
}
