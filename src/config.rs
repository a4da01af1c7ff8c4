//! Startup configuration of the map server.

use crate::meteostat::{StationSearch, DEFAULT_MAX_AGE};
use crate::resolver::DEFAULT_FALLBACK_STATION_NAME;
use crate::types::window::DateWindow;
use bon::Builder;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Address the server binds to unless told otherwise.
pub const DEFAULT_BIND: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 5000);

/// Fixed texts of the JSON error bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMessages {
    /// Body of the 404 sent when the window holds no observations.
    pub not_found: String,
    /// Body of every 500; never carries error details.
    pub internal: String,
}

impl Default for ResponseMessages {
    fn default() -> Self {
        Self {
            not_found: "Información no encontrada".to_string(),
            internal: "Internal server error".to_string(),
        }
    }
}

/// Everything the server needs at startup. Immutable once the server runs.
///
/// ```
/// use meteomap::ServerConfig;
///
/// let config = ServerConfig::builder().fallback_station_name("Somewhere").build();
/// assert_eq!(config.bind.port(), 5000);
/// assert_eq!(config.fallback_station_name, "Somewhere");
/// ```
#[derive(Debug, Clone, Builder)]
pub struct ServerConfig {
    #[builder(default = DEFAULT_BIND)]
    pub bind: SocketAddr,
    /// Folder for downloaded bulk files. `None` uses the platform cache directory.
    pub cache_dir: Option<PathBuf>,
    #[builder(default)]
    pub window: DateWindow,
    #[builder(into, default = DEFAULT_FALLBACK_STATION_NAME.to_string())]
    pub fallback_station_name: String,
    #[builder(default)]
    pub search: StationSearch,
    #[builder(default = DEFAULT_MAX_AGE)]
    pub max_age: Duration,
    #[builder(default)]
    pub messages: ResponseMessages,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
