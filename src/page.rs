//! The Leaflet map page served at `/`.

use crate::response::format_timestamp;
use chrono::NaiveDateTime;
use serde::Serialize;

const TEMPLATE: &str = include_str!("../assets/map.html");
const MARKERS_PLACEHOLDER: &str = "__MARKERS__";

/// A marker drawn on the map before anything is clicked.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExampleMarker {
    pub latitude: f64,
    pub longitude: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub time: String,
}

/// Los Angeles, New York and San Francisco, all stamped with `now`.
pub fn example_markers(now: NaiveDateTime) -> Vec<ExampleMarker> {
    let time = format_timestamp(now);
    [
        (34.05, -118.25, 25.0, 60.0),
        (40.71, -74.01, 20.0, 70.0),
        (37.77, -122.42, 18.0, 80.0),
    ]
    .into_iter()
    .map(|(latitude, longitude, temperature, humidity)| ExampleMarker {
        latitude,
        longitude,
        temperature,
        humidity,
        time: time.clone(),
    })
    .collect()
}

/// Renders the map page with the example markers inlined as a JSON array.
pub fn render(now: NaiveDateTime) -> Result<String, serde_json::Error> {
    let markers = serde_json::to_string(&example_markers(now))?;
    Ok(TEMPLATE.replacen(MARKERS_PLACEHOLDER, &markers, 1))
}
