//! Meteostat weather station metadata as published in the bulk station list,
//! plus the `rstar` integration used for nearest-station lookups.

use crate::types::window::DateWindow;
use chrono::NaiveDate;
use rstar::{PointDistance, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single Meteostat weather station.
///
/// Mirrors one entry of `stations/lite.json.gz`. Only `name` and `location` are
/// needed to answer a map click; `inventory` decides whether a station is worth
/// downloading hourly data for.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    /// The unique Meteostat station identifier (e.g., "72295").
    pub id: String,
    /// The country code where the station is located (e.g., "US").
    pub country: String,
    pub region: Option<String>,
    pub timezone: Option<String>,
    /// Station names keyed by language code (e.g., {"en": "Los Angeles Airport"}).
    pub name: HashMap<String, String>,
    pub identifiers: Identifiers,
    pub location: Location,
    pub inventory: Inventory,
}

impl Station {
    /// Human-readable name: English if present, else any localized name, else the id.
    pub fn display_name(&self) -> String {
        self.name
            .get("en")
            .or_else(|| {
                let mut languages: Vec<&String> = self.name.keys().collect();
                languages.sort();
                languages.first().and_then(|lang| self.name.get(*lang))
            })
            .cloned()
            .unwrap_or_else(|| self.id.clone())
    }

    /// Whether the station's reported hourly inventory spans the whole window.
    ///
    /// Based on Meteostat's metadata only; gaps inside the range are possible.
    pub fn has_hourly_coverage(&self, window: &DateWindow) -> bool {
        let (Some(start), Some(end)) = (self.inventory.hourly.start, self.inventory.hourly.end)
        else {
            return false;
        };
        start <= window.start().date() && end >= window.end().date()
    }
}

/// Data availability ranges per frequency.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Inventory {
    pub daily: DateRange,
    pub hourly: DateRange,
    pub model: DateRange,
    pub monthly: YearRange,
    pub normals: YearRange,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct YearRange {
    pub start: Option<i32>,
    pub end: Option<i32>,
}

/// Alternative identifiers (national, WMO, ICAO) of a station.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Identifiers {
    pub national: Option<String>,
    pub wmo: Option<String>,
    pub icao: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Latitude in decimal degrees (positive for North, negative for South).
    pub latitude: f64,
    /// Longitude in decimal degrees (positive for East, negative for West).
    pub longitude: f64,
    /// Elevation above sea level in meters, if available.
    pub elevation: Option<i32>,
}

impl RTreeObject for Station {
    type Envelope = AABB<[f64; 2]>;

    /// A station is a point, so its envelope is a degenerate box at `[lat, lon]`.
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.location.latitude, self.location.longitude])
    }
}

impl PointDistance for Station {
    /// Squared Euclidean distance in degree space.
    ///
    /// Only used to order R-tree candidates; final ranking uses haversine kilometers.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.location.latitude - point[0];
        let dy = self.location.longitude - point[1];
        dx * dx + dy * dy
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::station;
    use super::*;

    #[test]
    fn display_name_prefers_english() {
        let mut s = station("72295", "Los Angeles", 33.93, -118.4);
        s.name.insert("es".to_string(), "Los Ángeles".to_string());
        assert_eq!(s.display_name(), "Los Angeles");
    }

    #[test]
    fn display_name_falls_back_to_other_language_then_id() {
        let mut s = station("76225", "unused", 28.7, -106.07);
        s.name = HashMap::from([("es".to_string(), "Chihuahua".to_string())]);
        assert_eq!(s.display_name(), "Chihuahua");

        s.name.clear();
        assert_eq!(s.display_name(), "76225");
    }

    #[test]
    fn hourly_coverage_checks_both_ends() {
        let window = DateWindow::default();
        let mut s = station("72295", "Los Angeles", 33.93, -118.4);
        assert!(s.has_hourly_coverage(&window));

        s.inventory.hourly.end = NaiveDate::from_ymd_opt(2024, 8, 19);
        assert!(!s.has_hourly_coverage(&window));

        s.inventory.hourly = DateRange::default();
        assert!(!s.has_hourly_coverage(&window));
    }

    #[test]
    fn deserializes_lite_json_entry() {
        let json = r#"{
            "id": "72295",
            "country": "US",
            "region": "CA",
            "timezone": "America/Los_Angeles",
            "name": {"en": "Los Angeles International Airport"},
            "identifiers": {"national": null, "wmo": "72295", "icao": "KLAX"},
            "location": {"latitude": 33.9333, "longitude": -118.4, "elevation": 32},
            "inventory": {
                "daily": {"start": "1944-01-01", "end": "2025-04-01"},
                "hourly": {"start": "1973-01-01", "end": "2025-04-06"},
                "model": {"start": null, "end": null},
                "monthly": {"start": 1944, "end": 2024},
                "normals": {"start": 1991, "end": 2020}
            }
        }"#;
        let s: Station = serde_json::from_str(json).unwrap();
        assert_eq!(s.identifiers.icao.as_deref(), Some("KLAX"));
        assert_eq!(s.location.elevation, Some(32));
        assert!(s.has_hourly_coverage(&DateWindow::default()));
    }
}
