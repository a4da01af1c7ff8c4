use crate::stations::error::LocateStationError;
use crate::types::station::Station;
use crate::types::window::DateWindow;
use crate::utils::temp_file_beside;
use async_compression::tokio::bufread::GzipDecoder;
use bincode::config::{Configuration, Fixint, LittleEndian};
use futures_util::TryStreamExt;
use haversine::{distance, Location as HaversineLocation, Units};
use log::{info, warn};
use ordered_float::OrderedFloat;
use reqwest::Client;
use rstar::RTree;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncReadExt, BufReader};
use tokio_util::io::StreamReader;

const DATA_URL: &str = "https://bulk.meteostat.net/v2/stations/lite.json.gz";
const BINCODE_CACHE_FILE_NAME: &str = "stations_lite.bin";
const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

/// Spatial index over the Meteostat station list.
#[derive(Debug, Clone)]
pub struct StationLocator {
    rtree: RTree<Station>,
}

// Heap entry ordered by distance only.
struct StationCandidate<'a> {
    distance_km: OrderedFloat<f64>,
    station: &'a Station,
}
impl PartialEq for StationCandidate<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.distance_km == other.distance_km
    }
}
impl Eq for StationCandidate<'_> {}
impl PartialOrd for StationCandidate<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for StationCandidate<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_km.cmp(&other.distance_km)
    }
}

fn haversine_km(latitude: f64, longitude: f64, station: &Station) -> f64 {
    distance(
        HaversineLocation {
            latitude,
            longitude,
        },
        HaversineLocation {
            latitude: station.location.latitude,
            longitude: station.location.longitude,
        },
        Units::Kilometers,
    )
}

impl StationLocator {
    /// Loads the station list from `cache_dir`, downloading it first when the stored
    /// copy is missing or older than `max_age`.
    pub async fn new(cache_dir: &Path, max_age: Duration) -> Result<Self, LocateStationError> {
        let cache_file = cache_dir.join(BINCODE_CACHE_FILE_NAME);

        let stations = if Self::is_fresh(&cache_file, max_age).await? {
            let path_clone = cache_file.clone();
            tokio::task::spawn_blocking(move || Self::get_cached_stations(&path_clone)).await??
        } else {
            info!("Station list missing or stale, fetching from {}", DATA_URL);
            let stations = Self::fetch_stations().await?;
            Self::cache_stations(stations.clone(), &cache_file).await?;
            stations
        };

        info!("Indexed {} stations", stations.len());
        Ok(Self::from_stations(stations))
    }

    /// Builds an index over an already loaded list.
    pub fn from_stations(stations: Vec<Station>) -> Self {
        StationLocator {
            rtree: RTree::bulk_load(stations),
        }
    }

    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }

    async fn is_fresh(cache_file: &Path, max_age: Duration) -> Result<bool, LocateStationError> {
        let metadata = match tokio::fs::metadata(cache_file).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(LocateStationError::CacheMetadataRead(
                    cache_file.to_path_buf(),
                    e,
                ))
            }
        };
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| modified.elapsed().ok());
        match age {
            Some(age) => Ok(age <= max_age),
            None => {
                warn!(
                    "Could not determine age of {}, treating it as stale",
                    cache_file.display()
                );
                Ok(false)
            }
        }
    }

    fn get_cached_stations(cache_path: &Path) -> Result<Vec<Station>, LocateStationError> {
        let bytes = std::fs::read(cache_path)
            .map_err(|e| LocateStationError::CacheRead(cache_path.to_path_buf(), e))?;
        let (decoded_stations, _) =
            bincode::serde::decode_from_slice::<Vec<Station>, _>(&bytes, BINCODE_CONFIG).map_err(
                |e| LocateStationError::CacheDecode(cache_path.to_path_buf(), Box::from(e)),
            )?;
        Ok(decoded_stations)
    }

    async fn fetch_stations() -> Result<Vec<Station>, LocateStationError> {
        let client = Client::new();
        let response = client
            .get(DATA_URL)
            .send()
            .await
            .map_err(|e| LocateStationError::NetworkRequest(DATA_URL.to_string(), e))?;
        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                return Err(match e.status() {
                    Some(status) => LocateStationError::HttpStatus {
                        url: DATA_URL.to_string(),
                        status,
                        source: e,
                    },
                    None => LocateStationError::NetworkRequest(DATA_URL.to_string(), e),
                });
            }
        };
        let stream = response.bytes_stream().map_err(io::Error::other);
        let stream_reader = StreamReader::new(stream);
        let gzip_decoder = GzipDecoder::new(BufReader::new(stream_reader));
        let mut decoder_reader = BufReader::new(gzip_decoder);
        let mut decompressed_json = Vec::with_capacity(20_000_000);
        decoder_reader.read_to_end(&mut decompressed_json).await?;

        let parse_start = std::time::Instant::now();
        let stations = tokio::task::spawn_blocking(move || {
            serde_json::from_slice::<Vec<Station>>(&decompressed_json)
                .map_err(LocateStationError::from)
        })
        .await??;
        info!(
            "Parsed {} stations from JSON in {:?}",
            stations.len(),
            parse_start.elapsed()
        );
        Ok(stations)
    }

    async fn cache_stations(
        stations: Vec<Station>,
        cache_path: &Path,
    ) -> Result<(), LocateStationError> {
        let bincode_data = tokio::task::spawn_blocking(move || {
            bincode::serde::encode_to_vec(stations, BINCODE_CONFIG)
                .map_err(|e| LocateStationError::CacheEncode(Box::new(e)))
        })
        .await??;
        let size = bincode_data.len();
        let target = cache_path.to_path_buf();
        // Written beside the target and renamed onto it, so a reader never decodes a
        // partial list.
        tokio::task::spawn_blocking(move || -> io::Result<()> {
            let mut temp = temp_file_beside(&target)?;
            temp.write_all(&bincode_data)?;
            temp.as_file().sync_all()?;
            temp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await?
        .map_err(|e| LocateStationError::CacheWrite(cache_path.to_path_buf(), e))?;
        info!(
            "Wrote station list ({} bytes) to {}",
            size,
            cache_path.display()
        );
        Ok(())
    }

    /// Finds up to `n_results` stations within `max_distance_km`, closest first.
    ///
    /// With `hourly_window` set, only stations whose hourly inventory spans the window
    /// are considered.
    pub fn query(
        &self,
        latitude: f64,
        longitude: f64,
        n_results: usize,
        max_distance_km: f64,
        hourly_window: Option<&DateWindow>,
    ) -> Vec<(Station, f64)> {
        if n_results == 0 {
            return vec![];
        }
        match hourly_window {
            None => self.proximity_query(latitude, longitude, n_results, max_distance_km),
            Some(window) => {
                self.filtered_heap_query(latitude, longitude, n_results, max_distance_km, window)
            }
        }
    }

    /// Nearest stations without inventory filtering. Degree-space R-tree order and
    /// haversine order can disagree, so a few extra candidates are re-ranked.
    fn proximity_query(
        &self,
        latitude: f64,
        longitude: f64,
        n_results: usize,
        max_distance_km: f64,
    ) -> Vec<(Station, f64)> {
        let candidate_limit = (n_results * 2).max(20);

        let mut stations_with_dist: Vec<(Station, f64)> = self
            .rtree
            .nearest_neighbor_iter(&[latitude, longitude])
            .take(candidate_limit)
            .filter_map(|station| {
                let dist_km = haversine_km(latitude, longitude, station);
                (dist_km <= max_distance_km).then(|| (station.to_owned(), dist_km))
            })
            .collect();

        stations_with_dist.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        stations_with_dist.truncate(n_results);
        stations_with_dist
    }

    /// Nearest stations with hourly coverage of `window`, kept in a bounded max-heap.
    fn filtered_heap_query(
        &self,
        latitude: f64,
        longitude: f64,
        n_results: usize,
        max_distance_km: f64,
        window: &DateWindow,
    ) -> Vec<(Station, f64)> {
        let mut heap: BinaryHeap<StationCandidate<'_>> = BinaryHeap::with_capacity(n_results);

        for station in self.rtree.nearest_neighbor_iter(&[latitude, longitude]) {
            let dist_km = haversine_km(latitude, longitude, station);

            // R-tree order only approximates haversine order; stop well past the radius.
            if dist_km > max_distance_km * 2.0 {
                break;
            }
            if dist_km > max_distance_km || !station.has_hourly_coverage(window) {
                continue;
            }

            let candidate = StationCandidate {
                distance_km: OrderedFloat(dist_km),
                station,
            };
            if heap.len() < n_results {
                heap.push(candidate);
            } else if heap
                .peek()
                .is_some_and(|worst| candidate.distance_km < worst.distance_km)
            {
                heap.pop();
                heap.push(candidate);
            }
        }

        heap.into_sorted_vec()
            .into_iter()
            .map(|c| (c.station.to_owned(), c.distance_km.into_inner()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::station::test_support::station;
    use chrono::NaiveDate;
    use std::time::SystemTime;

    fn california() -> StationLocator {
        StationLocator::from_stations(vec![
            station("72295", "Los Angeles Airport", 33.938, -118.389),
            station("72288", "Burbank", 34.201, -118.358),
            station("72290", "San Diego", 32.7333, -117.1833),
            station("72494", "San Francisco", 37.6167, -122.3833),
            station("72389", "Fresno", 36.7833, -119.7167),
        ])
    }

    fn validate_sorted(results: &[(Station, f64)], max_distance_km: f64) {
        let mut last = -1.0;
        for (s, dist) in results {
            assert!(*dist <= max_distance_km + 1e-9, "{} too far: {}", s.id, dist);
            assert!(*dist >= last - 1e-9, "{} out of order", s.id);
            last = *dist;
        }
    }

    #[test]
    fn nearest_station_to_downtown_la() {
        let locator = california();
        let results = locator.query(34.05, -118.25, 1, 500.0, None);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.id, "72295");
    }

    #[test]
    fn results_sorted_and_limited() {
        let locator = california();
        let results = locator.query(34.05, -118.25, 3, 1000.0, None);
        assert_eq!(results.len(), 3);
        validate_sorted(&results, 1000.0);
        let ids: Vec<&str> = results.iter().map(|(s, _)| s.id.as_str()).collect();
        assert_eq!(ids, ["72295", "72288", "72290"]);
    }

    #[test]
    fn radius_excludes_far_stations() {
        let locator = california();
        let results = locator.query(37.77, -122.42, 5, 50.0, None);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.id, "72494");
        validate_sorted(&results, 50.0);
    }

    #[test]
    fn nothing_within_tight_radius() {
        let locator = california();
        assert!(locator.query(0.0, 0.0, 5, 1.0, None).is_empty());
    }

    #[test]
    fn zero_results_requested() {
        let locator = california();
        assert!(locator.query(34.05, -118.25, 0, 500.0, None).is_empty());
    }

    #[test]
    fn empty_index() {
        let locator = StationLocator::from_stations(vec![]);
        assert!(locator.is_empty());
        assert!(locator.query(34.05, -118.25, 1, 500.0, None).is_empty());
    }

    #[test]
    fn hourly_window_filters_inventory() {
        let mut stations = vec![
            station("72295", "Los Angeles Airport", 33.9333, -118.4),
            station("72288", "Burbank", 34.2, -118.35),
        ];
        stations[1].inventory.hourly.end = NaiveDate::from_ymd_opt(2010, 1, 1);
        let locator = StationLocator::from_stations(stations);
        let window = DateWindow::default();

        let results = locator.query(34.05, -118.25, 4, 100.0, Some(&window));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.id, "72295");
    }

    #[test]
    fn filtered_query_keeps_closest() {
        let locator = california();
        let window = DateWindow::default();
        let results = locator.query(34.05, -118.25, 2, 1000.0, Some(&window));
        validate_sorted(&results, 1000.0);
        let ids: Vec<&str> = results.iter().map(|(s, _)| s.id.as_str()).collect();
        assert_eq!(ids, ["72295", "72288"]);
    }

    #[tokio::test]
    async fn loads_stored_station_list() -> Result<(), LocateStationError> {
        let dir = tempfile::tempdir()?;
        let cache_file = dir.path().join(BINCODE_CACHE_FILE_NAME);
        StationLocator::cache_stations(
            vec![station("72295", "Los Angeles Airport", 33.9333, -118.4)],
            &cache_file,
        )
        .await?;

        let locator = StationLocator::new(dir.path(), Duration::from_secs(3600)).await?;
        assert_eq!(locator.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn rewriting_replaces_whole_list() -> Result<(), LocateStationError> {
        let dir = tempfile::tempdir()?;
        let cache_file = dir.path().join(BINCODE_CACHE_FILE_NAME);
        StationLocator::cache_stations(
            vec![
                station("72295", "Los Angeles Airport", 33.9333, -118.4),
                station("72288", "Burbank", 34.201, -118.358),
            ],
            &cache_file,
        )
        .await?;
        StationLocator::cache_stations(
            vec![station("72494", "San Francisco", 37.6167, -122.3833)],
            &cache_file,
        )
        .await?;

        let stations = StationLocator::get_cached_stations(&cache_file)?;
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].id, "72494");
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn freshness_follows_max_age() -> Result<(), LocateStationError> {
        let dir = tempfile::tempdir()?;
        let cache_file = dir.path().join(BINCODE_CACHE_FILE_NAME);
        let max_age = Duration::from_secs(3600);
        assert!(!StationLocator::is_fresh(&cache_file, max_age).await?);

        StationLocator::cache_stations(
            vec![station("72295", "Los Angeles Airport", 33.9333, -118.4)],
            &cache_file,
        )
        .await?;
        assert!(StationLocator::is_fresh(&cache_file, max_age).await?);

        let file = std::fs::File::options().write(true).open(&cache_file)?;
        file.set_modified(SystemTime::now() - Duration::from_secs(2 * 3600))?;
        assert!(!StationLocator::is_fresh(&cache_file, max_age).await?);

        file.set_modified(SystemTime::now() + Duration::from_secs(24 * 3600))?;
        assert!(!StationLocator::is_fresh(&cache_file, max_age).await?);
        Ok(())
    }
}
