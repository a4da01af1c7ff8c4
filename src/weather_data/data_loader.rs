use crate::types::schema::{
    hourly_cache_file_name, hourly_url, COL_DATE, COL_HOUR, HOURLY_COLUMNS,
};
use crate::types::window::DateWindow;
use crate::utils::temp_file_beside;
use crate::weather_data::error::WeatherDataError;
use async_compression::tokio::bufread::GzipDecoder;
use futures_util::TryStreamExt;
use log::{debug, info, warn};
use polars::frame::DataFrame;
use polars::prelude::*;
use reqwest::Client;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::{fs, task};
use tokio_util::io::StreamReader;

/// Downloads Meteostat hourly bulk files and keeps them as parquet under `cache_dir`.
pub struct WeatherDataLoader {
    cache_dir: PathBuf,
    download_client: Client,
    max_age: Duration,
}

impl WeatherDataLoader {
    pub fn new(cache_dir: &Path, max_age: Duration) -> WeatherDataLoader {
        WeatherDataLoader {
            cache_dir: cache_dir.to_path_buf(),
            download_client: Client::new(),
            max_age,
        }
    }

    /// Hourly rows of `station` inside `window`, sorted by `(date, hour)` ascending.
    ///
    /// The station's bulk file is downloaded first if it is not stored locally or is
    /// older than the loader's maximum age.
    pub async fn hourly_window(
        &self,
        station: &str,
        window: &DateWindow,
    ) -> Result<DataFrame, WeatherDataError> {
        let frame = self.get_frame(station).await?;
        let window = *window;
        let station_owned = station.to_string();
        task::spawn_blocking(move || {
            filter_window(frame, &window)
                .collect()
                .map_err(|source| WeatherDataError::WindowFilter {
                    station: station_owned,
                    source,
                })
        })
        .await?
    }

    /// Reads the stored hourly file for `station`, refreshing it first when needed.
    pub async fn get_frame(&self, station: &str) -> Result<LazyFrame, WeatherDataError> {
        let parquet_path = self.cache_dir.join(hourly_cache_file_name(station));

        if self.is_fresh(&parquet_path).await? {
            debug!("Cache hit for hourly data of station {} at {:?}", station, parquet_path);
        } else {
            warn!(
                "Cache miss for hourly data of station {}. Downloading and processing.",
                station
            );
            let raw_bytes = self.download(station).await?;
            let df = Self::csv_to_dataframe(raw_bytes, station).await?;

            fs::create_dir_all(&self.cache_dir)
                .await
                .map_err(|e| WeatherDataError::CacheDirCreation(self.cache_dir.clone(), e))?;

            Self::cache_dataframe(df, &parquet_path).await?;
            info!("Cached hourly data for station {} to {:?}", station, parquet_path);
        }

        // One open handle for the whole read; a concurrent refresh replaces the path,
        // not the file behind this handle.
        let frame = task::spawn_blocking(move || {
            let file = std::fs::File::open(&parquet_path)
                .map_err(|e| WeatherDataError::CacheRead(parquet_path.clone(), e))?;
            ParquetReader::new(file)
                .finish()
                .map_err(|e| WeatherDataError::ParquetRead(parquet_path, e))
        })
        .await??;
        Ok(frame.lazy())
    }

    pub(crate) async fn is_fresh(&self, path: &Path) -> Result<bool, WeatherDataError> {
        let metadata = match fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(WeatherDataError::CacheMetadataRead(path.to_path_buf(), e)),
        };
        let modified = metadata
            .modified()
            .map_err(|e| WeatherDataError::CacheMetadataRead(path.to_path_buf(), e))?;
        match modified.elapsed() {
            Ok(age) => Ok(age <= self.max_age),
            Err(_) => {
                warn!(
                    "Modification time of {} is in the future, treating it as stale",
                    path.display()
                );
                Ok(false)
            }
        }
    }

    /// Downloads and decompresses the hourly bulk file of one station.
    async fn download(&self, station: &str) -> Result<Vec<u8>, WeatherDataError> {
        let url = hourly_url(station);
        info!("Downloading data from {}", url);

        let response = self
            .download_client
            .get(&url)
            .send()
            .await
            .map_err(|e| WeatherDataError::NetworkRequest(url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(match e.status() {
                    Some(status) => WeatherDataError::HttpStatus {
                        url,
                        status,
                        source: e,
                    },
                    None => WeatherDataError::NetworkRequest(url, e),
                });
            }
        };

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        let mut decoder = GzipDecoder::new(StreamReader::new(stream));
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .await
            .map_err(WeatherDataError::DownloadIo)?;
        info!(
            "Downloaded and decompressed {} bytes for station {}",
            decompressed.len(),
            station
        );
        Ok(decompressed)
    }

    /// Parses headerless hourly CSV bytes and names the columns after the hourly schema.
    pub(crate) async fn csv_to_dataframe(
        bytes: Vec<u8>,
        station: &str,
    ) -> Result<DataFrame, WeatherDataError> {
        let station_owned = station.to_string();

        task::spawn_blocking(move || {
            let mut df = CsvReadOptions::default()
                .with_has_header(false)
                .into_reader_with_file_handle(Cursor::new(bytes))
                .finish()
                .map_err(|source| WeatherDataError::CsvReadPolars {
                    station: station_owned.clone(),
                    source,
                })?;

            if df.width() != HOURLY_COLUMNS.len() {
                warn!(
                    "CSV column count ({}) does not match hourly schema ({}) for station {}",
                    df.width(),
                    HOURLY_COLUMNS.len(),
                    station_owned
                );
                return Err(WeatherDataError::SchemaMismatch {
                    station: station_owned,
                    expected: HOURLY_COLUMNS.len(),
                    found: df.width(),
                });
            }

            df.set_column_names(HOURLY_COLUMNS.iter().copied())
                .map_err(|source| WeatherDataError::ColumnRename {
                    station: station_owned,
                    source,
                })?;

            Ok(df)
        })
        .await?
    }

    /// Writes a DataFrame to a snappy-compressed parquet file on a blocking thread.
    ///
    /// The file is written beside `path` and renamed onto it when complete.
    pub(crate) async fn cache_dataframe(
        mut df: DataFrame,
        path: &Path,
    ) -> Result<(), WeatherDataError> {
        let path_buf = path.to_path_buf();
        task::spawn_blocking(move || {
            let mut temp = temp_file_beside(&path_buf)
                .map_err(|e| WeatherDataError::ParquetWriteIo(path_buf.clone(), e))?;
            ParquetWriter::new(temp.as_file_mut())
                .with_compression(ParquetCompression::Snappy)
                .finish(&mut df)
                .map_err(|e| WeatherDataError::ParquetWritePolars(path_buf.clone(), e))?;
            temp.as_file()
                .sync_all()
                .map_err(|e| WeatherDataError::ParquetWriteIo(path_buf.clone(), e))?;
            temp.persist(&path_buf)
                .map_err(|e| WeatherDataError::ParquetWriteIo(path_buf, e.error))?;
            Ok::<(), WeatherDataError>(())
        })
        .await??;
        Ok(())
    }
}

/// Restricts an hourly frame to `window` (inclusive) and orders it chronologically.
///
/// `date` is an ISO `YYYY-MM-DD` string, so lexicographic comparison is date order.
pub(crate) fn filter_window(frame: LazyFrame, window: &DateWindow) -> LazyFrame {
    let start_date = window.start().date().format("%Y-%m-%d").to_string();
    let end_date = window.end().date().format("%Y-%m-%d").to_string();
    let start_hour = window.start_hour() as i64;
    let end_hour = window.end_hour() as i64;

    let after_start = col(COL_DATE).gt(lit(start_date.clone())).or(col(COL_DATE)
        .eq(lit(start_date))
        .and(col(COL_HOUR).gt_eq(lit(start_hour))));
    let before_end = col(COL_DATE).lt(lit(end_date.clone())).or(col(COL_DATE)
        .eq(lit(end_date))
        .and(col(COL_HOUR).lt_eq(lit(end_hour))));

    frame
        .filter(after_start.and(before_end))
        .sort([COL_DATE, COL_HOUR], SortMultipleOptions::default())
}
