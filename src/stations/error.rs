use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocateStationError {
    #[error("Failed to read station list '{0}'")]
    CacheRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to write station list '{0}'")]
    CacheWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to read metadata for station list '{0}'")]
    CacheMetadataRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to decode station list from '{0}'")]
    CacheDecode(PathBuf, #[source] Box<bincode::error::DecodeError>),

    #[error("Failed to encode station list")]
    CacheEncode(#[source] Box<bincode::error::EncodeError>),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    // Stream errors and gzip decompression
    #[error("Station list download or decompression failed")]
    DownloadIo(#[from] std::io::Error),

    #[error("Failed to parse station list JSON")]
    JsonParse(#[from] serde_json::Error),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
