//! JSON bodies sent back for a map click.

use crate::config::ResponseMessages;
use crate::resolver::{DegradedRecord, FullRecord, Precipitation, WeatherResult};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Local, NaiveDateTime};
use serde::Serialize;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Body of an `/add_marker` response. Serialized without a tag, so each variant is
/// told apart by its fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MarkerBody {
    Full {
        temp: Option<f64>,
        rhum: Option<f64>,
        prcp: Precipitation,
        station_name: String,
        time: String,
    },
    Degraded {
        station_name: String,
        column_info: String,
        temperature_data: String,
        time: String,
    },
    Error {
        error: String,
    },
}

impl MarkerBody {
    pub fn error(message: impl Into<String>) -> Self {
        MarkerBody::Error {
            error: message.into(),
        }
    }
}

/// Status code plus body, ready to be turned into an HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedResponse {
    pub status: StatusCode,
    pub body: MarkerBody,
}

impl IntoResponse for ShapedResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Current local wall-clock time, the stamp put on every answered click.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn format_timestamp(time: NaiveDateTime) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Maps a resolver result to its response. `Empty` becomes a 404 and drops the
/// station name.
pub fn shape(
    result: WeatherResult,
    time: NaiveDateTime,
    messages: &ResponseMessages,
) -> ShapedResponse {
    let time = format_timestamp(time);
    match result {
        WeatherResult::Full(FullRecord {
            temperature,
            humidity,
            precipitation,
            station_name,
        }) => ShapedResponse {
            status: StatusCode::OK,
            body: MarkerBody::Full {
                temp: temperature,
                rhum: humidity,
                prcp: precipitation,
                station_name,
                time,
            },
        },
        WeatherResult::Degraded(DegradedRecord {
            column_info,
            temperature_data,
            station_name,
            ..
        }) => ShapedResponse {
            status: StatusCode::OK,
            body: MarkerBody::Degraded {
                station_name,
                column_info,
                temperature_data,
                time,
            },
        },
        WeatherResult::Empty { .. } => ShapedResponse {
            status: StatusCode::NOT_FOUND,
            body: MarkerBody::error(messages.not_found.clone()),
        },
    }
}

/// The generic 500 answer. Carries no detail of what went wrong.
pub fn internal_error(messages: &ResponseMessages) -> ShapedResponse {
    ShapedResponse {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: MarkerBody::error(messages.internal.clone()),
    }
}
