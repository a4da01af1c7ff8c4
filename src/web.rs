//! HTTP surface: the map page and the `/add_marker` lookup.

use crate::config::ResponseMessages;
use crate::page;
use crate::resolver::WeatherResolver;
use crate::response::{internal_error, local_now, shape, MarkerBody, ShapedResponse};
use crate::types::location::LatLon;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use log::{error, info};
use serde::Deserialize;
use std::any::Any;
use std::sync::Arc;
use thiserror::Error;
use tower_http::catch_panic::CatchPanicLayer;

/// Shared, read-only state of every request.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<WeatherResolver>,
    pub messages: Arc<ResponseMessages>,
}

impl AppState {
    pub fn new(resolver: WeatherResolver, messages: ResponseMessages) -> Self {
        Self {
            resolver: Arc::new(resolver),
            messages: Arc::new(messages),
        }
    }
}

/// Query string of `/add_marker`. Both values are optional here so a missing one can
/// be answered with a readable message.
#[derive(Debug, Deserialize)]
pub struct MarkerQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    /// Carries only the configured generic message; the cause is logged where it occurs.
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ShapedResponse {
            status,
            body: MarkerBody::error(self.to_string()),
        }
        .into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let panic_response = internal_error(&state.messages);

    Router::new()
        .route("/", get(index))
        .route("/add_marker", get(add_marker))
        .with_state(state)
        .layer(CatchPanicLayer::custom(
            move |panic: Box<dyn Any + Send + 'static>| {
                let detail = panic
                    .downcast_ref::<String>()
                    .map(String::as_str)
                    .or_else(|| panic.downcast_ref::<&str>().copied())
                    .unwrap_or("unknown panic");
                error!("Request handler panicked: {}", detail);
                panic_response.clone().into_response()
            },
        ))
}

async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    page::render(local_now()).map(Html).map_err(|e| {
        error!("Failed to render map page: {:?}", e);
        ApiError::Internal(state.messages.internal.clone())
    })
}

async fn add_marker(
    State(state): State<AppState>,
    query: Result<Query<MarkerQuery>, QueryRejection>,
) -> Result<ShapedResponse, ApiError> {
    let location = parse_location(query)?;
    info!(
        "Received lat: {}, lon: {}",
        location.latitude(),
        location.longitude()
    );

    match state.resolver.resolve(location).await {
        Ok(result) => Ok(shape(result, local_now(), &state.messages)),
        Err(e) => {
            error!("Weather lookup for {} failed: {:?}", location, e);
            Err(ApiError::Internal(state.messages.internal.clone()))
        }
    }
}

fn parse_location(
    query: Result<Query<MarkerQuery>, QueryRejection>,
) -> Result<LatLon, ApiError> {
    let Query(query) = query.map_err(|rejection| ApiError::InvalidInput(rejection.body_text()))?;
    let lat = query
        .lat
        .ok_or_else(|| ApiError::InvalidInput("Missing query parameter 'lat'".to_string()))?;
    let lon = query
        .lon
        .ok_or_else(|| ApiError::InvalidInput("Missing query parameter 'lon'".to_string()))?;
    LatLon::new(lat, lon).map_err(|e| ApiError::InvalidInput(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MeteoMapError;
    use crate::resolver::test_support::{FixedObservations, FixedStations};
    use crate::source::ObservationSource;
    use crate::types::window::DateWindow;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use polars::df;
    use polars::prelude::DataFrame;
    use serde_json::{json, Value};
    use std::sync::atomic::Ordering;
    use tower::ServiceExt;

    fn app(observations: Arc<dyn ObservationSource>, station: &str) -> Router {
        let resolver = WeatherResolver::builder()
            .observations(observations)
            .stations(Arc::new(FixedStations::named(station)))
            .window(DateWindow::default())
            .build();
        router(AppState::new(resolver, ResponseMessages::default()))
    }

    fn los_angeles_app() -> Router {
        let frame = df!("temp" => [25.0], "rhum" => [60i64], "prcp" => [0.0]).unwrap();
        app(Arc::new(FixedObservations::new(frame)), "Los Angeles")
    }

    async fn fetch(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn full_observation_is_ok() {
        let (status, body) = fetch(los_angeles_app(), "/add_marker?lat=34.05&lon=-118.25").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["temp"].as_f64(), Some(25.0));
        assert_eq!(body["rhum"].as_f64(), Some(60.0));
        assert_eq!(body["prcp"].as_f64(), Some(0.0));
        assert_eq!(body["station_name"], json!("Los Angeles"));

        let time = body["time"].as_str().unwrap();
        assert!(chrono::NaiveDateTime::parse_from_str(time, "%Y-%m-%d %H:%M:%S").is_ok());
    }

    #[tokio::test]
    async fn empty_window_is_not_found() {
        let app = app(
            Arc::new(FixedObservations::new(DataFrame::empty())),
            "Los Angeles",
        );
        let (status, body) = fetch(app, "/add_marker?lat=34.05&lon=-118.25").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Información no encontrada"}));
    }

    #[tokio::test]
    async fn degraded_observation_is_ok() {
        let frame = df!(
            "tavg" => [22.3],
            "tmin" => [15.2],
            "tmax" => [29.9],
        )
        .unwrap();
        let app = app(Arc::new(FixedObservations::new(frame)), "Potosi");
        let (status, body) = fetch(app, "/add_marker?lat=-19.58&lon=-65.75").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["station_name"], json!("Potosi"));
        assert!(body["column_info"]
            .as_str()
            .unwrap()
            .starts_with("Available columns in weather data:\n"));
        assert!(body["temperature_data"].as_str().unwrap().contains("29.9"));
        assert!(body.get("rhum").is_none());
    }

    #[tokio::test]
    async fn upstream_failure_is_one_generic_error() {
        let observations = Arc::new(FixedObservations::failing());
        let app = app(observations.clone(), "Los Angeles");
        let (status, body) = fetch(app, "/add_marker?lat=34.05&lon=-118.25").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Internal server error"}));
        assert_eq!(observations.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bad_input_is_rejected() {
        for uri in [
            "/add_marker?lat=abc&lon=-118.25",
            "/add_marker?lat=34.05",
            "/add_marker",
            "/add_marker?lat=91&lon=0",
            "/add_marker?lat=0&lon=-180.5",
        ] {
            let (status, body) = fetch(los_angeles_app(), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["error"].is_string(), "{uri}");
        }
    }

    #[tokio::test]
    async fn repeated_requests_match() {
        let app = los_angeles_app();
        let (_, mut first) = fetch(app.clone(), "/add_marker?lat=34.05&lon=-118.25").await;
        let (_, mut second) = fetch(app, "/add_marker?lat=34.05&lon=-118.25").await;
        first.as_object_mut().unwrap().remove("time");
        second.as_object_mut().unwrap().remove("time");
        assert_eq!(first, second);
    }

    struct PanickingObservations;

    #[async_trait]
    impl ObservationSource for PanickingObservations {
        async fn hourly(
            &self,
            _location: LatLon,
            _window: &DateWindow,
        ) -> Result<DataFrame, MeteoMapError> {
            panic!("observation source exploded")
        }
    }

    #[tokio::test]
    async fn panic_becomes_internal_error() {
        let app = app(Arc::new(PanickingObservations), "Los Angeles");
        let (status, body) = fetch(app, "/add_marker?lat=34.05&lon=-118.25").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Internal server error"}));
    }

    #[tokio::test]
    async fn index_serves_map() {
        let response = los_angeles_app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("L.map('map')"));
        assert!(html.contains(r#""Latitude":34.05"#));
    }
}
