//! HTTP API routes
//!
//! Every JSON response carries an `ok` flag; failures add a short `code`
//! and a human-readable `msg`.

use crate::collect::ingest::{backfill_secondaries, ingest};
use crate::datum::{wgs84_to_gcj02, Coordinate, Datum};
use crate::error::Error;
use crate::record::DeviceReport;
use crate::resolve::{AddressResult, HttpClient, ProviderId};
use crate::server::state::AppState;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{debug, info};
use uuid::Uuid;

/// Create the API router
pub fn create_router<H: HttpClient + 'static>(state: Arc<AppState<H>>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/address", get(address_handler::<H>))
        .route("/api/convert", get(convert_handler))
        .route("/api/device-data", post(device_data_handler::<H>))
        .route("/api/*rest", any(api_not_found_handler))
        .fallback_service(ServeDir::new(static_dir()).append_index_html_on_directories(true))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Static files live next to the working directory, or next to the binary
fn static_dir() -> PathBuf {
    let local = PathBuf::from("static");
    if local.exists() {
        return local;
    }

    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("static")))
        .filter(|path| path.exists())
        .unwrap_or(local)
}

/// API error response
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub msg: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub code: String,
    pub msg: String,
}

impl ApiError {
    fn invalid_params(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "invalid_params",
            msg: msg.into(),
        }
    }

    fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            msg: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorBody {
            ok: false,
            code: self.code.to_string(),
            msg: self.msg,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        // A missing address is an answer, not a failure of the request
        let status = match &err {
            Error::AddressNotFound { .. } => StatusCode::OK,
            Error::InvalidCoordinates(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError {
            status,
            code: err.code(),
            msg: err.to_string(),
        }
    }
}

type Params = HashMap<String, String>;

fn number_param(params: &Params, key: &str) -> Option<f64> {
    params
        .get(key)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn flag_param(params: &Params, key: &str) -> bool {
    matches!(params.get(key).map(String::as_str), Some("true" | "1"))
}

/// Plain `{ok}` response
#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// Health check
///
/// GET /health
async fn health_handler() -> Json<OkResponse> {
    Json(OkResponse { ok: true })
}

/// Reverse-geocoding response
#[derive(Debug, Serialize, Deserialize)]
pub struct AddressResponse {
    pub ok: bool,
    pub address: Option<AddressResult>,
    pub baidu: Option<AddressResult>,
    pub tencent: Option<AddressResult>,
}

/// Resolve a coordinate to an address
///
/// GET /api/address?lat=..&lon=..&coordType=gcj02&includeSecondary=true
///
/// `includeBaidu` is accepted in place of `includeSecondary`. Zero
/// coordinates are treated as missing.
async fn address_handler<H: HttpClient>(
    State(state): State<Arc<AppState<H>>>,
    Query(params): Query<Params>,
) -> Result<Json<AddressResponse>, ApiError> {
    let lat = number_param(&params, "lat").filter(|v| *v != 0.0);
    let lon = number_param(&params, "lon").filter(|v| *v != 0.0);
    let (Some(lat), Some(lon)) = (lat, lon) else {
        return Err(ApiError::invalid_params("lat and lon must be non-zero numbers"));
    };

    let datum = match params.get("coordType") {
        Some(value) => value.parse::<Datum>().map_err(ApiError::invalid_params)?,
        None => Datum::Gcj02,
    };
    let coordinate = Coordinate::new(datum, lat, lon);
    let include_secondary =
        flag_param(&params, "includeSecondary") || flag_param(&params, "includeBaidu");

    debug!(lat, lon, %datum, include_secondary, "address lookup");

    let response = if include_secondary {
        let outcome = state.resolver.resolve(&coordinate).await?;
        AddressResponse {
            ok: true,
            baidu: outcome.secondary(ProviderId::Baidu).cloned(),
            tencent: outcome.secondary(ProviderId::Tencent).cloned(),
            address: outcome.primary,
        }
    } else {
        AddressResponse {
            ok: true,
            address: Some(state.resolver.resolve_primary(&coordinate).await?),
            baidu: None,
            tencent: None,
        }
    };

    Ok(Json(response))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Gcj02View {
    pub lat: f64,
    pub lon: f64,
    pub applicable: bool,
}

/// A WGS84 point in every supported datum
#[derive(Debug, Serialize, Deserialize)]
pub struct ConvertResponse {
    pub ok: bool,
    pub wgs84: LatLon,
    pub gcj02: Gcj02View,
    pub bd09: LatLon,
}

/// Convert a WGS84 coordinate to GCJ02 and BD09
///
/// GET /api/convert?lat=..&lon=..
async fn convert_handler(Query(params): Query<Params>) -> Result<Json<ConvertResponse>, ApiError> {
    let (Some(lat), Some(lon)) = (number_param(&params, "lat"), number_param(&params, "lon"))
    else {
        return Err(ApiError::invalid_params("lat and lon must be numbers"));
    };

    let wgs = Coordinate::wgs84(lat, lon);
    wgs.validate()?;

    let gcj = wgs84_to_gcj02(lat, lon);
    let bd = wgs.to_bd09()?;

    Ok(Json(ConvertResponse {
        ok: true,
        wgs84: LatLon { lat, lon },
        gcj02: Gcj02View {
            lat: gcj.coordinate.lat(),
            lon: gcj.coordinate.lon(),
            applicable: gcj.applicable,
        },
        bd09: LatLon {
            lat: bd.lat(),
            lon: bd.lon(),
        },
    }))
}

/// Saved record acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct SavedResponse {
    pub ok: bool,
    pub id: Uuid,
}

/// Client address: first `X-Forwarded-For` entry, else the socket peer
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

/// Store an uploaded device report
///
/// POST /api/device-data
async fn device_data_handler<H: HttpClient>(
    State(state): State<Arc<AppState<H>>>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    payload: Result<Json<DeviceReport>, JsonRejection>,
) -> Result<Json<SavedResponse>, ApiError> {
    let Json(mut report) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let ip = client_ip(&headers, peer.map(|ConnectInfo(addr)| addr));

    backfill_secondaries(&state.resolver, &mut report).await;
    let record = ingest(state.sink.as_ref(), report, ip)?;
    info!(id = %record.id, located = record.has_location(), "device data saved");

    Ok(Json(SavedResponse {
        ok: true,
        id: record.id,
    }))
}

/// Unknown API path
async fn api_not_found_handler() -> ApiError {
    ApiError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        msg: "no such endpoint".to_string(),
    }
}
