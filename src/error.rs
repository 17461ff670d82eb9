use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// A region or sample that cannot be accepted as-is.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid coordinate ({lat}, {lng})")]
    InvalidCoordinate { lat: f64, lng: f64 },

    #[error("radius {radius_km} km is outside the allowed range 0.1..=50 km")]
    RadiusOutOfRange { radius_km: f64 },

    #[error("polygon needs at least 3 distinct vertices, got {count}")]
    TooFewVertices { count: usize },

    #[error("polygon ring is not closed")]
    OpenRing,

    #[error("polygon has zero area")]
    DegeneratePolygon,

    #[error(
        "single-package radius {single_meters} m must be smaller than multi-package radius {multi_meters} m"
    )]
    InvertedZoneRadii { single_meters: f64, multi_meters: f64 },

    #[error("{field} must be greater than zero")]
    NonPositive { field: &'static str },

    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("{field} does not apply to {kind} regions")]
    FieldNotApplicable { field: &'static str, kind: &'static str },

    #[error("block composition has no circles")]
    EmptyComposition,

    #[error("sample at {timestamp_millis} is older than the last sample at {last_millis}")]
    OutOfOrderSample { timestamp_millis: i64, last_millis: i64 },

    #[error("sample timestamp {timestamp_millis} is outside 0..={latest_millis}")]
    TimestampOutOfRange { timestamp_millis: i64, latest_millis: i64 },
}

/// Placement rejected because it collides with a region of the other type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OverlapError {
    #[error("courier zone center lies inside block area '{block_area_name}'")]
    ZoneInsideBlockArea { block_area_id: Uuid, block_area_name: String },

    #[error("block area contains the center of courier zone '{zone_name}'")]
    BlockAreaContainsZone { zone_id: Uuid, zone_name: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditorError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("cannot {action} while {state}")]
    IllegalTransition { action: &'static str, state: &'static str },
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("no subscribers for proximity events")]
    NoSubscribers,

    #[error("notification sink unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("overlap: {0}")]
    Overlap(#[from] OverlapError),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<EditorError> for AppError {
    fn from(err: EditorError) -> Self {
        match err {
            EditorError::Invalid(inner) => AppError::Validation(inner),
            illegal @ EditorError::IllegalTransition { .. } => AppError::Conflict(illegal.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Validation(err) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
            AppError::Overlap(err) => (StatusCode::CONFLICT, err.to_string()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
