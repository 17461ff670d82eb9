use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::tracking::{accept_client_timestamp, ingest_sample, retire_courier};
use crate::error::AppError;
use crate::geo::Coordinate;
use crate::models::courier::{Courier, CourierLocationSample, CourierStatus, WaitingPoint};
use crate::models::event::TrackingUpdate;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers", post(create_courier).get(list_couriers))
        .route("/couriers/:id/status", patch(update_courier_status))
        .route("/couriers/:id/location", patch(update_courier_location))
        .route("/couriers/:id/tracking/start", post(start_tracking))
        .route("/couriers/:id/tracking/stop", post(stop_tracking))
        .route("/couriers/:id/samples", post(record_sample))
        .route("/couriers/:id/history", get(get_history))
        .route("/couriers/:id/waiting-points", get(get_waiting_points))
}

#[derive(Deserialize)]
pub struct CreateCourierRequest {
    pub name: String,
    pub location: Option<Coordinate>,
    pub max_delivery_km: f64,
    #[serde(default = "enabled")]
    pub notifications_enabled: bool,
}

fn enabled() -> bool {
    true
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: CourierStatus,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: Coordinate,
}

#[derive(Deserialize)]
pub struct RecordSampleRequest {
    pub coordinate: Coordinate,
    /// Defaults to the time of receipt. Stamps ahead of the server clock are
    /// clamped to it.
    pub timestamp_millis: Option<i64>,
}

#[derive(Serialize)]
pub struct TrackingResponse {
    pub courier_id: Uuid,
    pub tracking: bool,
    pub changed: bool,
}

async fn create_courier(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCourierRequest>,
) -> Result<Json<Courier>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    if !(payload.max_delivery_km > 0.0) {
        return Err(AppError::BadRequest("max_delivery_km must be > 0".to_string()));
    }

    let courier = Courier {
        id: Uuid::new_v4(),
        name: payload.name,
        location: payload.location,
        status: CourierStatus::Online,
        max_delivery_km: payload.max_delivery_km,
        notifications_enabled: payload.notifications_enabled,
        updated_at: Utc::now(),
    };

    state.couriers.insert(courier.id, courier.clone());
    Ok(Json(courier))
}

async fn list_couriers(State(state): State<Arc<AppState>>) -> Json<Vec<Courier>> {
    let couriers = state
        .couriers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(couriers)
}

/// Going offline also stops periodic sampling; history is kept.
async fn update_courier_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Courier>, AppError> {
    let courier = {
        let mut courier = state
            .couriers
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("courier {} not found", id)))?;

        courier.status = payload.status;
        courier.updated_at = Utc::now();
        courier.clone()
    };

    if courier.status == CourierStatus::Offline {
        retire_courier(&state, &id);
    }

    Ok(Json(courier))
}

async fn update_courier_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Courier>, AppError> {
    let mut courier = state
        .couriers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("courier {} not found", id)))?;

    courier.location = Some(payload.location);
    courier.updated_at = Utc::now();

    Ok(Json(courier.clone()))
}

async fn start_tracking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TrackingResponse>, AppError> {
    require_courier(&state, &id)?;
    let replaced = state.scheduler.start(state.clone(), id);

    Ok(Json(TrackingResponse {
        courier_id: id,
        tracking: true,
        changed: !replaced,
    }))
}

async fn stop_tracking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TrackingResponse>, AppError> {
    require_courier(&state, &id)?;
    let stopped = state.scheduler.stop(&id);

    Ok(Json(TrackingResponse {
        courier_id: id,
        tracking: false,
        changed: stopped,
    }))
}

async fn record_sample(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordSampleRequest>,
) -> Result<Json<TrackingUpdate>, AppError> {
    require_courier(&state, &id)?;

    let now_millis = Utc::now().timestamp_millis();
    let timestamp_millis = match payload.timestamp_millis {
        Some(stamped) => accept_client_timestamp(stamped, now_millis)?,
        None => now_millis,
    };

    let sample = CourierLocationSample {
        courier_id: id,
        coordinate: payload.coordinate,
        timestamp_millis,
    };

    Ok(Json(ingest_sample(&state, sample)?))
}

async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<CourierLocationSample>>, AppError> {
    require_courier(&state, &id)?;
    Ok(Json(state.tracker.history(&id)))
}

async fn get_waiting_points(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<WaitingPoint>>, AppError> {
    require_courier(&state, &id)?;
    Ok(Json(state.tracker.waiting_points(&id)))
}

fn require_courier(state: &AppState, id: &Uuid) -> Result<(), AppError> {
    if state.couriers.contains_key(id) {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("courier {} not found", id)))
    }
}
