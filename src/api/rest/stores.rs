use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::Coordinate;
use crate::models::store::Store;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stores", post(create_store).get(list_stores))
        .route("/stores/:id/location", patch(update_store_location))
}

#[derive(Deserialize)]
pub struct CreateStoreRequest {
    pub name: String,
    pub location: Option<Coordinate>,
}

#[derive(Deserialize)]
pub struct UpdateStoreLocationRequest {
    pub location: Option<Coordinate>,
}

async fn create_store(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateStoreRequest>,
) -> Result<Json<Store>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    let store = Store {
        id: Uuid::new_v4(),
        name: payload.name,
        location: payload.location,
    };

    state.stores.insert(store.id, store.clone());
    Ok(Json(store))
}

async fn list_stores(State(state): State<Arc<AppState>>) -> Json<Vec<Store>> {
    let stores = state
        .stores
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(stores)
}

async fn update_store_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStoreLocationRequest>,
) -> Result<Json<Store>, AppError> {
    let mut store = state
        .stores
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("store {} not found", id)))?;

    store.location = payload.location;

    Ok(Json(store.clone()))
}
