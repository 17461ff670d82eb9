use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::region_store::RegionSink;
use crate::error::AppError;
use crate::geo::{close_ring, Coordinate};
use crate::models::region::{
    CircleRegion, CourierZone, CustomerBlockArea, PolygonRegion, Region, RegionKind, RegionPatch,
};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/regions", post(create_region).get(list_regions))
        .route(
            "/regions/:id",
            get(get_region).patch(update_region).delete(delete_region),
        )
}

#[derive(Deserialize)]
#[serde(tag = "type")]
pub enum CreateRegionRequest {
    Circle {
        owner_id: Uuid,
        center: Coordinate,
        radius_meters: f64,
    },
    Polygon {
        name: String,
        #[serde(default)]
        color: String,
        vertices: Vec<Coordinate>,
    },
    CourierZone {
        name: String,
        center: Coordinate,
        single_package_radius_meters: f64,
        multi_package_radius_meters: f64,
        max_delivery_km: f64,
        #[serde(default = "enabled")]
        notifications_enabled: bool,
        #[serde(default)]
        color: String,
    },
    BlockArea {
        name: String,
        vertices: Vec<Coordinate>,
        #[serde(default)]
        color: String,
    },
}

fn enabled() -> bool {
    true
}

impl CreateRegionRequest {
    fn into_region(self) -> Region {
        match self {
            CreateRegionRequest::Circle {
                owner_id,
                center,
                radius_meters,
            } => Region::Circle(CircleRegion {
                owner_id,
                center,
                radius_meters,
            }),
            CreateRegionRequest::Polygon {
                name,
                color,
                vertices,
            } => Region::Polygon(PolygonRegion {
                id: Uuid::new_v4(),
                name,
                color,
                vertices: close_ring(vertices),
            }),
            CreateRegionRequest::CourierZone {
                name,
                center,
                single_package_radius_meters,
                multi_package_radius_meters,
                max_delivery_km,
                notifications_enabled,
                color,
            } => Region::CourierZone(CourierZone {
                id: Uuid::new_v4(),
                name,
                center,
                single_package_radius_meters,
                multi_package_radius_meters,
                max_delivery_km,
                notifications_enabled,
                color,
            }),
            CreateRegionRequest::BlockArea {
                name,
                vertices,
                color,
            } => Region::BlockArea(CustomerBlockArea {
                id: Uuid::new_v4(),
                name,
                vertices: close_ring(vertices),
                color,
            }),
        }
    }
}

#[derive(Serialize)]
pub struct RegionView {
    #[serde(flatten)]
    pub region: Region,
    pub area_square_meters: f64,
}

impl From<Region> for RegionView {
    fn from(region: Region) -> Self {
        let area_square_meters = region.area_square_meters();
        Self {
            region,
            area_square_meters,
        }
    }
}

#[derive(Deserialize)]
pub struct ListRegionsQuery {
    pub kind: Option<RegionKind>,
}

async fn create_region(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRegionRequest>,
) -> Result<Json<RegionView>, AppError> {
    if let CreateRegionRequest::Circle { owner_id, .. } = &payload {
        if !state.stores.contains_key(owner_id) {
            return Err(AppError::NotFound(format!("store {owner_id} not found")));
        }
    }

    let region = state.committer().save(payload.into_region())?;
    Ok(Json(region.into()))
}

async fn list_regions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListRegionsQuery>,
) -> Json<Vec<RegionView>> {
    let regions = match query.kind {
        Some(kind) => state.regions.list(kind),
        None => state.regions.all(),
    };

    Json(regions.into_iter().map(RegionView::from).collect())
}

async fn get_region(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RegionView>, AppError> {
    let region = state
        .regions
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("region {id} not found")))?;

    Ok(Json(region.into()))
}

async fn update_region(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<RegionPatch>,
) -> Result<Json<RegionView>, AppError> {
    let region = state.committer().update(id, patch)?;
    Ok(Json(region.into()))
}

async fn delete_region(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Region>, AppError> {
    let removed = state.committer().delete(id)?;
    Ok(Json(removed))
}
