use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::engine::coverage::{check_coverage, CoverageReport};
use crate::engine::proximity::{analyze_proximity, ZoneAnalysis};
use crate::error::AppError;
use crate::geo::Coordinate;
use crate::models::store::Store;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/proximity", get(proximity))
        .route("/coverage", get(coverage))
}

#[derive(Deserialize)]
pub struct CoverageQuery {
    pub lat: f64,
    pub lng: f64,
}

async fn proximity(State(state): State<Arc<AppState>>) -> Json<Vec<ZoneAnalysis>> {
    let timer = state.metrics.proximity_analysis_seconds.start_timer();

    let zones = state.regions.courier_zones();
    let stores: Vec<Store> = state
        .stores
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    let analysis = analyze_proximity(&zones, &stores);

    timer.observe_duration();
    Json(analysis)
}

async fn coverage(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CoverageQuery>,
) -> Result<Json<CoverageReport>, AppError> {
    let point = Coordinate::new(query.lat, query.lng)?;
    Ok(Json(check_coverage(&point, &state.regions.all())))
}
