use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::engine::editor::{EditorState, PolygonKind, PolygonTarget, RegionEditor};
use crate::error::AppError;
use crate::geo::Coordinate;
use crate::models::region::Region;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/editor/sessions", post(create_session))
        .route(
            "/editor/sessions/:id",
            get(get_session).delete(close_session),
        )
        .route("/editor/sessions/:id/commands", post(apply_command))
}

#[derive(Deserialize)]
#[serde(tag = "command")]
pub enum EditorCommand {
    BeginPolygon {
        name: String,
        #[serde(default)]
        color: String,
        kind: PolygonKind,
    },
    EditStoreCircle {
        store_id: Uuid,
    },
    /// Targets an existing service polygon when `target_id` is set,
    /// otherwise a new one named `name`.
    EnterBlockMode {
        target_id: Option<Uuid>,
        name: Option<String>,
        color: Option<String>,
    },
    SetRadius {
        radius_meters: f64,
    },
    Click {
        point: Coordinate,
        #[serde(default)]
        modifier: bool,
    },
    Undo,
    Save,
    Cancel,
}

#[derive(Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub state: EditorState,
    pub committed: Option<Region>,
}

async fn create_session(State(state): State<Arc<AppState>>) -> Json<SessionView> {
    let id = Uuid::new_v4();
    state.editor_sessions.insert(id, RegionEditor::new());
    info!(session_id = %id, "editor session opened");

    Json(SessionView {
        id,
        state: EditorState::Idle,
        committed: None,
    })
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = state
        .editor_sessions
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("editor session {id} not found")))?;

    Ok(Json(SessionView {
        id,
        state: session.state().clone(),
        committed: None,
    }))
}

async fn close_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let (_, session) = state
        .editor_sessions
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("editor session {id} not found")))?;

    info!(session_id = %id, "editor session closed");
    Ok(Json(SessionView {
        id,
        state: session.state().clone(),
        committed: None,
    }))
}

async fn apply_command(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(command): Json<EditorCommand>,
) -> Result<Json<SessionView>, AppError> {
    let mut session = state
        .editor_sessions
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("editor session {id} not found")))?;
    let committer = state.committer();

    let committed = match command {
        EditorCommand::BeginPolygon { name, color, kind } => {
            session.begin_polygon(PolygonTarget {
                id: Uuid::new_v4(),
                name,
                color,
                kind,
            })?;
            None
        }
        EditorCommand::EditStoreCircle { store_id } => {
            let center = state
                .stores
                .get(&store_id)
                .ok_or_else(|| AppError::NotFound(format!("store {store_id} not found")))?
                .location
                .ok_or_else(|| AppError::BadRequest(format!("store {store_id} has no location")))?;
            let existing = match state.regions.get(&store_id) {
                Some(Region::Circle(circle)) => Some(circle.radius_meters),
                _ => None,
            };
            session.begin_circle_edit(store_id, center, existing)?;
            None
        }
        EditorCommand::EnterBlockMode {
            target_id,
            name,
            color,
        } => {
            let target = block_target(&state, target_id, name, color)?;
            session.enter_block_mode(target)?;
            None
        }
        EditorCommand::SetRadius { radius_meters } => {
            session.set_radius(radius_meters)?;
            None
        }
        EditorCommand::Click { point, modifier } => session.click(point, modifier, &committer)?,
        EditorCommand::Undo => {
            session.undo()?;
            None
        }
        EditorCommand::Save => Some(session.save(&committer)?),
        EditorCommand::Cancel => {
            session.cancel();
            None
        }
    };

    Ok(Json(SessionView {
        id,
        state: session.state().clone(),
        committed,
    }))
}

fn block_target(
    state: &AppState,
    target_id: Option<Uuid>,
    name: Option<String>,
    color: Option<String>,
) -> Result<PolygonTarget, AppError> {
    match target_id {
        Some(target_id) => match state.regions.get(&target_id) {
            Some(Region::Polygon(polygon)) => Ok(PolygonTarget {
                id: polygon.id,
                name: name.unwrap_or(polygon.name),
                color: color.unwrap_or(polygon.color),
                kind: PolygonKind::ServiceArea,
            }),
            Some(_) => Err(AppError::BadRequest(format!(
                "region {target_id} is not a service polygon"
            ))),
            None => Err(AppError::NotFound(format!("region {target_id} not found"))),
        },
        None => {
            let name = name
                .filter(|name| !name.trim().is_empty())
                .ok_or_else(|| AppError::BadRequest("name is required for a new block polygon".to_string()))?;
            Ok(PolygonTarget {
                id: Uuid::new_v4(),
                name,
                color: color.unwrap_or_default(),
                kind: PolygonKind::ServiceArea,
            })
        }
    }
}
