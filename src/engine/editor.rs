//! Interactive region authoring.
//!
//! Every authoring flow is a variant of [`EditorState`]; a command that does
//! not fit the current variant is an [`EditorError::IllegalTransition`].
//! Commits go through a [`CommitRegion`] sink, and the state only moves back
//! to `Idle` once the sink has accepted the region.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EditorError, ValidationError};
use crate::geo::{circle_vertices, convex_hull, distance_meters, distinct_vertex_count, Coordinate};
use crate::models::region::{
    validate_circle_radius, CircleRegion, CustomerBlockArea, PolygonRegion, Region,
};

pub const CLOSE_SNAP_METERS: f64 = 20.0;
pub const DEFAULT_CIRCLE_RADIUS_METERS: f64 = 2_000.0;
pub const BLOCK_CIRCLE_RADIUS_METERS: f64 = 300.0;
pub const WIDE_BLOCK_CIRCLE_RADIUS_METERS: f64 = 500.0;
pub const BLOCK_CIRCLE_SEGMENTS: usize = 8;

/// Receives finished regions from the editor.
pub trait CommitRegion {
    type Error: From<EditorError>;

    fn commit(&self, region: Region) -> Result<Region, Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolygonKind {
    ServiceArea,
    BlockArea,
}

/// The polygon region a drawing or block composition will produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonTarget {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub kind: PolygonKind,
}

impl PolygonTarget {
    fn region(&self, vertices: Vec<Coordinate>) -> Region {
        match self.kind {
            PolygonKind::ServiceArea => Region::Polygon(PolygonRegion {
                id: self.id,
                name: self.name.clone(),
                color: self.color.clone(),
                vertices,
            }),
            PolygonKind::BlockArea => Region::BlockArea(CustomerBlockArea {
                id: self.id,
                name: self.name.clone(),
                vertices,
                color: self.color.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockCircle {
    pub center: Coordinate,
    pub radius_meters: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state")]
pub enum EditorState {
    #[default]
    Idle,
    DrawingPolygon {
        target: PolygonTarget,
        points: Vec<Coordinate>,
        undo_stack: Vec<Vec<Coordinate>>,
    },
    EditingCircle {
        owner_id: Uuid,
        center: Coordinate,
        radius_meters: f64,
    },
    BlockComposing {
        target: PolygonTarget,
        circles: Vec<BlockCircle>,
    },
}

impl EditorState {
    pub fn name(&self) -> &'static str {
        match self {
            EditorState::Idle => "idle",
            EditorState::DrawingPolygon { .. } => "drawing a polygon",
            EditorState::EditingCircle { .. } => "editing a circle",
            EditorState::BlockComposing { .. } => "composing blocks",
        }
    }
}

#[derive(Debug, Default)]
pub struct RegionEditor {
    state: EditorState,
}

impl RegionEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn begin_polygon(&mut self, target: PolygonTarget) -> Result<(), EditorError> {
        self.require_idle("begin a polygon")?;
        self.state = EditorState::DrawingPolygon {
            target,
            points: Vec::new(),
            undo_stack: Vec::new(),
        };
        Ok(())
    }

    /// Starts from the store's current radius, or 2 km when it has none.
    pub fn begin_circle_edit(
        &mut self,
        owner_id: Uuid,
        center: Coordinate,
        existing_radius_meters: Option<f64>,
    ) -> Result<(), EditorError> {
        self.require_idle("edit a circle")?;
        require_valid(&center)?;
        self.state = EditorState::EditingCircle {
            owner_id,
            center,
            radius_meters: existing_radius_meters.unwrap_or(DEFAULT_CIRCLE_RADIUS_METERS),
        };
        Ok(())
    }

    pub fn enter_block_mode(&mut self, target: PolygonTarget) -> Result<(), EditorError> {
        self.require_idle("enter block mode")?;
        self.state = EditorState::BlockComposing {
            target,
            circles: Vec::new(),
        };
        Ok(())
    }

    /// Live radius change; the range is only enforced on save.
    pub fn set_radius(&mut self, new_radius_meters: f64) -> Result<(), EditorError> {
        match &mut self.state {
            EditorState::EditingCircle { radius_meters, .. } => {
                *radius_meters = new_radius_meters;
                Ok(())
            }
            other => Err(illegal("set a radius", other)),
        }
    }

    /// A map click. Returns the committed region when the click closed a polygon.
    pub fn click<C: CommitRegion>(
        &mut self,
        point: Coordinate,
        modifier: bool,
        sink: &C,
    ) -> Result<Option<Region>, C::Error> {
        require_valid(&point)?;

        match &mut self.state {
            EditorState::DrawingPolygon {
                target,
                points,
                undo_stack,
            } => {
                let closes = points.len() >= 3
                    && points
                        .first()
                        .is_some_and(|first| distance_meters(first, &point) <= CLOSE_SNAP_METERS);

                if closes {
                    let region = target.region(closed(points));
                    region.validate().map_err(EditorError::from)?;
                    let committed = sink.commit(region)?;
                    self.state = EditorState::Idle;
                    return Ok(Some(committed));
                }

                undo_stack.push(points.clone());
                points.push(point);
                Ok(None)
            }
            EditorState::BlockComposing { circles, .. } => {
                let hit = circles
                    .iter()
                    .position(|circle| distance_meters(&circle.center, &point) <= circle.radius_meters);

                match hit {
                    Some(index) => {
                        circles.remove(index);
                    }
                    None => circles.push(BlockCircle {
                        center: point,
                        radius_meters: if modifier {
                            WIDE_BLOCK_CIRCLE_RADIUS_METERS
                        } else {
                            BLOCK_CIRCLE_RADIUS_METERS
                        },
                    }),
                }
                Ok(None)
            }
            other => Err(illegal("place a point", other).into()),
        }
    }

    /// Restores the point list from before the last click. No-op when
    /// nothing is left to undo.
    pub fn undo(&mut self) -> Result<(), EditorError> {
        match &mut self.state {
            EditorState::DrawingPolygon {
                points, undo_stack, ..
            } => {
                if let Some(previous) = undo_stack.pop() {
                    *points = previous;
                }
                Ok(())
            }
            other => Err(illegal("undo", other)),
        }
    }

    pub fn cancel(&mut self) {
        self.state = EditorState::Idle;
    }

    /// Commits the current authoring state. On any error the state is kept
    /// as it was so the operator can correct it.
    pub fn save<C: CommitRegion>(&mut self, sink: &C) -> Result<Region, C::Error> {
        let region = match &self.state {
            EditorState::DrawingPolygon { target, points, .. } => {
                if points.len() < 3 {
                    return Err(EditorError::from(ValidationError::TooFewVertices {
                        count: distinct_vertex_count(points),
                    })
                    .into());
                }
                target.region(closed(points))
            }
            EditorState::EditingCircle {
                owner_id,
                center,
                radius_meters,
            } => {
                validate_circle_radius(*radius_meters).map_err(EditorError::from)?;
                Region::Circle(CircleRegion {
                    owner_id: *owner_id,
                    center: *center,
                    radius_meters: *radius_meters,
                })
            }
            EditorState::BlockComposing { target, circles } => {
                target.region(compose_blocks(circles).map_err(EditorError::from)?)
            }
            EditorState::Idle => return Err(illegal("save", &self.state).into()),
        };

        region.validate().map_err(EditorError::from)?;
        let committed = sink.commit(region)?;
        self.state = EditorState::Idle;
        Ok(committed)
    }

    fn require_idle(&self, action: &'static str) -> Result<(), EditorError> {
        match self.state {
            EditorState::Idle => Ok(()),
            ref other => Err(illegal(action, other)),
        }
    }
}

/// Best-effort merge of block circles: every circle becomes a regular
/// octagon and the result is the convex hull of all octagon vertices. Gaps
/// between separate circles end up inside the hull.
pub fn compose_blocks(circles: &[BlockCircle]) -> Result<Vec<Coordinate>, ValidationError> {
    if circles.is_empty() {
        return Err(ValidationError::EmptyComposition);
    }

    let points: Vec<Coordinate> = circles
        .iter()
        .flat_map(|circle| circle_vertices(&circle.center, circle.radius_meters, BLOCK_CIRCLE_SEGMENTS))
        .collect();

    let hull = convex_hull(&points);
    if hull.len() < 4 {
        return Err(ValidationError::DegeneratePolygon);
    }
    Ok(hull)
}

fn closed(points: &[Coordinate]) -> Vec<Coordinate> {
    let mut vertices = points.to_vec();
    if let Some(first) = points.first() {
        vertices.push(*first);
    }
    vertices
}

fn require_valid(point: &Coordinate) -> Result<(), EditorError> {
    if point.is_valid() {
        Ok(())
    } else {
        Err(ValidationError::InvalidCoordinate {
            lat: point.lat,
            lng: point.lng,
        }
        .into())
    }
}

fn illegal(action: &'static str, state: &EditorState) -> EditorError {
    EditorError::IllegalTransition {
        action,
        state: state.name(),
    }
}
