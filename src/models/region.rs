use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::geo::{self, Coordinate};

pub const MIN_CIRCLE_RADIUS_METERS: f64 = 100.0;
pub const MAX_CIRCLE_RADIUS_METERS: f64 = 50_000.0;

const MIN_POLYGON_AREA_SQUARE_METERS: f64 = 1.0;

/// Delivery circle owned by a store. Keyed by the store id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircleRegion {
    pub owner_id: Uuid,
    pub center: Coordinate,
    pub radius_meters: f64,
}

/// App-wide service area, also the output of block composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonRegion {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub vertices: Vec<Coordinate>,
}

/// Two concentric radii around a courier base: single-package inside,
/// multi-package out to the larger one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourierZone {
    pub id: Uuid,
    pub name: String,
    pub center: Coordinate,
    pub single_package_radius_meters: f64,
    pub multi_package_radius_meters: f64,
    pub max_delivery_km: f64,
    pub notifications_enabled: bool,
    pub color: String,
}

/// Polygon where delivery must not be offered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerBlockArea {
    pub id: Uuid,
    pub name: String,
    pub vertices: Vec<Coordinate>,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Region {
    Circle(CircleRegion),
    Polygon(PolygonRegion),
    CourierZone(CourierZone),
    BlockArea(CustomerBlockArea),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionKind {
    Circle,
    Polygon,
    CourierZone,
    BlockArea,
}

impl RegionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionKind::Circle => "circle",
            RegionKind::Polygon => "polygon",
            RegionKind::CourierZone => "courier_zone",
            RegionKind::BlockArea => "block_area",
        }
    }
}

/// Partial update for drag, resize and rename edits. Fields that do not
/// exist on the target region's kind are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub center: Option<Coordinate>,
    pub radius_meters: Option<f64>,
    pub single_package_radius_meters: Option<f64>,
    pub multi_package_radius_meters: Option<f64>,
    pub max_delivery_km: Option<f64>,
    pub notifications_enabled: Option<bool>,
    pub vertices: Option<Vec<Coordinate>>,
}

impl Region {
    pub fn id(&self) -> Uuid {
        match self {
            Region::Circle(circle) => circle.owner_id,
            Region::Polygon(polygon) => polygon.id,
            Region::CourierZone(zone) => zone.id,
            Region::BlockArea(area) => area.id,
        }
    }

    pub fn kind(&self) -> RegionKind {
        match self {
            Region::Circle(_) => RegionKind::Circle,
            Region::Polygon(_) => RegionKind::Polygon,
            Region::CourierZone(_) => RegionKind::CourierZone,
            Region::BlockArea(_) => RegionKind::BlockArea,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Region::Circle(_) => None,
            Region::Polygon(polygon) => Some(&polygon.name),
            Region::CourierZone(zone) => Some(&zone.name),
            Region::BlockArea(area) => Some(&area.name),
        }
    }

    /// Circles and zones use their outer radius.
    pub fn area_square_meters(&self) -> f64 {
        match self {
            Region::Circle(circle) => std::f64::consts::PI * circle.radius_meters.powi(2),
            Region::CourierZone(zone) => {
                std::f64::consts::PI * zone.multi_package_radius_meters.powi(2)
            }
            Region::Polygon(polygon) => geo::polygon_area_square_meters(&polygon.vertices),
            Region::BlockArea(area) => geo::polygon_area_square_meters(&area.vertices),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Region::Circle(circle) => {
                validate_coordinate(&circle.center)?;
                validate_circle_radius(circle.radius_meters)
            }
            Region::Polygon(polygon) => {
                validate_name(&polygon.name)?;
                validate_ring(&polygon.vertices)
            }
            Region::CourierZone(zone) => {
                validate_name(&zone.name)?;
                validate_coordinate(&zone.center)?;
                validate_zone_radii(
                    zone.single_package_radius_meters,
                    zone.multi_package_radius_meters,
                )?;
                if !(zone.max_delivery_km > 0.0) {
                    return Err(ValidationError::NonPositive {
                        field: "max_delivery_km",
                    });
                }
                Ok(())
            }
            Region::BlockArea(area) => {
                validate_name(&area.name)?;
                validate_ring(&area.vertices)
            }
        }
    }

    /// Applies `patch` in place. Does not validate the result.
    pub fn apply(&mut self, patch: RegionPatch) -> Result<(), ValidationError> {
        let kind = self.kind().as_str();
        let not_applicable = |field: &'static str| ValidationError::FieldNotApplicable { field, kind };

        match self {
            Region::Circle(circle) => {
                if patch.name.is_some() {
                    return Err(not_applicable("name"));
                }
                if patch.color.is_some() {
                    return Err(not_applicable("color"));
                }
                reject_zone_fields(&patch, not_applicable)?;
                if patch.vertices.is_some() {
                    return Err(not_applicable("vertices"));
                }
                if let Some(center) = patch.center {
                    circle.center = center;
                }
                if let Some(radius) = patch.radius_meters {
                    circle.radius_meters = radius;
                }
            }
            Region::Polygon(polygon) => {
                reject_circle_fields(&patch, not_applicable)?;
                reject_zone_fields(&patch, not_applicable)?;
                if let Some(name) = patch.name {
                    polygon.name = name;
                }
                if let Some(color) = patch.color {
                    polygon.color = color;
                }
                if let Some(vertices) = patch.vertices {
                    polygon.vertices = geo::close_ring(vertices);
                }
            }
            Region::BlockArea(area) => {
                reject_circle_fields(&patch, not_applicable)?;
                reject_zone_fields(&patch, not_applicable)?;
                if let Some(name) = patch.name {
                    area.name = name;
                }
                if let Some(color) = patch.color {
                    area.color = color;
                }
                if let Some(vertices) = patch.vertices {
                    area.vertices = geo::close_ring(vertices);
                }
            }
            Region::CourierZone(zone) => {
                if patch.radius_meters.is_some() {
                    return Err(not_applicable("radius_meters"));
                }
                if patch.vertices.is_some() {
                    return Err(not_applicable("vertices"));
                }
                if let Some(name) = patch.name {
                    zone.name = name;
                }
                if let Some(color) = patch.color {
                    zone.color = color;
                }
                if let Some(center) = patch.center {
                    zone.center = center;
                }
                if let Some(single) = patch.single_package_radius_meters {
                    zone.single_package_radius_meters = single;
                }
                if let Some(multi) = patch.multi_package_radius_meters {
                    zone.multi_package_radius_meters = multi;
                }
                if let Some(max_km) = patch.max_delivery_km {
                    zone.max_delivery_km = max_km;
                }
                if let Some(enabled) = patch.notifications_enabled {
                    zone.notifications_enabled = enabled;
                }
            }
        }

        Ok(())
    }
}

fn reject_circle_fields(
    patch: &RegionPatch,
    not_applicable: impl Fn(&'static str) -> ValidationError,
) -> Result<(), ValidationError> {
    if patch.center.is_some() {
        return Err(not_applicable("center"));
    }
    if patch.radius_meters.is_some() {
        return Err(not_applicable("radius_meters"));
    }
    Ok(())
}

fn reject_zone_fields(
    patch: &RegionPatch,
    not_applicable: impl Fn(&'static str) -> ValidationError,
) -> Result<(), ValidationError> {
    if patch.single_package_radius_meters.is_some() {
        return Err(not_applicable("single_package_radius_meters"));
    }
    if patch.multi_package_radius_meters.is_some() {
        return Err(not_applicable("multi_package_radius_meters"));
    }
    if patch.max_delivery_km.is_some() {
        return Err(not_applicable("max_delivery_km"));
    }
    if patch.notifications_enabled.is_some() {
        return Err(not_applicable("notifications_enabled"));
    }
    Ok(())
}

pub fn validate_circle_radius(radius_meters: f64) -> Result<(), ValidationError> {
    if (MIN_CIRCLE_RADIUS_METERS..=MAX_CIRCLE_RADIUS_METERS).contains(&radius_meters) {
        Ok(())
    } else {
        Err(ValidationError::RadiusOutOfRange {
            radius_km: radius_meters / 1000.0,
        })
    }
}

pub fn validate_zone_radii(single_meters: f64, multi_meters: f64) -> Result<(), ValidationError> {
    if !(single_meters > 0.0) {
        return Err(ValidationError::NonPositive {
            field: "single_package_radius_meters",
        });
    }
    if !(single_meters < multi_meters) {
        return Err(ValidationError::InvertedZoneRadii {
            single_meters,
            multi_meters,
        });
    }
    Ok(())
}

/// A closed ring with at least three distinct vertices and a real area.
pub fn validate_ring(vertices: &[Coordinate]) -> Result<(), ValidationError> {
    for vertex in vertices {
        validate_coordinate(vertex)?;
    }

    let count = geo::distinct_vertex_count(vertices);
    if count < 3 {
        return Err(ValidationError::TooFewVertices { count });
    }
    if !geo::is_closed_ring(vertices) {
        return Err(ValidationError::OpenRing);
    }
    if geo::polygon_area_square_meters(vertices) < MIN_POLYGON_AREA_SQUARE_METERS {
        return Err(ValidationError::DegeneratePolygon);
    }
    Ok(())
}

fn validate_coordinate(coordinate: &Coordinate) -> Result<(), ValidationError> {
    if coordinate.is_valid() {
        Ok(())
    } else {
        Err(ValidationError::InvalidCoordinate {
            lat: coordinate.lat,
            lng: coordinate.lng,
        })
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        Err(ValidationError::Empty { field: "name" })
    } else {
        Ok(())
    }
}
