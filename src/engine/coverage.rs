use serde::Serialize;
use uuid::Uuid;

use crate::geo::{distance_meters, point_in_polygon, Coordinate};
use crate::models::region::Region;

/// Which regions cover a point, and whether delivery may be offered there.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageReport {
    pub deliverable: bool,
    pub service_areas: Vec<Uuid>,
    pub store_circles: Vec<Uuid>,
    pub courier_zones: Vec<Uuid>,
    pub blocked_by: Vec<Uuid>,
}

/// A point is deliverable when a service area or store circle covers it and
/// no block area does. Courier zones are reported but do not decide.
pub fn check_coverage(point: &Coordinate, regions: &[Region]) -> CoverageReport {
    let mut report = CoverageReport::default();

    for region in regions {
        match region {
            Region::Polygon(polygon) if point_in_polygon(point, &polygon.vertices) => {
                report.service_areas.push(polygon.id)
            }
            Region::Circle(circle) if distance_meters(&circle.center, point) <= circle.radius_meters => {
                report.store_circles.push(circle.owner_id)
            }
            Region::CourierZone(zone)
                if distance_meters(&zone.center, point) <= zone.multi_package_radius_meters =>
            {
                report.courier_zones.push(zone.id)
            }
            Region::BlockArea(area) if point_in_polygon(point, &area.vertices) => {
                report.blocked_by.push(area.id)
            }
            _ => {}
        }
    }

    report.service_areas.sort();
    report.store_circles.sort();
    report.courier_zones.sort();
    report.blocked_by.sort();

    let covered = !report.service_areas.is_empty() || !report.store_circles.is_empty();
    report.deliverable = covered && report.blocked_by.is_empty();
    report
}
