//! Coexistence rules between courier zones and customer block areas.
//!
//! Only region centers are tested against the opposing polygons. A zone's
//! circle can still cross a block polygon when neither center is contained.

use crate::error::OverlapError;
use crate::geo::point_in_polygon;
use crate::models::region::{CourierZone, CustomerBlockArea};

pub fn validate_courier_zone_placement(
    candidate: &CourierZone,
    block_areas: &[CustomerBlockArea],
) -> Result<(), OverlapError> {
    match block_areas
        .iter()
        .find(|area| point_in_polygon(&candidate.center, &area.vertices))
    {
        Some(area) => Err(OverlapError::ZoneInsideBlockArea {
            block_area_id: area.id,
            block_area_name: area.name.clone(),
        }),
        None => Ok(()),
    }
}

pub fn validate_block_area_placement(
    candidate: &CustomerBlockArea,
    courier_zones: &[CourierZone],
) -> Result<(), OverlapError> {
    match courier_zones
        .iter()
        .find(|zone| point_in_polygon(&zone.center, &candidate.vertices))
    {
        Some(zone) => Err(OverlapError::BlockAreaContainsZone {
            zone_id: zone.id,
            zone_name: zone.name.clone(),
        }),
        None => Ok(()),
    }
}
