use serde::Serialize;
use uuid::Uuid;

use crate::geo::distance_meters;
use crate::models::region::CourierZone;
use crate::models::store::Store;

/// Stores slightly beyond the outer radius stay listed so operators can see
/// near misses while tuning a zone.
pub const INCLUSION_BUFFER_METERS: f64 = 10_000.0;

#[derive(Debug, Clone, Serialize)]
pub struct NearbyStore {
    pub store_id: Uuid,
    pub store_name: String,
    pub distance_meters: f64,
    pub within_single: bool,
    pub within_multi: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ZoneAnalysis {
    pub zone: CourierZone,
    pub nearby_stores: Vec<NearbyStore>,
}

/// Matches every zone against every located store. Stores without a
/// location and zones with an unusable center are skipped.
pub fn analyze_proximity(zones: &[CourierZone], stores: &[Store]) -> Vec<ZoneAnalysis> {
    zones
        .iter()
        .filter(|zone| zone.center.is_valid())
        .map(|zone| ZoneAnalysis {
            zone: zone.clone(),
            nearby_stores: nearby_stores(zone, stores),
        })
        .collect()
}

fn nearby_stores(zone: &CourierZone, stores: &[Store]) -> Vec<NearbyStore> {
    let limit = zone.multi_package_radius_meters + INCLUSION_BUFFER_METERS;

    let mut nearby: Vec<NearbyStore> = stores
        .iter()
        .filter_map(|store| {
            let location = store.location.as_ref().filter(|location| location.is_valid())?;
            let distance = distance_meters(&zone.center, location);
            if distance > limit {
                return None;
            }

            Some(NearbyStore {
                store_id: store.id,
                store_name: store.name.clone(),
                distance_meters: distance,
                within_single: distance <= zone.single_package_radius_meters,
                within_multi: distance <= zone.multi_package_radius_meters,
            })
        })
        .collect();

    nearby.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
    nearby
}
