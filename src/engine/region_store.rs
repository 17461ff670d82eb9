use std::sync::{Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use uuid::Uuid;

use crate::models::region::{CourierZone, CustomerBlockArea, Region, RegionKind};

/// Persistence boundary for committed regions.
///
/// The engine only needs committed regions to become visible to later reads;
/// durability is up to the implementation.
pub trait RegionSink: Send + Sync {
    fn save(&self, region: Region);
    fn delete(&self, id: Uuid) -> Option<Region>;
    fn list(&self, kind: RegionKind) -> Vec<Region>;
}

/// In-memory region set keyed by region id.
///
/// Reads clone out so callers never hold a shard lock while computing.
/// Committers take [`RegionStore::lock_commits`] around check-then-write
/// sequences; the map itself only serializes writes per id.
#[derive(Default)]
pub struct RegionStore {
    regions: DashMap<Uuid, Region>,
    commits: Mutex<()>,
}

impl RegionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Held across validation and write so overlap checks see every region
    /// committed before them.
    pub fn lock_commits(&self) -> MutexGuard<'_, ()> {
        self.commits.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, id: &Uuid) -> Option<Region> {
        self.regions.get(id).map(|entry| entry.value().clone())
    }

    pub fn all(&self) -> Vec<Region> {
        self.regions
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn courier_zones(&self) -> Vec<CourierZone> {
        self.regions
            .iter()
            .filter_map(|entry| match entry.value() {
                Region::CourierZone(zone) => Some(zone.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn block_areas(&self) -> Vec<CustomerBlockArea> {
        self.regions
            .iter()
            .filter_map(|entry| match entry.value() {
                Region::BlockArea(area) => Some(area.clone()),
                _ => None,
            })
            .collect()
    }
}

impl RegionSink for RegionStore {
    fn save(&self, region: Region) {
        self.regions.insert(region.id(), region);
    }

    fn delete(&self, id: Uuid) -> Option<Region> {
        self.regions.remove(&id).map(|(_, region)| region)
    }

    fn list(&self, kind: RegionKind) -> Vec<Region> {
        self.regions
            .iter()
            .filter(|entry| entry.value().kind() == kind)
            .map(|entry| entry.value().clone())
            .collect()
    }
}
