use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::editor::CommitRegion;
use crate::engine::overlap::{validate_block_area_placement, validate_courier_zone_placement};
use crate::engine::region_store::{RegionSink, RegionStore};
use crate::error::AppError;
use crate::models::region::{Region, RegionPatch};
use crate::observability::metrics::Metrics;

/// Gatekeeper between authoring and the region store: nothing reaches the
/// store without passing shape validation and the overlap rules.
pub struct RegionCommitter<'a> {
    store: &'a RegionStore,
    metrics: &'a Metrics,
}

impl<'a> RegionCommitter<'a> {
    pub fn new(store: &'a RegionStore, metrics: &'a Metrics) -> Self {
        Self { store, metrics }
    }

    pub fn check(&self, region: &Region) -> Result<(), AppError> {
        region.validate()?;

        match region {
            Region::CourierZone(zone) => {
                validate_courier_zone_placement(zone, &self.store.block_areas())?
            }
            Region::BlockArea(area) => {
                validate_block_area_placement(area, &self.store.courier_zones())?
            }
            Region::Circle(_) | Region::Polygon(_) => {}
        }

        Ok(())
    }

    pub fn save(&self, region: Region) -> Result<Region, AppError> {
        let _commit = self.store.lock_commits();
        self.save_locked(region)
    }

    /// Applies `patch` to a copy of the stored region and commits the copy.
    /// A rejected patch leaves the stored region untouched.
    pub fn update(&self, id: Uuid, patch: RegionPatch) -> Result<Region, AppError> {
        let _commit = self.store.lock_commits();

        let mut region = self
            .store
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("region {id} not found")))?;

        region.apply(patch)?;
        self.save_locked(region)
    }

    pub fn delete(&self, id: Uuid) -> Result<Region, AppError> {
        let _commit = self.store.lock_commits();

        let removed = self
            .store
            .delete(id)
            .ok_or_else(|| AppError::NotFound(format!("region {id} not found")))?;

        info!(region_id = %id, kind = removed.kind().as_str(), "region deleted");
        Ok(removed)
    }

    fn save_locked(&self, region: Region) -> Result<Region, AppError> {
        let kind = region.kind().as_str();

        if let Err(err) = self.check(&region) {
            self.metrics
                .region_commits_total
                .with_label_values(&[kind, "rejected"])
                .inc();
            warn!(region_id = %region.id(), kind, error = %err, "region rejected");
            return Err(err);
        }

        self.store.save(region.clone());
        self.metrics
            .region_commits_total
            .with_label_values(&[kind, "committed"])
            .inc();
        info!(region_id = %region.id(), kind, "region committed");

        Ok(region)
    }
}

impl CommitRegion for RegionCommitter<'_> {
    type Error = AppError;

    fn commit(&self, region: Region) -> Result<Region, AppError> {
        self.save(region)
    }
}
