use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::Coordinate;
use crate::models::courier::{CourierLocationSample, WaitingPoint};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ProximityEvent {
    StoreProximity {
        courier_id: Uuid,
        store_id: Uuid,
        courier_location: Coordinate,
        distance_meters: f64,
    },
    /// Advisory only; never blocks an assignment.
    CourierProximity {
        courier_id: Uuid,
        other_courier_id: Uuid,
        courier_location: Coordinate,
        distance_meters: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProximityTarget {
    Store(Uuid),
    Courier(Uuid),
}

impl ProximityEvent {
    pub fn courier_id(&self) -> Uuid {
        match self {
            ProximityEvent::StoreProximity { courier_id, .. }
            | ProximityEvent::CourierProximity { courier_id, .. } => *courier_id,
        }
    }

    pub fn target(&self) -> ProximityTarget {
        match self {
            ProximityEvent::StoreProximity { store_id, .. } => ProximityTarget::Store(*store_id),
            ProximityEvent::CourierProximity {
                other_courier_id, ..
            } => ProximityTarget::Courier(*other_courier_id),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProximityEvent::StoreProximity { .. } => "store",
            ProximityEvent::CourierProximity { .. } => "courier",
        }
    }
}

/// Published after every accepted sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingUpdate {
    pub sample: CourierLocationSample,
    pub waiting_points: Vec<WaitingPoint>,
}
