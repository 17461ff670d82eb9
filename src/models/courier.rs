use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::Coordinate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CourierStatus {
    Online,
    Busy,
    Offline,
}

/// Directory entry for a courier. `location` is `None` until the first fix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub id: Uuid,
    pub name: String,
    pub location: Option<Coordinate>,
    pub status: CourierStatus,
    pub max_delivery_km: f64,
    pub notifications_enabled: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourierLocationSample {
    pub courier_id: Uuid,
    pub coordinate: Coordinate,
    pub timestamp_millis: i64,
}

/// An interval where the courier stayed within the movement threshold for
/// at least the minimum dwell time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitingPoint {
    pub coordinate: Coordinate,
    pub start_millis: i64,
    pub end_millis: i64,
    pub duration_millis: i64,
}
