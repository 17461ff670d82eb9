use std::collections::HashSet;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::SendError;
use crate::geo::distance_meters;
use crate::models::courier::{Courier, CourierStatus};
use crate::models::event::{ProximityEvent, ProximityTarget};
use crate::models::store::Store;
use crate::observability::metrics::Metrics;

pub const STORE_NOTIFY_METERS: f64 = 2_000.0;
pub const COURIER_ADVISORY_METERS: f64 = 1_000.0;

/// Delivery side of proximity events. Retries, if any, belong to the sink.
pub trait NotificationSink: Send + Sync {
    fn send(&self, event: &ProximityEvent) -> Result<(), SendError>;
}

/// Fans events out to websocket subscribers.
pub struct BroadcastSink {
    tx: broadcast::Sender<ProximityEvent>,
}

impl BroadcastSink {
    pub fn new(tx: broadcast::Sender<ProximityEvent>) -> Self {
        Self { tx }
    }
}

impl NotificationSink for BroadcastSink {
    fn send(&self, event: &ProximityEvent) -> Result<(), SendError> {
        self.tx
            .send(event.clone())
            .map(|_| ())
            .map_err(|_| SendError::NoSubscribers)
    }
}

/// Proximity events for `courier` against the store set and the other
/// couriers. Produces nothing unless the courier is online with
/// notifications enabled and has a known location.
pub fn check_proximity(
    courier: &Courier,
    stores: &[Store],
    other_couriers: &[Courier],
) -> Vec<ProximityEvent> {
    if courier.status != CourierStatus::Online || !courier.notifications_enabled {
        return Vec::new();
    }
    let Some(location) = courier.location.filter(|location| location.is_valid()) else {
        return Vec::new();
    };

    let max_delivery_meters = courier.max_delivery_km * 1_000.0;
    let mut events = Vec::new();

    for store in stores {
        let Some(store_location) = store.location.filter(|l| l.is_valid()) else {
            continue;
        };
        let distance = distance_meters(&location, &store_location);
        if distance <= max_delivery_meters && distance <= STORE_NOTIFY_METERS {
            events.push(ProximityEvent::StoreProximity {
                courier_id: courier.id,
                store_id: store.id,
                courier_location: location,
                distance_meters: distance,
            });
        }
    }

    for other in other_couriers {
        if other.id == courier.id || other.status != CourierStatus::Online {
            continue;
        }
        let Some(other_location) = other.location.filter(|l| l.is_valid()) else {
            continue;
        };
        let distance = distance_meters(&location, &other_location);
        if distance <= COURIER_ADVISORY_METERS {
            events.push(ProximityEvent::CourierProximity {
                courier_id: courier.id,
                other_courier_id: other.id,
                courier_location: location,
                distance_meters: distance,
            });
        }
    }

    events
}

/// Remembers which targets each courier was near on its last evaluation,
/// so only entries into range are forwarded.
#[derive(Default)]
pub struct ProximityLatch {
    inside: DashMap<Uuid, HashSet<ProximityTarget>>,
}

impl ProximityLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn crossings(&self, courier_id: Uuid, events: Vec<ProximityEvent>) -> Vec<ProximityEvent> {
        let current: HashSet<ProximityTarget> = events.iter().map(ProximityEvent::target).collect();
        let previous = self.inside.insert(courier_id, current).unwrap_or_default();

        events
            .into_iter()
            .filter(|event| !previous.contains(&event.target()))
            .collect()
    }

    pub fn forget(&self, courier_id: &Uuid) {
        self.inside.remove(courier_id);
    }
}

/// Hands events to the sink. A failed send is logged and dropped; the next
/// sample re-evaluates proximity anyway.
pub fn dispatch(sink: &dyn NotificationSink, metrics: &Metrics, events: &[ProximityEvent]) {
    for event in events {
        metrics
            .proximity_events_total
            .with_label_values(&[event.kind()])
            .inc();

        match sink.send(event) {
            Ok(()) => debug!(courier_id = %event.courier_id(), kind = event.kind(), "proximity event sent"),
            Err(err) => {
                metrics.notification_failures_total.inc();
                warn!(
                    courier_id = %event.courier_id(),
                    kind = event.kind(),
                    error = %err,
                    "proximity event dropped"
                );
            }
        }
    }
}
