use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::Config;
use crate::engine::editor::RegionEditor;
use crate::engine::notify::{BroadcastSink, NotificationSink, ProximityLatch};
use crate::engine::region_store::RegionStore;
use crate::engine::regions::RegionCommitter;
use crate::engine::tracker::LocationTracker;
use crate::engine::tracking::TrackingScheduler;
use crate::models::courier::Courier;
use crate::models::event::{ProximityEvent, TrackingUpdate};
use crate::models::store::Store;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub regions: RegionStore,
    pub stores: DashMap<Uuid, Store>,
    pub couriers: DashMap<Uuid, Courier>,
    pub editor_sessions: DashMap<Uuid, RegionEditor>,
    pub tracker: LocationTracker,
    pub scheduler: TrackingScheduler,
    pub latch: ProximityLatch,
    pub notifier: Arc<dyn NotificationSink>,
    pub proximity_events_tx: broadcast::Sender<ProximityEvent>,
    pub tracking_events_tx: broadcast::Sender<TrackingUpdate>,
    pub metrics: Metrics,
}

impl AppState {
    /// State whose proximity events go to the websocket broadcast channel.
    pub fn new(event_buffer_size: usize, history_capacity: usize, tracking_interval: Duration) -> Self {
        let (proximity_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);
        let notifier = Arc::new(BroadcastSink::new(proximity_events_tx.clone()));

        Self::build(
            event_buffer_size,
            history_capacity,
            tracking_interval,
            proximity_events_tx,
            notifier,
        )
    }

    /// State with a caller-provided notification sink.
    pub fn with_notifier(
        event_buffer_size: usize,
        history_capacity: usize,
        tracking_interval: Duration,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let (proximity_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self::build(
            event_buffer_size,
            history_capacity,
            tracking_interval,
            proximity_events_tx,
            notifier,
        )
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.event_buffer_size,
            config.history_capacity,
            Duration::from_secs(config.tracking_interval_secs),
        )
    }

    fn build(
        event_buffer_size: usize,
        history_capacity: usize,
        tracking_interval: Duration,
        proximity_events_tx: broadcast::Sender<ProximityEvent>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let (tracking_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);
        let metrics = Metrics::new();
        let scheduler = TrackingScheduler::new(tracking_interval, metrics.tracked_couriers.clone());

        Self {
            regions: RegionStore::new(),
            stores: DashMap::new(),
            couriers: DashMap::new(),
            editor_sessions: DashMap::new(),
            tracker: LocationTracker::new(history_capacity),
            scheduler,
            latch: ProximityLatch::new(),
            notifier,
            proximity_events_tx,
            tracking_events_tx,
            metrics,
        }
    }

    pub fn committer(&self) -> RegionCommitter<'_> {
        RegionCommitter::new(&self.regions, &self.metrics)
    }
}
