use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use prometheus::IntGauge;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::notify::{check_proximity, dispatch};
use crate::error::{AppError, ValidationError};
use crate::models::courier::{Courier, CourierLocationSample};
use crate::models::event::TrackingUpdate;
use crate::models::store::Store;
use crate::state::AppState;

/// One periodic sampling task per tracked courier.
pub struct TrackingScheduler {
    interval: Duration,
    tasks: DashMap<Uuid, JoinHandle<()>>,
    active_gauge: IntGauge,
}

impl TrackingScheduler {
    pub fn new(interval: Duration, active_gauge: IntGauge) -> Self {
        Self {
            interval,
            tasks: DashMap::new(),
            active_gauge,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Starts sampling `courier_id`. A task already running for that courier
    /// is aborted and replaced. Returns whether one was replaced.
    pub fn start(&self, state: Arc<AppState>, courier_id: Uuid) -> bool {
        let handle = tokio::spawn(run_tracking_loop(state, courier_id, self.interval));

        let replaced = match self.tasks.insert(courier_id, handle) {
            Some(previous) => {
                previous.abort();
                true
            }
            None => false,
        };
        self.active_gauge.set(self.tasks.len() as i64);

        info!(courier_id = %courier_id, replaced, interval_secs = self.interval.as_secs_f64(), "tracking started");
        replaced
    }

    /// Stops sampling immediately. Recorded history is kept. Stopping a
    /// courier that is not tracked is a no-op and returns false.
    pub fn stop(&self, courier_id: &Uuid) -> bool {
        let Some((_, handle)) = self.tasks.remove(courier_id) else {
            return false;
        };

        handle.abort();
        self.active_gauge.set(self.tasks.len() as i64);
        info!(courier_id = %courier_id, "tracking stopped");
        true
    }

    pub fn stop_all(&self) {
        let ids: Vec<Uuid> = self.tasks.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            self.stop(&id);
        }
    }

    pub fn is_tracking(&self, courier_id: &Uuid) -> bool {
        self.tasks
            .get(courier_id)
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn active(&self) -> usize {
        self.tasks.len()
    }
}

/// How far ahead of the server clock a client-stamped sample may be.
pub const MAX_CLOCK_SKEW_MILLIS: i64 = 60_000;

/// Checks a client-stamped sample time against the server clock. Stamps in
/// `0..=now + MAX_CLOCK_SKEW_MILLIS` are accepted and clamped to `now`, so a
/// later scheduler sample is never older than a client one.
pub fn accept_client_timestamp(timestamp_millis: i64, now_millis: i64) -> Result<i64, ValidationError> {
    let latest_millis = now_millis.saturating_add(MAX_CLOCK_SKEW_MILLIS);
    if (0..=latest_millis).contains(&timestamp_millis) {
        Ok(timestamp_millis.min(now_millis))
    } else {
        Err(ValidationError::TimestampOutOfRange {
            timestamp_millis,
            latest_millis,
        })
    }
}

/// Stops sampling for a courier leaving service and drops its per-courier
/// metric series and proximity latch. History stays readable.
pub fn retire_courier(state: &AppState, courier_id: &Uuid) {
    state.scheduler.stop(courier_id);
    state.latch.forget(courier_id);
    let _ = state
        .metrics
        .waiting_points
        .remove_label_values(&[&courier_id.to_string()]);
}

async fn run_tracking_loop(state: Arc<AppState>, courier_id: Uuid, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let location = match state.couriers.get(&courier_id) {
            Some(courier) => courier.location,
            None => {
                warn!(courier_id = %courier_id, "courier no longer in directory; sampling ended");
                break;
            }
        };

        let Some(coordinate) = location else {
            debug!(courier_id = %courier_id, "no location fix yet");
            continue;
        };

        let sample = CourierLocationSample {
            courier_id,
            coordinate,
            timestamp_millis: Utc::now().timestamp_millis(),
        };

        if let Err(err) = ingest_sample(&state, sample) {
            warn!(courier_id = %courier_id, error = %err, "sample rejected");
        }
    }
}

/// Records a sample and runs everything downstream of it: waiting-point
/// recomputation, the courier's directory position, proximity notifications
/// and the tracking update broadcast.
pub fn ingest_sample(state: &AppState, sample: CourierLocationSample) -> Result<TrackingUpdate, AppError> {
    let courier_id = sample.courier_id;

    let waiting_points = match state.tracker.append_sample(sample.clone()) {
        Ok(points) => points,
        Err(err) => {
            state
                .metrics
                .location_samples_total
                .with_label_values(&["rejected"])
                .inc();
            return Err(err.into());
        }
    };

    state
        .metrics
        .location_samples_total
        .with_label_values(&["accepted"])
        .inc();
    state
        .metrics
        .waiting_points
        .with_label_values(&[&courier_id.to_string()])
        .set(waiting_points.len() as f64);

    let courier = state.couriers.get_mut(&courier_id).map(|mut courier| {
        courier.location = Some(sample.coordinate);
        courier.updated_at = Utc::now();
        courier.clone()
    });

    if let Some(courier) = courier {
        notify_proximity(state, &courier);
    }

    let update = TrackingUpdate {
        sample,
        waiting_points,
    };
    let _ = state.tracking_events_tx.send(update.clone());

    debug!(
        courier_id = %courier_id,
        waiting_points = update.waiting_points.len(),
        "sample ingested"
    );

    Ok(update)
}

fn notify_proximity(state: &AppState, courier: &Courier) {
    let stores: Vec<Store> = state
        .stores
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    let others: Vec<Courier> = state
        .couriers
        .iter()
        .filter(|entry| *entry.key() != courier.id)
        .map(|entry| entry.value().clone())
        .collect();

    let events = check_proximity(courier, &stores, &others);
    let crossings = state.latch.crossings(courier.id, events);
    dispatch(state.notifier.as_ref(), &state.metrics, &crossings);
}
