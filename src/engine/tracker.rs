use std::collections::VecDeque;

use dashmap::DashMap;
use uuid::Uuid;

use crate::engine::waiting::detect_waiting_points;
use crate::error::ValidationError;
use crate::models::courier::{CourierLocationSample, WaitingPoint};

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

#[derive(Debug, Default)]
struct CourierTrack {
    samples: VecDeque<CourierLocationSample>,
    waiting_points: Vec<WaitingPoint>,
}

/// Bounded per-courier location history.
///
/// Each courier has its own map entry, so ingesting for one courier never
/// waits on another.
pub struct LocationTracker {
    tracks: DashMap<Uuid, CourierTrack>,
    capacity: usize,
}

impl Default for LocationTracker {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl LocationTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            tracks: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Appends a sample, evicting the oldest beyond capacity, and returns the
    /// waiting points recomputed over the retained history.
    pub fn append_sample(
        &self,
        sample: CourierLocationSample,
    ) -> Result<Vec<WaitingPoint>, ValidationError> {
        if !sample.coordinate.is_valid() {
            return Err(ValidationError::InvalidCoordinate {
                lat: sample.coordinate.lat,
                lng: sample.coordinate.lng,
            });
        }

        let mut track = self.tracks.entry(sample.courier_id).or_default();

        if let Some(last) = track.samples.back() {
            if sample.timestamp_millis < last.timestamp_millis {
                return Err(ValidationError::OutOfOrderSample {
                    timestamp_millis: sample.timestamp_millis,
                    last_millis: last.timestamp_millis,
                });
            }
        }

        track.samples.push_back(sample);
        while track.samples.len() > self.capacity {
            track.samples.pop_front();
        }

        let waiting_points = detect_waiting_points(track.samples.make_contiguous());
        track.waiting_points = waiting_points.clone();
        Ok(waiting_points)
    }

    pub fn history(&self, courier_id: &Uuid) -> Vec<CourierLocationSample> {
        self.tracks
            .get(courier_id)
            .map(|track| track.samples.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn waiting_points(&self, courier_id: &Uuid) -> Vec<WaitingPoint> {
        self.tracks
            .get(courier_id)
            .map(|track| track.waiting_points.clone())
            .unwrap_or_default()
    }

    pub fn tracked_couriers(&self) -> usize {
        self.tracks.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
