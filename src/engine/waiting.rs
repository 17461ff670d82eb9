use crate::geo::distance_meters;
use crate::models::courier::{CourierLocationSample, WaitingPoint};

pub const MIN_WAITING_MILLIS: i64 = 120_000;
pub const MAX_MOVEMENT_METERS: f64 = 10.0;

/// Turns an ordered location history into dwell intervals.
///
/// A dwell opens on the first step that moves at most
/// [`MAX_MOVEMENT_METERS`] and is anchored at that step's earlier sample. The
/// first larger step closes it at the earlier sample's timestamp, and the
/// last sample closes a dwell still open at the end. Dwells shorter than
/// [`MIN_WAITING_MILLIS`] are dropped.
///
/// `history` must be sorted by timestamp.
pub fn detect_waiting_points(history: &[CourierLocationSample]) -> Vec<WaitingPoint> {
    let mut waiting_points = Vec::new();
    let mut anchor: Option<&CourierLocationSample> = None;

    for step in history.windows(2) {
        let (prev, curr) = (&step[0], &step[1]);

        if distance_meters(&prev.coordinate, &curr.coordinate) <= MAX_MOVEMENT_METERS {
            anchor.get_or_insert(prev);
        } else if let Some(open) = anchor.take() {
            push_if_long_enough(&mut waiting_points, open, prev.timestamp_millis);
        }
    }

    if let (Some(open), Some(last)) = (anchor, history.last()) {
        push_if_long_enough(&mut waiting_points, open, last.timestamp_millis);
    }

    waiting_points
}

fn push_if_long_enough(
    waiting_points: &mut Vec<WaitingPoint>,
    anchor: &CourierLocationSample,
    end_millis: i64,
) {
    let duration_millis = end_millis.saturating_sub(anchor.timestamp_millis);
    if duration_millis >= MIN_WAITING_MILLIS {
        waiting_points.push(WaitingPoint {
            coordinate: anchor.coordinate,
            start_millis: anchor.timestamp_millis,
            end_millis,
            duration_millis,
        });
    }
}
