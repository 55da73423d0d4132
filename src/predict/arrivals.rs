/// Arrival predictor: inverts the position model to answer "when does the
/// next train reach this station". Works over the latest published snapshot
/// only; read-only and safe to run concurrently with the tick.
use crate::geometry::GeometryCache;
use crate::models::{ArrivalPrediction, Snapshot, TrainPosition};
use crate::schedule::ScheduleData;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Predictions further out than this are too uncertain to show.
const PREDICTION_HORIZON_SECS: i64 = 45 * 60;

/// Confidence for an arrival within the current segment.
const BASE_CONFIDENCE: f64 = 0.9;

/// Multiplicative decay per additional whole segment still to traverse.
const CONFIDENCE_DECAY_PER_SEGMENT: f64 = 0.95;

pub const DEFAULT_ARRIVALS_LIMIT: usize = 5;

/// Predict arrivals of live trains at a station, soonest first, truncated to
/// `max_results`. Trains on routes not serving the station, trains moving
/// away, and trains already past it are skipped.
pub fn predict_arrivals(
    station_id: &str,
    snapshot: &Snapshot,
    schedule: &ScheduleData,
    geometry: &GeometryCache,
    max_results: usize,
    now: DateTime<Utc>,
) -> Vec<ArrivalPrediction> {
    let mut predictions: Vec<ArrivalPrediction> = snapshot
        .trains
        .iter()
        .filter_map(|train| predict_for_train(station_id, train, schedule, geometry, now))
        .collect();

    predictions.sort_by_key(|p| p.seconds_away);
    predictions.truncate(max_results);
    predictions
}

fn predict_for_train(
    station_id: &str,
    train: &TrainPosition,
    schedule: &ScheduleData,
    geometry: &GeometryCache,
    now: DateTime<Utc>,
) -> Option<ArrivalPrediction> {
    let route = schedule.route(&train.route_id)?;
    if !route.serves(station_id) {
        return None;
    }

    // Station index in the train's direction of travel; oriented segment i
    // runs from oriented station i to i+1.
    let target_index = route.oriented_station_index(station_id, train.direction)?;
    if target_index <= train.segment_index {
        // Moving away or already passed.
        return None;
    }

    let oriented = geometry.oriented(&train.route_id, train.direction)?;
    let current = oriented.segments.get(train.segment_index)?;

    // Remainder of the current segment, plus every complete segment between
    // here and the target station.
    let mut remaining =
        (1.0 - train.segment_progress) * current.travel_time_secs as f64;
    for segment in oriented
        .segments
        .get(train.segment_index + 1..target_index)?
    {
        remaining += segment.travel_time_secs as f64;
    }

    let seconds_away = remaining.round() as i64;
    if seconds_away > PREDICTION_HORIZON_SECS {
        debug!(
            train_id = %train.train_id,
            station_id = %station_id,
            seconds_away,
            "Arrival prediction beyond horizon, discarding"
        );
        return None;
    }

    let whole_segments = (target_index - train.segment_index - 1) as i32;
    let confidence = BASE_CONFIDENCE * CONFIDENCE_DECAY_PER_SEGMENT.powi(whole_segments);

    let arrival_time = now + Duration::seconds(seconds_away);
    Some(ArrivalPrediction {
        train_id: train.train_id.clone(),
        route_id: train.route_id.clone(),
        route_name: train.route_name.clone(),
        direction: train.direction,
        final_destination_station_id: route.terminus(train.direction)?.to_string(),
        arrival_time: arrival_time.to_rfc3339(),
        seconds_away,
        minutes_away: seconds_away / 60,
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::track::{ExclusionSet, FilterContext, TrackStore};
    use crate::models::TrainPosition;
    use crate::schedule::test_fixtures::*;
    use crate::schedule::Direction;
    use chrono::TimeZone;

    fn utc(h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, mi, 0).unwrap()
    }

    /// Seven stations in a row, every segment 120 s.
    fn schedule() -> ScheduleData {
        let ids = ["s0", "s1", "s2", "s3", "s4", "s5", "s6"];
        let stations = ids
            .iter()
            .enumerate()
            .map(|(i, id)| station(id, 10.90, 48.30 - i as f64 * 0.01, i as f64 * 1.1))
            .collect();
        let travels = ids
            .windows(2)
            .map(|w| travel(w[0], w[1], 120))
            .collect();
        ScheduleData::from_parts(
            stations,
            vec![route("r1", &ids, 15, ("05:30:00", "23:00:00"))],
            travels,
        )
        .unwrap()
    }

    fn cache(schedule: &ScheduleData) -> GeometryCache {
        let exclusions = ExclusionSet::default();
        let ctx = FilterContext {
            exclusions: &exclusions,
            bounding_box: None,
        };
        GeometryCache::build(schedule, &TrackStore::empty(), &ctx)
    }

    fn train(
        id: &str,
        direction: Direction,
        segment_index: usize,
        segment_progress: f64,
    ) -> TrainPosition {
        TrainPosition {
            train_id: id.to_string(),
            route_id: "r1".to_string(),
            route_name: "r1".to_string(),
            direction,
            coordinate: [10.90, 48.30],
            bearing_degrees: 180.0,
            progress: 0.5,
            from_station_id: String::new(),
            to_station_id: String::new(),
            segment_index,
            segment_progress,
            departure_time: String::new(),
        }
    }

    fn snapshot(trains: Vec<TrainPosition>) -> Snapshot {
        Snapshot {
            trains,
            tick_seq: 1,
            timestamp: String::new(),
        }
    }

    #[test]
    fn remaining_time_scenario() {
        // Target station s5; forward train on segment 3 (s3 -> s4) at 50%:
        // 60 s remainder plus the full 120 s of segment 4.
        let schedule = schedule();
        let cache = cache(&schedule);
        let snap = snapshot(vec![train("t1", Direction::Forward, 3, 0.5)]);

        let predictions = predict_arrivals("s5", &snap, &schedule, &cache, 5, utc(9, 0));
        assert_eq!(predictions.len(), 1);
        let p = &predictions[0];
        assert_eq!(p.seconds_away, 180);
        assert_eq!(p.minutes_away, 3);
        assert_eq!(p.final_destination_station_id, "s6");
        // One whole segment between: 0.9 * 0.95.
        assert!((p.confidence - 0.855).abs() < 1e-9);
    }

    #[test]
    fn passed_station_never_appears() {
        let schedule = schedule();
        let cache = cache(&schedule);
        // Forward train already on segment 4 (s4 -> s5) heading past s3.
        let snap = snapshot(vec![train("t1", Direction::Forward, 4, 0.2)]);
        assert!(predict_arrivals("s3", &snap, &schedule, &cache, 5, utc(9, 0)).is_empty());
        // Its own from-station does not count either.
        assert!(predict_arrivals("s4", &snap, &schedule, &cache, 5, utc(9, 0)).is_empty());
    }

    #[test]
    fn backward_direction_uses_oriented_indices() {
        let schedule = schedule();
        let cache = cache(&schedule);
        // Backward train on oriented segment 1 (s5 -> s4), halfway through.
        // For s2 (oriented index 4): 60 s + 120 + 120 = 300 s.
        let snap = snapshot(vec![train("t1", Direction::Backward, 1, 0.5)]);
        let predictions = predict_arrivals("s2", &snap, &schedule, &cache, 5, utc(9, 0));
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].seconds_away, 300);
        assert_eq!(predictions[0].final_destination_station_id, "s0");
        // s6 is behind a backward train that started at s6.
        assert!(predict_arrivals("s6", &snap, &schedule, &cache, 5, utc(9, 0)).is_empty());
    }

    #[test]
    fn sorted_and_truncated() {
        let schedule = schedule();
        let cache = cache(&schedule);
        let snap = snapshot(vec![
            train("far", Direction::Forward, 0, 0.0),
            train("near", Direction::Forward, 3, 0.9),
            train("mid", Direction::Forward, 2, 0.5),
        ]);
        let predictions = predict_arrivals("s5", &snap, &schedule, &cache, 2, utc(9, 0));
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].train_id, "near");
        assert_eq!(predictions[1].train_id, "mid");
        assert!(predictions[0].seconds_away <= predictions[1].seconds_away);
    }

    #[test]
    fn confidence_decays_with_distance() {
        let schedule = schedule();
        let cache = cache(&schedule);
        let snap = snapshot(vec![train("t1", Direction::Forward, 0, 0.0)]);
        let near = predict_arrivals("s1", &snap, &schedule, &cache, 5, utc(9, 0));
        let far = predict_arrivals("s6", &snap, &schedule, &cache, 5, utc(9, 0));
        assert!((near[0].confidence - 0.9).abs() < 1e-9);
        assert!((far[0].confidence - 0.9 * 0.95_f64.powi(5)).abs() < 1e-9);
        assert!(far[0].confidence < near[0].confidence);
    }

    #[test]
    fn horizon_discards_distant_predictions() {
        // Stretch every segment to 10 minutes: six segments ahead is an hour
        // out, beyond the 45-minute horizon.
        let ids = ["s0", "s1", "s2", "s3", "s4", "s5", "s6"];
        let stations = ids
            .iter()
            .enumerate()
            .map(|(i, id)| station(id, 10.90, 48.30 - i as f64 * 0.01, i as f64 * 1.1))
            .collect();
        let travels = ids.windows(2).map(|w| travel(w[0], w[1], 600)).collect();
        let schedule = ScheduleData::from_parts(
            stations,
            vec![route("r1", &ids, 15, ("05:30:00", "23:00:00"))],
            travels,
        )
        .unwrap();
        let cache = cache(&schedule);

        let snap = snapshot(vec![train("t1", Direction::Forward, 0, 0.0)]);
        assert!(predict_arrivals("s6", &snap, &schedule, &cache, 5, utc(9, 0)).is_empty());
        // Nearby stations still predict.
        assert!(!predict_arrivals("s2", &snap, &schedule, &cache, 5, utc(9, 0)).is_empty());
    }

    #[test]
    fn other_routes_are_ignored() {
        let schedule = schedule();
        let cache = cache(&schedule);
        let mut other = train("t1", Direction::Forward, 0, 0.0);
        other.route_id = "r9".to_string();
        let snap = snapshot(vec![other]);
        assert!(predict_arrivals("s5", &snap, &schedule, &cache, 5, utc(9, 0)).is_empty());
    }
}
