/// Position resolver: converts a train instance's elapsed time into a
/// coordinate, bearing, and segment metadata along its oriented route
/// geometry. Returns nothing before departure and nothing once the journey
/// is complete; completed trains simply vanish from the live set.
use crate::geometry::spatial::{initial_bearing, point_along_path};
use crate::geometry::RouteGeometry;
use crate::sim::fleet::TrainInstance;
use chrono::{DateTime, Utc};

/// How far ahead along the segment the bearing target sits, as a fraction of
/// segment progress. Keeps the heading updating continuously across nearly
/// straight polyline chunks.
const BEARING_LOOKAHEAD_FRACTION: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct ResolvedPosition {
    /// [lon, lat]
    pub coordinate: [f64; 2],
    /// Degrees clockwise from north
    pub bearing_degrees: f64,
    /// 0.0-1.0 over the whole route
    pub progress: f64,
    /// Index into the oriented segment list
    pub segment_index: usize,
    pub from_station_id: String,
    pub to_station_id: String,
    /// 0.0-1.0 within the current segment
    pub segment_progress: f64,
}

/// Resolve a train's position at `now`. `geometry` must already be oriented
/// for the instance's direction of travel (the cache serves both
/// orientations). Returns None before departure or after journey completion.
pub fn resolve_position(
    instance: &TrainInstance,
    geometry: &RouteGeometry,
    now: DateTime<Utc>,
) -> Option<ResolvedPosition> {
    let elapsed = (now - instance.departure_time).num_seconds();
    if elapsed < 0 {
        return None;
    }

    let total_secs = geometry.total_travel_secs() as i64;
    if total_secs <= 0 || elapsed >= total_secs {
        return None;
    }

    let progress = elapsed as f64 / total_secs as f64;
    let total_distance = geometry.total_distance_meters();
    let target_distance = total_distance * progress;

    // Walk segments until the target distance falls inside one.
    let mut walked = 0.0;
    let last_index = geometry.segments.len() - 1;
    for (index, segment) in geometry.segments.iter().enumerate() {
        let is_last = index == last_index;
        if walked + segment.distance_meters < target_distance && !is_last {
            walked += segment.distance_meters;
            continue;
        }

        let segment_progress = if segment.distance_meters > 0.0 {
            ((target_distance - walked) / segment.distance_meters).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let coordinate = point_along_path(&segment.path, segment_progress);
        let bearing_degrees = bearing_at(&segment.path, segment_progress, coordinate);

        return Some(ResolvedPosition {
            coordinate,
            bearing_degrees,
            progress,
            segment_index: index,
            from_station_id: segment.from_station_id.clone(),
            to_station_id: segment.to_station_id.clone(),
            segment_progress,
        });
    }

    None
}

/// Bearing at a point on a path: forward azimuth toward a point slightly
/// further along. At the very end of the path the last path step is used so
/// the heading never collapses to a degenerate zero-length azimuth.
fn bearing_at(path: &[[f64; 2]], segment_progress: f64, coordinate: [f64; 2]) -> f64 {
    let ahead_fraction = (segment_progress + BEARING_LOOKAHEAD_FRACTION).min(1.0);
    let ahead = point_along_path(path, ahead_fraction);

    if (ahead[0] - coordinate[0]).abs() > 1e-12 || (ahead[1] - coordinate[1]).abs() > 1e-12 {
        return initial_bearing(coordinate, ahead);
    }

    // Sitting on the final point: fall back to the last distinct step.
    match path {
        [.., prev, last] if prev != last => initial_bearing(*prev, *last),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::mapper::{reverse_route_geometry, Segment};
    use crate::schedule::test_fixtures::*;
    use crate::schedule::{Direction, ScheduleData};
    use chrono::TimeZone;

    fn utc(h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, mi, s).unwrap()
    }

    fn instance(departure: DateTime<Utc>) -> TrainInstance {
        TrainInstance {
            id: "r1:forward:0".to_string(),
            route_id: "r1".to_string(),
            direction: Direction::Forward,
            departure_time: departure,
        }
    }

    fn segment(from: &str, to: &str, path: Vec<[f64; 2]>, secs: u32) -> Segment {
        let distance_meters = crate::geometry::spatial::path_length(&path);
        Segment {
            from_station_id: from.to_string(),
            to_station_id: to.to_string(),
            path,
            distance_meters,
            travel_time_secs: secs,
            matched: true,
        }
    }

    fn single_segment_geometry() -> RouteGeometry {
        // A straight 180 s segment from (0,0) to (0,3).
        RouteGeometry {
            route_id: "r1".to_string(),
            segments: vec![segment("a", "b", vec![[0.0, 0.0], [0.0, 3.0]], 180)],
        }
    }

    #[test]
    fn none_before_departure() {
        let geometry = single_segment_geometry();
        let train = instance(utc(8, 0, 0));
        assert!(resolve_position(&train, &geometry, utc(7, 59, 59)).is_none());
    }

    #[test]
    fn none_after_journey_complete() {
        let geometry = single_segment_geometry();
        let train = instance(utc(8, 0, 0));
        assert!(resolve_position(&train, &geometry, utc(8, 3, 0)).is_none());
        assert!(resolve_position(&train, &geometry, utc(9, 0, 0)).is_none());
    }

    #[test]
    fn halfway_point_interpolation() {
        // At 90 s into a 180 s segment the train sits at the 50% point.
        let geometry = single_segment_geometry();
        let train = instance(utc(8, 0, 0));
        let position = resolve_position(&train, &geometry, utc(8, 1, 30)).unwrap();
        assert!((position.progress - 0.5).abs() < 1e-9);
        assert!((position.coordinate[1] - 1.5).abs() < 1e-6);
        assert!(position.coordinate[0].abs() < 1e-9);
        assert_eq!(position.segment_index, 0);
        assert!((position.segment_progress - 0.5).abs() < 1e-9);
        // Heading due north.
        assert!(position.bearing_degrees.abs() < 1.0);
    }

    #[test]
    fn progress_is_monotonic() {
        let geometry = single_segment_geometry();
        let train = instance(utc(8, 0, 0));
        let mut last = -1.0;
        for secs in [1, 30, 60, 100, 150, 179] {
            let position =
                resolve_position(&train, &geometry, utc(8, 0, 0) + chrono::Duration::seconds(secs))
                    .unwrap();
            assert!(position.progress > last);
            assert!(position.progress >= 0.0 && position.progress <= 1.0);
            last = position.progress;
        }
    }

    #[test]
    fn walks_into_later_segments() {
        // Two equal-length segments; total time 360 s. At 270 s the train is
        // halfway through the second segment.
        let geometry = RouteGeometry {
            route_id: "r1".to_string(),
            segments: vec![
                segment("a", "b", vec![[0.0, 0.0], [0.0, 1.0]], 180),
                segment("b", "c", vec![[0.0, 1.0], [0.0, 2.0]], 180),
            ],
        };
        let train = instance(utc(8, 0, 0));
        let position = resolve_position(&train, &geometry, utc(8, 4, 30)).unwrap();
        assert_eq!(position.segment_index, 1);
        assert_eq!(position.from_station_id, "b");
        assert_eq!(position.to_station_id, "c");
        assert!((position.segment_progress - 0.5).abs() < 1e-3);
        assert!((position.coordinate[1] - 1.5).abs() < 1e-3);
    }

    #[test]
    fn interpolates_by_arc_length_across_uneven_density() {
        // Dense points in the first half, a single long step in the second.
        let geometry = RouteGeometry {
            route_id: "r1".to_string(),
            segments: vec![segment(
                "a",
                "b",
                vec![[0.0, 0.0], [0.0, 0.25], [0.0, 0.5], [0.0, 1.0], [0.0, 2.0]],
                200,
            )],
        };
        let train = instance(utc(8, 0, 0));
        // At 50% elapsed the train must be at 50% arc length (lat 1.0), not
        // at the middle point index (lat 0.5).
        let position = resolve_position(&train, &geometry, utc(8, 1, 40)).unwrap();
        assert!((position.coordinate[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn backward_direction_travels_reversed_path() {
        let schedule = ScheduleData::from_parts(
            vec![
                station("a", 0.0, 0.0, 0.0),
                station("b", 0.0, 1.0, 111.0),
                station("c", 0.0, 2.0, 222.0),
            ],
            vec![route("r1", &["a", "b", "c"], 20, ("00:00:00", "23:59:00"))],
            vec![travel("a", "b", 180), travel("b", "c", 180)],
        )
        .unwrap();
        let forward = RouteGeometry {
            route_id: "r1".to_string(),
            segments: vec![
                segment("a", "b", vec![[0.0, 0.0], [0.0, 1.0]], 180),
                segment("b", "c", vec![[0.0, 1.0], [0.0, 2.0]], 180),
            ],
        };
        let backward = reverse_route_geometry(&forward, &schedule);

        let train = TrainInstance {
            id: "r1:backward:0".to_string(),
            route_id: "r1".to_string(),
            direction: Direction::Backward,
            departure_time: utc(8, 0, 0),
        };
        // 90 s in: halfway down the first backward segment, c -> b.
        let position = resolve_position(&train, &backward, utc(8, 1, 30)).unwrap();
        assert_eq!(position.from_station_id, "c");
        assert_eq!(position.to_station_id, "b");
        assert!((position.coordinate[1] - 1.5).abs() < 1e-3);
        // Heading due south.
        assert!((position.bearing_degrees - 180.0).abs() < 1.0);
    }
}
