/// Fleet generator: synthesizes the set of train instances that should exist
/// on a route at a given instant, from nothing but the route's frequency and
/// service window. Deterministic in (route, now), so callers replace the
/// fleet wholesale on every run without accumulating duplicates.
use crate::schedule::{Direction, Route};
use chrono::{DateTime, Duration, Utc};
use tracing::warn;

/// Instances older than this are garbage-collected regardless of route
/// length, bounding memory in a long-running process.
pub const MAX_JOURNEY_SECS: i64 = 2 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainInstance {
    /// Deterministic: `{route_id}:{direction}:{departure_index}`
    pub id: String,
    pub route_id: String,
    pub direction: Direction,
    pub departure_time: DateTime<Utc>,
}

/// All instances currently dispatched on a route. Empty outside the service
/// window. Backward departures are phase-shifted by half the frequency so
/// the two directions interleave visually on the map; that is a presentation
/// policy, not a physical timetable constraint.
pub fn generate_fleet(route: &Route, now: DateTime<Utc>) -> Vec<TrainInstance> {
    let Some(service_start) = route.service_window.active_start(now) else {
        return Vec::new();
    };

    if route.frequency_minutes == 0 {
        warn!(route_id = %route.id, "Route has zero frequency, generating no trains");
        return Vec::new();
    }

    let mut fleet = departures(route, service_start, now, Direction::Forward);
    fleet.extend(departures(route, service_start, now, Direction::Backward));
    fleet
}

fn departures(
    route: &Route,
    service_start: DateTime<Utc>,
    now: DateTime<Utc>,
    direction: Direction,
) -> Vec<TrainInstance> {
    let frequency_secs = route.frequency_minutes as i64 * 60;
    let phase_secs = match direction {
        Direction::Forward => 0,
        Direction::Backward => (route.frequency_minutes as i64 / 2) * 60,
    };

    let elapsed_secs = (now - service_start).num_seconds();
    // Departures dispatched so far: ceil(elapsed / frequency).
    let dispatched = (elapsed_secs + frequency_secs - 1).div_euclid(frequency_secs);

    let mut instances = Vec::new();
    for index in 0..dispatched {
        let departure_time =
            service_start + Duration::seconds(phase_secs + index * frequency_secs);
        // Not-yet-departed trains are invisible.
        if departure_time > now {
            continue;
        }
        // Past the journey ceiling: garbage-collect.
        if (now - departure_time).num_seconds() > MAX_JOURNEY_SECS {
            continue;
        }
        instances.push(TrainInstance {
            id: format!("{}:{}:{}", route.id, direction.as_str(), index),
            route_id: route.id.clone(),
            direction,
            departure_time,
        });
    }
    instances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::test_fixtures::route;
    use chrono::TimeZone;

    fn utc(h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, mi, 0).unwrap()
    }

    #[test]
    fn dispatch_count_scenario() {
        // Frequency 15 min, service start 06:00, now 06:47: exactly four
        // forward departures at 06:00/06:15/06:30/06:45.
        let route = route("r1", &["a", "b"], 15, ("06:00:00", "22:00:00"));
        let now = utc(6, 47);
        let fleet = generate_fleet(&route, now);

        let forward: Vec<_> = fleet
            .iter()
            .filter(|t| t.direction == Direction::Forward)
            .collect();
        assert_eq!(forward.len(), 4);
        assert_eq!(forward[0].departure_time, utc(6, 0));
        assert_eq!(forward[1].departure_time, utc(6, 15));
        assert_eq!(forward[2].departure_time, utc(6, 30));
        assert_eq!(forward[3].departure_time, utc(6, 45));
        // The newest departure has been under way for 120 seconds.
        assert_eq!((now - forward[3].departure_time).num_seconds(), 120);
    }

    #[test]
    fn backward_departures_are_phase_shifted() {
        let route = route("r1", &["a", "b"], 15, ("06:00:00", "22:00:00"));
        let fleet = generate_fleet(&route, utc(6, 47));

        let backward: Vec<_> = fleet
            .iter()
            .filter(|t| t.direction == Direction::Backward)
            .collect();
        // Shifted by floor(15 / 2) = 7 minutes: 06:07/06:22/06:37.
        assert_eq!(backward.len(), 3);
        assert_eq!(backward[0].departure_time, utc(6, 7));
        assert_eq!(backward[2].departure_time, utc(6, 37));
    }

    #[test]
    fn idempotent_for_fixed_now() {
        let route = route("r1", &["a", "b"], 20, ("05:30:00", "23:00:00"));
        let now = utc(9, 13);
        let first = generate_fleet(&route, now);
        let second = generate_fleet(&route, now);
        assert_eq!(first, second);
        let ids: std::collections::HashSet<_> = first.iter().map(|t| &t.id).collect();
        assert_eq!(ids.len(), first.len());
    }

    #[test]
    fn empty_outside_service_window() {
        let route = route("r1", &["a", "b"], 15, ("06:00:00", "22:00:00"));
        assert!(generate_fleet(&route, utc(4, 30)).is_empty());
        assert!(generate_fleet(&route, utc(23, 15)).is_empty());
    }

    #[test]
    fn no_departures_at_exact_service_start() {
        let route = route("r1", &["a", "b"], 15, ("06:00:00", "22:00:00"));
        assert!(generate_fleet(&route, utc(6, 0)).is_empty());
    }

    #[test]
    fn wrapping_window_counts_from_yesterday() {
        let route = route("n8", &["a", "b"], 30, ("21:30:00", "01:30:00"));
        let now = utc(0, 40);
        let fleet = generate_fleet(&route, now);
        let forward: Vec<_> = fleet
            .iter()
            .filter(|t| t.direction == Direction::Forward)
            .collect();
        // Service started 21:30 yesterday; the 2h ceiling trims departures
        // before 22:40, so the oldest surviving slot is 23:00.
        assert!(!forward.is_empty());
        for train in &forward {
            assert!((now - train.departure_time).num_seconds() <= MAX_JOURNEY_SECS);
            assert!(train.departure_time <= now);
        }
        let oldest = forward.iter().map(|t| t.departure_time).min().unwrap();
        assert_eq!(
            oldest,
            Utc.with_ymd_and_hms(2026, 3, 9, 23, 0, 0).unwrap()
        );
        let newest = forward.iter().map(|t| t.departure_time).max().unwrap();
        assert_eq!(newest, utc(0, 30));
    }

    #[test]
    fn journey_ceiling_bounds_fleet_size() {
        // A 5-minute frequency running since 05:30 would otherwise produce
        // hundreds of instances by evening.
        let route = route("r1", &["a", "b"], 5, ("05:30:00", "23:00:00"));
        let fleet = generate_fleet(&route, utc(20, 0));
        for train in &fleet {
            assert!((utc(20, 0) - train.departure_time).num_seconds() <= MAX_JOURNEY_SECS);
        }
    }
}
