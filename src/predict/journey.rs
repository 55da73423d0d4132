/// Journey planner for a single-line network: finds the route serving both
/// stations, totals time and distance over the station slice, and resolves
/// the next viable departure from a live train or, failing that, from a
/// schedule-frequency projection.
use crate::geometry::GeometryCache;
use crate::models::{DepartureSource, JourneyPlan, NextDeparture, Snapshot};
use crate::predict::arrivals::predict_arrivals;
use crate::schedule::{Direction, Route, ScheduleData};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Rough per-station offset used to project when a frequency slot reaches a
/// station partway down the line.
const SCHEDULE_MINUTES_PER_STATION: i64 = 2;

#[derive(Debug, Clone, Copy)]
pub struct JourneyOptions {
    /// Plan relative to this instant; defaults to `now`.
    pub departure_time: Option<DateTime<Utc>>,
    /// Live trains further out than this are not worth waiting for.
    pub max_wait_minutes: i64,
}

impl Default for JourneyOptions {
    fn default() -> Self {
        Self {
            departure_time: None,
            max_wait_minutes: 30,
        }
    }
}

/// Plan a journey between two stations. Returns None for identical or
/// unknown stations and when no single route serves both; transfers between
/// routes are not modeled.
pub fn plan_journey(
    from_id: &str,
    to_id: &str,
    snapshot: &Snapshot,
    schedule: &ScheduleData,
    geometry: &GeometryCache,
    opts: JourneyOptions,
    now: DateTime<Utc>,
) -> Option<JourneyPlan> {
    if from_id == to_id {
        return None;
    }
    let from = schedule.station(from_id)?;
    let to = schedule.station(to_id)?;

    let route = schedule
        .routes()
        .iter()
        .find(|r| r.serves(from_id) && r.serves(to_id))?;

    let from_index = route.station_index(from_id)?;
    let to_index = route.station_index(to_id)?;
    let direction = if from_index < to_index {
        Direction::Forward
    } else {
        Direction::Backward
    };

    // Station slice in travel order, inclusive of both ends.
    let (low, high) = (from_index.min(to_index), from_index.max(to_index));
    let mut station_sequence: Vec<String> = route.station_ids[low..=high].to_vec();
    if direction == Direction::Backward {
        station_sequence.reverse();
    }

    let total_time_secs: u32 = station_sequence
        .windows(2)
        .map(|pair| schedule.travel_time(&pair[0], &pair[1]))
        .sum();
    let total_distance_km = (from.distance_from_origin_km - to.distance_from_origin_km).abs();

    let base = opts.departure_time.unwrap_or(now);
    let next_departure = live_departure(
        from_id, route, direction, snapshot, schedule, geometry, opts, base, now, total_time_secs,
    )
    .or_else(|| scheduled_departure(from_id, route, direction, base, total_time_secs));

    Some(JourneyPlan {
        from_station_id: from_id.to_string(),
        to_station_id: to_id.to_string(),
        route_id: route.id.clone(),
        route_name: route.name.clone(),
        direction,
        total_time_secs,
        total_distance_km,
        station_sequence,
        next_departure,
    })
}

/// Tier 1: the soonest live train arriving at the origin in the right
/// direction, within the acceptable wait.
#[allow(clippy::too_many_arguments)]
fn live_departure(
    from_id: &str,
    route: &Route,
    direction: Direction,
    snapshot: &Snapshot,
    schedule: &ScheduleData,
    geometry: &GeometryCache,
    opts: JourneyOptions,
    base: DateTime<Utc>,
    now: DateTime<Utc>,
    total_time_secs: u32,
) -> Option<NextDeparture> {
    let max_wait_secs = opts.max_wait_minutes * 60;

    predict_arrivals(from_id, snapshot, schedule, geometry, usize::MAX, now)
        .into_iter()
        .filter(|p| p.route_id == route.id && p.direction == direction)
        .filter_map(|p| {
            let arrival = DateTime::parse_from_rfc3339(&p.arrival_time)
                .ok()?
                .with_timezone(&Utc);
            let wait_secs = (arrival - base).num_seconds();
            if !(0..=max_wait_secs).contains(&wait_secs) {
                return None;
            }
            Some((arrival, wait_secs, p))
        })
        .min_by_key(|(arrival, _, _)| *arrival)
        .map(|(arrival, wait_secs, p)| NextDeparture {
            source: DepartureSource::Live,
            train_id: Some(p.train_id),
            departure_time: arrival.to_rfc3339(),
            arrival_time: (arrival + Duration::seconds(total_time_secs as i64)).to_rfc3339(),
            wait_minutes: wait_secs / 60,
        })
}

/// Tier 2: project the next frequency-aligned slot. While the service window
/// is open, slots run from the active window start; otherwise from the next
/// window start. Either way the origin's distance down the line is estimated
/// at ~2 minutes per station, and backward slots carry the same half-
/// frequency phase shift the fleet generator applies.
fn scheduled_departure(
    from_id: &str,
    route: &Route,
    direction: Direction,
    base: DateTime<Utc>,
    total_time_secs: u32,
) -> Option<NextDeparture> {
    let origin_index = route.oriented_station_index(from_id, direction)? as i64;
    let origin_offset = Duration::minutes(origin_index * SCHEDULE_MINUTES_PER_STATION);
    let phase = match direction {
        Direction::Forward => Duration::zero(),
        Direction::Backward => Duration::minutes(route.frequency_minutes as i64 / 2),
    };

    let frequency_secs = route.frequency_minutes as i64 * 60;
    if frequency_secs == 0 {
        return None;
    }

    let departure = match route.service_window.active_start(base) {
        Some(active_start) => {
            let first_passage = active_start + phase + origin_offset;
            let behind = (base - first_passage).num_seconds();
            let slots = if behind > 0 {
                (behind + frequency_secs - 1).div_euclid(frequency_secs)
            } else {
                0
            };
            first_passage + Duration::seconds(slots * frequency_secs)
        }
        None => {
            let next_start = route.service_window.next_start(base);
            debug!(
                route_id = %route.id,
                from = %from_id,
                next_start = %next_start,
                "Service window closed, projecting to next window"
            );
            next_start + phase + origin_offset
        }
    };

    Some(NextDeparture {
        source: DepartureSource::Scheduled,
        train_id: None,
        departure_time: departure.to_rfc3339(),
        arrival_time: (departure + Duration::seconds(total_time_secs as i64)).to_rfc3339(),
        wait_minutes: (departure - base).num_seconds().max(0) / 60,
    })
}
