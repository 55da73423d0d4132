/// Simulation core: an explicit, passable state plus a pure tick function.
/// The tick regenerates the fleet from the schedule, resolves every
/// instance's position, and publishes a fresh snapshot; an external driver
/// (real timer in production, manual stepping in tests) decides when ticks
/// happen and with which `now`.
pub mod fleet;
pub mod position;

pub use fleet::{generate_fleet, TrainInstance, MAX_JOURNEY_SECS};
pub use position::{resolve_position, ResolvedPosition};

use crate::geometry::spatial::meters_to_degrees;
use crate::geometry::GeometryCache;
use crate::models::{Snapshot, TrainPosition};
use crate::schedule::ScheduleData;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Radius of the presentation-only offset applied to trains that would
/// otherwise render on top of each other.
const DECLUTTER_RADIUS_METERS: f64 = 15.0;

#[derive(Debug, Clone, Default)]
pub struct SimulationState {
    pub fleet: Vec<TrainInstance>,
    pub snapshot: Arc<Snapshot>,
}

/// One simulation step: regenerate the fleet for every route, resolve all
/// positions, and publish a new snapshot. The previous snapshot is never
/// mutated; callers holding it keep a consistent view.
pub fn tick(
    schedule: &ScheduleData,
    geometry: &GeometryCache,
    state: &SimulationState,
    now: DateTime<Utc>,
) -> SimulationState {
    let mut fleet = Vec::new();
    for route in schedule.routes() {
        fleet.extend(generate_fleet(route, now));
    }

    let mut trains = Vec::new();
    let mut skipped: HashMap<&'static str, usize> = HashMap::new();

    for instance in &fleet {
        let Some(route) = schedule.route(&instance.route_id) else {
            *skipped.entry("unknown_route").or_insert(0) += 1;
            continue;
        };
        let Some(oriented) = geometry.oriented(&instance.route_id, instance.direction) else {
            *skipped.entry("no_geometry").or_insert(0) += 1;
            continue;
        };
        match resolve_position(instance, &oriented, now) {
            Some(position) => trains.push(TrainPosition {
                train_id: instance.id.clone(),
                route_id: instance.route_id.clone(),
                route_name: route.name.clone(),
                direction: instance.direction,
                coordinate: position.coordinate,
                bearing_degrees: position.bearing_degrees,
                progress: position.progress,
                from_station_id: position.from_station_id,
                to_station_id: position.to_station_id,
                segment_index: position.segment_index,
                segment_progress: position.segment_progress,
                departure_time: instance.departure_time.to_rfc3339(),
            }),
            None => {
                *skipped.entry("outside_journey_window").or_insert(0) += 1;
            }
        }
    }

    trains.sort_by(|a, b| a.train_id.cmp(&b.train_id));
    declutter(&mut trains);

    info!(
        fleet = fleet.len(),
        positioned = trains.len(),
        skipped = ?skipped,
        "Simulation tick"
    );

    // Completed journeys are not retained: the fleet kept in state is the
    // regenerated one, and the snapshot only carries resolvable trains.
    SimulationState {
        fleet,
        snapshot: Arc::new(Snapshot {
            trains,
            tick_seq: state.snapshot.tick_seq + 1,
            timestamp: now.to_rfc3339(),
        }),
    }
}

/// Remove instances past the journey ceiling. The tick regenerates the fleet
/// anyway; this sweep exists for long idle gaps between ticks so the state
/// never holds stale instances.
pub fn sweep_fleet(state: &mut SimulationState, now: DateTime<Utc>) -> usize {
    let before = state.fleet.len();
    state
        .fleet
        .retain(|t| (now - t.departure_time).num_seconds() <= MAX_JOURNEY_SECS);
    before - state.fleet.len()
}

/// Spread trains that share a segment decile around a small circle so they
/// stay individually visible on the map. Purely cosmetic: only the published
/// coordinates move, and nothing downstream feeds them back into state.
fn declutter(trains: &mut [TrainPosition]) {
    let mut buckets: HashMap<(String, String, u32), Vec<usize>> = HashMap::new();
    for (index, train) in trains.iter().enumerate() {
        let decile = ((train.progress * 10.0).floor() as u32).min(9);
        buckets
            .entry((
                train.from_station_id.clone(),
                train.to_station_id.clone(),
                decile,
            ))
            .or_default()
            .push(index);
    }

    for indices in buckets.values() {
        if indices.len() < 2 {
            continue;
        }
        let step = std::f64::consts::TAU / indices.len() as f64;
        for (position, &index) in indices.iter().enumerate() {
            let train = &mut trains[index];
            let angle = step * position as f64;
            let (lon_deg, lat_deg) = meters_to_degrees(DECLUTTER_RADIUS_METERS, train.coordinate[1]);
            train.coordinate[0] += lon_deg * angle.cos();
            train.coordinate[1] += lat_deg * angle.sin();
        }
    }
}
