/// Geometry mapper: aligns a route's abstract station-to-station segments
/// onto physical track polylines. For each consecutive station pair the
/// best-matching polyline is selected by endpoint proximity; when nothing is
/// close enough the segment degrades to a straight line rather than failing
/// the route. Travel times stay authoritative to the schedule table even
/// when geometry is approximate.
use crate::geometry::spatial::{haversine_distance, path_length};
use crate::geometry::track::{FilterContext, TrackPolyline, TrackStore};
use crate::schedule::{Direction, Route, ScheduleData};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Combined from/to endpoint distance above which a candidate polyline is
/// not trusted for a station pair.
const MAX_ENDPOINT_DISTANCE_METERS: f64 = 500.0;

/// Score threshold matching the endpoint-distance cap under the
/// inverse-distance score `1 / (1 + d_start + d_end)`.
const MIN_MATCH_SCORE: f64 = 1.0 / (1.0 + MAX_ENDPOINT_DISTANCE_METERS);

#[derive(Debug, Clone)]
pub struct Segment {
    pub from_station_id: String,
    pub to_station_id: String,
    /// [lon, lat] points in direction of travel.
    pub path: Vec<[f64; 2]>,
    pub distance_meters: f64,
    pub travel_time_secs: u32,
    /// False when the segment fell back to a straight two-point line.
    pub matched: bool,
}

#[derive(Debug, Clone)]
pub struct RouteGeometry {
    pub route_id: String,
    pub segments: Vec<Segment>,
}

impl RouteGeometry {
    pub fn total_distance_meters(&self) -> f64 {
        self.segments.iter().map(|s| s.distance_meters).sum()
    }

    pub fn total_travel_secs(&self) -> u32 {
        self.segments.iter().map(|s| s.travel_time_secs).sum()
    }

    pub fn degraded_segment_count(&self) -> usize {
        self.segments.iter().filter(|s| !s.matched).count()
    }
}

/// Score a candidate polyline for a station pair, trying both orientations
/// (the polyline may be stored end-to-start). Returns the better score and
/// whether the polyline must be reversed to run from `a` to `b`.
fn score_candidate(polyline: &TrackPolyline, a: [f64; 2], b: [f64; 2]) -> Option<(f64, bool)> {
    let first = *polyline.coordinates.first()?;
    let last = *polyline.coordinates.last()?;

    let forward = 1.0 / (1.0 + haversine_distance(first, a) + haversine_distance(last, b));
    let reversed = 1.0 / (1.0 + haversine_distance(last, a) + haversine_distance(first, b));

    if forward >= reversed {
        Some((forward, false))
    } else {
        Some((reversed, true))
    }
}

/// Map one route onto physical track. Per-segment partial failure degrades
/// to a straight line; only unknown station references are an error.
pub fn map_route(
    route: &Route,
    schedule: &ScheduleData,
    tracks: &[&TrackPolyline],
) -> Result<RouteGeometry, MapError> {
    let mut segments = Vec::with_capacity(route.segment_count());

    for pair in route.station_ids.windows(2) {
        let from = schedule
            .station(&pair[0])
            .ok_or_else(|| MapError::UnknownStation(pair[0].clone()))?;
        let to = schedule
            .station(&pair[1])
            .ok_or_else(|| MapError::UnknownStation(pair[1].clone()))?;

        let mut best: Option<(f64, bool, &TrackPolyline)> = None;
        for &polyline in tracks {
            if let Some((score, reversed)) = score_candidate(polyline, from.coordinate, to.coordinate)
            {
                if best.is_none_or(|(s, _, _)| score > s) {
                    best = Some((score, reversed, polyline));
                }
            }
        }

        let (path, matched) = match best {
            Some((score, reversed, polyline)) if score >= MIN_MATCH_SCORE => {
                let mut path = polyline.coordinates.clone();
                if reversed {
                    path.reverse();
                }
                debug!(
                    route_id = %route.id,
                    from = %from.id,
                    to = %to.id,
                    polyline_id = polyline.id,
                    reversed,
                    "Matched track polyline to segment"
                );
                (path, true)
            }
            _ => {
                warn!(
                    route_id = %route.id,
                    from = %from.id,
                    to = %to.id,
                    "No track polyline within confidence threshold, using straight line"
                );
                (vec![from.coordinate, to.coordinate], false)
            }
        };

        segments.push(Segment {
            from_station_id: from.id.clone(),
            to_station_id: to.id.clone(),
            distance_meters: path_length(&path),
            travel_time_secs: schedule.travel_time(&from.id, &to.id),
            path,
            matched,
        });
    }

    Ok(RouteGeometry {
        route_id: route.id.clone(),
        segments,
    })
}

/// Full reversal of a route geometry for backward travel: the segment order
/// AND each segment's internal point order are reversed, so interpolated
/// motion visually matches the direction of travel. Travel times follow the
/// reversed station pairs.
pub fn reverse_route_geometry(geometry: &RouteGeometry, schedule: &ScheduleData) -> RouteGeometry {
    let segments = geometry
        .segments
        .iter()
        .rev()
        .map(|segment| {
            let mut path = segment.path.clone();
            path.reverse();
            Segment {
                from_station_id: segment.to_station_id.clone(),
                to_station_id: segment.from_station_id.clone(),
                distance_meters: segment.distance_meters,
                travel_time_secs: schedule
                    .travel_time(&segment.to_station_id, &segment.from_station_id),
                path,
                matched: segment.matched,
            }
        })
        .collect();

    RouteGeometry {
        route_id: geometry.route_id.clone(),
        segments,
    }
}

/// Per-route mapped geometry in both orientations, built once and reused by
/// every tick. Keys are plain route ids plus the direction; rebuilt only
/// when the exclusion set changes.
#[derive(Debug, Default)]
pub struct GeometryCache {
    forward: HashMap<String, Arc<RouteGeometry>>,
    backward: HashMap<String, Arc<RouteGeometry>>,
}

impl GeometryCache {
    pub fn build(schedule: &ScheduleData, store: &TrackStore, ctx: &FilterContext) -> Self {
        let tracks = store.retained(ctx);
        let mut cache = Self::default();

        for route in schedule.routes() {
            match map_route(route, schedule, &tracks) {
                Ok(geometry) => {
                    info!(
                        route_id = %route.id,
                        segments = geometry.segments.len(),
                        degraded = geometry.degraded_segment_count(),
                        total_km = format!("{:.1}", geometry.total_distance_meters() / 1000.0),
                        "Mapped route geometry"
                    );
                    let reversed = reverse_route_geometry(&geometry, schedule);
                    cache.forward.insert(route.id.clone(), Arc::new(geometry));
                    cache.backward.insert(route.id.clone(), Arc::new(reversed));
                }
                Err(e) => {
                    warn!(route_id = %route.id, error = %e, "Failed to map route geometry");
                }
            }
        }

        cache
    }

    /// Geometry oriented for the given direction of travel.
    pub fn oriented(&self, route_id: &str, direction: Direction) -> Option<Arc<RouteGeometry>> {
        match direction {
            Direction::Forward => self.forward.get(route_id).cloned(),
            Direction::Backward => self.backward.get(route_id).cloned(),
        }
    }

    pub fn route_count(&self) -> usize {
        self.forward.len()
    }

    pub fn degraded_segment_count(&self) -> usize {
        self.forward
            .values()
            .map(|g| g.degraded_segment_count())
            .sum()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Route references unknown station {0}")]
    UnknownStation(String),
}
