/// Static schedule data: stations, route patterns, and the inter-station
/// travel-time table. Loaded once at startup and treated as immutable
/// reference data; everything the simulation derives is keyed by the ids
/// defined here.
use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;
use utoipa::ToSchema;

/// Fallback segment travel time when the table has no entry for a station
/// pair. An explicit policy, not an error.
pub const DEFAULT_SEGMENT_TRAVEL_SECS: u32 = 120;

/// Direction of travel over a route's ordered station list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Station {
    pub id: String,
    pub name: String,
    /// [longitude, latitude]
    pub coordinate: [f64; 2],
    /// Distance along the track from the line origin
    pub distance_from_origin_km: f64,
}

/// Daily operating hours of a route. A window whose end precedes its start
/// wraps past midnight (evening services running into the next day).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct ServiceWindow {
    #[schema(value_type = String, example = "05:30:00")]
    pub start: NaiveTime,
    #[schema(value_type = String, example = "23:00:00")]
    pub end: NaiveTime,
}

impl ServiceWindow {
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            time >= self.start && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }

    /// Start instant of the window that contains `now`, if any. For a
    /// wrapping window queried in the early-morning half, the start lies on
    /// the previous day.
    pub fn active_start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let time = now.time();
        if !self.contains(time) {
            return None;
        }
        let date = if self.start > self.end && time < self.end {
            now.date_naive() - chrono::Days::new(1)
        } else {
            now.date_naive()
        };
        Some(date.and_time(self.start).and_utc())
    }

    /// Start instant of the next window at or before/after `now`: the active
    /// window's start while the window is open, otherwise the next opening.
    pub fn next_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        if let Some(start) = self.active_start(now) {
            return start;
        }
        let today = now.date_naive().and_time(self.start).and_utc();
        if today > now {
            today
        } else {
            today + Duration::days(1)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Route {
    pub id: String,
    pub name: String,
    /// The two end stations of the pattern.
    #[schema(value_type = Vec<String>)]
    pub termini: [String; 2],
    pub frequency_minutes: u32,
    pub service_window: ServiceWindow,
    pub color: String,
    /// Canonical forward traversal; backward is the reverse.
    pub station_ids: Vec<String>,
}

impl Route {
    pub fn serves(&self, station_id: &str) -> bool {
        self.station_ids.iter().any(|id| id == station_id)
    }

    /// Index of a station in the canonical forward order.
    pub fn station_index(&self, station_id: &str) -> Option<usize> {
        self.station_ids.iter().position(|id| id == station_id)
    }

    /// Index of a station in the given direction of travel.
    pub fn oriented_station_index(&self, station_id: &str, direction: Direction) -> Option<usize> {
        let index = self.station_index(station_id)?;
        match direction {
            Direction::Forward => Some(index),
            Direction::Backward => Some(self.station_ids.len() - 1 - index),
        }
    }

    /// Final station in the given direction of travel.
    pub fn terminus(&self, direction: Direction) -> Option<&str> {
        match direction {
            Direction::Forward => self.station_ids.last(),
            Direction::Backward => self.station_ids.first(),
        }
        .map(|s| s.as_str())
    }

    pub fn segment_count(&self) -> usize {
        self.station_ids.len().saturating_sub(1)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TravelTimeEntry {
    pub from: String,
    pub to: String,
    pub seconds: u32,
}

#[derive(Debug, Deserialize)]
struct ScheduleFile {
    stations: Vec<Station>,
    routes: Vec<Route>,
    travel_times: Vec<TravelTimeEntry>,
}

#[derive(Debug, Clone)]
pub struct ScheduleData {
    stations: HashMap<String, Station>,
    /// File order, kept for stable listings.
    station_order: Vec<String>,
    routes: Vec<Route>,
    travel_times: HashMap<(String, String), u32>,
}

impl ScheduleData {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScheduleError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ScheduleError::ReadError(e.to_string()))?;
        let file: ScheduleFile =
            serde_yaml::from_str(&content).map_err(|e| ScheduleError::ParseError(e.to_string()))?;
        Self::from_parts(file.stations, file.routes, file.travel_times)
    }

    pub fn from_parts(
        stations: Vec<Station>,
        routes: Vec<Route>,
        travel_times: Vec<TravelTimeEntry>,
    ) -> Result<Self, ScheduleError> {
        let station_order: Vec<String> = stations.iter().map(|s| s.id.clone()).collect();
        let stations: HashMap<String, Station> =
            stations.into_iter().map(|s| (s.id.clone(), s)).collect();

        for route in &routes {
            if route.station_ids.len() < 2 {
                return Err(ScheduleError::InvalidRoute(format!(
                    "route {} has fewer than two stations",
                    route.id
                )));
            }
            for station_id in &route.station_ids {
                if !stations.contains_key(station_id) {
                    return Err(ScheduleError::UnknownStation {
                        route_id: route.id.clone(),
                        station_id: station_id.clone(),
                    });
                }
            }
            let first = &route.station_ids[0];
            let last = &route.station_ids[route.station_ids.len() - 1];
            if route.termini[0] != *first || route.termini[1] != *last {
                return Err(ScheduleError::InvalidRoute(format!(
                    "route {} termini do not match its first/last stations",
                    route.id
                )));
            }
        }

        let travel_times = travel_times
            .into_iter()
            .map(|e| ((e.from, e.to), e.seconds))
            .collect();

        Ok(Self {
            stations,
            station_order,
            routes,
            travel_times,
        })
    }

    pub fn station(&self, id: &str) -> Option<&Station> {
        self.stations.get(id)
    }

    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.station_order
            .iter()
            .filter_map(|id| self.stations.get(id))
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route(&self, id: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.id == id)
    }

    /// Travel time between two adjacent stations. Directional entries win;
    /// the reverse entry is the usual symmetric fallback; a missing pair
    /// resolves to the flat default with a warning.
    pub fn travel_time(&self, from: &str, to: &str) -> u32 {
        if let Some(&secs) = self
            .travel_times
            .get(&(from.to_string(), to.to_string()))
        {
            return secs;
        }
        if let Some(&secs) = self
            .travel_times
            .get(&(to.to_string(), from.to_string()))
        {
            return secs;
        }
        warn!(
            from = %from,
            to = %to,
            default_secs = DEFAULT_SEGMENT_TRAVEL_SECS,
            "No travel time entry for station pair, using default"
        );
        DEFAULT_SEGMENT_TRAVEL_SECS
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("Failed to read schedule file: {0}")]
    ReadError(String),
    #[error("Failed to parse schedule: {0}")]
    ParseError(String),
    #[error("Route {route_id} references unknown station {station_id}")]
    UnknownStation { route_id: String, station_id: String },
    #[error("Invalid route definition: {0}")]
    InvalidRoute(String),
}


#[cfg(test)]
mod tests {
    use super::test_fixtures::*;
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn schedule() -> ScheduleData {
        ScheduleData::from_parts(
            vec![
                station("a", 10.0, 48.0, 0.0),
                station("b", 10.01, 48.01, 1.5),
                station("c", 10.02, 48.02, 3.0),
            ],
            vec![route("r1", &["a", "b", "c"], 15, ("06:00:00", "22:00:00"))],
            vec![travel("a", "b", 150), travel("b", "c", 180), travel("c", "b", 200)],
        )
        .unwrap()
    }

    #[test]
    fn travel_time_lookup_policy() {
        let schedule = schedule();
        // Exact directional entry.
        assert_eq!(schedule.travel_time("a", "b"), 150);
        // Asymmetric entry wins over the reverse.
        assert_eq!(schedule.travel_time("c", "b"), 200);
        // Reverse fallback.
        assert_eq!(schedule.travel_time("b", "a"), 150);
        // Missing pair falls back to the default.
        assert_eq!(schedule.travel_time("a", "c"), DEFAULT_SEGMENT_TRAVEL_SECS);
    }

    #[test]
    fn oriented_station_index() {
        let schedule = schedule();
        let route = schedule.route("r1").unwrap();
        assert_eq!(route.oriented_station_index("a", Direction::Forward), Some(0));
        assert_eq!(route.oriented_station_index("a", Direction::Backward), Some(2));
        assert_eq!(route.oriented_station_index("c", Direction::Backward), Some(0));
        assert_eq!(route.terminus(Direction::Forward), Some("c"));
        assert_eq!(route.terminus(Direction::Backward), Some("a"));
    }

    #[test]
    fn rejects_unknown_station_reference() {
        let result = ScheduleData::from_parts(
            vec![station("a", 10.0, 48.0, 0.0), station("b", 10.01, 48.01, 1.5)],
            vec![route("r1", &["a", "missing"], 15, ("06:00:00", "22:00:00"))],
            vec![],
        );
        assert!(matches!(result, Err(ScheduleError::UnknownStation { .. })));
    }

    #[test]
    fn plain_window_membership() {
        let window = ServiceWindow {
            start: "06:00:00".parse().unwrap(),
            end: "22:00:00".parse().unwrap(),
        };
        assert!(window.contains("06:00:00".parse().unwrap()));
        assert!(window.contains("21:59:59".parse().unwrap()));
        assert!(!window.contains("22:00:00".parse().unwrap()));
        assert!(!window.contains("05:59:59".parse().unwrap()));
    }

    #[test]
    fn wrapping_window_membership_and_start() {
        let window = ServiceWindow {
            start: "21:30:00".parse().unwrap(),
            end: "01:30:00".parse().unwrap(),
        };
        assert!(window.contains("23:00:00".parse().unwrap()));
        assert!(window.contains("00:45:00".parse().unwrap()));
        assert!(!window.contains("02:00:00".parse().unwrap()));

        // Queried after midnight, the active window started yesterday.
        let start = window.active_start(utc(2026, 3, 10, 0, 45)).unwrap();
        assert_eq!(start, utc(2026, 3, 9, 21, 30));
        // Queried in the evening half, it started today.
        let start = window.active_start(utc(2026, 3, 10, 22, 0)).unwrap();
        assert_eq!(start, utc(2026, 3, 10, 21, 30));
        assert_eq!(window.active_start(utc(2026, 3, 10, 12, 0)), None);
    }

    #[test]
    fn next_start_projection() {
        let window = ServiceWindow {
            start: "06:00:00".parse().unwrap(),
            end: "22:00:00".parse().unwrap(),
        };
        // Closed hours before today's start.
        assert_eq!(window.next_start(utc(2026, 3, 10, 4, 0)), utc(2026, 3, 10, 6, 0));
        // Closed hours after today's end roll to tomorrow.
        assert_eq!(window.next_start(utc(2026, 3, 10, 23, 0)), utc(2026, 3, 11, 6, 0));
        // While open, the active start is returned.
        assert_eq!(window.next_start(utc(2026, 3, 10, 12, 0)), utc(2026, 3, 10, 6, 0));
    }
}
