use crate::schedule::Direction;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Where a journey's next departure came from: an actual live train, or a
/// projection from the route's published frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DepartureSource {
    Live,
    Scheduled,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NextDeparture {
    pub source: DepartureSource,
    /// Set when source is `live`
    pub train_id: Option<String>,
    /// Departure from the origin station (ISO 8601)
    pub departure_time: String,
    /// Arrival at the destination station (ISO 8601)
    pub arrival_time: String,
    pub wait_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JourneyPlan {
    pub from_station_id: String,
    pub to_station_id: String,
    pub route_id: String,
    pub route_name: String,
    pub direction: Direction,
    pub total_time_secs: u32,
    pub total_distance_km: f64,
    /// Stations visited, in travel order (inclusive of both ends)
    pub station_sequence: Vec<String>,
    pub next_departure: Option<NextDeparture>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JourneyPlanResponse {
    /// Null when no single route connects the two stations
    pub plan: Option<JourneyPlan>,
    /// Timestamp when the plan was calculated (ISO 8601)
    pub timestamp: String,
}
