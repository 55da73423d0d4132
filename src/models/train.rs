use crate::schedule::Direction;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Estimated position of one train, recomputed every tick from its schedule
/// slot and the mapped route geometry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrainPosition {
    /// Deterministic instance identifier (route, direction, departure index)
    pub train_id: String,
    pub route_id: String,
    pub route_name: String,
    pub direction: Direction,
    /// Estimated coordinates [longitude, latitude]
    pub coordinate: [f64; 2],
    /// Heading in degrees clockwise from north
    pub bearing_degrees: f64,
    /// Progress over the whole route (0.0 to 1.0)
    pub progress: f64,
    /// Station the train departed from on its current segment
    pub from_station_id: String,
    /// Station the train is heading to on its current segment
    pub to_station_id: String,
    /// Index of the current segment in direction of travel
    pub segment_index: usize,
    /// Progress within the current segment (0.0 to 1.0)
    pub segment_progress: f64,
    /// Departure time from the origin terminus (ISO 8601)
    pub departure_time: String,
}

/// The per-tick snapshot of all live trains. Published as a whole; never
/// mutated in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Snapshot {
    pub trains: Vec<TrainPosition>,
    /// Monotonic tick counter, bumped on every publish
    pub tick_seq: u64,
    /// Timestamp when positions were calculated (ISO 8601)
    pub timestamp: String,
}
