use crate::schedule::Direction;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Predicted arrival of a live train at a station.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ArrivalPrediction {
    pub train_id: String,
    pub route_id: String,
    pub route_name: String,
    pub direction: Direction,
    /// Where the train ultimately terminates
    pub final_destination_station_id: String,
    /// Predicted arrival time (ISO 8601)
    pub arrival_time: String,
    pub seconds_away: i64,
    pub minutes_away: i64,
    /// 0.0-1.0, decaying with the number of segments still to traverse
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ArrivalsResponse {
    pub station_id: String,
    /// Soonest first
    pub arrivals: Vec<ArrivalPrediction>,
    /// Timestamp when predictions were calculated (ISO 8601)
    pub timestamp: String,
}
