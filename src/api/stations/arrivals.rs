use crate::api::{error::not_found, AppState, ErrorResponse};
use crate::models::ArrivalsResponse;
use crate::predict::DEFAULT_ARRIVALS_LIMIT;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ArrivalsQuery {
    /// Maximum number of predictions to return
    pub limit: Option<usize>,
}

/// Predicted arrivals of live trains at a station, soonest first
///
/// A station with no approaching trains gets an empty list, not an error.
#[utoipa::path(
    get,
    path = "/api/stations/{station_id}/arrivals",
    params(
        ("station_id" = String, Path, description = "Station id"),
        ArrivalsQuery
    ),
    responses(
        (status = 200, description = "Arrival predictions for the station", body = ArrivalsResponse),
        (status = 404, description = "Unknown station", body = ErrorResponse)
    ),
    tag = "stations"
)]
pub async fn get_arrivals(
    State(state): State<AppState>,
    Path(station_id): Path<String>,
    Query(query): Query<ArrivalsQuery>,
) -> Result<Json<ArrivalsResponse>, (StatusCode, Json<ErrorResponse>)> {
    if state.runtime.schedule().station(&station_id).is_none() {
        return Err(not_found("unknown station"));
    }

    let now = Utc::now();
    let limit = query.limit.unwrap_or(DEFAULT_ARRIVALS_LIMIT);
    let arrivals = state.runtime.arrivals(&station_id, limit, now).await;

    Ok(Json(ArrivalsResponse {
        station_id,
        arrivals,
        timestamp: now.to_rfc3339(),
    }))
}
