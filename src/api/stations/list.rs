use crate::api::AppState;
use crate::schedule::Station;
use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct StationListResponse {
    pub stations: Vec<Station>,
}

/// List all stations on the line, in corridor order
#[utoipa::path(
    get,
    path = "/api/stations",
    responses(
        (status = 200, description = "Station reference data", body = StationListResponse)
    ),
    tag = "stations"
)]
pub async fn list_stations(State(state): State<AppState>) -> Json<StationListResponse> {
    let stations = state.runtime.schedule().stations().cloned().collect();
    Json(StationListResponse { stations })
}
