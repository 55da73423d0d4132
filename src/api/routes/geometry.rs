use crate::api::{error::not_found, AppState, ErrorResponse};
use crate::schedule::Direction;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct GeometrySegment {
    pub from_station_id: String,
    pub to_station_id: String,
    /// [lon, lat] points in forward travel order
    pub path: Vec<[f64; 2]>,
    pub distance_meters: f64,
    pub travel_time_secs: u32,
    /// False when no track polyline matched and the segment is a straight
    /// two-point fallback line
    pub matched: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RouteGeometryResponse {
    pub route_id: String,
    pub segments: Vec<GeometrySegment>,
    pub total_distance_meters: f64,
    pub total_travel_secs: u32,
    /// Number of segments on the straight-line fallback
    pub degraded_segments: usize,
}

/// Mapped track geometry for a route
///
/// Per-segment `matched` flags make degraded straight-line matches
/// discoverable without digging through logs.
#[utoipa::path(
    get,
    path = "/api/routes/{route_id}/geometry",
    params(("route_id" = String, Path, description = "Route id")),
    responses(
        (status = 200, description = "Mapped geometry in forward orientation", body = RouteGeometryResponse),
        (status = 404, description = "Unknown route or geometry not mapped", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn get_route_geometry(
    State(state): State<AppState>,
    Path(route_id): Path<String>,
) -> Result<Json<RouteGeometryResponse>, (StatusCode, Json<ErrorResponse>)> {
    let geometry = state.runtime.geometry().await;
    let Some(mapped) = geometry.oriented(&route_id, Direction::Forward) else {
        return Err(not_found("unknown route"));
    };

    let segments: Vec<GeometrySegment> = mapped
        .segments
        .iter()
        .map(|s| GeometrySegment {
            from_station_id: s.from_station_id.clone(),
            to_station_id: s.to_station_id.clone(),
            path: s.path.clone(),
            distance_meters: s.distance_meters,
            travel_time_secs: s.travel_time_secs,
            matched: s.matched,
        })
        .collect();

    Ok(Json(RouteGeometryResponse {
        route_id: mapped.route_id.clone(),
        total_distance_meters: mapped.total_distance_meters(),
        total_travel_secs: mapped.total_travel_secs(),
        degraded_segments: mapped.degraded_segment_count(),
        segments,
    }))
}
