use crate::api::{error::not_found, AppState, ErrorResponse};
use crate::schedule::Route;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct RouteListResponse {
    pub routes: Vec<Route>,
}

/// List all route patterns with their frequencies and service windows
#[utoipa::path(
    get,
    path = "/api/routes",
    responses(
        (status = 200, description = "Route reference data", body = RouteListResponse)
    ),
    tag = "routes"
)]
pub async fn list_routes(State(state): State<AppState>) -> Json<RouteListResponse> {
    let routes = state.runtime.schedule().routes().to_vec();
    Json(RouteListResponse { routes })
}

/// A single route pattern
#[utoipa::path(
    get,
    path = "/api/routes/{route_id}",
    params(("route_id" = String, Path, description = "Route id")),
    responses(
        (status = 200, description = "Route detail", body = Route),
        (status = 404, description = "Unknown route", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn get_route(
    State(state): State<AppState>,
    Path(route_id): Path<String>,
) -> Result<Json<Route>, (StatusCode, Json<ErrorResponse>)> {
    state
        .runtime
        .schedule()
        .route(&route_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found("unknown route"))
}
