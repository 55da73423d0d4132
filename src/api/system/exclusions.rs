/// Debug interface for repairing bad track matches: exclude a polyline by id
/// or name and the geometry mapper recomputes synchronously. Administrative,
/// not part of the steady-state contract.
use crate::api::{AppState, ErrorResponse};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ExclusionListResponse {
    pub ids: Vec<i64>,
    pub names: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExcludeFeatureRequest {
    /// Track polyline id to exclude
    pub id: Option<i64>,
    /// Track polyline name to exclude
    pub name: Option<String>,
}

/// Currently excluded track features
#[utoipa::path(
    get,
    path = "/api/system/exclusions",
    responses(
        (status = 200, description = "Excluded polyline ids and names", body = ExclusionListResponse)
    ),
    tag = "system"
)]
pub async fn list_exclusions(State(state): State<AppState>) -> Json<ExclusionListResponse> {
    let exclusions = state.runtime.excluded_features().await;
    let mut ids: Vec<i64> = exclusions.ids.into_iter().collect();
    ids.sort_unstable();
    let mut names: Vec<String> = exclusions.names.into_iter().collect();
    names.sort();
    Json(ExclusionListResponse { ids, names })
}

/// Exclude a track feature and rebuild route geometry
#[utoipa::path(
    post,
    path = "/api/system/exclusions",
    request_body = ExcludeFeatureRequest,
    responses(
        (status = 200, description = "Updated exclusion list after rebuild", body = ExclusionListResponse),
        (status = 400, description = "Neither id nor name given", body = ErrorResponse)
    ),
    tag = "system"
)]
pub async fn add_exclusion(
    State(state): State<AppState>,
    Json(request): Json<ExcludeFeatureRequest>,
) -> Result<Json<ExclusionListResponse>, (StatusCode, Json<ErrorResponse>)> {
    if request.id.is_none() && request.name.is_none() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "provide a polyline id or name to exclude".to_string(),
            }),
        ));
    }

    info!(id = ?request.id, name = ?request.name, "Excluding track feature via debug interface");
    state.runtime.exclude_feature(request.id, request.name).await;

    Ok(list_exclusions(State(state)).await)
}
