use crate::api::AppState;
use crate::runtime::EngineStats;
use axum::{extract::State, Json};

/// Engine statistics: live trains, tick counter, geometry cache state
#[utoipa::path(
    get,
    path = "/api/system/info",
    responses(
        (status = 200, description = "Current engine statistics", body = EngineStats)
    ),
    tag = "system"
)]
pub async fn get_info(State(state): State<AppState>) -> Json<EngineStats> {
    Json(state.runtime.stats().await)
}
