use crate::api::AppState;
use crate::models::Snapshot;
use axum::{extract::State, Json};

/// Current snapshot of all live train positions
///
/// Positions are estimated purely from the published schedule and the mapped
/// track geometry; there is no live telemetry behind them.
#[utoipa::path(
    get,
    path = "/api/trains/positions",
    responses(
        (status = 200, description = "Estimated positions of all live trains, recomputed every tick", body = Snapshot)
    ),
    tag = "trains"
)]
pub async fn get_positions(State(state): State<AppState>) -> Json<Snapshot> {
    let snapshot = state.runtime.snapshot().await;
    Json((*snapshot).clone())
}
