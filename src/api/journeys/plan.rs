use crate::api::AppState;
use crate::models::JourneyPlanResponse;
use crate::predict::JourneyOptions;
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub struct JourneyQuery {
    /// Origin station id
    pub from: String,
    /// Destination station id
    pub to: String,
    /// Maximum acceptable wait for a live train, in minutes
    pub max_wait_minutes: Option<i64>,
    /// Plan relative to this instant (RFC 3339); defaults to now
    pub departure_time: Option<String>,
}

/// Plan a journey between two stations
///
/// `plan` is null when the stations are identical, unknown, or not on a
/// common route; callers render that as "no route found".
#[utoipa::path(
    get,
    path = "/api/journeys/plan",
    params(JourneyQuery),
    responses(
        (status = 200, description = "Journey plan, or null when no route connects the stations", body = JourneyPlanResponse)
    ),
    tag = "journeys"
)]
pub async fn plan_journey(
    State(state): State<AppState>,
    Query(query): Query<JourneyQuery>,
) -> Json<JourneyPlanResponse> {
    let now = Utc::now();
    let departure_time = query
        .departure_time
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let mut opts = JourneyOptions {
        departure_time,
        ..JourneyOptions::default()
    };
    if let Some(max_wait) = query.max_wait_minutes {
        opts.max_wait_minutes = max_wait;
    }

    let plan = state.runtime.plan(&query.from, &query.to, opts, now).await;

    Json(JourneyPlanResponse {
        plan,
        timestamp: now.to_rfc3339(),
    })
}
