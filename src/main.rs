mod api;
mod config;
mod geometry;
mod models;
mod predict;
mod runtime;
mod schedule;
mod sim;

use axum::http::{header, Method};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_swagger_ui::SwaggerUi;

use api::{ApiDoc, AppState};
use config::Config;
use geometry::track::{ExclusionSet, TrackStore};
use runtime::SimulationRuntime;
use schedule::ScheduleData;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "trainmap_server=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Live Train Map server");

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.yaml".to_string());
    let config = Config::load(&config_path)?;

    // Schedule tables are reference data; without them there is nothing to
    // simulate.
    let schedule = ScheduleData::load(&config.schedule_path)?;
    info!(
        stations = schedule.station_count(),
        routes = schedule.routes().len(),
        "Loaded schedule data"
    );

    // Track geometry is best-effort: without it the mapper degrades to
    // straight lines between stations instead of refusing to start.
    let track_store = match TrackStore::load(&config.track_geometry_path) {
        Ok(store) => store,
        Err(e) => {
            warn!(
                error = %e,
                "Failed to load track geometry, running in straight-line mode"
            );
            TrackStore::empty()
        }
    };

    let exclusions = ExclusionSet::from_lists(&config.exclusions.ids, &config.exclusions.names);
    let runtime = Arc::new(SimulationRuntime::new(
        schedule,
        track_store,
        exclusions,
        config.bounding_box,
        std::time::Duration::from_millis(config.tick_interval_ms),
    ));

    let runtime_clone = runtime.clone();
    tokio::spawn(async move {
        runtime_clone.start().await;
    });

    let state = AppState { runtime };

    // Configure CORS
    let cors = if config.cors_permissive {
        warn!("CORS: permissive mode enabled (all origins allowed) - development only");
        CorsLayer::permissive()
    } else if !config.cors_origins.is_empty() {
        info!(origins = ?config.cors_origins, "CORS: restricting to configured origins");
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        return Err(
            "CORS configuration error: set cors_origins or cors_permissive: true".into(),
        );
    };

    // Build router
    let (app, openapi) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(api::trains::positions::get_positions))
        .routes(routes!(api::trains::stream::stream_positions))
        .routes(routes!(api::stations::list::list_stations))
        .routes(routes!(api::stations::arrivals::get_arrivals))
        .routes(routes!(api::routes::list::list_routes))
        .routes(routes!(api::routes::list::get_route))
        .routes(routes!(api::routes::geometry::get_route_geometry))
        .routes(routes!(api::journeys::plan::plan_journey))
        .routes(routes!(api::system::info::get_info))
        .routes(routes!(
            api::system::exclusions::list_exclusions,
            api::system::exclusions::add_exclusion
        ))
        .with_state(state)
        .split_for_parts();

    let app = app
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Server running");

    axum::serve(listener, app).await?;

    Ok(())
}
