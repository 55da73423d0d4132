pub mod error;
pub mod journeys;
pub mod routes;
pub mod stations;
pub mod system;
pub mod trains;

pub use error::{internal_error, ErrorResponse};

use crate::runtime::SimulationRuntime;
use std::sync::Arc;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<SimulationRuntime>,
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Live Train Map API", version = "0.1.0"),
    components(schemas(
        ErrorResponse,
        crate::models::Snapshot,
        crate::models::TrainPosition,
        crate::models::ArrivalPrediction,
        crate::models::ArrivalsResponse,
        crate::models::JourneyPlan,
        crate::models::JourneyPlanResponse,
        crate::models::NextDeparture,
        crate::models::DepartureSource,
        crate::schedule::Direction,
        crate::schedule::Station,
        crate::schedule::Route,
        crate::schedule::ServiceWindow,
        crate::runtime::EngineStats,
        stations::list::StationListResponse,
        routes::list::RouteListResponse,
        routes::geometry::RouteGeometryResponse,
        routes::geometry::GeometrySegment,
        system::exclusions::ExclusionListResponse,
        system::exclusions::ExcludeFeatureRequest,
    )),
    tags(
        (name = "trains", description = "Live train positions"),
        (name = "stations", description = "Station reference data and arrivals"),
        (name = "routes", description = "Route reference data and mapped geometry"),
        (name = "journeys", description = "Journey planning"),
        (name = "system", description = "Engine statistics and debug interface")
    )
)]
pub struct ApiDoc;
