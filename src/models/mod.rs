pub mod arrival;
pub mod journey;
pub mod train;

pub use arrival::{ArrivalPrediction, ArrivalsResponse};
pub use journey::{DepartureSource, JourneyPlan, JourneyPlanResponse, NextDeparture};
pub use train::{Snapshot, TrainPosition};
