pub mod arrivals;
pub mod journey;

pub use arrivals::{predict_arrivals, DEFAULT_ARRIVALS_LIMIT};
pub use journey::{plan_journey, JourneyOptions};
