pub mod mapper;
pub mod spatial;
pub mod track;

pub use mapper::{GeometryCache, RouteGeometry, Segment};
pub use track::{ExclusionSet, FilterContext, TrackPolyline, TrackStore};
