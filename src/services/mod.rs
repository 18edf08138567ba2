// Service exports
pub mod geolocation;
pub mod recommendation;

pub use geolocation::{FixedPosition, GeolocationError, GeolocationResolver, NoPositionSource, PositionSource};
pub use recommendation::{ClientError, RecommendationClient, RecommendationService, DEFAULT_FAILURE_MESSAGE};
