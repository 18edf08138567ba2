// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{BoundingBox, Coordinate, HardFilter, Store};
pub use requests::RecommendRequest;
pub use responses::{ErrorResponse, RecommendResponse, StoreRecord};
