//! Taste Navigator - search session orchestration for a map-based dining recommender
//!
//! This library owns the user's search criteria, drives a single recommendation
//! request at a time against the remote service, and keeps the map overlays
//! (position marker, radius circle, numbered result markers) consistent with
//! that state.

pub mod config;
pub mod core;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use self::core::{RecommendationOutcome, SearchCriteria, SearchSession, SessionState, SubmitError};
pub use models::{Coordinate, HardFilter, Store};
pub use services::{GeolocationResolver, RecommendationClient, RecommendationService};
