use chrono::{DateTime, Utc};

use crate::core::criteria::SearchCriteria;
use crate::models::Store;

/// A successful recommendation, in service order
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub result_text: String,
    pub stores: Vec<Store>,
    pub scanned_count: u64,
    pub analyzed_count: u64,
    pub received_at: DateTime<Utc>,
}

/// Lifecycle of the most recent (or in-flight) recommendation request
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RecommendationOutcome {
    #[default]
    Idle,
    Loading,
    Success(Recommendation),
    Failure { message: String },
}

impl RecommendationOutcome {
    pub fn is_loading(&self) -> bool {
        matches!(self, RecommendationOutcome::Loading)
    }

    /// Stores to render; empty unless the outcome is `Success`
    pub fn stores(&self) -> &[Store] {
        match self {
            RecommendationOutcome::Success(rec) => &rec.stores,
            _ => &[],
        }
    }

    pub fn result_text(&self) -> &str {
        match self {
            RecommendationOutcome::Success(rec) => &rec.result_text,
            _ => "",
        }
    }

    /// (scanned, analyzed) counters shown in the sidebar
    pub fn counters(&self) -> (u64, u64) {
        match self {
            RecommendationOutcome::Success(rec) => (rec.scanned_count, rec.analyzed_count),
            _ => (0, 0),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecommendationOutcome::Idle => "idle",
            RecommendationOutcome::Loading => "loading",
            RecommendationOutcome::Success(_) => "success",
            RecommendationOutcome::Failure { .. } => "failure",
        }
    }
}

/// Snapshot published by the session to every reader
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub criteria: SearchCriteria,
    pub outcome: RecommendationOutcome,
    /// Bumped whenever the location changes; tags in-flight requests
    pub(crate) location_epoch: u64,
}

impl SessionState {
    pub fn new(criteria: SearchCriteria) -> Self {
        Self {
            criteria,
            outcome: RecommendationOutcome::Idle,
            location_epoch: 0,
        }
    }
}
