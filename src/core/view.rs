//! Read-only projections of the session for the map and the sidebar.
//!
//! Both views are rebuilt from a snapshot on every change; neither holds state.

use serde::Serialize;

use crate::core::distance::haversine_distance;
use crate::core::outcome::{RecommendationOutcome, SessionState};
use crate::core::overlay::CircleOverlay;
use crate::models::{BoundingBox, Coordinate, HardFilter};

/// The draggable "you are here" marker
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionMarker {
    pub position: Coordinate,
    pub draggable: bool,
}

/// Radius circle as the map widget wants it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CircleView {
    pub center: Coordinate,
    pub radius_m: f64,
}

/// Numbered marker for one recommended store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultMarker {
    /// 1-based, following the service's order
    pub label: usize,
    pub name: String,
    pub position: Coordinate,
    pub distance_km: f64,
}

/// Everything drawn on the map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapOverlays {
    pub position: PositionMarker,
    /// `None` while the circle is between unmount and remount
    pub circle: Option<CircleView>,
    pub markers: Vec<ResultMarker>,
    /// Area covering the search circle, for fitting the viewport
    #[serde(skip)]
    pub viewport: BoundingBox,
}

impl MapOverlays {
    pub fn project(state: &SessionState, circle: &CircleOverlay) -> Self {
        let center = state.criteria.location();

        let markers = state
            .outcome
            .stores()
            .iter()
            .enumerate()
            .map(|(idx, store)| ResultMarker {
                label: idx + 1,
                name: store.name.clone(),
                position: store.location,
                distance_km: haversine_distance(center, store.location),
            })
            .collect();

        let circle_view = circle.mounted.then(|| CircleView {
            center: circle.geometry.center,
            radius_m: circle.geometry.radius_m(),
        });

        Self {
            position: PositionMarker {
                position: center,
                draggable: true,
            },
            circle: circle_view,
            markers,
            viewport: circle.geometry.bounds(),
        }
    }
}

/// Sidebar state: controls, counters and the result panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SidebarView {
    pub radius_km: f64,
    pub tags: Vec<String>,
    pub free_text: String,
    pub active_filters: Vec<HardFilter>,
    pub loading: bool,
    pub submit_enabled: bool,
    pub result_text: Option<String>,
    pub scanned_count: u64,
    pub analyzed_count: u64,
    pub error: Option<String>,
}

impl SidebarView {
    pub fn project(state: &SessionState) -> Self {
        let criteria = &state.criteria;
        let loading = state.outcome.is_loading();
        let (scanned_count, analyzed_count) = state.outcome.counters();

        let result_text = Some(state.outcome.result_text())
            .filter(|text| !text.is_empty())
            .map(str::to_string);

        let error = match &state.outcome {
            RecommendationOutcome::Failure { message } => Some(message.clone()),
            _ => None,
        };

        Self {
            radius_km: criteria.radius_km(),
            tags: criteria.tags().iter().cloned().collect(),
            free_text: criteria.free_text().to_string(),
            active_filters: criteria.active_filters().collect(),
            loading,
            submit_enabled: !loading,
            result_text,
            scanned_count,
            analyzed_count,
            error,
        }
    }
}
