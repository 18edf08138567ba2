// Core session exports
pub mod criteria;
pub mod distance;
pub mod outcome;
pub mod overlay;
pub mod session;
pub mod view;

pub use criteria::{CriteriaError, SearchCriteria};
pub use distance::{calculate_bounding_box, haversine_distance, is_within_bounding_box};
pub use outcome::{Recommendation, RecommendationOutcome, SessionState};
pub use overlay::{CircleGeometry, CircleOverlay, CircleOverlaySynchronizer};
pub use session::{SearchSession, SessionNotice, SubmitError};
pub use view::{MapOverlays, ResultMarker, SidebarView};
