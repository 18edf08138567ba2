use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, watch};

use crate::core::criteria::{CriteriaError, SearchCriteria};
use crate::core::outcome::{RecommendationOutcome, SessionState};
use crate::core::overlay::{CircleGeometry, CircleOverlay, CircleOverlaySynchronizer};
use crate::core::view::{MapOverlays, SidebarView};
use crate::models::Coordinate;
use crate::services::{GeolocationResolver, RecommendationService, DEFAULT_FAILURE_MESSAGE};

/// Shown when a submission has neither tags nor free text
pub const EMPTY_CRITERIA_MESSAGE: &str = "Select a keyword or describe the place you're looking for.";

/// Reasons a submission is refused before any request is made
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    #[error("{}", EMPTY_CRITERIA_MESSAGE)]
    EmptyCriteria,

    #[error("A recommendation request is already in flight")]
    AlreadyLoading,
}

/// User-visible messages emitted by the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    /// Inline validation message; the request was never sent
    Validation(String),
    /// Alert for a failed request
    Alert(String),
}

/// Single owner of the search state
///
/// Readers (map, sidebar) subscribe to snapshots; only the methods here mutate
/// state. At most one request is in flight: `submit` is refused while the
/// outcome is `Loading`, and a response computed for a location that has since
/// changed is discarded.
pub struct SearchSession {
    state: watch::Sender<SessionState>,
    service: Arc<dyn RecommendationService>,
    circle: CircleOverlaySynchronizer,
    notices: broadcast::Sender<SessionNotice>,
}

impl SearchSession {
    pub fn new(service: Arc<dyn RecommendationService>, criteria: SearchCriteria, remount_delay: Duration) -> Self {
        let circle = CircleOverlaySynchronizer::new(geometry_of(&criteria), remount_delay);
        let (state, _) = watch::channel(SessionState::new(criteria));
        let (notices, _) = broadcast::channel(16);

        Self {
            state,
            service,
            circle,
            notices,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn criteria(&self) -> SearchCriteria {
        self.state.borrow().criteria.clone()
    }

    pub fn outcome(&self) -> RecommendationOutcome {
        self.state.borrow().outcome.clone()
    }

    pub fn circle(&self) -> CircleOverlay {
        self.circle.current()
    }

    pub fn subscribe_circle(&self) -> watch::Receiver<CircleOverlay> {
        self.circle.subscribe()
    }

    pub fn map_overlays(&self) -> MapOverlays {
        MapOverlays::project(&self.state.borrow(), &self.circle.current())
    }

    pub fn sidebar(&self) -> SidebarView {
        SidebarView::project(&self.state.borrow())
    }

    /// Move the search center; always clears the outcome
    pub fn set_location(&self, location: Coordinate) {
        let mut geometry = None;
        self.state.send_modify(|state| {
            state.criteria.set_location(location);
            state.location_epoch += 1;
            if !matches!(state.outcome, RecommendationOutcome::Idle) {
                tracing::debug!("Location changed, discarding {} outcome", state.outcome.label());
            }
            state.outcome = RecommendationOutcome::Idle;
            geometry = Some(geometry_of(&state.criteria));
        });

        if let Some(geometry) = geometry {
            self.circle.sync(geometry);
        }
        tracing::info!("Search location set to {}", location);
    }

    /// Drag-end callback from the position marker
    pub fn on_marker_drag_end(&self, location: Coordinate) {
        self.set_location(location);
    }

    /// Clamp and snap the radius; results are kept, the circle is re-synced
    pub fn set_radius(&self, km: f64) -> f64 {
        let mut geometry = None;
        self.state.send_if_modified(|state| {
            let changed = state.criteria.set_radius(km);
            if changed {
                geometry = Some(geometry_of(&state.criteria));
            }
            changed
        });

        if let Some(geometry) = geometry {
            self.circle.sync(geometry);
        }
        self.state.borrow().criteria.radius_km()
    }

    pub fn toggle_tag(&self, tag: &str) {
        self.state.send_modify(|state| state.criteria.toggle_tag(tag));
    }

    pub fn set_free_text(&self, text: &str) {
        self.state.send_modify(|state| state.criteria.set_free_text(text));
    }

    /// Flip a hard filter by wire key; returns the new flag
    pub fn toggle_hard_filter(&self, key: &str) -> Result<bool, CriteriaError> {
        let mut result = Ok(false);
        self.state.send_if_modified(|state| {
            result = state.criteria.toggle_hard_filter(key);
            result.is_ok()
        });
        result
    }

    /// Re-resolve the device position and move there if one is reported
    ///
    /// Returns the new location, or `None` when the device gave no position.
    pub async fn recenter(&self, resolver: &GeolocationResolver) -> Option<Coordinate> {
        match resolver.try_resolve().await {
            Ok(position) => {
                self.set_location(position);
                Some(position)
            }
            Err(e) => {
                tracing::warn!("Recenter failed ({}), keeping current location", e);
                None
            }
        }
    }

    /// Issue one recommendation request for the current criteria
    ///
    /// Refused with `EmptyCriteria` when there is nothing to search for, and
    /// with `AlreadyLoading` while a request is outstanding; neither touches
    /// the network nor the outcome.
    pub async fn submit(&self) -> Result<(), SubmitError> {
        let mut admission = Err(SubmitError::AlreadyLoading);
        self.state.send_if_modified(|state| {
            if state.outcome.is_loading() {
                return false;
            }
            if !state.criteria.is_submittable() {
                admission = Err(SubmitError::EmptyCriteria);
                return false;
            }
            state.outcome = RecommendationOutcome::Loading;
            admission = Ok((state.criteria.clone(), state.location_epoch));
            true
        });

        let (criteria, epoch) = match admission {
            Ok(ticket) => ticket,
            Err(e) => {
                if e == SubmitError::EmptyCriteria {
                    self.notify(SessionNotice::Validation(e.to_string()));
                }
                tracing::debug!("Submit refused: {}", e);
                return Err(e);
            }
        };

        let mut guard = LoadingGuard {
            state: &self.state,
            epoch,
            armed: true,
        };

        tracing::info!(
            "Requesting recommendations at {} within {} km",
            criteria.location(),
            criteria.radius_km()
        );

        let outcome = match self.service.submit(&criteria).await {
            outcome @ (RecommendationOutcome::Success(_) | RecommendationOutcome::Failure { .. }) => outcome,
            other => {
                tracing::warn!("Service returned non-terminal outcome {}", other.label());
                RecommendationOutcome::Failure {
                    message: DEFAULT_FAILURE_MESSAGE.to_string(),
                }
            }
        };

        let alert = match &outcome {
            RecommendationOutcome::Failure { message } => Some(message.clone()),
            _ => None,
        };

        let mut pending = Some(outcome);
        let applied = self.state.send_if_modified(|state| {
            if state.location_epoch != epoch || !state.outcome.is_loading() {
                return false;
            }
            match pending.take() {
                Some(outcome) => {
                    state.outcome = outcome;
                    true
                }
                None => false,
            }
        });
        guard.armed = false;

        if !applied {
            tracing::debug!("Discarding response for a superseded location");
            return Ok(());
        }

        if let Some(message) = alert {
            self.notify(SessionNotice::Alert(message));
        }
        Ok(())
    }

    /// Cancel scheduled overlay work; called on teardown
    pub fn shutdown(&self) {
        self.circle.cancel();
    }

    fn notify(&self, notice: SessionNotice) {
        // No subscribers is fine
        let _ = self.notices.send(notice);
    }
}

/// Returns a `Loading` outcome to `Idle` if `submit` is dropped mid-request
struct LoadingGuard<'a> {
    state: &'a watch::Sender<SessionState>,
    epoch: u64,
    armed: bool,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let epoch = self.epoch;
        let reset = self.state.send_if_modified(|state| {
            if state.location_epoch != epoch || !state.outcome.is_loading() {
                return false;
            }
            state.outcome = RecommendationOutcome::Idle;
            true
        });
        if reset {
            tracing::debug!("Submit cancelled before a response arrived");
        }
    }
}

fn geometry_of(criteria: &SearchCriteria) -> CircleGeometry {
    CircleGeometry {
        center: criteria.location(),
        radius_km: criteria.radius_km(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::outcome::Recommendation;
    use crate::models::Store;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Service that counts calls and, when gated, waits for a release signal
    struct FakeService {
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
        outcome: RecommendationOutcome,
    }

    impl FakeService {
        fn returning(outcome: RecommendationOutcome) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                gate: None,
                outcome,
            }
        }

        fn gated(outcome: RecommendationOutcome, gate: Arc<Notify>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                gate: Some(gate),
                outcome,
            }
        }
    }

    #[async_trait]
    impl RecommendationService for FakeService {
        async fn submit(&self, _criteria: &SearchCriteria) -> RecommendationOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.outcome.clone()
        }
    }

    fn seoul() -> Coordinate {
        Coordinate::new(37.5665, 126.978).unwrap()
    }

    fn success() -> RecommendationOutcome {
        RecommendationOutcome::Success(Recommendation {
            result_text: "3 cafes found".to_string(),
            stores: vec![Store {
                name: "A".to_string(),
                location: Coordinate::new(37.56, 126.97).unwrap(),
            }],
            scanned_count: 10,
            analyzed_count: 3,
            received_at: Utc::now(),
        })
    }

    fn session(service: Arc<FakeService>) -> SearchSession {
        SearchSession::new(service, SearchCriteria::new(seoul(), 2.0), Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_empty_criteria_never_calls_service() {
        let service = Arc::new(FakeService::returning(success()));
        let session = session(service.clone());
        let mut notices = session.notices();

        session.set_free_text("   ");
        assert_eq!(session.submit().await, Err(SubmitError::EmptyCriteria));

        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.outcome(), RecommendationOutcome::Idle);
        assert_eq!(
            notices.try_recv().unwrap(),
            SessionNotice::Validation(EMPTY_CRITERIA_MESSAGE.to_string())
        );
    }

    #[tokio::test]
    async fn test_submit_success() {
        let service = Arc::new(FakeService::returning(success()));
        let session = session(service.clone());

        session.toggle_tag("카페");
        session.submit().await.unwrap();

        let outcome = session.outcome();
        assert_eq!(outcome.result_text(), "3 cafes found");
        assert_eq!(outcome.counters(), (10, 3));
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_raises_alert() {
        let service = Arc::new(FakeService::returning(RecommendationOutcome::Failure {
            message: "service down".to_string(),
        }));
        let session = session(service);
        let mut notices = session.notices();

        session.set_free_text("조용한 카페");
        session.submit().await.unwrap();

        assert!(matches!(session.outcome(), RecommendationOutcome::Failure { .. }));
        assert_eq!(notices.try_recv().unwrap(), SessionNotice::Alert("service down".to_string()));
    }

    #[tokio::test]
    async fn test_second_submit_while_loading_is_refused() {
        let gate = Arc::new(Notify::new());
        let service = Arc::new(FakeService::gated(success(), gate.clone()));
        let session = Arc::new(session(service.clone()));
        session.toggle_tag("카페");

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.submit().await }
        });

        let mut rx = session.subscribe();
        rx.wait_for(|s| s.outcome.is_loading()).await.unwrap();

        assert_eq!(session.submit().await, Err(SubmitError::AlreadyLoading));

        gate.notify_one();
        first.await.unwrap().unwrap();

        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert!(matches!(session.outcome(), RecommendationOutcome::Success(_)));
    }

    #[tokio::test]
    async fn test_location_change_discards_in_flight_response() {
        let gate = Arc::new(Notify::new());
        let service = Arc::new(FakeService::gated(success(), gate.clone()));
        let session = Arc::new(session(service));
        session.toggle_tag("카페");

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.submit().await }
        });

        let mut rx = session.subscribe();
        rx.wait_for(|s| s.outcome.is_loading()).await.unwrap();

        session.on_marker_drag_end(Coordinate::new(37.57, 126.99).unwrap());
        assert_eq!(session.outcome(), RecommendationOutcome::Idle);

        gate.notify_one();
        first.await.unwrap().unwrap();

        assert_eq!(session.outcome(), RecommendationOutcome::Idle);
    }

    #[tokio::test]
    async fn test_cancelled_submit_allows_resubmit() {
        let gate = Arc::new(Notify::new());
        let service = Arc::new(FakeService::gated(success(), gate.clone()));
        let session = session(service.clone());
        session.toggle_tag("카페");

        let timed_out = tokio::time::timeout(Duration::from_millis(20), session.submit()).await;
        assert!(timed_out.is_err());
        assert_eq!(session.outcome(), RecommendationOutcome::Idle);

        // Let the next request through right away
        gate.notify_one();
        session.submit().await.unwrap();

        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
        assert!(matches!(session.outcome(), RecommendationOutcome::Success(_)));
    }

    #[tokio::test]
    async fn test_aborted_submit_task_allows_resubmit() {
        let gate = Arc::new(Notify::new());
        let service = Arc::new(FakeService::gated(success(), gate.clone()));
        let session = Arc::new(session(service));
        session.toggle_tag("카페");

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.submit().await }
        });
        let mut rx = session.subscribe();
        rx.wait_for(|s| s.outcome.is_loading()).await.unwrap();

        first.abort();
        assert!(first.await.unwrap_err().is_cancelled());
        assert_eq!(session.outcome(), RecommendationOutcome::Idle);

        gate.notify_one();
        assert_eq!(session.submit().await, Ok(()));
    }

    #[tokio::test]
    async fn test_location_change_clears_success() {
        let service = Arc::new(FakeService::returning(success()));
        let session = session(service);
        session.toggle_tag("카페");
        session.submit().await.unwrap();
        assert_eq!(session.outcome().stores().len(), 1);

        session.set_location(Coordinate::new(37.50, 127.0).unwrap());

        let state = session.snapshot();
        assert_eq!(state.outcome, RecommendationOutcome::Idle);
        assert!(state.outcome.stores().is_empty());
        assert_eq!(state.outcome.result_text(), "");
    }

    #[tokio::test]
    async fn test_radius_change_keeps_results_and_resyncs_circle() {
        let service = Arc::new(FakeService::returning(success()));
        let session = session(service);
        session.toggle_tag("카페");
        session.submit().await.unwrap();

        assert_eq!(session.set_radius(4.2), 4.0);

        assert!(matches!(session.outcome(), RecommendationOutcome::Success(_)));
        let circle = session.circle();
        assert_eq!(circle.geometry.radius_km, 4.0);
        assert_eq!(circle.generation, 1);
    }

    #[tokio::test]
    async fn test_unknown_filter_leaves_state_untouched() {
        let session = session(Arc::new(FakeService::returning(success())));
        let before = session.criteria();

        assert_eq!(
            session.toggle_hard_filter("Parking"),
            Err(CriteriaError::InvalidFilterKey("Parking".to_string()))
        );
        assert_eq!(session.criteria(), before);

        assert_eq!(session.toggle_hard_filter("GoodForKids"), Ok(true));
    }
}
