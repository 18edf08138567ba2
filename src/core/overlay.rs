use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::distance::calculate_bounding_box;
use crate::models::{BoundingBox, Coordinate};

/// Default delay between unmount and remount of the circle
pub const DEFAULT_REMOUNT_DELAY: Duration = Duration::from_millis(10);

/// Logical circle drawn around the search location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleGeometry {
    pub center: Coordinate,
    pub radius_km: f64,
}

impl CircleGeometry {
    pub fn radius_m(&self) -> f64 {
        self.radius_km * 1000.0
    }

    pub fn bounds(&self) -> BoundingBox {
        calculate_bounding_box(self.center, self.radius_km)
    }
}

/// What the map should currently draw for the circle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleOverlay {
    pub geometry: CircleGeometry,
    /// False between an unmount and its deferred remount
    pub mounted: bool,
    /// Incremented on every geometry change
    pub generation: u64,
    /// Number of completed remounts
    pub mount_count: u64,
}

/// Forces the circle overlay to unmount and remount whenever its geometry changes
///
/// Holds at most one pending remount. A newer change aborts the pending task
/// and replaces it; the task also checks the generation before remounting so
/// an abort that races with completion can never mount stale geometry.
pub struct CircleOverlaySynchronizer {
    overlay: Arc<watch::Sender<CircleOverlay>>,
    pending: Mutex<Option<JoinHandle<()>>>,
    delay: Duration,
}

impl CircleOverlaySynchronizer {
    pub fn new(geometry: CircleGeometry, delay: Duration) -> Self {
        let (tx, _rx) = watch::channel(CircleOverlay {
            geometry,
            mounted: true,
            generation: 0,
            mount_count: 0,
        });

        Self {
            overlay: Arc::new(tx),
            pending: Mutex::new(None),
            delay,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CircleOverlay> {
        self.overlay.subscribe()
    }

    pub fn current(&self) -> CircleOverlay {
        *self.overlay.borrow()
    }

    /// True while a deferred remount is scheduled and has not run
    pub fn has_pending_remount(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Unmount the circle now and schedule its remount with `geometry`
    ///
    /// No-op when the geometry is unchanged.
    pub fn sync(&self, geometry: CircleGeometry) {
        let mut pending = self.pending.lock();

        if self.overlay.borrow().geometry == geometry {
            return;
        }

        if let Some(previous) = pending.take() {
            previous.abort();
        }

        let mut token = 0;
        self.overlay.send_modify(|overlay| {
            overlay.geometry = geometry;
            overlay.mounted = false;
            overlay.generation += 1;
            token = overlay.generation;
        });

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            // No event loop to defer onto; remount in place
            tracing::debug!("No runtime for deferred circle remount, remounting immediately");
            remount(&self.overlay, token);
            return;
        };

        let overlay = Arc::clone(&self.overlay);
        let delay = self.delay;
        *pending = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            remount(&overlay, token);
        }));

        tracing::trace!("Circle unmounted (generation {}), remount in {:?}", token, delay);
    }

    /// Drop any pending remount without running it
    pub fn cancel(&self) {
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for CircleOverlaySynchronizer {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn remount(overlay: &watch::Sender<CircleOverlay>, token: u64) {
    overlay.send_if_modified(|overlay| {
        if overlay.generation != token || overlay.mounted {
            return false;
        }
        overlay.mounted = true;
        overlay.mount_count += 1;
        true
    });
}
