use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::models::Coordinate;

/// Errors a position source may report. Never surfaced past the resolver.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeolocationError {
    #[error("Location permission denied")]
    Denied,

    #[error("Timed out waiting for a position fix")]
    Timeout,

    #[error("Geolocation unavailable: {0}")]
    Unavailable(String),
}

/// Platform capability that reports the device position
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self) -> Result<Coordinate, GeolocationError>;
}

/// A source that always reports the same position
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Coordinate);

#[async_trait]
impl PositionSource for FixedPosition {
    async fn current_position(&self) -> Result<Coordinate, GeolocationError> {
        Ok(self.0)
    }
}

/// A platform without geolocation support
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPositionSource;

#[async_trait]
impl PositionSource for NoPositionSource {
    async fn current_position(&self) -> Result<Coordinate, GeolocationError> {
        Err(GeolocationError::Unavailable("no position source".to_string()))
    }
}

/// Resolves the reference position, falling back to a fixed default
pub struct GeolocationResolver {
    source: Arc<dyn PositionSource>,
    fallback: Coordinate,
    timeout: Duration,
    initial: OnceCell<Coordinate>,
}

impl GeolocationResolver {
    pub fn new(source: Arc<dyn PositionSource>, fallback: Coordinate, timeout: Duration) -> Self {
        Self {
            source,
            fallback,
            timeout,
            initial: OnceCell::new(),
        }
    }

    pub fn fallback(&self) -> Coordinate {
        self.fallback
    }

    /// Position used to seed a new session; the source is queried at most once
    pub async fn initial(&self) -> Coordinate {
        *self.initial.get_or_init(|| self.resolve()).await
    }

    /// Query the source, returning the fallback on denial, timeout or absence
    pub async fn resolve(&self) -> Coordinate {
        match self.try_resolve().await {
            Ok(position) => position,
            Err(e) => {
                tracing::warn!("Geolocation failed ({}), using fallback {}", e, self.fallback);
                self.fallback
            }
        }
    }

    /// Query the source without falling back
    pub async fn try_resolve(&self) -> Result<Coordinate, GeolocationError> {
        let position = tokio::time::timeout(self.timeout, self.source.current_position())
            .await
            .map_err(|_| GeolocationError::Timeout)??;

        tracing::debug!("Device position resolved: {}", position);
        Ok(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        result: Result<Coordinate, GeolocationError>,
    }

    #[async_trait]
    impl PositionSource for CountingSource {
        async fn current_position(&self) -> Result<Coordinate, GeolocationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    struct SlowSource;

    #[async_trait]
    impl PositionSource for SlowSource {
        async fn current_position(&self) -> Result<Coordinate, GeolocationError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Coordinate::new(0.0, 0.0).unwrap())
        }
    }

    fn seoul() -> Coordinate {
        Coordinate::new(37.5665, 126.978).unwrap()
    }

    fn jeju() -> Coordinate {
        Coordinate::new(33.5043, 126.5262).unwrap()
    }

    #[tokio::test]
    async fn test_device_position_used() {
        let resolver = GeolocationResolver::new(Arc::new(FixedPosition(jeju())), seoul(), Duration::from_secs(1));
        assert_eq!(resolver.resolve().await, jeju());
    }

    #[tokio::test]
    async fn test_denied_falls_back() {
        let source = CountingSource {
            calls: AtomicUsize::new(0),
            result: Err(GeolocationError::Denied),
        };
        let resolver = GeolocationResolver::new(Arc::new(source), seoul(), Duration::from_secs(1));
        assert_eq!(resolver.resolve().await, seoul());
    }

    #[tokio::test]
    async fn test_missing_capability_falls_back() {
        let resolver = GeolocationResolver::new(Arc::new(NoPositionSource), seoul(), Duration::from_secs(1));
        assert_eq!(resolver.resolve().await, seoul());
        assert!(matches!(resolver.try_resolve().await, Err(GeolocationError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let resolver = GeolocationResolver::new(Arc::new(SlowSource), seoul(), Duration::from_millis(20));
        assert_eq!(resolver.try_resolve().await, Err(GeolocationError::Timeout));
        assert_eq!(resolver.resolve().await, seoul());
    }

    #[tokio::test]
    async fn test_initial_resolves_once() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            result: Ok(jeju()),
        });
        let resolver = GeolocationResolver::new(source.clone(), seoul(), Duration::from_secs(1));

        assert_eq!(resolver.initial().await, jeju());
        assert_eq!(resolver.initial().await, jeju());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        // Recenter goes back to the source
        resolver.resolve().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
