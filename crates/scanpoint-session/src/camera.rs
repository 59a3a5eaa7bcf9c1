//! # Camera Resource
//!
//! Exclusive ownership of the live camera stream.
//!
//! ## Acquisition & Retry Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Camera Acquisition Flow                             │
//! │                                                                         │
//! │  acquire(constraints)                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  driver.open() ── PermissionDenied ──► Err (terminal, no retry)        │
//! │       │                                                                 │
//! │       ├── Ok(handle) ──► stored, at most one handle held               │
//! │       │                                                                 │
//! │       └── DeviceUnavailable                                            │
//! │               │                                                         │
//! │               ▼                                                         │
//! │       full release ──► fixed delay ──► driver.open() again             │
//! │               │                             │                           │
//! │               │                   Ok ──► stored                         │
//! │               │                   Err ──► Err (no further retries)     │
//! │               ▼                                                         │
//! │       Exactly ONE retry. Bounds retry storms on a busy device.         │
//! │                                                                         │
//! │  release(): idempotent — stops every track, clears the slot, safe      │
//! │  to call repeatedly and on an already-released handle.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::CameraError;

// =============================================================================
// Stream Constraints
// =============================================================================

/// Which camera to prefer on devices with more than one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// Front-facing (selfie) camera.
    User,
    /// Rear camera, the usual choice for scanning labels.
    Environment,
}

/// Resolution and facing constraints for stream acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConstraints {
    pub width: u32,
    pub height: u32,
    pub facing: FacingMode,
}

// =============================================================================
// Media Track
// =============================================================================

/// A single track of the live stream.
///
/// `stop()` must be idempotent: the resource calls it on every release path
/// and releases may overlap with platform-initiated track endings.
pub trait MediaTrack: Send + Sync {
    /// Stops the track, ending its hardware usage.
    fn stop(&self);

    /// Whether the track is still delivering frames.
    fn is_live(&self) -> bool;
}

// =============================================================================
// Camera Handle
// =============================================================================

/// Ownership token for one live camera stream.
///
/// ## Invariant
/// At most one handle is open per session, and it must be released before a
/// new one is acquired. Only [`CameraResource`] creates and releases these.
pub struct CameraHandle {
    id: Uuid,
    tracks: Vec<Box<dyn MediaTrack>>,
}

impl CameraHandle {
    /// Wraps the tracks of a freshly opened stream.
    pub fn new(tracks: Vec<Box<dyn MediaTrack>>) -> Self {
        CameraHandle {
            id: Uuid::new_v4(),
            tracks,
        }
    }

    /// Identity of this acquisition, for log correlation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Number of tracks on the stream.
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Number of tracks still live.
    pub fn live_track_count(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_live()).count()
    }

    /// Stops every track on the handle.
    fn stop_all(&self) {
        for track in &self.tracks {
            if track.is_live() {
                track.stop();
            }
        }
    }
}

impl std::fmt::Debug for CameraHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraHandle")
            .field("id", &self.id)
            .field("tracks", &self.tracks.len())
            .finish()
    }
}

// =============================================================================
// Camera Driver Trait
// =============================================================================

/// Platform integration that opens the actual stream.
///
/// Implemented by the embedding application (browser bridge, V4L2 shim,
/// test fake). `open` may suspend indefinitely on a permission prompt; the
/// session stays responsive to stop/shutdown while it waits.
#[async_trait]
pub trait CameraDriver: Send + Sync {
    /// Requests camera permission and a stream matching `constraints`.
    async fn open(&self, constraints: &StreamConstraints) -> Result<CameraHandle, CameraError>;
}

// =============================================================================
// Camera Resource
// =============================================================================

/// Owns the camera stream on behalf of the scanning session.
///
/// No other component reads or mutates the handle; the session observes
/// state, the dispatcher never touches hardware.
pub struct CameraResource {
    driver: Arc<dyn CameraDriver>,
    handle: Option<CameraHandle>,
    retry_delay: Duration,
}

impl CameraResource {
    /// Creates a resource around a platform driver.
    pub fn new(driver: Arc<dyn CameraDriver>, retry_delay: Duration) -> Self {
        CameraResource {
            driver,
            handle: None,
            retry_delay,
        }
    }

    /// Whether a handle is currently open.
    pub fn is_held(&self) -> bool {
        self.handle.is_some()
    }

    /// The open handle, if any.
    pub fn handle(&self) -> Option<&CameraHandle> {
        self.handle.as_ref()
    }

    /// Acquires the stream, retrying exactly once on a transient
    /// device-busy failure.
    ///
    /// ## Failure Policy
    /// - `PermissionDenied`: returned immediately, no retry.
    /// - `DeviceUnavailable`: full release, fixed delay, one fresh attempt;
    ///   a second consecutive failure is returned to the caller.
    pub async fn acquire(
        &mut self,
        constraints: &StreamConstraints,
    ) -> Result<&CameraHandle, CameraError> {
        if self.handle.is_some() {
            // Caller contract is release-before-acquire; uphold the
            // at-most-one invariant rather than leak a live stream.
            warn!("acquire called with a handle still open, releasing it first");
            self.release();
        }

        let handle = match self.driver.open(constraints).await {
            Ok(handle) => handle,
            Err(CameraError::PermissionDenied) => return Err(CameraError::PermissionDenied),
            Err(CameraError::DeviceUnavailable(reason)) => {
                warn!(%reason, delay_ms = self.retry_delay.as_millis() as u64,
                    "Camera busy, retrying once");
                self.release();
                tokio::time::sleep(self.retry_delay).await;
                self.driver.open(constraints).await?
            }
        };

        debug!(handle = %handle.id(), tracks = handle.track_count(), "Camera stream acquired");
        Ok(self.handle.insert(handle))
    }

    /// Releases the stream: stops every track and clears the slot.
    ///
    /// Idempotent — calling with nothing held, or repeatedly, is a no-op.
    pub fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop_all();
            debug!(handle = %handle.id(), "Camera stream released");
        }
    }

    /// Opens and immediately releases a throwaway stream to establish
    /// camera permission before the session first starts.
    ///
    /// Nothing is stored; the probe never counts against the
    /// one-open-handle invariant.
    pub async fn preflight(&self, constraints: &StreamConstraints) -> Result<(), CameraError> {
        let probe = self.driver.open(constraints).await?;
        probe.stop_all();
        debug!("Camera permission preflight succeeded");
        Ok(())
    }
}

impl std::fmt::Debug for CameraResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraResource")
            .field("held", &self.is_held())
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDriver, OpenOutcome};

    fn constraints() -> StreamConstraints {
        StreamConstraints {
            width: 960,
            height: 540,
            facing: FacingMode::Environment,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_stores_single_handle() {
        let driver = Arc::new(FakeDriver::new());
        let mut resource = CameraResource::new(driver.clone(), Duration::from_millis(100));

        resource.acquire(&constraints()).await.unwrap();
        assert!(resource.is_held());
        assert_eq!(driver.live_tracks(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_is_idempotent() {
        let driver = Arc::new(FakeDriver::new());
        let mut resource = CameraResource::new(driver.clone(), Duration::from_millis(100));

        resource.acquire(&constraints()).await.unwrap();
        resource.release();
        resource.release();
        resource.release();

        assert!(!resource.is_held());
        assert_eq!(driver.live_tracks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_busy_retried_exactly_once() {
        let driver = Arc::new(FakeDriver::scripted(vec![
            OpenOutcome::Busy,
            OpenOutcome::Grant(1),
        ]));
        let mut resource = CameraResource::new(driver.clone(), Duration::from_millis(100));

        resource.acquire(&constraints()).await.unwrap();
        assert!(resource.is_held());
        assert_eq!(driver.open_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_busy_failure_surfaces() {
        let driver = Arc::new(FakeDriver::scripted(vec![
            OpenOutcome::Busy,
            OpenOutcome::Busy,
            OpenOutcome::Grant(1),
        ]));
        let mut resource = CameraResource::new(driver.clone(), Duration::from_millis(100));

        let err = resource.acquire(&constraints()).await.unwrap_err();
        assert!(matches!(err, CameraError::DeviceUnavailable(_)));
        // Exactly one retry: the third scripted grant was never reached.
        assert_eq!(driver.open_calls(), 2);
        assert!(!resource.is_held());
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_denied_not_retried() {
        let driver = Arc::new(FakeDriver::scripted(vec![OpenOutcome::Deny]));
        let mut resource = CameraResource::new(driver.clone(), Duration::from_millis(100));

        let err = resource.acquire(&constraints()).await.unwrap_err();
        assert_eq!(err, CameraError::PermissionDenied);
        assert_eq!(driver.open_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_with_handle_held_releases_old_stream() {
        let driver = Arc::new(FakeDriver::new());
        let mut resource = CameraResource::new(driver.clone(), Duration::from_millis(100));

        resource.acquire(&constraints()).await.unwrap();
        resource.acquire(&constraints()).await.unwrap();

        // The first stream's track was stopped before the second opened.
        assert_eq!(driver.live_tracks(), 1);
        assert_eq!(driver.open_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_preflight_leaves_no_live_tracks() {
        let driver = Arc::new(FakeDriver::new());
        let resource = CameraResource::new(driver.clone(), Duration::from_millis(100));

        resource.preflight(&constraints()).await.unwrap();
        assert_eq!(driver.live_tracks(), 0);
        assert!(!resource.is_held());
    }
}
