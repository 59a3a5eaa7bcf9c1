//! Test doubles for the camera driver and decode engine.
//!
//! Kept crate-internal: every test module drives the session through the
//! same fakes so track accounting is asserted the same way everywhere.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::camera::{CameraDriver, CameraHandle, MediaTrack, StreamConstraints};
use crate::decode::{DecodeEngine, DecodeSender, DecoderConfig};
use crate::error::{CameraError, DecodeError};

// =============================================================================
// Fake Media Track
// =============================================================================

/// A track backed by a shared live-track counter.
pub(crate) struct FakeTrack {
    live: AtomicBool,
    registry: Arc<AtomicUsize>,
}

impl FakeTrack {
    fn new(registry: Arc<AtomicUsize>) -> Self {
        registry.fetch_add(1, Ordering::SeqCst);
        FakeTrack {
            live: AtomicBool::new(true),
            registry,
        }
    }
}

impl MediaTrack for FakeTrack {
    fn stop(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            self.registry.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Fake Camera Driver
// =============================================================================

/// What the next `open` call should do.
#[derive(Debug, Clone)]
pub(crate) enum OpenOutcome {
    /// Grant a stream with the given number of tracks.
    Grant(usize),
    /// Fail with PermissionDenied.
    Deny,
    /// Fail with a transient DeviceUnavailable.
    Busy,
    /// Never resolve (permission prompt left unanswered).
    Hang,
}

/// Scripted camera driver with live-track accounting.
///
/// An exhausted script grants single-track streams, so happy-path tests
/// need no scripting at all.
pub(crate) struct FakeDriver {
    script: Mutex<VecDeque<OpenOutcome>>,
    opens: AtomicUsize,
    live: Arc<AtomicUsize>,
}

impl FakeDriver {
    pub(crate) fn new() -> Self {
        FakeDriver::scripted(Vec::new())
    }

    pub(crate) fn scripted(outcomes: Vec<OpenOutcome>) -> Self {
        FakeDriver {
            script: Mutex::new(outcomes.into()),
            opens: AtomicUsize::new(0),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `open` calls made so far.
    pub(crate) fn open_calls(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of tracks currently live across every stream ever granted.
    pub(crate) fn live_tracks(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CameraDriver for FakeDriver {
    async fn open(&self, _constraints: &StreamConstraints) -> Result<CameraHandle, CameraError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(OpenOutcome::Grant(1));

        match outcome {
            OpenOutcome::Grant(track_count) => {
                let tracks = (0..track_count)
                    .map(|_| Box::new(FakeTrack::new(self.live.clone())) as Box<dyn MediaTrack>)
                    .collect();
                Ok(CameraHandle::new(tracks))
            }
            OpenOutcome::Deny => Err(CameraError::PermissionDenied),
            OpenOutcome::Busy => Err(CameraError::DeviceUnavailable("device busy".into())),
            OpenOutcome::Hang => std::future::pending().await,
        }
    }
}

// =============================================================================
// Fake Decode Engine
// =============================================================================

/// What `start` should do once invoked.
#[derive(Debug, Clone)]
pub(crate) enum StartBehavior {
    /// Report ready immediately.
    Ready,
    /// Fail with the given message.
    Fail(String),
    /// Never report ready.
    Hang,
}

/// Scripted decode engine that captures the sender it was started with, so
/// tests can emit codes — including late ones — through the real channel.
pub(crate) struct FakeEngine {
    behavior: Mutex<StartBehavior>,
    starts: AtomicUsize,
    stops: AtomicUsize,
    sender: Mutex<Option<DecodeSender>>,
}

impl FakeEngine {
    pub(crate) fn new() -> Self {
        FakeEngine::with_behavior(StartBehavior::Ready)
    }

    pub(crate) fn with_behavior(behavior: StartBehavior) -> Self {
        FakeEngine {
            behavior: Mutex::new(behavior),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            sender: Mutex::new(None),
        }
    }

    /// Emits a code through the most recent registration.
    pub(crate) fn emit(&self, code: &str) {
        self.sender
            .lock()
            .unwrap()
            .as_ref()
            .expect("engine was never started")
            .emit(code);
    }

    /// The sender from the most recent `start`, for stale-generation tests.
    pub(crate) fn sender(&self) -> DecodeSender {
        self.sender
            .lock()
            .unwrap()
            .clone()
            .expect("engine was never started")
    }

    pub(crate) fn start_calls(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub(crate) fn stop_calls(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DecodeEngine for FakeEngine {
    async fn start(
        &self,
        _camera: &CameraHandle,
        _config: &DecoderConfig,
        output: DecodeSender,
    ) -> Result<(), DecodeError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.sender.lock().unwrap() = Some(output);

        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            StartBehavior::Ready => Ok(()),
            StartBehavior::Fail(message) => Err(DecodeError::StartFailed(message)),
            StartBehavior::Hang => std::future::pending().await,
        }
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}
