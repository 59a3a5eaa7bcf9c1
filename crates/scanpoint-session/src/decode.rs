//! # Decode Engine Seam
//!
//! The frame-decoding engine is an external collaborator: it runs its own
//! background workers and converts camera frames into barcode strings. This
//! module defines the trait the session drives it through, plus the
//! generation-tagged sender its callbacks deliver into.
//!
//! ## Why Generation Tags
//! `stop()` only *requests* cessation — callbacks already in flight on the
//! engine's workers may still arrive afterwards, and unsubscription can
//! race with delivery. Every emission therefore carries the generation it
//! was registered under; the session compares it against the current
//! generation and its current state before acting, and simply ignores the
//! rest.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use scanpoint_core::ScanEvent;

use crate::camera::CameraHandle;
use crate::error::DecodeError;

// =============================================================================
// Decoder Configuration
// =============================================================================

/// Barcode symbologies the engine may be asked to read.
///
/// The station ships with a fixed reader set (Code 39 labels on asset
/// tags); this enum exists so the configuration is typed, not so operators
/// can reconfigure symbologies at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarcodeReader {
    Code39,
    Code128,
    Ean13,
}

/// Settings handed to the decode engine on start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Symbologies to decode.
    pub readers: Vec<BarcodeReader>,

    /// Whether the engine should locate the barcode within the frame
    /// rather than assume a centered target.
    pub locate: bool,

    /// Worker threads for frame decoding.
    pub workers: usize,

    /// Percentage inset applied to every edge of the frame before
    /// decoding, cropping away viewfinder borders.
    pub scan_area_inset_pct: u8,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            readers: vec![BarcodeReader::Code39],
            locate: true,
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            scan_area_inset_pct: 10,
        }
    }
}

// =============================================================================
// Decode Sender
// =============================================================================

/// Generation-tagged emission channel handed to the engine on start.
///
/// Cloneable so the engine can fan it out across its workers. The channel
/// is unbounded: engine callbacks must never block on delivery.
#[derive(Debug, Clone)]
pub struct DecodeSender {
    generation: u64,
    tx: mpsc::UnboundedSender<(u64, ScanEvent)>,
}

impl DecodeSender {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<(u64, ScanEvent)>) -> Self {
        DecodeSender { generation, tx }
    }

    /// The session generation this sender was registered under.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Delivers a decoded code to the session.
    ///
    /// Deliveries after the session moved on are not an error; they are
    /// filtered on the receiving side by generation and state.
    pub fn emit(&self, code: impl Into<String>) {
        let event = ScanEvent::new(code);
        if self.tx.send((self.generation, event)).is_err() {
            debug!("Decode delivery dropped, session task gone");
        }
    }
}

// =============================================================================
// Decode Engine Trait
// =============================================================================

/// The opaque frame-decoding collaborator.
///
/// ## Contract
/// - `start` returns once the engine is ready and decoding; failures to
///   attach or spin up workers are reported as [`DecodeError`].
/// - `stop` requests cessation. It must be safe to call in any order with
///   `start` and repeatedly; callbacks already in flight may still fire
///   after it returns.
#[async_trait]
pub trait DecodeEngine: Send + Sync {
    /// Attaches to the camera stream and begins decoding frames,
    /// delivering codes through `output`.
    async fn start(
        &self,
        camera: &CameraHandle,
        config: &DecoderConfig,
        output: DecodeSender,
    ) -> Result<(), DecodeError>;

    /// Requests that decoding cease.
    async fn stop(&self);
}

// =============================================================================
// Unit Tests
// =============================================================================
