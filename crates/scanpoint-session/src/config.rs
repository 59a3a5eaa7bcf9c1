//! Scanner configuration: stream constraints, decoder settings, and the
//! session's timing knobs. Defaults match the reader set and tolerances the
//! scanning station ships with.

use std::time::Duration;

use crate::camera::{FacingMode, StreamConstraints};
use crate::decode::{BarcodeReader, DecoderConfig};

/// Configuration for a scanning session.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Resolution and facing constraints for the camera stream.
    pub constraints: StreamConstraints,

    /// Decode engine settings (reader set, locator, worker count).
    pub decoder: DecoderConfig,

    /// Delay between the start request and touching the video target.
    /// Tolerance for layout that has not committed yet; correctness never
    /// depends on its exact value.
    pub attach_delay: Duration,

    /// Fixed delay before the single re-acquisition attempt after a
    /// transient device-busy failure.
    pub camera_retry_delay: Duration,

    /// Probe camera permission with a throwaway stream before the first
    /// start. A denied probe fails the session before the engine spins up.
    pub permission_preflight: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        ScannerConfig {
            constraints: StreamConstraints {
                width: 960,
                height: 540,
                facing: FacingMode::Environment,
            },
            decoder: DecoderConfig::default(),
            attach_delay: Duration::from_millis(1000),
            camera_retry_delay: Duration::from_millis(1000),
            permission_preflight: true,
        }
    }
}
