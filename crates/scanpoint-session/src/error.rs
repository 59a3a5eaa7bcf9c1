//! # Session Error Types
//!
//! Errors raised while acquiring the camera or initializing the decode
//! engine. These are the *fatal* failures of the taxonomy: they transition
//! the session to its `Error` state and require an explicit restart, unlike
//! the non-fatal [`scanpoint_core::ScanError`] surfaced by the dispatcher.

use thiserror::Error;

// =============================================================================
// Camera Error
// =============================================================================

/// Failure to acquire the camera stream.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CameraError {
    /// The operator has not granted camera access.
    ///
    /// Terminal for the session: no automatic retry, the operator must
    /// grant permission and restart scanning.
    #[error("Camera access denied. Allow camera permissions and restart the scanner.")]
    PermissionDenied,

    /// The device exists but could not deliver a stream (typically busy in
    /// another application). Retried exactly once after a full release and
    /// a fixed delay; a second consecutive failure is surfaced instead of
    /// retrying further.
    #[error("Camera unavailable: {0}")]
    DeviceUnavailable(String),
}

// =============================================================================
// Decode Error
// =============================================================================

/// Failure reported by the decode engine while starting up.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The engine could not attach to the stream or spin up its workers.
    #[error("Decode engine failed to start: {0}")]
    StartFailed(String),
}

// =============================================================================
// Session Error
// =============================================================================

/// Any failure that moves the session to `SessionState::Error`, plus
/// handle-side channel faults.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Camera acquisition failed (after the retry policy ran its course).
    #[error(transparent)]
    Camera(#[from] CameraError),

    /// The decode engine refused to start.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The session task is gone; commands can no longer be delivered.
    #[error("Session task is no longer running")]
    ChannelClosed,
}

/// Convenience type alias for Results with SessionError.
pub type SessionResult<T> = Result<T, SessionError>;

// =============================================================================
// Unit Tests
// =============================================================================
