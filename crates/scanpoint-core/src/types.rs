//! # Domain Types
//!
//! Core state and event types shared by the session and dispatch crates.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Scanning Session States                             │
//! │                                                                         │
//! │  ┌──────┐   start    ┌──────────────┐   camera + engine ready          │
//! │  │ Idle │ ─────────► │ Initializing │ ──────────────────┐              │
//! │  └──────┘            └──────┬───────┘                   ▼              │
//! │                             │ permission denied /  ┌────────┐          │
//! │                             │ init failure         │ Active │          │
//! │                             ▼                      └───┬────┘          │
//! │                        ┌───────┐                       │               │
//! │                        │ Error │    stop / accepted    │               │
//! │                        └───────┘    scan / hidden /    │               │
//! │                             ▲       teardown           ▼               │
//! │                             │                     ┌─────────┐          │
//! │                             └──── restart ◄────── │ Stopped │          │
//! │                                   (explicit)      └─────────┘          │
//! │                                                                         │
//! │  INVARIANT: entering Stopped or Error releases the camera within       │
//! │  the same transition, never on a later tick.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Session State
// =============================================================================

/// State of a scanning session.
///
/// Exactly one instance exists per running session; it is owned by the
/// session task and observable through a `watch` channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created but never started.
    Idle,
    /// Acquiring the camera and starting the decode engine.
    Initializing,
    /// Camera live, decode engine delivering frames.
    Active,
    /// Camera released; restartable by explicit request.
    Stopped,
    /// Fatal initialization failure; requires an explicit restart.
    Error,
}

impl SessionState {
    /// Returns true for states in which no camera hardware may be held.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Stopped | SessionState::Error)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Initializing => write!(f, "initializing"),
            SessionState::Active => write!(f, "active"),
            SessionState::Stopped => write!(f, "stopped"),
            SessionState::Error => write!(f, "error"),
        }
    }
}

// =============================================================================
// Lookup State
// =============================================================================

/// State of the dispatcher's lookup pipeline.
///
/// ## Invariant
/// At most one lookup is in flight at any time. A scan event arriving while
/// `InFlight` is dropped, not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupState {
    /// No lookup running; the next valid scan dispatches.
    Idle,
    /// A resolve/detail pair is currently awaiting the backend.
    InFlight,
}

impl LookupState {
    #[inline]
    pub fn is_in_flight(&self) -> bool {
        matches!(self, LookupState::InFlight)
    }
}

impl std::fmt::Display for LookupState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupState::Idle => write!(f, "idle"),
            LookupState::InFlight => write!(f, "in_flight"),
        }
    }
}

// =============================================================================
// Page Visibility
// =============================================================================

/// Visibility of the page/tab hosting the scanner.
///
/// A transition to `Hidden` forces the session to `Stopped`; there is no
/// automatic resume when visibility returns, the operator must restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

impl Visibility {
    #[inline]
    pub fn is_hidden(&self) -> bool {
        matches!(self, Visibility::Hidden)
    }
}

// =============================================================================
// Scan Event
// =============================================================================

/// A decoded barcode, as delivered by the decode engine.
///
/// Transient: produced by the engine, consumed immediately by the
/// dispatcher, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    /// Raw decoded payload. May contain decode noise; the dispatcher
    /// normalizes it before acting.
    pub code: String,

    /// When the engine reported the decode.
    pub timestamp: DateTime<Utc>,
}

impl ScanEvent {
    /// Creates an event stamped with the current time.
    pub fn new(code: impl Into<String>) -> Self {
        ScanEvent {
            code: code.into(),
            timestamp: Utc::now(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_display() {
        assert_eq!(SessionState::Initializing.to_string(), "initializing");
        assert_eq!(SessionState::Stopped.to_string(), "stopped");
    }

    #[test]
    fn test_terminal_states() {
        assert!(SessionState::Stopped.is_terminal());
        assert!(SessionState::Error.is_terminal());
        assert!(!SessionState::Idle.is_terminal());
        assert!(!SessionState::Initializing.is_terminal());
        assert!(!SessionState::Active.is_terminal());
    }

    #[test]
    fn test_lookup_state() {
        assert!(LookupState::InFlight.is_in_flight());
        assert!(!LookupState::Idle.is_in_flight());
        assert_eq!(LookupState::InFlight.to_string(), "in_flight");
    }

    #[test]
    fn test_scan_event_carries_code() {
        let event = ScanEvent::new("024758");
        assert_eq!(event.code, "024758");
    }
}
