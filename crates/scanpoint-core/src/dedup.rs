//! # Duplicate-Suppression Window
//!
//! A camera decoding at 15-30 fps reports the same barcode many times while
//! it sits in front of the lens. The dedup window remembers the last
//! accepted code and suppresses repeats until the consuming UI has closed
//! and a short grace period has passed.
//!
//! ## Window Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Dedup Window Lifecycle                             │
//! │                                                                         │
//! │  accept("024758")                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  last_accepted = "024758", locked_until = None   (open-ended window)   │
//! │       │                                                                 │
//! │       │  repeats of "024758" ──► suppressed                             │
//! │       │  a different code    ──► not suppressed                         │
//! │       ▼                                                                 │
//! │  schedule_clear(now + 500ms)      (consuming UI closed)                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  locked_until = Some(t): repeats suppressed only while now < t         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  clear() / deadline passes ──► window empty, everything dispatches     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pure state math: callers inject `now`, the dispatcher owns the actual
//! timer that calls [`DedupWindow::clear`] when the grace period elapses.

use chrono::{DateTime, Utc};

/// The duplicate-suppression window.
///
/// ## Ownership
/// Mutated only by the dispatcher. The session never touches it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupWindow {
    /// The last code a lookup was issued for, if any.
    last_accepted_code: Option<String>,

    /// Deadline after which repeats of the accepted code dispatch again.
    /// `None` while the consuming UI is still open: the window stays locked
    /// indefinitely until a clear is scheduled.
    locked_until: Option<DateTime<Utc>>,
}

impl DedupWindow {
    /// Creates an empty window.
    pub fn new() -> Self {
        DedupWindow::default()
    }

    /// Records an accepted code and locks the window open-ended.
    ///
    /// Any previously scheduled clear deadline is discarded: a fresh accept
    /// restarts the window from scratch.
    pub fn accept(&mut self, code: &str) {
        self.last_accepted_code = Some(code.to_string());
        self.locked_until = None;
    }

    /// Whether `code` should be suppressed as a duplicate at time `now`.
    pub fn suppresses(&self, code: &str, now: DateTime<Utc>) -> bool {
        match &self.last_accepted_code {
            Some(last) if last == code => match self.locked_until {
                // No deadline scheduled: suppress until the UI closes.
                None => true,
                Some(deadline) => now < deadline,
            },
            _ => false,
        }
    }

    /// Schedules the window to stop suppressing at `deadline`.
    ///
    /// Called when the consuming UI closes; the dispatcher pairs this with
    /// a cancellable timer that calls [`DedupWindow::clear`] at the same
    /// deadline so the state does not linger.
    pub fn schedule_clear(&mut self, deadline: DateTime<Utc>) {
        if self.last_accepted_code.is_some() {
            self.locked_until = Some(deadline);
        }
    }

    /// Empties the window immediately.
    pub fn clear(&mut self) {
        self.last_accepted_code = None;
        self.locked_until = None;
    }

    /// Removes `code` from the window if it is the accepted one.
    ///
    /// Used when acceptance has to be rolled back before any lookup was
    /// issued (connectivity probe failed), so the operator can rescan the
    /// same tag once the network returns.
    pub fn retract(&mut self, code: &str) {
        if self.last_accepted_code.as_deref() == Some(code) {
            self.clear();
        }
    }

    /// The currently accepted code, if any.
    pub fn last_accepted_code(&self) -> Option<&str> {
        self.last_accepted_code.as_deref()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
