//! # Visibility Guard
//!
//! Forces the session to Stopped when the hosting page/tab becomes hidden.
//! There is no automatic resume when visibility returns — an unattended
//! device must not silently re-acquire its camera; the operator restarts
//! scanning explicitly.
//!
//! The subscription is scoped to the guard value: dropping the guard tears
//! the listener task down, so no page-wide listener outlives the component
//! that created it.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use scanpoint_core::Visibility;

use crate::session::SessionHandle;

/// Watches page visibility on behalf of one session.
#[derive(Debug)]
pub struct VisibilityGuard {
    task: JoinHandle<()>,
}

impl VisibilityGuard {
    /// Spawns the guard over a visibility feed supplied by the embedding
    /// platform.
    pub fn spawn(mut visibility: watch::Receiver<Visibility>, session: SessionHandle) -> Self {
        let task = tokio::spawn(async move {
            while visibility.changed().await.is_ok() {
                let hidden = visibility.borrow_and_update().is_hidden();
                if !hidden {
                    // Visible transitions are deliberately ignored: no
                    // auto-resume.
                    debug!("Page visible again, awaiting explicit restart");
                    continue;
                }

                info!("Page hidden, stopping scan session");
                if session.stop().await.is_err() {
                    warn!("Session gone while handling visibility change");
                    break;
                }
            }
        });

        VisibilityGuard { task }
    }
}

impl Drop for VisibilityGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
