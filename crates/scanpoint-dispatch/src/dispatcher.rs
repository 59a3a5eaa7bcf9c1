//! # Scan Dispatcher
//!
//! Consumes decoded codes, deduplicates, and drives the two-step lookup
//! with single-flight semantics.
//!
//! ## Suppression Rules (evaluated in order)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Dispatch Decision Table                            │
//! │                                                                         │
//! │  Rule 1   lookup InFlight        ──► drop (not queued)                  │
//! │  Rule 2   empty after trimming   ──► InvalidCode to sink, no lookup     │
//! │  Rule 3   same code, window open ──► drop                               │
//! │  else     InFlight + dedup slot taken, lookup issued                    │
//! │                                                                         │
//! │  Offline probe runs after the slots are taken but BEFORE any network   │
//! │  call; a probe failure rolls the dedup entry back so the operator can  │
//! │  rescan the same tag once connectivity returns.                        │
//! │                                                                         │
//! │  SINGLE FLIGHT                                                          │
//! │  ─────────────                                                          │
//! │  LookupState is reset by a Drop guard, so no settle path — success,    │
//! │  fault, stale discard, even a panicking sink — can wedge the           │
//! │  dispatcher in InFlight.                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Thread Safety
//! Dispatch state lives behind a std `Mutex` held only for short rule
//! evaluation, never across an await or a sink callback.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use scanpoint_core::validation::normalize_asset_tag;
use scanpoint_core::{
    DedupWindow, LookupState, ScanError, ScanErrorKind, ScanEvent, DEDUP_CLEAR_GRACE_MS,
};
use scanpoint_session::SessionHandle;

use crate::client::{AssignmentDetail, ConnectivityProbe, InventoryClient, LookupFault};
use crate::sink::ScanSink;

// =============================================================================
// Session Control
// =============================================================================

/// The narrow slice of the session the dispatcher is allowed to drive:
/// observe identity for the stale-response guard, and request the one-shot
/// stop once a scan resolves.
#[async_trait]
pub trait SessionControl: Send + Sync {
    /// Current session generation (bumped on every restart).
    fn generation(&self) -> u64;

    /// Whether the session task has exited.
    fn is_closed(&self) -> bool;

    /// Requests a stop. Idempotent; failures are not the dispatcher's
    /// problem.
    async fn request_stop(&self);
}

#[async_trait]
impl SessionControl for SessionHandle {
    fn generation(&self) -> u64 {
        SessionHandle::generation(self)
    }

    fn is_closed(&self) -> bool {
        SessionHandle::is_closed(self)
    }

    async fn request_stop(&self) {
        if let Err(err) = self.stop().await {
            debug!(%err, "Session already gone during stop request");
        }
    }
}

// =============================================================================
// Dispatch Outcome
// =============================================================================

/// Why an event was dropped without side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// A lookup was already in flight.
    LookupInFlight,
    /// The code matched the open dedup window.
    DuplicateCode,
}

/// What `dispatch` did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Dropped by a suppression rule; deliberate no-op.
    Suppressed(SuppressReason),
    /// Rejected before any lookup was issued; the sink was told why.
    Rejected(ScanErrorKind),
    /// Lookup ran; the assignment detail was handed to the edit surface.
    Resolved,
    /// Lookup ran and failed; the failure was surfaced.
    Failed(ScanErrorKind),
    /// Lookup ran, but the session had restarted or closed by the time it
    /// settled; the result was discarded.
    Stale,
}

// =============================================================================
// Dispatch State
// =============================================================================

struct DispatchState {
    lookup: LookupState,
    dedup: DedupWindow,
    /// Pending post-close dedup clear; aborted by any newer accept or a
    /// fresh close.
    clear_task: Option<JoinHandle<()>>,
}

impl DispatchState {
    fn new() -> Self {
        DispatchState {
            lookup: LookupState::Idle,
            dedup: DedupWindow::new(),
            clear_task: None,
        }
    }
}

/// Resets LookupState when the lookup settles, no matter how.
struct InFlightGuard {
    state: Arc<Mutex<DispatchState>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        // Recover the lock even if a sink callback panicked with it held.
        let mut state = self.state.lock().unwrap_or_else(|poison| poison.into_inner());
        state.lookup = LookupState::Idle;
    }
}

/// Gate decision taken under the state lock.
enum Gate {
    Busy,
    Invalid(ScanError),
    Duplicate,
    Proceed(String, InFlightGuard),
}

// =============================================================================
// Scan Dispatcher
// =============================================================================

/// The scan-dispatch pipeline.
///
/// ## Usage
/// ```rust,ignore
/// let dispatcher = ScanDispatcher::new(client, probe, sink, Arc::new(session.clone()));
/// let pump = dispatcher.attach(scan_events);
///
/// // Later, when the operator closes the edit modal:
/// dispatcher.resolution_closed(true);
/// ```
#[derive(Clone)]
pub struct ScanDispatcher {
    client: Arc<dyn InventoryClient>,
    probe: Arc<dyn ConnectivityProbe>,
    sink: Arc<dyn ScanSink>,
    session: Arc<dyn SessionControl>,
    state: Arc<Mutex<DispatchState>>,
}

impl ScanDispatcher {
    /// Creates a dispatcher over its four collaborators.
    pub fn new(
        client: Arc<dyn InventoryClient>,
        probe: Arc<dyn ConnectivityProbe>,
        sink: Arc<dyn ScanSink>,
        session: Arc<dyn SessionControl>,
    ) -> Self {
        ScanDispatcher {
            client,
            probe,
            sink,
            session,
            state: Arc::new(Mutex::new(DispatchState::new())),
        }
    }

    /// Consumes a session's scan events until the channel closes.
    ///
    /// Each event dispatches on its own task so codes arriving mid-lookup
    /// are evaluated (and dropped by rule 1) instead of queueing behind
    /// the in-flight lookup.
    pub fn attach(&self, mut scans: mpsc::Receiver<ScanEvent>) -> JoinHandle<()> {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            while let Some(event) = scans.recv().await {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    dispatcher.dispatch(event).await;
                });
            }
            debug!("Scan event channel closed, dispatcher detached");
        })
    }

    /// Handles one decoded code.
    pub async fn dispatch(&self, event: ScanEvent) -> DispatchOutcome {
        // Rules 1-3 under one short lock, released before any sink
        // callback or network call.
        let gate = {
            let mut state = self.state.lock().unwrap_or_else(|poison| poison.into_inner());

            if state.lookup.is_in_flight() {
                Gate::Busy
            } else {
                match normalize_asset_tag(&event.code) {
                    Err(err) => Gate::Invalid(err.into()),
                    Ok(tag) => {
                        if state.dedup.suppresses(&tag, Utc::now()) {
                            Gate::Duplicate
                        } else {
                            state.lookup = LookupState::InFlight;
                            state.dedup.accept(&tag);
                            if let Some(task) = state.clear_task.take() {
                                task.abort();
                            }
                            Gate::Proceed(
                                tag,
                                InFlightGuard {
                                    state: Arc::clone(&self.state),
                                },
                            )
                        }
                    }
                }
            }
        };

        let (tag, _guard) = match gate {
            Gate::Busy => {
                debug!(code = %event.code, "Lookup in flight, dropping scan");
                return DispatchOutcome::Suppressed(SuppressReason::LookupInFlight);
            }
            Gate::Invalid(scan_error) => {
                debug!(code = %event.code, "Unusable scan payload");
                self.sink.report_error(&scan_error);
                return DispatchOutcome::Rejected(ScanErrorKind::InvalidCode);
            }
            Gate::Duplicate => {
                debug!(code = %event.code, "Duplicate of the accepted code, dropping");
                return DispatchOutcome::Suppressed(SuppressReason::DuplicateCode);
            }
            Gate::Proceed(tag, guard) => (tag, guard),
        };

        // Connectivity gate: checked before any network call. The dedup
        // entry is rolled back so the same tag dispatches again once the
        // network returns.
        if !self.probe.is_online() {
            warn!(tag = %tag, "Network offline, lookup skipped");
            self.state
                .lock()
                .unwrap_or_else(|poison| poison.into_inner())
                .dedup
                .retract(&tag);
            let scan_error = ScanError::network_unavailable();
            self.sink.report_error(&scan_error);
            return DispatchOutcome::Rejected(ScanErrorKind::NetworkUnavailable);
        }

        // Stale-response guard: capture the session identity before the
        // suspension points.
        let generation = self.session.generation();

        let result = self.run_lookup(&tag).await;

        if self.session.is_closed() || self.session.generation() != generation {
            debug!(tag = %tag, "Session moved on, discarding lookup result");
            return DispatchOutcome::Stale;
        }

        match result {
            Ok(detail) => {
                info!(tag = %tag, assignment_id = detail.assignment_id(), "Scan resolved");
                self.sink.present_assignment(detail);
                // One-shot scan: the camera stays off while the operator
                // edits. The session has usually stopped itself already;
                // this is the idempotent backstop.
                self.session.request_stop().await;
                DispatchOutcome::Resolved
            }
            Err(LookupFault::NotFound { status }) => {
                warn!(tag = %tag, status, "Asset tag not registered");
                let scan_error = ScanError::not_found(&tag);
                self.sink.report_error(&scan_error);
                self.sink.offer_creation(&tag);
                DispatchOutcome::Failed(ScanErrorKind::NotFound)
            }
            Err(fault) => {
                error!(tag = %tag, %fault, "Lookup failed");
                let scan_error =
                    ScanError::unexpected("An unexpected error occurred. Try again.");
                self.sink.report_error(&scan_error);
                DispatchOutcome::Failed(ScanErrorKind::Unexpected)
            }
        }
    }

    /// The two sequential collaborator calls.
    async fn run_lookup(&self, tag: &str) -> Result<AssignmentDetail, LookupFault> {
        let assignment_id = self.client.resolve_asset_tag(tag).await?;
        debug!(tag = %tag, assignment_id, "Asset tag resolved");
        self.client.fetch_assignment(assignment_id).await
    }

    /// The consuming UI closed. Schedules the dedup window to clear after
    /// the grace period; `updated` marks a close following a successful
    /// record update.
    ///
    /// Must be called from a tokio runtime context (it spawns the clear
    /// timer).
    pub fn resolution_closed(&self, updated: bool) {
        if updated {
            self.sink.update_succeeded();
        }

        let mut state = self.state.lock().unwrap_or_else(|poison| poison.into_inner());
        if state.dedup.last_accepted_code().is_none() {
            return;
        }

        let deadline = Utc::now() + chrono::Duration::milliseconds(DEDUP_CLEAR_GRACE_MS as i64);
        state.dedup.schedule_clear(deadline);

        if let Some(task) = state.clear_task.take() {
            task.abort();
        }

        let shared = Arc::clone(&self.state);
        state.clear_task = Some(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(DEDUP_CLEAR_GRACE_MS)).await;
            let mut state = shared.lock().unwrap_or_else(|poison| poison.into_inner());
            state.dedup.clear();
            state.clear_task = None;
            debug!("Dedup window cleared");
        }));
    }

    /// Current pipeline state.
    pub fn lookup_state(&self) -> LookupState {
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .lookup
    }

    /// The code currently held by the dedup window, if any.
    pub fn last_accepted_code(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .dedup
            .last_accepted_code()
            .map(str::to_string)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

    use crate::client::AssignmentId;

    // -------------------------------------------------------------------------
    // Fakes
    // -------------------------------------------------------------------------

    fn detail(id: AssignmentId) -> AssignmentDetail {
        AssignmentDetail::new(id, serde_json::json!({ "assignment_id": id }))
    }

    /// Scripted lookup collaborator. An exhausted script resolves to
    /// assignment 42 so happy-path tests need no scripting.
    struct ScriptedClient {
        resolve: Mutex<VecDeque<Result<AssignmentId, LookupFault>>>,
        fetch: Mutex<VecDeque<Result<AssignmentDetail, LookupFault>>>,
        resolve_calls: AtomicUsize,
        fetch_calls: AtomicUsize,
        delay: Duration,
    }

    impl ScriptedClient {
        fn new() -> Self {
            ScriptedClient::with_delay(Duration::ZERO)
        }

        fn with_delay(delay: Duration) -> Self {
            ScriptedClient {
                resolve: Mutex::new(VecDeque::new()),
                fetch: Mutex::new(VecDeque::new()),
                resolve_calls: AtomicUsize::new(0),
                fetch_calls: AtomicUsize::new(0),
                delay,
            }
        }

        fn push_resolve(&self, result: Result<AssignmentId, LookupFault>) {
            self.resolve.lock().unwrap().push_back(result);
        }

        fn push_fetch(&self, result: Result<AssignmentDetail, LookupFault>) {
            self.fetch.lock().unwrap().push_back(result);
        }

        fn resolve_calls(&self) -> usize {
            self.resolve_calls.load(Ordering::SeqCst)
        }

        fn fetch_calls(&self) -> usize {
            self.fetch_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl InventoryClient for ScriptedClient {
        async fn resolve_asset_tag(&self, _asset_tag: &str) -> Result<AssignmentId, LookupFault> {
            self.resolve_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.resolve.lock().unwrap().pop_front().unwrap_or(Ok(42))
        }

        async fn fetch_assignment(
            &self,
            assignment_id: AssignmentId,
        ) -> Result<AssignmentDetail, LookupFault> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            self.fetch
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(detail(assignment_id)))
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum SinkCall {
        Presented(AssignmentId),
        Creation(String),
        Error(ScanErrorKind),
        Updated,
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<SinkCall>>,
    }

    impl RecordingSink {
        fn calls(&self) -> Vec<SinkCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ScanSink for RecordingSink {
        fn present_assignment(&self, detail: AssignmentDetail) {
            self.calls
                .lock()
                .unwrap()
                .push(SinkCall::Presented(detail.assignment_id()));
        }

        fn offer_creation(&self, asset_tag: &str) {
            self.calls
                .lock()
                .unwrap()
                .push(SinkCall::Creation(asset_tag.to_string()));
        }

        fn report_error(&self, error: &ScanError) {
            self.calls.lock().unwrap().push(SinkCall::Error(error.kind));
        }

        fn update_succeeded(&self) {
            self.calls.lock().unwrap().push(SinkCall::Updated);
        }
    }

    struct FakeSession {
        generation: AtomicU64,
        closed: AtomicBool,
        stops: AtomicUsize,
    }

    impl FakeSession {
        fn new() -> Self {
            FakeSession {
                generation: AtomicU64::new(1),
                closed: AtomicBool::new(false),
                stops: AtomicUsize::new(0),
            }
        }

        fn restart(&self) {
            self.generation.fetch_add(1, Ordering::SeqCst);
        }

        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }

        fn stop_requests(&self) -> usize {
            self.stops.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SessionControl for FakeSession {
        fn generation(&self) -> u64 {
            self.generation.load(Ordering::SeqCst)
        }

        fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }

        async fn request_stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct TogglingProbe {
        online: AtomicBool,
    }

    impl TogglingProbe {
        fn new(online: bool) -> Self {
            TogglingProbe {
                online: AtomicBool::new(online),
            }
        }

        fn set_online(&self, online: bool) {
            self.online.store(online, Ordering::SeqCst);
        }
    }

    impl ConnectivityProbe for TogglingProbe {
        fn is_online(&self) -> bool {
            self.online.load(Ordering::SeqCst)
        }
    }

    struct Harness {
        dispatcher: ScanDispatcher,
        client: Arc<ScriptedClient>,
        sink: Arc<RecordingSink>,
        session: Arc<FakeSession>,
        probe: Arc<TogglingProbe>,
    }

    fn harness() -> Harness {
        harness_with_client(ScriptedClient::new())
    }

    fn harness_with_client(client: ScriptedClient) -> Harness {
        let client = Arc::new(client);
        let sink = Arc::new(RecordingSink::default());
        let session = Arc::new(FakeSession::new());
        let probe = Arc::new(TogglingProbe::new(true));
        let dispatcher = ScanDispatcher::new(
            client.clone(),
            probe.clone(),
            sink.clone(),
            session.clone(),
        );
        Harness {
            dispatcher,
            client,
            sink,
            session,
            probe,
        }
    }

    // -------------------------------------------------------------------------
    // Scenarios
    // -------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_valid_scan_resolves_and_presents_assignment() {
        let h = harness();

        let outcome = h.dispatcher.dispatch(ScanEvent::new("024758")).await;

        assert_eq!(outcome, DispatchOutcome::Resolved);
        assert_eq!(h.client.resolve_calls(), 1);
        assert_eq!(h.client.fetch_calls(), 1);
        assert_eq!(h.sink.calls(), vec![SinkCall::Presented(42)]);
        assert_eq!(h.session.stop_requests(), 1);
        assert_eq!(h.dispatcher.lookup_state(), LookupState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_code_rejected_without_lookup() {
        let h = harness();

        let outcome = h.dispatcher.dispatch(ScanEvent::new("")).await;
        assert_eq!(outcome, DispatchOutcome::Rejected(ScanErrorKind::InvalidCode));

        let outcome = h.dispatcher.dispatch(ScanEvent::new("   \t")).await;
        assert_eq!(outcome, DispatchOutcome::Rejected(ScanErrorKind::InvalidCode));

        assert_eq!(h.client.resolve_calls(), 0);
        assert_eq!(
            h.sink.calls(),
            vec![
                SinkCall::Error(ScanErrorKind::InvalidCode),
                SinkCall::Error(ScanErrorKind::InvalidCode)
            ]
        );
        assert_eq!(h.dispatcher.lookup_state(), LookupState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_tag_offers_creation_path() {
        let h = harness();
        h.client
            .push_resolve(Err(LookupFault::NotFound { status: 404 }));

        let outcome = h.dispatcher.dispatch(ScanEvent::new("UNKNOWN99")).await;

        assert_eq!(outcome, DispatchOutcome::Failed(ScanErrorKind::NotFound));
        assert_eq!(h.client.fetch_calls(), 0);
        assert_eq!(
            h.sink.calls(),
            vec![
                SinkCall::Error(ScanErrorKind::NotFound),
                SinkCall::Creation("UNKNOWN99".to_string())
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_server_fault_conflated_into_not_found() {
        let h = harness();
        h.client
            .push_resolve(Err(LookupFault::NotFound { status: 500 }));

        let outcome = h.dispatcher.dispatch(ScanEvent::new("024758")).await;

        assert_eq!(outcome, DispatchOutcome::Failed(ScanErrorKind::NotFound));
        assert!(h
            .sink
            .calls()
            .contains(&SinkCall::Creation("024758".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unexpected_status_does_not_offer_creation() {
        let h = harness();
        h.client.push_resolve(Err(LookupFault::Status { status: 403 }));

        let outcome = h.dispatcher.dispatch(ScanEvent::new("024758")).await;

        assert_eq!(outcome, DispatchOutcome::Failed(ScanErrorKind::Unexpected));
        assert_eq!(
            h.sink.calls(),
            vec![SinkCall::Error(ScanErrorKind::Unexpected)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_assignment_is_unexpected() {
        let h = harness();
        h.client.push_resolve(Err(LookupFault::MissingAssignment));

        let outcome = h.dispatcher.dispatch(ScanEvent::new("024758")).await;
        assert_eq!(outcome, DispatchOutcome::Failed(ScanErrorKind::Unexpected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_detail_fetch_failure_is_unexpected() {
        let h = harness();
        h.client.push_fetch(Err(LookupFault::Status { status: 500 }));

        let outcome = h.dispatcher.dispatch(ScanEvent::new("024758")).await;

        assert_eq!(outcome, DispatchOutcome::Failed(ScanErrorKind::Unexpected));
        assert_eq!(h.client.resolve_calls(), 1);
        assert_eq!(h.client.fetch_calls(), 1);
        assert_eq!(h.dispatcher.lookup_state(), LookupState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_scan_dropped_while_lookup_in_flight() {
        let h = harness_with_client(ScriptedClient::with_delay(Duration::from_millis(100)));

        let first = {
            let dispatcher = h.dispatcher.clone();
            tokio::spawn(async move { dispatcher.dispatch(ScanEvent::new("AAA111")).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        // A different, perfectly valid code arrives mid-lookup: dropped,
        // not queued.
        let second = h.dispatcher.dispatch(ScanEvent::new("BBB222")).await;
        assert_eq!(
            second,
            DispatchOutcome::Suppressed(SuppressReason::LookupInFlight)
        );

        assert_eq!(first.await.unwrap(), DispatchOutcome::Resolved);
        assert_eq!(h.client.resolve_calls(), 1);
        assert_eq!(h.sink.calls(), vec![SinkCall::Presented(42)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_code_suppressed_until_window_clears() {
        let h = harness();

        assert_eq!(
            h.dispatcher.dispatch(ScanEvent::new("024758")).await,
            DispatchOutcome::Resolved
        );
        assert_eq!(
            h.dispatcher.dispatch(ScanEvent::new("024758")).await,
            DispatchOutcome::Suppressed(SuppressReason::DuplicateCode)
        );
        assert_eq!(h.client.resolve_calls(), 1);

        // Operator closes the edit surface; the window clears after the
        // grace period.
        h.dispatcher.resolution_closed(false);
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(
            h.dispatcher.dispatch(ScanEvent::new("024758")).await,
            DispatchOutcome::Resolved
        );
        assert_eq!(h.client.resolve_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_code_dispatches_through_open_window() {
        let h = harness();

        h.dispatcher.dispatch(ScanEvent::new("024758")).await;
        let outcome = h.dispatcher.dispatch(ScanEvent::new("031999")).await;

        assert_eq!(outcome, DispatchOutcome::Resolved);
        assert_eq!(h.client.resolve_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_scan_cancels_pending_window_clear() {
        let h = harness();

        h.dispatcher.dispatch(ScanEvent::new("024758")).await;
        h.dispatcher.resolution_closed(false);

        // A different code before the clear fires takes over the window.
        h.dispatcher.dispatch(ScanEvent::new("031999")).await;
        tokio::time::sleep(Duration::from_millis(600)).await;

        // The stale clear did not wipe the newly accepted code.
        assert_eq!(
            h.dispatcher.last_accepted_code(),
            Some("031999".to_string())
        );
        assert_eq!(
            h.dispatcher.dispatch(ScanEvent::new("031999")).await,
            DispatchOutcome::Suppressed(SuppressReason::DuplicateCode)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_scan_skips_lookup_and_stays_retryable() {
        let h = harness();
        h.probe.set_online(false);

        let outcome = h.dispatcher.dispatch(ScanEvent::new("024758")).await;
        assert_eq!(
            outcome,
            DispatchOutcome::Rejected(ScanErrorKind::NetworkUnavailable)
        );
        assert_eq!(h.client.resolve_calls(), 0);
        assert_eq!(h.dispatcher.lookup_state(), LookupState::Idle);

        // Back online: the same tag dispatches, the dedup slot was rolled
        // back.
        h.probe.set_online(true);
        let outcome = h.dispatcher.dispatch(ScanEvent::new("024758")).await;
        assert_eq!(outcome, DispatchOutcome::Resolved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_discarded_when_session_restarts_mid_lookup() {
        let h = harness_with_client(ScriptedClient::with_delay(Duration::from_millis(100)));

        let inflight = {
            let dispatcher = h.dispatcher.clone();
            tokio::spawn(async move { dispatcher.dispatch(ScanEvent::new("024758")).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.session.restart();

        assert_eq!(inflight.await.unwrap(), DispatchOutcome::Stale);
        assert!(h.sink.calls().is_empty());
        assert_eq!(h.session.stop_requests(), 0);
        assert_eq!(h.dispatcher.lookup_state(), LookupState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_discarded_when_session_closes_mid_lookup() {
        let h = harness_with_client(ScriptedClient::with_delay(Duration::from_millis(100)));

        let inflight = {
            let dispatcher = h.dispatcher.clone();
            tokio::spawn(async move { dispatcher.dispatch(ScanEvent::new("024758")).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.session.close();

        assert_eq!(inflight.await.unwrap(), DispatchOutcome::Stale);
        assert!(h.sink.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_state_never_sticks_in_flight() {
        let h = harness();
        h.client.push_resolve(Err(LookupFault::Transport("reset".into())));
        h.client.push_resolve(Err(LookupFault::NotFound { status: 404 }));

        h.dispatcher.dispatch(ScanEvent::new("AAA111")).await;
        assert_eq!(h.dispatcher.lookup_state(), LookupState::Idle);

        h.dispatcher.dispatch(ScanEvent::new("BBB222")).await;
        assert_eq!(h.dispatcher.lookup_state(), LookupState::Idle);

        h.dispatcher.dispatch(ScanEvent::new("CCC333")).await;
        assert_eq!(h.dispatcher.lookup_state(), LookupState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_success_reaches_sink() {
        let h = harness();

        h.dispatcher.dispatch(ScanEvent::new("024758")).await;
        h.dispatcher.resolution_closed(true);

        assert!(h.sink.calls().contains(&SinkCall::Updated));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_pumps_session_events() {
        let h = harness();
        let (scan_tx, scan_rx) = mpsc::channel(16);

        let pump = h.dispatcher.attach(scan_rx);
        scan_tx.send(ScanEvent::new("024758")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(h.sink.calls(), vec![SinkCall::Presented(42)]);

        drop(scan_tx);
        pump.await.unwrap();
    }
}
