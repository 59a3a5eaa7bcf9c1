//! # scanpoint-dispatch: The Scan Dispatch Pipeline
//!
//! Consumes the codes a scanning session accepts, suppresses duplicates and
//! overlapping events, and drives the two-step inventory lookup with
//! single-flight semantics. Results route to a consuming-UI sink: resolved
//! assignments open the edit surface, unknown tags offer the creation path,
//! everything else surfaces as a retryable error.
//!
//! ## Dispatch Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Dispatch Decision Flow                            │
//! │                                                                         │
//! │  ScanEvent("024758")                                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. Lookup in flight? ────────────► suppressed (dropped, not queued)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. Empty after trim? ────────────► InvalidCode to sink, no lookup     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. Same code, window open? ──────► suppressed                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  InFlight + dedup recorded                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Offline? ────────────────────────► NetworkUnavailable, dedup rolled   │
//! │       │                              back, no network call              │
//! │       ▼                                                                 │
//! │  GET /api/inventory/lookup/{tag} ──► 404/500 ► NotFound + create path  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  GET /api/inventory/{assignment_id}                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Session still on the same generation? ──► no ► result discarded       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  detail ──► sink.present_assignment ──► session stop (one-shot)        │
//! │                                                                         │
//! │  LookupState: reset to Idle on EVERY settle path (Drop guard).         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod sink;

pub use client::{
    AlwaysOnline, AssignmentDetail, AssignmentId, ConnectivityProbe, HttpInventoryClient,
    InventoryClient, LookupFault,
};
pub use config::{ConfigError, LookupConfig, BACKEND_URL_ENV};
pub use dispatcher::{DispatchOutcome, ScanDispatcher, SessionControl, SuppressReason};
pub use sink::{NoOpSink, ScanSink};
