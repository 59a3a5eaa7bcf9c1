//! # scanpoint-core: Pure Domain Logic for Scanpoint
//!
//! This crate is the shared vocabulary of the Scanpoint scanning station.
//! It contains the session and lookup state enums, the scan event type, the
//! duplicate-suppression window, asset-tag validation, and the user-facing
//! scan error taxonomy — all as pure logic with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Scanpoint Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 scanpoint-session                               │   │
//! │  │   Camera resource ──► Decode engine ──► ScanSession task       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ ScanEvent                              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 scanpoint-dispatch                              │   │
//! │  │   Dedup ──► Single-flight lookup ──► UI sink routing           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ uses                                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ scanpoint-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   dedup   │  │   error   │  │ validation│  │   │
//! │  │   │ states,   │  │  window   │  │ taxonomy  │  │ asset tag │  │   │
//! │  │   │ ScanEvent │  │  math     │  │           │  │ rules     │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO CAMERA • NO NETWORK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Session/lookup states, visibility, scan events
//! - [`dedup`] - Duplicate-suppression window
//! - [`error`] - Scan error taxonomy and validation errors
//! - [`validation`] - Asset-tag normalization rules
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: suppression decisions take `now` as an argument
//! 2. **No I/O**: camera, network, and timer access is FORBIDDEN here
//! 3. **Explicit Errors**: all errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod dedup;
pub mod error;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use scanpoint_core::ScanError` instead of
// `use scanpoint_core::error::ScanError`

pub use dedup::DedupWindow;
pub use error::{ScanError, ScanErrorKind, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum accepted length of a scanned asset tag, in characters.
///
/// Decoders occasionally emit garbage when a frame is misread; a real tag
/// printed on an asset label never approaches this length, so anything
/// longer is rejected as an invalid code before a lookup is attempted.
pub const MAX_ASSET_TAG_LEN: usize = 64;

/// Grace period before the dedup window is cleared once the consuming UI
/// has closed, in milliseconds.
///
/// The scanner keeps suppressing the just-resolved code for this long so a
/// barcode still in front of the lens does not immediately re-trigger the
/// lookup the operator just dismissed.
pub const DEDUP_CLEAR_GRACE_MS: u64 = 500;
