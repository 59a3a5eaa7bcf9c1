//! # Error Types
//!
//! The scan error taxonomy surfaced to the operator, plus input validation
//! errors.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  scanpoint-core errors (this file)                                     │
//! │  ├── ScanError        - What the operator sees (kind + message)        │
//! │  └── ValidationError  - Asset tag normalization failures               │
//! │                                                                         │
//! │  scanpoint-session errors (separate crate)                             │
//! │  ├── CameraError      - PermissionDenied / DeviceUnavailable           │
//! │  └── SessionError     - Initialization failures                        │
//! │                                                                         │
//! │  scanpoint-dispatch errors (separate crate)                            │
//! │  ├── LookupFault      - Collaborator faults (HTTP statuses)            │
//! │  └── ConfigError      - Missing/invalid backend URL                    │
//! │                                                                         │
//! │  Flow: LookupFault ──► ScanError ──► UI sink ──► operator              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fatality
//! Every `ScanError` is non-fatal: the operator gets a retry affordance and
//! the session is never crashed by one. Fatal conditions (camera permission
//! denied, device unavailable after retry) live in the session crate and
//! transition the session to its `Error` state instead.

use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Scan Error Kind
// =============================================================================

/// Classification of a failed or rejected scan.
///
/// ## Usage in Consuming UIs
/// The kind selects the surface: `NotFound` opens the create-asset path
/// with the scanned tag pre-filled, everything else is a retryable notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanErrorKind {
    /// Connectivity is down; no lookup was attempted.
    NetworkUnavailable,

    /// The decoded payload was empty or unusable; no lookup was attempted.
    InvalidCode,

    /// The backend does not know this asset tag.
    ///
    /// ## Known Ambiguity
    /// The lookup collaborator answers both "no such record" and "server
    /// fault on resolve" with statuses that land here. This conflation is
    /// the collaborator's documented behavior and is preserved, not fixed.
    NotFound,

    /// Anything else: transport faults, malformed payloads, unexpected
    /// statuses.
    Unexpected,
}

// =============================================================================
// Scan Error
// =============================================================================

/// A scan failure surfaced to the operator.
///
/// ## Serialization
/// This is what a consuming UI receives when a scan fails:
/// ```json
/// {
///   "kind": "NOT_FOUND",
///   "message": "Asset tag 024758 is not registered in the system"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ScanError {
    /// Machine-readable classification for routing.
    pub kind: ScanErrorKind,

    /// Human-readable message for display.
    pub message: String,
}

impl ScanError {
    /// Creates a new scan error.
    pub fn new(kind: ScanErrorKind, message: impl Into<String>) -> Self {
        ScanError {
            kind,
            message: message.into(),
        }
    }

    /// Connectivity was unavailable before any network call was made.
    pub fn network_unavailable() -> Self {
        ScanError::new(
            ScanErrorKind::NetworkUnavailable,
            "No network connection. Check your connection and try again.",
        )
    }

    /// The decoded payload was empty or unreadable.
    pub fn invalid_code() -> Self {
        ScanError::new(
            ScanErrorKind::InvalidCode,
            "The barcode could not be read properly. Try scanning again.",
        )
    }

    /// The resolve step reported the tag as unknown (or faulted).
    pub fn not_found(asset_tag: &str) -> Self {
        ScanError::new(
            ScanErrorKind::NotFound,
            format!(
                "Asset tag {} is not registered in the system or the barcode \
                 could not be matched.",
                asset_tag
            ),
        )
    }

    /// Catch-all for everything the taxonomy does not name.
    pub fn unexpected(message: impl Into<String>) -> Self {
        ScanError::new(ScanErrorKind::Unexpected, message)
    }

    /// Whether this error carries a create-asset affordance.
    #[inline]
    pub fn offers_creation(&self) -> bool {
        self.kind == ScanErrorKind::NotFound
    }
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl std::error::Error for ScanError {}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors for scanned payloads.
///
/// Used by the dispatcher before any state is mutated or any network call
/// is issued.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., control characters in a tag).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

/// Validation failures on a scanned code all surface as `InvalidCode`.
impl From<ValidationError> for ScanError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Required { .. } => ScanError::invalid_code(),
            ValidationError::TooLong { .. } | ValidationError::InvalidFormat { .. } => {
                ScanError::new(ScanErrorKind::InvalidCode, err.to_string())
            }
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with ScanError.
pub type ScanResult<T> = Result<T, ScanError>;

// =============================================================================
// Unit Tests
// =============================================================================
