//! # Validation Module
//!
//! Normalization rules for scanned asset tags.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Decode engine (external)                                     │
//! │  └── Symbology checksums; still emits noise on bad frames              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (dispatcher, before any state change)            │
//! │  ├── Trim surrounding whitespace                                       │
//! │  ├── Reject empty payloads                                             │
//! │  └── Reject oversized / non-printable payloads                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Backend (external)                                           │
//! │  └── Authoritative: does this tag exist at all?                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::MAX_ASSET_TAG_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Normalizes a scanned asset tag.
///
/// ## Rules
/// - Surrounding whitespace is trimmed
/// - Must not be empty after trimming
/// - Must be at most [`MAX_ASSET_TAG_LEN`] characters
/// - Must not contain control characters
///
/// ## Returns
/// The trimmed tag, ready for percent-encoding into a lookup path.
///
/// ## Example
/// ```rust
/// use scanpoint_core::validation::normalize_asset_tag;
///
/// assert_eq!(normalize_asset_tag("  024758 ").unwrap(), "024758");
/// assert!(normalize_asset_tag("   ").is_err());
/// ```
pub fn normalize_asset_tag(raw: &str) -> ValidationResult<String> {
    let tag = raw.trim();

    if tag.is_empty() {
        return Err(ValidationError::Required {
            field: "asset_tag".to_string(),
        });
    }

    if tag.chars().count() > MAX_ASSET_TAG_LEN {
        return Err(ValidationError::TooLong {
            field: "asset_tag".to_string(),
            max: MAX_ASSET_TAG_LEN,
        });
    }

    if tag.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidFormat {
            field: "asset_tag".to_string(),
            reason: "must not contain control characters".to_string(),
        });
    }

    Ok(tag.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================
