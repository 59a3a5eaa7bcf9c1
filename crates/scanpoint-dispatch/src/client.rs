//! # Inventory Lookup Client
//!
//! The lookup collaborator behind a narrow trait: resolve an asset tag to
//! its assignment identifier, then fetch the assignment detail record. The
//! detail record is opaque to this crate — it is handed to the consuming UI
//! unmodified.
//!
//! ## Collaborator Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  GET {base}/api/inventory/lookup/{assetTag}                             │
//! │      200 ──► { "assignment_id": 42 }                                    │
//! │      404 ──► tag not registered          ┐ conflated by the backend:   │
//! │      500 ──► resolve fault               ┘ both become NotFound         │
//! │      ... ──► unexpected status                                          │
//! │                                                                         │
//! │  GET {base}/api/inventory/{assignment_id}                               │
//! │      200 ──► opaque assignment detail (passed through unmodified)      │
//! │      ... ──► unexpected status                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::LookupConfig;

/// Identifier linking an asset to its current assignment record.
pub type AssignmentId = i64;

// =============================================================================
// Assignment Detail
// =============================================================================

/// The assignment detail record, consumed opaquely.
///
/// The payload shape is the backend's contract with the editing UI; this
/// crate never inspects it beyond JSON validity.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentDetail {
    assignment_id: AssignmentId,
    record: serde_json::Value,
}

impl AssignmentDetail {
    pub fn new(assignment_id: AssignmentId, record: serde_json::Value) -> Self {
        AssignmentDetail {
            assignment_id,
            record,
        }
    }

    pub fn assignment_id(&self) -> AssignmentId {
        self.assignment_id
    }

    pub fn record(&self) -> &serde_json::Value {
        &self.record
    }

    /// Unwraps the raw record for handoff to the editing UI.
    pub fn into_record(self) -> serde_json::Value {
        self.record
    }
}

// =============================================================================
// Lookup Fault
// =============================================================================

/// Failures from the lookup collaborator, pre-classification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupFault {
    /// The resolve step answered with a status the backend uses for
    /// unregistered tags. Both 404 and 500 land here — the collaborator
    /// conflates missing records and resolve faults, and that ambiguity is
    /// preserved rather than guessed away.
    #[error("asset tag not registered (status {status})")]
    NotFound { status: u16 },

    /// Any other non-success HTTP status.
    #[error("lookup failed with status {status}")]
    Status { status: u16 },

    /// The resolve step succeeded but carried no assignment identifier.
    #[error("no assignment found for this asset")]
    MissingAssignment,

    /// The detail step returned an empty record.
    #[error("assignment detail was empty")]
    EmptyDetail,

    /// Connection, timeout, or body decoding failure.
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for LookupFault {
    fn from(err: reqwest::Error) -> Self {
        LookupFault::Transport(err.to_string())
    }
}

/// Classifies a resolve-step status, `None` meaning success.
fn resolve_status_fault(status: StatusCode) -> Option<LookupFault> {
    if status == StatusCode::NOT_FOUND || status == StatusCode::INTERNAL_SERVER_ERROR {
        return Some(LookupFault::NotFound {
            status: status.as_u16(),
        });
    }
    if !status.is_success() {
        return Some(LookupFault::Status {
            status: status.as_u16(),
        });
    }
    None
}

// =============================================================================
// Inventory Client Trait
// =============================================================================

/// The two-step lookup collaborator.
#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Step (a): resolve an asset tag to its assignment identifier.
    async fn resolve_asset_tag(&self, asset_tag: &str) -> Result<AssignmentId, LookupFault>;

    /// Step (b): fetch the assignment detail record.
    async fn fetch_assignment(
        &self,
        assignment_id: AssignmentId,
    ) -> Result<AssignmentDetail, LookupFault>;
}

// =============================================================================
// Connectivity Probe
// =============================================================================

/// Reports whether the device currently has connectivity.
///
/// Checked before any network call is issued so an offline scan surfaces
/// as `NetworkUnavailable` instead of a slow transport timeout. Supplied
/// by the embedding platform (browser online state, NIC watcher).
pub trait ConnectivityProbe: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Probe for wired stations that are online whenever they run at all.
#[derive(Debug, Default)]
pub struct AlwaysOnline;

impl ConnectivityProbe for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

// =============================================================================
// HTTP Inventory Client
// =============================================================================

/// reqwest-backed implementation of the lookup collaborator.
pub struct HttpInventoryClient {
    http: reqwest::Client,
    config: LookupConfig,
}

impl HttpInventoryClient {
    /// Creates a client with a default HTTP stack.
    pub fn new(config: LookupConfig) -> Self {
        HttpInventoryClient {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Creates a client over a caller-configured HTTP stack (proxies,
    /// cookie auth, timeouts).
    pub fn with_client(http: reqwest::Client, config: LookupConfig) -> Self {
        HttpInventoryClient { http, config }
    }
}

/// Resolve-step response body.
#[derive(Debug, Deserialize)]
struct ResolveResponse {
    assignment_id: Option<AssignmentId>,
}

#[async_trait]
impl InventoryClient for HttpInventoryClient {
    async fn resolve_asset_tag(&self, asset_tag: &str) -> Result<AssignmentId, LookupFault> {
        let url = self.config.lookup_url(asset_tag);
        debug!(%url, "Resolving asset tag");

        let response = self.http.get(url).send().await?;
        if let Some(fault) = resolve_status_fault(response.status()) {
            return Err(fault);
        }

        let body: ResolveResponse = response.json().await?;
        body.assignment_id.ok_or(LookupFault::MissingAssignment)
    }

    async fn fetch_assignment(
        &self,
        assignment_id: AssignmentId,
    ) -> Result<AssignmentDetail, LookupFault> {
        let url = self.config.detail_url(assignment_id);
        debug!(%url, "Fetching assignment detail");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LookupFault::Status {
                status: status.as_u16(),
            });
        }

        let record: serde_json::Value = response.json().await?;
        if record.is_null() {
            return Err(LookupFault::EmptyDetail);
        }

        Ok(AssignmentDetail::new(assignment_id, record))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_status_conflates_404_and_500() {
        assert_eq!(
            resolve_status_fault(StatusCode::NOT_FOUND),
            Some(LookupFault::NotFound { status: 404 })
        );
        assert_eq!(
            resolve_status_fault(StatusCode::INTERNAL_SERVER_ERROR),
            Some(LookupFault::NotFound { status: 500 })
        );
    }

    #[test]
    fn test_other_statuses_are_not_not_found() {
        assert_eq!(
            resolve_status_fault(StatusCode::FORBIDDEN),
            Some(LookupFault::Status { status: 403 })
        );
        assert_eq!(
            resolve_status_fault(StatusCode::BAD_GATEWAY),
            Some(LookupFault::Status { status: 502 })
        );
        assert_eq!(resolve_status_fault(StatusCode::OK), None);
    }

    #[test]
    fn test_detail_record_passes_through_unmodified() {
        let record = serde_json::json!({
            "assignment_id": 42,
            "equipment": { "asset_tag": "024758", "manufacturer": "Lenovo" }
        });
        let detail = AssignmentDetail::new(42, record.clone());
        assert_eq!(detail.assignment_id(), 42);
        assert_eq!(detail.into_record(), record);
    }
}
