//! Consuming-UI sink: where dispatch results land.
//!
//! The edit and create surfaces are external collaborators; the dispatcher
//! only ever talks to them through this trait.

use scanpoint_core::ScanError;

use crate::client::AssignmentDetail;

/// Trait for routing dispatch results to the consuming UI.
pub trait ScanSink: Send + Sync {
    /// A scan resolved: open the edit surface with the assignment detail.
    fn present_assignment(&self, detail: AssignmentDetail);

    /// An unregistered tag: offer the create-asset path, pre-filled with
    /// the scanned tag.
    fn offer_creation(&self, asset_tag: &str);

    /// A non-fatal scan failure, surfaced with a retry affordance.
    fn report_error(&self, error: &ScanError);

    /// The edit surface saved its changes.
    fn update_succeeded(&self);
}

/// No-op sink for tests and headless embedding.
#[derive(Debug, Default)]
pub struct NoOpSink;

impl ScanSink for NoOpSink {
    fn present_assignment(&self, _detail: AssignmentDetail) {}
    fn offer_creation(&self, _asset_tag: &str) {}
    fn report_error(&self, _error: &ScanError) {}
    fn update_succeeded(&self) {}
}
