//! Results of delete operations.
//!
//! Object-store removal failures do not block metadata removal, so a delete
//! can succeed while leaving an orphaned object behind. These types keep that
//! signal visible to callers instead of dropping it.

use serde::Serialize;

/// Result of deleting a single video.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum DeleteOutcome {
    /// No metadata record existed; nothing was touched.
    NotFound,
    /// Object and metadata record were both removed.
    Deleted,
    /// Metadata record removed, but the object could not be removed.
    ObjectOrphaned { reason: String },
}

/// Aggregate of a cascade delete over every video of one uploader.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CascadeDeleteReport {
    /// Number of records found for the uploader.
    pub requested: usize,
    /// Videos fully removed.
    pub deleted: usize,
    /// Videos whose metadata is gone but whose object may remain.
    pub orphaned: Vec<String>,
    /// Videos whose metadata could not be removed.
    pub failed: Vec<String>,
}

impl CascadeDeleteReport {
    pub fn is_clean(&self) -> bool {
        self.orphaned.is_empty() && self.failed.is_empty()
    }
}
