//! Metadata describing one stored video object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Prefix of every per-competition bucket name.
pub const COMPETITION_BUCKET_PREFIX: &str = "competition-";

/// One metadata record per object in the object store.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    /// Server-generated video ID (UUID v4 string).
    pub id: String,

    /// Competition the video belongs to; selects the bucket.
    pub competition_id: String,

    /// User who requested the upload.
    pub uploader_id: String,

    /// Filename as supplied by the client.
    pub original_filename: String,

    /// Object key inside the competition bucket, `<id>-<original_filename>`.
    pub stored_filename: String,

    /// When the upload grant was issued.
    pub upload_timestamp: DateTime<Utc>,

    /// Declared size in bytes.
    pub file_size: i64,

    /// Declared MIME type.
    pub content_type: String,
}

impl VideoRecord {
    /// Build a record for a freshly issued upload, deriving the stored filename.
    pub fn new(
        id: String,
        competition_id: &str,
        uploader_id: &str,
        original_filename: &str,
        content_type: &str,
        file_size: i64,
    ) -> Self {
        Self {
            stored_filename: stored_filename(&id, original_filename),
            id,
            competition_id: competition_id.to_string(),
            uploader_id: uploader_id.to_string(),
            original_filename: original_filename.to_string(),
            upload_timestamp: Utc::now(),
            file_size,
            content_type: content_type.to_string(),
        }
    }

    /// Bucket holding this record's object.
    pub fn bucket(&self) -> String {
        competition_bucket(&self.competition_id)
    }
}

/// Deterministic bucket name for a competition.
pub fn competition_bucket(competition_id: &str) -> String {
    format!("{}{}", COMPETITION_BUCKET_PREFIX, competition_id)
}

pub fn stored_filename(id: &str, original_filename: &str) -> String {
    format!("{}-{}", id, original_filename)
}
