//! Video lifecycle events, published as structured log records.

use chrono::Utc;
use serde::Serialize;

use super::video::VideoRecord;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum VideoEventType {
    #[serde(rename = "videoUploadRequested")]
    UploadRequested,
    #[serde(rename = "videoDeleted")]
    Deleted,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VideoEvent {
    pub event_type: VideoEventType,
    pub video_id: String,
    pub competition_id: String,
    pub uploader_id: String,
    pub filename: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl VideoEvent {
    pub fn for_record(event_type: VideoEventType, record: &VideoRecord) -> Self {
        Self {
            event_type,
            video_id: record.id.clone(),
            competition_id: record.competition_id.clone(),
            uploader_id: record.uploader_id.clone(),
            filename: record.original_filename.clone(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Emit the event on the `video_events` tracing target as a JSON payload.
    pub fn publish(&self) {
        match serde_json::to_string(self) {
            Ok(payload) => tracing::info!(
                target: "video_events",
                video_id = %self.video_id,
                event = %payload,
                "video event"
            ),
            Err(err) => tracing::warn!(
                target: "video_events",
                video_id = %self.video_id,
                error = %err,
                "failed to serialize video event"
            ),
        }
    }
}
