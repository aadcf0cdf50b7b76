//! src/services/storage_service.rs
//!
//! StorageService: brokers access to per-competition buckets in an
//! S3-compatible store by issuing presigned URLs, and keeps one metadata
//! record per video. Payload bytes never pass through this service.
//!
//! Upload grants are issued only after the metadata record is durable, so
//! every grant a client holds is backed by a record. A record may still
//! outlive an upload that never happens; `verify_upload` tells the two apart.

use crate::{
    models::{
        event::{VideoEvent, VideoEventType},
        grant::{GrantMethod, PresignedUrlGrant},
        outcome::{CascadeDeleteReport, DeleteOutcome},
        video::{VideoRecord, competition_bucket},
    },
    stores::{
        metadata_store::{MetadataError, MetadataStore},
        object_store::{ObjectStore, ObjectStoreError},
    },
};
use futures::{Stream, StreamExt, future, stream};
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Download grants presigned concurrently when listing a competition.
const LIST_GRANT_CONCURRENCY: usize = 16;
/// S3 object key limit in bytes.
const MAX_OBJECT_KEY_LEN: usize = 1024;
/// Bytes the stored key adds in front of the original name: hyphenated UUID plus `-`.
const STORED_KEY_PREFIX_LEN: usize = 37;
const MAX_FILENAME_LEN: usize = MAX_OBJECT_KEY_LEN - STORED_KEY_PREFIX_LEN;
const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("bucket `{name}` invalid: {reason}")]
    InvalidBucketName { name: String, reason: String },
    #[error("filename `{name}` invalid: {reason}")]
    InvalidFilename { name: String, reason: String },
    #[error("file size must not be negative, got {0}")]
    InvalidFileSize(i64),
    #[error(transparent)]
    ObjectStore(#[from] ObjectStoreError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Parameters of an upload grant request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub competition_id: String,
    pub uploader_id: String,
    pub original_filename: String,
    pub content_type: String,
    pub file_size: i64,
}

/// Orchestrates the object store and the metadata store.
///
/// Holds no mutable state of its own; cloning is cheap and every clone talks
/// to the same stores.
#[derive(Clone)]
pub struct StorageService {
    objects: Arc<dyn ObjectStore>,
    metadata: Arc<dyn MetadataStore>,
    presign_expiry: Duration,
}

impl StorageService {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        metadata: Arc<dyn MetadataStore>,
        presign_expiry: Duration,
    ) -> Self {
        Self {
            objects,
            metadata,
            presign_expiry,
        }
    }

    pub fn objects(&self) -> &dyn ObjectStore {
        self.objects.as_ref()
    }

    pub fn metadata(&self) -> &dyn MetadataStore {
        self.metadata.as_ref()
    }

    /// Issue a PUT grant for a new video.
    ///
    /// - Generates the video ID and derives the stored filename.
    /// - Ensures the competition bucket exists (idempotent).
    /// - Presigns the PUT, then persists the record before returning.
    pub async fn generate_upload_grant(
        &self,
        request: &UploadRequest,
    ) -> StorageResult<PresignedUrlGrant> {
        let bucket = competition_bucket(&request.competition_id);
        ensure_bucket_name_safe(&bucket)?;
        ensure_filename_safe(&request.original_filename)?;
        if request.file_size < 0 {
            return Err(StorageError::InvalidFileSize(request.file_size));
        }

        let record = VideoRecord::new(
            Uuid::new_v4().to_string(),
            &request.competition_id,
            &request.uploader_id,
            &request.original_filename,
            &request.content_type,
            request.file_size,
        );

        self.objects.ensure_bucket(&bucket).await?;
        let url = self
            .objects
            .presign(
                GrantMethod::Put,
                &bucket,
                &record.stored_filename,
                self.presign_expiry,
            )
            .await?;

        self.metadata.save(&record).await.inspect_err(|err| {
            error!(
                error = %err,
                video_id = %record.id,
                competition_id = %record.competition_id,
                "failed to persist video metadata; upload grant withheld"
            );
        })?;

        info!(
            video_id = %record.id,
            bucket = %bucket,
            key = %record.stored_filename,
            uploader_id = %record.uploader_id,
            "issued upload grant"
        );
        VideoEvent::for_record(VideoEventType::UploadRequested, &record).publish();

        Ok(self.grant(url, record.id, bucket, GrantMethod::Put))
    }

    /// Issue a GET grant for an existing video; `None` when no record exists.
    pub async fn generate_download_grant(
        &self,
        video_id: &str,
    ) -> StorageResult<Option<PresignedUrlGrant>> {
        let Some(record) = self.metadata.find_by_id(video_id).await? else {
            debug!(video_id = %video_id, "no metadata for download grant");
            return Ok(None);
        };

        let bucket = record.bucket();
        let url = self
            .objects
            .presign(
                GrantMethod::Get,
                &bucket,
                &record.stored_filename,
                self.presign_expiry,
            )
            .await?;

        Ok(Some(self.grant(url, video_id.to_string(), bucket, GrantMethod::Get)))
    }

    /// Download grants for every video of a competition.
    ///
    /// Records are fetched once up front; grants are then produced lazily and
    /// in no particular order. Records deleted in between are skipped.
    pub async fn list_download_grants_for_competition(
        &self,
        competition_id: &str,
    ) -> StorageResult<impl Stream<Item = StorageResult<PresignedUrlGrant>> + '_> {
        let records = self.metadata.find_by_competition_id(competition_id).await?;
        debug!(
            competition_id = %competition_id,
            count = records.len(),
            "listing download grants"
        );

        Ok(stream::iter(records)
            .map(move |record| async move { self.generate_download_grant(&record.id).await })
            .buffer_unordered(LIST_GRANT_CONCURRENCY)
            .filter_map(|res| future::ready(res.transpose())))
    }

    /// `true` only when a record exists and the object store confirms the object.
    ///
    /// Object-store failures degrade to `false`; they are logged separately
    /// from genuine absence.
    pub async fn verify_upload(&self, video_id: &str) -> StorageResult<bool> {
        let Some(record) = self.metadata.find_by_id(video_id).await? else {
            return Ok(false);
        };

        let bucket = record.bucket();
        match self
            .objects
            .stat_object(&bucket, &record.stored_filename)
            .await
        {
            Ok(()) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => {
                debug!(video_id = %video_id, bucket = %bucket, "video not uploaded yet");
                Ok(false)
            }
            Err(err) => {
                warn!(
                    error = %err,
                    video_id = %video_id,
                    bucket = %bucket,
                    key = %record.stored_filename,
                    "object store check failed; reporting upload as unverified"
                );
                Ok(false)
            }
        }
    }

    pub async fn get_video_metadata(&self, video_id: &str) -> StorageResult<Option<VideoRecord>> {
        Ok(self.metadata.find_by_id(video_id).await?)
    }

    /// Delete a video's object and its metadata record.
    ///
    /// The record is removed even when object removal fails; the outcome
    /// reports the orphaned object instead of an error.
    pub async fn delete_video(&self, video_id: &str) -> StorageResult<DeleteOutcome> {
        let Some(record) = self.metadata.find_by_id(video_id).await? else {
            debug!(video_id = %video_id, "delete requested for unknown video");
            return Ok(DeleteOutcome::NotFound);
        };

        let bucket = record.bucket();
        let removal = self
            .objects
            .remove_object(&bucket, &record.stored_filename)
            .await;

        self.metadata.delete_by_id(video_id).await?;
        VideoEvent::for_record(VideoEventType::Deleted, &record).publish();

        match removal {
            Ok(()) => {
                info!(video_id = %video_id, bucket = %bucket, "deleted video");
                Ok(DeleteOutcome::Deleted)
            }
            Err(err) => {
                error!(
                    error = %err,
                    video_id = %video_id,
                    bucket = %bucket,
                    key = %record.stored_filename,
                    "object removal failed; metadata deleted, object orphaned"
                );
                Ok(DeleteOutcome::ObjectOrphaned {
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Cascade delete of every video an uploader owns.
    ///
    /// Per-video deletions run concurrently and all of them are awaited. Their
    /// failures are collected in the report, never returned as an error.
    pub async fn delete_user_videos(&self, uploader_id: &str) -> StorageResult<CascadeDeleteReport> {
        info!(uploader_id = %uploader_id, "deleting video data for user");
        let records = self.metadata.find_by_uploader_id(uploader_id).await?;
        info!(
            uploader_id = %uploader_id,
            count = records.len(),
            "found videos to delete"
        );

        let outcomes = future::join_all(records.iter().map(|record| async move {
            (record.id.as_str(), self.delete_video(&record.id).await)
        }))
        .await;

        let mut report = CascadeDeleteReport {
            requested: records.len(),
            ..Default::default()
        };
        for (video_id, outcome) in outcomes {
            match outcome {
                Ok(DeleteOutcome::Deleted) => report.deleted += 1,
                Ok(DeleteOutcome::ObjectOrphaned { .. }) => report.orphaned.push(video_id.into()),
                // removed concurrently by someone else
                Ok(DeleteOutcome::NotFound) => {}
                Err(err) => {
                    error!(error = %err, video_id = %video_id, "failed to delete video");
                    report.failed.push(video_id.into());
                }
            }
        }

        if report.is_clean() {
            info!(uploader_id = %uploader_id, deleted = report.deleted, "deleted video data for user");
        } else {
            warn!(
                uploader_id = %uploader_id,
                deleted = report.deleted,
                orphaned = report.orphaned.len(),
                failed = report.failed.len(),
                "video data for user deleted with leftovers"
            );
        }

        Ok(report)
    }

    fn grant(
        &self,
        url: String,
        video_id: String,
        bucket: String,
        method: GrantMethod,
    ) -> PresignedUrlGrant {
        PresignedUrlGrant {
            url,
            video_id,
            bucket,
            method,
            expiry: self.presign_expiry.as_secs(),
        }
    }
}

/// Validate a derived bucket name against S3 naming rules:
/// - 3–63 characters
/// - lowercase letters, digits, dots, hyphens only
/// - cannot start/end with dot or hyphen
/// - cannot contain consecutive dots or dot-hyphen patterns
/// - cannot look like an IPv4 address
fn ensure_bucket_name_safe(name: &str) -> StorageResult<()> {
    let invalid = |reason: &str| {
        Err(StorageError::InvalidBucketName {
            name: name.to_string(),
            reason: reason.into(),
        })
    };

    let len = name.len();
    if !(BUCKET_NAME_MIN_LEN..=BUCKET_NAME_MAX_LEN).contains(&len) {
        return invalid("must be between 3 and 63 characters");
    }
    if !name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '-'))
    {
        return invalid("allowed characters are lowercase letters, digits, dots, and hyphens");
    }
    if name.starts_with('.') || name.ends_with('.') || name.starts_with('-') || name.ends_with('-')
    {
        return invalid("must start and end with a lowercase letter or digit");
    }
    if name.contains("..") || name.contains("-.") || name.contains(".-") {
        return invalid("cannot contain consecutive dots or dot-hyphen combinations");
    }
    if is_ipv4_like(name) {
        return invalid("must not be formatted like an IP address");
    }

    Ok(())
}

/// Reject filenames that would not form a single safe object key segment,
/// including ones whose stored key `<uuid>-<name>` would exceed the S3 limit.
fn ensure_filename_safe(name: &str) -> StorageResult<()> {
    let invalid = |reason: &str| {
        Err(StorageError::InvalidFilename {
            name: name.to_string(),
            reason: reason.into(),
        })
    };

    if name.is_empty() {
        return invalid("must not be empty");
    }
    if name.len() > MAX_FILENAME_LEN {
        return invalid("must be at most 987 bytes so the stored key fits in 1024");
    }
    if name == "." || name == ".." {
        return invalid("must not be a relative path component");
    }
    if name.contains('/') || name.contains('\\') {
        return invalid("must not contain path separators");
    }
    if name.chars().any(|c| c.is_control()) {
        return invalid("must not contain control characters");
    }
    Ok(())
}

/// Check if a string matches IPv4-like dotted decimal form.
fn is_ipv4_like(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() == 4
        && parts.iter().all(|segment| {
            !segment.is_empty()
                && segment.len() <= 3
                && segment.chars().all(|c| c.is_ascii_digit())
                && segment.parse::<u8>().is_ok()
        })
}
