//! HTTP handlers for the `/storage` endpoints.
//!
//! Each handler maps one `StorageService` operation onto the response
//! envelope; no business logic lives here.

use crate::{
    errors::{ApiResponse, AppError},
    models::{
        grant::PresignedUrlGrant,
        outcome::{CascadeDeleteReport, DeleteOutcome},
        video::VideoRecord,
    },
    services::storage_service::{StorageService, UploadRequest},
};
use axum::{
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use futures::TryStreamExt;

/// POST `/storage/presigned-upload`: issue a PUT URL for a new video.
pub async fn presigned_upload(
    State(service): State<StorageService>,
    query: Result<Query<UploadRequest>, QueryRejection>,
) -> Result<ApiResponse<PresignedUrlGrant>, AppError> {
    let Query(request) = query.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let grant = service.generate_upload_grant(&request).await?;
    Ok(ApiResponse::ok("Presigned upload URL generated", grant))
}

/// GET `/storage/presigned-download/{videoId}`: issue a GET URL.
pub async fn presigned_download(
    State(service): State<StorageService>,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<PresignedUrlGrant>, AppError> {
    match service.generate_download_grant(&video_id).await? {
        Some(grant) => Ok(ApiResponse::ok("Presigned download URL generated", grant)),
        None => Err(AppError::not_found(format!("Video {} not found", video_id))),
    }
}

/// GET `/storage/competition/{competitionId}/videos`: GET URLs for a whole competition.
pub async fn list_competition_videos(
    State(service): State<StorageService>,
    Path(competition_id): Path<String>,
) -> Result<ApiResponse<Vec<PresignedUrlGrant>>, AppError> {
    let grants: Vec<PresignedUrlGrant> = service
        .list_download_grants_for_competition(&competition_id)
        .await?
        .try_collect()
        .await?;
    Ok(ApiResponse::ok("Presigned download URLs generated", grants))
}

/// GET `/storage/verify/{videoId}`: never fails; errors report `false` with status 500.
pub async fn verify_upload(
    State(service): State<StorageService>,
    Path(video_id): Path<String>,
) -> ApiResponse<bool> {
    match service.verify_upload(&video_id).await {
        Ok(verified) => ApiResponse::ok("Video upload verification completed", verified),
        Err(err) => {
            tracing::error!(error = %err, video_id = %video_id, "upload verification failed");
            ApiResponse::with_status(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error verifying video upload",
                Some(false),
            )
        }
    }
}

/// DELETE `/storage/{videoId}`: remove object and metadata.
pub async fn delete_video(
    State(service): State<StorageService>,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<DeleteOutcome>, AppError> {
    let outcome = service.delete_video(&video_id).await?;
    Ok(ApiResponse::ok("Video deleted", outcome))
}

/// GET `/storage/videos/{videoId}`: metadata record, 404 when absent.
pub async fn get_video_metadata(
    State(service): State<StorageService>,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<VideoRecord>, AppError> {
    match service.get_video_metadata(&video_id).await? {
        Some(record) => Ok(ApiResponse::ok(
            "Video metadata retrieved successfully",
            record,
        )),
        None => Err(AppError::not_found(format!("Video {} not found", video_id))),
    }
}

/// DELETE `/storage/user/{userId}`: cascade delete of a user's videos.
pub async fn delete_user_videos(
    State(service): State<StorageService>,
    Path(user_id): Path<String>,
) -> Result<ApiResponse<CascadeDeleteReport>, AppError> {
    let report = service.delete_user_videos(&user_id).await?;
    Ok(ApiResponse::ok("User video data deleted successfully", report))
}
