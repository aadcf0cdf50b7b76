//! Defines routes for the video storage API.
//!
//! ## Structure
//! - **Grant endpoints**
//!   - `POST   /storage/presigned-upload`: PUT URL for a new video (query params)
//!   - `GET    /storage/presigned-download/{videoId}`: GET URL for one video
//!   - `GET    /storage/competition/{competitionId}/videos`: GET URLs for a competition
//!
//! - **Metadata endpoints**
//!   - `GET    /storage/verify/{videoId}`: has the object actually been uploaded
//!   - `GET    /storage/videos/{videoId}`: metadata record
//!   - `DELETE /storage/{videoId}`: delete object and record
//!   - `DELETE /storage/user/{userId}`: cascade delete for one uploader

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        video_handlers::{
            delete_user_videos, delete_video, get_video_metadata, list_competition_videos,
            presigned_download, presigned_upload, verify_upload,
        },
    },
    services::storage_service::StorageService,
};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Build and return the router for all routes.
///
/// The router carries shared state (`StorageService`) to all handlers.
pub fn routes() -> Router<StorageService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Grant routes
        .route("/storage/presigned-upload", post(presigned_upload))
        .route(
            "/storage/presigned-download/{video_id}",
            get(presigned_download),
        )
        .route(
            "/storage/competition/{competition_id}/videos",
            get(list_competition_videos),
        )
        // Metadata routes
        .route("/storage/verify/{video_id}", get(verify_upload))
        .route("/storage/videos/{video_id}", get(get_video_metadata))
        .route("/storage/user/{user_id}", delete(delete_user_videos))
        .route("/storage/{video_id}", delete(delete_video))
}
