//! Data models for the video storage service.
//!
//! `VideoRecord` maps to the `videos` table via `sqlx::FromRow`; the other
//! types are ephemeral and only ever serialized as JSON responses or log
//! records.

pub mod event;
pub mod grant;
pub mod outcome;
pub mod video;
