//! Adapters for the two external collaborators: the S3-compatible object
//! store and the video metadata store.

pub mod metadata_store;
pub mod object_store;
