//! Presigned URL grants. Produced on demand and never persisted.

use serde::Serialize;
use std::fmt;

/// HTTP method a presigned URL is valid for.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum GrantMethod {
    Put,
    Get,
}

impl GrantMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantMethod::Put => "PUT",
            GrantMethod::Get => "GET",
        }
    }
}

impl fmt::Display for GrantMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A time-limited URL allowing one operation on one object.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUrlGrant {
    pub url: String,

    /// Video ID the URL was issued for. Serialized as `fileId` for existing clients.
    #[serde(rename = "fileId")]
    pub video_id: String,

    pub bucket: String,
    pub method: GrantMethod,

    /// Lifetime in seconds.
    pub expiry: u64,
}
