//! Object store capability and its S3 implementation.
//!
//! The orchestrator only needs bucket provisioning, URL presigning, existence
//! checks and removal. Everything else (payload transfer, signing) happens
//! between the client and the S3-compatible store directly.

use crate::models::grant::GrantMethod;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, meta::region::RegionProviderChain};
use aws_sdk_s3::{
    Client,
    config::Credentials,
    error::SdkError,
    operation::{
        create_bucket::CreateBucketError, head_bucket::HeadBucketError,
        head_object::HeadObjectError,
    },
    presigning::PresigningConfig,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object `{key}` not found in bucket `{bucket}`")]
    NotFound { bucket: String, key: String },
    #[error("failed to presign {method} for `{bucket}/{key}`: {reason}")]
    Presign {
        method: GrantMethod,
        bucket: String,
        key: String,
        reason: String,
    },
    #[error("object store request failed: {0}")]
    Backend(String),
}

pub type ObjectStoreResult<T> = Result<T, ObjectStoreError>;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> ObjectStoreResult<bool>;

    /// Create `bucket` if absent. A concurrent creation is success.
    async fn ensure_bucket(&self, bucket: &str) -> ObjectStoreResult<()>;

    async fn presign(
        &self,
        method: GrantMethod,
        bucket: &str,
        key: &str,
        expiry: Duration,
    ) -> ObjectStoreResult<String>;

    /// `Ok(())` when the object exists, `NotFound` when it does not.
    async fn stat_object(&self, bucket: &str, key: &str) -> ObjectStoreResult<()>;

    async fn remove_object(&self, bucket: &str, key: &str) -> ObjectStoreResult<()>;

    /// Cheap reachability check used by `/readyz`.
    async fn ping(&self) -> ObjectStoreResult<()>;
}

/// Region where CreateBucket must be sent without a location constraint.
const DEFAULT_S3_REGION: &str = "us-east-1";

/// Connection parameters for [`S3ObjectStore`].
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub region: String,
    /// Custom endpoint for S3-compatible providers (MinIO, etc.).
    pub endpoint_url: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    region: String,
}

impl S3ObjectStore {
    pub fn new(client: Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }

    pub async fn connect(settings: &S3Settings) -> Self {
        let region_provider =
            RegionProviderChain::first_try(aws_config::Region::new(settings.region.clone()));
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let (Some(access), Some(secret)) = (&settings.access_key, &settings.secret_key) {
            builder = builder.credentials_provider(Credentials::new(
                access.clone(),
                secret.clone(),
                None,
                None,
                "video-storage-static",
            ));
        }
        if let Some(endpoint) = &settings.endpoint_url {
            // MinIO and most self-hosted stores need path-style addressing
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        tracing::info!(
            region = %settings.region,
            endpoint = ?settings.endpoint_url,
            "S3 client configured"
        );

        Self::new(Client::from_conf(builder.build()), settings.region.clone())
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn bucket_exists(&self, bucket: &str) -> ObjectStoreResult<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(err)) if matches!(err.err(), HeadBucketError::NotFound(_)) => {
                Ok(false)
            }
            Err(err) => Err(ObjectStoreError::Backend(err.to_string())),
        }
    }

    async fn ensure_bucket(&self, bucket: &str) -> ObjectStoreResult<()> {
        if self.bucket_exists(bucket).await? {
            return Ok(());
        }

        let mut request = self.client.create_bucket().bucket(bucket);
        if self.region != DEFAULT_S3_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                tracing::info!(bucket = %bucket, "created bucket");
                Ok(())
            }
            Err(SdkError::ServiceError(err))
                if matches!(
                    err.err(),
                    CreateBucketError::BucketAlreadyOwnedByYou(_)
                        | CreateBucketError::BucketAlreadyExists(_)
                ) =>
            {
                tracing::debug!(bucket = %bucket, "bucket created concurrently");
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, bucket = %bucket, "S3 create bucket failed");
                Err(ObjectStoreError::Backend(err.to_string()))
            }
        }
    }

    async fn presign(
        &self,
        method: GrantMethod,
        bucket: &str,
        key: &str,
        expiry: Duration,
    ) -> ObjectStoreResult<String> {
        let presign_err = |reason: String| ObjectStoreError::Presign {
            method,
            bucket: bucket.to_string(),
            key: key.to_string(),
            reason,
        };

        let presigning_config = PresigningConfig::builder()
            .expires_in(expiry)
            .build()
            .map_err(|e| presign_err(e.to_string()))?;

        let request = match method {
            GrantMethod::Put => self
                .client
                .put_object()
                .bucket(bucket)
                .key(key)
                .presigned(presigning_config)
                .await
                .map_err(|e| presign_err(e.to_string()))?,
            GrantMethod::Get => self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .presigned(presigning_config)
                .await
                .map_err(|e| presign_err(e.to_string()))?,
        };

        Ok(request.uri().to_string())
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> ObjectStoreResult<()> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(err)) if matches!(err.err(), HeadObjectError::NotFound(_)) => {
                Err(ObjectStoreError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })
            }
            Err(err) => Err(ObjectStoreError::Backend(err.to_string())),
        }
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> ObjectStoreResult<()> {
        let start = Instant::now();

        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                ObjectStoreError::Backend(e.to_string())
            })?;

        tracing::debug!(
            bucket = %bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    /// ListBuckets round trip. An AccessDenied answer still proves the store
    /// is reachable, so credentials scoped to `competition-*` buckets pass.
    async fn ping(&self) -> ObjectStoreResult<()> {
        match self.client.list_buckets().send().await {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(err)) if err.raw().status().as_u16() == 403 => {
                tracing::debug!("ListBuckets denied; object store reachable");
                Ok(())
            }
            Err(err) => Err(ObjectStoreError::Backend(err.to_string())),
        }
    }
}
