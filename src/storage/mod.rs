// Storage layer (S3-compatible)

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::types::AppResult;

pub mod s3_client;

pub use s3_client::*;

/// Result of a successful object upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadInfo {
    pub bucket: String,
    pub key: String,
    pub size: usize,
    pub etag: Option<String>,
}

/// The bucket/object operations a storage session relies on
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn make_bucket(&self, bucket: &str, region: &str) -> AppResult<()>;

    async fn bucket_exists(&self, bucket: &str) -> AppResult<bool>;

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> AppResult<UploadInfo>;

    async fn presigned_put_object(&self, bucket: &str, key: &str, expiry: Duration) -> AppResult<Url>;

    async fn presigned_get_object(&self, bucket: &str, key: &str, expiry: Duration) -> AppResult<Url>;
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    async fn make_bucket(&self, bucket: &str, region: &str) -> AppResult<()> {
        (**self).make_bucket(bucket, region).await
    }

    async fn bucket_exists(&self, bucket: &str) -> AppResult<bool> {
        (**self).bucket_exists(bucket).await
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> AppResult<UploadInfo> {
        (**self).put_object(bucket, key, body, content_type).await
    }

    async fn presigned_put_object(&self, bucket: &str, key: &str, expiry: Duration) -> AppResult<Url> {
        (**self).presigned_put_object(bucket, key, expiry).await
    }

    async fn presigned_get_object(&self, bucket: &str, key: &str, expiry: Duration) -> AppResult<Url> {
        (**self).presigned_get_object(bucket, key, expiry).await
    }
}
