//! Storage session
//!
//! Holds the connection descriptor and runs the four bucket/object operations
//! against an [`ObjectStore`]. Presigned URLs are patched after signing so they
//! point at the reverse-proxy subpath, then checked to strip back cleanly.

use aws_sdk_s3::config::SharedHttpClient;
use bytes::Bytes;
use std::fmt;
use tracing::{info, warn};
use url::Url;

use crate::config::StorageConfig;
use crate::storage::{ObjectStore, S3Client, UploadInfo};
use crate::transport::{PathPrefixTransport, ReqwestTransport};
use crate::types::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketStatus {
    Created,
    AlreadyExists,
}

/// A presigned URL after the proxy prefix has been patched in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUrl {
    pub url: String,
    /// Whether stripping the prefix again gives back the URL that was signed
    pub signature_intact: bool,
}

pub struct StorageSession {
    config: StorageConfig,
    backend: Box<dyn ObjectStore>,
}

impl StorageSession {
    /// Build the S3 client: TLS transport, wrapped by the base-path rewrite.
    pub fn connect(config: StorageConfig) -> AppResult<Self> {
        let transport = PathPrefixTransport::new(
            ReqwestTransport::new(config.insecure_skip_verify)?,
            config.base_path.clone(),
        );
        let client = S3Client::new(
            &config.endpoint,
            config.secure,
            &config.access_key,
            &config.secret_key,
            &config.region,
            SharedHttpClient::new(transport),
        )?;

        info!(endpoint = %config.endpoint, base_path = %config.base_path, "Connected storage session");
        Ok(Self::with_backend(config, Box::new(client)))
    }

    pub fn with_backend(config: StorageConfig, backend: Box<dyn ObjectStore>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Create the bucket, treating "already exists" as success.
    ///
    /// If creation fails and the existence check does not confirm the bucket,
    /// the creation error is returned rather than the check's.
    pub async fn ensure_bucket(&self) -> AppResult<BucketStatus> {
        let bucket = &self.config.bucket;
        match self.backend.make_bucket(bucket, &self.config.region).await {
            Ok(()) => {
                info!(bucket = %bucket, "Bucket created");
                Ok(BucketStatus::Created)
            }
            Err(create_err) => match self.backend.bucket_exists(bucket).await {
                Ok(true) => {
                    info!(bucket = %bucket, "Bucket already exists");
                    Ok(BucketStatus::AlreadyExists)
                }
                Ok(false) => Err(create_err),
                Err(exists_err) => {
                    warn!(bucket = %bucket, error = %exists_err, "Bucket existence check failed");
                    Err(create_err)
                }
            },
        }
    }

    pub async fn upload_fixed_content(&self) -> AppResult<UploadInfo> {
        let info = self
            .backend
            .put_object(
                &self.config.bucket,
                &self.config.object,
                Bytes::from(self.config.content.clone()),
                &self.config.content_type,
            )
            .await?;
        info!(bucket = %info.bucket, key = %info.key, size = info.size, "Object uploaded");
        Ok(info)
    }

    /// Presigned PUT URL with `base_path` inserted after the host
    pub async fn create_put_url(&self) -> AppResult<PresignedUrl> {
        let url = self
            .backend
            .presigned_put_object(&self.config.bucket, &self.config.object, self.config.presign_expiry)
            .await?;
        patch_url("PUT", &url, &self.config.base_path)
    }

    /// Presigned GET URL with `get_url_prefix` inserted after the host
    pub async fn create_get_url(&self) -> AppResult<PresignedUrl> {
        let url = self
            .backend
            .presigned_get_object(&self.config.bucket, &self.config.object, self.config.presign_expiry)
            .await?;
        patch_url("GET", &url, &self.config.get_url_prefix)
    }
}

fn patch_url(method: &str, signed: &Url, prefix: &str) -> AppResult<PresignedUrl> {
    let patched = insert_after_host(signed.as_str(), prefix)?;
    let signature_intact = strips_back_to(&patched, prefix, signed);
    if !signature_intact {
        warn!(method, url = %patched, "Presigned URL no longer matches its signature once the prefix is stripped");
    }
    Ok(PresignedUrl {
        url: patched,
        signature_intact,
    })
}

/// Strip `prefix` from the path, as the proxy would, and compare with the
/// URL that was signed
fn strips_back_to(patched: &str, prefix: &str, signed: &Url) -> bool {
    let Ok(mut url) = Url::parse(patched) else {
        return false;
    };
    let Some(signed_path) = url.path().strip_prefix(prefix).map(str::to_string) else {
        return false;
    };
    if !signed_path.starts_with('/') {
        return false;
    }
    url.set_path(&signed_path);
    url == *signed
}

impl fmt::Debug for StorageSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageSession")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Insert `prefix` verbatim at the end of the URL's authority, before the path.
///
/// The authority is taken from the URL itself rather than the configured
/// endpoint, which may differ in case or carry a default port.
pub fn insert_after_host(url: &str, prefix: &str) -> AppResult<String> {
    let authority_start = match url.find("://") {
        Some(i) => i + 3,
        None => {
            warn!(url, "URL has no authority to insert the prefix after");
            return Err(AppError::InvalidArgument(format!("URL {:?} has no host", url)));
        }
    };
    let authority_end = url[authority_start..]
        .find(['/', '?', '#'])
        .map_or(url.len(), |i| authority_start + i);
    if authority_end == authority_start {
        warn!(url, "URL has an empty host");
        return Err(AppError::InvalidArgument(format!("URL {:?} has no host", url)));
    }

    let mut patched = String::with_capacity(url.len() + prefix.len());
    patched.push_str(&url[..authority_end]);
    patched.push_str(prefix);
    patched.push_str(&url[authority_end..]);
    Ok(patched)
}
