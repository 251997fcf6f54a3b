use std::env;
use std::fmt;
use std::time::Duration;

use crate::types::{AppError, AppResult};

pub const DEFAULT_BASE_PATH: &str = "/storage/";
pub const DEFAULT_GET_URL_PREFIX: &str = "/storage";
pub const DEFAULT_BUCKET: &str = "test2";
pub const DEFAULT_OBJECT: &str = "test4.txt";
/// Region the bucket is created in; requests and presigns are signed for it too
pub const DEFAULT_REGION: &str = "us-east-2";
pub const DEFAULT_CONTENT: &str = "Hello, World! ltcloud upload test by edward!!!";
/// Longest lifetime SigV4 allows for a presigned URL
pub const DEFAULT_PRESIGN_EXPIRY: Duration = Duration::from_secs(7 * 24 * 3600);

/// Connection parameters for one storage session
#[derive(Clone)]
pub struct StorageConfig {
    /// Bare `host[:port]` of the proxy in front of MinIO
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    /// Prepended to every request path and patched into presigned PUT URLs
    pub base_path: String,
    pub bucket: String,
    pub object: String,
    pub secure: bool,
    pub insecure_skip_verify: bool,
    /// Bucket location; every request and presign is signed for it
    pub region: String,
    pub content: String,
    pub content_type: String,
    pub presign_expiry: Duration,
    /// Patched into presigned GET URLs instead of `base_path`
    pub get_url_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            bucket: DEFAULT_BUCKET.to_string(),
            object: DEFAULT_OBJECT.to_string(),
            secure: true,
            insecure_skip_verify: true,
            region: DEFAULT_REGION.to_string(),
            content: DEFAULT_CONTENT.to_string(),
            content_type: mime::TEXT_PLAIN.to_string(),
            presign_expiry: DEFAULT_PRESIGN_EXPIRY,
            get_url_prefix: DEFAULT_GET_URL_PREFIX.to_string(),
        }
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("base_path", &self.base_path)
            .field("bucket", &self.bucket)
            .field("object", &self.object)
            .field("secure", &self.secure)
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .field("region", &self.region)
            .field("content_type", &self.content_type)
            .field("presign_expiry", &self.presign_expiry)
            .field("get_url_prefix", &self.get_url_prefix)
            .finish()
    }
}

impl StorageConfig {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let string = |key: &str, default: String| lookup(key).unwrap_or(default);
        let flag = |key: &str, default: bool| -> AppResult<bool> {
            match lookup(key) {
                Some(raw) => parse_bool(key, &raw),
                None => Ok(default),
            }
        };

        let presign_expiry = match lookup("PRESIGN_EXPIRY_SECS") {
            Some(raw) => Duration::from_secs(raw.trim().parse().map_err(|e| {
                AppError::Config(format!("PRESIGN_EXPIRY_SECS={:?}: {}", raw, e))
            })?),
            None => defaults.presign_expiry,
        };

        Ok(Self {
            endpoint: string("MINIO_ENDPOINT", defaults.endpoint),
            access_key: string("MINIO_ACCESS_KEY", defaults.access_key),
            secret_key: string("MINIO_SECRET_KEY", defaults.secret_key),
            base_path: string("MINIO_BASE_PATH", defaults.base_path),
            bucket: string("MINIO_BUCKET", defaults.bucket),
            object: string("MINIO_OBJECT", defaults.object),
            secure: flag("MINIO_SECURE", defaults.secure)?,
            insecure_skip_verify: flag("MINIO_INSECURE_SKIP_VERIFY", defaults.insecure_skip_verify)?,
            region: string("MINIO_REGION", defaults.region),
            content: string("MINIO_CONTENT", defaults.content),
            content_type: string("MINIO_CONTENT_TYPE", defaults.content_type),
            presign_expiry,
            get_url_prefix: string("PRESIGN_GET_PREFIX", defaults.get_url_prefix),
        })
    }
}

fn parse_bool(key: &str, raw: &str) -> AppResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::Config(format!("{}={:?} is not a boolean", key, raw))),
    }
}
