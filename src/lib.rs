// minio-subpath - S3/MinIO client for endpoints served behind a reverse-proxy subpath

pub mod app;
pub mod config;
pub mod session;
pub mod storage;
pub mod transport;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::StorageConfig;
pub use session::{BucketStatus, PresignedUrl, StorageSession};
pub use types::{AppError, AppResult};
