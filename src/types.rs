// Error types and shared result alias

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("S3 error {code} (HTTP {}): {message}", status.map_or_else(|| "-".to_string(), |s| s.to_string()))]
    S3 {
        status: Option<u16>,
        code: String,
        message: String,
    },

    /// SDK failure with no S3 error code: dispatch, timeout, unparseable response
    #[error("S3 request failed: {0}")]
    Sdk(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type AppResult<T> = std::result::Result<T, AppError>;
