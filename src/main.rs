use clap::Parser;
use tracing::{error, info};

use minio_subpath::{app, utils::init_logger, StorageConfig, StorageSession};

/// Create a bucket, upload a test object and print presigned URLs through a
/// reverse-proxy subpath. Flags override the MINIO_* environment variables.
#[derive(Debug, Parser)]
#[command(name = "minio-subpath", version, about)]
struct Cli {
    /// Proxy host[:port] in front of MinIO
    #[arg(long)]
    endpoint: Option<String>,

    #[arg(long)]
    access_key: Option<String>,

    #[arg(long)]
    secret_key: Option<String>,

    /// Path prefix the proxy routes to MinIO, e.g. /storage/
    #[arg(long)]
    base_path: Option<String>,

    #[arg(long)]
    bucket: Option<String>,

    #[arg(long)]
    object: Option<String>,

    /// Talk plain HTTP instead of HTTPS
    #[arg(long)]
    no_tls: bool,

    /// Verify the server certificate (skipped by default)
    #[arg(long)]
    verify_tls: bool,
}

impl Cli {
    fn apply(self, mut config: StorageConfig) -> StorageConfig {
        if let Some(endpoint) = self.endpoint {
            config.endpoint = endpoint;
        }
        if let Some(access_key) = self.access_key {
            config.access_key = access_key;
        }
        if let Some(secret_key) = self.secret_key {
            config.secret_key = secret_key;
        }
        if let Some(base_path) = self.base_path {
            config.base_path = base_path;
        }
        if let Some(bucket) = self.bucket {
            config.bucket = bucket;
        }
        if let Some(object) = self.object {
            config.object = object;
        }
        if self.no_tls {
            config.secure = false;
        }
        if self.verify_tls {
            config.insecure_skip_verify = false;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let cli = Cli::parse();
    let config = cli.apply(StorageConfig::from_env()?);
    info!("Configuration loaded: {:?}", config);

    let session = StorageSession::connect(config).map_err(|e| {
        error!("Failed to connect to storage: {}", e);
        e
    })?;

    let mut stdout = std::io::stdout();
    if let Err(e) = app::run(&session, &mut stdout).await {
        error!("{:#}", e);
        return Err(e);
    }

    Ok(())
}
