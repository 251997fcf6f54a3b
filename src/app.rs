// Runs the session operations in order and reports each step

use std::io::Write;

use anyhow::Context;
use tracing::info;

use crate::session::{BucketStatus, StorageSession};

/// Ensure the bucket, upload the payload, then print the GET and PUT URLs.
///
/// Stops at the first failing step. Status lines go to `out`.
pub async fn run<W: Write>(session: &StorageSession, out: &mut W) -> anyhow::Result<()> {
    let config = session.config();

    match session
        .ensure_bucket()
        .await
        .with_context(|| format!("Failed to create bucket {}", config.bucket))?
    {
        BucketStatus::Created => writeln!(out, "Successfully created bucket {}", config.bucket)?,
        BucketStatus::AlreadyExists => writeln!(out, "Bucket {} already exists", config.bucket)?,
    }

    writeln!(out, "{:?}", session)?;

    let upload = session
        .upload_fixed_content()
        .await
        .with_context(|| format!("Failed to upload {}/{}", config.bucket, config.object))?;
    writeln!(
        out,
        "Successfully uploaded {} to {}/{}",
        upload.key, upload.bucket, upload.key
    )?;

    let get_url = session
        .create_get_url()
        .await
        .context("Failed to presign GET URL")?;
    writeln!(out, "Presigned GET URL:\n {}", get_url.url)?;

    let put_url = session
        .create_put_url()
        .await
        .context("Failed to presign PUT URL")?;
    writeln!(out, "Presigned PUT URL:\n {}", put_url.url)?;

    info!(
        get_intact = get_url.signature_intact,
        put_intact = put_url.signature_intact,
        "All storage operations completed"
    );
    Ok(())
}
