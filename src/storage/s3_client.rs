// Path-style S3 client on the AWS SDK, dispatching through a pluggable HTTP client

use async_trait::async_trait;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{
    BehaviorVersion, Credentials, Region, RequestChecksumCalculation, ResponseChecksumValidation,
    SharedHttpClient,
};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use bytes::Bytes;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::{ObjectStore, UploadInfo};
use crate::types::{AppError, AppResult};

/// S3's legacy region; creating a bucket there takes no location body
const LEGACY_GLOBAL_REGION: &str = "us-east-1";

const CREDENTIALS_PROVIDER_NAME: &str = "minio-subpath";

pub struct S3Client {
    client: Client,
}

/// Parse a bare `host[:port]` into an endpoint URL.
///
/// Parsing lowercases the host and drops a port that matches the scheme's
/// default, so `Host.Example:443` over TLS becomes `https://host.example`.
pub fn normalize_endpoint(endpoint: &str, secure: bool) -> AppResult<Url> {
    let scheme = if secure { "https" } else { "http" };
    let url = Url::parse(&format!("{}://{}", scheme, endpoint))?;

    if url.path() != "/" || url.query().is_some() {
        return Err(AppError::Config(format!(
            "endpoint {:?} must be a bare host[:port] without a path",
            endpoint
        )));
    }
    Ok(url)
}

impl S3Client {
    /// `endpoint` is a bare `host[:port]`; the scheme comes from `secure`.
    ///
    /// Every request and presign is signed for `region`.
    pub fn new(
        endpoint: &str,
        secure: bool,
        access_key: &str,
        secret_key: &str,
        region: &str,
        http_client: SharedHttpClient,
    ) -> AppResult<Self> {
        let endpoint_url = normalize_endpoint(endpoint, secure)?;

        let credentials = Credentials::new(
            access_key,
            secret_key,
            None,
            None,
            CREDENTIALS_PROVIDER_NAME,
        );

        let config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(endpoint_url.as_str().trim_end_matches('/'))
            .credentials_provider(credentials)
            .force_path_style(true)
            .region(Region::new(region.to_string()))
            .retry_config(RetryConfig::disabled())
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired)
            .http_client(http_client)
            .build();

        info!(endpoint = %endpoint_url, region = %region, "S3 client initialized");

        Ok(Self {
            client: Client::from_conf(config),
        })
    }
}

/// Map an SDK failure onto `AppError`, keeping the S3 error code when the
/// backend sent one.
fn map_sdk_error<E>(err: SdkError<E, HttpResponse>) -> AppError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    match err.code() {
        Some(code) => AppError::S3 {
            status,
            code: code.to_string(),
            message: err.message().unwrap_or_default().to_string(),
        },
        None => AppError::Sdk(DisplayErrorContext(&err).to_string()),
    }
}

fn presigning_config(expiry: Duration) -> AppResult<PresigningConfig> {
    PresigningConfig::expires_in(expiry)
        .map_err(|e| AppError::InvalidArgument(format!("presign expiry {:?}: {}", expiry, e)))
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn make_bucket(&self, bucket: &str, region: &str) -> AppResult<()> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if !region.is_empty() && region != LEGACY_GLOBAL_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        request.send().await.map_err(map_sdk_error)?;
        debug!(bucket = %bucket, region = %region, "Bucket created");
        Ok(())
    }

    async fn bucket_exists(&self, bucket: &str) -> AppResult<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let not_found = err.as_service_error().is_some_and(|e| e.is_not_found())
                    || err.raw_response().is_some_and(|r| r.status().as_u16() == 404);
                if not_found {
                    Ok(false)
                } else {
                    Err(map_sdk_error(err))
                }
            }
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> AppResult<UploadInfo> {
        let size = body.len();
        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(map_sdk_error)?;

        Ok(UploadInfo {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size,
            etag: output.e_tag().map(|etag| etag.trim_matches('"').to_string()),
        })
    }

    async fn presigned_put_object(&self, bucket: &str, key: &str, expiry: Duration) -> AppResult<Url> {
        let presigned = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning_config(expiry)?)
            .await
            .map_err(map_sdk_error)?;
        Ok(Url::parse(presigned.uri())?)
    }

    async fn presigned_get_object(&self, bucket: &str, key: &str, expiry: Duration) -> AppResult<Url> {
        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning_config(expiry)?)
            .await
            .map_err(map_sdk_error)?;
        Ok(Url::parse(presigned.uri())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{PathPrefixTransport, ReqwestTransport};
    use mockito::Matcher;

    fn client_for(endpoint: &str, prefix: &str) -> S3Client {
        let transport = PathPrefixTransport::new(ReqwestTransport::new(false).unwrap(), prefix);
        S3Client::new(
            endpoint,
            false,
            "minio",
            "minio-secret",
            "us-east-2",
            SharedHttpClient::new(transport),
        )
        .unwrap()
    }

    fn direct_http() -> SharedHttpClient {
        SharedHttpClient::new(ReqwestTransport::new(false).unwrap())
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("Host.Example", true).unwrap().as_str(), "https://host.example/");
        assert_eq!(normalize_endpoint("host.example:443", true).unwrap().as_str(), "https://host.example/");
        assert_eq!(normalize_endpoint("host.example:443", false).unwrap().as_str(), "http://host.example:443/");
        assert_eq!(normalize_endpoint("10.0.0.5:9000", false).unwrap().as_str(), "http://10.0.0.5:9000/");
    }

    #[test]
    fn test_rejects_endpoint_with_path() {
        let result = S3Client::new("host.example/storage", true, "a", "b", "us-east-2", direct_http());
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_rejects_empty_endpoint() {
        let result = S3Client::new("", true, "a", "b", "us-east-2", direct_http());
        assert!(matches!(result, Err(AppError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_make_bucket_goes_through_prefix_and_is_signed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/proxy/test2")
            .match_query(Matcher::Any)
            .match_header(
                "authorization",
                Matcher::Regex(
                    r"^AWS4-HMAC-SHA256 Credential=minio/\d{8}/us-east-2/s3/aws4_request, SignedHeaders=\S*host\S*, Signature=[0-9a-f]{64}$"
                        .to_string(),
                ),
            )
            .match_body(Matcher::Regex(
                "<LocationConstraint>us-east-2</LocationConstraint>".to_string(),
            ))
            .with_status(200)
            .create_async()
            .await;

        let client = client_for(&server.host_with_port(), "/proxy");
        client.make_bucket("test2", "us-east-2").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_make_bucket_in_legacy_region_sends_no_location() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/proxy/test2")
            .match_query(Matcher::Any)
            .match_body(Matcher::Exact(String::new()))
            .with_status(200)
            .create_async()
            .await;

        let client = client_for(&server.host_with_port(), "/proxy");
        client.make_bucket("test2", "us-east-1").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_make_bucket_surfaces_s3_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("PUT", "/proxy/test2")
            .match_query(Matcher::Any)
            .with_status(409)
            .with_header("content-type", "application/xml")
            .with_body(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
                 <Error><Code>BucketAlreadyOwnedByYou</Code>\
                 <Message>Your previous request to create the named bucket succeeded and you already own it.</Message>\
                 </Error>",
            )
            .create_async()
            .await;

        let client = client_for(&server.host_with_port(), "/proxy");
        let err = client.make_bucket("test2", "us-east-2").await.unwrap_err();

        match err {
            AppError::S3 { status, code, .. } => {
                assert_eq!(status, Some(409));
                assert_eq!(code, "BucketAlreadyOwnedByYou");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bucket_exists_maps_status() {
        let mut server = mockito::Server::new_async().await;
        let _present = server
            .mock("HEAD", "/proxy/present")
            .match_query(Matcher::Any)
            .with_status(200)
            .create_async()
            .await;
        let _missing = server
            .mock("HEAD", "/proxy/missing")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;
        let _denied = server
            .mock("HEAD", "/proxy/denied")
            .match_query(Matcher::Any)
            .with_status(403)
            .create_async()
            .await;

        let client = client_for(&server.host_with_port(), "/proxy");

        assert!(client.bucket_exists("present").await.unwrap());
        assert!(!client.bucket_exists("missing").await.unwrap());
        assert!(client.bucket_exists("denied").await.is_err());
    }

    #[tokio::test]
    async fn test_put_object_sends_payload_and_reads_etag() {
        let payload = "Hello, World! ltcloud upload test by edward!!!";
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/proxy/test2/test4.txt")
            .match_query(Matcher::Any)
            .match_header("content-type", "text/plain")
            .match_body(payload)
            .with_status(200)
            .with_header("etag", "\"9b2cf535f27731c974343645a3985328\"")
            .create_async()
            .await;

        let client = client_for(&server.host_with_port(), "/proxy");
        let info = client
            .put_object("test2", "test4.txt", Bytes::from_static(payload.as_bytes()), "text/plain")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(info.bucket, "test2");
        assert_eq!(info.key, "test4.txt");
        assert_eq!(info.size, payload.len());
        assert_eq!(info.etag.as_deref(), Some("9b2cf535f27731c974343645a3985328"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_sdk_error() {
        let client = client_for("127.0.0.1:1", "/proxy");
        let err = client.bucket_exists("test2").await.unwrap_err();
        assert!(matches!(err, AppError::Sdk(_)));
    }

    #[tokio::test]
    async fn test_presigned_urls_are_local_and_signed_for_bucket_region() {
        let client = client_for("host.example", "/storage/");
        let expiry = Duration::from_secs(7 * 24 * 3600);

        let put = client.presigned_put_object("test2", "test4.txt", expiry).await.unwrap();
        let get = client.presigned_get_object("test2", "test4.txt", expiry).await.unwrap();

        // Presigning never goes through the HTTP client, so no prefix here
        for url in [&put, &get] {
            assert_eq!(url.host_str(), Some("host.example"));
            assert_eq!(url.path(), "/test2/test4.txt");
            let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
            let param = |name: &str| query.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str());
            assert_eq!(param("X-Amz-Algorithm"), Some("AWS4-HMAC-SHA256"));
            assert_eq!(param("X-Amz-Expires"), Some("604800"));
            assert!(param("X-Amz-Credential").unwrap().ends_with("/us-east-2/s3/aws4_request"));
            assert_eq!(param("X-Amz-Signature").map(str::len), Some(64));
        }
        assert_ne!(put.query(), get.query());
    }

    #[tokio::test]
    async fn test_presign_rejects_expiry_over_a_week() {
        let client = client_for("host.example", "/storage/");
        let err = client
            .presigned_get_object("test2", "test4.txt", Duration::from_secs(7 * 24 * 3600 + 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }
}
