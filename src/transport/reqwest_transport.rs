use aws_smithy_runtime_api::client::http::{
    HttpClient, HttpConnector, HttpConnectorFuture, HttpConnectorSettings, SharedHttpConnector,
};
use aws_smithy_runtime_api::client::orchestrator::{HttpRequest, HttpResponse};
use aws_smithy_runtime_api::client::result::ConnectorError;
use aws_smithy_runtime_api::client::runtime_components::RuntimeComponents;
use aws_smithy_runtime_api::http::StatusCode;
use aws_smithy_types::body::SdkBody;
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::{debug, warn};

use crate::types::AppResult;

const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Network transport backed by a `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build the client.
    ///
    /// With `insecure_skip_verify` set, any server certificate is accepted.
    /// This is only meant for lab setups with self-signed proxies.
    pub fn new(insecure_skip_verify: bool) -> AppResult<Self> {
        if insecure_skip_verify {
            warn!("TLS certificate verification is disabled");
        }

        let client = Client::builder()
            .danger_accept_invalid_certs(insecure_skip_verify)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client })
    }

    fn build_request(&self, request: &HttpRequest) -> Result<reqwest::Request, ConnectorError> {
        let method = Method::from_bytes(request.method().as_bytes())
            .map_err(|e| ConnectorError::user(e.into()))?;

        // Bodies for bucket and object calls are always buffered in memory
        let body = request
            .body()
            .bytes()
            .ok_or_else(|| ConnectorError::user("streaming request bodies are not supported".into()))?
            .to_vec();

        let mut builder = self.client.request(method, request.uri());
        for (name, value) in request.headers().iter() {
            builder = builder.header(name, value);
        }

        builder.body(body).build().map_err(into_connector_error)
    }
}

fn into_connector_error(e: reqwest::Error) -> ConnectorError {
    if e.is_timeout() {
        ConnectorError::timeout(e.into())
    } else if e.is_connect() {
        ConnectorError::io(e.into())
    } else if e.is_builder() {
        ConnectorError::user(e.into())
    } else {
        ConnectorError::other(e.into(), None)
    }
}

async fn into_sdk_response(response: reqwest::Response) -> Result<HttpResponse, ConnectorError> {
    let status = StatusCode::try_from(response.status().as_u16())
        .map_err(|e| ConnectorError::other(e.into(), None))?;
    let headers = response.headers().clone();
    let body = response.bytes().await.map_err(into_connector_error)?;

    debug!(status = status.as_u16(), bytes = body.len(), "Received response");

    let mut sdk_response = HttpResponse::new(status, SdkBody::from(body));
    for (name, value) in headers.iter() {
        let Ok(value) = value.to_str() else {
            debug!(header = %name, "Skipping non-ASCII response header");
            continue;
        };
        sdk_response
            .headers_mut()
            .try_append(name.as_str().to_string(), value.to_string())
            .map_err(|e| ConnectorError::other(e.into(), None))?;
    }
    Ok(sdk_response)
}

impl HttpConnector for ReqwestTransport {
    fn call(&self, request: HttpRequest) -> HttpConnectorFuture {
        let request = match self.build_request(&request) {
            Ok(request) => request,
            Err(e) => return HttpConnectorFuture::ready(Err(e)),
        };
        debug!(method = %request.method(), url = %request.url(), "Sending request");

        let client = self.client.clone();
        HttpConnectorFuture::new(async move {
            let response = client.execute(request).await.map_err(into_connector_error)?;
            into_sdk_response(response).await
        })
    }
}

impl HttpClient for ReqwestTransport {
    fn http_connector(
        &self,
        _settings: &HttpConnectorSettings,
        _components: &RuntimeComponents,
    ) -> SharedHttpConnector {
        SharedHttpConnector::new(self.clone())
    }
}
