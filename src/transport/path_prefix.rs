//! Path-rewriting transport decorator
//!
//! Routes every request through a reverse-proxy subpath by prepending a fixed
//! prefix to the request path. The SDK signs requests before they reach the
//! HTTP client, so the proxy must strip the prefix again before forwarding to
//! the storage backend.

use aws_smithy_runtime_api::client::http::{
    HttpClient, HttpConnector, HttpConnectorFuture, HttpConnectorSettings, SharedHttpClient,
    SharedHttpConnector,
};
use aws_smithy_runtime_api::client::orchestrator::HttpRequest;
use aws_smithy_runtime_api::client::result::ConnectorError;
use aws_smithy_runtime_api::client::runtime_components::RuntimeComponents;
use tracing::debug;
use url::Url;

/// Concatenate `prefix` and `path` verbatim.
///
/// No slash normalisation happens here: a prefix of `/storage/` and a path of
/// `/bucket` yields `/storage//bucket`, which is what the proxy expects to strip.
pub fn prefixed_path(prefix: &str, path: &str) -> String {
    let mut out = String::with_capacity(prefix.len() + path.len());
    out.push_str(prefix);
    out.push_str(path);
    out
}

/// Rewrite the path of an absolute request URI, leaving scheme, authority and
/// query untouched.
fn rewrite_uri(uri: &str, prefix: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(uri)?;
    let path = prefixed_path(prefix, url.path());
    url.set_path(&path);
    Ok(url.into())
}

/// `HttpClient` that hands out [`PathPrefixConnector`]s around the inner
/// client's connectors
#[derive(Debug, Clone)]
pub struct PathPrefixTransport {
    inner: SharedHttpClient,
    prefix: String,
}

impl PathPrefixTransport {
    pub fn new(inner: impl HttpClient + 'static, prefix: impl Into<String>) -> Self {
        Self {
            inner: SharedHttpClient::new(inner),
            prefix: prefix.into(),
        }
    }
}

impl HttpClient for PathPrefixTransport {
    fn http_connector(
        &self,
        settings: &HttpConnectorSettings,
        components: &RuntimeComponents,
    ) -> SharedHttpConnector {
        let inner = self.inner.http_connector(settings, components);
        SharedHttpConnector::new(PathPrefixConnector::new(inner, self.prefix.clone()))
    }
}

#[derive(Debug, Clone)]
pub struct PathPrefixConnector {
    inner: SharedHttpConnector,
    prefix: String,
}

impl PathPrefixConnector {
    pub fn new(inner: SharedHttpConnector, prefix: impl Into<String>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }
}

impl HttpConnector for PathPrefixConnector {
    fn call(&self, mut request: HttpRequest) -> HttpConnectorFuture {
        let rewritten = match rewrite_uri(request.uri(), &self.prefix) {
            Ok(uri) => uri,
            Err(e) => return HttpConnectorFuture::ready(Err(ConnectorError::user(e.into()))),
        };
        debug!(method = request.method(), from = request.uri(), to = %rewritten, "Rewriting request path");

        if let Err(e) = request.set_uri(rewritten) {
            return HttpConnectorFuture::ready(Err(ConnectorError::user(e.into())));
        }
        self.inner.call(request)
    }
}
