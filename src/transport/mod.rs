//! HTTP layer plugged into the S3 SDK
//!
//! The SDK builds and signs requests, then hands them to whatever
//! `HttpClient` its config carries. [`ReqwestTransport`] does the actual
//! network I/O; [`PathPrefixTransport`] wraps it and rewrites each request
//! path after signing so traffic is routed through a reverse-proxy subpath.

pub mod path_prefix;
pub mod reqwest_transport;

pub use path_prefix::{prefixed_path, PathPrefixConnector, PathPrefixTransport};
pub use reqwest_transport::ReqwestTransport;
