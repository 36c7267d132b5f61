//! HTTP transport seam and its default implementation.
//!
//! Client crates describe each exchange as an [`HttpRequest`] and hand it to
//! a [`Transport`]. The transport owns connection management and TLS; it does
//! not interpret response statuses, which belong to the caller's
//! error-translation step.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{ClientBuilder, Method, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

/// Default request timeout (seconds).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Default connect timeout (seconds).
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// A single outbound HTTP exchange, built per call and discarded after
/// dispatch.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Host the request is addressed to.
    pub host: String,
    /// Path and query, starting with `/`.
    pub path: String,
    /// Complete header set to send.
    pub headers: HeaderMap,
    /// Serialized request payload, if any.
    pub body: Option<Vec<u8>>,
}

/// The response to an [`HttpRequest`].
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body text; stays `""` when the service sent no body.
    pub body: String,
}

impl HttpResponse {
    /// Returns true for statuses below 300.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.as_u16() < 300
    }
}

/// Abstraction over the HTTP transport.
///
/// Implementations must be safe for concurrent use; callers may have several
/// exchanges in flight on one transport handle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and returns the response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns an error only when no response was received (connect failure,
    /// timeout, protocol error).
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Builder for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportBuilder {
    timeout: Duration,
    connect_timeout: Duration,
}

impl HttpTransportBuilder {
    /// Create a builder with default timeouts.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Build the transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the underlying HTTP client cannot be
    /// constructed.
    pub fn build(self) -> Result<HttpTransport> {
        let http = ClientBuilder::new()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(|err| Error::ConfigError(format!("failed to build HTTP client: {err}")))?;

        Ok(HttpTransport { http })
    }
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Default [`Transport`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Construct a transport with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the underlying HTTP client cannot be
    /// constructed.
    pub fn new() -> Result<Self> {
        HttpTransportBuilder::new().build()
    }

    /// Start a builder to override timeouts.
    #[must_use]
    pub const fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::new()
    }
}

// Bare hosts default to https; an explicit scheme is honored.
fn request_url(host: &str, path: &str) -> Result<Url> {
    let url = if host.contains("://") {
        Url::parse(&format!("{host}{path}"))
    } else {
        Url::parse(&format!("https://{host}{path}"))
    };
    url.map_err(|err| Error::ConfigError(format!("invalid request URL: {err}")))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = request_url(&request.host, &request.path)?;
        debug!(method = %request.method, url = %url, "dispatching request");

        let mut builder = self.http.request(request.method, url).headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn request_url_defaults_to_https() {
        let url = request_url("contoso.example.net", "/devices?api-version=1").unwrap();
        assert_eq!(
            url.as_str(),
            "https://contoso.example.net/devices?api-version=1"
        );
    }

    #[test]
    fn request_url_honors_explicit_scheme() {
        let url = request_url("http://127.0.0.1:8080", "/jobs").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/jobs");
    }

    #[test]
    fn request_url_rejects_garbage_host() {
        let err = request_url("not a host", "/x").unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn builder_overrides_timeouts() {
        let builder = HttpTransport::builder()
            .with_timeout(Duration::from_secs(5))
            .with_connect_timeout(Duration::from_secs(1));
        assert_eq!(builder.timeout, Duration::from_secs(5));
        assert_eq!(builder.connect_timeout, Duration::from_secs(1));
        builder.build().unwrap();
    }

    #[tokio::test]
    async fn execute_transfers_request_and_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(query_param("api-version", "test"))
            .and(header("x-probe", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
            .expect(1)
            .mount(&server)
            .await;

        let mut headers = HeaderMap::new();
        headers.insert("x-probe", HeaderValue::from_static("1"));

        let transport = HttpTransport::new().unwrap();
        let response = transport
            .execute(HttpRequest {
                method: Method::GET,
                host: server.uri(),
                path: "/ping?api-version=test".to_string(),
                headers,
                body: None,
            })
            .await
            .unwrap();

        assert_eq!(response.status.as_u16(), 200);
        assert!(response.is_success());
        assert_eq!(response.body, "pong");
    }

    #[tokio::test]
    async fn execute_returns_empty_body_as_empty_string() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/devices/d1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let transport = HttpTransport::new().unwrap();
        let response = transport
            .execute(HttpRequest {
                method: Method::DELETE,
                host: server.uri(),
                path: "/devices/d1".to_string(),
                headers: HeaderMap::new(),
                body: None,
            })
            .await
            .unwrap();

        assert_eq!(response.body, "");
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn execute_does_not_interpret_error_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/devices/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new().unwrap();
        let response = transport
            .execute(HttpRequest {
                method: Method::GET,
                host: server.uri(),
                path: "/devices/missing".to_string(),
                headers: HeaderMap::new(),
                body: None,
            })
            .await
            .unwrap();

        assert_eq!(response.status.as_u16(), 404);
        assert!(!response.is_success());
        assert_eq!(response.body, "nope");
    }

    #[tokio::test]
    async fn mock_transport_returns_canned_response() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .withf(|request| request.path == "/devices?api-version=test")
            .times(1)
            .returning(|_| {
                Ok(HttpResponse {
                    status: StatusCode::OK,
                    headers: HeaderMap::new(),
                    body: "[]".to_string(),
                })
            });

        let response = mock
            .execute(HttpRequest {
                method: Method::GET,
                host: "contoso.example.net".to_string(),
                path: "/devices?api-version=test".to_string(),
                headers: HeaderMap::new(),
                body: None,
            })
            .await
            .unwrap();

        assert_eq!(response.body, "[]");
    }
}
