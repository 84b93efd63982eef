//! HTTP transport abstraction for the Ning endpoints.
//!
//! Defines the [`HttpTransport`] trait that all transport implementations
//! must satisfy. Concrete implementations:
//! - [`web::WebTransport`] — reqwest-backed transport for real servers
//! - [`scripted::ScriptedTransport`] — canned-response double for testing
//!
//! Redirect handling is deliberately left to the caller: the sign-in
//! endpoint answers with a 302 whose `Set-Cookie` headers carry the
//! session, so a transport that followed redirects transparently would
//! lose them. Implementations return every response as-is.

pub mod cookies;
pub mod engine;
pub mod scripted;
pub mod web;

use std::fmt;

/// HTTP method of a request. The protocol only ever uses these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Idempotent fetch.
    Get,
    /// Form submission.
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// A single request as handed to a transport.
///
/// The cookie header is prebuilt by the caller; transports never
/// maintain cookie state of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// GET or POST.
    pub method: Method,
    /// Whether to use TLS. Only the credential submission requires it.
    pub secure: bool,
    /// Target host, without scheme.
    pub host: String,
    /// Path plus query string, starting with `/`.
    pub path: String,
    /// Form body for POST requests.
    pub body: Option<String>,
    /// Prebuilt `Cookie` header value.
    pub cookie: Option<String>,
    /// Whether the connection may be kept open for reuse. Long-poll
    /// requests set this; one-shot requests do not.
    pub keepalive: bool,
}

impl HttpRequest {
    /// Builds a GET request for `host`/`path`.
    #[must_use]
    pub fn get(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            secure: false,
            host: host.into(),
            path: path.into(),
            body: None,
            cookie: None,
            keepalive: false,
        }
    }

    /// Builds a POST request with a form-encoded body.
    #[must_use]
    pub fn post(host: impl Into<String>, path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            secure: false,
            host: host.into(),
            path: path.into(),
            body: Some(body.into()),
            cookie: None,
            keepalive: false,
        }
    }

    /// Switches the request to TLS.
    #[must_use]
    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    /// Marks the connection as reusable (long-poll requests).
    #[must_use]
    pub const fn keepalive(mut self) -> Self {
        self.keepalive = true;
        self
    }
}

/// A response as returned by a transport, before any policy is applied.
///
/// Redirects are NOT followed; a 3xx lands here like any other status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Raw `Set-Cookie` header values, in arrival order.
    pub set_cookies: Vec<String>,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Consumes the response, returning its body.
    ///
    /// # Errors
    ///
    /// [`HttpError::MissingBody`] if the server sent no body at all.
    pub fn into_body(self) -> Result<Vec<u8>, HttpError> {
        if self.body.is_empty() {
            return Err(HttpError::MissingBody);
        }
        Ok(self.body)
    }
}

/// Errors that can occur while executing a request.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum HttpError {
    /// The connection could not be established or broke mid-request.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The server answered with an error status (>= 400).
    #[error("server returned status {0}")]
    Status(u16),

    /// The request was cancelled by a session teardown.
    #[error("request cancelled")]
    Cancelled,

    /// A stage needed a response body and the server sent none.
    #[error("response had no body")]
    MissingBody,
}

/// Async transport trait for executing single HTTP exchanges.
///
/// Implementations perform exactly one request/response cycle per call
/// and never follow redirects, retry, or store cookies — all of that
/// policy lives in [`engine::RequestEngine`].
pub trait HttpTransport: Send + Sync {
    /// Executes one request and returns the raw response.
    fn execute(
        &self,
        request: &HttpRequest,
    ) -> impl std::future::Future<Output = Result<HttpResponse, HttpError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_builder_defaults() {
        let req = HttpRequest::get("example.com", "/main/index");
        assert_eq!(req.method, Method::Get);
        assert!(!req.secure);
        assert!(!req.keepalive);
        assert!(req.body.is_none());
    }

    #[test]
    fn post_builder_carries_body() {
        let req = HttpRequest::post("example.com", "/x", "a=1&b=2").secure();
        assert_eq!(req.method, Method::Post);
        assert!(req.secure);
        assert_eq!(req.body.as_deref(), Some("a=1&b=2"));
    }

    #[test]
    fn method_display() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Post.to_string(), "POST");
    }
}
