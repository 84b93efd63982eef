//! reqwest-backed transport for real Ning servers.

use std::time::Duration;

use reqwest::header::{CONNECTION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use reqwest::redirect::Policy;

use super::{HttpError, HttpRequest, HttpResponse, HttpTransport, Method};

/// Upper bound on establishing a connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Upper bound on a whole request/response exchange. A silent server
/// surfaces as [`HttpError::Connect`] instead of stalling its stage.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP transport over a shared [`reqwest::Client`].
///
/// Redirects are never followed and no cookie store is enabled: the
/// sign-in endpoint delivers its session cookies on a 302, and those
/// must reach the request engine's jar rather than vanish into an
/// automatic redirect hop.
#[derive(Debug, Clone)]
pub struct WebTransport {
    client: reqwest::Client,
}

impl WebTransport {
    /// Creates the transport.
    ///
    /// # Errors
    ///
    /// [`HttpError::Connect`] if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| HttpError::Connect(e.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpTransport for WebTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        let scheme = if request.secure { "https" } else { "http" };
        let url = format!("{scheme}://{}{}", request.host, request.path);

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        if let Some(cookie) = &request.cookie {
            builder = builder.header(COOKIE, cookie);
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body.clone());
        }
        if !request.keepalive {
            builder = builder.header(CONNECTION, "close");
        }

        let response = builder
            .send()
            .await
            .map_err(|e| HttpError::Connect(e.to_string()))?;

        let status = response.status().as_u16();
        let set_cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(ToString::to_string))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| HttpError::Connect(e.to_string()))?
            .to_vec();

        Ok(HttpResponse {
            status,
            set_cookies,
            body,
        })
    }
}
