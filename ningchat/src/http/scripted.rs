//! Scripted transport double for testing.
//!
//! Routes are registered per `(host, path prefix)` with a queue of
//! outcomes. Each matching request pops the next outcome; the final
//! outcome in a queue repeats forever, so a single registration covers
//! a periodic fetch. Every executed request is recorded for assertion.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{HttpError, HttpRequest, HttpResponse, HttpTransport};

/// What a scripted route does when matched.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Return this response.
    Respond(HttpResponse),
    /// Fail with this error.
    Fail(HttpError),
    /// Never complete. Used to exercise cancellation.
    Hang,
}

#[derive(Debug)]
struct Route {
    host: String,
    path_prefix: String,
    outcomes: VecDeque<Outcome>,
}

/// In-process transport that answers from a script.
///
/// Clones share routes and the request recording, so a test can keep
/// a handle for assertions after moving the transport into a client.
#[derive(Debug, Default, Clone)]
pub struct ScriptedTransport {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    /// Creates a transport with no routes. Unmatched requests fail
    /// with [`HttpError::Connect`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an outcome for requests whose host equals `host` and
    /// whose path starts with `path_prefix`.
    pub fn script(&self, host: &str, path_prefix: &str, outcome: Outcome) {
        let mut routes = self.inner.routes.lock();
        if let Some(route) = routes
            .iter_mut()
            .find(|r| r.host == host && r.path_prefix == path_prefix)
        {
            route.outcomes.push_back(outcome);
        } else {
            routes.push(Route {
                host: host.to_string(),
                path_prefix: path_prefix.to_string(),
                outcomes: VecDeque::from([outcome]),
            });
        }
    }

    /// Queues a 200 response with the given body.
    pub fn respond(&self, host: &str, path_prefix: &str, body: impl Into<Vec<u8>>) {
        self.script(
            host,
            path_prefix,
            Outcome::Respond(HttpResponse {
                status: 200,
                set_cookies: Vec::new(),
                body: body.into(),
            }),
        );
    }

    /// Queues an arbitrary-status response with `Set-Cookie` headers.
    pub fn respond_with(
        &self,
        host: &str,
        path_prefix: &str,
        status: u16,
        set_cookies: &[&str],
        body: impl Into<Vec<u8>>,
    ) {
        self.script(
            host,
            path_prefix,
            Outcome::Respond(HttpResponse {
                status,
                set_cookies: set_cookies.iter().map(ToString::to_string).collect(),
                body: body.into(),
            }),
        );
    }

    /// Queues a transport-level failure.
    pub fn fail(&self, host: &str, path_prefix: &str, error: HttpError) {
        self.script(host, path_prefix, Outcome::Fail(error));
    }

    /// Queues an outcome that never completes.
    pub fn hang(&self, host: &str, path_prefix: &str) {
        self.script(host, path_prefix, Outcome::Hang);
    }

    /// All requests executed so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.inner.requests.lock().clone()
    }

    /// Requests whose path starts with `path_prefix`.
    #[must_use]
    pub fn requests_to(&self, path_prefix: &str) -> Vec<HttpRequest> {
        self.inner
            .requests
            .lock()
            .iter()
            .filter(|r| r.path.starts_with(path_prefix))
            .cloned()
            .collect()
    }

    fn next_outcome(&self, request: &HttpRequest) -> Option<Outcome> {
        let mut routes = self.inner.routes.lock();
        // Longest prefix wins, so a broad "/" route never shadows a
        // more specific one regardless of registration order.
        let route = routes
            .iter_mut()
            .filter(|r| r.host == request.host && request.path.starts_with(&r.path_prefix))
            .max_by_key(|r| r.path_prefix.len())?;
        // The last outcome repeats so one registration serves a
        // periodic fetch.
        if route.outcomes.len() > 1 {
            route.outcomes.pop_front()
        } else {
            route.outcomes.front().cloned()
        }
    }
}

impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        self.inner.requests.lock().push(request.clone());
        match self.next_outcome(request) {
            Some(Outcome::Respond(response)) => Ok(response),
            Some(Outcome::Fail(error)) => Err(error),
            Some(Outcome::Hang) => std::future::pending().await,
            None => Err(HttpError::Connect(format!(
                "no scripted response for {} {}{}",
                request.method, request.host, request.path
            ))),
        }
    }
}
