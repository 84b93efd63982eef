//! Request engine: cookie replay, in-flight tracking, cancellation.
//!
//! Every request of a session flows through one [`RequestEngine`]. The
//! engine owns the session's [`CookieJar`], attaches the jar to each
//! outgoing request and folds `Set-Cookie` headers from each response
//! back in, tracks which requests are currently in flight, and races
//! every transport call against a session-wide cancellation signal so
//! that teardown never waits out a long poll.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::cookies::CookieJar;
use super::{HttpError, HttpRequest, HttpResponse, HttpTransport, Method};

/// Descriptor of a request currently being executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlight {
    /// GET or POST.
    pub method: Method,
    /// Target host.
    pub host: String,
    /// Path plus query.
    pub path: String,
    /// Whether the request holds a reusable connection.
    pub keepalive: bool,
}

/// Drives all HTTP traffic for one session.
#[derive(Debug)]
pub struct RequestEngine<T> {
    transport: T,
    jar: CookieJar,
    in_flight: Mutex<HashMap<u64, InFlight>>,
    next_id: AtomicU64,
    cancelled: AtomicBool,
    shutdown: Notify,
}

/// Removes the in-flight entry exactly once, whether the request
/// completes, fails, or its future is dropped mid-await.
struct InFlightGuard<'a> {
    table: &'a Mutex<HashMap<u64, InFlight>>,
    id: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.table.lock().remove(&self.id);
    }
}

impl<T: HttpTransport> RequestEngine<T> {
    /// Creates an engine over `transport` with an empty cookie jar.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            jar: CookieJar::new(),
            in_flight: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            cancelled: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    /// The session cookie jar.
    pub const fn cookies(&self) -> &CookieJar {
        &self.jar
    }

    /// The underlying transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Executes a request with the session cookies attached, merging
    /// response cookies back into the jar.
    ///
    /// # Errors
    ///
    /// [`HttpError::Cancelled`] if [`Self::cancel_all`] was called
    /// before or during the request, [`HttpError::Status`] for any
    /// response of 400 or above, or whatever the transport reports.
    /// Redirect statuses are NOT errors; their cookies and bodies are
    /// returned like any success.
    pub async fn request(&self, mut request: HttpRequest) -> Result<HttpResponse, HttpError> {
        request.cookie = self.jar.header_value();

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.in_flight.lock().insert(
            id,
            InFlight {
                method: request.method,
                host: request.host.clone(),
                path: request.path.clone(),
                keepalive: request.keepalive,
            },
        );
        let _guard = InFlightGuard {
            table: &self.in_flight,
            id,
        };

        // Register for the shutdown signal before checking the flag so
        // a cancel_all between the check and the select cannot be lost.
        let cancelled = self.shutdown.notified();
        tokio::pin!(cancelled);
        cancelled.as_mut().enable();
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(HttpError::Cancelled);
        }

        tracing::debug!(method = %request.method, host = %request.host,
                        path = %request.path, "issuing request");

        let result = tokio::select! {
            () = &mut cancelled => Err(HttpError::Cancelled),
            result = self.transport.execute(&request) => result,
        };

        let response = result?;
        self.jar.merge(&response.set_cookies);
        if response.status >= 400 {
            tracing::warn!(status = response.status, path = %request.path,
                           "server returned error status");
            return Err(HttpError::Status(response.status));
        }
        Ok(response)
    }

    /// Cancels every in-flight request and rejects new ones until
    /// [`Self::reopen`] is called.
    pub fn cancel_all(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.shutdown.notify_waiters();
        tracing::debug!(pending = self.in_flight.lock().len(), "cancelled all requests");
    }

    /// Clears the cancellation flag so a fresh session can start.
    pub fn reopen(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    /// Snapshot of requests currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> Vec<InFlight> {
        self.in_flight.lock().values().cloned().collect()
    }
}
