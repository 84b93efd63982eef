//! Session cookie jar.
//!
//! Cookies are the only session state the web endpoints recognize. The
//! jar is a plain name/value map: the Ning servers never rely on
//! `Path`, `Domain`, or expiry attributes for the cookies the client
//! cares about, so attributes are parsed off and dropped.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Prefix of the per-network identity cookie. The full name is this
/// prefix followed by the network's application id.
pub const IDENTITY_COOKIE_PREFIX: &str = "xn_id_";

/// Thread-safe cookie store shared by every request of a session.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: Mutex<HashMap<String, String>>,
}

impl CookieJar {
    /// Creates an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a cookie, replacing any previous value under the same name.
    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.lock().insert(name.into(), value.into());
    }

    /// Returns the value of a cookie, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        self.cookies.lock().get(name).cloned()
    }

    /// Merges `Set-Cookie` header values into the jar. Later values
    /// win over earlier ones within the same response, and everything
    /// after the first `;` (attributes) is ignored.
    pub fn merge(&self, set_cookies: &[String]) {
        let mut cookies = self.cookies.lock();
        for header in set_cookies {
            let pair = header.split(';').next().unwrap_or(header);
            if let Some((name, value)) = pair.split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    cookies.insert(name.to_string(), value.trim().to_string());
                }
            }
        }
    }

    /// Builds a `Cookie` request header value, or `None` if the jar is
    /// empty.
    #[must_use]
    pub fn header_value(&self) -> Option<String> {
        let cookies = self.cookies.lock();
        if cookies.is_empty() {
            return None;
        }
        let mut pairs: Vec<String> = cookies.iter().map(|(k, v)| format!("{k}={v}")).collect();
        // Stable ordering keeps request logs and tests deterministic.
        pairs.sort_unstable();
        Some(pairs.join("; "))
    }

    /// Finds the first cookie whose name starts with `prefix` and
    /// returns the remainder of the name.
    #[must_use]
    pub fn name_suffix(&self, prefix: &str) -> Option<String> {
        self.cookies
            .lock()
            .keys()
            .find_map(|name| name.strip_prefix(prefix).map(ToString::to_string))
    }

    /// Drops every cookie. Used on session teardown.
    pub fn clear(&self) {
        self.cookies.lock().clear();
    }

    /// Number of cookies currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.lock().len()
    }

    /// Whether the jar holds no cookies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.lock().is_empty()
    }
}
