//! The login sequence, from credential POST to chat-server login.
//!
//! Five stages run in strict order, each gated on the previous HTTP
//! round-trip. There is no branching back and no per-stage retry: any
//! stage failure terminates the connection attempt with one
//! human-readable message.

use ningchat_proto::chat;
use ningchat_proto::encode::{form_body, percent_encode};
use ningchat_proto::scrape::{self, ScrapeError};
use ningchat_proto::user::UserDescriptor;

use crate::http::cookies::IDENTITY_COOKIE_PREFIX;
use crate::http::engine::RequestEngine;
use crate::http::{HttpError, HttpRequest, HttpTransport};

/// Fixed host that assigns a chat domain per network.
pub const REDIRECTOR_HOST: &str = "chat01.ningim.com";

/// The stages of the login sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    /// POST credentials to the sign-in endpoint over TLS.
    CredentialSubmit,
    /// Scan the jar for the identity cookie, then fetch the homepage.
    CookieScan,
    /// Scrape the profile block and security token from the homepage.
    ProfileScrape,
    /// Ask the redirector for this network's chat domain.
    ChatServerRedirect,
    /// Log into the assigned chat domain.
    ChatLogin,
}

impl AuthStage {
    /// Number of steps shown in the connection-progress UI.
    pub const TOTAL_STEPS: u8 = 5;

    /// One-based step number for progress reporting.
    #[must_use]
    pub const fn step(self) -> u8 {
        match self {
            Self::CredentialSubmit => 1,
            Self::CookieScan => 2,
            Self::ProfileScrape => 3,
            Self::ChatServerRedirect => 4,
            Self::ChatLogin => 5,
        }
    }

    /// Progress label. Each label announces the fetch the stage leads
    /// into, matching the strings the host UI has always shown.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CredentialSubmit => "Logging in",
            Self::CookieScan => "Fetching token",
            Self::ProfileScrape => "Fetching chat server",
            Self::ChatServerRedirect => "Logging into chat",
            Self::ChatLogin => "Joining public chat",
        }
    }
}

/// Terminal login failures. The display strings are surfaced verbatim
/// to the host's connection-error UI.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    /// No hostname configured for the account.
    #[error("Host not set")]
    HostNotSet,

    /// Credential rejection, a failed chat login, or any failure at
    /// the credential-submit stage. Deliberately indistinguishable
    /// from a network error at that stage.
    #[error("Could not log on")]
    CouldNotLogOn,

    /// No identity cookie appeared after the credential POST, so the
    /// application id cannot be derived.
    #[error("application id cookie not found")]
    AppIdNotFound,

    /// Homepage scrape failure ("NingID not found" / "xgToken not found").
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    /// Transport failure on a stage past credential submission.
    #[error(transparent)]
    Http(#[from] HttpError),
}

/// Everything a successful login yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    /// Application id, taken from the identity cookie's name suffix.
    pub app_id: String,
    /// The account's profile id.
    pub ning_id: String,
    /// The account's display name.
    pub display_name: String,
    /// Thumbnail-decorated profile icon URL.
    pub icon_url: String,
    /// Security token scraped from the homepage.
    pub xg_token: String,
    /// Chat domain assigned by the redirector.
    pub chat_domain: String,
    /// Chat-session token from the chat login.
    pub chat_token: String,
    /// Room the chat server directs the client to join.
    pub room_id: Option<String>,
}

impl LoginOutcome {
    /// The account's own user descriptor as sent to the chat servers.
    #[must_use]
    pub fn user_descriptor(&self) -> UserDescriptor {
        UserDescriptor {
            name: self.display_name.clone(),
            icon_url: self.icon_url.clone(),
            is_admin: false,
            ning_id: self.ning_id.clone(),
            is_nc: false,
        }
    }
}

/// Runs the full login sequence against `host`.
///
/// `on_progress` fires exactly once per stage, in order, as the stage
/// begins.
///
/// # Errors
///
/// [`AuthError`] naming the failed stage's user-facing message. Any
/// failure at the credential-submit stage, including transport errors,
/// collapses into [`AuthError::CouldNotLogOn`].
pub async fn login<T: HttpTransport>(
    engine: &RequestEngine<T>,
    host: &str,
    email: &str,
    password: &str,
    on_progress: impl Fn(AuthStage),
) -> Result<LoginOutcome, AuthError> {
    if host.is_empty() {
        return Err(AuthError::HostNotSet);
    }

    // Stage 1: credential POST over TLS. The session cookies arrive on
    // the redirect response.
    on_progress(AuthStage::CredentialSubmit);
    let path = format!("/main/authorization/doSignIn?target=http%3A%2F%2F{host}");
    let body = form_body(&[("xg_token", ""), ("emailAddress", email), ("password", password)]);
    engine
        .request(HttpRequest::post(host, path, body).secure())
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "credential submission failed");
            AuthError::CouldNotLogOn
        })?;

    // Stage 2: the identity cookie's name suffix is the application id.
    on_progress(AuthStage::CookieScan);
    let app_id = engine
        .cookies()
        .name_suffix(IDENTITY_COOKIE_PREFIX)
        .ok_or(AuthError::AppIdNotFound)?;
    let page = engine
        .request(HttpRequest::get(host, "/"))
        .await?
        .into_body()?;

    // Stage 3: scrape the profile block and security token.
    on_progress(AuthStage::ProfileScrape);
    let page = String::from_utf8_lossy(&page);
    let profile = scrape::extract_profile(&page)?;
    let xg_token = scrape::extract_xg_token(&page)?;

    // Stage 4: ask the redirector for a chat domain. A failed or
    // malformed response is tolerated here; the chat login below then
    // fails for lack of a domain.
    on_progress(AuthStage::ChatServerRedirect);
    let redirect_path = format!("/xn/redirector/redirect?a={}", percent_encode(&app_id));
    let chat_domain = match engine.request(HttpRequest::get(REDIRECTOR_HOST, redirect_path)).await {
        Ok(response) => chat::decode_chat_domain(&response.body),
        Err(HttpError::Cancelled) => return Err(AuthError::Http(HttpError::Cancelled)),
        Err(e) => {
            tracing::warn!(error = %e, "chat redirector unreachable");
            None
        }
    };

    // Stage 5: log into the assigned chat domain.
    on_progress(AuthStage::ChatLogin);
    let chat_domain = chat_domain.ok_or(AuthError::CouldNotLogOn)?;
    let user = UserDescriptor {
        name: profile.display_name.clone(),
        icon_url: profile.icon_url.clone(),
        is_admin: false,
        ning_id: profile.ning_id.clone(),
        is_nc: false,
    };
    let composite = format!("{app_id}{}", profile.ning_id);
    let body = form_body(&[
        ("a", app_id.as_str()),
        ("t", composite.as_str()),
        ("i", profile.ning_id.as_str()),
        ("user", user.to_json().as_str()),
    ]);
    let response = engine
        .request(HttpRequest::post(&chat_domain, "/xn/presence/login", body))
        .await?;
    let ack = chat::decode_chat_login(&response.into_body()?)
        .map_err(|_| AuthError::CouldNotLogOn)?;
    if !ack.is_ok() {
        return Err(AuthError::CouldNotLogOn);
    }
    let chat_token = ack.token.ok_or(AuthError::CouldNotLogOn)?;

    Ok(LoginOutcome {
        app_id,
        ning_id: profile.ning_id,
        display_name: profile.display_name,
        icon_url: profile.icon_url,
        xg_token,
        chat_domain,
        chat_token,
        room_id: ack.room_id,
    })
}
