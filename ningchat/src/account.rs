//! Account controller: connect, rooms, messaging, teardown.
//!
//! One [`NingClient`] drives one account. The host consumes
//! [`AccountEvent`]s from the receiver returned by [`NingClient::new`]
//! and calls the async methods to act. Session tokens are stored
//! all-or-nothing: they are `Some` only between a successful connect
//! and the following disconnect, never partially populated.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use ningchat_proto::chat::OutgoingMessage;
use ningchat_proto::encode::{form_body, strip_markup};

use crate::auth::{self, AuthError, AuthStage, LoginOutcome};
use crate::config::ClientConfig;
use crate::contacts::{Contact, ContactDirectory};
use crate::http::engine::RequestEngine;
use crate::http::{HttpError, HttpRequest, HttpTransport};
use crate::room::{self, RoomHandle, RoomShared};

/// Events surfaced to the host UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountEvent {
    /// A login stage began.
    Progress {
        /// The stage that began.
        stage: AuthStage,
        /// One-based step number.
        step: u8,
        /// Fixed step total.
        total: u8,
    },
    /// The connection is fully established.
    Connected,
    /// The connection attempt failed; the string is the user-facing
    /// message.
    ConnectionError(String),
    /// A room was joined and its timers armed.
    RoomJoined {
        /// Room identifier.
        room_id: String,
    },
    /// A room was torn down.
    RoomLeft {
        /// Room identifier.
        room_id: String,
    },
    /// A chat message arrived.
    MessageReceived {
        /// Room the message belongs to.
        room_id: String,
        /// Sender's profile id.
        sender_id: String,
        /// Message body.
        body: String,
        /// Reconstructed full-width timestamp.
        timestamp_ms: u64,
        /// Whether this was a directed whisper rather than a broadcast.
        whisper: bool,
    },
    /// A roster row was added or refreshed.
    RosterUserUpdated {
        /// Room identifier.
        room_id: String,
        /// Profile id.
        ning_id: String,
        /// Display name.
        name: String,
        /// Room-admin flag.
        is_admin: bool,
    },
    /// A roster row was removed.
    RosterUserRemoved {
        /// Room identifier.
        room_id: String,
        /// Profile id.
        ning_id: String,
    },
    /// A placeholder contact was synthesized for an unknown sender.
    /// The host must not persist it.
    ContactSynthesized {
        /// The synthesized contact.
        contact: Contact,
    },
}

/// How long a disconnect waits for the sign-out POST before giving up.
/// Sign-out is best-effort; teardown always completes.
const SIGN_OUT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from account operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AccountError {
    /// The operation requires an established session.
    #[error("not connected")]
    NotConnected,

    /// A login stage failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// An HTTP operation outside the login sequence failed.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// A private message was addressed to a user in none of the
    /// joined rooms' rosters.
    #[error("no room shares a roster with {0}")]
    UnknownRecipient(String),
}

#[derive(Debug)]
struct ClientInner<T> {
    config: ClientConfig,
    engine: Arc<RequestEngine<T>>,
    session: Mutex<Option<LoginOutcome>>,
    rooms: Mutex<HashMap<String, RoomHandle>>,
    contacts: Arc<ContactDirectory>,
    events: mpsc::Sender<AccountEvent>,
}

/// Handle to one connected (or connecting) account.
#[derive(Debug)]
pub struct NingClient<T: HttpTransport + 'static> {
    inner: Arc<ClientInner<T>>,
}

impl<T: HttpTransport + 'static> Clone for NingClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: HttpTransport + 'static> NingClient<T> {
    /// Creates a client over `transport` and returns it with the
    /// event receiver the host should drain.
    #[must_use]
    pub fn new(config: ClientConfig, transport: T) -> (Self, mpsc::Receiver<AccountEvent>) {
        let (events, events_rx) = mpsc::channel(config.event_capacity);
        let client = Self {
            inner: Arc::new(ClientInner {
                config,
                engine: Arc::new(RequestEngine::new(transport)),
                session: Mutex::new(None),
                rooms: Mutex::new(HashMap::new()),
                contacts: Arc::new(ContactDirectory::new()),
                events,
            }),
        };
        (client, events_rx)
    }

    /// The session contact directory.
    #[must_use]
    pub fn contacts(&self) -> &ContactDirectory {
        &self.inner.contacts
    }

    /// Ids of the currently joined rooms.
    #[must_use]
    pub fn rooms(&self) -> Vec<String> {
        self.inner.rooms.lock().keys().cloned().collect()
    }

    /// Whether a session is currently established.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.session.lock().is_some()
    }

    /// Runs the login sequence and, on success, joins the room the
    /// chat server directs us to.
    ///
    /// # Errors
    ///
    /// [`AccountError::Auth`] naming the failed stage. The same
    /// message is also emitted as [`AccountEvent::ConnectionError`].
    pub async fn connect(&self) -> Result<(), AccountError> {
        let inner = &self.inner;
        let host = inner.config.host.clone().ok_or(AuthError::HostNotSet)?;
        let email = inner.config.email.clone().unwrap_or_default();
        let password = inner.config.password.clone().unwrap_or_default();

        inner.engine.reopen();
        // The site refuses logins from cookie-less clients.
        inner.engine.cookies().set("xg_cookie_check", "1");

        let events = inner.events.clone();
        let outcome = auth::login(&inner.engine, &host, &email, &password, |stage| {
            let _ = events.try_send(AccountEvent::Progress {
                stage,
                step: stage.step(),
                total: AuthStage::TOTAL_STEPS,
            });
        })
        .await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                let _ = inner
                    .events
                    .try_send(AccountEvent::ConnectionError(e.to_string()));
                return Err(e.into());
            }
        };

        tracing::info!(host = %host, ning_id = %outcome.ning_id, "connected");
        let room_id = outcome.room_id.clone();
        *inner.session.lock() = Some(outcome);
        let _ = inner.events.try_send(AccountEvent::Connected);

        if let Some(room_id) = room_id {
            self.join_room(&room_id)?;
        }
        Ok(())
    }

    /// Joins `room_id`: immediate history and roster fetches, then the
    /// two repeating timers. Joining an already-joined room is a no-op.
    ///
    /// # Errors
    ///
    /// [`AccountError::NotConnected`] without an established session.
    pub fn join_room(&self, room_id: &str) -> Result<(), AccountError> {
        let inner = &self.inner;
        let shared = {
            let session = inner.session.lock();
            let session = session.as_ref().ok_or(AccountError::NotConnected)?;
            Arc::new(RoomShared {
                engine: Arc::clone(&inner.engine),
                app_id: session.app_id.clone(),
                ning_id: session.ning_id.clone(),
                chat_domain: session.chat_domain.clone(),
                chat_token: session.chat_token.clone(),
                contacts: Arc::clone(&inner.contacts),
                events: inner.events.clone(),
            })
        };

        let mut rooms = inner.rooms.lock();
        if rooms.contains_key(room_id) {
            return Ok(());
        }
        let handle = room::join(
            &shared,
            room_id,
            inner.config.roster_refresh,
            inner.config.message_poll,
        );
        rooms.insert(room_id.to_string(), handle);
        let _ = inner.events.try_send(AccountEvent::RoomJoined {
            room_id: room_id.to_string(),
        });
        Ok(())
    }

    /// Leaves `room_id`, cancelling its timers. Unknown rooms are
    /// ignored.
    pub fn leave_room(&self, room_id: &str) {
        if let Some(handle) = self.inner.rooms.lock().remove(room_id) {
            handle.abort();
            let _ = self.inner.events.try_send(AccountEvent::RoomLeft {
                room_id: room_id.to_string(),
            });
        }
    }

    /// Sends a room-wide message.
    ///
    /// # Errors
    ///
    /// [`AccountError::NotConnected`] without a session. Transport
    /// failures are not surfaced (fire-and-forget).
    pub async fn send_message(&self, room_id: &str, text: &str) -> Result<(), AccountError> {
        self.publish(room_id, None, text).await
    }

    /// Whispers to `who` within `room_id`.
    ///
    /// # Errors
    ///
    /// [`AccountError::NotConnected`] without a session. Transport
    /// failures are not surfaced (fire-and-forget).
    pub async fn send_whisper(
        &self,
        room_id: &str,
        who: &str,
        text: &str,
    ) -> Result<(), AccountError> {
        self.publish(room_id, Some(who), text).await
    }

    /// Sends a private message to `who` by whispering through the
    /// first joined room whose roster contains them.
    ///
    /// # Errors
    ///
    /// [`AccountError::UnknownRecipient`] if no joined room lists
    /// `who`, [`AccountError::NotConnected`] without a session.
    pub async fn send_private(&self, who: &str, text: &str) -> Result<(), AccountError> {
        let room_id = {
            let rooms = self.inner.rooms.lock();
            rooms
                .values()
                .find(|handle| handle.has_user(who))
                .map(|handle| handle.room_id.clone())
        };
        let room_id = room_id.ok_or_else(|| AccountError::UnknownRecipient(who.to_string()))?;
        self.publish(&room_id, Some(who), text).await
    }

    /// Whisper primitive behind every send: `who` absent means
    /// room-wide broadcast. Message text is HTML-stripped before
    /// encoding. The publish endpoint authenticates with the site
    /// security token, not the chat token.
    async fn publish(
        &self,
        room_id: &str,
        who: Option<&str>,
        text: &str,
    ) -> Result<(), AccountError> {
        let inner = &self.inner;
        let (chat_domain, body) = {
            let session = inner.session.lock();
            let session = session.as_ref().ok_or(AccountError::NotConnected)?;

            let message = OutgoingMessage {
                room_id: room_id.to_string(),
                target_id: who.map(ToString::to_string),
                body: strip_markup(text),
                sender: session.user_descriptor(),
            };
            let body = form_body(&[
                ("a", session.app_id.as_str()),
                ("i", session.ning_id.as_str()),
                ("t", session.xg_token.as_str()),
                ("r", room_id),
                ("message", message.to_json().as_str()),
            ]);
            (session.chat_domain.clone(), body)
        };

        let request = HttpRequest::post(chat_domain, "/xn/groupchat/publish", body);
        if let Err(e) = inner.engine.request(request).await {
            tracing::warn!(room = room_id, error = %e, "message publish failed");
        }
        Ok(())
    }

    /// Changes the account's email address and password through the
    /// site's settings endpoint.
    ///
    /// # Errors
    ///
    /// [`AccountError::NotConnected`] without a session, or the
    /// transport error if the POST fails.
    pub async fn change_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(), AccountError> {
        let inner = &self.inner;
        let (host, body) = {
            let session = inner.session.lock();
            let session = session.as_ref().ok_or(AccountError::NotConnected)?;
            let host = inner.config.host.clone().ok_or(AccountError::NotConnected)?;
            let body = form_body(&[
                ("emailAddress", email),
                ("password", password),
                ("xg_token", session.xg_token.as_str()),
            ]);
            (host, body)
        };
        inner
            .engine
            .request(HttpRequest::post(host, "/profiles/settings/updateEmailAddress", body))
            .await?;
        Ok(())
    }

    /// Tears the session down: best-effort sign-out, then cancel every
    /// in-flight request, then every room, then the cookie store.
    ///
    /// The sign-out wait is bounded by [`SIGN_OUT_TIMEOUT`] so a dead
    /// server cannot stall teardown.
    pub async fn disconnect(&self) {
        let inner = &self.inner;
        let session = inner.session.lock().take();

        // Sign-out must go out before the cancel sweep or it would be
        // cancelled with everything else.
        if let (Some(session), Some(host)) = (&session, &inner.config.host) {
            let body = form_body(&[
                ("target", host.as_str()),
                ("xg_token", session.xg_token.as_str()),
            ]);
            let request = HttpRequest::post(host, "/main/authorization/signOut", body);
            match tokio::time::timeout(SIGN_OUT_TIMEOUT, inner.engine.request(request)).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::debug!(error = %e, "sign-out request failed"),
                Err(_) => tracing::debug!("sign-out request timed out"),
            }
        }

        inner.engine.cancel_all();

        let rooms: Vec<(String, RoomHandle)> = inner.rooms.lock().drain().collect();
        for (room_id, handle) in rooms {
            handle.abort();
            let _ = inner.events.try_send(AccountEvent::RoomLeft { room_id });
        }

        inner.engine.cookies().clear();
        inner.contacts.clear();
        tracing::info!("disconnected");
    }
}
