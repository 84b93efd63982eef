//! Chat room sessions: roster refresh, message polling, history.
//!
//! A joined room runs three background tasks: a one-shot history
//! fetch, a roster refresh on a 60-second period (first fire
//! immediate), and a message poll on a 180-second period (first fire
//! after one period, since the history fetch covers the join moment).
//! The two timers are independent and may interleave arbitrarily;
//! each updates disjoint or overwrite-idempotent state. A failed tick
//! produces no update and no user-visible error.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval, interval_at};

use ningchat_proto::chat::{self, Delivery, MessageBatch, NULL_HASH, RosterDelta};
use ningchat_proto::encode::percent_encode;
use ningchat_proto::time::{now_millis, reconstruct_millis};

use crate::account::AccountEvent;
use crate::contacts::ContactDirectory;
use crate::http::engine::RequestEngine;
use crate::http::{HttpError, HttpRequest, HttpTransport};

/// One roster member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    /// Display name, refreshed on every roster snapshot.
    pub name: String,
    /// Room-admin flag.
    pub is_admin: bool,
}

/// A single roster mutation, reported so the host UI can re-render
/// exactly the touched rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterChange {
    /// User added or refreshed.
    Updated {
        /// Profile id.
        ning_id: String,
        /// Current display name.
        name: String,
        /// Room-admin flag.
        is_admin: bool,
    },
    /// User left or expired.
    Removed {
        /// Profile id.
        ning_id: String,
    },
}

/// Mutable per-room state shared by the room's tasks.
#[derive(Debug)]
pub struct RoomState {
    /// Server-issued dedup hash, sent back on roster and history
    /// fetches. Starts as the literal string `"null"`.
    ning_hash: String,
    roster: HashMap<String, RosterEntry>,
}

impl Default for RoomState {
    fn default() -> Self {
        Self {
            ning_hash: NULL_HASH.to_string(),
            roster: HashMap::new(),
        }
    }
}

impl RoomState {
    /// Creates the pre-join state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current dedup hash.
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.ning_hash
    }

    /// Whether `ning_id` is currently in the roster.
    #[must_use]
    pub fn contains(&self, ning_id: &str) -> bool {
        self.roster.contains_key(ning_id)
    }

    /// Number of roster members.
    #[must_use]
    pub fn roster_len(&self) -> usize {
        self.roster.len()
    }

    /// Replaces the hash if the response carried one. An absent hash
    /// never reverts the stored value.
    pub fn apply_hash(&mut self, hash: Option<&str>) {
        if let Some(hash) = hash {
            self.ning_hash = hash.to_string();
        }
    }

    /// Applies one roster response and returns the touched rows.
    ///
    /// Expired ids are removed unconditionally. A non-empty `users`
    /// array is a full snapshot: the roster is cleared and rebuilt,
    /// and members absent from the snapshot are reported removed. An
    /// empty `users` array carries no roster information and leaves
    /// the membership untouched.
    pub fn apply_roster(&mut self, delta: &RosterDelta) -> Vec<RosterChange> {
        self.apply_hash(delta.hash.as_deref());
        let mut changes = Vec::new();

        for ning_id in &delta.expired {
            if self.roster.remove(ning_id).is_some() {
                changes.push(RosterChange::Removed {
                    ning_id: ning_id.clone(),
                });
            }
        }

        if delta.users.is_empty() {
            return changes;
        }

        let old = std::mem::take(&mut self.roster);
        for user in &delta.users {
            self.roster.insert(
                user.ning_id.clone(),
                RosterEntry {
                    name: user.name.clone(),
                    is_admin: user.is_admin,
                },
            );
            changes.push(RosterChange::Updated {
                ning_id: user.ning_id.clone(),
                name: user.name.clone(),
                is_admin: user.is_admin,
            });
        }
        for ning_id in old.into_keys() {
            if !self.roster.contains_key(&ning_id) {
                changes.push(RosterChange::Removed { ning_id });
            }
        }
        changes
    }
}

/// Session-wide values the room tasks need on every fetch.
#[derive(Debug)]
pub(crate) struct RoomShared<T> {
    pub engine: Arc<RequestEngine<T>>,
    pub app_id: String,
    pub ning_id: String,
    pub chat_domain: String,
    pub chat_token: String,
    pub contacts: Arc<ContactDirectory>,
    pub events: mpsc::Sender<AccountEvent>,
}

/// A joined room: shared state plus its background tasks.
#[derive(Debug)]
pub struct RoomHandle {
    /// Room identifier on the chat servers.
    pub room_id: String,
    state: Arc<Mutex<RoomState>>,
    tasks: Vec<JoinHandle<()>>,
}

impl RoomHandle {
    /// Current dedup hash, for inspection.
    #[must_use]
    pub fn hash(&self) -> String {
        self.state.lock().hash().to_string()
    }

    /// Whether `ning_id` is currently in this room's roster.
    #[must_use]
    pub fn has_user(&self, ning_id: &str) -> bool {
        self.state.lock().contains(ning_id)
    }

    /// Stops both timers and any fetch still running. In-flight
    /// requests are swept by the session-level cancel, not here.
    pub fn abort(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Joins a room: fires the initial history and roster fetches and arms
/// the two repeating timers.
pub(crate) fn join<T: HttpTransport + 'static>(
    shared: &Arc<RoomShared<T>>,
    room_id: &str,
    roster_period: Duration,
    poll_period: Duration,
) -> RoomHandle {
    let state = Arc::new(Mutex::new(RoomState::new()));
    tracing::info!(room = room_id, "joining room");

    let history = {
        let shared = Arc::clone(shared);
        let state = Arc::clone(&state);
        let room_id = room_id.to_string();
        tokio::spawn(async move {
            let _ = fetch_messages(&shared, &state, &room_id, true).await;
        })
    };

    let roster = {
        let shared = Arc::clone(shared);
        let state = Arc::clone(&state);
        let room_id = room_id.to_string();
        tokio::spawn(async move {
            let mut timer = interval(roster_period);
            loop {
                timer.tick().await;
                if !roster_tick(&shared, &state, &room_id).await {
                    break;
                }
            }
        })
    };

    let poll = {
        let shared = Arc::clone(shared);
        let state = Arc::clone(&state);
        let room_id = room_id.to_string();
        tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + poll_period, poll_period);
            loop {
                timer.tick().await;
                if !fetch_messages(&shared, &state, &room_id, false).await {
                    break;
                }
            }
        })
    };

    RoomHandle {
        room_id: room_id.to_string(),
        state,
        tasks: vec![history, roster, poll],
    }
}

/// One roster refresh. Returns `false` when the session is being torn
/// down and the timer loop should stop.
async fn roster_tick<T: HttpTransport>(
    shared: &RoomShared<T>,
    state: &Mutex<RoomState>,
    room_id: &str,
) -> bool {
    let hash = state.lock().hash().to_string();
    let path = format!(
        "/xn/presence/list?h={}&a={}&i={}&t={}&r={}",
        percent_encode(&hash),
        percent_encode(&shared.app_id),
        percent_encode(&shared.ning_id),
        percent_encode(&shared.chat_token),
        percent_encode(room_id),
    );

    let response = match shared
        .engine
        .request(HttpRequest::get(&shared.chat_domain, path))
        .await
    {
        Ok(response) => response,
        Err(HttpError::Cancelled) => return false,
        Err(e) => {
            tracing::debug!(room = room_id, error = %e, "roster refresh skipped");
            return true;
        }
    };

    match chat::decode_roster(&response.body) {
        Ok(delta) => {
            let changes = state.lock().apply_roster(&delta);
            for change in changes {
                let event = match change {
                    RosterChange::Updated {
                        ning_id,
                        name,
                        is_admin,
                    } => AccountEvent::RosterUserUpdated {
                        room_id: room_id.to_string(),
                        ning_id,
                        name,
                        is_admin,
                    },
                    RosterChange::Removed { ning_id } => AccountEvent::RosterUserRemoved {
                        room_id: room_id.to_string(),
                        ning_id,
                    },
                };
                let _ = shared.events.try_send(event);
            }
        }
        Err(e) => {
            tracing::debug!(room = room_id, error = %e, "undecodable roster response");
        }
    }
    true
}

/// One message fetch, shared by the initial history fetch
/// (`with_hash`) and the repeating poll (without). Returns `false`
/// when the session is being torn down.
async fn fetch_messages<T: HttpTransport>(
    shared: &RoomShared<T>,
    state: &Mutex<RoomState>,
    room_id: &str,
    with_hash: bool,
) -> bool {
    let path = if with_hash {
        let hash = state.lock().hash().to_string();
        format!(
            "/xn/groupchat/list?h={}&a={}&i={}&t={}&r={}",
            percent_encode(&hash),
            percent_encode(&shared.app_id),
            percent_encode(&shared.ning_id),
            percent_encode(&shared.chat_token),
            percent_encode(room_id),
        )
    } else {
        format!(
            "/xn/groupchat/poll?a={}&i={}&t={}&r={}",
            percent_encode(&shared.app_id),
            percent_encode(&shared.ning_id),
            percent_encode(&shared.chat_token),
            percent_encode(room_id),
        )
    };

    let response = match shared
        .engine
        .request(HttpRequest::get(&shared.chat_domain, path).keepalive())
        .await
    {
        Ok(response) => response,
        Err(HttpError::Cancelled) => return false,
        Err(e) => {
            tracing::debug!(room = room_id, error = %e, "message fetch skipped");
            return true;
        }
    };

    match chat::decode_message_batch(&response.body) {
        Ok(batch) => {
            state.lock().apply_hash(batch.hash.as_deref());
            deliver_batch(shared, room_id, &batch);
        }
        Err(e) => {
            tracing::debug!(room = room_id, error = %e, "undecodable message response");
        }
    }
    true
}

/// Delivers decoded messages in array order, synthesizing placeholder
/// contacts for unknown senders first.
fn deliver_batch<T>(shared: &RoomShared<T>, room_id: &str, batch: &MessageBatch) {
    if batch.skipped > 0 {
        tracing::debug!(room = room_id, skipped = batch.skipped, "skipped malformed messages");
    }
    for message in &batch.messages {
        if let Some(contact) = shared
            .contacts
            .ensure_known(&message.sender_id, &message.sender_name)
        {
            let _ = shared
                .events
                .try_send(AccountEvent::ContactSynthesized { contact });
        }

        let Some(kind) = message.delivery() else {
            tracing::debug!(room = room_id, kind = %message.kind, "ignoring unknown message type");
            continue;
        };
        let _ = shared.events.try_send(AccountEvent::MessageReceived {
            room_id: room_id.to_string(),
            sender_id: message.sender_id.clone(),
            body: message.body.clone(),
            timestamp_ms: reconstruct_millis(message.date, now_millis()),
            whisper: kind == Delivery::Whisper,
        });
    }
}
