//! Decoders for the chat endpoints and the outgoing message encoder.
//!
//! The polling path (`poll`, `list`, `presence/list`) decodes
//! best-effort: whatever fields parse are applied, absent fields mean
//! "no update". The login-path decoders (`presence/login`, redirector)
//! are stricter, since their failures are stage-fatal.

use serde_json::{Value, json};

use crate::json::{self, FieldError};
use crate::user::UserDescriptor;

/// Wire value of the room-broadcast message type.
pub const TYPE_BROADCAST: &str = "message";

/// Wire value of the directed-whisper message type.
pub const TYPE_WHISPER: &str = "private";

/// Sentinel value of a room's dedup hash before the server has issued
/// one. Sent literally as `h=null` on the first roster/history fetch.
pub const NULL_HASH: &str = "null";

/// How an inbound message should be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Room-wide broadcast.
    Broadcast,
    /// Directed whisper to the local user.
    Whisper,
}

/// One message from a `poll` or `list` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// The raw `type` field; see [`InboundMessage::delivery`].
    pub kind: String,
    /// Message body text.
    pub body: String,
    /// Server timestamp, truncated to 32 bits on the wire.
    pub date: i64,
    /// Room the message belongs to.
    pub room_id: String,
    /// Target of a whisper, absent for broadcasts.
    pub target_id: Option<String>,
    /// Sender's profile id.
    pub sender_id: String,
    /// Sender's display name.
    pub sender_name: String,
}

impl InboundMessage {
    /// Maps the wire `type` to a delivery kind. Unrecognized values
    /// yield `None`; the caller logs and drops those.
    #[must_use]
    pub fn delivery(&self) -> Option<Delivery> {
        match self.kind.as_str() {
            TYPE_BROADCAST => Some(Delivery::Broadcast),
            TYPE_WHISPER => Some(Delivery::Whisper),
            _ => None,
        }
    }
}

/// Decoded `poll`/`list` response: an optional hash replacement plus
/// the messages that parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBatch {
    /// New dedup hash, if the response carried one.
    pub hash: Option<String>,
    /// Messages in server order.
    pub messages: Vec<InboundMessage>,
    /// Count of array entries skipped because required fields were
    /// missing or mistyped.
    pub skipped: usize,
}

/// Decodes a `poll` or `list` response body.
///
/// Individual malformed messages are skipped (counted in
/// [`MessageBatch::skipped`]), not fatal.
///
/// # Errors
///
/// Returns [`FieldError`] only if the payload is not a JSON object.
pub fn decode_message_batch(bytes: &[u8]) -> Result<MessageBatch, FieldError> {
    let obj = json::parse_object(bytes)?;
    let mut batch = MessageBatch {
        hash: json::opt_str_field(&obj, "hash").map(ToString::to_string),
        ..MessageBatch::default()
    };

    for entry in json::opt_array_field(&obj, "messages") {
        let Some(msg) = entry.as_object() else {
            batch.skipped += 1;
            continue;
        };
        let decoded = (|| -> Result<InboundMessage, FieldError> {
            let sender = json::object_field(msg, "sender")?;
            Ok(InboundMessage {
                kind: json::str_field(msg, "type")?.to_string(),
                body: json::str_field(msg, "body")?.to_string(),
                date: json::int_field(msg, "date").unwrap_or(0),
                room_id: json::opt_str_field(msg, "roomId").unwrap_or_default().to_string(),
                target_id: json::opt_str_field(msg, "targetId").map(ToString::to_string),
                sender_id: json::str_field(sender, "ningId")?.to_string(),
                sender_name: json::opt_str_field(sender, "name").unwrap_or_default().to_string(),
            })
        })();
        match decoded {
            Ok(m) => batch.messages.push(m),
            Err(_) => batch.skipped += 1,
        }
    }

    Ok(batch)
}

/// One roster entry from a `presence/list` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterUser {
    /// Profile id.
    pub ning_id: String,
    /// Display name.
    pub name: String,
    /// Room-admin flag.
    pub is_admin: bool,
}

/// Decoded `presence/list` response.
///
/// A non-empty `users` vector is a full roster snapshot; an empty one
/// carries no roster information at all (the wire format cannot
/// distinguish "everyone left" from "nothing to report", and this
/// decoder deliberately preserves that ambiguity).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterDelta {
    /// New dedup hash, if the response carried one.
    pub hash: Option<String>,
    /// Ids whose presence expired since the last fetch.
    pub expired: Vec<String>,
    /// Full roster snapshot when non-empty.
    pub users: Vec<RosterUser>,
}

/// Decodes a `presence/list` response body.
///
/// # Errors
///
/// Returns [`FieldError`] only if the payload is not a JSON object;
/// malformed entries within the arrays are skipped.
pub fn decode_roster(bytes: &[u8]) -> Result<RosterDelta, FieldError> {
    let obj = json::parse_object(bytes)?;
    let mut delta = RosterDelta {
        hash: json::opt_str_field(&obj, "hash").map(ToString::to_string),
        ..RosterDelta::default()
    };

    for entry in json::opt_array_field(&obj, "expired") {
        if let Some(id) = entry.as_str() {
            delta.expired.push(id.to_string());
        }
    }

    for entry in json::opt_array_field(&obj, "users") {
        let Some(user) = entry.as_object() else { continue };
        let Ok(ning_id) = json::str_field(user, "ningId") else { continue };
        delta.users.push(RosterUser {
            ning_id: ning_id.to_string(),
            name: json::opt_str_field(user, "name").unwrap_or_default().to_string(),
            is_admin: json::flag_field(user, "isAdmin").unwrap_or(false),
        });
    }

    Ok(delta)
}

/// Decoded `presence/login` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLoginAck {
    /// `"ok"` on success; anything else is a rejection.
    pub result: String,
    /// Chat-session token, present on success.
    pub token: Option<String>,
    /// Room the server directs the client to join.
    pub room_id: Option<String>,
}

impl ChatLoginAck {
    /// Whether the server accepted the chat login.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.result == "ok"
    }
}

/// Decodes a `presence/login` response body.
///
/// # Errors
///
/// Returns [`FieldError`] if the payload is not a JSON object or
/// lacks the `result` field.
pub fn decode_chat_login(bytes: &[u8]) -> Result<ChatLoginAck, FieldError> {
    let obj = json::parse_object(bytes)?;
    Ok(ChatLoginAck {
        result: json::str_field(&obj, "result")?.to_string(),
        token: json::opt_str_field(&obj, "token").map(ToString::to_string),
        room_id: json::opt_str_field(&obj, "roomId").map(ToString::to_string),
    })
}

/// Decodes the redirector's chat-domain assignment.
///
/// Missing or malformed responses simply yield `None`; the subsequent
/// chat login fails for lack of a domain rather than here.
#[must_use]
pub fn decode_chat_domain(bytes: &[u8]) -> Option<String> {
    let obj = json::parse_object(bytes).ok()?;
    json::opt_str_field(&obj, "domain").map(ToString::to_string)
}

/// An outgoing chat message before encoding.
///
/// A set `target_id` makes this a whisper; `None` is a room-wide
/// broadcast (serialized with an explicit `"targetId": null`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Destination room.
    pub room_id: String,
    /// Whisper target, `None` for broadcast.
    pub target_id: Option<String>,
    /// Plain-text body (markup already stripped by the caller).
    pub body: String,
    /// The sending user's descriptor.
    pub sender: UserDescriptor,
}

impl OutgoingMessage {
    /// Serializes to the JSON string placed (after percent-encoding)
    /// into the `message=` form parameter.
    #[must_use]
    pub fn to_json(&self) -> String {
        let kind = if self.target_id.is_some() { TYPE_WHISPER } else { TYPE_BROADCAST };
        json!({
            "roomId": self.room_id,
            "type": kind,
            "targetId": self.target_id.as_deref().map_or(Value::Null, Into::into),
            "body": self.body,
            "sender": self.sender.to_value(),
        })
        .to_string()
    }
}
