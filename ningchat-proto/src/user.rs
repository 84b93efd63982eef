//! The user descriptor exchanged with the chat servers.

use serde_json::{Map, Value, json};

use crate::json::{self, FieldError};

/// A user as the chat servers describe one.
///
/// Unset string fields serialize as empty strings — the dialect never
/// uses JSON null or omits a key in a user descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDescriptor {
    /// Display name.
    pub name: String,
    /// Profile icon URL.
    pub icon_url: String,
    /// Whether the user is a room admin.
    pub is_admin: bool,
    /// Opaque profile id.
    pub ning_id: String,
    /// Whether the user is connecting through the network console.
    pub is_nc: bool,
}

impl UserDescriptor {
    /// Builds the JSON value in the site's dialect. The admin and NC
    /// flags serialize as `"0"`/`"1"` strings, matching what the chat
    /// login endpoint expects.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({
            "name": self.name,
            "iconUrl": self.icon_url,
            "isAdmin": if self.is_admin { "1" } else { "0" },
            "ningId": self.ning_id,
            "isNC": if self.is_nc { "1" } else { "0" },
        })
    }

    /// Serializes to the JSON string placed (after percent-encoding)
    /// into `user=` form parameters.
    #[must_use]
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }

    /// Decodes a descriptor from a JSON object.
    ///
    /// `ningId` is required; name and icon default to empty strings and
    /// the flags to `false`, per the empty-string substitution rule.
    /// The flags are accepted as either bools or `"0"`/`"1"` strings —
    /// the roster endpoint sends bools, the outgoing dialect strings.
    ///
    /// # Errors
    ///
    /// [`FieldError::Missing`] if `ningId` is absent, or
    /// [`FieldError::TypeMismatch`] for malformed fields.
    pub fn from_object(obj: &Map<String, Value>) -> Result<Self, FieldError> {
        Ok(Self {
            name: json::opt_str_field(obj, "name").unwrap_or_default().to_string(),
            icon_url: json::opt_str_field(obj, "iconUrl").unwrap_or_default().to_string(),
            is_admin: json::flag_field(obj, "isAdmin")?,
            ning_id: json::str_field(obj, "ningId")?.to_string(),
            is_nc: json::flag_field(obj, "isNC")?,
        })
    }

    /// Decodes a descriptor from raw JSON bytes.
    ///
    /// # Errors
    ///
    /// See [`UserDescriptor::from_object`]; additionally
    /// [`FieldError::Parse`] for invalid JSON.
    pub fn from_json(bytes: &[u8]) -> Result<Self, FieldError> {
        Self::from_object(&json::parse_object(bytes)?)
    }
}
