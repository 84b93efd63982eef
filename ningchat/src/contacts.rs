//! Contact directory with placeholder synthesis.
//!
//! Message senders must always resolve to a known contact. When a
//! message arrives from an id the directory has never seen, a
//! non-persistent placeholder is synthesized under a fixed temporary
//! group so the host UI has a row to attach the message to — and so
//! the host never saves it to the server-side contact list.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Group name for placeholder contacts synthesized from unknown
/// message senders.
pub const NING_TEMP_GROUP: &str = "Ning Temp";

/// One contact as the host's buddy list sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    /// Profile id.
    pub ning_id: String,
    /// Display name shown in the buddy list.
    pub display_name: String,
    /// Group the contact is filed under.
    pub group: String,
    /// Placeholder flag. Ephemeral contacts must never be persisted.
    pub ephemeral: bool,
}

/// Thread-safe directory of every contact known to the session.
#[derive(Debug, Default)]
pub struct ContactDirectory {
    contacts: Mutex<HashMap<String, Contact>>,
}

impl ContactDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a durable contact (one the host is allowed to persist),
    /// replacing any placeholder under the same id.
    pub fn add(&self, ning_id: impl Into<String>, display_name: impl Into<String>, group: impl Into<String>) {
        let ning_id = ning_id.into();
        self.contacts.lock().insert(
            ning_id.clone(),
            Contact {
                ning_id,
                display_name: display_name.into(),
                group: group.into(),
                ephemeral: false,
            },
        );
    }

    /// Makes sure `ning_id` resolves to a contact.
    ///
    /// Returns `Some` with the synthesized placeholder if the id was
    /// unknown, `None` if it was already present. A known contact's
    /// display name is refreshed when the caller supplies a non-empty
    /// one.
    pub fn ensure_known(&self, ning_id: &str, display_name: &str) -> Option<Contact> {
        let mut contacts = self.contacts.lock();
        if let Some(existing) = contacts.get_mut(ning_id) {
            if !display_name.is_empty() {
                existing.display_name = display_name.to_string();
            }
            return None;
        }
        let contact = Contact {
            ning_id: ning_id.to_string(),
            display_name: if display_name.is_empty() {
                ning_id.to_string()
            } else {
                display_name.to_string()
            },
            group: NING_TEMP_GROUP.to_string(),
            ephemeral: true,
        };
        contacts.insert(ning_id.to_string(), contact.clone());
        Some(contact)
    }

    /// Looks up a contact by id.
    #[must_use]
    pub fn get(&self, ning_id: &str) -> Option<Contact> {
        self.contacts.lock().get(ning_id).cloned()
    }

    /// Contacts safe to hand to the host for persistence. Placeholders
    /// are excluded.
    #[must_use]
    pub fn persistable(&self) -> Vec<Contact> {
        let mut out: Vec<Contact> = self
            .contacts
            .lock()
            .values()
            .filter(|c| !c.ephemeral)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.ning_id.cmp(&b.ning_id));
        out
    }

    /// Drops everything. Used on session teardown.
    pub fn clear(&self) {
        self.contacts.lock().clear();
    }
}
