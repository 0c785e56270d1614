//! Partnership configuration carried by each message.
//!
//! Partnership storage and matching live outside this crate; hosts resolve
//! the partnership and attach it before dispatch.

use std::collections::BTreeMap;

use bincode::{Decode, Encode};

/// Identity key holding a partner's AS2 identifier.
pub const AS2_ID: &str = "as2_id";

/// Two trading endpoints and the options agreed between them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode)]
pub struct Partnership {
    /// Configured partnership name, when matched.
    pub name: Option<String>,
    /// Identifiers of the sending side (for example `as2_id`).
    pub sender_ids: BTreeMap<String, String>,
    /// Identifiers of the receiving side.
    pub receiver_ids: BTreeMap<String, String>,
    /// Delivery and algorithm options.
    pub attributes: BTreeMap<String, String>,
}

impl Partnership {
    /// Build a partnership from sender and receiver AS2 identifiers.
    #[must_use]
    pub fn between(sender: impl Into<String>, receiver: impl Into<String>) -> Self {
        let mut partnership = Self::default();
        partnership.sender_ids.insert(AS2_ID.to_owned(), sender.into());
        partnership
            .receiver_ids
            .insert(AS2_ID.to_owned(), receiver.into());
        partnership
    }

    /// The sender's AS2 identifier.
    #[must_use]
    pub fn sender_as2_id(&self) -> Option<&str> { self.sender_ids.get(AS2_ID).map(String::as_str) }

    /// The receiver's AS2 identifier.
    #[must_use]
    pub fn receiver_as2_id(&self) -> Option<&str> {
        self.receiver_ids.get(AS2_ID).map(String::as_str)
    }

    /// Look up a partnership attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}
