//! The AS2 message envelope passed through the processor.
//!
//! A [`Message`] is owned by whichever module is currently handling it and
//! is passed by mutable reference through a single sequential dispatch.

use std::collections::BTreeMap;

use bincode::{Decode, Encode};
use chrono::Utc;

use crate::partnership::Partnership;

/// Ordered, multi-valued header list with case-insensitive lookup.
///
/// ```
/// use as2relay::message::Headers;
///
/// let mut headers = Headers::default();
/// headers.append("Received", "a");
/// headers.append("received", "b");
/// assert_eq!(headers.get("RECEIVED"), Some("a"));
/// assert_eq!(headers.get_all("Received").collect::<Vec<_>>(), ["a", "b"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    /// Append a header, keeping any existing values for the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Replace every value of `name` with a single `value`.
    ///
    /// The new value takes the position of the first existing entry, or is
    /// appended when the header was absent.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter().position(|(n, _)| n.eq_ignore_ascii_case(&name)) {
            Some(first) => {
                self.0[first] = (name.clone(), value);
                let mut index = 0;
                self.0.retain(|(n, _)| {
                    let keep = index <= first || !n.eq_ignore_ascii_case(&name);
                    index += 1;
                    keep
                });
            }
            None => self.0.push((name, value)),
        }
    }

    /// Return the first value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> { self.get_all(name).next() }

    /// Iterate every value for `name` in insertion order.
    pub fn get_all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> {
        self.0
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Remove every value for `name`, returning how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.0.len();
        self.0.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        before - self.0.len()
    }

    /// Returns true if at least one value exists for `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool { self.get(name).is_some() }

    /// Iterate all `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of header entries, counting repeated names separately.
    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        )
    }
}

/// Message disposition notification attached to a message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode)]
pub struct Mdn {
    /// Identifier of the MDN itself.
    pub message_id: String,
    /// Headers of the MDN transport.
    pub headers: Headers,
    /// Disposition attributes such as `disposition` or `mic`.
    pub attributes: BTreeMap<String, String>,
    /// Human-readable report text.
    pub text: String,
}

/// Mutable AS2 message envelope.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct Message {
    id: String,
    /// Transport and MIME headers.
    pub headers: Headers,
    /// Processing attributes keyed by name.
    pub attributes: BTreeMap<String, String>,
    /// Partnership the message travels under.
    pub partnership: Partnership,
    /// Raw message content.
    pub payload: Vec<u8>,
    /// Receipt returned for, or requested by, this message.
    pub mdn: Option<Mdn>,
}

impl Message {
    /// Create an empty message for `partnership` with a generated identifier.
    #[must_use]
    pub fn new(partnership: Partnership) -> Self {
        let id = generate_message_id(&partnership);
        Self::with_id(id, partnership)
    }

    /// Create an empty message with an explicit identifier.
    #[must_use]
    pub fn with_id(id: impl Into<String>, partnership: Partnership) -> Self {
        Self {
            id: id.into(),
            headers: Headers::default(),
            attributes: BTreeMap::new(),
            partnership,
            payload: Vec::new(),
            mdn: None,
        }
    }

    /// Unique message identifier.
    #[must_use]
    pub fn id(&self) -> &str { &self.id }

    /// Short context string used in log lines.
    #[must_use]
    pub fn log_id(&self) -> String { format!("message {}", self.id) }

    /// Set a processing attribute, returning the previous value.
    pub fn set_attribute(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.attributes.insert(key.into(), value.into())
    }

    /// Look up a processing attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

fn generate_message_id(partnership: &Partnership) -> String {
    let stamp = Utc::now().format("%d%m%Y%H%M%S%z");
    let unique = uuid::Uuid::new_v4().simple();
    let sender = partnership.sender_as2_id().unwrap_or("unknown");
    let receiver = partnership.receiver_as2_id().unwrap_or("unknown");
    format!("<as2relay-{stamp}-{unique}@{sender}_{receiver}>")
}
