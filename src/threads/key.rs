//! Thread key derivation.
//!
//! A thread is identified by the first message-id in the `References`
//! header of a reply, or by the message's own `Message-ID` when it
//! starts a new thread. Both are hashed into a fixed width hex string
//! so the key is safe to use as a file name or row key.
//!
//! Clients that send only `In-Reply-To` name the parent message, not
//! the thread root. Each such reply then resolves to the key of its
//! parent, so a third message in that thread starts a new record and
//! is classified again. `References` is always preferred when present.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::email::EmailMessage;

/// Number of hex characters kept from the digest (64 bits).
pub const KEY_LEN: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadKey(String);

impl ThreadKey {
    /// Derive a key from a thread identity source such as a
    /// message-id. Surrounding whitespace and angle brackets are not
    /// part of the identity.
    pub fn from_source(source: &str) -> Self {
        let normalized = source
            .trim()
            .trim_start_matches('<')
            .trim_end_matches('>');
        let digest = Sha256::digest(normalized.as_bytes());
        let mut hex = hex::encode(digest);
        hex.truncate(KEY_LEN);
        Self(hex)
    }

    /// Accept a key supplied from outside (CLI, URL path). Anything
    /// outside `[A-Za-z0-9_.-]` is replaced with `_` and the result is
    /// bounded to the key width.
    pub fn parse(raw: &str) -> Self {
        let mut key = sanitize(raw.trim());
        key.truncate(KEY_LEN);
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// The token a thread is identified by: first whitespace separated
/// token of `References`, otherwise the message's own id.
pub fn thread_source(email: &EmailMessage) -> &str {
    email
        .references
        .as_deref()
        .and_then(|refs| refs.split_whitespace().next())
        .unwrap_or(&email.message_id)
}

pub fn resolve_key(email: &EmailMessage) -> ThreadKey {
    ThreadKey::from_source(thread_source(email))
}
