//! Records cached by the chat client.
//!
//! Every string field is extracted from a response through the token index
//! and truncated against a fixed byte limit from `constants`, so a record
//! can never grow past its budget regardless of what the server sends.

/// One chat message, oldest-first in the cache after a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    /// Message body, capped at `MAX_CONTENT_LEN` bytes.
    pub content: String,
    /// Display name of the author.
    pub author: String,
    /// Short HH:MM form derived from the delivery timestamp; empty when the
    /// server sent nothing usable.
    pub timestamp: String,
}

/// One group ("server") the account belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: String,
    pub name: String,
    /// Icon reference, when the group has one.
    pub icon: Option<String>,
}

/// One member of the current group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: String,
    pub username: String,
    /// Legacy tag disambiguating identical usernames; `"0"` when absent.
    pub discriminator: String,
    /// Always true: presence needs a persistent connection this client
    /// never holds, so the REST listing is the best available answer.
    pub online: bool,
}
