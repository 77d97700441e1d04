//! Typed failure modes for the client core.
//!
//! The transport, the token index, and the client's own preconditions fail
//! in distinguishable ways; callers that only care about pass/fail can
//! treat the enum as opaque, callers that retry or prompt can match on it.

use thiserror::Error;

use crate::json::JsonError;
use crate::transport::TransportError;

/// Everything a client operation can fail with.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Operation requires an established session.
    #[error("not connected")]
    NotConnected,

    /// Operation requires a selected text channel, and none has been
    /// discovered for the current group.
    #[error("no text channel selected")]
    NoTextChannel,

    /// Operation requires a current group.
    #[error("no group selected")]
    NoGroup,

    /// Refusing to send an empty message.
    #[error("message text is empty")]
    EmptyMessage,

    /// The profile response parsed but carried no `id` field, meaning the
    /// server did not accept the token.
    #[error("authentication rejected by the server")]
    AuthRejected,

    /// The server answered with a non-success status code.
    #[error("server returned HTTP status {0}")]
    Status(u16),

    /// The response parsed but did not have the expected shape.
    #[error("response was not {0}")]
    UnexpectedBody(&'static str),

    /// The request itself failed (connect, TLS, timeout).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response bytes could not be tokenized.
    #[error(transparent)]
    Parse(#[from] JsonError),
}
