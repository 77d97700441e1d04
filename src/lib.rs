//! Pocketcord - bounded-memory client for a chat-service REST API.
//!
//! The crate splits into a small set of layers:
//!
//! - [`json`] - flat token index over raw response bytes (no parse tree)
//! - [`transport`] - one blocking HTTP round-trip at a time, behind a trait
//! - [`client`] - session state, capacity-bounded caches, REST operations
//! - [`config`] - config file, env overrides, token source
//!
//! The client is deliberately synchronous and single-owner: one logical
//! thread issues all operations, caches are replaced wholesale, and no
//! call spawns work that outlives it. Capacities and field limits live in
//! [`constants`].

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod json;
pub mod transport;

// Re-export commonly used types
pub use client::{ChatClient, Group, Member, Message};
pub use config::Config;
pub use error::ClientError;
