//! Application-wide constants for pocketcord.
//!
//! The bounded-memory guarantees of the client live here: cache
//! capacities, per-field byte limits, and per-response token caps. Grouped
//! by domain.

use std::time::Duration;

// ============================================================================
// HTTP
// ============================================================================

/// HTTP client request timeout for API calls.
///
/// Every operation blocks the caller until the response arrives or this
/// timeout fires; there is no other cancellation path.
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default REST base path of the chat service.
pub const API_BASE_URL: &str = "https://discord.com/api/v10";

/// Client identifier sent as the User-Agent header on every request.
pub const USER_AGENT: &str = concat!("pocketcord/", env!("CARGO_PKG_VERSION"));

/// Channel `type` code of a text channel, as the primitive appears on the
/// wire.
pub const TEXT_CHANNEL_TYPE: &[u8] = b"0";

// ============================================================================
// Cache capacities
// ============================================================================

/// Maximum messages kept per fetch; also sent as the request `limit`.
pub const MAX_MESSAGES: usize = 50;

/// Maximum groups kept from the group list.
pub const MAX_GROUPS: usize = 20;

/// Maximum members kept per fetch; also sent as the request `limit`.
pub const MAX_MEMBERS: usize = 50;

// ============================================================================
// Field byte limits
// ============================================================================
// Extracted strings are truncated to these sizes, never overflowed.

/// Entity ids (snowflakes are 17-20 ASCII digits).
pub const MAX_ID_LEN: usize = 32;

/// Message body.
pub const MAX_CONTENT_LEN: usize = 256;

/// Author display name.
pub const MAX_AUTHOR_LEN: usize = 64;

/// Group display name.
pub const MAX_NAME_LEN: usize = 64;

/// Group icon reference.
pub const MAX_ICON_LEN: usize = 128;

/// Member discriminator (at most 4 digits on the wire).
pub const MAX_DISCRIMINATOR_LEN: usize = 8;

/// Full ISO-8601 timestamp before reduction to HH:MM.
pub const MAX_TIMESTAMP_LEN: usize = 64;

/// Auth token.
pub const MAX_TOKEN_LEN: usize = 128;

// ============================================================================
// Token index capacities
// ============================================================================
// Upper bounds on the number of JSON spans a single response may produce.
// A response that needs more is rejected instead of growing without bound.

/// Profile responses are one small object.
pub const PROFILE_TOKEN_CAPACITY: usize = 128;

/// Channel list of one group.
pub const CHANNEL_TOKEN_CAPACITY: usize = 256;

/// Group list of the account.
pub const GROUP_TOKEN_CAPACITY: usize = 512;

/// Member list, one nested user object per element.
pub const MEMBER_TOKEN_CAPACITY: usize = 1024;

/// Message list, the largest response the client reads.
pub const MESSAGE_TOKEN_CAPACITY: usize = 2048;
