//! Chat-service REST client.
//!
//! [`ChatClient`] owns the session state: the auth token, the currently
//! selected group and text channel, and three capacity-bounded caches
//! (messages, groups, members). Every operation is synchronous and issues
//! one blocking round-trip (`connect` and `switch_group` issue two), walks
//! the token index over the response bytes, and replaces its target cache
//! wholesale. A failed operation leaves its cache untouched; no operation
//! retries or spawns work that outlives the call.
//!
//! The struct is built for a single owner thread. Nothing here is safe for
//! concurrent mutation; serialize operations externally if you need more
//! than one caller.

mod types;

pub use types::{Group, Member, Message};

use zeroize::Zeroize;

use crate::constants;
use crate::error::ClientError;
use crate::json::{self, TokenIndex, TokenKind};
use crate::transport::{Method, Transport};

/// Client state plus the transport it issues requests through.
pub struct ChatClient {
    transport: Box<dyn Transport>,
    base_url: String,
    token: String,
    connected: bool,
    current_group_id: String,
    current_channel_id: String,
    messages: Vec<Message>,
    groups: Vec<Group>,
    members: Vec<Member>,
}

impl ChatClient {
    /// Creates a disconnected client. `base_url` is the REST base path
    /// without a trailing slash.
    pub fn new(base_url: impl Into<String>, transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            token: String::new(),
            connected: false,
            current_group_id: String::new(),
            current_channel_id: String::new(),
            messages: Vec::new(),
            groups: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Id of the currently selected group; empty before the first
    /// successful group fetch.
    pub fn current_group_id(&self) -> &str {
        &self.current_group_id
    }

    /// Id of the discovered text channel; empty exactly when no usable
    /// text channel is known for the current group.
    pub fn current_channel_id(&self) -> &str {
        &self.current_channel_id
    }

    /// Cached messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Stores the token and verifies it by fetching the caller's own
    /// profile; the session is connected iff the response parses and
    /// carries an `id` field. On success the group list is fetched, the
    /// first group becomes current, and channel discovery runs for it -
    /// all best-effort: a session with no groups or no text channel is
    /// valid, it just cannot fetch or send messages yet.
    pub fn connect(&mut self, token: &str) -> Result<(), ClientError> {
        self.token = json::truncate_utf8(token.trim(), constants::MAX_TOKEN_LEN);

        let body = self.request(Method::Get, "/users/@me", None)?;
        let index = TokenIndex::parse(&body, constants::PROFILE_TOKEN_CAPACITY)?;
        if index.find_key(0, "id").is_none() {
            return Err(ClientError::AuthRejected);
        }
        self.connected = true;

        if let Err(err) = self.fetch_groups() {
            log::warn!("initial group fetch failed: {err}");
        }
        if let Some(group_id) = self.groups.first().map(|g| g.id.clone()) {
            self.current_group_id = group_id;
            match self.discover_text_channel() {
                Ok(Some(channel_id)) => self.current_channel_id = channel_id,
                Ok(None) => log::warn!("group {} has no text channel", self.current_group_id),
                Err(err) => log::warn!("channel discovery failed: {err}"),
            }
        }
        Ok(())
    }

    /// Fetches the most recent messages of the current text channel and
    /// replaces the message cache, oldest first. Fails fast, without a
    /// network call, when disconnected or no channel is selected.
    pub fn fetch_messages(&mut self) -> Result<(), ClientError> {
        if !self.connected {
            return Err(ClientError::NotConnected);
        }
        if self.current_channel_id.is_empty() {
            return Err(ClientError::NoTextChannel);
        }

        let path = format!(
            "/channels/{}/messages?limit={}",
            self.current_channel_id,
            constants::MAX_MESSAGES
        );
        let body = self.request(Method::Get, &path, None)?;
        let index = TokenIndex::parse(&body, constants::MESSAGE_TOKEN_CAPACITY)?;
        if index.root().kind != TokenKind::Array {
            return Err(ClientError::UnexpectedBody("a message array"));
        }

        let mut fetched = Vec::with_capacity(constants::MAX_MESSAGES);
        for element in index.children(0) {
            if fetched.len() >= constants::MAX_MESSAGES {
                break;
            }
            if index.token(element).kind != TokenKind::Object {
                break;
            }
            // "id" is the one required field; elements without it are skipped.
            let Some(id) = index
                .find_key(element, "id")
                .and_then(|i| index.string(i, constants::MAX_ID_LEN).ok())
            else {
                continue;
            };
            let content = index
                .find_key(element, "content")
                .and_then(|i| index.string(i, constants::MAX_CONTENT_LEN).ok())
                .unwrap_or_default();
            let timestamp = index
                .find_key(element, "timestamp")
                .and_then(|i| index.string(i, constants::MAX_TIMESTAMP_LEN).ok())
                .and_then(|iso| short_time(&iso))
                .unwrap_or_default();
            let author = index
                .find_key(element, "author")
                .filter(|&a| index.token(a).kind == TokenKind::Object)
                .and_then(|a| index.find_key(a, "username"))
                .and_then(|u| index.string(u, constants::MAX_AUTHOR_LEN).ok())
                .unwrap_or_default();
            fetched.push(Message {
                id,
                content,
                author,
                timestamp,
            });
        }

        // The API delivers newest first; the cache keeps oldest at index 0.
        fetched.reverse();
        self.messages = fetched;
        Ok(())
    }

    /// Fetches the caller's group list and replaces the group cache.
    /// Elements missing id or name are skipped.
    pub fn fetch_groups(&mut self) -> Result<(), ClientError> {
        if !self.connected {
            return Err(ClientError::NotConnected);
        }

        let body = self.request(Method::Get, "/users/@me/guilds", None)?;
        let index = TokenIndex::parse(&body, constants::GROUP_TOKEN_CAPACITY)?;
        if index.root().kind != TokenKind::Array {
            return Err(ClientError::UnexpectedBody("a group array"));
        }

        let mut fetched = Vec::with_capacity(constants::MAX_GROUPS);
        for element in index.children(0) {
            if fetched.len() >= constants::MAX_GROUPS {
                break;
            }
            if index.token(element).kind != TokenKind::Object {
                break;
            }
            let id = index
                .find_key(element, "id")
                .and_then(|i| index.string(i, constants::MAX_ID_LEN).ok());
            let name = index
                .find_key(element, "name")
                .and_then(|i| index.string(i, constants::MAX_NAME_LEN).ok());
            let (Some(id), Some(name)) = (id, name) else {
                continue;
            };
            let icon = index
                .find_key(element, "icon")
                .and_then(|i| index.string(i, constants::MAX_ICON_LEN).ok());
            fetched.push(Group { id, name, icon });
        }

        self.groups = fetched;
        Ok(())
    }

    /// Fetches members of the current group and replaces the member cache.
    /// Fields live inside each element's nested `user` object and are read
    /// from that scope only; elements missing id or username are skipped.
    pub fn fetch_members(&mut self) -> Result<(), ClientError> {
        if !self.connected {
            return Err(ClientError::NotConnected);
        }
        if self.current_group_id.is_empty() {
            return Err(ClientError::NoGroup);
        }

        let path = format!(
            "/guilds/{}/members?limit={}",
            self.current_group_id,
            constants::MAX_MEMBERS
        );
        let body = self.request(Method::Get, &path, None)?;
        let index = TokenIndex::parse(&body, constants::MEMBER_TOKEN_CAPACITY)?;
        if index.root().kind != TokenKind::Array {
            return Err(ClientError::UnexpectedBody("a member array"));
        }

        let mut fetched = Vec::with_capacity(constants::MAX_MEMBERS);
        for element in index.children(0) {
            if fetched.len() >= constants::MAX_MEMBERS {
                break;
            }
            if index.token(element).kind != TokenKind::Object {
                break;
            }
            let Some(user) = index
                .find_key(element, "user")
                .filter(|&u| index.token(u).kind == TokenKind::Object)
            else {
                continue;
            };
            let id = index
                .find_key(user, "id")
                .and_then(|i| index.string(i, constants::MAX_ID_LEN).ok());
            let username = index
                .find_key(user, "username")
                .and_then(|i| index.string(i, constants::MAX_AUTHOR_LEN).ok());
            let (Some(id), Some(username)) = (id, username) else {
                continue;
            };
            let discriminator = index
                .find_key(user, "discriminator")
                .and_then(|i| index.string(i, constants::MAX_DISCRIMINATOR_LEN).ok())
                .unwrap_or_else(|| "0".to_string());
            fetched.push(Member {
                id,
                username,
                discriminator,
                online: true,
            });
        }

        self.members = fetched;
        Ok(())
    }

    /// Posts `text` to the current text channel, then refreshes the message
    /// cache so it reflects the new entry. The payload is serialized with
    /// serde_json, so quotes and backslashes in `text` are escaped per JSON
    /// string rules. A failed refresh does not undo a successful send; it
    /// is logged and the call still succeeds.
    pub fn send_message(&mut self, text: &str) -> Result<(), ClientError> {
        if !self.connected {
            return Err(ClientError::NotConnected);
        }
        if text.is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        if self.current_channel_id.is_empty() {
            return Err(ClientError::NoTextChannel);
        }

        let path = format!("/channels/{}/messages", self.current_channel_id);
        let payload = serde_json::json!({ "content": text }).to_string();
        self.request(Method::Post, &path, Some(payload))?;

        if let Err(err) = self.fetch_messages() {
            log::warn!("message refresh after send failed: {err}");
        }
        Ok(())
    }

    /// Makes `group_id` current, drops the channel selection and the
    /// message/member caches (the group cache is untouched), and reruns
    /// channel discovery. Fails when the group has no text channel; the
    /// client stays usable, but message operations need a successful
    /// discovery first.
    pub fn switch_group(&mut self, group_id: &str) -> Result<(), ClientError> {
        if !self.connected {
            return Err(ClientError::NotConnected);
        }

        self.current_group_id = json::truncate_utf8(group_id, constants::MAX_ID_LEN);
        self.current_channel_id.clear();
        self.messages.clear();
        self.members.clear();

        match self.discover_text_channel()? {
            Some(channel_id) => {
                self.current_channel_id = channel_id;
                Ok(())
            }
            None => Err(ClientError::NoTextChannel),
        }
    }

    /// Zeroizes the token material and marks the session disconnected.
    /// Transport resources are released when the client is dropped.
    pub fn cleanup(&mut self) {
        self.token.zeroize();
        self.connected = false;
    }

    /// Scans the current group's channel list in order and returns the id
    /// of the first text channel, or `None` when the group has none.
    fn discover_text_channel(&self) -> Result<Option<String>, ClientError> {
        let path = format!("/guilds/{}/channels", self.current_group_id);
        let body = self.request(Method::Get, &path, None)?;
        let index = TokenIndex::parse(&body, constants::CHANNEL_TOKEN_CAPACITY)?;
        if index.root().kind != TokenKind::Array {
            return Err(ClientError::UnexpectedBody("a channel array"));
        }

        for channel in index.children(0) {
            if index.token(channel).kind != TokenKind::Object {
                continue;
            }
            let is_text = index
                .find_key(channel, "type")
                .is_some_and(|t| index.raw(t) == constants::TEXT_CHANNEL_TYPE);
            if !is_text {
                continue;
            }
            if let Some(id) = index.find_key(channel, "id") {
                return Ok(Some(index.string(id, constants::MAX_ID_LEN)?));
            }
        }
        Ok(None)
    }

    /// Builds the URL and required headers, performs the round-trip, and
    /// maps non-success statuses to an error. Returns the body bytes.
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<Vec<u8>, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let headers = [
            ("Authorization", self.token.as_str()),
            ("Content-Type", "application/json"),
            ("User-Agent", constants::USER_AGENT),
        ];

        log::debug!("{:?} {}", method, url);
        let response = self
            .transport
            .perform(method, &url, &headers, body.as_deref())?;
        if !(200..300).contains(&response.status) {
            return Err(ClientError::Status(response.status));
        }
        Ok(response.body)
    }
}

impl Drop for ChatClient {
    fn drop(&mut self) {
        self.token.zeroize();
    }
}

/// Reduces a well-formed ISO-8601 timestamp to HH:MM by fixed byte offsets
/// (11..13 and 14..16). Not a date parser; anything shorter yields `None`
/// and the field stays empty.
fn short_time(iso: &str) -> Option<String> {
    let hours = iso.get(11..13)?;
    let minutes = iso.get(14..16)?;
    Some(format!("{hours}:{minutes}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_time_extracts_fixed_offsets() {
        assert_eq!(
            short_time("2024-01-15T09:05:33.000000+00:00").as_deref(),
            Some("09:05")
        );
        assert_eq!(short_time("2024-01-15T23:59:59Z").as_deref(), Some("23:59"));
    }

    #[test]
    fn test_short_time_rejects_short_input() {
        assert_eq!(short_time(""), None);
        assert_eq!(short_time("2024-01-15"), None);
        assert_eq!(short_time("2024-01-15T09:0"), None);
    }
}
