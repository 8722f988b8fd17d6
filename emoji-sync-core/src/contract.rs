//! # contract: the remote side of a sync, as traits
//!
//! Two seams separate the core logic from the chat platform:
//!
//! - [`EmojiApi`]: list, create, edit and delete a guild's custom emojis.
//! - [`Session`]: a long-lived client session that has to be started, become
//!   ready, and be closed again. [`crate::connection::with_connection`] drives it.
//!
//! Both are implemented by the real Discord client in the CLI crate. `EmojiApi`
//! is annotated for `mockall` so tests can assert on the exact calls made.

use async_trait::async_trait;
#[allow(unused_imports)]
use mockall::{automock, predicate::*};
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::resource::{RemoteEmojiResource, RemoteId};

/// Body of a "create custom emoji" request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewEmoji {
    pub name: String,
    /// Image as a `data:` URI.
    pub image: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<RemoteId>,
    /// Audit-log reason; sent as a header, not in the body.
    #[serde(skip)]
    pub reason: Option<String>,
}

/// Body of an "edit custom emoji" request. Only metadata can be edited.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmojiEdit {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<RemoteId>>,
    #[serde(skip)]
    pub reason: Option<String>,
}

/// Custom-emoji operations against a single guild.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait EmojiApi: Send + Sync {
    /// Every custom emoji in the guild, managed ones included, as raw payloads.
    ///
    /// Parsing is left to [`crate::resource::parse_listing`] so malformed
    /// entries surface as validation errors rather than transport errors.
    async fn list_emojis(&self) -> Result<Vec<Value>, ApiError>;

    async fn create_emoji(&self, req: NewEmoji) -> Result<RemoteEmojiResource, ApiError>;

    async fn edit_emoji(
        &self,
        emoji_id: RemoteId,
        req: EmojiEdit,
    ) -> Result<RemoteEmojiResource, ApiError>;

    async fn delete_emoji(&self, emoji_id: RemoteId) -> Result<(), ApiError>;
}

/// A client session that runs in the background once started.
///
/// `start` resolves only when the session ends, either because `close` was
/// called or because it failed. `wait_until_ready` resolves once the session
/// can serve requests and keeps resolving immediately afterwards.
#[async_trait]
pub trait Session: Send + Sync {
    async fn start(&self) -> Result<(), ApiError>;

    async fn wait_until_ready(&self);

    /// Whether the session has become ready. Never blocks.
    fn is_ready(&self) -> bool;

    async fn close(&self) -> Result<(), ApiError>;
}
