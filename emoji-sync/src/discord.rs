#![doc = "Discord integration: the REST client behind `EmojiApi` and the session it runs in."]
//
//! # Discord client (CLI <-> Core)
//!
//! This module wires the [`EmojiApi`] and [`Session`] traits from
//! `emoji-sync-core` to Discord's HTTP API.
//!
//! - [`DiscordClient`] issues the REST calls for one guild.
//! - [`DiscordSession`] owns a client. Starting it authenticates the bot token
//!   against `/users/@me` and marks the session ready; it then stays open until
//!   [`Session::close`] is called.
//!
//! Requests are not retried. Non-2xx responses become errors that carry the
//! status code and response body.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::watch;

use emoji_sync_core::contract::{EmojiApi, EmojiEdit, NewEmoji, Session};
use emoji_sync_core::error::ApiError;
use emoji_sync_core::resource::{RemoteEmojiResource, RemoteId};

use crate::load_config::SyncConfig;

const AUDIT_LOG_REASON: &str = "X-Audit-Log-Reason";
const USER_AGENT: &str = concat!(
    "DiscordBot (https://github.com/jfhbrook/de-discord, ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// The bot account a token belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
}

pub struct DiscordClient {
    http: reqwest::Client,
    api_base: String,
    guild_id: String,
}

impl DiscordClient {
    pub fn new(config: &SyncConfig) -> Result<Self, ApiError> {
        let mut auth = HeaderValue::from_str(&format!("Bot {}", config.api_token))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;
        tracing::info!(
            guild_id = %config.guild_id,
            api_base = %config.api_base,
            "Initialized Discord client"
        );
        Ok(Self {
            http,
            api_base: config.api_base.clone(),
            guild_id: config.guild_id.clone(),
        })
    }

    pub fn guild_id(&self) -> &str {
        &self.guild_id
    }

    fn emojis_url(&self) -> String {
        format!("{}/guilds/{}/emojis", self.api_base, self.guild_id)
    }

    fn emoji_url(&self, emoji_id: &str) -> String {
        format!("{}/{}", self.emojis_url(), emoji_id)
    }

    /// Fetches the account the token belongs to. Fails on a bad token.
    pub async fn current_user(&self) -> Result<CurrentUser, ApiError> {
        let resp = send(self.http.get(format!("{}/users/@me", self.api_base))).await?;
        Ok(resp.json().await?)
    }
}

fn with_reason(req: RequestBuilder, reason: Option<&str>) -> Result<RequestBuilder, ApiError> {
    match reason {
        Some(reason) => Ok(req.header(AUDIT_LOG_REASON, HeaderValue::from_str(reason)?)),
        None => Ok(req),
    }
}

async fn send(req: RequestBuilder) -> Result<Response, ApiError> {
    let resp = req.send().await?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    tracing::error!(status = %status, body = %body, "Discord API request failed");
    Err(format!("Discord API returned {status}: {body}").into())
}

async fn parse_resource(resp: Response) -> Result<RemoteEmojiResource, ApiError> {
    let payload: Value = resp.json().await?;
    Ok(RemoteEmojiResource::from_payload(&payload)?)
}

#[async_trait]
impl EmojiApi for DiscordClient {
    async fn list_emojis(&self) -> Result<Vec<Value>, ApiError> {
        tracing::info!(guild_id = %self.guild_id, "Listing custom emojis");
        let resp = send(self.http.get(self.emojis_url())).await?;
        Ok(resp.json().await?)
    }

    async fn create_emoji(&self, req: NewEmoji) -> Result<RemoteEmojiResource, ApiError> {
        tracing::info!(guild_id = %self.guild_id, emoji = %req.name, "Creating custom emoji");
        let builder = with_reason(self.http.post(self.emojis_url()), req.reason.as_deref())?;
        let resp = send(builder.json(&req)).await?;
        parse_resource(resp).await
    }

    async fn edit_emoji(
        &self,
        emoji_id: RemoteId,
        req: EmojiEdit,
    ) -> Result<RemoteEmojiResource, ApiError> {
        tracing::info!(guild_id = %self.guild_id, emoji_id = %emoji_id, "Editing custom emoji");
        let builder = with_reason(
            self.http.patch(self.emoji_url(&emoji_id)),
            req.reason.as_deref(),
        )?;
        let resp = send(builder.json(&req)).await?;
        parse_resource(resp).await
    }

    async fn delete_emoji(&self, emoji_id: RemoteId) -> Result<(), ApiError> {
        tracing::info!(guild_id = %self.guild_id, emoji_id = %emoji_id, "Deleting custom emoji");
        send(self.http.delete(self.emoji_url(&emoji_id))).await?;
        Ok(())
    }
}

/// A Discord bot session for the lifetime of one sync run.
pub struct DiscordSession {
    client: DiscordClient,
    ready: watch::Sender<bool>,
    closed: watch::Sender<bool>,
}

impl DiscordSession {
    pub fn new(client: DiscordClient) -> Self {
        Self {
            client,
            ready: watch::Sender::new(false),
            closed: watch::Sender::new(false),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self, ApiError> {
        Ok(Self::new(DiscordClient::new(config)?))
    }

    /// The REST client, for use once the session is ready.
    pub fn api(&self) -> &DiscordClient {
        &self.client
    }
}

#[async_trait]
impl Session for DiscordSession {
    async fn start(&self) -> Result<(), ApiError> {
        tracing::info!(guild_id = %self.client.guild_id(), "Starting the Discord session");
        let me = self.client.current_user().await?;
        tracing::info!(user = %me.username, user_id = %me.id, "Discord session authenticated");
        self.ready.send_replace(true);

        let mut closed = self.closed.subscribe();
        closed.wait_for(|closed| *closed).await?;
        tracing::info!("Discord session ended");
        Ok(())
    }

    async fn wait_until_ready(&self) {
        let mut ready = self.ready.subscribe();
        // The sender lives as long as `self`, so this only returns once ready.
        let _ = ready.wait_for(|ready| *ready).await;
        tracing::info!("The bot is ready!");
    }

    fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    async fn close(&self) -> Result<(), ApiError> {
        tracing::info!("Closing the Discord session");
        self.closed.send_replace(true);
        Ok(())
    }
}
