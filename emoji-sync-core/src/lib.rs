#![doc = "emoji-sync-core: core logic library for emoji-sync."]

//! Everything needed to bring a guild's custom emojis in line with a local
//! directory of images, independent of any particular HTTP client.
//!
//! - [`catalog`]: local emoji records
//! - [`resource`]: remote emoji payload parsing
//! - [`changeset`]: the create/remove/update diff and its report
//! - [`connection`]: scoped session start-up and shutdown
//! - [`apply`]: pushing a changeset through an [`contract::EmojiApi`]
//! - [`synchronise`]: the end-to-end pipeline used by the CLI

pub mod apply;
pub mod catalog;
pub mod changeset;
pub mod connection;
pub mod contract;
pub mod error;
pub mod resource;
pub mod synchronise;
