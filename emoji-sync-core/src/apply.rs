//! Pushes a [`Changeset`] to the guild.
//!
//! Entries are applied creates first, then removes, then updates. Nothing is
//! retried or rolled back: the first failing remote call stops the run and the
//! guild keeps whatever was already applied.

use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::EmojiRecord;
use crate::changeset::{Changeset, UpdateAction};
use crate::contract::{EmojiApi, NewEmoji};
use crate::error::SyncError;
use crate::resource::{RemoteEmojiResource, RemoteId};

const CREATE_REASON: &str = "Creating a fresh emoji!";
const REPLACE_REASON: &str = "Issuing a blind replace!";

/// What an apply run actually did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub created: Vec<String>,
    pub removed: Vec<String>,
    pub replaced: Vec<String>,
    /// Updates requested with [`UpdateAction::Edit`]. In-place edits are not
    /// supported, so these emojis were left unchanged.
    pub unsupported_edits: Vec<String>,
}

pub async fn apply_changeset<A>(
    api: &A,
    changeset: &Changeset,
    update_action: UpdateAction,
) -> Result<ApplyReport, SyncError>
where
    A: EmojiApi + ?Sized,
{
    let mut report = ApplyReport::default();

    for (name, emoji) in &changeset.create {
        info!(emoji = %name, "Creating emoji");
        create_emoji(api, emoji, Some(CREATE_REASON)).await?;
        report.created.push(name.clone());
    }
    for (name, resource) in &changeset.remove {
        info!(emoji = %name, emoji_id = %resource.id, "Removing emoji");
        delete_emoji(api, &resource.id).await?;
        report.removed.push(name.clone());
    }
    for (name, resource, emoji) in &changeset.update {
        match update_action {
            UpdateAction::Replace => {
                info!(emoji = %name, emoji_id = %resource.id, "Individually replacing emoji");
                replace_emoji(api, &resource.id, emoji, Some(REPLACE_REASON)).await?;
                report.replaced.push(name.clone());
            }
            UpdateAction::Edit => {
                warn!(
                    emoji = %name,
                    "In-place emoji edits are not supported; leaving emoji unchanged"
                );
                report.unsupported_edits.push(name.clone());
            }
        }
    }

    info!(
        created = report.created.len(),
        removed = report.removed.len(),
        replaced = report.replaced.len(),
        unsupported_edits = report.unsupported_edits.len(),
        "Changeset applied"
    );
    Ok(report)
}

/// Uploads a local emoji under its own name.
pub async fn create_emoji<A>(
    api: &A,
    emoji: &EmojiRecord,
    reason: Option<&str>,
) -> Result<RemoteEmojiResource, SyncError>
where
    A: EmojiApi + ?Sized,
{
    let req = new_emoji_request(emoji, reason)?;
    api.create_emoji(req)
        .await
        .map_err(|e| SyncError::remote("create_emoji", e))
}

fn new_emoji_request(emoji: &EmojiRecord, reason: Option<&str>) -> Result<NewEmoji, SyncError> {
    Ok(NewEmoji {
        name: emoji.name().to_string(),
        image: emoji.image_payload()?,
        roles: Vec::new(),
        reason: reason.map(str::to_string),
    })
}

pub async fn delete_emoji<A>(api: &A, emoji_id: &RemoteId) -> Result<(), SyncError>
where
    A: EmojiApi + ?Sized,
{
    api.delete_emoji(emoji_id.clone())
        .await
        .map_err(|e| SyncError::remote("delete_emoji", e))
}

/// Deletes the remote emoji and uploads the local image again.
///
/// The platform cannot swap an emoji's image in place. The two calls are not
/// atomic: if the create fails, the emoji stays deleted. The local image is
/// read before anything is deleted.
pub async fn replace_emoji<A>(
    api: &A,
    emoji_id: &RemoteId,
    emoji: &EmojiRecord,
    reason: Option<&str>,
) -> Result<RemoteEmojiResource, SyncError>
where
    A: EmojiApi + ?Sized,
{
    let req = new_emoji_request(emoji, reason)?;
    delete_emoji(api, emoji_id).await?;
    api.create_emoji(req)
        .await
        .map_err(|e| SyncError::remote("create_emoji", e))
}
