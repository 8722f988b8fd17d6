//! High-level pipeline: load catalog → list remote emojis → diff → (optionally) apply.
//!
//! This is what the CLI runs inside a scoped connection. It is fail-fast: the
//! first error from any stage is returned as-is.
//!
//! # Navigation
//! - Main entrypoint: [`synchronise`]
//! - Supporting types: [`SyncMode`], [`SynchroniseReport`]

use std::path::Path;

use serde::Serialize;
use tracing::{error, info};

use crate::apply::{apply_changeset, ApplyReport};
use crate::catalog::load_catalog;
use crate::changeset::{Changeset, ChangesetSummary, ReportRow, UpdateAction};
use crate::contract::EmojiApi;
use crate::error::SyncError;
use crate::resource::parse_listing;

/// Whether a run only reports, or also pushes the changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    DryRun { update_action: UpdateAction },
    Apply { update_action: UpdateAction },
}

impl SyncMode {
    pub fn update_action(&self) -> UpdateAction {
        match self {
            SyncMode::DryRun { update_action } | SyncMode::Apply { update_action } => {
                *update_action
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SynchroniseReport {
    pub summary: ChangesetSummary,
    pub rows: Vec<ReportRow>,
    /// Present only when the changeset was applied.
    pub applied: Option<ApplyReport>,
}

/// Builds the changeset between `emojis_dir` and the guild behind `api`.
pub async fn fetch_changeset<A>(api: &A, emojis_dir: &Path) -> Result<Changeset, SyncError>
where
    A: EmojiApi + ?Sized,
{
    let local = load_catalog(emojis_dir)?;
    let raw = api.list_emojis().await.map_err(|e| {
        error!(error = %e, "Failed to list remote emojis");
        SyncError::remote("list_emojis", e)
    })?;
    let upstream = parse_listing(&raw)?;
    info!(remote = upstream.len(), local = local.len(), "Computing emoji changeset");

    let changeset = Changeset::diff(&upstream, &local);
    info!(summary = %changeset.summary(), "Emoji changeset computed");
    Ok(changeset)
}

pub async fn synchronise<A>(
    api: &A,
    emojis_dir: &Path,
    mode: SyncMode,
) -> Result<SynchroniseReport, SyncError>
where
    A: EmojiApi + ?Sized,
{
    let changeset = fetch_changeset(api, emojis_dir).await?;
    let rows = changeset.report(mode.update_action());

    let applied = match mode {
        SyncMode::DryRun { .. } => None,
        SyncMode::Apply { update_action } if changeset.is_empty() => {
            info!(%update_action, "Nothing to apply");
            Some(ApplyReport::default())
        }
        SyncMode::Apply { update_action } => {
            Some(apply_changeset(api, &changeset, update_action).await?)
        }
    };

    Ok(SynchroniseReport {
        summary: changeset.summary(),
        rows,
        applied,
    })
}
