///
/// This module implements the CLI interface for emoji-sync: command parsing,
/// the async `run` entrypoint, and user-visible output.
///
/// All diffing, lifecycle and apply logic lives in `emoji-sync-core`; this
/// module only wires configuration, the Discord session and the core pipeline
/// together.
///
/// ## Commands
/// - `diff`: dry run, prints the changeset as a table (or JSON)
/// - `apply`: computes and applies the changeset
/// - `reload`: applies with `replace`, re-uploading every emoji
/// - `check`: offline validation of the local emoji images
use crate::discord::DiscordSession;
use crate::load_config::{load_config, resolve_emojis_dir};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use emoji_sync_core::catalog::{load_catalog, validate_catalog};
use emoji_sync_core::changeset::{render_table, UpdateAction};
use emoji_sync_core::connection::with_connection;
use emoji_sync_core::synchronise::{synchronise, SyncMode, SynchroniseReport};
use std::path::PathBuf;
use std::sync::Arc;

/// CLI for emoji-sync: keep a Discord guild's custom emojis in line with a local directory.
#[derive(Parser)]
#[clap(
    name = "emoji-sync",
    version,
    about = "Synchronise a local directory of emoji images with a Discord guild's custom emojis"
)]
pub struct Cli {
    /// Optional YAML file with non-secret settings
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Fail the run if the Discord session does not shut down within the close timeout
    #[clap(long, global = true)]
    pub strict_close: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show what a sync would change, without changing anything
    Diff {
        /// How emojis present on both sides would be updated (edit or replace)
        #[clap(long, default_value = "edit")]
        update_action: UpdateAction,

        /// Print the report as JSON instead of a table
        #[clap(long)]
        json: bool,
    },
    /// Compute the changeset and apply it to the guild
    Apply {
        /// How emojis present on both sides are updated (edit or replace)
        #[clap(long, default_value = "edit")]
        update_action: UpdateAction,
    },
    /// Force a reload of every emoji: delete and re-upload all of them
    Reload,
    /// Check that every local emoji can be uploaded as-is (no network)
    Check,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let config_path = cli.config.as_deref();
    let (mode, json) = match cli.command {
        Commands::Check => return check(resolve_emojis_dir(config_path)?),
        Commands::Diff {
            update_action,
            json,
        } => (SyncMode::DryRun { update_action }, json),
        Commands::Apply { update_action } => (SyncMode::Apply { update_action }, false),
        Commands::Reload => (
            SyncMode::Apply {
                update_action: UpdateAction::Replace,
            },
            false,
        ),
    };

    let mut config = load_config(config_path)?;
    config.strict_close |= cli.strict_close;
    tracing::info!(?mode, "Starting emoji sync");

    let session = Arc::new(
        DiscordSession::from_config(&config)
            .map_err(|e| anyhow::anyhow!("failed to build Discord client: {e}"))?,
    );
    let emojis_dir = config.emojis_dir.clone();
    let report = with_connection(session, config.lifecycle_options(), |session| async move {
        synchronise(session.api(), &emojis_dir, mode).await
    })
    .await;

    match report {
        Ok(report) => {
            tracing::info!(summary = %report.summary, "Emoji sync complete");
            print_report(&report, json)
        }
        Err(e) => {
            tracing::error!(error = %e, "Emoji sync failed");
            Err(e).context("emoji sync failed")
        }
    }
}

fn check(emojis_dir: PathBuf) -> Result<()> {
    let catalog = load_catalog(&emojis_dir)
        .with_context(|| format!("loading emojis from {}", emojis_dir.display()))?;
    anyhow::ensure!(!catalog.is_empty(), "no emojis found in {}", emojis_dir.display());

    let failures = validate_catalog(&catalog);
    if failures.is_empty() {
        println!("All {} emojis are well-formed.", catalog.len());
        return Ok(());
    }
    for (name, e) in &failures {
        eprintln!("{name}: {e}");
    }
    anyhow::bail!("{} of {} emojis failed validation", failures.len(), catalog.len())
}

fn print_report(report: &SynchroniseReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    if report.rows.is_empty() {
        println!("Emojis are already in sync.");
    } else {
        println!("{}", render_table(&report.rows));
    }
    println!("Changeset: {}", report.summary);

    if let Some(applied) = &report.applied {
        println!(
            "Applied: {} created, {} removed, {} replaced.",
            applied.created.len(),
            applied.removed.len(),
            applied.replaced.len()
        );
        if !applied.unsupported_edits.is_empty() {
            println!(
                "Not updated (in-place edits are not supported, use --update-action replace): {}",
                applied.unsupported_edits.join(", ")
            );
        }
    }
    Ok(())
}
