/// `load_config` module: builds the run configuration from an optional YAML file
/// plus environment variables.
///
/// # Sources, in increasing priority
/// 1. Built-in defaults (guild id, `emojis` directory, API base, 5 s close timeout)
/// 2. An optional YAML file passed with `--config` (non-secret settings only)
/// 3. Environment variables (`BOT_GUILD_ID`, `EMOJIS_DIR`, `DISCORD_API_BASE`)
///
/// The API token is only ever read from `DISCORD_API_TOKEN`. A missing or empty
/// token is a hard error.
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

use emoji_sync_core::connection::{LifecycleOptions, DEFAULT_CLOSE_TIMEOUT};
use emoji_sync_core::error::SyncError;

pub const TOKEN_VAR: &str = "DISCORD_API_TOKEN";
pub const GUILD_VAR: &str = "BOT_GUILD_ID";
pub const EMOJIS_DIR_VAR: &str = "EMOJIS_DIR";
pub const API_BASE_VAR: &str = "DISCORD_API_BASE";

pub const DEFAULT_GUILD_ID: &str = "813889837938081823";
pub const DEFAULT_EMOJIS_DIR: &str = "emojis";
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Everything a sync run needs, resolved once at startup.
#[derive(Clone)]
pub struct SyncConfig {
    pub api_token: String,
    pub guild_id: String,
    pub emojis_dir: PathBuf,
    pub api_base: String,
    pub close_timeout: Duration,
    pub strict_close: bool,
}

impl SyncConfig {
    pub fn lifecycle_options(&self) -> LifecycleOptions {
        LifecycleOptions {
            close_timeout: self.close_timeout,
            fail_on_close_timeout: self.strict_close,
        }
    }
}

// The token never ends up in logs.
impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("api_token", &"<redacted>")
            .field("guild_id", &self.guild_id)
            .field("emojis_dir", &self.emojis_dir)
            .field("api_base", &self.api_base)
            .field("close_timeout", &self.close_timeout)
            .field("strict_close", &self.strict_close)
            .finish()
    }
}

/// Shape of the optional YAML file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub guild_id: Option<String>,
    pub emojis_dir: Option<PathBuf>,
    pub api_base: Option<String>,
    pub close_timeout_secs: Option<u64>,
    #[serde(default)]
    pub strict_close: bool,
}

/// Reads and parses the YAML file, or returns defaults when no path is given.
pub fn load_file_config(path: Option<&Path>) -> Result<FileConfig> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    info!(config_path = ?path, "Loading configuration from file");

    let content = fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path, e)
    })?;
    // An empty file is a valid, empty configuration.
    if content.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    let parsed: FileConfig = serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML: {e}")
    })?;
    info!(config_path = ?path, "Parsed config YAML successfully");
    Ok(parsed)
}

/// Resolves the emoji directory without requiring any credentials.
pub fn resolve_emojis_dir(path: Option<&Path>) -> Result<PathBuf> {
    let file = load_file_config(path)?;
    Ok(env_var(EMOJIS_DIR_VAR)
        .map(PathBuf::from)
        .or(file.emojis_dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_EMOJIS_DIR)))
}

/// Builds the full [`SyncConfig`]. Fails if `DISCORD_API_TOKEN` is not set.
pub fn load_config(path: Option<&Path>) -> Result<SyncConfig> {
    let file = load_file_config(path)?;

    let api_token = env_var(TOKEN_VAR).ok_or_else(|| {
        error!(var = TOKEN_VAR, "Discord API token missing from environment");
        SyncError::Config(format!("{TOKEN_VAR} environment variable not set"))
    })?;

    let guild_id = env_var(GUILD_VAR)
        .or(file.guild_id)
        .unwrap_or_else(|| DEFAULT_GUILD_ID.to_string());
    if guild_id.is_empty() || !guild_id.chars().all(|c| c.is_ascii_digit()) {
        error!(guild_id = %guild_id, "Guild id must be a numeric snowflake");
        return Err(SyncError::Config(format!("invalid guild id `{guild_id}`")))
            .context("resolving guild id");
    }

    let config = SyncConfig {
        api_token,
        guild_id,
        emojis_dir: env_var(EMOJIS_DIR_VAR)
            .map(PathBuf::from)
            .or(file.emojis_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EMOJIS_DIR)),
        api_base: env_var(API_BASE_VAR)
            .or(file.api_base)
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string(),
        close_timeout: file
            .close_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CLOSE_TIMEOUT),
        strict_close: file.strict_close,
    };

    info!(
        guild_id = %config.guild_id,
        emojis_dir = %config.emojis_dir.display(),
        api_base = %config.api_base,
        "Config loaded and merged successfully"
    );
    Ok(config)
}

// Unset and empty are treated the same.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
