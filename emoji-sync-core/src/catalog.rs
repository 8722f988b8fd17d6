//! Local emoji catalog: one [`EmojiRecord`] per image file in the emoji directory.
//!
//! The catalog is rebuilt from disk on every run. Record names come from the
//! file stem, so `party_parrot.gif` becomes `party_parrot`. Two files sharing a
//! stem (`wave.png` and `wave.gif`) are rejected rather than silently
//! overwriting each other.

use std::collections::BTreeMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::{debug, info, warn};

use crate::error::CatalogError;

/// Largest image the platform accepts for a custom emoji.
pub const EMOJI_MAX_SIZE: u64 = 256 * 1024;

/// Local emojis keyed by name.
pub type EmojiCatalog = BTreeMap<String, EmojiRecord>;

/// A single emoji image on disk. Identity is the name alone.
#[derive(Debug, Clone)]
pub struct EmojiRecord {
    name: String,
    path: PathBuf,
}

impl PartialEq for EmojiRecord {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for EmojiRecord {}

impl Hash for EmojiRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl EmojiRecord {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Builds a record from a file path, naming it after the file stem.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CatalogError::InvalidName(path.to_path_buf()))?;
        Ok(Self::new(name, path))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// MIME type inferred from the file extension.
    pub fn mime_type(&self) -> Option<&'static str> {
        mime_for(&self.path)
    }

    /// Renders the image as the `data:` URI the platform expects on upload.
    ///
    /// The bytes are sent as stored; images over [`EMOJI_MAX_SIZE`] are refused
    /// before any network call is made.
    pub fn image_payload(&self) -> Result<String, CatalogError> {
        let bytes = fs::read(&self.path).map_err(|source| CatalogError::ReadImage {
            path: self.path.clone(),
            source,
        })?;
        let size = bytes.len() as u64;
        if size > EMOJI_MAX_SIZE {
            return Err(CatalogError::TooLarge {
                path: self.path.clone(),
                size,
                limit: EMOJI_MAX_SIZE,
            });
        }
        let mime = self.mime_type().unwrap_or("image/png");
        Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
    }
}

fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Loads every image in `dir` into a catalog.
///
/// Hidden files, directories and files without an image extension are skipped.
/// Entries are visited in file-name order so duplicate reports are stable.
pub fn load_catalog(dir: &Path) -> Result<EmojiCatalog, CatalogError> {
    info!(emojis_dir = %dir.display(), "Loading local emoji catalog");

    let read_dir_err = |source| CatalogError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_err)? {
        let path = entry.map_err(read_dir_err)?.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(true);
        if hidden || !path.is_file() {
            debug!(path = %path.display(), "Skipping non-emoji entry");
            continue;
        }
        if mime_for(&path).is_none() {
            warn!(path = %path.display(), "Skipping file without an image extension");
            continue;
        }
        paths.push(path);
    }
    paths.sort();

    let mut catalog = EmojiCatalog::new();
    for path in paths {
        let record = EmojiRecord::from_path(&path)?;
        if let Some(existing) = catalog.get(record.name()) {
            return Err(CatalogError::DuplicateName {
                name: record.name().to_string(),
                first: existing.path().to_path_buf(),
                second: path,
            });
        }
        catalog.insert(record.name().to_string(), record);
    }

    info!(count = catalog.len(), "Loaded local emoji catalog");
    Ok(catalog)
}

/// Renders every record's upload payload and collects the ones that fail.
///
/// Nothing is sent anywhere; this is the offline check that each image can be
/// uploaded as-is.
pub fn validate_catalog(catalog: &EmojiCatalog) -> Vec<(String, CatalogError)> {
    catalog
        .values()
        .filter_map(|record| match record.image_payload() {
            Ok(_) => None,
            Err(e) => {
                warn!(emoji = %record.name(), error = %e, "Emoji failed validation");
                Some((record.name().to_string(), e))
            }
        })
        .collect()
}
