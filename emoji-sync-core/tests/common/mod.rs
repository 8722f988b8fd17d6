#![allow(dead_code)]

use std::fs;
use std::path::Path;

use emoji_sync_core::catalog::{EmojiCatalog, EmojiRecord};
use emoji_sync_core::resource::RemoteEmojiResource;
use serde_json::{json, Value};

pub fn resource(name: &str, id: &str, managed: bool) -> RemoteEmojiResource {
    RemoteEmojiResource {
        id: id.to_string(),
        name: name.to_string(),
        roles: Vec::new(),
        user: None,
        require_colons: true,
        managed,
        animated: false,
    }
}

pub fn payload(name: &str, id: &str, managed: bool) -> Value {
    json!({
        "id": id,
        "name": name,
        "roles": [],
        "require_colons": true,
        "managed": managed,
        "animated": false,
        "available": true
    })
}

/// Catalog of records whose paths do not need to exist.
pub fn catalog(names: &[&str]) -> EmojiCatalog {
    names
        .iter()
        .map(|n| (n.to_string(), EmojiRecord::new(*n, format!("emojis/{n}.png"))))
        .collect()
}

/// Writes a tiny fake PNG per name into `dir`.
pub fn write_emojis(dir: &Path, names: &[&str]) {
    for name in names {
        fs::write(dir.join(format!("{name}.png")), b"\x89PNG\r\n\x1a\nfake").unwrap();
    }
}
