//! Three-way diff between the local catalog and the guild's emojis.
//!
//! Names owned by an integration (`managed`) are excluded from every list:
//! they are never updated, removed, or shadowed by a local create.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tabled::Tabled;
use tracing::info;

use crate::catalog::{EmojiCatalog, EmojiRecord};
use crate::resource::RemoteEmojiResource;

/// How an emoji present both locally and remotely is brought up to date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateAction {
    /// Edit metadata in place. Not supported by the applier; logged only.
    #[default]
    Edit,
    /// Delete the remote emoji and upload the local image again.
    Replace,
}

impl UpdateAction {
    pub fn label(&self) -> &'static str {
        match self {
            UpdateAction::Edit => "edit",
            UpdateAction::Replace => "replace",
        }
    }
}

impl fmt::Display for UpdateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for UpdateAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "edit" => Ok(UpdateAction::Edit),
            "replace" => Ok(UpdateAction::Replace),
            other => Err(format!("unknown update action `{other}` (expected edit or replace)")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    pub update: Vec<(String, RemoteEmojiResource, EmojiRecord)>,
    pub remove: Vec<(String, RemoteEmojiResource)>,
    pub create: Vec<(String, EmojiRecord)>,
}

/// Per-list counts, for log lines and CLI summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChangesetSummary {
    pub update: usize,
    pub remove: usize,
    pub create: usize,
}

impl fmt::Display for ChangesetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to create, {} to remove, {} to update",
            self.create, self.remove, self.update
        )
    }
}

impl Changeset {
    /// Computes what has to change remotely for the guild to match `local`.
    ///
    /// Every list is sorted by name. If the listing repeats a name, the last
    /// entry wins, as it would in a name-keyed lookup.
    pub fn diff(upstream: &[RemoteEmojiResource], local: &EmojiCatalog) -> Changeset {
        let mut lookup: BTreeMap<&str, &RemoteEmojiResource> = BTreeMap::new();
        let mut managed: BTreeSet<&str> = BTreeSet::new();
        let mut unmanaged: BTreeSet<&str> = BTreeSet::new();

        for up in upstream {
            lookup.insert(up.name.as_str(), up);
            if up.managed {
                info!(emoji = %up.name, "Emoji is managed, so leaving it alone");
                managed.insert(up.name.as_str());
            } else {
                unmanaged.insert(up.name.as_str());
            }
        }
        // A name listed as both managed and unmanaged is treated as managed.
        let unmanaged: BTreeSet<&str> = unmanaged.difference(&managed).copied().collect();
        let local_keys: BTreeSet<&str> = local.keys().map(String::as_str).collect();

        let update = unmanaged
            .intersection(&local_keys)
            .map(|&key| (key.to_string(), lookup[key].clone(), local[key].clone()))
            .collect();
        let remove = unmanaged
            .difference(&local_keys)
            .map(|&key| (key.to_string(), lookup[key].clone()))
            .collect();
        let create = local_keys
            .iter()
            .filter(|key| !unmanaged.contains(*key) && !managed.contains(*key))
            .map(|&key| (key.to_string(), local[key].clone()))
            .collect();

        Changeset {
            update,
            remove,
            create,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.update.is_empty() && self.remove.is_empty() && self.create.is_empty()
    }

    pub fn summary(&self) -> ChangesetSummary {
        ChangesetSummary {
            update: self.update.len(),
            remove: self.remove.len(),
            create: self.create.len(),
        }
    }

    /// Flattens the changeset into display rows: updates, then removes, then creates.
    pub fn report(&self, update_action: UpdateAction) -> Vec<ReportRow> {
        let rows = self.update.len() + self.remove.len() + self.create.len();
        let mut table = Vec::with_capacity(rows);
        for (name, resource, emoji) in &self.update {
            table.push(ReportRow::new(name, update_action.label(), Some(resource), Some(emoji)));
        }
        for (name, resource) in &self.remove {
            table.push(ReportRow::new(name, "remove", Some(resource), None));
        }
        for (name, emoji) in &self.create {
            table.push(ReportRow::new(name, "create", None, Some(emoji)));
        }
        table
    }
}

/// One line of a dry-run report. Columns that do not apply are left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Tabled)]
pub struct ReportRow {
    pub name: String,
    pub action: String,
    pub discord_id: String,
    pub path: String,
    pub roles: String,
    pub require_colons: String,
    pub managed: String,
    pub animated: String,
}

impl ReportRow {
    fn new(
        name: &str,
        action: &str,
        resource: Option<&RemoteEmojiResource>,
        emoji: Option<&EmojiRecord>,
    ) -> Self {
        let mut row = ReportRow {
            name: name.to_string(),
            action: action.to_string(),
            ..Default::default()
        };
        if let Some(r) = resource {
            row.discord_id = r.id.clone();
            row.roles = r.roles.join(", ");
            row.require_colons = r.require_colons.to_string();
            row.managed = r.managed.to_string();
            row.animated = r.animated.to_string();
        }
        if let Some(e) = emoji {
            row.path = e.path().display().to_string();
        }
        row
    }
}

/// Renders report rows as an ASCII table.
pub fn render_table(rows: &[ReportRow]) -> String {
    tabled::Table::new(rows.to_vec()).to_string()
}
