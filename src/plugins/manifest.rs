//! Plugin hook manifest: the `hooks/hooks.json` descriptor.
//!
//! Each plugin declares, per event name, a list of matcher groups and the
//! commands to run when a group matches. The loader never fails the scan on
//! a bad manifest; see [`load_manifest`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Manifest location relative to a plugin's root directory.
pub const HOOKS_MANIFEST_PATH: &str = "hooks/hooks.json";

/// Placeholder in command templates replaced with the plugin's root path.
pub const PLUGIN_ROOT_PLACEHOLDER: &str = "${CLAUDE_PLUGIN_ROOT}";

/// Errors raised while loading a single manifest. Never escape the scan.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// On-disk shape of `hooks/hooks.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HooksFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Event name → matcher groups, in declaration order.
    #[serde(default)]
    pub hooks: HashMap<String, Vec<EventEntry>>,
}

/// One matcher group for an event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventEntry {
    /// Regex tested against the event's discriminator. `None` matches everything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matcher: Option<String>,
    #[serde(default)]
    pub hooks: Vec<HookCommand>,
}

/// A command template contributed by a plugin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookCommand {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub command: String,
    /// Explicit fire-and-forget flag. Falls back to the program allow-list when absent.
    #[serde(rename = "async", default, skip_serializing_if = "Option::is_none")]
    pub is_async: Option<bool>,
}

impl HookCommand {
    /// Only `command` hooks with a non-blank command are executable.
    pub fn is_runnable(&self) -> bool {
        self.kind.as_deref().map_or(true, |k| k == "command") && !self.command.trim().is_empty()
    }
}

/// A scanned plugin directory.
///
/// `has_hooks` reports whether the manifest file exists; `events` is `None`
/// when it is missing or could not be parsed.
#[derive(Debug, Clone)]
pub struct PluginManifest {
    pub name: String,
    pub root_path: PathBuf,
    pub has_hooks: bool,
    pub events: Option<HashMap<String, Vec<EventEntry>>>,
}

impl PluginManifest {
    /// Entries registered for `event_name`, empty when none.
    pub fn entries_for(&self, event_name: &str) -> &[EventEntry] {
        if !self.has_hooks {
            return &[];
        }
        self.events
            .as_ref()
            .and_then(|events| events.get(event_name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Event names declared by this plugin, sorted.
    pub fn event_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .events
            .iter()
            .flat_map(|events| events.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names
    }
}

/// Read and parse the manifest at `root_dir/hooks/hooks.json`.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn read_hooks_file(root_dir: &Path) -> Result<Option<HooksFile>, ManifestError> {
    let path = root_dir.join(HOOKS_MANIFEST_PATH);
    if !path.is_file() {
        return Ok(None);
    }
    let raw = fs::read_to_string(&path).map_err(|source| ManifestError::Read {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str::<HooksFile>(&raw)
        .map(Some)
        .map_err(|source| ManifestError::Parse { path, source })
}

/// Build the [`PluginManifest`] for one plugin directory. Never fails.
pub fn load_manifest(name: String, root_path: PathBuf) -> PluginManifest {
    match read_hooks_file(&root_path) {
        Ok(Some(file)) => PluginManifest {
            name,
            root_path,
            has_hooks: true,
            events: Some(file.hooks),
        },
        Ok(None) => PluginManifest {
            name,
            root_path,
            has_hooks: false,
            events: None,
        },
        Err(e) => {
            tracing::warn!(plugin = %name, error = %e, "ignoring malformed hook manifest");
            PluginManifest {
                name,
                root_path,
                has_hooks: true,
                events: None,
            }
        }
    }
}
