//! Plugin discovery over a plugins root directory.
//!
//! Every immediate subdirectory yields exactly one [`PluginManifest`], whether
//! or not it carries a usable `hooks/hooks.json`.

use std::fs::DirEntry;
use std::io;
use std::path::{Path, PathBuf};

use super::manifest::{load_manifest, PluginManifest};

/// Scan `plugins_root` and load one manifest per subdirectory.
///
/// Subdirectories are visited in file-name order so dispatch order is stable
/// across runs. A missing or unreadable root yields an empty list.
pub fn scan_plugins(plugins_root: &Path) -> Vec<PluginManifest> {
    let entries = match std::fs::read_dir(plugins_root) {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!(root = %plugins_root.display(), error = %e, "plugins root not readable");
            return Vec::new();
        }
    };

    let mut dirs: Vec<(String, PathBuf)> = entries
        .filter_map(|entry| readable_entry(entry, plugins_root))
        .filter(|entry| entry.path().is_dir())
        .map(|entry| {
            (
                entry.file_name().to_string_lossy().into_owned(),
                entry.path(),
            )
        })
        .collect();
    dirs.sort_by(|a, b| a.0.cmp(&b.0));

    dirs.into_iter()
        .map(|(name, path)| {
            let root = std::path::absolute(&path).unwrap_or(path);
            load_manifest(name, root)
        })
        .collect()
}

fn readable_entry(entry: io::Result<DirEntry>, plugins_root: &Path) -> Option<DirEntry> {
    match entry {
        Ok(entry) => Some(entry),
        Err(e) => {
            tracing::debug!(root = %plugins_root.display(), error = %e, "skipping unreadable plugins root entry");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn make_plugin_dir(parent: &Path, name: &str, manifest: Option<&str>) {
        let dir = parent.join(name);
        fs::create_dir_all(&dir).unwrap();
        if let Some(body) = manifest {
            fs::create_dir_all(dir.join("hooks")).unwrap();
            fs::write(dir.join("hooks").join("hooks.json"), body).unwrap();
        }
    }

    #[test]
    fn scan_empty_root() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(scan_plugins(tmp.path()).is_empty());
    }

    #[test]
    fn scan_missing_root() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(scan_plugins(&tmp.path().join("nope")).is_empty());
    }

    #[test]
    fn scan_detects_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        make_plugin_dir(tmp.path(), "my-plugin", Some(r#"{ "hooks": { "PreToolUse": [] } }"#));

        let plugins = scan_plugins(tmp.path());
        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins[0].name, "my-plugin");
        assert!(plugins[0].has_hooks);
        assert!(plugins[0].events.is_some());
        assert!(plugins[0].root_path.is_absolute());
    }

    #[test]
    fn scan_keeps_plugins_without_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        make_plugin_dir(tmp.path(), "no-hooks", None);
        fs::write(tmp.path().join("no-hooks").join("README.md"), "# Plugin").unwrap();

        let plugins = scan_plugins(tmp.path());
        assert_eq!(plugins.len(), 1);
        assert!(!plugins[0].has_hooks);
        assert!(plugins[0].events.is_none());
    }

    #[test]
    fn scan_never_drops_malformed_plugins() {
        let tmp = tempfile::tempdir().unwrap();
        make_plugin_dir(tmp.path(), "a-good", Some(r#"{ "hooks": {} }"#));
        make_plugin_dir(tmp.path(), "b-bad", Some("{ invalid json }"));
        make_plugin_dir(tmp.path(), "c-none", None);

        let plugins = scan_plugins(tmp.path());
        assert_eq!(plugins.len(), 3);
        let names: Vec<_> = plugins.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a-good", "b-bad", "c-none"]);
        assert!(plugins[1].has_hooks);
        assert!(plugins[1].events.is_none());
    }

    #[test]
    fn unreadable_entry_is_skipped() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert!(readable_entry(Err(err), Path::new("/plugins")).is_none());

        let tmp = tempfile::tempdir().unwrap();
        make_plugin_dir(tmp.path(), "ok", None);
        let entry = fs::read_dir(tmp.path()).unwrap().next().unwrap();
        assert_eq!(
            readable_entry(entry, tmp.path()).unwrap().file_name(),
            "ok"
        );
    }

    #[test]
    fn scan_ignores_plain_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("stray.txt"), "x").unwrap();
        make_plugin_dir(tmp.path(), "real", None);

        let plugins = scan_plugins(tmp.path());
        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins[0].name, "real");
    }
}
