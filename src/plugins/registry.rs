use std::path::Path;

use super::discovery::scan_plugins;
use super::manifest::PluginManifest;

/// Plugins found under one root, in scan order.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: Vec<PluginManifest>,
}

impl PluginRegistry {
    pub fn scan(plugins_root: &Path) -> Self {
        let plugins = scan_plugins(plugins_root);
        tracing::debug!(
            root = %plugins_root.display(),
            plugins = plugins.len(),
            with_hooks = plugins.iter().filter(|p| p.has_hooks).count(),
            "scanned plugins"
        );
        Self { plugins }
    }

    pub fn plugins(&self) -> &[PluginManifest] {
        &self.plugins
    }

    pub fn get(&self, name: &str) -> Option<&PluginManifest> {
        self.plugins.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
