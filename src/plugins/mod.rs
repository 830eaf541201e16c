pub mod discovery;
pub mod manifest;
pub mod registry;

pub use discovery::scan_plugins;
pub use manifest::{EventEntry, HookCommand, ManifestError, PluginManifest};
pub use registry::PluginRegistry;
