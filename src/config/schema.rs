use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::concurrency::{DEFAULT_LOCK_RETRY_INTERVAL, DEFAULT_LOCK_TIMEOUT};

/// Environment variable pointing at an alternative config file.
pub const CONFIG_PATH_ENV: &str = "HOOKDISPATCH_CONFIG";

/// Plugins root used when nothing is configured, relative to the home directory.
const DEFAULT_PLUGINS_SUBDIR: &str = ".claude/plugins/marketplaces/fusengine-plugins/plugins";

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Path the config was loaded from - computed, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub lock: LockConfig,
}

// ── Dispatch ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Directory whose subdirectories are plugins. `~` is expanded.
    #[serde(default = "default_plugins_dir")]
    pub plugins_dir: PathBuf,
    /// Interpreter for hook commands, invoked as `<shell> -c <command>`.
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Programs whose commands run fire-and-forget unless the manifest says otherwise.
    #[serde(default = "default_async_programs")]
    pub async_programs: Vec<String>,
}

fn default_plugins_dir() -> PathBuf {
    UserDirs::new()
        .map(|u| u.home_dir().join(DEFAULT_PLUGINS_SUBDIR))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PLUGINS_SUBDIR))
}

fn default_shell() -> String {
    crate::hooks::HookRunner::new().shell().to_string()
}

fn default_async_programs() -> Vec<String> {
    vec!["afplay".into(), "aplay".into(), "paplay".into()]
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            plugins_dir: default_plugins_dir(),
            shell: default_shell(),
            async_programs: default_async_programs(),
        }
    }
}

// ── Lock ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    #[serde(default = "default_lock_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_lock_retry_interval_ms")]
    pub retry_interval_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    u64::try_from(DEFAULT_LOCK_TIMEOUT.as_millis()).unwrap_or(5000)
}

fn default_lock_retry_interval_ms() -> u64 {
    u64::try_from(DEFAULT_LOCK_RETRY_INTERVAL.as_millis()).unwrap_or(100)
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_lock_timeout_ms(),
            retry_interval_ms: default_lock_retry_interval_ms(),
        }
    }
}

impl LockConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

impl Config {
    /// Default config file: `~/.hookdispatch/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        Ok(home.join(".hookdispatch").join("config.toml"))
    }

    /// Load from `$HOOKDISPATCH_CONFIG` or the default path, then apply env overrides.
    ///
    /// A missing file yields defaults. The file is never created.
    pub fn load() -> Result<Self> {
        let path = match std::env::var(CONFIG_PATH_ENV) {
            Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
            _ => Self::default_path()?,
        };
        let mut config = Self::load_from(&path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from an explicit path without env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str::<Config>(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else {
            Config::default()
        };
        config.config_path = path.to_path_buf();
        config.dispatch.plugins_dir = expand_home(&config.dispatch.plugins_dir);
        Ok(config)
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        // Plugins root: HOOKDISPATCH_PLUGINS_DIR
        if let Ok(dir) = std::env::var("HOOKDISPATCH_PLUGINS_DIR") {
            if !dir.is_empty() {
                self.dispatch.plugins_dir = expand_home(Path::new(&dir));
            }
        }

        // Shell: HOOKDISPATCH_SHELL
        if let Ok(shell) = std::env::var("HOOKDISPATCH_SHELL") {
            if !shell.is_empty() {
                self.dispatch.shell = shell;
            }
        }

        // Lock timeout: HOOKDISPATCH_LOCK_TIMEOUT_MS
        if let Ok(raw) = std::env::var("HOOKDISPATCH_LOCK_TIMEOUT_MS") {
            if let Ok(ms) = raw.trim().parse::<u64>() {
                self.lock.timeout_ms = ms;
            }
        }
    }
}

fn expand_home(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}
