//! Layered settings for the libstrap CLI
//!
//! Precedence, lowest to highest: built-in defaults, `libstrap.toml`,
//! `LIBSTRAP_*` environment variables, command-line flags (applied by the
//! binary after [`Settings::load`]).
//!
//! ```toml
//! cache_dir = "/var/cache/libstrap"
//! fallback_url = "https://mirror.example.org/libstrap"
//! postprocessing_dir = "patches"
//! create_snapshots = true
//! http_timeout_secs = 60
//! user_agent = "my-build/1.0"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default HTTP timeout in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default User-Agent for downloads without a per-library override
pub const DEFAULT_USER_AGENT: &str = concat!("libstrap/", env!("CARGO_PKG_VERSION"));

const CONFIG_FILE_NAME: &str = "libstrap.toml";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SettingsToml {
    cache_dir: Option<PathBuf>,
    fallback_url: Option<String>,
    postprocessing_dir: Option<PathBuf>,
    create_snapshots: Option<bool>,
    http_timeout_secs: Option<u64>,
    user_agent: Option<String>,
}

/// Resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root of the content cache (`archives/` and `snapshots/` live below it)
    pub cache_dir: PathBuf,
    pub fallback_url: Option<String>,
    pub postprocessing_dir: Option<PathBuf>,
    pub create_snapshots: bool,
    pub http_timeout: Duration,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            fallback_url: None,
            postprocessing_dir: None,
            create_snapshots: false,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Settings {
    /// Load settings from an explicit config file, or from the default
    /// config location if it exists, then apply the process environment.
    pub fn load(config: Option<&Path>) -> Result<Self> {
        let mut settings = Self::default();

        let path = match config {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path().filter(|p| p.is_file()),
        };

        if let Some(path) = path {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            settings
                .merge_toml(&content)
                .with_context(|| format!("Invalid config file: {}", path.display()))?;
        }

        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Overlay the values present in a TOML document.
    pub fn merge_toml(&mut self, content: &str) -> Result<()> {
        let file: SettingsToml = toml::from_str(content)?;

        if let Some(dir) = file.cache_dir {
            self.cache_dir = dir;
        }
        if file.fallback_url.is_some() {
            self.fallback_url = file.fallback_url;
        }
        if file.postprocessing_dir.is_some() {
            self.postprocessing_dir = file.postprocessing_dir;
        }
        if let Some(create) = file.create_snapshots {
            self.create_snapshots = create;
        }
        if let Some(secs) = file.http_timeout_secs {
            self.http_timeout = clamp_timeout(secs);
        }
        if let Some(agent) = file.user_agent {
            self.user_agent = agent;
        }
        Ok(())
    }

    /// Overlay `LIBSTRAP_*` variables from `lookup`. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(dir) = get("LIBSTRAP_CACHE_DIR") {
            self.cache_dir = PathBuf::from(dir);
        }
        if let Some(url) = get("LIBSTRAP_FALLBACK_URL") {
            self.fallback_url = Some(url);
        }
        if let Some(secs) = get("LIBSTRAP_HTTP_TIMEOUT").and_then(|s| s.parse::<u64>().ok()) {
            self.http_timeout = clamp_timeout(secs);
        }
    }

    /// Directory holding per-library lock files.
    pub fn lock_dir(&self) -> PathBuf {
        self.cache_dir.join("locks")
    }
}

/// Clamp to a reasonable range (5-300 seconds)
fn clamp_timeout(secs: u64) -> Duration {
    Duration::from_secs(secs.clamp(5, 300))
}

/// `$XDG_CACHE_HOME/libstrap`, falling back to `./.libstrap-cache`.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("libstrap"))
        .unwrap_or_else(|| PathBuf::from(".libstrap-cache"))
}

/// `$XDG_CONFIG_HOME/libstrap/libstrap.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("libstrap").join(CONFIG_FILE_NAME))
}
