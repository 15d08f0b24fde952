use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::version::registries::npm::DEFAULT_BASE_URL;

// =============================================================================
// Time-related constants
// =============================================================================

/// Default interval between forced background refreshes in milliseconds (10 minutes)
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 10 * 60 * 1000;

/// Default delay before the forced re-resolution that follows the first pass (1 second)
pub const DEFAULT_FOLLOW_UP_DELAY_MS: u64 = 1000;

/// Delay between starting each fetch request to avoid rate limiting (10ms)
pub const FETCH_STAGGER_DELAY_MS: u64 = 10;

/// Namespace prefix of cache keys
pub const CACHE_KEY_PREFIX: &str = "dep-package";

/// File name of the manifest this server annotates
pub const MANIFEST_FILE_NAME: &str = "package.json";

/// Environment variable holding the tracing filter directive
pub const LOG_ENV: &str = "VERSION_LENS_LOG";

/// File name prefix of the rotating server log
pub const LOG_FILE_NAME: &str = "version-lens.log";

/// LSP configuration structure, read from `initializationOptions`
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LspConfig {
    pub refresh: RefreshConfig,
    pub registry: RegistryConfig,
}

/// Refresh policy configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RefreshConfig {
    /// Interval between forced background refreshes in milliseconds
    pub interval_ms: u64,
    /// Delay before the forced pass that follows a document's first pass
    pub follow_up_delay_ms: u64,
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn follow_up_delay(&self) -> Duration {
        Duration::from_millis(self.follow_up_delay_ms)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            follow_up_delay_ms: DEFAULT_FOLLOW_UP_DELAY_MS,
        }
    }
}

/// Registry configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    pub url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Returns the path to the data directory for version-lens.
/// Uses $XDG_DATA_HOME/version-lens if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/version-lens,
/// or ./version-lens if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the database file.
pub fn db_path() -> PathBuf {
    data_dir().join("versions.db")
}

/// Returns the directory log files are written to.
pub fn log_dir() -> PathBuf {
    data_dir().join("logs")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("version-lens")
}
