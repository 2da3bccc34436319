//! Resolver settings loaded from a JSON file and the environment.
//!
//! The file lives in the standard configuration directory
//! (`~/.config/avatarkit/settings.json` on most platforms) unless
//! `AVATARKIT_SETTINGS_PATH` points elsewhere. A missing file yields the
//! defaults; a malformed file is logged and ignored. Individual values can be
//! overridden with environment variables.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use avatarkit_types::{DEFAULT_SIZE_PX, Scheme};
use dirs_next::{config_dir, home_dir};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Environment variable allowing callers to override the settings file path.
pub const SETTINGS_PATH_ENV: &str = "AVATARKIT_SETTINGS_PATH";

/// Environment variable forcing high-density (retina) sizing on or off.
pub const HIGH_DENSITY_ENV: &str = "AVATARKIT_HIGH_DENSITY";

/// Environment variable selecting the URL scheme (`https` or `http`).
pub const SCHEME_ENV: &str = "AVATARKIT_SCHEME";

/// Default filename for the JSON payload.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Error surfaced when reading settings fails.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// I/O failure other than a missing file.
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization failure while writing settings.
    #[error("settings serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Tunables shared by the providers, the fetch adapter and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Scheme used for provider URLs.
    pub scheme: Scheme,
    /// Treat the display surface as high-density; doubles Gravatar sizes.
    pub high_density: bool,
    /// Size used when a caller omits one.
    pub default_size_px: u32,
    /// Initials background palette; empty means the built-in palette.
    pub palette: Vec<String>,
    /// Transport timeout for lookup requests, in seconds.
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            scheme: Scheme::Https,
            high_density: false,
            default_size_px: DEFAULT_SIZE_PX,
            palette: Vec::new(),
            request_timeout_secs: 30,
            user_agent: format!("avatarkit/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS),
        }
    }
}

impl ResolverSettings {
    /// Load settings from the default location and apply environment overrides.
    pub fn load() -> Result<Self, SettingsError> {
        let path = default_settings_path();
        Ok(Self::load_from(&path)?.with_env_overrides())
    }

    /// Load settings from `path` without consulting the environment.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        match fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(settings) => {
                    debug!(path = %path.display(), "loaded resolver settings");
                    Ok(settings)
                }
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        error = %error,
                        "Failed to parse settings file; using defaults"
                    );
                    Ok(Self::default())
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(SettingsError::Io(error)),
        }
    }

    /// Apply `AVATARKIT_HIGH_DENSITY` and `AVATARKIT_SCHEME` when set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = env::var(HIGH_DENSITY_ENV) {
            self.high_density = parse_flag(&raw);
        }
        if let Ok(raw) = env::var(SCHEME_ENV) {
            match raw.parse::<Scheme>() {
                Ok(scheme) => self.scheme = scheme,
                Err(error) => warn!(value = %raw, error = %error, "ignoring invalid {}", SCHEME_ENV),
            }
        }
        self
    }

    /// Persist settings as pretty JSON, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Resolve the settings file path from the environment or the config directory.
pub fn default_settings_path() -> PathBuf {
    if let Ok(path) = env::var(SETTINGS_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return expand_tilde(trimmed);
        }
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("avatarkit")
        .join(SETTINGS_FILE_NAME)
}

fn expand_tilde(path: &str) -> PathBuf {
    let home = || home_dir().unwrap_or_else(|| PathBuf::from("~"));
    if path == "~" {
        return home();
    }
    match path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        Some(rest) => home().join(rest),
        None => PathBuf::from(path),
    }
}
