//! Configuration file parser for ~/.config/devlog/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde but logged, since they are usually typos.
//! The backend endpoint and project key can also come from the environment
//! (`DEVLOG_BACKEND_URL`, `DEVLOG_ANON_KEY`), which wins over the file.
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

pub const ENV_BACKEND_URL: &str = "DEVLOG_BACKEND_URL";
pub const ENV_ANON_KEY: &str = "DEVLOG_ANON_KEY";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// A required backend setting is absent from both file and environment.
    #[error("No {key} configured: set `{key}` in config.toml or the {env} environment variable")]
    Missing {
        key: &'static str,
        env: &'static str,
    },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// The anon key is masked in `Debug` output.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the hosted backend, e.g. `https://abc.example.co`.
    pub backend_url: Option<String>,

    /// Public project key sent as the `apikey` header.
    pub anon_key: Option<String>,

    /// Theme variant name ("dark" or "light").
    pub theme: String,

    /// Per-request timeout for backend calls.
    pub request_timeout_secs: u64,

    /// Prepend a just-published post to page 1 instead of refetching.
    pub optimistic_insert: bool,

    /// Keybinding overrides. Keys are action names, values are key strings.
    pub keybindings: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: None,
            anon_key: None,
            theme: "dark".to_string(),
            request_timeout_secs: 30,
            optimistic_insert: false,
            keybindings: HashMap::new(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("backend_url", &self.backend_url)
            .field("anon_key", &self.anon_key.as_ref().map(|_| "[REDACTED]"))
            .field("theme", &self.theme)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("optimistic_insert", &self.optimistic_insert)
            .field("keybindings", &self.keybindings)
            .finish()
    }
}

/// Resolved connection settings for the backend client.
pub struct BackendSettings {
    pub url: String,
    pub anon_key: SecretString,
    pub timeout_secs: u64,
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "backend_url",
                "anon_key",
                "theme",
                "request_timeout_secs",
                "optimistic_insert",
                "keybindings",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            theme = %config.theme,
            optimistic_insert = config.optimistic_insert,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Backend settings with environment overrides applied.
    pub fn backend_settings(&self) -> Result<BackendSettings, ConfigError> {
        self.backend_settings_with(
            std::env::var(ENV_BACKEND_URL).ok(),
            std::env::var(ENV_ANON_KEY).ok(),
        )
    }

    /// Backend settings where `env_url`/`env_key` take precedence over the
    /// file. Blank values count as absent.
    pub fn backend_settings_with(
        &self,
        env_url: Option<String>,
        env_key: Option<String>,
    ) -> Result<BackendSettings, ConfigError> {
        fn non_blank(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }

        let url = non_blank(env_url)
            .or_else(|| non_blank(self.backend_url.clone()))
            .ok_or(ConfigError::Missing {
                key: "backend_url",
                env: ENV_BACKEND_URL,
            })?;
        let key = non_blank(env_key)
            .or_else(|| non_blank(self.anon_key.clone()))
            .ok_or(ConfigError::Missing {
                key: "anon_key",
                env: ENV_ANON_KEY,
            })?;

        Ok(BackendSettings {
            url,
            anon_key: SecretString::from(key),
            timeout_secs: self.request_timeout_secs,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
