//! Preference manager that merges config.toml defaults with DB overrides.
//!
//! Config values serve as defaults; DB values (user_preferences table) override them.
//! Writes always go to the DB, never to the config file.
use std::collections::HashMap;

use anyhow::Result;

use crate::config::Config;
use crate::storage::Database;
use crate::theme::ThemeVariant;

pub const THEME_KEY: &str = "theme";
pub const OPTIMISTIC_INSERT_KEY: &str = "optimistic_insert";
const KEYBIND_PREFIX: &str = "keybind.";

// ============================================================================
// PreferenceManager
// ============================================================================

/// Merged preference store: config.toml defaults + DB overrides.
///
/// Reads are in-memory. Writes persist to the DB, then update the map.
/// Backend credentials never enter this store.
pub struct PreferenceManager {
    prefs: HashMap<String, String>,
}

impl PreferenceManager {
    /// Load preferences by merging config defaults with DB overrides.
    pub async fn load(config: &Config, db: &Database) -> Result<Self> {
        let mut prefs = Self::flatten_config(config);

        for (key, value) in db.get_preferences_by_prefix("").await? {
            prefs.insert(key, value);
        }

        Ok(Self { prefs })
    }

    /// Create from config only (no DB). Fallback for when DB load fails.
    pub fn from_config(config: &Config) -> Self {
        Self {
            prefs: Self::flatten_config(config),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.prefs.get(key).map(String::as_str)
    }

    /// Set a preference: writes to DB and updates in-memory map.
    pub async fn set(&mut self, db: &Database, key: &str, value: &str) -> Result<()> {
        db.set_preference(key, value).await?;
        self.prefs.insert(key.to_string(), value.to_string());
        Ok(())
    }

    // ========================================================================
    // Type-safe Accessors
    // ========================================================================

    /// Stored theme, falling back to Dark for unknown names.
    pub fn theme_variant(&self) -> ThemeVariant {
        let name = self.get(THEME_KEY).unwrap_or("dark");
        ThemeVariant::from_str_name(name).unwrap_or_else(|| {
            tracing::warn!(theme = %name, "Unknown theme, using dark");
            ThemeVariant::Dark
        })
    }

    pub fn optimistic_insert(&self) -> bool {
        self.get(OPTIMISTIC_INSERT_KEY)
            .and_then(|v| v.parse().ok())
            .unwrap_or(false)
    }

    /// Keybinding overrides as action name → key string.
    pub fn keybinding_overrides(&self) -> HashMap<String, String> {
        self.prefs
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(KEYBIND_PREFIX)
                    .map(|action| (action.to_string(), v.clone()))
            })
            .collect()
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    fn flatten_config(config: &Config) -> HashMap<String, String> {
        let mut map = HashMap::new();

        map.insert(THEME_KEY.to_string(), config.theme.clone());
        map.insert(
            OPTIMISTIC_INSERT_KEY.to_string(),
            config.optimistic_insert.to_string(),
        );

        for (action, key_str) in &config.keybindings {
            map.insert(format!("{}{}", KEYBIND_PREFIX, action), key_str.clone());
        }

        map
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_load_defaults_from_config() {
        let db = test_db().await;
        let pm = PreferenceManager::load(&Config::default(), &db).await.unwrap();

        assert_eq!(pm.theme_variant(), ThemeVariant::Dark);
        assert!(!pm.optimistic_insert());
        assert!(pm.keybinding_overrides().is_empty());
    }

    #[tokio::test]
    async fn test_db_overrides_config() {
        let db = test_db().await;
        db.set_preference(THEME_KEY, "light").await.unwrap();

        let pm = PreferenceManager::load(&Config::default(), &db).await.unwrap();
        assert_eq!(pm.theme_variant(), ThemeVariant::Light);
    }

    #[tokio::test]
    async fn test_theme_toggle_survives_reload() {
        let db = test_db().await;
        let config = Config::default();

        let mut pm = PreferenceManager::load(&config, &db).await.unwrap();
        let next = pm.theme_variant().next();
        pm.set(&db, THEME_KEY, next.key()).await.unwrap();
        assert_eq!(pm.theme_variant(), ThemeVariant::Light);
        drop(pm);

        let pm = PreferenceManager::load(&config, &db).await.unwrap();
        assert_eq!(pm.theme_variant(), ThemeVariant::Light);
        assert_eq!(
            db.get_preference(THEME_KEY).await.unwrap().as_deref(),
            Some("light")
        );
    }

    #[tokio::test]
    async fn test_unknown_theme_falls_back_to_dark() {
        let config = Config {
            theme: "solarized".to_string(),
            ..Config::default()
        };
        let pm = PreferenceManager::from_config(&config);
        assert_eq!(pm.theme_variant(), ThemeVariant::Dark);
    }

    #[tokio::test]
    async fn test_optimistic_insert_from_config() {
        let config = Config {
            optimistic_insert: true,
            ..Config::default()
        };
        assert!(PreferenceManager::from_config(&config).optimistic_insert());
    }

    #[tokio::test]
    async fn test_keybinding_overrides_merge_config_and_db() {
        let db = test_db().await;
        let mut config = Config::default();
        config
            .keybindings
            .insert("quit".to_string(), "Ctrl+q".to_string());
        config
            .keybindings
            .insert("compose_post".to_string(), "w".to_string());
        db.set_preference("keybind.compose_post", "N").await.unwrap();

        let pm = PreferenceManager::load(&config, &db).await.unwrap();
        let overrides = pm.keybinding_overrides();

        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides.get("quit").map(String::as_str), Some("Ctrl+q"));
        assert_eq!(overrides.get("compose_post").map(String::as_str), Some("N"));
    }

    #[tokio::test]
    async fn test_credentials_not_flattened() {
        let config = Config {
            anon_key: Some("secret".to_string()),
            backend_url: Some("https://x.example.co".to_string()),
            ..Config::default()
        };
        let pm = PreferenceManager::from_config(&config);
        assert_eq!(pm.get("anon_key"), None);
        assert_eq!(pm.get("backend_url"), None);
    }
}
