use anyhow::Result;

use super::schema::Database;

impl Database {
    // ========================================================================
    // User Preferences Operations
    // ========================================================================

    /// Get a single preference value by key.
    ///
    /// Keys use dotted convention: `theme.variant`, `feed.optimistic_insert`,
    /// `keybind.feed.compose_post`.
    pub async fn get_preference(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM user_preferences WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(value,)| value))
    }

    /// Set a preference value (UPSERT), refreshing `updated_at`.
    pub async fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_preferences (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All preferences whose key starts with `prefix`, ordered by key.
    ///
    /// `LIKE` wildcards in the prefix are escaped, so `feed_` matches only
    /// keys that literally start with `feed_`.
    pub async fn get_preferences_by_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        let escaped = prefix
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("{}%", escaped);
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT key, value FROM user_preferences WHERE key LIKE ? ESCAPE '\\' ORDER BY key",
        )
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::Database;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_get_preference_missing() {
        let db = test_db().await;
        let value = db.get_preference("nonexistent.key").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_set_preference_upsert() {
        let db = test_db().await;
        db.set_preference("theme.variant", "dark").await.unwrap();
        db.set_preference("theme.variant", "light").await.unwrap();

        let value = db.get_preference("theme.variant").await.unwrap();
        assert_eq!(value, Some("light".to_string()));
    }

    #[tokio::test]
    async fn test_get_preferences_by_prefix() {
        let db = test_db().await;
        db.set_preference("feed.optimistic_insert", "true")
            .await
            .unwrap();
        db.set_preference("keybind.feed.compose_post", "n")
            .await
            .unwrap();
        db.set_preference("keybind.global.quit", "q").await.unwrap();

        let binds = db.get_preferences_by_prefix("keybind.").await.unwrap();
        assert_eq!(
            binds,
            vec![
                ("keybind.feed.compose_post".to_string(), "n".to_string()),
                ("keybind.global.quit".to_string(), "q".to_string()),
            ]
        );

        let all = db.get_preferences_by_prefix("").await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_prefix_wildcards_are_literal() {
        let db = test_db().await;
        db.set_preference("feed_x", "1").await.unwrap();
        db.set_preference("feedAx", "2").await.unwrap();

        let prefs = db.get_preferences_by_prefix("feed_").await.unwrap();
        assert_eq!(prefs, vec![("feed_x".to_string(), "1".to_string())]);
    }

    #[tokio::test]
    async fn test_prefix_no_false_matches() {
        let db = test_db().await;
        db.set_preference("theme.variant", "dark").await.unwrap();
        db.set_preference("thematic.value", "test").await.unwrap();

        let prefs = db.get_preferences_by_prefix("theme.").await.unwrap();
        assert_eq!(prefs.len(), 1);
        assert_eq!(prefs[0].0, "theme.variant");
    }
}
