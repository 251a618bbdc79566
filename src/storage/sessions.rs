use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};

use super::schema::Database;
use super::types::SessionRow;
use crate::backend::Session;

impl Database {
    // ========================================================================
    // Persisted Session Operations
    // ========================================================================

    /// Store `session` as the installation's signed-in identity, replacing
    /// any previous one.
    pub async fn save_session(&self, session: &Session) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_session
                (id, user_id, email, full_name, access_token, refresh_token, expires_at, saved_at)
            VALUES (1, ?, ?, ?, ?, ?, ?, datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                email = excluded.email,
                full_name = excluded.full_name,
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                expires_at = excluded.expires_at,
                saved_at = excluded.saved_at
        "#,
        )
        .bind(session.user_id.to_string())
        .bind(&session.email)
        .bind(session.full_name.as_deref())
        .bind(session.access_token.expose_secret())
        .bind(session.refresh_token.expose_secret())
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The stored session, if any. Expiry is not checked here.
    pub async fn load_session(&self) -> Result<Option<Session>> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT user_id, email, full_name, access_token, refresh_token, expires_at \
             FROM auth_session WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some((user_id, email, full_name, access, refresh, expires_at)) = row else {
            return Ok(None);
        };

        let user_id = user_id
            .parse()
            .with_context(|| format!("Stored session has invalid user id '{}'", user_id))?;

        Ok(Some(Session {
            user_id,
            email,
            full_name,
            access_token: SecretString::from(access),
            refresh_token: SecretString::from(refresh),
            expires_at,
        }))
    }

    pub async fn clear_session(&self) -> Result<()> {
        sqlx::query("DELETE FROM auth_session")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::Session;
    use crate::storage::Database;
    use pretty_assertions::assert_eq;
    use secrecy::{ExposeSecret, SecretString};
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    fn session(token: &str) -> Session {
        Session {
            user_id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            full_name: Some("Ada".to_string()),
            access_token: SecretString::from(token.to_string()),
            refresh_token: SecretString::from("refresh".to_string()),
            expires_at: Some(1_900_000_000),
        }
    }

    #[tokio::test]
    async fn test_load_without_session() {
        let db = test_db().await;
        assert!(db.load_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_load_session() {
        let db = test_db().await;
        let s = session("tok-1");
        db.save_session(&s).await.unwrap();

        let loaded = db.load_session().await.unwrap().unwrap();
        assert_eq!(loaded.user_id, s.user_id);
        assert_eq!(loaded.full_name.as_deref(), Some("Ada"));
        assert_eq!(loaded.access_token.expose_secret(), "tok-1");
        assert_eq!(loaded.expires_at, Some(1_900_000_000));
    }

    #[tokio::test]
    async fn test_save_replaces_previous() {
        let db = test_db().await;
        db.save_session(&session("old")).await.unwrap();
        let newer = session("new");
        db.save_session(&newer).await.unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM auth_session")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(count.0, 1);

        let loaded = db.load_session().await.unwrap().unwrap();
        assert_eq!(loaded.user_id, newer.user_id);
        assert_eq!(loaded.access_token.expose_secret(), "new");
    }

    #[tokio::test]
    async fn test_clear_session() {
        let db = test_db().await;
        db.save_session(&session("tok")).await.unwrap();
        db.clear_session().await.unwrap();
        assert!(db.load_session().await.unwrap().is_none());
    }
}
