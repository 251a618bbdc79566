use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::email_local_part;

// ============================================================================
// Session
// ============================================================================

/// An authenticated identity issued by the hosted auth service.
///
/// Tokens are `SecretString`s so they never reach `Debug` output or logs.
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    /// `user_metadata.full_name`, falling back to `user_metadata.name`.
    pub full_name: Option<String>,
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    /// Unix seconds at which the access token expires.
    pub expires_at: Option<i64>,
}

impl Session {
    /// Name shown for the signed-in user: full name when present, otherwise
    /// the local part of the email address.
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => email_local_part(&self.email),
        }
    }

    /// True when the access token expires within `leeway_secs` of `now`.
    pub fn expires_within(&self, now: i64, leeway_secs: i64) -> bool {
        self.expires_at
            .is_some_and(|exp| exp.saturating_sub(leeway_secs) <= now)
    }
}

impl Clone for Session {
    fn clone(&self) -> Self {
        Self {
            user_id: self.user_id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            access_token: SecretString::from(self.access_token.expose_secret().to_owned()),
            refresh_token: SecretString::from(self.refresh_token.expose_secret().to_owned()),
            expires_at: self.expires_at,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

// ============================================================================
// Posts
// ============================================================================

/// Author attribution joined from the `profiles` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
}

/// A published post. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    /// Markdown body.
    pub content: String,
    /// Nullable on the wire; ordering puts missing timestamps last.
    pub created_at: Option<DateTime<Utc>>,
    pub author_id: Uuid,
    #[serde(rename = "profiles", default)]
    pub author: Option<AuthorSummary>,
}

impl Post {
    /// Author name for display, `"Anonymous"` when the profile join is empty.
    pub fn author_name(&self) -> &str {
        self.author
            .as_ref()
            .and_then(|a| a.full_name.as_deref())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("Anonymous")
    }
}

/// Payload for the create-post mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
}

// ============================================================================
// Profiles
// ============================================================================

/// Public profile row, keyed by the identity's subject id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
}

impl Profile {
    /// Profile derived from a session, as written before publishing.
    pub fn from_session(session: &Session) -> Self {
        Self {
            id: session.user_id,
            email: session.email.clone(),
            full_name: session.full_name.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(full_name: Option<&str>) -> Session {
        Session {
            user_id: Uuid::nil(),
            email: "ada@example.com".to_string(),
            full_name: full_name.map(str::to_string),
            access_token: SecretString::from("access-abc".to_string()),
            refresh_token: SecretString::from("refresh-xyz".to_string()),
            expires_at: Some(1_000),
        }
    }

    #[test]
    fn test_display_name_prefers_full_name() {
        assert_eq!(session(Some("Ada Lovelace")).display_name(), "Ada Lovelace");
    }

    #[test]
    fn test_display_name_falls_back_to_email_local_part() {
        assert_eq!(session(None).display_name(), "ada");
        assert_eq!(session(Some("   ")).display_name(), "ada");
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let out = format!("{:?}", session(None));
        assert!(!out.contains("access-abc"));
        assert!(!out.contains("refresh-xyz"));
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn test_clone_keeps_tokens() {
        let s = session(None);
        let c = s.clone();
        assert_eq!(c.access_token.expose_secret(), "access-abc");
        assert_eq!(c.user_id, s.user_id);
    }

    #[test]
    fn test_expires_within() {
        let s = session(None);
        assert!(s.expires_within(990, 60));
        assert!(!s.expires_within(900, 60));
    }

    #[test]
    fn test_post_deserializes_graphql_node() {
        let json = r#"{
            "id": "6f1c2d3e-0000-4000-8000-000000000001",
            "title": "Hello",
            "content": "Body",
            "created_at": "2024-03-05T10:20:30.123456+00:00",
            "author_id": "6f1c2d3e-0000-4000-8000-0000000000aa",
            "profiles": {"id": "6f1c2d3e-0000-4000-8000-0000000000aa", "full_name": "Ada", "email": "ada@example.com"}
        }"#;
        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.title, "Hello");
        assert_eq!(post.author_name(), "Ada");
        assert!(post.created_at.is_some());
    }

    #[test]
    fn test_post_without_profile_is_anonymous() {
        let json = r#"{
            "id": "6f1c2d3e-0000-4000-8000-000000000001",
            "title": "Hello",
            "content": "Body",
            "created_at": null,
            "author_id": "6f1c2d3e-0000-4000-8000-0000000000aa",
            "profiles": null
        }"#;
        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.author_name(), "Anonymous");
        assert!(post.created_at.is_none());
    }

    #[test]
    fn test_profile_from_session() {
        let p = Profile::from_session(&session(None));
        assert_eq!(p.full_name, "");
        assert_eq!(p.email, "ada@example.com");
    }
}
