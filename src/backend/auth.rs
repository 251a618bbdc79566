//! Calls against the hosted auth service.

use secrecy::SecretString;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{BackendClient, BackendError, Session};

/// Credentials accepted by [`SessionHub::sign_in`](super::SessionHub::sign_in).
pub enum AuthGrant {
    Password { email: String, password: SecretString },
    /// A one-time code previously mailed by [`BackendClient::send_email_code`].
    EmailCode { email: String, code: String },
}

impl AuthGrant {
    pub fn email(&self) -> &str {
        match self {
            AuthGrant::Password { email, .. } | AuthGrant::EmailCode { email, .. } => email,
        }
    }
}

impl std::fmt::Debug for AuthGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthGrant::Password { email, .. } => f
                .debug_struct("Password")
                .field("email", email)
                .field("password", &"[REDACTED]")
                .finish(),
            AuthGrant::EmailCode { email, .. } => f
                .debug_struct("EmailCode")
                .field("email", email)
                .field("code", &"[REDACTED]")
                .finish(),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

#[derive(Deserialize)]
struct AuthUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Default, Deserialize)]
struct UserMetadata {
    full_name: Option<String>,
    name: Option<String>,
}

impl TokenResponse {
    fn into_session(self, now: i64) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| now.saturating_add(secs)));
        let meta = self.user.user_metadata;
        Session {
            user_id: self.user.id,
            email: self.user.email.unwrap_or_default(),
            full_name: meta.full_name.or(meta.name),
            access_token: SecretString::from(self.access_token),
            refresh_token: SecretString::from(self.refresh_token),
            expires_at,
        }
    }
}

/// The auth service answers bad credentials and stale codes with 400/422.
fn rejected_as_auth(err: BackendError) -> BackendError {
    match err {
        BackendError::HttpStatus { status, message } if status == 400 || status == 422 => {
            BackendError::Auth(message)
        }
        BackendError::Unauthorized(message) => BackendError::Auth(message),
        other => other,
    }
}

impl BackendClient {
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Session, BackendError> {
        use secrecy::ExposeSecret;

        let body = json!({ "email": email, "password": password.expose_secret() });
        let token: TokenResponse = self
            .send_json(self.post("/auth/v1/token?grant_type=password", None), &body)
            .await
            .map_err(rejected_as_auth)?;
        tracing::info!(user_id = %token.user.id, "Signed in with password");
        Ok(token.into_session(chrono::Utc::now().timestamp()))
    }

    /// Ask the auth service to mail a one-time sign-in code. Creates the
    /// account when the address is new.
    pub async fn send_email_code(&self, email: &str) -> Result<(), BackendError> {
        let body = json!({ "email": email, "create_user": true });
        self.send_expect_empty(self.post("/auth/v1/otp", None), &body)
            .await
            .map_err(rejected_as_auth)?;
        tracing::info!("Email sign-in code requested");
        Ok(())
    }

    pub async fn verify_email_code(&self, email: &str, code: &str) -> Result<Session, BackendError> {
        let body = json!({ "type": "email", "email": email, "token": code.trim() });
        let token: TokenResponse = self
            .send_json(self.post("/auth/v1/verify", None), &body)
            .await
            .map_err(rejected_as_auth)?;
        tracing::info!(user_id = %token.user.id, "Signed in with email code");
        Ok(token.into_session(chrono::Utc::now().timestamp()))
    }

    /// Exchange a refresh token for a new session. A rejected refresh token
    /// comes back as [`BackendError::Unauthorized`].
    pub async fn refresh_session(&self, session: &Session) -> Result<Session, BackendError> {
        use secrecy::ExposeSecret;

        let body = json!({ "refresh_token": session.refresh_token.expose_secret() });
        let token: TokenResponse = self
            .send_json(self.post("/auth/v1/token?grant_type=refresh_token", None), &body)
            .await
            .map_err(|e| match e {
                BackendError::HttpStatus { status, message } if status == 400 => {
                    BackendError::Unauthorized(message)
                }
                other => other,
            })?;
        tracing::debug!(user_id = %token.user.id, "Session refreshed");
        Ok(token.into_session(chrono::Utc::now().timestamp()))
    }

    /// Revoke the session's refresh token at the auth service.
    pub async fn revoke_session(&self, session: &Session) -> Result<(), BackendError> {
        self.send_expect_empty(
            self.post("/auth/v1/logout", Some(&session.access_token)),
            &json!({}),
        )
        .await
    }
}
