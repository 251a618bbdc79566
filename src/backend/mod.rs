//! Collaborators on the hosted backend.
//!
//! The feed logic only talks to three narrow seams:
//!
//! - [`SessionProvider`]: current identity, change notifications, sign-out
//! - [`QueryService`]: paged post listing and single-post lookup
//! - [`MutationService`]: create-post and idempotent profile upsert
//!
//! [`BackendClient`] implements the query/mutation seams over the platform's
//! GraphQL and REST endpoints; [`SessionHub`] implements the session seam on
//! top of the auth endpoints and the locally persisted session.
//!
//! # Module Structure
//!
//! - `client` - shared HTTP transport, headers, size-capped body reads
//! - `auth` - password, one-time-code, refresh and logout calls
//! - `graphql` - query documents and response envelopes
//! - `posts` - `QueryService`/`MutationService` implementations
//! - `session` - `SessionHub` and `SessionSubscription`
//! - `types` - `Session`, `Post`, `Profile`, `NewPost`

mod auth;
mod client;
mod graphql;
mod posts;
mod session;
mod types;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub use auth::AuthGrant;
pub use client::BackendClient;
pub use session::{SessionHub, SessionSubscription};
pub use types::{AuthorSummary, NewPost, Post, Profile, Session};

// ============================================================================
// Error Types
// ============================================================================

/// Errors surfaced by backend calls. Rendered to the user via `Display`.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Not authenticated: {0}")]
    Unauthorized(String),
    #[error("HTTP error {status}: {message}")]
    HttpStatus { status: u16, message: String },
    /// The auth service rejected the request (bad credentials, expired code).
    #[error("{0}")]
    Auth(String),
    /// The GraphQL endpoint answered with a non-empty `errors` array.
    #[error("{0}")]
    GraphQl(String),
    #[error("Unexpected response from backend: {0}")]
    Decode(String),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl BackendError {
    /// True for failures that mean the session is no longer valid.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, BackendError::Unauthorized(_))
    }
}

// ============================================================================
// Seams
// ============================================================================

/// Source of the current authenticated identity.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// The current session, refreshed first when its token is about to
    /// expire. `Ok(None)` means signed out.
    async fn current_session(&self) -> Result<Option<Session>, BackendError>;

    /// Subscribe to session changes. Dropping or calling
    /// [`SessionSubscription::unsubscribe`] ends the subscription.
    fn subscribe(&self) -> SessionSubscription;

    /// End the session locally and at the auth service.
    async fn sign_out(&self) -> Result<(), BackendError>;
}

/// Read access to posts.
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Posts ordered by creation time descending, nulls last.
    async fn list_posts(
        &self,
        session: &Session,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Post>, BackendError>;

    /// A single post by id, `None` when no row matches.
    async fn get_post(&self, session: &Session, id: Uuid) -> Result<Option<Post>, BackendError>;
}

/// Write access to posts and profiles.
#[async_trait]
pub trait MutationService: Send + Sync {
    async fn create_post(&self, session: &Session, post: &NewPost) -> Result<Post, BackendError>;

    /// Insert or merge the profile row keyed by `profile.id`.
    async fn upsert_profile(&self, session: &Session, profile: &Profile)
        -> Result<(), BackendError>;
}
