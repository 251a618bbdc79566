//! The signed-in identity and its change notifications.

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};

use super::{
    AuthGrant, BackendClient, BackendError, MutationService, Profile, Session, SessionProvider,
};
use crate::storage::Database;

/// Seconds before expiry at which `current_session` refreshes the token.
const REFRESH_LEEWAY_SECS: i64 = 60;

/// Owns the current session: publishes changes to subscribers and mirrors
/// them into the local database.
pub struct SessionHub {
    client: BackendClient,
    db: Database,
    tx: watch::Sender<Option<Session>>,
    /// Serializes refreshes so concurrent callers do not spend the same
    /// refresh token twice.
    refresh_lock: Mutex<()>,
    /// Bumped on every sign-in and sign-out. Held while a session change is
    /// persisted and published, so a refresh started under an older epoch
    /// cannot land after the user has signed out.
    epoch: Mutex<u64>,
}

impl SessionHub {
    pub fn new(client: BackendClient, db: Database, initial: Option<Session>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            client,
            db,
            tx,
            refresh_lock: Mutex::new(()),
            epoch: Mutex::new(0),
        }
    }

    /// Build a hub seeded with the session persisted by a previous run.
    /// A corrupt stored row is discarded.
    pub async fn restore(client: BackendClient, db: Database) -> Self {
        let stored = match db.load_session().await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable stored session");
                if let Err(e) = db.clear_session().await {
                    tracing::warn!(error = %e, "Failed to clear stored session");
                }
                None
            }
        };
        if let Some(s) = &stored {
            tracing::info!(user_id = %s.user_id, "Restored stored session");
        }
        Self::new(client, db, stored)
    }

    /// Sign in and make the result the current session.
    ///
    /// The user's profile row is upserted afterwards; failure there is logged
    /// and does not fail the sign-in.
    pub async fn sign_in(&self, grant: AuthGrant) -> Result<Session, BackendError> {
        let session = match &grant {
            AuthGrant::Password { email, password } => {
                self.client.sign_in_with_password(email, password).await?
            }
            AuthGrant::EmailCode { email, code } => {
                self.client.verify_email_code(email, code).await?
            }
        };

        {
            let mut epoch = self.epoch.lock().await;
            *epoch += 1;
            self.persist(Some(&session)).await;
            self.tx.send_replace(Some(session.clone()));
        }

        if let Err(e) = self
            .client
            .upsert_profile(&session, &Profile::from_session(&session))
            .await
        {
            tracing::warn!(error = %e, "Profile sync after sign-in failed");
        }

        Ok(session)
    }

    pub async fn send_email_code(&self, email: &str) -> Result<(), BackendError> {
        self.client.send_email_code(email).await
    }

    /// Last published session, without refreshing.
    pub fn snapshot(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    async fn persist(&self, session: Option<&Session>) {
        let result = match session {
            Some(s) => self.db.save_session(s).await,
            None => self.db.clear_session().await,
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist session");
        }
    }

    async fn refresh(&self, stale: Session) -> Result<Option<Session>, BackendError> {
        let _guard = self.refresh_lock.lock().await;
        let started = *self.epoch.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(current) = self.snapshot() {
            let now = chrono::Utc::now().timestamp();
            if current.user_id == stale.user_id && !current.expires_within(now, REFRESH_LEEWAY_SECS)
            {
                return Ok(Some(current));
            }
        } else {
            return Ok(None);
        }

        let outcome = self.client.refresh_session(&stale).await;

        let epoch = self.epoch.lock().await;
        if *epoch != started {
            tracing::debug!("Discarding refresh that raced a sign-in or sign-out");
            return Ok(self.snapshot());
        }
        match outcome {
            Ok(fresh) => {
                self.persist(Some(&fresh)).await;
                self.tx.send_replace(Some(fresh.clone()));
                Ok(Some(fresh))
            }
            Err(e) if e.is_auth_failure() => {
                tracing::info!(error = %e, "Refresh token rejected, signing out");
                self.persist(None).await;
                self.tx.send_replace(None);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl SessionProvider for SessionHub {
    async fn current_session(&self) -> Result<Option<Session>, BackendError> {
        let Some(session) = self.snapshot() else {
            return Ok(None);
        };
        if session.expires_within(chrono::Utc::now().timestamp(), REFRESH_LEEWAY_SECS) {
            return self.refresh(session).await;
        }
        Ok(Some(session))
    }

    fn subscribe(&self) -> SessionSubscription {
        SessionSubscription::new(self.tx.subscribe())
    }

    /// Local state is cleared first, so sign-out succeeds offline. Remote
    /// revocation is best effort.
    async fn sign_out(&self) -> Result<(), BackendError> {
        let previous = {
            let mut epoch = self.epoch.lock().await;
            *epoch += 1;
            let previous = self.tx.send_replace(None);
            self.db
                .clear_session()
                .await
                .map_err(|e| BackendError::Storage(e.to_string()))?;
            previous
        };

        if let Some(session) = previous {
            tracing::info!(user_id = %session.user_id, "Signed out");
            if let Err(e) = self.client.revoke_session(&session).await {
                tracing::warn!(error = %e, "Remote sign-out failed");
            }
        }
        Ok(())
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Handle on session-change notifications.
///
/// Each change is observed at most once; intermediate values may be skipped
/// when several changes land before the holder looks. Dropping the handle
/// (or calling [`unsubscribe`](Self::unsubscribe)) ends delivery.
pub struct SessionSubscription {
    rx: watch::Receiver<Option<Session>>,
}

impl SessionSubscription {
    pub fn new(rx: watch::Receiver<Option<Session>>) -> Self {
        Self { rx }
    }

    /// Wait for the next change. `None` once the publisher is gone.
    pub async fn changed(&mut self) -> Option<Option<Session>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// The value as of now, without marking it seen.
    pub fn current(&self) -> Option<Session> {
        self.rx.borrow().clone()
    }

    pub fn unsubscribe(self) {}
}
