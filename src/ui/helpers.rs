//! Background task spawning for the UI layer.
//!
//! Every backend call runs in its own task and reports back through an
//! `AppEvent`. Panics inside a task are caught and surfaced as
//! `AppEvent::TaskPanicked` so the event handler can unstick the state that
//! was waiting on it.

use crate::app::{App, AppEvent, LoginRequest};
use crate::backend::{BackendError, Post, Session, SessionHub, SessionProvider};
use crate::feed::{publish_post, FetchRequest, ValidPost};
use crate::util::strip_control_chars;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub(super) const TASK_FEED_FETCH: &str = "feed_fetch";
pub(super) const TASK_POST_LOAD: &str = "post_load";
pub(super) const TASK_PUBLISH: &str = "publish";
pub(super) const TASK_LOGIN: &str = "login";
pub(super) const TASK_SIGN_OUT: &str = "sign_out";
pub(super) const TASK_SESSION_WATCH: &str = "session_watch";

/// Wraps a future to catch panics and convert them to errors.
///
/// Instead of the task silently disappearing (caught by Tokio's runtime but
/// not handled), panics are converted to `Err(String)` containing the panic
/// message.
///
/// # Returns
///
/// - `Ok(result)` if the future completes normally
/// - `Err(panic_message)` if the future panics
pub(super) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else if let Some(e) = panic.downcast_ref::<Box<dyn std::error::Error + Send>>() {
                e.to_string()
            } else {
                format!("Unknown panic: {:?}", (*panic).type_id())
            }
        })
}

/// Send an event to the UI loop. Returns `false` once the receiver is gone.
pub(super) async fn send_event(
    tx: &mpsc::Sender<AppEvent>,
    event: AppEvent,
    name: &'static str,
) -> bool {
    match tx.send(event).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, event = name, "Channel send failed (receiver dropped)");
            false
        }
    }
}

/// Spawn `future` with panic capture. A panic is reported as
/// `AppEvent::TaskPanicked { task, .. }`.
pub(super) fn spawn_guarded<F>(
    task: &'static str,
    tx: mpsc::Sender<AppEvent>,
    future: F,
) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(panic_msg) = catch_task_panic(future).await {
            tracing::error!(task, error = %panic_msg, "Background task panicked");
            send_event(
                &tx,
                AppEvent::TaskPanicked {
                    task,
                    error: panic_msg,
                },
                "TaskPanicked",
            )
            .await;
        }
    })
}

/// Strip terminal control sequences from the user-authored parts of a post.
pub(super) fn sanitize_post(mut post: Post) -> Post {
    if let std::borrow::Cow::Owned(title) = strip_control_chars(&post.title) {
        post.title = title;
    }
    if let std::borrow::Cow::Owned(content) = strip_control_chars(&post.content) {
        post.content = content;
    }
    if let Some(author) = post.author.as_mut() {
        author.full_name = author
            .full_name
            .as_deref()
            .map(|n| strip_control_chars(n).into_owned());
    }
    post
}

/// The session to call the backend with: `held`, with its tokens refreshed
/// when they are about to expire. A different (or no) identity means the
/// request belongs to a session that has ended.
async fn fresh_session(sessions: &SessionHub, held: Session) -> Result<Session, BackendError> {
    match sessions.current_session().await? {
        Some(current) if current.user_id == held.user_id => Ok(current),
        _ => Err(BackendError::Unauthorized(
            "Session ended before the request was sent".to_string(),
        )),
    }
}

// ============================================================================
// Feed
// ============================================================================

/// Run a page fetch issued by the feed controller, replacing any fetch
/// still in flight.
pub(super) fn spawn_feed_fetch(
    app: &mut App,
    request: FetchRequest,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    if let Some(handle) = app.feed_fetch_handle.take() {
        handle.abort();
        tracing::debug!("Aborted previous feed fetch task");
    }

    let FetchRequest {
        generation,
        page,
        limit,
        offset,
        session,
    } = request;
    tracing::debug!(generation, page, limit, offset, "Spawning feed fetch");

    let sessions = Arc::clone(&app.sessions);
    let queries = Arc::clone(&app.queries);
    let tx = event_tx.clone();

    app.feed_fetch_handle = Some(spawn_guarded(
        TASK_FEED_FETCH,
        event_tx.clone(),
        async move {
            let result = match fresh_session(&sessions, session).await {
                Ok(session) => queries.list_posts(&session, limit, offset).await,
                Err(e) => Err(e),
            };
            send_event(&tx, AppEvent::PostsLoaded { generation, result }, "PostsLoaded").await;
        },
    ));
}

// ============================================================================
// Reader
// ============================================================================

/// Switch to the reader and load `post_id` in the background.
///
/// Does nothing without a session.
pub(super) fn open_post(app: &mut App, post_id: Uuid, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(session) = app.feed.session().cloned() else {
        tracing::debug!(%post_id, "Not opening post without a session");
        return;
    };

    if let Some(handle) = app.post_load_handle.take() {
        handle.abort();
        tracing::debug!("Aborted previous post load task");
    }

    let generation = app.enter_reader(post_id);
    tracing::debug!(%post_id, generation, "Spawning post load");

    let sessions = Arc::clone(&app.sessions);
    let queries = Arc::clone(&app.queries);
    let tx = event_tx.clone();

    app.post_load_handle = Some(spawn_guarded(
        TASK_POST_LOAD,
        event_tx.clone(),
        async move {
            let result = match fresh_session(&sessions, session).await {
                Ok(session) => queries.get_post(&session, post_id).await,
                Err(e) => Err(e),
            };
            send_event(&tx, AppEvent::PostLoaded { generation, result }, "PostLoaded").await;
        },
    ));
}

// ============================================================================
// Compose
// ============================================================================

/// Publish a post the compose form validated. The form is already in
/// `Submitting`; without a session it is failed straight away.
pub(super) fn spawn_publish(app: &mut App, post: ValidPost, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(session) = app.feed.session().cloned() else {
        app.compose
            .complete_submit(Err("You need to sign in to post".to_string()));
        return;
    };

    let sessions = Arc::clone(&app.sessions);
    let mutations = Arc::clone(&app.mutations);
    let tx = event_tx.clone();

    tracing::debug!(user_id = %session.user_id, "Spawning publish");
    spawn_guarded(TASK_PUBLISH, event_tx.clone(), async move {
        let result = match fresh_session(&sessions, session).await {
            Ok(session) => publish_post(mutations.as_ref(), &session, post).await,
            Err(e) => Err(e),
        };
        send_event(&tx, AppEvent::PostPublished(result), "PostPublished").await;
    });
}

// ============================================================================
// Session
// ============================================================================

pub(super) fn spawn_login(app: &App, request: LoginRequest, event_tx: &mpsc::Sender<AppEvent>) {
    let sessions = Arc::clone(&app.sessions);
    let tx = event_tx.clone();

    match request {
        LoginRequest::SendCode { email } => {
            tracing::debug!("Requesting sign-in code");
            spawn_guarded(TASK_LOGIN, event_tx.clone(), async move {
                let result = sessions.send_email_code(&email).await;
                send_event(&tx, AppEvent::EmailCodeSent(result), "EmailCodeSent").await;
            });
        }
        LoginRequest::SignIn(grant) => {
            tracing::debug!(?grant, "Signing in");
            spawn_guarded(TASK_LOGIN, event_tx.clone(), async move {
                let result = sessions.sign_in(grant).await.map(|_| ());
                send_event(&tx, AppEvent::SignInCompleted(result), "SignInCompleted").await;
            });
        }
    }
}

/// Sign out in the background. The login view follows from the session
/// change, not from the `SignedOut` event.
pub(super) fn spawn_sign_out(app: &App, event_tx: &mpsc::Sender<AppEvent>) {
    let sessions = Arc::clone(&app.sessions);
    let tx = event_tx.clone();
    spawn_guarded(TASK_SIGN_OUT, event_tx.clone(), async move {
        let result = sessions.sign_out().await;
        send_event(&tx, AppEvent::SignedOut(result), "SignedOut").await;
    });
}

/// Forward session changes into the event channel.
///
/// The first event is the current session (refreshed if due), or
/// `SessionUnavailable` when it cannot be determined. Aborting the returned
/// task drops the subscription.
pub(super) fn spawn_session_watch(
    sessions: Arc<SessionHub>,
    event_tx: mpsc::Sender<AppEvent>,
) -> JoinHandle<()> {
    let tx = event_tx.clone();
    spawn_guarded(TASK_SESSION_WATCH, event_tx, async move {
        // Subscribe before the initial read so no change slips between them.
        let mut subscription = sessions.subscribe();

        let initial = match sessions.current_session().await {
            Ok(session) => AppEvent::SessionChanged(session),
            Err(e) => {
                tracing::warn!(error = %e, "Could not determine session at startup");
                AppEvent::SessionUnavailable(e.to_string())
            }
        };
        if !send_event(&tx, initial, "SessionChanged").await {
            return;
        }

        while let Some(session) = subscription.changed().await {
            if !send_event(&tx, AppEvent::SessionChanged(session), "SessionChanged").await {
                break;
            }
        }
        subscription.unsubscribe();
        tracing::debug!("Session watch ended");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::AuthorSummary;

    #[tokio::test]
    async fn test_catch_task_panic_ok() {
        assert_eq!(catch_task_panic(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn test_catch_task_panic_extracts_message() {
        let result = catch_task_panic(async {
            panic!("boom {}", 1);
        })
        .await;
        assert_eq!(result, Err::<(), _>("boom 1".to_string()));
    }

    #[tokio::test]
    async fn test_spawn_guarded_reports_panic() {
        let (tx, mut rx) = mpsc::channel(4);
        let handle = spawn_guarded(TASK_PUBLISH, tx.clone(), async {
            panic!("publish exploded");
        });
        handle.await.unwrap();

        match rx.recv().await {
            Some(AppEvent::TaskPanicked { task, error }) => {
                assert_eq!(task, TASK_PUBLISH);
                assert_eq!(error, "publish exploded");
            }
            _ => panic!("expected TaskPanicked"),
        }
    }

    #[test]
    fn test_sanitize_post_strips_escapes() {
        let post = Post {
            id: Uuid::from_u128(1),
            title: "Hi\x1b[31m there".into(),
            content: "body\x07 text\nnext".into(),
            created_at: None,
            author_id: Uuid::from_u128(2),
            author: Some(AuthorSummary {
                id: Uuid::from_u128(2),
                full_name: Some("Eve\x1b]0;pwned\x07".into()),
                email: None,
            }),
        };
        let clean = sanitize_post(post);
        assert_eq!(clean.title, "Hi there");
        assert_eq!(clean.content, "body text\nnext");
        assert_eq!(clean.author_name(), "Eve");
    }
}
