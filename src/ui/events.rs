//! Application event handling.
//!
//! This module processes background task completion events: session
//! changes, page and post loads, publish results and sign-in outcomes.

use crate::app::{App, AppEvent, ReaderState};
use crate::backend::{BackendError, Post};
use crate::feed::FeedState;
use tokio::sync::mpsc;

use super::helpers::{
    sanitize_post, spawn_feed_fetch, spawn_sign_out, TASK_FEED_FETCH, TASK_LOGIN, TASK_POST_LOAD,
    TASK_PUBLISH, TASK_SESSION_WATCH,
};
use super::reader::render_markdown;

/// Handle application events from background tasks.
pub(super) fn handle_app_event(
    app: &mut App,
    event: AppEvent,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    match event {
        AppEvent::SessionChanged(session) => {
            if let Some(request) = app.apply_session(session) {
                spawn_feed_fetch(app, request, event_tx);
            }
        }
        AppEvent::SessionUnavailable(error) => {
            app.apply_session(None);
            app.set_status(format!("Could not restore your session: {}", error));
        }
        AppEvent::PostsLoaded { generation, result } => {
            handle_posts_loaded(app, generation, result, event_tx);
        }
        AppEvent::PostLoaded { generation, result } => {
            handle_post_loaded(app, generation, result, event_tx);
        }
        AppEvent::PostPublished(result) => {
            handle_post_published(app, result, event_tx);
        }
        AppEvent::SignInCompleted(result) => match result {
            Ok(()) => {
                tracing::info!("Signed in");
                app.set_status("Signed in");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sign-in failed");
                app.login.sign_in_failed(e.to_string());
            }
        },
        AppEvent::EmailCodeSent(result) => {
            if let Err(e) = &result {
                tracing::warn!(error = %e, "Sending sign-in code failed");
            }
            app.login.on_code_sent(result.map_err(|e| e.to_string()));
        }
        AppEvent::SignedOut(result) => match result {
            Ok(()) => app.set_status("Signed out"),
            Err(e) => {
                tracing::error!(error = %e, "Sign-out failed");
                app.set_status(format!("Sign-out failed: {}", e));
            }
        },
        AppEvent::TaskPanicked { task, error } => {
            handle_task_panicked(app, task, error);
        }
    }
}

/// A request was rejected for lack of a valid session: drop the session
/// and fall back to the login view.
fn expire_session(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    tracing::info!("Backend rejected the session, signing out");
    app.set_status("Your session has expired. Please sign in again.");
    spawn_sign_out(app, event_tx);
}

fn handle_posts_loaded(
    app: &mut App,
    generation: u64,
    result: Result<Vec<Post>, BackendError>,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    let auth_failed = matches!(&result, Err(e) if e.is_auth_failure());
    let result = match result {
        Ok(posts) => {
            tracing::info!(
                generation,
                count = posts.len(),
                page = app.feed.page(),
                "Feed page loaded"
            );
            Ok(posts.into_iter().map(sanitize_post).collect())
        }
        Err(e) => {
            tracing::warn!(generation, error = %e, "Feed fetch failed");
            Err(e.to_string())
        }
    };

    if !app.feed.complete_fetch(generation, result) {
        return;
    }
    app.feed_fetch_handle = None;
    app.clamp_selection();

    if auth_failed {
        expire_session(app, event_tx);
    }
}

fn handle_post_loaded(
    app: &mut App,
    generation: u64,
    result: Result<Option<Post>, BackendError>,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    // A newer load, or leaving the reader, bumps the generation.
    if generation != app.post_load_generation {
        tracing::debug!(
            expected = app.post_load_generation,
            got = generation,
            "Ignoring stale post load (generation mismatch)"
        );
        return;
    }
    let ReaderState::Loading { post_id } = app.reader else {
        tracing::debug!("Post load finished while the reader was not loading");
        return;
    };
    app.post_load_handle = None;

    match result {
        Ok(Some(post)) => {
            let post = sanitize_post(post);
            tracing::debug!(%post_id, "Post loaded");
            let rendered_lines = render_markdown(&post.content, &app.theme);
            app.reader = ReaderState::Loaded {
                post: Box::new(post),
                rendered_lines,
            };
        }
        Ok(None) => {
            tracing::info!(%post_id, "Post not found");
            app.reader = ReaderState::NotFound;
        }
        Err(e) => {
            tracing::warn!(%post_id, error = %e, "Post load failed");
            let auth_failed = e.is_auth_failure();
            app.reader = ReaderState::Failed {
                post_id,
                error: e.to_string(),
            };
            if auth_failed {
                expire_session(app, event_tx);
            }
        }
    }
    app.reader_cached_line_count = None;
}

fn handle_post_published(
    app: &mut App,
    result: Result<Post, BackendError>,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    match result {
        Ok(post) => {
            if !app.compose.complete_submit(Ok(())) {
                tracing::debug!(post_id = %post.id, "Publish finished after the form was closed");
                return;
            }
            tracing::info!(post_id = %post.id, "Post published");
            app.set_status("Post published");
            match app.feed.on_post_published(sanitize_post(post)) {
                Some(request) => spawn_feed_fetch(app, request, event_tx),
                None => {
                    app.selected_post = 0;
                    app.clamp_selection();
                }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Publish failed");
            let auth_failed = e.is_auth_failure();
            app.compose.complete_submit(Err(e.to_string()));
            if auth_failed {
                expire_session(app, event_tx);
            }
        }
    }
}

/// Unstick whatever was waiting on the task that died.
fn handle_task_panicked(app: &mut App, task: &'static str, error: String) {
    tracing::error!(task, error = %error, "Background task panicked");
    app.set_status(format!("Internal error in {} task", task));

    let message = format!("Internal error: {}", error);
    match task {
        TASK_FEED_FETCH => {
            app.feed_fetch_handle = None;
            if matches!(app.feed.state(), FeedState::Loading) {
                let generation = app.feed.generation();
                app.feed.complete_fetch(generation, Err(message));
            }
        }
        TASK_POST_LOAD => {
            app.post_load_handle = None;
            if let ReaderState::Loading { post_id } = app.reader {
                app.reader = ReaderState::Failed {
                    post_id,
                    error: message,
                };
                app.reader_cached_line_count = None;
            }
        }
        TASK_PUBLISH => {
            app.compose.complete_submit(Err(message));
        }
        TASK_LOGIN => {
            if app.login.submitting {
                app.login.sign_in_failed(message);
            }
        }
        TASK_SESSION_WATCH => {
            app.set_status("Session updates stopped. Restart devlog to recover.");
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{post, session, test_app};
    use crate::app::View;
    use crate::feed::{ComposeState, PAGE_SIZE};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn channel() -> (mpsc::Sender<AppEvent>, mpsc::Receiver<AppEvent>) {
        mpsc::channel(32)
    }

    #[tokio::test]
    async fn test_session_changed_starts_fetch() {
        let mut app = test_app().await;
        let (tx, _rx) = channel();

        handle_app_event(
            &mut app,
            AppEvent::SessionChanged(Some(session(Uuid::new_v4()))),
            &tx,
        );
        assert_eq!(app.view, View::Feed);
        assert!(app.feed.is_loading());
        assert!(app.feed_fetch_handle.is_some());
    }

    #[tokio::test]
    async fn test_session_unavailable_shows_login_with_status() {
        let mut app = test_app().await;
        let (tx, _rx) = channel();

        handle_app_event(
            &mut app,
            AppEvent::SessionUnavailable("Network error: offline".into()),
            &tx,
        );
        assert_eq!(app.view, View::Login);
        assert!(app.status_message.is_some());
    }

    #[tokio::test]
    async fn test_stale_posts_loaded_is_ignored() {
        let mut app = test_app().await;
        let me = Uuid::new_v4();
        let (tx, _rx) = channel();
        let first = app.apply_session(Some(session(me))).unwrap();
        let second = app.feed.on_page_param_change(2).unwrap();

        handle_app_event(
            &mut app,
            AppEvent::PostsLoaded {
                generation: second.generation,
                result: Ok(vec![post(2, me)]),
            },
            &tx,
        );
        handle_app_event(
            &mut app,
            AppEvent::PostsLoaded {
                generation: first.generation,
                result: Ok((0..PAGE_SIZE as u128).map(|n| post(n + 10, me)).collect()),
            },
            &tx,
        );

        assert_eq!(app.feed.all_count(), 1);
        assert_eq!(app.visible_posts()[0].id, Uuid::from_u128(2));
    }

    #[tokio::test]
    async fn test_posts_loaded_sanitizes_titles() {
        let mut app = test_app().await;
        let me = Uuid::new_v4();
        let (tx, _rx) = channel();
        let req = app.apply_session(Some(session(me))).unwrap();
        let mut dirty = post(1, me);
        dirty.title = "\x1b[2JCleared".into();

        handle_app_event(
            &mut app,
            AppEvent::PostsLoaded {
                generation: req.generation,
                result: Ok(vec![dirty]),
            },
            &tx,
        );
        assert_eq!(app.visible_posts()[0].title, "Cleared");
    }

    #[tokio::test]
    async fn test_fetch_error_sets_failed_state() {
        let mut app = test_app().await;
        let (tx, _rx) = channel();
        let req = app.apply_session(Some(session(Uuid::new_v4()))).unwrap();

        handle_app_event(
            &mut app,
            AppEvent::PostsLoaded {
                generation: req.generation,
                result: Err(BackendError::Timeout(10)),
            },
            &tx,
        );
        assert_eq!(
            app.feed.state(),
            &FeedState::Failed("Request timed out after 10s".to_string())
        );
        assert_eq!(app.view, View::Feed);
    }

    #[tokio::test]
    async fn test_post_loaded_renders_markdown() {
        let mut app = test_app().await;
        let me = Uuid::new_v4();
        let (tx, _rx) = channel();
        app.apply_session(Some(session(me)));
        let generation = app.enter_reader(Uuid::from_u128(1));

        handle_app_event(
            &mut app,
            AppEvent::PostLoaded {
                generation,
                result: Ok(Some(post(1, me))),
            },
            &tx,
        );
        match &app.reader {
            ReaderState::Loaded {
                post,
                rendered_lines,
            } => {
                assert_eq!(post.id, Uuid::from_u128(1));
                assert!(!rendered_lines.is_empty());
            }
            other => panic!("expected Loaded, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_post_loaded_none_is_not_found() {
        let mut app = test_app().await;
        let (tx, _rx) = channel();
        let generation = app.enter_reader(Uuid::from_u128(9));

        handle_app_event(
            &mut app,
            AppEvent::PostLoaded {
                generation,
                result: Ok(None),
            },
            &tx,
        );
        assert!(matches!(app.reader, ReaderState::NotFound));
    }

    #[tokio::test]
    async fn test_post_loaded_after_exit_is_dropped() {
        let mut app = test_app().await;
        let (tx, _rx) = channel();
        let generation = app.enter_reader(Uuid::from_u128(9));
        app.exit_reader();

        handle_app_event(
            &mut app,
            AppEvent::PostLoaded {
                generation,
                result: Ok(None),
            },
            &tx,
        );
        assert!(matches!(app.reader, ReaderState::Idle));
        assert_eq!(app.view, View::Feed);
    }

    #[tokio::test]
    async fn test_publish_failure_keeps_form() {
        let mut app = test_app().await;
        let (tx, _rx) = channel();
        app.apply_session(Some(session(Uuid::new_v4())));
        app.compose.open();
        app.compose.insert_str("A valid title");
        app.compose.switch_field();
        app.compose.insert_str(&"body text ".repeat(6));
        assert!(app.compose.submit().is_ok());

        handle_app_event(
            &mut app,
            AppEvent::PostPublished(Err(BackendError::GraphQl("insert failed".into()))),
            &tx,
        );
        assert_eq!(app.compose.state(), ComposeState::Open);
        assert_eq!(app.compose.title(), "A valid title");
        assert_eq!(app.compose.submit_error(), Some("insert failed"));
    }

    #[tokio::test]
    async fn test_publish_success_closes_form_and_refetches() {
        let mut app = test_app().await;
        let me = Uuid::new_v4();
        let (tx, _rx) = channel();
        let req = app.apply_session(Some(session(me))).unwrap();
        app.feed.complete_fetch(req.generation, Ok(vec![]));
        app.compose.open();
        app.compose.insert_str("A valid title");
        app.compose.switch_field();
        app.compose.insert_str(&"body text ".repeat(6));
        app.compose.submit().unwrap();

        handle_app_event(&mut app, AppEvent::PostPublished(Ok(post(5, me))), &tx);
        assert!(!app.compose.is_open());
        assert!(app.feed.is_loading());
        assert!(app.feed.generation() > req.generation);
    }

    #[tokio::test]
    async fn test_sign_in_failure_shows_inline_error() {
        let mut app = test_app().await;
        let (tx, _rx) = channel();
        app.apply_session(None);
        app.login.email = "dev@example.com".into();
        app.login.password = "nope".into();
        app.login.submit();

        handle_app_event(
            &mut app,
            AppEvent::SignInCompleted(Err(BackendError::Auth(
                "Invalid login credentials".into(),
            ))),
            &tx,
        );
        assert!(!app.login.submitting);
        assert_eq!(app.login.error.as_deref(), Some("Invalid login credentials"));
    }

    #[tokio::test]
    async fn test_panicked_fetch_leaves_loading_state() {
        let mut app = test_app().await;
        let (tx, _rx) = channel();
        app.apply_session(Some(session(Uuid::new_v4())));
        assert!(app.feed.is_loading());

        handle_app_event(
            &mut app,
            AppEvent::TaskPanicked {
                task: TASK_FEED_FETCH,
                error: "boom".into(),
            },
            &tx,
        );
        assert_eq!(
            app.feed.state(),
            &FeedState::Failed("Internal error: boom".to_string())
        );
    }

    #[tokio::test]
    async fn test_panicked_publish_reopens_form() {
        let mut app = test_app().await;
        let (tx, _rx) = channel();
        app.apply_session(Some(session(Uuid::new_v4())));
        app.compose.open();
        app.compose.insert_str("A valid title");
        app.compose.switch_field();
        app.compose.insert_str(&"body text ".repeat(6));
        app.compose.submit().unwrap();

        handle_app_event(
            &mut app,
            AppEvent::TaskPanicked {
                task: TASK_PUBLISH,
                error: "boom".into(),
            },
            &tx,
        );
        assert_eq!(app.compose.state(), ComposeState::Open);
    }
}
