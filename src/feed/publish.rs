use crate::backend::{BackendError, MutationService, NewPost, Post, Profile, Session};

use super::compose::ValidPost;

/// Publish a validated post as `session`'s user.
///
/// The author's profile row is upserted first so the post's author join has
/// something to resolve; a failure there is logged and publishing continues.
pub async fn publish_post(
    mutations: &dyn MutationService,
    session: &Session,
    post: ValidPost,
) -> Result<Post, BackendError> {
    let profile = Profile::from_session(session);
    if let Err(e) = mutations.upsert_profile(session, &profile).await {
        tracing::warn!(user_id = %session.user_id, error = %e, "Profile upsert failed, publishing anyway");
    }

    let new_post = NewPost {
        title: post.title,
        content: post.content,
        author_id: session.user_id,
    };
    mutations.create_post(session, &new_post).await
}
