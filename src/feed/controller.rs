use crate::backend::{Post, Session};

use super::paging::{coerce_page, feed_location, page_offset, PAGE_SIZE};

/// Which subset of the fetched page is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedFilter {
    #[default]
    All,
    /// Posts on the current page authored by the signed-in user.
    Mine,
}

impl FeedFilter {
    pub fn label(self) -> &'static str {
        match self {
            FeedFilter::All => "All Posts",
            FeedFilter::Mine => "My Posts",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FeedState {
    #[default]
    Idle,
    Loading,
    Loaded(Vec<Post>),
    Failed(String),
}

/// A page fetch the caller should run and report back through
/// [`FeedController::complete_fetch`].
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub generation: u64,
    pub page: u32,
    pub limit: u32,
    pub offset: u32,
    pub session: Session,
}

/// Result of a session change.
#[derive(Debug)]
pub enum SessionOutcome {
    RedirectToLogin,
    Fetch(FetchRequest),
}

/// Placeholder shown when a successful load has nothing to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    FirstToShare,
    StoryStartsHere,
}

impl EmptyState {
    pub fn title(self) -> &'static str {
        match self {
            EmptyState::FirstToShare => "Be the first to share",
            EmptyState::StoryStartsHere => "Your story starts here",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            EmptyState::FirstToShare => {
                "Start the conversation! Share your first development story with fellow developers."
            }
            EmptyState::StoryStartsHere => {
                "Share your development journey, insights, and experiences with the community."
            }
        }
    }

    pub fn action(self) -> &'static str {
        "Write your first post"
    }
}

/// View state of the post feed.
///
/// The controller never performs I/O. Operations that need data return a
/// [`FetchRequest`]; the caller runs it and hands the outcome to
/// [`complete_fetch`](Self::complete_fetch) together with the request's
/// generation. Only the most recently issued generation is committed, so a
/// slow response for an earlier page cannot overwrite a newer one.
///
/// The filter is applied client-side to the page already fetched. "My Posts"
/// therefore only covers the current page and under-reports a user whose
/// posts live on other pages.
#[derive(Debug, Default)]
pub struct FeedController {
    session: Option<Session>,
    filter: FeedFilter,
    page: u32,
    state: FeedState,
    generation: u64,
    optimistic_insert: bool,
}

impl FeedController {
    pub fn new(page: u32, optimistic_insert: bool) -> Self {
        Self {
            page: page.max(1),
            optimistic_insert,
            ..Self::default()
        }
    }

    // ========================================================================
    // Inputs
    // ========================================================================

    pub fn on_session_change(&mut self, session: Option<Session>) -> SessionOutcome {
        match session {
            None => {
                self.session = None;
                self.state = FeedState::Idle;
                // Any in-flight fetch belongs to the old identity.
                self.generation += 1;
                SessionOutcome::RedirectToLogin
            }
            Some(session) => {
                self.session = Some(session);
                match self.begin_fetch() {
                    Some(req) => SessionOutcome::Fetch(req),
                    None => SessionOutcome::RedirectToLogin,
                }
            }
        }
    }

    /// Swap in refreshed tokens for the identity already held. Returns
    /// `false` (and changes nothing) for a different user or when signed out.
    pub fn replace_tokens(&mut self, session: Session) -> bool {
        match &self.session {
            Some(current) if current.user_id == session.user_id => {
                self.session = Some(session);
                true
            }
            _ => false,
        }
    }

    /// Navigate to page `n` (coerced to at least 1).
    pub fn on_page_param_change(&mut self, n: i64) -> Option<FetchRequest> {
        self.page = coerce_page(n);
        self.begin_fetch()
    }

    /// Switch the filter. Never fetches; returns the page to navigate to when
    /// the current page is not the first.
    pub fn on_filter_change(&mut self, filter: FeedFilter) -> Option<u32> {
        self.filter = filter;
        (self.page != 1).then_some(1)
    }

    /// Start fetching the current page. `None` without a session.
    pub fn begin_fetch(&mut self) -> Option<FetchRequest> {
        let session = self.session.clone()?;
        self.generation += 1;
        self.state = FeedState::Loading;
        Some(FetchRequest {
            generation: self.generation,
            page: self.page,
            limit: PAGE_SIZE,
            offset: page_offset(self.page),
            session,
        })
    }

    /// Commit a fetch outcome. Returns `false` (and changes nothing) when
    /// `generation` is not the latest issued.
    pub fn complete_fetch(&mut self, generation: u64, result: Result<Vec<Post>, String>) -> bool {
        if generation != self.generation {
            tracing::debug!(
                generation,
                current = self.generation,
                "Discarding stale feed response"
            );
            return false;
        }
        self.state = match result {
            Ok(posts) => FeedState::Loaded(posts),
            Err(message) => FeedState::Failed(message),
        };
        true
    }

    /// Prepend a just-published post to page 1 instead of refetching.
    /// Returns `false` when the post cannot be placed (optimistic insert
    /// disabled, not on page 1, or no committed page).
    pub fn insert_optimistic(&mut self, post: Post) -> bool {
        if !self.optimistic_insert || self.page != 1 {
            return false;
        }
        let FeedState::Loaded(posts) = &mut self.state else {
            return false;
        };
        posts.insert(0, post);
        posts.truncate(PAGE_SIZE as usize);
        true
    }

    /// React to a successful publish: optimistic insert when possible,
    /// otherwise a refetch of the current page.
    pub fn on_post_published(&mut self, post: Post) -> Option<FetchRequest> {
        if self.insert_optimistic(post) {
            return None;
        }
        self.begin_fetch()
    }

    // ========================================================================
    // Derived view
    // ========================================================================

    pub fn derive_posts(&self) -> Vec<&Post> {
        let FeedState::Loaded(posts) = &self.state else {
            return Vec::new();
        };
        match (self.filter, &self.session) {
            (FeedFilter::All, _) => posts.iter().collect(),
            (FeedFilter::Mine, Some(session)) => posts
                .iter()
                .filter(|p| p.author_id == session.user_id)
                .collect(),
            (FeedFilter::Mine, None) => Vec::new(),
        }
    }

    /// A full page suggests more may follow; an exact multiple of the page
    /// size cannot be told apart without another request.
    pub fn has_next_page(&self) -> bool {
        matches!(&self.state, FeedState::Loaded(posts) if posts.len() == PAGE_SIZE as usize)
    }

    pub fn has_previous_page(&self) -> bool {
        self.page > 1
    }

    /// Size of the fetched page.
    pub fn all_count(&self) -> usize {
        match &self.state {
            FeedState::Loaded(posts) => posts.len(),
            _ => 0,
        }
    }

    /// Own posts on the fetched page.
    pub fn mine_count(&self) -> usize {
        let Some(session) = &self.session else {
            return 0;
        };
        match &self.state {
            FeedState::Loaded(posts) => posts
                .iter()
                .filter(|p| p.author_id == session.user_id)
                .count(),
            _ => 0,
        }
    }

    /// Placeholder for an empty successful load. `None` while loading, on
    /// error, or when there are posts to show.
    pub fn empty_state(&self) -> Option<EmptyState> {
        if !matches!(self.state, FeedState::Loaded(_)) || !self.derive_posts().is_empty() {
            return None;
        }
        Some(match self.filter {
            FeedFilter::All => EmptyState::FirstToShare,
            FeedFilter::Mine => EmptyState::StoryStartsHere,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn filter(&self) -> FeedFilter {
        self.filter
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, FeedState::Loading)
    }

    pub fn location(&self) -> String {
        feed_location(self.page)
    }
}
