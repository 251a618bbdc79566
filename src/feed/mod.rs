//! Feed state and the post-writing flow.
//!
//! Nothing in this module performs I/O on its own:
//!
//! - [`controller`] - page, filter and fetched-page state; emits
//!   [`FetchRequest`]s and commits their results by generation
//! - [`compose`] - compose-modal state machine and field validation
//! - [`publish`] - profile upsert followed by create-post
//! - [`paging`] - page-parameter parsing and the feed location string

pub mod compose;
pub mod controller;
pub mod paging;
mod publish;

pub use compose::{ComposeField, ComposeFlow, ComposeState, FieldErrors, SubmitRejected, ValidPost};
pub use controller::{
    EmptyState, FeedController, FeedFilter, FeedState, FetchRequest, SessionOutcome,
};
pub use paging::{feed_location, parse_page_param, PAGE_SIZE};
pub use publish::publish_post;
