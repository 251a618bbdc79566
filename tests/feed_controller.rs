//! Property tests for feed paging, filtering and stale-response handling.

use chrono::{TimeZone, Utc};
use devlog::backend::{Post, Session};
use devlog::feed::paging::{coerce_page, page_offset};
use devlog::feed::{
    feed_location, parse_page_param, FeedController, FeedFilter, FeedState, SessionOutcome,
    PAGE_SIZE,
};
use proptest::prelude::*;
use secrecy::SecretString;
use uuid::Uuid;

const ME: u128 = 1;
const OTHER: u128 = 2;

fn session() -> Session {
    Session {
        user_id: Uuid::from_u128(ME),
        email: "me@example.com".into(),
        full_name: None,
        access_token: SecretString::from("a".to_string()),
        refresh_token: SecretString::from("r".to_string()),
        expires_at: None,
    }
}

fn post(n: usize, mine: bool) -> Post {
    Post {
        id: Uuid::from_u128(100 + n as u128),
        title: format!("Post {}", n),
        content: String::new(),
        created_at: Utc.timestamp_opt(1_700_000_000 - n as i64 * 60, 0).single(),
        author_id: Uuid::from_u128(if mine { ME } else { OTHER }),
        author: None,
    }
}

fn loaded(authors: &[bool], page: u32) -> FeedController {
    let mut feed = FeedController::new(page, false);
    let SessionOutcome::Fetch(req) = feed.on_session_change(Some(session())) else {
        panic!("session should fetch");
    };
    let posts = authors.iter().enumerate().map(|(i, &m)| post(i, m)).collect();
    assert!(feed.complete_fetch(req.generation, Ok(posts)));
    feed
}

proptest! {
    #[test]
    fn page_param_never_below_one(raw in ".{0,12}") {
        prop_assert!(parse_page_param(Some(&raw)) >= 1);
    }

    #[test]
    fn numeric_page_param_is_coerced(n in any::<i64>()) {
        let page = parse_page_param(Some(&n.to_string()));
        prop_assert_eq!(page, coerce_page(n));
        prop_assert_eq!(page_offset(page), (page - 1).saturating_mul(PAGE_SIZE));
    }

    #[test]
    fn location_omits_first_page(page in 1u32..10_000) {
        let location = feed_location(page);
        if page == 1 {
            prop_assert_eq!(location, "/posts");
        } else {
            prop_assert_eq!(location, format!("/posts?page={}", page));
        }
    }

    #[test]
    fn mine_is_an_ordered_subset_of_all(authors in prop::collection::vec(any::<bool>(), 0..=5)) {
        let mut feed = loaded(&authors, 1);
        let all: Vec<Uuid> = feed.derive_posts().iter().map(|p| p.id).collect();
        prop_assert_eq!(all.len(), authors.len());

        feed.on_filter_change(FeedFilter::Mine);
        let mine: Vec<Uuid> = feed.derive_posts().iter().map(|p| p.id).collect();
        let expected: Vec<Uuid> = authors
            .iter()
            .enumerate()
            .filter(|(_, m)| **m)
            .map(|(i, _)| post(i, true).id)
            .collect();
        prop_assert_eq!(&mine, &expected);
        prop_assert_eq!(feed.mine_count(), expected.len());
        prop_assert_eq!(feed.empty_state().is_some(), expected.is_empty());
    }

    #[test]
    fn next_page_only_after_a_full_page(len in 0usize..=5, page in 1u32..50) {
        let feed = loaded(&vec![false; len], page);
        prop_assert_eq!(feed.has_next_page(), len == PAGE_SIZE as usize);
        prop_assert_eq!(feed.has_previous_page(), page > 1);
    }

    #[test]
    fn only_the_latest_fetch_commits(jumps in prop::collection::vec(1i64..20, 1..6)) {
        let mut feed = FeedController::new(1, false);
        let SessionOutcome::Fetch(first) = feed.on_session_change(Some(session())) else {
            panic!("session should fetch");
        };
        let mut issued = vec![first.generation];
        for n in &jumps {
            let req = feed.on_page_param_change(*n).unwrap();
            issued.push(req.generation);
        }
        let latest = issued.pop().unwrap();

        for generation in issued {
            prop_assert!(!feed.complete_fetch(generation, Ok(vec![post(0, true)])));
            prop_assert_eq!(feed.state(), &FeedState::Loading);
        }
        prop_assert!(feed.complete_fetch(latest, Err("boom".into())));
        prop_assert_eq!(feed.state(), &FeedState::Failed("boom".into()));
    }
}

#[test]
fn sign_out_discards_in_flight_fetch() {
    let mut feed = FeedController::new(1, false);
    let SessionOutcome::Fetch(req) = feed.on_session_change(Some(session())) else {
        panic!("session should fetch");
    };
    assert!(matches!(
        feed.on_session_change(None),
        SessionOutcome::RedirectToLogin
    ));
    assert!(!feed.complete_fetch(req.generation, Ok(vec![post(0, true)])));
    assert_eq!(feed.state(), &FeedState::Idle);
}

#[test]
fn filter_change_on_later_page_requests_first_page() {
    let mut feed = loaded(&[true, false], 4);
    assert_eq!(feed.on_filter_change(FeedFilter::Mine), Some(1));
    let mut feed = loaded(&[true, false], 1);
    assert_eq!(feed.on_filter_change(FeedFilter::Mine), None);
}
