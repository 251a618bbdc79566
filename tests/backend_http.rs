//! End-to-end flows against a mocked backend: sign in, load a page, publish.
//!
//! Each test starts its own `MockServer` and in-memory database, so the
//! HTTP client, session hub and feed controller run exactly as in the app.

use devlog::backend::{AuthGrant, BackendClient, QueryService, SessionHub, SessionProvider};
use devlog::feed::compose::validate;
use devlog::feed::{
    publish_post, FeedController, FeedFilter, FeedState, SessionOutcome, PAGE_SIZE,
};
use devlog::storage::Database;
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ME: &str = "6f1c2d3e-0000-4000-8000-0000000000aa";
const OTHER: &str = "6f1c2d3e-0000-4000-8000-0000000000bb";

async fn setup(server: &MockServer) -> (BackendClient, SessionHub) {
    let client =
        BackendClient::new(&server.uri(), SecretString::from("anon".to_string()), 5).unwrap();
    let db = Database::open(":memory:").await.unwrap();
    let hub = SessionHub::new(client.clone(), db, None);
    (client, hub)
}

async fn mount_sign_in(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "user-token",
            "refresh_token": "refresh",
            "expires_in": 3600,
            "user": {
                "id": ME,
                "email": "ada@example.com",
                "user_metadata": { "full_name": "Ada Lovelace" }
            }
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(201))
        .mount(server)
        .await;
}

fn record(n: u32, title: &str, author: &str) -> serde_json::Value {
    json!({
        "id": format!("6f1c2d3e-0000-4000-8000-{:012}", n),
        "title": title,
        "content": "Some *markdown*",
        "created_at": "2024-03-05T10:20:30+00:00",
        "author_id": author,
        "profiles": { "id": author, "full_name": null, "email": null }
    })
}

async fn sign_in(hub: &SessionHub) {
    hub.sign_in(AuthGrant::Password {
        email: "ada@example.com".into(),
        password: SecretString::from("hunter22".to_string()),
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_sign_in_then_first_page_loads_and_filters() {
    let server = MockServer::start().await;
    mount_sign_in(&server).await;
    Mock::given(method("POST"))
        .and(path("/graphql/v1"))
        .and(header("Authorization", "Bearer user-token"))
        .and(body_partial_json(json!({"variables": {"first": PAGE_SIZE, "offset": 0}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "postsCollection": { "edges": [
                { "node": record(1, "Mine", ME) },
                { "node": record(2, "Theirs", OTHER) }
            ] } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, hub) = setup(&server).await;
    sign_in(&hub).await;

    let mut feed = FeedController::new(1, false);
    let session = hub.current_session().await.unwrap();
    let SessionOutcome::Fetch(req) = feed.on_session_change(session) else {
        panic!("signed-in session should fetch");
    };
    assert_eq!((req.limit, req.offset), (PAGE_SIZE, 0));

    let result = client
        .list_posts(&req.session, req.limit, req.offset)
        .await
        .map_err(|e| e.to_string());
    assert!(feed.complete_fetch(req.generation, result));

    assert_eq!(feed.all_count(), 2);
    assert_eq!(feed.mine_count(), 1);
    assert!(!feed.has_next_page());

    feed.on_filter_change(FeedFilter::Mine);
    let titles: Vec<_> = feed.derive_posts().iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Mine"]);
    // Unknown author profile falls back to a placeholder name.
    assert_eq!(feed.derive_posts()[0].author_name(), "Anonymous");
}

#[tokio::test]
async fn test_publish_upserts_profile_before_creating_post() {
    let server = MockServer::start().await;
    mount_sign_in(&server).await;
    Mock::given(method("POST"))
        .and(path("/graphql/v1"))
        .and(body_partial_json(json!({
            "variables": { "object": { "title": "Hello world", "author_id": ME } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "insertIntopostsCollection": { "records": [record(9, "Hello world", ME)] } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, hub) = setup(&server).await;
    sign_in(&hub).await;
    let session = hub.snapshot().unwrap();

    let post = validate(
        "  Hello world  ",
        "A first post that is comfortably longer than fifty characters.",
    )
    .unwrap();
    let created = publish_post(&client, &session, post).await.unwrap();
    assert_eq!(created.title, "Hello world");

    let paths: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(
        paths[paths.len() - 2..].to_vec(),
        vec!["/rest/v1/profiles", "/graphql/v1"]
    );
}

#[tokio::test]
async fn test_expired_token_surfaces_as_auth_failure_and_sign_out_clears() {
    let server = MockServer::start().await;
    mount_sign_in(&server).await;
    Mock::given(method("POST"))
        .and(path("/graphql/v1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "JWT expired" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let (client, hub) = setup(&server).await;
    sign_in(&hub).await;
    let session = hub.snapshot().unwrap();

    let mut feed = FeedController::new(1, false);
    feed.on_session_change(Some(session.clone()));
    let err = client.list_posts(&session, PAGE_SIZE, 0).await.unwrap_err();
    assert!(err.is_auth_failure());

    let mut sub = hub.subscribe();
    hub.sign_out().await.unwrap();
    assert!(matches!(sub.changed().await, Some(None)));

    feed.on_session_change(None);
    assert_eq!(feed.state(), &FeedState::Idle);
    assert!(hub.current_session().await.unwrap().is_none());
}
