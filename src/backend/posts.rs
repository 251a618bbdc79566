use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use super::graphql::{self, CollectionData, GraphQlResponse, InsertData};
use super::{
    BackendClient, BackendError, MutationService, NewPost, Post, Profile, QueryService, Session,
};

impl BackendClient {
    async fn graphql<T: serde::de::DeserializeOwned>(
        &self,
        session: &Session,
        query: String,
        variables: serde_json::Value,
    ) -> Result<T, BackendError> {
        let body = json!({ "query": query, "variables": variables });
        let response: GraphQlResponse<T> = self
            .send_json(self.post("/graphql/v1", Some(&session.access_token)), &body)
            .await?;
        response.into_result()
    }
}

#[async_trait]
impl QueryService for BackendClient {
    async fn list_posts(
        &self,
        session: &Session,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Post>, BackendError> {
        let data: CollectionData = self
            .graphql(
                session,
                graphql::list_posts_query(),
                json!({ "first": limit, "offset": offset }),
            )
            .await?;
        let posts = data.into_posts();
        tracing::debug!(limit, offset, count = posts.len(), "Listed posts");
        Ok(posts)
    }

    async fn get_post(&self, session: &Session, id: Uuid) -> Result<Option<Post>, BackendError> {
        let data: CollectionData = self
            .graphql(session, graphql::get_post_query(), json!({ "id": id }))
            .await?;
        Ok(data.into_posts().into_iter().next())
    }
}

#[async_trait]
impl MutationService for BackendClient {
    async fn create_post(&self, session: &Session, post: &NewPost) -> Result<Post, BackendError> {
        let data: InsertData = self
            .graphql(
                session,
                graphql::create_post_mutation(),
                json!({ "object": post }),
            )
            .await?;
        let created = data.into_created()?;
        tracing::info!(post_id = %created.id, "Post created");
        Ok(created)
    }

    async fn upsert_profile(
        &self,
        session: &Session,
        profile: &Profile,
    ) -> Result<(), BackendError> {
        let request = self
            .post("/rest/v1/profiles?on_conflict=id", Some(&session.access_token))
            .header("Prefer", "resolution=merge-duplicates,return=minimal");
        self.send_expect_empty(request, &json!([profile])).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::SecretString;
    use wiremock::matchers::{
        body_json, body_partial_json, header, headers, method, path, query_param,
    };
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const AUTHOR: &str = "6f1c2d3e-0000-4000-8000-0000000000aa";

    fn client(server: &MockServer) -> BackendClient {
        BackendClient::new(&server.uri(), SecretString::from("anon".to_string()), 5).unwrap()
    }

    fn session() -> Session {
        Session {
            user_id: AUTHOR.parse().unwrap(),
            email: "ada@example.com".into(),
            full_name: Some("Ada".into()),
            access_token: SecretString::from("user-token".to_string()),
            refresh_token: SecretString::from("r".to_string()),
            expires_at: None,
        }
    }

    fn node(n: u32, title: &str) -> serde_json::Value {
        json!({
            "node": {
                "id": format!("6f1c2d3e-0000-4000-8000-{:012}", n),
                "title": title,
                "content": "body",
                "created_at": "2024-03-05T10:20:30+00:00",
                "author_id": AUTHOR,
                "profiles": { "id": AUTHOR, "full_name": "Ada", "email": "ada@example.com" }
            }
        })
    }

    #[tokio::test]
    async fn test_list_posts_sends_paging_variables() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql/v1"))
            .and(header("Authorization", "Bearer user-token"))
            .and(header("apikey", "anon"))
            .and(body_partial_json(json!({"variables": {"first": 5, "offset": 10}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "postsCollection": { "edges": [node(1, "First"), node(2, "Second")] } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let posts = client(&server).list_posts(&session(), 5, 10).await.unwrap();
        let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn test_graphql_errors_surface_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql/v1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [{ "message": "permission denied for table posts" }]
            })))
            .mount(&server)
            .await;

        let err = client(&server).list_posts(&session(), 5, 0).await.unwrap_err();
        assert_eq!(err.to_string(), "permission denied for table posts");
    }

    #[tokio::test]
    async fn test_expired_token_is_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql/v1"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "message": "JWT expired" })),
            )
            .mount(&server)
            .await;

        let err = client(&server).list_posts(&session(), 5, 0).await.unwrap_err();
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn test_get_post_missing_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql/v1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "postsCollection": { "edges": [] } }
            })))
            .mount(&server)
            .await;

        let found = client(&server)
            .get_post(&session(), Uuid::nil())
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_create_post_returns_record() {
        let server = MockServer::start().await;
        let record = node(7, "Hello world")["node"].clone();
        Mock::given(method("POST"))
            .and(path("/graphql/v1"))
            .and(body_partial_json(json!({
                "variables": { "object": { "title": "Hello world", "author_id": AUTHOR } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "insertIntopostsCollection": { "records": [record] } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let new_post = NewPost {
            title: "Hello world".into(),
            content: "x".repeat(60),
            author_id: AUTHOR.parse().unwrap(),
        };
        let created = client(&server)
            .create_post(&session(), &new_post)
            .await
            .unwrap();
        assert_eq!(created.title, "Hello world");
    }

    #[tokio::test]
    async fn test_upsert_profile_merges_on_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/profiles"))
            .and(query_param("on_conflict", "id"))
            .and(headers(
                "Prefer",
                vec!["resolution=merge-duplicates", "return=minimal"],
            ))
            .and(body_json(json!([
                { "id": AUTHOR, "email": "ada@example.com", "full_name": "Ada" }
            ])))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let s = session();
        client(&server)
            .upsert_profile(&s, &Profile::from_session(&s))
            .await
            .unwrap();
    }
}
