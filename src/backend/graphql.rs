//! GraphQL documents and response envelopes for the posts collection.

use serde::Deserialize;

use super::{BackendError, Post};

const POST_FIELDS: &str = r#"
fragment PostFields on posts {
  id
  title
  content
  created_at
  author_id
  profiles {
    id
    full_name
    email
  }
}
"#;

const LIST_POSTS_BODY: &str = r#"
query ListPosts($first: Int!, $offset: Int!) {
  postsCollection(
    first: $first
    offset: $offset
    orderBy: [{ created_at: DescNullsLast }]
  ) {
    edges {
      node {
        ...PostFields
      }
    }
  }
}
"#;

const GET_POST_BODY: &str = r#"
query GetPost($id: UUID!) {
  postsCollection(filter: { id: { eq: $id } }) {
    edges {
      node {
        ...PostFields
      }
    }
  }
}
"#;

const CREATE_POST_BODY: &str = r#"
mutation CreatePost($object: postsInsertInput!) {
  insertIntopostsCollection(objects: [$object]) {
    records {
      ...PostFields
    }
  }
}
"#;

pub(super) fn list_posts_query() -> String {
    format!("{}{}", LIST_POSTS_BODY, POST_FIELDS)
}

pub(super) fn get_post_query() -> String {
    format!("{}{}", GET_POST_BODY, POST_FIELDS)
}

pub(super) fn create_post_mutation() -> String {
    format!("{}{}", CREATE_POST_BODY, POST_FIELDS)
}

// ============================================================================
// Envelopes
// ============================================================================

#[derive(Debug, Deserialize)]
pub(super) struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

impl<T> GraphQlResponse<T> {
    /// A non-empty `errors` array is a failure even when `data` is present.
    pub(super) fn into_result(self) -> Result<T, BackendError> {
        if !self.errors.is_empty() {
            let joined = self
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(BackendError::GraphQl(joined));
        }
        self.data
            .ok_or_else(|| BackendError::Decode("response has neither data nor errors".into()))
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CollectionData {
    #[serde(rename = "postsCollection")]
    posts_collection: Option<Connection>,
}

#[derive(Debug, Deserialize)]
struct Connection {
    edges: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
struct Edge {
    node: Post,
}

impl CollectionData {
    pub(super) fn into_posts(self) -> Vec<Post> {
        self.posts_collection
            .map(|c| c.edges.into_iter().map(|e| e.node).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct InsertData {
    #[serde(rename = "insertIntopostsCollection")]
    insert: Option<InsertResult>,
}

#[derive(Debug, Deserialize)]
struct InsertResult {
    records: Vec<Post>,
}

impl InsertData {
    pub(super) fn into_created(self) -> Result<Post, BackendError> {
        self.insert
            .and_then(|r| r.records.into_iter().next())
            .ok_or_else(|| BackendError::Decode("insert returned no records".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documents_include_fragment() {
        for doc in [list_posts_query(), get_post_query(), create_post_mutation()] {
            assert!(doc.contains("...PostFields"));
            assert!(doc.contains("fragment PostFields on posts"));
        }
        assert!(list_posts_query().contains("DescNullsLast"));
    }

    #[test]
    fn test_errors_take_precedence_over_data() {
        let json = r#"{"data": {"postsCollection": null}, "errors": [{"message": "a"}, {"message": "b"}]}"#;
        let resp: GraphQlResponse<CollectionData> = serde_json::from_str(json).unwrap();
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.to_string(), "a; b");
    }

    #[test]
    fn test_missing_data_is_decode_error() {
        let resp: GraphQlResponse<CollectionData> = serde_json::from_str("{}").unwrap();
        assert!(matches!(resp.into_result(), Err(BackendError::Decode(_))));
    }

    #[test]
    fn test_null_collection_is_empty() {
        let json = r#"{"data": {"postsCollection": null}}"#;
        let resp: GraphQlResponse<CollectionData> = serde_json::from_str(json).unwrap();
        assert!(resp.into_result().unwrap().into_posts().is_empty());
    }
}
