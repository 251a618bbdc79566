use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::redirect::Policy;
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use super::BackendError;
use crate::util::validate_backend_url;

/// Largest response body accepted from the backend (4 MB).
const MAX_RESPONSE_SIZE: usize = 4 * 1024 * 1024;

/// Shared HTTP transport for every backend endpoint.
///
/// Cheap to clone: `reqwest::Client` is reference counted internally and the
/// key is re-wrapped on clone.
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
    anon_key: SecretString,
    timeout_secs: u64,
}

impl Clone for BackendClient {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            anon_key: SecretString::from(self.anon_key.expose_secret().to_owned()),
            timeout_secs: self.timeout_secs,
        }
    }
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url.as_str())
            .field("anon_key", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Redirect policy: at most 3 hops, no loops. The backend never redirects
/// API calls, so anything longer is a misconfiguration.
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        for prev in attempt.previous() {
            if prev.as_str() == url.as_str() {
                return attempt.error("Redirect loop detected");
            }
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}

impl BackendClient {
    /// Build a client for `base_url`, which must pass
    /// [`validate_backend_url`].
    pub fn new(base_url: &str, anon_key: SecretString, timeout_secs: u64) -> Result<Self> {
        let base_url = validate_backend_url(base_url)
            .with_context(|| format!("Invalid backend URL '{}'", base_url))?;

        let http = reqwest::Client::builder()
            .redirect(create_redirect_policy())
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .context("Failed to build HTTP client")?;

        tracing::info!(backend_url = %base_url, timeout_secs, "Backend client configured");

        Ok(Self {
            http,
            base_url,
            anon_key,
            timeout_secs: timeout_secs.max(1),
        })
    }

    /// Absolute URL for an endpoint path such as `/graphql/v1`.
    pub(super) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// POST request carrying the project key and a bearer token.
    ///
    /// Auth endpoints pass `None` and authenticate with the project key alone.
    pub(super) fn post(&self, path: &str, bearer: Option<&SecretString>) -> RequestBuilder {
        let token = bearer.unwrap_or(&self.anon_key);
        self.http
            .post(self.endpoint(path))
            .header("apikey", self.anon_key.expose_secret())
            .header(
                "Authorization",
                format!("Bearer {}", token.expose_secret()),
            )
            .header("Content-Type", "application/json")
    }

    /// Send a request with the configured timeout.
    pub(super) async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        tokio::time::timeout(Duration::from_secs(self.timeout_secs), request.send())
            .await
            .map_err(|_| BackendError::Timeout(self.timeout_secs))?
            .map_err(BackendError::Network)
    }

    /// Send a JSON body and decode a JSON reply.
    pub(super) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        body: &serde_json::Value,
    ) -> Result<T, BackendError> {
        let response = self.send(request.body(body.to_string())).await?;
        let status = response.status();
        let bytes = read_limited_body(response, MAX_RESPONSE_SIZE).await?;

        if !status.is_success() {
            return Err(error_from_response(status, &bytes));
        }

        serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
    }

    /// Send a JSON body where only the status matters.
    pub(super) async fn send_expect_empty(
        &self,
        request: RequestBuilder,
        body: &serde_json::Value,
    ) -> Result<(), BackendError> {
        let response = self.send(request.body(body.to_string())).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let bytes = read_limited_body(response, MAX_RESPONSE_SIZE).await?;
        Err(error_from_response(status, &bytes))
    }
}

/// Map a non-success response to a `BackendError`, pulling a readable
/// message out of the body when the service sent one.
pub(super) fn error_from_response(status: StatusCode, body: &[u8]) -> BackendError {
    let message = extract_error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized(message),
        _ => BackendError::HttpStatus {
            status: status.as_u16(),
            message,
        },
    }
}

/// Auth, PostgREST and GraphQL gateways each name the message field
/// differently.
fn extract_error_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

async fn read_limited_body(response: Response, limit: usize) -> Result<Vec<u8>, BackendError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(BackendError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(BackendError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(BackendError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
