//! Batched lookups against the `app.bsky.feed.getPosts` read endpoint.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::document::EnrichedItem;
use crate::error::Result;
use crate::retry::{Attempt, RetryPolicy};

/// Statuses worth another try: rate limiting and transient server faults.
pub const RETRYABLE_STATUSES: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Post view as returned by the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub uri: String,
    #[serde(default)]
    pub author: Value,
    #[serde(default)]
    pub record: Value,
    pub like_count: Option<u64>,
    pub reply_count: Option<u64>,
    pub repost_count: Option<u64>,
    pub bookmark_count: Option<u64>,
    pub quote_count: Option<u64>,
}

impl From<PostView> for EnrichedItem {
    fn from(p: PostView) -> Self {
        EnrichedItem {
            uri: p.uri,
            author: p.author,
            record: p.record,
            like_count: p.like_count,
            reply_count: p.reply_count,
            repost_count: p.repost_count,
            bookmark_count: p.bookmark_count,
            quote_count: p.quote_count,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GetPostsResponse {
    #[serde(default)]
    posts: Vec<PostView>,
}

/// Resolve a batch of uris to fresh post data.
///
/// Implementations never fail: a batch that cannot be served comes back
/// empty and the caller drops those uris.
#[async_trait]
pub trait PostLookup: Send + Sync {
    async fn lookup(&self, uris: &[String]) -> Vec<EnrichedItem>;
}

/// Why a single request did not produce posts.
#[derive(Debug)]
pub enum FetchError {
    Status(StatusCode),
    Transport(reqwest::Error),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Status(s) => write!(f, "status {s}"),
            FetchError::Transport(e) => write!(f, "transport: {e}"),
        }
    }
}

/// HTTP client for the lookup endpoint.
#[derive(Debug, Clone)]
pub struct PostsClient {
    client: Client,
    endpoint: Url,
    policy: RetryPolicy,
}

impl PostsClient {
    pub fn new(endpoint: &str, policy: RetryPolicy, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self::with_client(client, Url::parse(endpoint)?, policy))
    }

    pub fn with_client(client: Client, endpoint: Url, policy: RetryPolicy) -> Self {
        Self {
            client,
            endpoint,
            policy,
        }
    }

    /// One request, classified for the retry loop.
    async fn request(&self, uris: &[String]) -> std::result::Result<Vec<PostView>, Attempt<FetchError>> {
        let query: Vec<(&str, &str)> = uris.iter().map(|u| ("uris", u.as_str())).collect();
        let resp = self
            .client
            .get(self.endpoint.clone())
            .query(&query)
            .send()
            .await
            .map_err(|e| Attempt::retry(FetchError::Transport(e)))?;
        let status = resp.status();
        if status.is_success() {
            let body: GetPostsResponse = resp
                .json()
                .await
                .map_err(|e| Attempt::retry(FetchError::Transport(e)))?;
            return Ok(body.posts);
        }
        if RETRYABLE_STATUSES.contains(&status) {
            let after = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            return Err(Attempt::Retry {
                error: FetchError::Status(status),
                after,
            });
        }
        Err(Attempt::Abort(FetchError::Status(status)))
    }
}

/// `Retry-After` in (possibly fractional) seconds. HTTP-date values are
/// ignored and fall back to the computed backoff.
pub fn parse_retry_after(raw: &str) -> Option<Duration> {
    let secs: f64 = raw.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

#[async_trait]
impl PostLookup for PostsClient {
    async fn lookup(&self, uris: &[String]) -> Vec<EnrichedItem> {
        if uris.is_empty() {
            return Vec::new();
        }
        match self.policy.run(|_| self.request(uris)).await {
            Ok(posts) => {
                debug!(requested = uris.len(), returned = posts.len(), "batch resolved");
                posts.into_iter().map(EnrichedItem::from).collect()
            }
            Err(e) => {
                warn!(error = %e, uris = uris.len(), "batch could not be hydrated");
                Vec::new()
            }
        }
    }
}
