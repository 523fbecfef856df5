#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{RawQuery, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use serde_json::json;
use skysample::{CandidateItem, RecordPayload, SampleDocument};

pub const GET_POSTS: &str = "/xrpc/app.bsky.feed.getPosts";

pub fn uri(i: usize) -> String {
    format!("at://did:plc:test/app.bsky.feed.post/{i:04}")
}

pub fn candidate(i: usize) -> CandidateItem {
    CandidateItem {
        uri: uri(i),
        originator_id: "did:plc:test".into(),
        record_key: format!("{i:04}"),
        record: RecordPayload {
            text: Some(format!("post {i}")),
            langs: Some(vec!["en".into()]),
            ..Default::default()
        },
    }
}

pub fn sample_doc(total: usize, items: usize) -> SampleDocument {
    SampleDocument {
        total,
        data: (0..items).map(candidate).collect(),
    }
}

pub fn post_json(uri: &str) -> serde_json::Value {
    json!({
        "uri": uri,
        "cid": "bafyreitest",
        "author": {"did": "did:plc:test", "handle": "test.bsky.social"},
        "record": {"text": "refreshed", "langs": ["en"]},
        "likeCount": 3,
        "replyCount": 1,
        "repostCount": 0,
        "bookmarkCount": 0,
        "quoteCount": 0,
        "indexedAt": "2025-01-01T00:00:00.000Z"
    })
}

/// In-process stand-in for the AppView `getPosts` endpoint.
///
/// Answers queued statuses first, then echoes a post for every requested uri
/// except those in `missing`. A request naming any `poison` uri gets a 400.
#[derive(Default)]
pub struct FakeAppView {
    pub calls: AtomicUsize,
    pub batches: Mutex<Vec<Vec<String>>>,
    pub script: Mutex<VecDeque<(StatusCode, Option<&'static str>)>>,
    pub missing: HashSet<String>,
    pub poison: HashSet<String>,
}

impl FakeAppView {
    pub fn scripted(statuses: impl IntoIterator<Item = (StatusCode, Option<&'static str>)>) -> Self {
        Self {
            script: Mutex::new(statuses.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Serve on an ephemeral port and return the endpoint URL.
    pub async fn start(self: Arc<Self>) -> String {
        let app = Router::new()
            .route(GET_POSTS, get(get_posts))
            .with_state(self);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}{GET_POSTS}")
    }
}

async fn get_posts(State(api): State<Arc<FakeAppView>>, RawQuery(query): RawQuery) -> Response {
    api.calls.fetch_add(1, Ordering::SeqCst);
    let uris: Vec<String> = url::form_urlencoded::parse(query.unwrap_or_default().as_bytes())
        .filter(|(k, _)| k == "uris")
        .map(|(_, v)| v.into_owned())
        .collect();
    api.batches.lock().unwrap().push(uris.clone());

    let scripted = api.script.lock().unwrap().pop_front();
    if let Some((status, retry_after)) = scripted {
        let mut resp = (status, "scripted failure").into_response();
        if let Some(secs) = retry_after {
            resp.headers_mut()
                .insert("retry-after", HeaderValue::from_static(secs));
        }
        return resp;
    }
    if uris.iter().any(|u| api.poison.contains(u)) {
        return (StatusCode::BAD_REQUEST, "invalid uri").into_response();
    }
    let posts: Vec<_> = uris
        .iter()
        .filter(|u| !api.missing.contains(*u))
        .map(|u| post_json(u))
        .collect();
    Json(json!({ "posts": posts })).into_response()
}
