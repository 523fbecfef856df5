use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use indicatif::ProgressBar;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;
use skysample::{
    JetstreamSource, KeepaliveConfig, SampleDocument, Sampler, SamplerConfig, StreamSession,
    Termination, sample,
};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

fn post(did: &str, rkey: usize, lang: &str) -> String {
    json!({
        "did": did,
        "time_us": 1_700_000_000_000_000u64 + rkey as u64,
        "kind": "commit",
        "commit": {
            "rev": "3l3qo2vutsw2b",
            "operation": "create",
            "collection": "app.bsky.feed.post",
            "rkey": format!("{rkey:04}"),
            "record": {"$type": "app.bsky.feed.post", "text": format!("post {rkey}"), "langs": [lang]},
            "cid": "bafyreitest"
        }
    })
    .to_string()
}

fn delete(did: &str, rkey: usize) -> String {
    json!({
        "did": did,
        "kind": "commit",
        "commit": {"operation": "delete", "collection": "app.bsky.feed.post", "rkey": format!("{rkey:04}")}
    })
    .to_string()
}

enum Ending {
    StayOpen,
    Close,
    Drop,
}

/// Serve `frames` to the first client, then end the connection as asked.
async fn jetstream(frames: Vec<String>, ending: Ending) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();
        for f in frames {
            ws.send(Message::Text(f)).await.unwrap();
        }
        match ending {
            Ending::StayOpen => while ws.next().await.is_some() {},
            Ending::Close => ws.close(None).await.unwrap(),
            Ending::Drop => drop(ws),
        }
    });
    format!("ws://{addr}/subscribe?wantedCollections=app.bsky.feed.post")
}

fn session(ms: u64) -> StreamSession {
    StreamSession::new(Duration::from_millis(ms), Duration::from_millis(50))
}

fn keepalive() -> KeepaliveConfig {
    KeepaliveConfig {
        open_timeout: Duration::from_secs(10),
        ping_interval: Duration::from_secs(20),
        ping_timeout: Duration::from_secs(20),
    }
}

#[tokio::test]
async fn samples_noisy_stream_until_window_closes() {
    let mut frames = Vec::new();
    for i in 0..10 {
        frames.push(post("did:plc:a", i, "en"));
        frames.push(delete("did:plc:a", i));
        frames.push(post("did:plc:a", i, "en"));
        frames.push(post("did:plc:b", i, "fr"));
    }
    frames.push("not json at all".to_string());
    let url = jetstream(frames, Ending::StayOpen).await;

    let sampler = Sampler::with_rng(4, "en", StdRng::seed_from_u64(1));
    let run = sampler
        .run(
            &session(400),
            JetstreamSource::connect(&url, keepalive()),
            &ProgressBar::hidden(),
        )
        .await
        .unwrap();

    assert!(run.termination.is_expired());
    assert_eq!(run.seen, 10);
    assert_eq!(run.stats.frames, 41);
    assert_eq!(run.stats.duplicates, 10);
    assert_eq!(run.stats.rejected, 21);
    assert_eq!(run.document.total, 4);
    assert_eq!(run.document.data.len(), 4);
    assert!(
        run.document
            .data
            .iter()
            .all(|i| i.originator_id == "did:plc:a")
    );
}

#[tokio::test]
async fn quiet_window_yields_short_sample() {
    let frames = (0..3).map(|i| post("did:plc:a", i, "en")).collect();
    let url = jetstream(frames, Ending::StayOpen).await;
    let run = Sampler::with_rng(50, "en", StdRng::seed_from_u64(1))
        .run(
            &session(200),
            JetstreamSource::connect(&url, keepalive()),
            &ProgressBar::hidden(),
        )
        .await
        .unwrap();
    assert_eq!(run.document.total, 50);
    assert_eq!(run.document.data.len(), 3);
    let keys: Vec<&str> = run
        .document
        .data
        .iter()
        .map(|i| i.record_key.as_str())
        .collect();
    assert_eq!(keys, vec!["0000", "0001", "0002"]);
}

#[tokio::test]
async fn clean_close_keeps_what_was_sampled() {
    let frames = (0..5).map(|i| post("did:plc:a", i, "en")).collect();
    let url = jetstream(frames, Ending::Close).await;
    let run = Sampler::with_rng(10, "en", StdRng::seed_from_u64(1))
        .run(
            &session(10_000),
            JetstreamSource::connect(&url, keepalive()),
            &ProgressBar::hidden(),
        )
        .await
        .unwrap();
    assert!(matches!(run.termination, Termination::Closed));
    assert_eq!(run.document.data.len(), 5);
}

#[tokio::test]
async fn abrupt_disconnect_is_failure_with_partial_sample() {
    let frames = (0..2).map(|i| post("did:plc:a", i, "en")).collect();
    let url = jetstream(frames, Ending::Drop).await;
    let run = Sampler::with_rng(10, "en", StdRng::seed_from_u64(1))
        .run(
            &session(10_000),
            JetstreamSource::connect(&url, keepalive()),
            &ProgressBar::hidden(),
        )
        .await
        .unwrap();
    assert!(matches!(run.termination, Termination::Failed(_)));
    assert_eq!(run.document.data.len(), 2);
}

#[tokio::test]
async fn sample_from_config_and_persist() {
    let frames = (0..6).map(|i| post("did:plc:a", i, "en")).collect();
    let url = jetstream(frames, Ending::StayOpen).await;
    let dir = tempfile::tempdir().unwrap();
    let cfg = SamplerConfig {
        source_uri: url,
        duration: Duration::from_millis(200),
        capacity: 3,
        receive_timeout: Duration::from_millis(50),
        keepalive: keepalive(),
        seed: Some(42),
        output_path: dir.path().join("corpus.json"),
        ..Default::default()
    };
    let run = sample(&cfg, &ProgressBar::hidden()).await.unwrap();
    run.document.save(&cfg.output_path).await.unwrap();

    let back = SampleDocument::load(&cfg.output_path).await.unwrap();
    assert_eq!(back.total, 3);
    assert_eq!(back.data.len(), 3);
    assert_eq!(back, run.document);
    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&cfg.output_path).unwrap()).unwrap();
    assert_eq!(raw["data"][0]["record"]["$type"], "app.bsky.feed.post");
}

#[tokio::test]
async fn unreachable_source_is_an_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let cfg = SamplerConfig {
        source_uri: format!("ws://{addr}/subscribe"),
        duration: Duration::from_millis(100),
        ..Default::default()
    };
    let err = sample(&cfg, &ProgressBar::hidden()).await.unwrap_err();
    assert!(matches!(err, skysample::Error::Connect { .. }));
}

#[tokio::test]
async fn stalled_handshake_ends_with_the_window() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        // accept TCP, never answer the websocket upgrade
        let (tcp, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(tcp);
    });
    let cfg = SamplerConfig {
        source_uri: format!("ws://{addr}/subscribe"),
        duration: Duration::from_millis(200),
        receive_timeout: Duration::from_millis(50),
        keepalive: keepalive(),
        ..Default::default()
    };
    let res = tokio::time::timeout(Duration::from_secs(5), sample(&cfg, &ProgressBar::hidden()))
        .await
        .expect("sampling must stop once the window closes");
    assert!(matches!(res, Err(skysample::Error::ConnectTimeout(_))));
}
