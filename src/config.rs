//! Per-run configuration for both pipelines.
//!
//! Each run owns its config; nothing here is process-global. Files are TOML
//! with durations written as (possibly fractional) seconds.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

pub const DEFAULT_SOURCE: &str =
    "wss://jetstream1.us-west.bsky.network/subscribe?wantedCollections=app.bsky.feed.post";
pub const DEFAULT_ENDPOINT: &str = "https://public.api.bsky.app/xrpc/app.bsky.feed.getPosts";
pub const DEFAULT_SAMPLE_PATH: &str = "../data/corpus.json";
pub const DEFAULT_HYDRATED_PATH: &str = "../data/hydrated_corpus.json";

/// Serde helpers for `Duration` as float seconds.
pub mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let v = f64::deserialize(d)?;
        Duration::try_from_secs_f64(v).map_err(serde::de::Error::custom)
    }
}

/// Transport settings; handled entirely by the websocket source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct KeepaliveConfig {
    /// Upper bound on the TCP connect plus websocket upgrade.
    #[serde(with = "secs")]
    pub open_timeout: Duration,
    #[serde(with = "secs")]
    pub ping_interval: Duration,
    #[serde(with = "secs")]
    pub ping_timeout: Duration,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            open_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(20),
            ping_timeout: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub source_uri: String,
    /// Length of the sampling window.
    #[serde(with = "secs")]
    pub duration: Duration,
    /// Reservoir size `k`.
    pub capacity: usize,
    pub language_filter: String,
    /// How long one receive may block before the loop re-checks the clock.
    #[serde(with = "secs")]
    pub receive_timeout: Duration,
    pub keepalive: KeepaliveConfig,
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
    pub output_path: PathBuf,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            source_uri: DEFAULT_SOURCE.into(),
            duration: Duration::from_secs(30),
            capacity: 100,
            language_filter: "en".into(),
            receive_timeout: Duration::from_secs(5),
            keepalive: KeepaliveConfig::default(),
            seed: None,
            output_path: DEFAULT_SAMPLE_PATH.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnricherConfig {
    pub endpoint: String,
    /// Fixed by the API; `getPosts` accepts at most 25 uris.
    pub batch_size: usize,
    pub retry_policy: RetryPolicy,
    #[serde(with = "secs")]
    pub request_timeout: Duration,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

impl Default for EnricherConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            batch_size: 25,
            retry_policy: RetryPolicy::default(),
            request_timeout: Duration::from_secs(30),
            input_path: DEFAULT_SAMPLE_PATH.into(),
            output_path: DEFAULT_HYDRATED_PATH.into(),
        }
    }
}

/// Load a config of either kind from a TOML file. Missing keys keep their
/// defaults.
pub async fn load<T, P>(path: P) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::io(path, e))?;
    Ok(toml::from_str(&text)?)
}
