//! Reservoir sampling of a Bluesky Jetstream feed and batched hydration of
//! the sample against the public AppView.
//!
//! The [`sampler`] turns a live stream into a [`SampleDocument`]; the
//! [`enricher`] turns that document into a [`HydratedDocument`].

pub mod assemble;
pub mod classify;
pub mod config;
pub mod dedup;
pub mod document;
pub mod enricher;
pub mod error;
pub mod event;
pub mod fetch;
pub mod jetstream;
pub mod reservoir;
pub mod retry;
pub mod sampler;
pub mod session;

pub use assemble::{Assembler, HydrationReport};
pub use classify::{Classifier, Rejection, Verdict};
pub use config::{EnricherConfig, KeepaliveConfig, SamplerConfig};
pub use dedup::{Deduplicator, compose_uri};
pub use document::{CandidateItem, EnrichedItem, HydratedDocument, SampleDocument};
pub use enricher::{Enricher, enrich, partition};
pub use error::{Error, Result};
pub use event::{Event, RecordPayload};
pub use fetch::{PostLookup, PostsClient};
pub use jetstream::JetstreamSource;
pub use reservoir::{Placement, Reservoir};
pub use retry::{Attempt, RetryError, RetryPolicy};
pub use sampler::{Ingest, SampleRun, Sampler, sample};
pub use session::{EventSource, StreamSession, Termination};
