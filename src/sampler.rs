//! Sampler pipeline: classify, deduplicate, then reservoir-sample.

use std::future::Future;
use std::time::Duration;

use indicatif::ProgressBar;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace};

use crate::classify::{Classifier, Rejection, Verdict};
use crate::config::SamplerConfig;
use crate::dedup::Deduplicator;
use crate::document::{CandidateItem, SampleDocument};
use crate::error::Result;
use crate::jetstream::JetstreamSource;
use crate::reservoir::{Placement, Reservoir};
use crate::session::{EventSource, StreamSession, Termination};

/// Outcome of feeding one frame to the sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingest {
    Rejected(Rejection),
    Duplicate,
    Offered(Placement),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerStats {
    pub frames: u64,
    pub rejected: u64,
    pub duplicates: u64,
}

/// State owned by one sampling run.
#[derive(Debug)]
pub struct Sampler<R = StdRng> {
    classifier: Classifier,
    dedup: Deduplicator,
    reservoir: Reservoir<CandidateItem>,
    rng: R,
    stats: SamplerStats,
}

impl Sampler<StdRng> {
    /// Seeded from `config.seed` when present, otherwise from OS entropy.
    pub fn from_config(config: &SamplerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Sampler::with_rng(config.capacity, config.language_filter.clone(), rng)
    }
}

impl<R: Rng> Sampler<R> {
    pub fn with_rng(capacity: usize, language: impl Into<String>, rng: R) -> Self {
        Self {
            classifier: Classifier::new(language),
            dedup: Deduplicator::new(),
            reservoir: Reservoir::new(capacity),
            rng,
            stats: SamplerStats::default(),
        }
    }

    /// Feed one raw stream frame.
    pub fn ingest_raw(&mut self, raw: &str) -> Ingest {
        self.stats.frames += 1;
        match self.classifier.classify_raw(raw) {
            Verdict::Accept(item) => self.ingest(item),
            Verdict::Reject(reason) => {
                self.stats.rejected += 1;
                trace!(%reason, "event rejected");
                Ingest::Rejected(reason)
            }
        }
    }

    /// Offer an already-classified item; repeats of a uri never reach the
    /// reservoir and are not counted as seen.
    pub fn ingest(&mut self, item: CandidateItem) -> Ingest {
        if !self.dedup.first_sighting(&item.uri) {
            self.stats.duplicates += 1;
            debug!(uri = %item.uri, "duplicate event discarded");
            return Ingest::Duplicate;
        }
        Ingest::Offered(self.reservoir.offer(item, &mut self.rng))
    }

    /// Qualifying, first-seen items so far (`n`).
    pub fn seen(&self) -> u64 {
        self.reservoir.seen()
    }

    pub fn sample(&self) -> &[CandidateItem] {
        self.reservoir.sample()
    }

    pub fn stats(&self) -> SamplerStats {
        self.stats
    }

    pub fn into_document(self) -> SampleDocument {
        SampleDocument {
            total: self.reservoir.capacity(),
            data: self.reservoir.into_sample(),
        }
    }

    /// Run a full session. Whatever is in the reservoir when the session ends,
    /// for any reason, becomes the document.
    pub async fn run<S, C>(
        mut self,
        session: &StreamSession,
        connect: C,
        progress: &ProgressBar,
    ) -> Result<SampleRun>
    where
        S: EventSource,
        C: Future<Output = Result<S>>,
    {
        let report = session
            .run(
                connect,
                |msg| {
                    self.ingest_raw(&msg);
                },
                |elapsed| progress.set_position(elapsed.as_secs()),
            )
            .await?;
        progress.finish();
        let seen = self.seen();
        let stats = self.stats;
        let document = self.into_document();
        info!(
            collected = document.data.len(),
            seen,
            frames = stats.frames,
            rejected = stats.rejected,
            duplicates = stats.duplicates,
            "sampling finished"
        );
        Ok(SampleRun {
            document,
            seen,
            stats,
            elapsed: report.elapsed,
            termination: report.termination,
        })
    }
}

/// Result of a sampling session.
#[derive(Debug)]
pub struct SampleRun {
    pub document: SampleDocument,
    pub seen: u64,
    pub stats: SamplerStats,
    pub elapsed: Duration,
    pub termination: Termination,
}

/// Sample the configured Jetstream endpoint for `config.duration`.
pub async fn sample(config: &SamplerConfig, progress: &ProgressBar) -> Result<SampleRun> {
    let session = StreamSession::new(config.duration, config.receive_timeout);
    let connect = JetstreamSource::connect(&config.source_uri, config.keepalive.clone());
    Sampler::from_config(config)
        .run(&session, connect, progress)
        .await
}
