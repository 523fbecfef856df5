//! Enricher pipeline: batch the sampled uris, look each batch up, and keep
//! whatever resolves.

use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use crate::assemble::{Assembler, HydrationReport};
use crate::config::EnricherConfig;
use crate::document::{HydratedDocument, SampleDocument};
use crate::error::Result;
use crate::fetch::{PostLookup, PostsClient};

/// Split `items` into consecutive chunks of `batch_size`; the last chunk may
/// be shorter. A zero batch size is treated as one.
pub fn partition<T>(items: &[T], batch_size: usize) -> std::slice::Chunks<'_, T> {
    items.chunks(batch_size.max(1))
}

pub struct Enricher<L> {
    lookup: L,
    batch_size: usize,
}

impl<L: PostLookup> Enricher<L> {
    pub fn new(lookup: L, batch_size: usize) -> Self {
        Self { lookup, batch_size }
    }

    /// Look up every batch in order, one request in flight at a time.
    pub async fn hydrate(
        &self,
        sample: &SampleDocument,
        progress: &ProgressBar,
    ) -> (HydratedDocument, HydrationReport) {
        let uris = sample.uris();
        let mut assembler = Assembler::new(sample.total, uris.len());
        progress.set_length(uris.len() as u64);
        for (idx, batch) in partition(&uris, self.batch_size).enumerate() {
            let posts = self.lookup.lookup(batch).await;
            if posts.is_empty() {
                warn!(batch = idx, size = batch.len(), "batch dropped");
            } else {
                debug!(batch = idx, size = batch.len(), resolved = posts.len(), "batch hydrated");
            }
            assembler.push_batch(posts);
            progress.inc(batch.len() as u64);
        }
        progress.finish();
        assembler.finish()
    }
}

/// Load the sample document, hydrate it, and write the result. The output is
/// written even when every batch failed.
pub async fn enrich(config: &EnricherConfig, progress: &ProgressBar) -> Result<HydrationReport> {
    let sample = SampleDocument::load(&config.input_path).await?;
    info!(
        path = %config.input_path.display(),
        items = sample.data.len(),
        total = sample.total,
        "loaded sample"
    );
    let client = PostsClient::new(
        &config.endpoint,
        config.retry_policy.clone(),
        config.request_timeout,
    )?;
    let (doc, report) = Enricher::new(client, config.batch_size)
        .hydrate(&sample, progress)
        .await;
    doc.save(&config.output_path).await?;
    info!(
        path = %config.output_path.display(),
        hydrated = report.hydrated,
        missing = report.missing(),
        failed_batches = report.failed_batches,
        "hydrated document written"
    );
    Ok(report)
}
