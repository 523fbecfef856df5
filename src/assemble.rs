use crate::document::{EnrichedItem, HydratedDocument};

/// Collects batch results in order and keeps the loss accounting.
#[derive(Debug)]
pub struct Assembler {
    requested_total: usize,
    sampled: usize,
    items: Vec<EnrichedItem>,
    failed_batches: usize,
}

/// Operator-facing summary of a hydration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HydrationReport {
    /// `total` from the sample document.
    pub requested_total: usize,
    /// Items actually present in the sample document.
    pub sampled: usize,
    pub hydrated: usize,
    /// Batches that came back with nothing.
    pub failed_batches: usize,
}

impl HydrationReport {
    /// How many of the requested items did not make it into the output.
    pub fn missing(&self) -> usize {
        self.requested_total.saturating_sub(self.hydrated)
    }
}

impl Assembler {
    pub fn new(requested_total: usize, sampled: usize) -> Self {
        Self {
            requested_total,
            sampled,
            items: Vec::with_capacity(sampled),
            failed_batches: 0,
        }
    }

    /// Append one batch's worth of results. An empty batch counts as failed.
    pub fn push_batch(&mut self, batch: Vec<EnrichedItem>) {
        if batch.is_empty() {
            self.failed_batches += 1;
        }
        self.items.extend(batch);
    }

    pub fn hydrated(&self) -> usize {
        self.items.len()
    }

    pub fn report(&self) -> HydrationReport {
        HydrationReport {
            requested_total: self.requested_total,
            sampled: self.sampled,
            hydrated: self.items.len(),
            failed_batches: self.failed_batches,
        }
    }

    pub fn finish(self) -> (HydratedDocument, HydrationReport) {
        let report = self.report();
        let doc = HydratedDocument {
            total: self.items.len(),
            data: self.items,
        };
        (doc, report)
    }
}
