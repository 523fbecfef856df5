//! Algorithm R: a uniform fixed-size sample over a stream of unknown length.

use rand::Rng;

/// What happened to an offered item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The reservoir was still filling.
    Appended,
    /// The item replaced the one at this slot.
    Replaced(usize),
    Discarded,
}

/// Holds at most `capacity` items. After `n >= capacity` offers every offered
/// item is present with probability `capacity / n`.
#[derive(Debug, Clone)]
pub struct Reservoir<T> {
    capacity: usize,
    seen: u64,
    sample: Vec<T>,
}

impl<T> Reservoir<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seen: 0,
            sample: Vec::with_capacity(capacity.min(1 << 16)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items offered so far.
    pub fn seen(&self) -> u64 {
        self.seen
    }

    pub fn len(&self) -> usize {
        self.sample.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sample.is_empty()
    }

    pub fn sample(&self) -> &[T] {
        &self.sample
    }

    pub fn into_sample(self) -> Vec<T> {
        self.sample
    }

    /// Offer the next item of the stream.
    pub fn offer<R: Rng>(&mut self, item: T, rng: &mut R) -> Placement {
        self.seen += 1;
        if self.sample.len() < self.capacity {
            self.sample.push(item);
            return Placement::Appended;
        }
        let r = rng.gen_range(0..self.seen);
        match usize::try_from(r) {
            Ok(slot) if slot < self.capacity => {
                self.sample[slot] = item;
                Placement::Replaced(slot)
            }
            _ => Placement::Discarded,
        }
    }
}
