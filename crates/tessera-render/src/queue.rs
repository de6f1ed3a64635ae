//! Bounded, order-preserving draw queue.

use crate::vertex::DrawEntry;

/// Queued quads waiting for the next flush.
///
/// Entries are never reordered or dropped. The owner flushes once
/// [`should_flush`](Self::should_flush) reports the threshold was reached,
/// which keeps the length within `max_entries`.
#[derive(Debug, Clone)]
pub struct DrawQueue {
    entries: Vec<DrawEntry>,
    max_entries: usize,
    flush_threshold: usize,
}

impl DrawQueue {
    /// The threshold is clamped into `1..=max_entries`.
    pub fn new(max_entries: usize, flush_threshold: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: Vec::with_capacity(max_entries),
            max_entries,
            flush_threshold: flush_threshold.clamp(1, max_entries),
        }
    }

    /// Append an entry. Returns `true` when the queue must be flushed now.
    #[inline]
    pub fn push(&mut self, entry: DrawEntry) -> bool {
        debug_assert!(self.entries.len() < self.max_entries, "draw queue overflow");
        self.entries.push(entry);
        self.should_flush()
    }

    #[inline]
    pub fn should_flush(&self) -> bool {
        self.entries.len() >= self.flush_threshold
    }

    pub fn entries(&self) -> &[DrawEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn flush_threshold(&self) -> usize {
        self.flush_threshold
    }
}
