//! Approximate priority queue keyed by integer cost.

use log::debug;

/// Number of regular buckets in a [`BucketQueue`].
///
/// Every edge cost and every heuristic change along an edge stays below this
/// window, so a relaxation never lands behind the cursor.
pub const NUM_QUEUE_BUCKETS: usize = 32;

const WINDOW: i32 = NUM_QUEUE_BUCKETS as i32;

/// Bucket queue of cell indices with a rolling minimum cursor.
///
/// Entries whose key is at least `NUM_QUEUE_BUCKETS` ahead of the cursor wait
/// in an overflow bucket until the cursor catches up. Keys are not stored:
/// callers recompute them and detect stale entries on pop.
#[derive(Clone, Debug)]
pub struct BucketQueue {
    buckets: Vec<Vec<u32>>,
    overflow: Vec<u32>,
    min: i32,
    stats: QueueStats,
}

/// Monotonic counters kept for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Entries pushed, including re-insertions.
    pub pushed: u64,
    /// Entries popped.
    pub popped: u64,
    /// Cells enqueued again with a better distance.
    pub repeated: u64,
    /// Stale entries discarded on pop.
    pub skipped: u64,
    /// Entries moved from the overflow bucket into the window.
    pub redistributed: u64,
}

impl Default for BucketQueue {
    fn default() -> Self {
        Self {
            buckets: vec![Vec::new(); NUM_QUEUE_BUCKETS],
            overflow: Vec::new(),
            min: 0,
            stats: QueueStats::default(),
        }
    }
}

impl BucketQueue {
    /// Empties every bucket and resets the cursor and counters.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.overflow.clear();
        self.min = 0;
        self.stats = QueueStats::default();
    }

    /// Current minimum key cursor.
    #[must_use]
    pub const fn min(&self) -> i32 {
        self.min
    }

    /// Moves the cursor, used when seeding a search.
    pub fn set_min(&mut self, min: i32) {
        self.min = min;
    }

    /// Diagnostic counters.
    #[must_use]
    pub const fn stats(&self) -> &QueueStats {
        &self.stats
    }

    /// Records a relaxation that improved an already enqueued cell.
    pub fn note_repeated(&mut self) {
        self.stats.repeated += 1;
    }

    /// Records a stale entry dropped by the consumer.
    pub fn note_skipped(&mut self) {
        self.stats.skipped += 1;
    }

    /// Reports whether nothing has ever been pushed since the last clear.
    #[must_use]
    pub const fn is_fresh(&self) -> bool {
        self.stats.pushed == 0
    }

    /// Reports whether every pushed entry has been popped.
    #[must_use]
    pub const fn is_drained(&self) -> bool {
        self.stats.pushed == self.stats.popped
    }

    /// Pushes an entry into the regular bucket of its key.
    pub fn push(&mut self, index: u32, key: i32) {
        self.buckets[bucket_of(key)].push(index);
        self.stats.pushed += 1;
    }

    /// Pushes an entry whose key grew since it was queued.
    ///
    /// Keys inside the window go to their regular bucket, farther keys wait in
    /// the overflow bucket.
    pub fn reinsert(&mut self, index: u32, key: i32) {
        if key < self.min.saturating_add(WINDOW) {
            self.buckets[bucket_of(key)].push(index);
        } else {
            self.overflow.push(index);
        }
        self.stats.pushed += 1;
    }

    /// Pops an entry from the bucket under the cursor.
    ///
    /// Empty buckets advance the cursor. Each time the cursor completes a turn
    /// of the ring, overflow entries whose key now fits the window move back
    /// into regular buckets; `key_of` recomputes their keys.
    pub fn pop(&mut self, key_of: impl Fn(u32) -> i32) -> Option<u32> {
        if self.is_drained() {
            return None;
        }

        while self.buckets[bucket_of(self.min)].is_empty() {
            self.min = self.min.checked_add(1)?;
            if self.min % WINDOW == 0 && !self.overflow.is_empty() {
                self.redistribute(&key_of);
            }
        }

        let index = self.buckets[bucket_of(self.min)].pop()?;
        self.stats.popped += 1;
        Some(index)
    }

    fn redistribute(&mut self, key_of: &impl Fn(u32) -> i32) {
        let before = self.overflow.len();
        let limit = self.min.saturating_add(WINDOW);
        let mut i = 0;
        while i < self.overflow.len() {
            let index = self.overflow[i];
            let key = key_of(index);
            if key < limit {
                self.buckets[bucket_of(key)].push(index);
                let _ = self.overflow.swap_remove(i);
            } else {
                i += 1;
            }
        }
        let moved = before - self.overflow.len();
        self.stats.redistributed += u64::try_from(moved).unwrap_or(0);
        debug!("redistributed {moved} of {before} overflow entries at cost {}", self.min);
    }

    /// Number of entries waiting in each non-empty regular bucket.
    pub fn occupancy(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.buckets
            .iter()
            .enumerate()
            .filter(|(_, bucket)| !bucket.is_empty())
            .map(|(slot, bucket)| (slot, bucket.len()))
    }
}

fn bucket_of(key: i32) -> usize {
    usize::try_from(key.rem_euclid(WINDOW)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_lowest_key_first() {
        let mut queue = BucketQueue::default();
        queue.set_min(10);
        queue.push(1, 14);
        queue.push(2, 10);
        queue.push(3, 12);

        let key = |index: u32| [0, 14, 10, 12][index as usize];
        assert_eq!(queue.pop(key), Some(2));
        assert_eq!(queue.pop(key), Some(3));
        assert_eq!(queue.pop(key), Some(1));
        assert_eq!(queue.pop(key), None);
        assert!(queue.is_drained());
    }

    #[test]
    fn same_bucket_pops_most_recent_entry() {
        let mut queue = BucketQueue::default();
        queue.push(7, 0);
        queue.push(8, 0);
        assert_eq!(queue.pop(|_| 0), Some(8));
        assert_eq!(queue.pop(|_| 0), Some(7));
    }

    #[test]
    fn overflow_entries_return_when_the_cursor_catches_up() {
        let mut queue = BucketQueue::default();
        queue.set_min(5);
        queue.reinsert(1, 70);
        queue.push(2, 6);

        let key = |index: u32| if index == 1 { 70 } else { 6 };
        assert_eq!(queue.pop(key), Some(2));
        assert_eq!(queue.pop(key), Some(1));
        assert_eq!(queue.min(), 70);
        assert_eq!(queue.stats().redistributed, 1);
    }

    #[test]
    fn clear_resets_counters() {
        let mut queue = BucketQueue::default();
        queue.push(1, 3);
        queue.note_repeated();
        assert!(!queue.is_fresh());

        queue.clear();
        assert!(queue.is_fresh());
        assert!(queue.is_drained());
        assert_eq!(queue.stats(), &QueueStats::default());
    }
}
