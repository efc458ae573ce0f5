/*!
 * The integer keyspace `[0, N)` and its partitioning policy.
 *
 * `Keyspace` owns the monotonic cursor the coordinator hands out work
 * from. `ReassignmentQueue` holds the un-progressed tails of evicted
 * assignments; the dispatcher always drains it before cutting a fresh
 * slice off the cursor.
 */
use std::collections::VecDeque;
use std::sync::Mutex;

/// A half-open work-unit range `[start, start + len)`.
pub type Range = (u64, u64);

pub struct Keyspace {
    total: u64,
    next_index: Mutex<u64>,
}

impl Keyspace {
    pub fn new(total: u64) -> Self {
        Self { total, next_index: Mutex::new(0) }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// True once every index has been handed out at least once. Does not
    /// account for assignments still outstanding — that is the dispatcher's
    /// job, which also consults the reassignment queue and live workers.
    pub fn cursor_exhausted(&self) -> bool {
        *self.next_index.lock().unwrap() >= self.total
    }

    /// Claims up to `work_size` fresh indices off the cursor. Applies
    /// last-bit leveling: once fewer than 8 full-size units remain, the
    /// chunk size is halved successively so the tail isn't handed out as
    /// one huge unit to whichever worker asks first.
    pub fn claim(&self, work_size: u64) -> Option<Range> {
        assert!(work_size > 0, "work_size must be positive");
        let mut next = self.next_index.lock().unwrap();
        if *next >= self.total {
            return None;
        }
        let remaining = self.total - *next;
        let len = leveled_chunk_len(work_size, remaining);
        let start = *next;
        *next += len;
        Some((start, len))
    }
}

fn leveled_chunk_len(work_size: u64, remaining: u64) -> u64 {
    let mut candidate = work_size.min(remaining);
    while remaining < 8 * candidate && candidate > 1 {
        candidate /= 2;
    }
    candidate.max(1).min(remaining)
}

/// Un-progressed tails of evicted or abandoned assignments, consulted
/// before the global cursor so no range is skipped.
pub struct ReassignmentQueue {
    queue: Mutex<VecDeque<Range>>,
}

impl ReassignmentQueue {
    pub fn new() -> Self {
        Self { queue: Mutex::new(VecDeque::new()) }
    }

    pub fn push(&self, range: Range) {
        if range.1 > 0 {
            self.queue.lock().unwrap().push_back(range);
        }
    }

    pub fn pop(&self) -> Option<Range> {
        self.queue.lock().unwrap().pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().unwrap().is_empty()
    }
}

impl Default for ReassignmentQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_keyspace_is_exhausted_immediately() {
        let ks = Keyspace::new(0);
        assert!(ks.cursor_exhausted());
        assert_eq!(ks.claim(100), None);
    }

    #[test]
    fn claims_cover_the_full_range_with_no_overlap() {
        let ks = Keyspace::new(1000);
        let mut covered = Vec::new();
        while let Some((start, len)) = ks.claim(100) {
            covered.push((start, len));
        }
        let total: u64 = covered.iter().map(|(_, l)| l).sum();
        assert_eq!(total, 1000);
        let mut cursor = 0;
        for (start, len) in covered {
            assert_eq!(start, cursor);
            cursor += len;
        }
    }

    #[test]
    fn clamps_final_chunk_to_remaining_indices() {
        let ks = Keyspace::new(150);
        let (start, len) = ks.claim(100).unwrap();
        assert_eq!((start, len), (0, 100));
        // Remaining 50 < 8 * 100, so leveling halves repeatedly: 100 -> 50
        // but 50 is clamped to the 50 that remain either way.
        let (start2, len2) = ks.claim(100).unwrap();
        assert_eq!(start2, 100);
        assert!(len2 <= 50);
        assert!(ks.claim(100).is_none() || start2 + len2 < 150);
    }

    #[test]
    fn single_unit_len_is_valid() {
        let ks = Keyspace::new(1);
        assert_eq!(ks.claim(100), Some((0, 1)));
        assert!(ks.claim(100).is_none());
    }

    #[test]
    fn reassignment_queue_is_drained_fifo() {
        let q = ReassignmentQueue::new();
        q.push((10, 5));
        q.push((20, 3));
        assert_eq!(q.pop(), Some((10, 5)));
        assert_eq!(q.pop(), Some((20, 3)));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn reassignment_queue_ignores_empty_ranges() {
        let q = ReassignmentQueue::new();
        q.push((10, 0));
        assert_eq!(q.pop(), None);
    }
}
