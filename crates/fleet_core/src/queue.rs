//! Flat array-backed binary min-heap keyed by an `f64` priority.
//!
//! There is no decrease-key. Field propagation re-enqueues a cell whenever it
//! finds a strictly better cost and discards dequeued entries whose priority
//! no longer matches the field (lazy deletion). Equal priorities dequeue in
//! insertion order, which keeps propagation deterministic.

#[derive(Debug, Clone)]
struct Entry<T> {
    priority: f64,
    seq: u64,
    value: T,
}

impl<T> Entry<T> {
    /// Strict heap order: lower priority first, then earlier insertion.
    #[inline]
    fn before(&self, other: &Self) -> bool {
        match self.priority.total_cmp(&other.priority) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Greater => false,
            std::cmp::Ordering::Equal => self.seq < other.seq,
        }
    }
}

/// Binary min-heap over `(priority, value)` pairs.
#[derive(Debug, Clone)]
pub struct IndexedPriorityQueue<T> {
    heap: Vec<Entry<T>>,
    next_seq: u64,
}

impl<T> Default for IndexedPriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IndexedPriorityQueue<T> {
    /// Create an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            heap: Vec::new(),
            next_seq: 0,
        }
    }

    /// Create an empty queue with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
            next_seq: 0,
        }
    }

    /// Number of queued entries, stale ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drop every entry, keeping the allocation.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.next_seq = 0;
    }

    /// Insert a value in O(log n).
    pub fn enqueue(&mut self, priority: f64, value: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry {
            priority,
            seq,
            value,
        });
        self.sift_up(self.heap.len() - 1);
    }

    /// Remove and return the minimum-priority entry in O(log n).
    pub fn dequeue(&mut self) -> Option<(f64, T)> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.heap.swap(0, last);
        let entry = self.heap.pop()?;
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some((entry.priority, entry.value))
    }

    /// Priority of the minimum entry without removing it.
    #[must_use]
    pub fn peek_priority(&self) -> Option<f64> {
        self.heap.first().map(|e| e.priority)
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.heap[index].before(&self.heap[parent]) {
                self.heap.swap(index, parent);
                index = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * index + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let smallest = if right < len && self.heap[right].before(&self.heap[left]) {
                right
            } else {
                left
            };
            if self.heap[smallest].before(&self.heap[index]) {
                self.heap.swap(index, smallest);
                index = smallest;
            } else {
                break;
            }
        }
    }
}
