// src/region/lru.rs
//
// Recency queue with stamp-based lazy deletion: touching a key pushes a
// fresh (key, stamp) pair instead of scanning for the old one. A popped
// entry only counts when its stamp still matches the live stamp for that
// key, so stale entries fall out for free. The queue is compacted when it
// grows far past the number of live keys.

use std::collections::VecDeque;

use rustc_hash::FxHashMap as HashMap;

use crate::core::RegionKey;

pub(crate) struct RecencyQueue {
    queue: VecDeque<(RegionKey, u64)>,
    live: HashMap<RegionKey, u64>,
    stamp: u64,
}

impl RecencyQueue {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            live: HashMap::default(),
            stamp: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Move `key` to the most-recently-used end.
    pub fn touch(&mut self, key: RegionKey) {
        self.stamp = self.stamp.wrapping_add(1).max(1);
        self.live.insert(key, self.stamp);
        self.queue.push_back((key, self.stamp));
        self.maybe_compact();
    }

    pub fn remove(&mut self, key: &RegionKey) {
        self.live.remove(key);
    }

    /// Pop the least-recently-used live key, skipping stale entries.
    pub fn pop_oldest(&mut self) -> Option<RegionKey> {
        while let Some((key, stamp)) = self.queue.pop_front() {
            if self.live.get(&key) == Some(&stamp) {
                self.live.remove(&key);
                return Some(key);
            }
        }
        None
    }

    fn maybe_compact(&mut self) {
        let max = self.live.len().saturating_mul(8).max(1024);
        if self.queue.len() <= max {
            return;
        }

        let live = &self.live;
        self.queue.retain(|(key, stamp)| live.get(key) == Some(stamp));
    }
}
