// LRU Replacer
//
// Tracks the frames eligible for eviction: a frame enters when its pin
// count drops to zero and leaves when it is pinned again. Victim order is
// strict least-recently-unpinned.

use linked_hash_map::LinkedHashMap;

use crate::common::types::FrameId;

/// Strict-LRU replacement policy over unpinned frames. The ordered map
/// keeps insertion order, so the front entry is the oldest unpin and the
/// next victim.
pub struct LruReplacer {
    capacity: usize,
    frames: LinkedHashMap<FrameId, ()>,
}

impl LruReplacer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            frames: LinkedHashMap::with_capacity(capacity),
        }
    }

    /// Evict the least-recently-unpinned frame, if any is tracked
    pub fn victim(&mut self) -> Option<FrameId> {
        self.frames.pop_front().map(|(frame_id, ())| frame_id)
    }

    /// A pinned frame is no longer a candidate. No-op if untracked.
    pub fn pin(&mut self, frame_id: FrameId) {
        self.frames.remove(&frame_id);
    }

    /// Admit a frame whose pin count reached zero. An already-tracked frame
    /// keeps its original position (first unpin wins), and nothing is
    /// admitted beyond capacity.
    pub fn unpin(&mut self, frame_id: FrameId) {
        if self.frames.contains_key(&frame_id) || self.frames.len() >= self.capacity {
            return;
        }
        self.frames.insert(frame_id, ());
    }

    pub fn size(&self) -> usize {
        self.frames.len()
    }
}
