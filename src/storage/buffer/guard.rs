// Page Guard
//
// A PageGuard holds one pin on a buffer-pool page for its own lifetime and
// unpins on drop, carrying the dirty flag it accumulated. This replaces
// manual unpin calls, which leak pins on every early return.

use std::cell::Cell;
use std::sync::Arc;

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::types::{Page, PageId, PagePtr};
use crate::storage::buffer::manager::BufferPoolManager;

pub struct PageGuard {
    buffer_pool: Arc<BufferPoolManager>,
    page: PagePtr,
    page_id: PageId,
    dirty: Cell<bool>,
}

impl PageGuard {
    pub(crate) fn new(buffer_pool: Arc<BufferPoolManager>, page: PagePtr, page_id: PageId) -> Self {
        Self {
            buffer_pool,
            page,
            page_id,
            dirty: Cell::new(false),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Take the page's read latch
    pub fn read(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    /// Take the page's write latch. Callers that modify the page must also
    /// call `mark_dirty`.
    pub fn write(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    /// Record that the page was modified; the unpin on drop will carry the
    /// dirty flag to the buffer pool.
    pub fn mark_dirty(&self) {
        self.dirty.set(true);
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if let Err(e) = self
            .buffer_pool
            .unpin_page(self.page_id, self.dirty.get())
        {
            log::warn!("failed to unpin page {}: {}", self.page_id, e);
        }
    }
}
