// Buffer Pool Manager
//
// Mediates between the on-disk page file and a fixed set of in-memory
// frames. Tracks residency in a page table, pins through reference counts,
// and evicts least-recently-unpinned frames via the LRU replacer. All
// operations of one instance serialize on a single mutex.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::common::types::{
    Frame, FrameId, FramePtr, Lsn, Page, PageId, INVALID_PAGE_ID,
};
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::buffer::guard::PageGuard;
use crate::storage::buffer::replacer::LruReplacer;
use crate::storage::disk::DiskManager;

/// Callback invoked with a page's id and lsn before its dirty contents are
/// written out. The recovery manager hangs its log-flush ordering off this.
pub type FlushHook = Box<dyn Fn(PageId, Lsn) + Send + Sync>;

struct PoolState {
    page_table: HashMap<PageId, FrameId>,
    free_list: VecDeque<FrameId>,
    replacer: LruReplacer,
    next_page_id: PageId,
}

pub struct BufferPoolManager {
    pool_size: usize,
    num_instances: u32,
    instance_index: u32,
    frames: Vec<FramePtr>,
    state: Mutex<PoolState>,
    disk_manager: Arc<DiskManager>,
    flush_hook: RwLock<Option<FlushHook>>,
}

impl BufferPoolManager {
    /// Single-instance buffer pool over a fresh disk manager
    pub fn new(pool_size: usize, db_path: impl AsRef<Path>) -> Result<Self, BufferPoolError> {
        let disk_manager = Arc::new(DiskManager::new(db_path)?);
        Ok(Self::with_instance(pool_size, 1, 0, disk_manager))
    }

    /// One instance of a sharded pool. Instance `i` of `n` owns the page ids
    /// congruent to `i` modulo `n` (offset by one for the invalid sentinel).
    pub fn with_instance(
        pool_size: usize,
        num_instances: u32,
        instance_index: u32,
        disk_manager: Arc<DiskManager>,
    ) -> Self {
        assert!(num_instances > 0);
        assert!(instance_index < num_instances);

        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);

        for i in 0..pool_size {
            let frame_id = i as FrameId;
            let frame = Frame::new(frame_id, Arc::new(RwLock::new(Page::new(INVALID_PAGE_ID))));
            frames.push(Arc::new(RwLock::new(frame)));
            free_list.push_back(frame_id);
        }

        Self {
            pool_size,
            num_instances,
            instance_index,
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::new(),
                free_list,
                replacer: LruReplacer::new(pool_size),
                next_page_id: instance_index + 1,
            }),
            disk_manager,
            flush_hook: RwLock::new(None),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Install the pre-flush callback (the WAL seam)
    pub fn set_flush_hook(&self, hook: FlushHook) {
        *self.flush_hook.write() = Some(hook);
    }

    /// Create a new page, pinned exactly once
    pub fn new_page(self: &Arc<Self>) -> Result<PageGuard, BufferPoolError> {
        let mut state = self.state.lock();

        let frame_id = self.allocate_frame(&mut state)?;
        let page_id = Self::allocate_page_id(&mut state, self.num_instances);

        let frame = &self.frames[frame_id as usize];
        let page_ptr = {
            let mut frame_guard = frame.write();
            {
                let mut page = frame_guard.page.write();
                page.reset();
                page.page_id = page_id;
            }
            frame_guard.pin_count = 1;
            frame_guard.is_dirty = false;
            frame_guard.page.clone()
        };

        state.page_table.insert(page_id, frame_id);
        state.replacer.pin(frame_id);

        Ok(PageGuard::new(self.clone(), page_ptr, page_id))
    }

    /// Fetch a page, reading it from disk if not resident
    pub fn fetch_page(self: &Arc<Self>, page_id: PageId) -> Result<PageGuard, BufferPoolError> {
        if page_id == INVALID_PAGE_ID {
            return Err(BufferPoolError::InvalidOperation(
                "cannot fetch the invalid page id".to_string(),
            ));
        }

        let mut state = self.state.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let frame = &self.frames[frame_id as usize];
            let page_ptr = {
                let mut frame_guard = frame.write();
                frame_guard.pin_count += 1;
                frame_guard.page.clone()
            };
            state.replacer.pin(frame_id);
            return Ok(PageGuard::new(self.clone(), page_ptr, page_id));
        }

        let frame_id = self.allocate_frame(&mut state)?;
        let frame = &self.frames[frame_id as usize];

        let page_ptr = {
            let mut frame_guard = frame.write();
            {
                let mut page = frame_guard.page.write();
                page.reset();
                if let Err(e) = self.disk_manager.read_page(page_id, &mut page) {
                    // The frame was never installed; hand it back
                    drop(page);
                    drop(frame_guard);
                    state.free_list.push_back(frame_id);
                    return Err(e.into());
                }
            }
            frame_guard.pin_count = 1;
            frame_guard.is_dirty = false;
            frame_guard.page.clone()
        };

        state.page_table.insert(page_id, frame_id);
        state.replacer.pin(frame_id);

        Ok(PageGuard::new(self.clone(), page_ptr, page_id))
    }

    /// Drop one pin. The dirty flag only ever accumulates here; it is
    /// cleared by flushing, never by an unpin.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<(), BufferPoolError> {
        let mut state = self.state.lock();

        let frame_id = *state
            .page_table
            .get(&page_id)
            .ok_or(BufferPoolError::PageNotFound(page_id))?;

        let frame = &self.frames[frame_id as usize];
        let pin_count = {
            let mut frame_guard = frame.write();
            if frame_guard.pin_count == 0 {
                return Err(BufferPoolError::PageNotPinned(page_id));
            }
            frame_guard.pin_count -= 1;
            if is_dirty {
                frame_guard.is_dirty = true;
            }
            frame_guard.pin_count
        };

        if pin_count == 0 {
            state.replacer.unpin(frame_id);
        }

        Ok(())
    }

    /// Write a resident page to disk and clear its dirty flag
    pub fn flush_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        if page_id == INVALID_PAGE_ID {
            return Err(BufferPoolError::InvalidOperation(
                "cannot flush the invalid page id".to_string(),
            ));
        }

        let state = self.state.lock();
        let frame_id = *state
            .page_table
            .get(&page_id)
            .ok_or(BufferPoolError::PageNotFound(page_id))?;

        self.flush_frame(frame_id)
    }

    /// Flush every resident page
    pub fn flush_all_pages(&self) -> Result<(), BufferPoolError> {
        let state = self.state.lock();
        let frame_ids: Vec<FrameId> = state.page_table.values().copied().collect();

        for frame_id in frame_ids {
            self.flush_frame(frame_id)?;
        }
        Ok(())
    }

    /// Drop a page from the pool and hand its id back to the disk manager.
    /// Deleting a page that is not resident succeeds vacuously; deleting a
    /// pinned page fails.
    pub fn delete_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        let mut state = self.state.lock();

        let frame_id = match state.page_table.remove(&page_id) {
            Some(frame_id) => frame_id,
            None => return Ok(()),
        };

        let frame = &self.frames[frame_id as usize];
        {
            let mut frame_guard = frame.write();
            if frame_guard.pin_count > 0 {
                state.page_table.insert(page_id, frame_id);
                return Err(BufferPoolError::PagePinned(page_id));
            }

            frame_guard.page.write().reset();
            frame_guard.is_dirty = false;
        }

        self.disk_manager.deallocate_page(page_id);
        state.replacer.pin(frame_id);
        state.free_list.push_back(frame_id);

        Ok(())
    }

    /// Current pin count of a resident page, for tests and diagnostics
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let state = self.state.lock();
        let frame_id = *state.page_table.get(&page_id)?;
        Some(self.frames[frame_id as usize].read().pin_count)
    }

    /// Hand out the next page id this instance owns
    fn allocate_page_id(state: &mut MutexGuard<'_, PoolState>, num_instances: u32) -> PageId {
        let page_id = state.next_page_id;
        state.next_page_id += num_instances;
        page_id
    }

    /// Pick a frame for a new resident page: free list first, then the
    /// replacer. A dirty victim is written back before reuse.
    fn allocate_frame(
        &self,
        state: &mut MutexGuard<'_, PoolState>,
    ) -> Result<FrameId, BufferPoolError> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }

        let victim_id = state.replacer.victim().ok_or(BufferPoolError::BufferPoolFull)?;
        let frame = &self.frames[victim_id as usize];

        let (dirty, old_page_id) = {
            let frame_guard = frame.read();
            let page = frame_guard.page.read();
            (frame_guard.is_dirty, page.page_id)
        };

        if dirty {
            self.flush_frame(victim_id)?;
        }
        if old_page_id != INVALID_PAGE_ID {
            log::debug!("evicting page {} from frame {}", old_page_id, victim_id);
            state.page_table.remove(&old_page_id);
        }

        Ok(victim_id)
    }

    /// Write one frame's page out, firing the flush hook first
    fn flush_frame(&self, frame_id: FrameId) -> Result<(), BufferPoolError> {
        let frame = &self.frames[frame_id as usize];

        let page_copy = {
            let frame_guard = frame.read();
            let page_clone = frame_guard.page.read().clone();
            page_clone
        };

        if let Some(hook) = self.flush_hook.read().as_ref() {
            hook(page_copy.page_id, page_copy.lsn);
        }
        self.disk_manager.write_page(&page_copy)?;

        frame.write().is_dirty = false;
        Ok(())
    }
}
