// Table Heap Implementation
//
// A table heap is a doubly linked chain of slotted pages. Inserts walk the
// chain for free space and append a fresh page when none is left. Deletes
// are two-phased: mark now, apply at commit, roll back on abort.

use std::sync::Arc;

use crate::common::types::{PageId, Rid, SlotId, PAGE_SIZE};
use crate::storage::buffer::BufferPoolManager;
use crate::storage::page::error::PageError;
use crate::storage::page::header::{HEADER_SIZE, SLOT_ENTRY_SIZE};
use crate::storage::page::PageManager;
use crate::storage::table::error::TableError;

/// Largest record body one page can host
const MAX_TUPLE_SIZE: usize = PAGE_SIZE - HEADER_SIZE - SLOT_ENTRY_SIZE;

pub struct TableHeap {
    buffer_pool: Arc<BufferPoolManager>,
    page_manager: PageManager,
    first_page_id: PageId,
}

impl TableHeap {
    /// Create a heap with one empty page
    pub fn new(buffer_pool: Arc<BufferPoolManager>) -> Result<Self, TableError> {
        let guard = buffer_pool.new_page()?;
        let page_manager = PageManager::new();
        {
            let mut page = guard.write();
            page_manager.init_page(&mut page);
        }
        guard.mark_dirty();
        let first_page_id = guard.page_id();

        Ok(Self {
            buffer_pool,
            page_manager,
            first_page_id,
        })
    }

    /// Reopen a heap whose first page already exists
    pub fn open(buffer_pool: Arc<BufferPoolManager>, first_page_id: PageId) -> Self {
        Self {
            buffer_pool,
            page_manager: PageManager::new(),
            first_page_id,
        }
    }

    pub fn first_page_id(&self) -> PageId {
        self.first_page_id
    }

    /// Insert a serialized tuple, returning its rid
    pub fn insert_tuple(&self, data: &[u8]) -> Result<Rid, TableError> {
        if data.len() > MAX_TUPLE_SIZE {
            return Err(TableError::TupleTooLarge(data.len()));
        }

        let mut page_id = self.first_page_id;
        loop {
            let guard = self.buffer_pool.fetch_page(page_id)?;
            let next_page_id = {
                let mut page = guard.write();
                match self.page_manager.insert_record(&mut page, data) {
                    Ok(slot) => {
                        guard.mark_dirty();
                        return Ok(Rid::new(page_id, slot));
                    }
                    Err(PageError::InsufficientSpace) => {
                        self.page_manager.get_header(&page).next_page_id
                    }
                    Err(e) => return Err(e.into()),
                }
            };

            match next_page_id {
                Some(next) => page_id = next,
                None => {
                    // End of the chain: append a page and link it in
                    let new_guard = self.buffer_pool.new_page()?;
                    let new_page_id = new_guard.page_id();
                    {
                        let mut new_page = new_guard.write();
                        self.page_manager.init_page(&mut new_page);
                        let mut header = self.page_manager.get_header(&new_page);
                        header.prev_page_id = Some(page_id);
                        self.page_manager.set_header(&mut new_page, &header);
                    }
                    new_guard.mark_dirty();

                    {
                        let mut page = guard.write();
                        let mut header = self.page_manager.get_header(&page);
                        header.next_page_id = Some(new_page_id);
                        self.page_manager.set_header(&mut page, &header);
                    }
                    guard.mark_dirty();

                    let slot = {
                        let mut new_page = new_guard.write();
                        self.page_manager.insert_record(&mut new_page, data)?
                    };
                    new_guard.mark_dirty();
                    return Ok(Rid::new(new_page_id, slot));
                }
            }
        }
    }

    /// Read a live tuple's bytes
    pub fn get_tuple(&self, rid: Rid) -> Result<Vec<u8>, TableError> {
        let guard = self.buffer_pool.fetch_page(rid.page_id)?;
        let page = guard.read();
        self.page_manager
            .get_record(&page, rid.slot)
            .map_err(|e| match e {
                PageError::RecordNotFound | PageError::InvalidSlotId => {
                    TableError::TupleNotFound(rid)
                }
                other => other.into(),
            })
    }

    /// Tombstone a tuple; reversible until commit
    pub fn mark_delete(&self, rid: Rid) -> Result<(), TableError> {
        self.with_page_mut(rid, |pm, page, slot| pm.mark_delete(page, slot))
    }

    /// Undo a mark_delete
    pub fn rollback_delete(&self, rid: Rid) -> Result<(), TableError> {
        self.with_page_mut(rid, |pm, page, slot| pm.rollback_delete(page, slot))
    }

    /// Vacate a tombstoned (or live) slot for good
    pub fn apply_delete(&self, rid: Rid) -> Result<(), TableError> {
        self.with_page_mut(rid, |pm, page, slot| pm.apply_delete(page, slot))
    }

    /// Overwrite a tuple in place
    pub fn update_tuple(&self, rid: Rid, data: &[u8]) -> Result<(), TableError> {
        if data.len() > MAX_TUPLE_SIZE {
            return Err(TableError::TupleTooLarge(data.len()));
        }
        self.with_page_mut(rid, |pm, page, slot| pm.update_record(page, slot, data))
    }

    /// Iterate every live tuple in the heap
    pub fn iter(self: &Arc<Self>) -> TableIterator {
        TableIterator {
            heap: self.clone(),
            current_page_id: Some(self.first_page_id),
            current_slot: 0,
        }
    }

    fn with_page_mut<F>(&self, rid: Rid, op: F) -> Result<(), TableError>
    where
        F: FnOnce(&PageManager, &mut crate::common::types::Page, SlotId) -> Result<(), PageError>,
    {
        let guard = self.buffer_pool.fetch_page(rid.page_id)?;
        {
            let mut page = guard.write();
            op(&self.page_manager, &mut page, rid.slot).map_err(|e| match e {
                PageError::RecordNotFound | PageError::InvalidSlotId => {
                    TableError::TupleNotFound(rid)
                }
                other => other.into(),
            })?;
        }
        guard.mark_dirty();
        Ok(())
    }
}

/// Cursor over the live tuples of a heap, page by page, slot by slot
pub struct TableIterator {
    heap: Arc<TableHeap>,
    current_page_id: Option<PageId>,
    current_slot: SlotId,
}

impl TableIterator {
    /// Advance to the next live tuple, or None when the chain is exhausted
    pub fn next(&mut self) -> Result<Option<(Rid, Vec<u8>)>, TableError> {
        loop {
            let page_id = match self.current_page_id {
                Some(id) => id,
                None => return Ok(None),
            };

            let guard = self.heap.buffer_pool.fetch_page(page_id)?;
            let page = guard.read();
            let header = self.heap.page_manager.get_header(&page);

            while self.current_slot < header.slot_count {
                let slot = self.current_slot;
                self.current_slot += 1;
                if self.heap.page_manager.is_live(&page, slot) {
                    let data = self.heap.page_manager.get_record(&page, slot)?;
                    return Ok(Some((Rid::new(page_id, slot), data)));
                }
            }

            self.current_page_id = header.next_page_id;
            self.current_slot = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn test_heap() -> (Arc<TableHeap>, NamedTempFile) {
        let file = NamedTempFile::new().unwrap();
        let buffer_pool = Arc::new(BufferPoolManager::new(16, file.path()).unwrap());
        (Arc::new(TableHeap::new(buffer_pool).unwrap()), file)
    }

    #[test]
    fn test_insert_get_iterate() {
        let (heap, _file) = test_heap();

        let a = heap.insert_tuple(b"first").unwrap();
        let b = heap.insert_tuple(b"second").unwrap();
        assert_eq!(heap.get_tuple(a).unwrap(), b"first");
        assert_eq!(heap.get_tuple(b).unwrap(), b"second");

        let mut iter = heap.iter();
        assert_eq!(iter.next().unwrap().unwrap().1, b"first");
        assert_eq!(iter.next().unwrap().unwrap().1, b"second");
        assert!(iter.next().unwrap().is_none());
    }

    #[test]
    fn test_delete_lifecycle() {
        let (heap, _file) = test_heap();
        let rid = heap.insert_tuple(b"doomed").unwrap();

        heap.mark_delete(rid).unwrap();
        assert!(heap.get_tuple(rid).is_err());

        heap.rollback_delete(rid).unwrap();
        assert_eq!(heap.get_tuple(rid).unwrap(), b"doomed");

        heap.mark_delete(rid).unwrap();
        heap.apply_delete(rid).unwrap();
        assert!(heap.get_tuple(rid).is_err());

        let mut iter = heap.iter();
        assert!(iter.next().unwrap().is_none());
    }

    #[test]
    fn test_spills_to_second_page() {
        let (heap, _file) = test_heap();
        let blob = vec![3u8; 2000];

        let mut rids = Vec::new();
        for _ in 0..10 {
            rids.push(heap.insert_tuple(&blob).unwrap());
        }

        // 10 * 2KB cannot fit one 8KB page
        assert!(rids.iter().any(|r| r.page_id != rids[0].page_id));

        let mut iter = heap.iter();
        let mut seen = 0;
        while let Some((rid, data)) = iter.next().unwrap() {
            assert_eq!(data, blob);
            assert!(rids.contains(&rid));
            seen += 1;
        }
        assert_eq!(seen, 10);
    }

    #[test]
    fn test_update_tuple() {
        let (heap, _file) = test_heap();
        let rid = heap.insert_tuple(b"before").unwrap();
        heap.update_tuple(rid, b"after!").unwrap();
        assert_eq!(heap.get_tuple(rid).unwrap(), b"after!");
    }
}
