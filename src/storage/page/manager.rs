use crate::common::types::{Page, SlotId};
use crate::storage::page::error::PageError;
use crate::storage::page::header::{PageHeader, RecordLocation};

/// Slotted-page record access. Slot entries grow from the end of the page,
/// record data grows from just after the header. Deleting is two-phased:
/// `mark_delete` tombstones a slot (reversible until commit), `apply_delete`
/// vacates it for good.
pub struct PageManager;

impl Default for PageManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PageManager {
    pub fn new() -> Self {
        Self
    }

    pub fn init_page(&self, page: &mut Page) {
        PageHeader::new().write_to(&mut page.data);
    }

    pub fn get_header(&self, page: &Page) -> PageHeader {
        PageHeader::read_from(&page.data)
    }

    pub fn set_header(&self, page: &mut Page, header: &PageHeader) {
        header.write_to(&mut page.data);
    }

    pub fn slot_count(&self, page: &Page) -> u32 {
        self.get_header(page).slot_count
    }

    pub fn free_space(&self, page: &Page) -> u32 {
        self.get_header(page).free_space_size
    }

    /// Insert a record, returning its slot id
    pub fn insert_record(&self, page: &mut Page, data: &[u8]) -> Result<SlotId, PageError> {
        let mut header = self.get_header(page);

        let record_size = data.len() as u32;
        if !header.can_fit(record_size) {
            return Err(PageError::InsufficientSpace);
        }

        let offset = header.free_space_offset;
        let slot = header.claim(record_size);

        let data_end = offset as usize + data.len();
        page.data[offset as usize..data_end].copy_from_slice(data);
        RecordLocation::new(offset, record_size).write_at(&mut page.data, slot);
        header.write_to(&mut page.data);

        Ok(slot)
    }

    /// Read a live record
    pub fn get_record(&self, page: &Page, slot: SlotId) -> Result<Vec<u8>, PageError> {
        let loc = self.slot_location(page, slot)?;
        if !loc.is_live() {
            return Err(PageError::RecordNotFound);
        }

        let start = loc.offset as usize;
        let end = start + loc.length() as usize;
        Ok(page.data[start..end].to_vec())
    }

    /// Whether a slot currently holds a visible record
    pub fn is_live(&self, page: &Page, slot: SlotId) -> bool {
        match self.slot_location(page, slot) {
            Ok(loc) => loc.is_live(),
            Err(_) => false,
        }
    }

    /// Tombstone a record so a later rollback can restore it
    pub fn mark_delete(&self, page: &mut Page, slot: SlotId) -> Result<(), PageError> {
        let loc = self.slot_location(page, slot)?;
        if !loc.is_live() {
            return Err(PageError::RecordNotFound);
        }
        loc.tombstoned().write_at(&mut page.data, slot);
        Ok(())
    }

    /// Undo a `mark_delete`
    pub fn rollback_delete(&self, page: &mut Page, slot: SlotId) -> Result<(), PageError> {
        let loc = self.slot_location(page, slot)?;
        if !loc.is_tombstoned() {
            return Err(PageError::RecordNotDeleted);
        }
        loc.restored().write_at(&mut page.data, slot);
        Ok(())
    }

    /// Vacate a slot for good. Valid on live or tombstoned records; the data
    /// bytes stay as garbage until compaction.
    pub fn apply_delete(&self, page: &mut Page, slot: SlotId) -> Result<(), PageError> {
        let loc = self.slot_location(page, slot)?;
        if loc.is_vacated() {
            return Err(PageError::RecordNotFound);
        }
        loc.vacated().write_at(&mut page.data, slot);

        let mut header = self.get_header(page);
        header.free_space_size += loc.length();
        header.write_to(&mut page.data);
        Ok(())
    }

    /// Overwrite a record in place. A larger record is rewritten at the free
    /// space frontier, leaving the old bytes as a hole; the slot id is
    /// preserved either way.
    pub fn update_record(
        &self,
        page: &mut Page,
        slot: SlotId,
        data: &[u8],
    ) -> Result<(), PageError> {
        let loc = self.slot_location(page, slot)?;
        if !loc.is_live() {
            return Err(PageError::RecordNotFound);
        }

        let new_size = data.len() as u32;

        if new_size > loc.length() {
            let mut header = self.get_header(page);
            if header.free_space_size < new_size {
                return Err(PageError::InsufficientSpace);
            }

            let new_offset = header.free_space_offset;
            let new_end = new_offset as usize + data.len();
            page.data[new_offset as usize..new_end].copy_from_slice(data);
            RecordLocation::new(new_offset, new_size).write_at(&mut page.data, slot);

            header.free_space_offset += new_size;
            // The old record's bytes become a hole; only its length returns
            // to the free-space budget
            header.free_space_size -= new_size;
            header.free_space_size += loc.length();
            header.write_to(&mut page.data);
            return Ok(());
        }

        let start = loc.offset as usize;
        page.data[start..start + data.len()].copy_from_slice(data);

        if new_size < loc.length() {
            RecordLocation::new(loc.offset, new_size).write_at(&mut page.data, slot);
            let mut header = self.get_header(page);
            header.free_space_size += loc.length() - new_size;
            header.write_to(&mut page.data);
        }

        Ok(())
    }

    fn slot_location(&self, page: &Page, slot: SlotId) -> Result<RecordLocation, PageError> {
        if slot >= self.get_header(page).slot_count {
            return Err(PageError::InvalidSlotId);
        }
        Ok(RecordLocation::read_at(&page.data, slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::header::{HEADER_SIZE, SLOT_ENTRY_SIZE};

    fn fresh_page() -> (PageManager, Page) {
        let pm = PageManager::new();
        let mut page = Page::new(1);
        pm.init_page(&mut page);
        (pm, page)
    }

    #[test]
    fn test_insert_and_get() {
        let (pm, mut page) = fresh_page();
        let a = pm.insert_record(&mut page, b"alpha").unwrap();
        let b = pm.insert_record(&mut page, b"beta").unwrap();
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(pm.get_record(&page, a).unwrap(), b"alpha");
        assert_eq!(pm.get_record(&page, b).unwrap(), b"beta");
        assert_eq!(pm.slot_count(&page), 2);
    }

    #[test]
    fn test_mark_rollback_apply_delete() {
        let (pm, mut page) = fresh_page();
        let slot = pm.insert_record(&mut page, b"victim").unwrap();

        pm.mark_delete(&mut page, slot).unwrap();
        assert!(!pm.is_live(&page, slot));
        assert!(pm.get_record(&page, slot).is_err());

        pm.rollback_delete(&mut page, slot).unwrap();
        assert_eq!(pm.get_record(&page, slot).unwrap(), b"victim");

        pm.mark_delete(&mut page, slot).unwrap();
        pm.apply_delete(&mut page, slot).unwrap();
        assert!(pm.get_record(&page, slot).is_err());
        assert!(pm.rollback_delete(&mut page, slot).is_err());
    }

    #[test]
    fn test_update_in_place_and_grow() {
        let (pm, mut page) = fresh_page();
        let slot = pm.insert_record(&mut page, b"small").unwrap();

        pm.update_record(&mut page, slot, b"tiny").unwrap();
        assert_eq!(pm.get_record(&page, slot).unwrap(), b"tiny");

        pm.update_record(&mut page, slot, b"a considerably longer record")
            .unwrap();
        assert_eq!(
            pm.get_record(&page, slot).unwrap(),
            b"a considerably longer record"
        );
    }

    #[test]
    fn test_header_offsets_match_layout() {
        let (pm, mut page) = fresh_page();
        pm.insert_record(&mut page, b"abc").unwrap();
        let header = pm.get_header(&page);
        assert_eq!(header.free_space_offset, HEADER_SIZE as u32 + 3);
        assert_eq!(header.slot_count, 1);
    }

    #[test]
    fn test_page_fills_up() {
        let (pm, mut page) = fresh_page();
        let big = vec![7u8; 1000];
        let mut inserted = 0;
        loop {
            match pm.insert_record(&mut page, &big) {
                Ok(_) => inserted += 1,
                Err(PageError::InsufficientSpace) => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert!(inserted > 0);
        assert!(pm.free_space(&page) < 1000 + SLOT_ENTRY_SIZE as u32);
    }
}
