// Hash Bucket Page Layout
//
// Bit-exact view over one bucket page of the extendible hash index:
//
//   offset 0                occupied bitmap  (ceil(N/8) bytes)
//   offset BITMAP_SIZE      readable bitmap  (ceil(N/8) bytes)
//   offset 2*BITMAP_SIZE    packed (key, rid) slots (24 bytes each)
//
// `occupied` marks a slot that has ever held an entry, `readable` marks one
// that currently does. Occupied-but-unreadable is a tombstone. Slots are
// handed out lowest-first and tombstones are reused, so the occupied bits
// always form a prefix and scans stop at the first never-used slot.

use byteorder::{ByteOrder, LittleEndian};

use crate::common::types::{Rid, PAGE_SIZE};

/// Fixed width of an index key in bytes. Longer serialized keys are
/// truncated, shorter ones zero-padded (generic-key style).
pub const INDEX_KEY_SIZE: usize = 16;

/// One slot: key bytes plus the rid (page id + slot number)
pub const BUCKET_ENTRY_SIZE: usize = INDEX_KEY_SIZE + 8;

/// Slots per bucket page, sized so two bitmaps plus the slot array fit
pub const BUCKET_ARRAY_SIZE: usize = 4 * PAGE_SIZE / (4 * BUCKET_ENTRY_SIZE + 1);

const BITMAP_SIZE: usize = (BUCKET_ARRAY_SIZE + 7) / 8;
const OCCUPIED_OFFSET: usize = 0;
const READABLE_OFFSET: usize = BITMAP_SIZE;
const ARRAY_OFFSET: usize = 2 * BITMAP_SIZE;

/// Fixed-size index key, compared bytewise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexKey {
    data: [u8; INDEX_KEY_SIZE],
}

impl IndexKey {
    /// Build a key from serialized bytes, truncating or zero-padding to the
    /// fixed width.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut data = [0u8; INDEX_KEY_SIZE];
        let len = bytes.len().min(INDEX_KEY_SIZE);
        data[..len].copy_from_slice(&bytes[..len]);
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8; INDEX_KEY_SIZE] {
        &self.data
    }
}

fn bit_get(bitmap: &[u8], idx: usize) -> bool {
    bitmap[idx / 8] & (1 << (idx % 8)) != 0
}

fn entry_offset(slot: usize) -> usize {
    ARRAY_OFFSET + slot * BUCKET_ENTRY_SIZE
}

fn read_key(data: &[u8], slot: usize) -> IndexKey {
    let pos = entry_offset(slot);
    IndexKey::from_bytes(&data[pos..pos + INDEX_KEY_SIZE])
}

fn read_rid(data: &[u8], slot: usize) -> Rid {
    let pos = entry_offset(slot) + INDEX_KEY_SIZE;
    Rid::new(
        LittleEndian::read_u32(&data[pos..pos + 4]),
        LittleEndian::read_u32(&data[pos + 4..pos + 8]),
    )
}

fn is_occupied(data: &[u8], slot: usize) -> bool {
    bit_get(&data[OCCUPIED_OFFSET..OCCUPIED_OFFSET + BITMAP_SIZE], slot)
}

fn is_readable(data: &[u8], slot: usize) -> bool {
    bit_get(&data[READABLE_OFFSET..READABLE_OFFSET + BITMAP_SIZE], slot)
}

fn num_readable(data: &[u8]) -> usize {
    let mut count = 0;
    for slot in 0..BUCKET_ARRAY_SIZE {
        if !is_occupied(data, slot) {
            break;
        }
        if is_readable(data, slot) {
            count += 1;
        }
    }
    count
}

/// Read-only view of a bucket page
pub struct HashBucketPage<'a> {
    data: &'a [u8],
}

impl<'a> HashBucketPage<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn is_occupied(&self, slot: usize) -> bool {
        is_occupied(self.data, slot)
    }

    pub fn is_readable(&self, slot: usize) -> bool {
        is_readable(self.data, slot)
    }

    pub fn key_at(&self, slot: usize) -> IndexKey {
        read_key(self.data, slot)
    }

    pub fn rid_at(&self, slot: usize) -> Rid {
        read_rid(self.data, slot)
    }

    /// All rids stored under a key
    pub fn get_value(&self, key: &IndexKey) -> Vec<Rid> {
        let mut result = Vec::new();
        for slot in 0..BUCKET_ARRAY_SIZE {
            if !self.is_occupied(slot) {
                break;
            }
            if self.is_readable(slot) && self.key_at(slot) == *key {
                result.push(self.rid_at(slot));
            }
        }
        result
    }

    pub fn num_readable(&self) -> usize {
        num_readable(self.data)
    }

    pub fn is_full(&self) -> bool {
        self.num_readable() == BUCKET_ARRAY_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.num_readable() == 0
    }

    /// Copy of every live entry, for split rehashing
    pub fn entries(&self) -> Vec<(IndexKey, Rid)> {
        let mut result = Vec::with_capacity(self.num_readable());
        for slot in 0..BUCKET_ARRAY_SIZE {
            if !self.is_occupied(slot) {
                break;
            }
            if self.is_readable(slot) {
                result.push((self.key_at(slot), self.rid_at(slot)));
            }
        }
        result
    }
}

/// Mutable view of a bucket page
pub struct HashBucketPageMut<'a> {
    data: &'a mut [u8],
}

impl<'a> HashBucketPageMut<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data }
    }

    fn as_view(&self) -> HashBucketPage<'_> {
        HashBucketPage::new(self.data)
    }

    pub fn get_value(&self, key: &IndexKey) -> Vec<Rid> {
        self.as_view().get_value(key)
    }

    pub fn num_readable(&self) -> usize {
        num_readable(self.data)
    }

    pub fn is_full(&self) -> bool {
        self.num_readable() == BUCKET_ARRAY_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.num_readable() == 0
    }

    pub fn entries(&self) -> Vec<(IndexKey, Rid)> {
        self.as_view().entries()
    }

    fn set_bit(&mut self, base: usize, slot: usize, value: bool) {
        let byte = base + slot / 8;
        if value {
            self.data[byte] |= 1 << (slot % 8);
        } else {
            self.data[byte] &= !(1 << (slot % 8));
        }
    }

    /// Insert a (key, rid) pair. Duplicate pairs are rejected; duplicate
    /// keys with distinct rids are fine. Returns false when the pair exists
    /// or the bucket is full.
    pub fn insert(&mut self, key: &IndexKey, rid: Rid) -> bool {
        let mut free_slot = None;
        for slot in 0..BUCKET_ARRAY_SIZE {
            if !is_occupied(self.data, slot) {
                if free_slot.is_none() {
                    free_slot = Some(slot);
                }
                break;
            }
            if is_readable(self.data, slot) {
                if read_key(self.data, slot) == *key && read_rid(self.data, slot) == rid {
                    return false;
                }
            } else if free_slot.is_none() {
                // Tombstone, reusable
                free_slot = Some(slot);
            }
        }

        let slot = match free_slot {
            Some(slot) => slot,
            None => return false,
        };

        let pos = entry_offset(slot);
        self.data[pos..pos + INDEX_KEY_SIZE].copy_from_slice(key.as_bytes());
        LittleEndian::write_u32(
            &mut self.data[pos + INDEX_KEY_SIZE..pos + INDEX_KEY_SIZE + 4],
            rid.page_id,
        );
        LittleEndian::write_u32(
            &mut self.data[pos + INDEX_KEY_SIZE + 4..pos + INDEX_KEY_SIZE + 8],
            rid.slot,
        );
        self.set_bit(OCCUPIED_OFFSET, slot, true);
        self.set_bit(READABLE_OFFSET, slot, true);
        true
    }

    /// Remove the exact (key, rid) pair, leaving a tombstone. Returns false
    /// when the pair is not present.
    pub fn remove(&mut self, key: &IndexKey, rid: Rid) -> bool {
        for slot in 0..BUCKET_ARRAY_SIZE {
            if !is_occupied(self.data, slot) {
                break;
            }
            if is_readable(self.data, slot)
                && read_key(self.data, slot) == *key
                && read_rid(self.data, slot) == rid
            {
                self.set_bit(READABLE_OFFSET, slot, false);
                return true;
            }
        }
        false
    }

    /// Clear both bitmaps, logically emptying the bucket
    pub fn reset(&mut self) {
        for byte in &mut self.data[OCCUPIED_OFFSET..ARRAY_OFFSET] {
            *byte = 0;
        }
    }
}
