// Extendible Hash Index
//
// A disk-backed extendible hash table: one directory page routing 32-bit
// key hashes to bucket pages, growing by bucket splits and shrinking by
// bucket merges. Every page access goes through the buffer pool; the index
// itself owns only page ids, never frames.
//
// Latching protocol: the table latch keeps the directory stable (readers
// and inserters share it, structural changes take it exclusively); each
// page's own RwLock is the per-bucket latch.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::hash::hash_key;
use crate::common::types::{PageId, Rid};
use crate::index::hash::error::HashIndexError;
use crate::storage::buffer::BufferPoolManager;
use crate::storage::page::hash_bucket::{HashBucketPage, HashBucketPageMut, IndexKey};
use crate::storage::page::hash_directory::{
    HashDirectoryPage, HashDirectoryPageMut, MAX_GLOBAL_DEPTH,
};

enum InsertOutcome {
    Done(bool),
    BucketFull,
}

pub struct ExtendibleHashIndex {
    buffer_pool: Arc<BufferPoolManager>,
    directory_page_id: PageId,
    table_latch: RwLock<()>,
}

impl ExtendibleHashIndex {
    /// Create an empty index: a directory at global depth 0 routing every
    /// key to a single empty bucket.
    pub fn new(buffer_pool: Arc<BufferPoolManager>) -> Result<Self, HashIndexError> {
        let dir_guard = buffer_pool.new_page()?;
        let directory_page_id = dir_guard.page_id();

        let bucket_guard = buffer_pool.new_page()?;
        let bucket_page_id = bucket_guard.page_id();

        {
            let mut page = dir_guard.write();
            let mut dir = HashDirectoryPageMut::new(&mut page.data);
            dir.set_page_id(directory_page_id);
            dir.set_local_depth(0, 0);
            dir.set_bucket_page_id(0, bucket_page_id);
        }
        dir_guard.mark_dirty();
        // A zeroed page is a valid empty bucket
        bucket_guard.mark_dirty();

        Ok(Self {
            buffer_pool,
            directory_page_id,
            table_latch: RwLock::new(()),
        })
    }

    pub fn directory_page_id(&self) -> PageId {
        self.directory_page_id
    }

    fn hash(key: &IndexKey) -> u32 {
        hash_key(key.as_bytes())
    }

    /// Bucket page currently responsible for a key
    fn route(&self, key: &IndexKey) -> Result<PageId, HashIndexError> {
        let dir_guard = self.buffer_pool.fetch_page(self.directory_page_id)?;
        let page = dir_guard.read();
        let dir = HashDirectoryPage::new(&page.data);
        let idx = (Self::hash(key) & dir.global_depth_mask()) as usize;
        Ok(dir.bucket_page_id(idx))
    }

    /// All rids stored under a key
    pub fn get_value(&self, key: &IndexKey) -> Result<Vec<Rid>, HashIndexError> {
        let _latch = self.table_latch.read();

        let bucket_page_id = self.route(key)?;
        let bucket_guard = self.buffer_pool.fetch_page(bucket_page_id)?;
        let page = bucket_guard.read();
        Ok(HashBucketPage::new(&page.data).get_value(key))
    }

    /// Insert a (key, rid) pair. Returns false when the exact pair already
    /// exists. A full bucket triggers a split and a retry.
    pub fn insert(&self, key: &IndexKey, rid: Rid) -> Result<bool, HashIndexError> {
        loop {
            match self.try_insert(key, rid)? {
                InsertOutcome::Done(inserted) => return Ok(inserted),
                InsertOutcome::BucketFull => self.split(key)?,
            }
        }
    }

    fn try_insert(&self, key: &IndexKey, rid: Rid) -> Result<InsertOutcome, HashIndexError> {
        let _latch = self.table_latch.read();

        let bucket_page_id = self.route(key)?;
        let bucket_guard = self.buffer_pool.fetch_page(bucket_page_id)?;

        let outcome = {
            let mut page = bucket_guard.write();
            let mut bucket = HashBucketPageMut::new(&mut page.data);

            if bucket.get_value(key).contains(&rid) {
                InsertOutcome::Done(false)
            } else if bucket.is_full() {
                InsertOutcome::BucketFull
            } else {
                InsertOutcome::Done(bucket.insert(key, rid))
            }
        };

        if matches!(outcome, InsertOutcome::Done(true)) {
            bucket_guard.mark_dirty();
        }
        Ok(outcome)
    }

    /// Split the bucket a key routes to, growing the directory when the
    /// bucket already uses every global bit.
    fn split(&self, key: &IndexKey) -> Result<(), HashIndexError> {
        let _latch = self.table_latch.write();

        let dir_guard = self.buffer_pool.fetch_page(self.directory_page_id)?;
        let mut dir_page = dir_guard.write();
        let mut dir = HashDirectoryPageMut::new(&mut dir_page.data);

        // Recompute under the exclusive latch; another thread may have
        // already split this bucket
        let idx = (Self::hash(key) & dir.global_depth_mask()) as usize;
        let old_depth = dir.local_depth(idx);

        if old_depth >= MAX_GLOBAL_DEPTH {
            return Err(HashIndexError::DirectoryFull);
        }
        if old_depth == dir.global_depth() {
            dir.incr_global_depth();
        }

        let old_page_id = dir.bucket_page_id(idx);
        let new_depth = old_depth + 1;

        let old_guard = self.buffer_pool.fetch_page(old_page_id)?;
        let entries = {
            let mut page = old_guard.write();
            let mut bucket = HashBucketPageMut::new(&mut page.data);
            let entries = bucket.entries();
            bucket.reset();
            entries
        };

        let image_guard = self.buffer_pool.new_page()?;
        let image_page_id = image_guard.page_id();

        // Every alias of the old bucket re-routes by the bit at the old
        // local depth: bit clear keeps the old page, bit set moves to the
        // split image
        for i in 0..dir.size() {
            if dir.bucket_page_id(i) == old_page_id {
                dir.set_local_depth(i, new_depth);
                if (i >> old_depth) & 1 == 1 {
                    dir.set_bucket_page_id(i, image_page_id);
                }
            }
        }

        // Redistribute the entries by the same bit of their hash
        {
            let mut old_page = old_guard.write();
            let mut image_page = image_guard.write();
            let mut old_bucket = HashBucketPageMut::new(&mut old_page.data);
            let mut image_bucket = HashBucketPageMut::new(&mut image_page.data);

            for (entry_key, entry_rid) in entries {
                if (Self::hash(&entry_key) >> old_depth) & 1 == 1 {
                    image_bucket.insert(&entry_key, entry_rid);
                } else {
                    old_bucket.insert(&entry_key, entry_rid);
                }
            }
        }

        old_guard.mark_dirty();
        image_guard.mark_dirty();
        dir_guard.mark_dirty();

        log::debug!(
            "split bucket page {} (depth {} -> {}), image page {}",
            old_page_id,
            old_depth,
            new_depth,
            image_page_id
        );
        Ok(())
    }

    /// Remove the exact (key, rid) pair. An emptied bucket triggers a merge
    /// attempt after the table latch is released.
    pub fn remove(&self, key: &IndexKey, rid: Rid) -> Result<bool, HashIndexError> {
        let (removed, now_empty) = {
            let _latch = self.table_latch.read();

            let bucket_page_id = self.route(key)?;
            let bucket_guard = self.buffer_pool.fetch_page(bucket_page_id)?;

            let (removed, now_empty) = {
                let mut page = bucket_guard.write();
                let mut bucket = HashBucketPageMut::new(&mut page.data);
                let removed = bucket.remove(key, rid);
                (removed, bucket.is_empty())
            };

            if removed {
                bucket_guard.mark_dirty();
            }
            (removed, now_empty)
        };

        // The read latch must be dropped before merging takes the write latch
        if removed && now_empty {
            self.merge()?;
        }
        Ok(removed)
    }

    /// Collapse empty buckets into their split images until no collapse is
    /// possible, shrinking the directory along the way. A bucket is only
    /// mergeable when it is empty, above depth 0, and agrees with its
    /// split image on local depth; buckets that fail the depth test now
    /// are picked up by a later pass once their image has collapsed.
    fn merge(&self) -> Result<(), HashIndexError> {
        let _latch = self.table_latch.write();

        let dir_guard = self.buffer_pool.fetch_page(self.directory_page_id)?;
        let mut dir_page = dir_guard.write();
        let mut dir = HashDirectoryPageMut::new(&mut dir_page.data);
        let mut changed = false;

        'sweep: loop {
            for idx in 0..dir.size() {
                let depth = dir.local_depth(idx);
                if depth == 0 {
                    continue;
                }

                let image_idx = idx ^ (1 << (depth - 1));
                if dir.local_depth(image_idx) != depth {
                    continue;
                }

                let bucket_page_id = dir.bucket_page_id(idx);
                let image_page_id = dir.bucket_page_id(image_idx);
                if bucket_page_id == image_page_id {
                    continue;
                }

                let empty = {
                    let bucket_guard = self.buffer_pool.fetch_page(bucket_page_id)?;
                    let page = bucket_guard.read();
                    HashBucketPage::new(&page.data).is_empty()
                };
                if !empty {
                    continue;
                }

                for i in 0..dir.size() {
                    if dir.bucket_page_id(i) == bucket_page_id {
                        dir.set_bucket_page_id(i, image_page_id);
                    }
                }
                for i in 0..dir.size() {
                    if dir.bucket_page_id(i) == image_page_id {
                        dir.set_local_depth(i, depth - 1);
                    }
                }

                self.buffer_pool.delete_page(bucket_page_id)?;

                while dir.can_shrink() {
                    dir.decr_global_depth();
                }

                log::debug!(
                    "merged bucket page {} into page {} (depth {} -> {})",
                    bucket_page_id,
                    image_page_id,
                    depth,
                    depth - 1
                );
                changed = true;
                // The directory changed under us; restart the scan
                continue 'sweep;
            }
            break;
        }

        if changed {
            dir_guard.mark_dirty();
        }
        Ok(())
    }

    /// Current global depth of the directory
    pub fn global_depth(&self) -> Result<u32, HashIndexError> {
        let _latch = self.table_latch.read();

        let dir_guard = self.buffer_pool.fetch_page(self.directory_page_id)?;
        let page = dir_guard.read();
        Ok(HashDirectoryPage::new(&page.data).global_depth())
    }

    /// Number of distinct bucket pages the directory references
    pub fn bucket_count(&self) -> Result<usize, HashIndexError> {
        let _latch = self.table_latch.read();

        let dir_guard = self.buffer_pool.fetch_page(self.directory_page_id)?;
        let page = dir_guard.read();
        let dir = HashDirectoryPage::new(&page.data);

        let mut pages: Vec<PageId> = (0..dir.size()).map(|i| dir.bucket_page_id(i)).collect();
        pages.sort_unstable();
        pages.dedup();
        Ok(pages.len())
    }

    /// Check the directory invariants, for tests and debugging
    pub fn verify_integrity(&self) -> Result<(), HashIndexError> {
        let _latch = self.table_latch.read();

        let dir_guard = self.buffer_pool.fetch_page(self.directory_page_id)?;
        let page = dir_guard.read();
        HashDirectoryPage::new(&page.data)
            .verify_integrity()
            .map_err(HashIndexError::CorruptDirectory)
    }
}
