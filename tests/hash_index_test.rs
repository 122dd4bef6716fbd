use anyhow::Result;
use rand::seq::SliceRandom;
use rand::thread_rng;

mod common;
use common::create_test_buffer_pool;

use kestreldb::common::types::Rid;
use kestreldb::index::hash::{ExtendibleHashIndex, IndexKey};

fn key(n: u64) -> IndexKey {
    IndexKey::from_bytes(&n.to_le_bytes())
}

#[test]
fn test_insert_and_lookup() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(50)?;
    let index = ExtendibleHashIndex::new(buffer_pool)?;

    for i in 0..100u64 {
        assert!(index.insert(&key(i), Rid::new(1, i as u32))?);
    }
    for i in 0..100u64 {
        assert_eq!(index.get_value(&key(i))?, vec![Rid::new(1, i as u32)]);
    }
    assert!(index.get_value(&key(1000))?.is_empty());

    index.verify_integrity()?;
    Ok(())
}

#[test]
fn test_duplicate_semantics() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(50)?;
    let index = ExtendibleHashIndex::new(buffer_pool)?;

    assert!(index.insert(&key(7), Rid::new(1, 0))?);
    // Same key, distinct value: accepted
    assert!(index.insert(&key(7), Rid::new(1, 1))?);
    // Exact duplicate pair: rejected
    assert!(!index.insert(&key(7), Rid::new(1, 0))?);

    let mut rids = index.get_value(&key(7))?;
    rids.sort();
    assert_eq!(rids, vec![Rid::new(1, 0), Rid::new(1, 1)]);

    // Removing one pair leaves the other
    assert!(index.remove(&key(7), Rid::new(1, 0))?);
    assert!(!index.remove(&key(7), Rid::new(1, 0))?);
    assert_eq!(index.get_value(&key(7))?, vec![Rid::new(1, 1)]);

    Ok(())
}

// Filling buckets past capacity forces splits: the directory grows, and
// every inserted key remains reachable afterwards.
#[test]
fn test_split_grows_directory() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(64)?;
    let index = ExtendibleHashIndex::new(buffer_pool)?;

    assert_eq!(index.global_depth()?, 0);

    let n = 2000u64;
    for i in 0..n {
        assert!(index.insert(&key(i), Rid::new((i / 100) as u32 + 1, (i % 100) as u32))?);
    }

    assert!(index.global_depth()? > 0);
    assert!(index.bucket_count()? > 1);
    index.verify_integrity()?;

    for i in 0..n {
        assert_eq!(
            index.get_value(&key(i))?,
            vec![Rid::new((i / 100) as u32 + 1, (i % 100) as u32)],
            "key {} lost after splits",
            i
        );
    }

    Ok(())
}

// Round trip: inserting a few thousand keys then removing them all (in
// random order) collapses the directory back to global depth 0 with one
// bucket page left.
#[test]
fn test_remove_all_shrinks_directory() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(64)?;
    let index = ExtendibleHashIndex::new(buffer_pool)?;

    let n = 2000u64;
    let mut keys: Vec<u64> = (0..n).collect();
    for &i in &keys {
        index.insert(&key(i), Rid::new(1, i as u32))?;
    }
    assert!(index.global_depth()? > 0);

    keys.shuffle(&mut thread_rng());
    for &i in &keys {
        assert!(index.remove(&key(i), Rid::new(1, i as u32))?, "key {} missing", i);
        index.verify_integrity()?;
    }

    assert_eq!(index.global_depth()?, 0);
    assert_eq!(index.bucket_count()?, 1);

    for i in 0..n {
        assert!(index.get_value(&key(i))?.is_empty());
    }

    Ok(())
}

#[test]
fn test_interleaved_insert_remove() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(64)?;
    let index = ExtendibleHashIndex::new(buffer_pool)?;

    for round in 0..3u64 {
        let base = round * 1000;
        for i in 0..1000 {
            index.insert(&key(base + i), Rid::new(1, (base + i) as u32))?;
        }
        // Drop the lower half of this round
        for i in 0..500 {
            assert!(index.remove(&key(base + i), Rid::new(1, (base + i) as u32))?);
        }
        index.verify_integrity()?;
    }

    for round in 0..3u64 {
        let base = round * 1000;
        for i in 0..500 {
            assert!(index.get_value(&key(base + i))?.is_empty());
        }
        for i in 500..1000 {
            assert_eq!(
                index.get_value(&key(base + i))?,
                vec![Rid::new(1, (base + i) as u32)]
            );
        }
    }

    Ok(())
}

#[test]
fn test_concurrent_inserts_and_reads() -> Result<()> {
    use std::sync::Arc;
    use std::thread;

    let (buffer_pool, _temp_file) = create_test_buffer_pool(64)?;
    let index = Arc::new(ExtendibleHashIndex::new(buffer_pool)?);

    let threads = 4u64;
    let per_thread = 500u64;

    let mut handles = Vec::new();
    for t in 0..threads {
        let index = index.clone();
        handles.push(thread::spawn(move || {
            let base = t * per_thread;
            for i in base..base + per_thread {
                index.insert(&key(i), Rid::new(1, i as u32)).unwrap();
                // Read back something already written by this thread
                assert_eq!(index.get_value(&key(i)).unwrap(), vec![Rid::new(1, i as u32)]);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    index.verify_integrity()?;
    for i in 0..threads * per_thread {
        assert_eq!(index.get_value(&key(i))?, vec![Rid::new(1, i as u32)]);
    }

    Ok(())
}
