use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;

mod common;
use common::create_test_db;

use kestreldb::common::types::Rid;
use kestreldb::transaction::{
    IsolationLevel, LockManager, Transaction, TransactionError, TransactionState,
};

fn rid(slot: u32) -> Rid {
    Rid::new(1, slot)
}

#[test]
fn test_shared_locks_coexist() -> Result<()> {
    let lock_manager = LockManager::new();
    let t1 = Arc::new(Transaction::new(1, IsolationLevel::RepeatableRead));
    let t2 = Arc::new(Transaction::new(2, IsolationLevel::RepeatableRead));

    lock_manager.lock_shared(&t1, rid(0))?;
    lock_manager.lock_shared(&t2, rid(0))?;
    assert!(t1.is_shared_locked(rid(0)));
    assert!(t2.is_shared_locked(rid(0)));

    // Re-request is idempotent
    lock_manager.lock_shared(&t1, rid(0))?;

    lock_manager.unlock(&t1, rid(0))?;
    lock_manager.unlock(&t2, rid(0))?;
    Ok(())
}

#[test]
fn test_shared_forbidden_under_read_uncommitted() -> Result<()> {
    let lock_manager = LockManager::new();
    let txn = Arc::new(Transaction::new(1, IsolationLevel::ReadUncommitted));

    match lock_manager.lock_shared(&txn, rid(0)) {
        Err(TransactionError::SharedLockOnReadUncommitted(1)) => {}
        other => panic!("expected SharedLockOnReadUncommitted, got {:?}", other),
    }
    assert_eq!(txn.state(), TransactionState::Aborted);
    Ok(())
}

// 2PL violation: after the first unlock under REPEATABLE READ the
// transaction is shrinking, and any further acquisition aborts it.
#[test]
fn test_lock_on_shrinking_aborts() -> Result<()> {
    let lock_manager = LockManager::new();
    let txn = Arc::new(Transaction::new(1, IsolationLevel::RepeatableRead));

    lock_manager.lock_shared(&txn, rid(1))?;
    lock_manager.unlock(&txn, rid(1))?;
    assert_eq!(txn.state(), TransactionState::Shrinking);

    match lock_manager.lock_shared(&txn, rid(2)) {
        Err(TransactionError::LockOnShrinking(1)) => {}
        other => panic!("expected LockOnShrinking, got {:?}", other),
    }
    assert_eq!(txn.state(), TransactionState::Aborted);
    Ok(())
}

#[test]
fn test_read_committed_release_keeps_growing() -> Result<()> {
    let lock_manager = LockManager::new();
    let txn = Arc::new(Transaction::new(1, IsolationLevel::ReadCommitted));

    lock_manager.lock_shared(&txn, rid(1))?;
    lock_manager.unlock(&txn, rid(1))?;
    // Early release is legal under READ COMMITTED; no shrinking phase yet
    assert_eq!(txn.state(), TransactionState::Growing);
    lock_manager.lock_shared(&txn, rid(2))?;
    Ok(())
}

#[test]
fn test_upgrade_basic() -> Result<()> {
    let lock_manager = LockManager::new();
    let txn = Arc::new(Transaction::new(1, IsolationLevel::RepeatableRead));

    lock_manager.lock_shared(&txn, rid(0))?;
    lock_manager.lock_upgrade(&txn, rid(0))?;
    assert!(!txn.is_shared_locked(rid(0)));
    assert!(txn.is_exclusive_locked(rid(0)));
    Ok(())
}

#[test]
fn test_upgrade_without_shared_aborts() -> Result<()> {
    let lock_manager = LockManager::new();
    let txn = Arc::new(Transaction::new(1, IsolationLevel::RepeatableRead));

    match lock_manager.lock_upgrade(&txn, rid(0)) {
        Err(TransactionError::UpgradeConflict(1)) => {}
        other => panic!("expected UpgradeConflict, got {:?}", other),
    }
    assert_eq!(txn.state(), TransactionState::Aborted);
    Ok(())
}

// Txn 1 holds X on R, txn 2 queues behind it (younger waits for older),
// then txn 0 arrives. The oldest wounds every younger conflicting request,
// waiter and holder alike, and proceeds; the wounded waiter wakes to a
// deadlock abort.
#[test]
fn test_wound_wait_oldest_preempts() -> Result<()> {
    let lock_manager = Arc::new(LockManager::new());
    let t_older = Arc::new(Transaction::new(0, IsolationLevel::RepeatableRead));
    let t_old = Arc::new(Transaction::new(1, IsolationLevel::RepeatableRead));
    let t_young = Arc::new(Transaction::new(2, IsolationLevel::RepeatableRead));

    lock_manager.lock_exclusive(&t_old, rid(0))?;

    let lm = lock_manager.clone();
    let young = t_young.clone();
    let waiter = thread::spawn(move || lm.lock_exclusive(&young, rid(0)));

    // A younger requester behind an older holder just waits
    thread::sleep(Duration::from_millis(50));
    assert_eq!(t_young.state(), TransactionState::Growing);
    assert_eq!(t_old.state(), TransactionState::Growing);

    // The oldest transaction preempts both
    lock_manager.lock_exclusive(&t_older, rid(0))?;
    assert!(t_older.is_exclusive_locked(rid(0)));
    assert_eq!(t_old.state(), TransactionState::Aborted);

    match waiter.join().unwrap() {
        Err(TransactionError::Deadlock(2)) => {}
        other => panic!("expected Deadlock(2), got {:?}", other),
    }
    assert_eq!(t_young.state(), TransactionState::Aborted);

    Ok(())
}

// An older transaction already waiting is never wounded; the younger
// requester queues behind it and acquires only after the older unlocks.
#[test]
fn test_older_waiter_proceeds_first() -> Result<()> {
    let lock_manager = Arc::new(LockManager::new());
    let t_holder = Arc::new(Transaction::new(5, IsolationLevel::RepeatableRead));
    let t_old = Arc::new(Transaction::new(1, IsolationLevel::RepeatableRead));

    lock_manager.lock_exclusive(&t_holder, rid(0))?;

    let lm = lock_manager.clone();
    let old = t_old.clone();
    let old_waiter = thread::spawn(move || lm.lock_exclusive(&old, rid(0)));

    thread::sleep(Duration::from_millis(50));
    // The older transaction waits; the younger holder was wounded instead
    assert_eq!(t_holder.state(), TransactionState::Aborted);

    lock_manager.release_all(&t_holder);
    old_waiter.join().unwrap()?;
    assert!(t_old.is_exclusive_locked(rid(0)));

    Ok(())
}

// Full scenario through the transaction manager: a wounded transaction's
// abort rolls back and releases its locks, unblocking the older one.
#[test]
fn test_wound_wait_with_transaction_manager() -> Result<()> {
    let db = create_test_db(16)?;

    let t_old = db.begin(IsolationLevel::RepeatableRead); // id 1
    let t_young = db.begin(IsolationLevel::RepeatableRead); // id 2

    db.lock_manager.lock_exclusive(&t_young, rid(7))?;

    let lm = db.lock_manager.clone();
    let old = t_old.clone();
    let old_thread = thread::spawn(move || lm.lock_exclusive(&old, rid(7)));

    thread::sleep(Duration::from_millis(50));
    assert_eq!(t_young.state(), TransactionState::Aborted);

    // The victim notices on its next lock attempt and aborts through the
    // transaction manager, releasing rid 7
    match db.lock_manager.lock_exclusive(&t_young, rid(8)) {
        Err(TransactionError::NotActive(2)) => {}
        other => panic!("expected NotActive(2), got {:?}", other),
    }
    db.txn_manager.abort(&t_young)?;

    old_thread.join().unwrap()?;
    assert!(t_old.is_exclusive_locked(rid(7)));
    db.txn_manager.commit(&t_old)?;

    Ok(())
}

#[test]
fn test_unlock_releases_waiters() -> Result<()> {
    let lock_manager = Arc::new(LockManager::new());
    let t1 = Arc::new(Transaction::new(1, IsolationLevel::RepeatableRead));
    let t2 = Arc::new(Transaction::new(2, IsolationLevel::RepeatableRead));

    lock_manager.lock_exclusive(&t1, rid(0))?;

    let lm = lock_manager.clone();
    let second = t2.clone();
    let waiter = thread::spawn(move || lm.lock_shared(&second, rid(0)));

    thread::sleep(Duration::from_millis(50));
    // Commit-time release: terminal state first, then unlock
    t1.set_state(TransactionState::Committed);
    lock_manager.release_all(&t1);

    waiter.join().unwrap()?;
    assert!(t2.is_shared_locked(rid(0)));
    Ok(())
}
