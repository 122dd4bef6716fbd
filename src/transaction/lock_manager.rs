// Lock Manager
//
// Row-granularity shared/exclusive locks under two-phase locking, with
// wound-wait deadlock prevention: an older transaction (smaller id) never
// waits behind a younger one; it aborts the youngster instead. Requests on
// one rid queue FIFO and block on the queue's condition variable.
//
// The single latch covers the whole lock table; waiters release it only
// inside the condition-variable wait, re-checking their grant predicate
// and their own state after every wakeup.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::common::types::{Rid, TxnId};
use crate::transaction::error::TransactionError;
use crate::transaction::transaction::{IsolationLevel, Transaction, TransactionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

struct LockRequest {
    txn_id: TxnId,
    mode: LockMode,
    granted: bool,
}

struct LockRequestQueue {
    requests: VecDeque<LockRequest>,
    cv: Arc<Condvar>,
    /// Transaction currently upgrading S -> X on this rid, if any. A queued
    /// upgrade blocks every other upgrade attempt.
    upgrading: Option<TxnId>,
}

impl LockRequestQueue {
    fn new() -> Self {
        Self {
            requests: VecDeque::new(),
            cv: Arc::new(Condvar::new()),
            upgrading: None,
        }
    }
}

#[derive(Default)]
struct LockTable {
    queues: HashMap<Rid, LockRequestQueue>,
    txns: HashMap<TxnId, Arc<Transaction>>,
}

impl LockTable {
    fn is_aborted(&self, txn_id: TxnId) -> bool {
        self.txns
            .get(&txn_id)
            .map(|t| t.state() == TransactionState::Aborted)
            .unwrap_or(true)
    }

    /// Wound every conflicting younger request ahead of `txn_id` in the
    /// queue. Returns true when at least one victim was aborted.
    fn wound_conflicting(&self, rid: Rid, txn_id: TxnId, conflicts_with: LockMode) -> bool {
        let queue = match self.queues.get(&rid) {
            Some(queue) => queue,
            None => return false,
        };

        let mut wounded = false;
        for req in &queue.requests {
            if req.txn_id == txn_id {
                break;
            }
            let conflicting = match conflicts_with {
                // A shared request only conflicts with exclusive holders
                LockMode::Shared => req.mode == LockMode::Exclusive,
                // An exclusive request conflicts with everything
                LockMode::Exclusive => true,
            };
            if conflicting && req.txn_id > txn_id {
                if let Some(victim) = self.txns.get(&req.txn_id) {
                    if victim.state() != TransactionState::Aborted {
                        log::debug!("txn {} wounds txn {} on rid {}", txn_id, req.txn_id, rid);
                        victim.set_state(TransactionState::Aborted);
                        wounded = true;
                    }
                }
            }
        }
        wounded
    }

    /// Upgrade variant of the wound: a younger transaction granted *after*
    /// the upgrader's original shared request still blocks the upgrade, so
    /// the scan covers the whole queue, not just the prefix.
    fn wound_all_younger(&self, rid: Rid, txn_id: TxnId) -> bool {
        let queue = match self.queues.get(&rid) {
            Some(queue) => queue,
            None => return false,
        };

        let mut wounded = false;
        for req in &queue.requests {
            if req.txn_id <= txn_id {
                continue;
            }
            if let Some(victim) = self.txns.get(&req.txn_id) {
                if victim.state() != TransactionState::Aborted {
                    log::debug!("txn {} wounds txn {} on rid {}", txn_id, req.txn_id, rid);
                    victim.set_state(TransactionState::Aborted);
                    wounded = true;
                }
            }
        }
        wounded
    }

    /// A shared request is grantable when no live exclusive request
    /// precedes it.
    fn shared_grantable(&self, rid: Rid, txn_id: TxnId) -> bool {
        let queue = match self.queues.get(&rid) {
            Some(queue) => queue,
            None => return false,
        };
        for req in &queue.requests {
            if req.txn_id == txn_id {
                return true;
            }
            if req.mode == LockMode::Exclusive && !self.is_aborted(req.txn_id) {
                return false;
            }
        }
        false
    }

    /// An exclusive request is grantable when it is the earliest live
    /// request in the queue.
    fn exclusive_grantable(&self, rid: Rid, txn_id: TxnId) -> bool {
        let queue = match self.queues.get(&rid) {
            Some(queue) => queue,
            None => return false,
        };
        for req in &queue.requests {
            if req.txn_id == txn_id {
                return true;
            }
            if !self.is_aborted(req.txn_id) {
                return false;
            }
        }
        false
    }

    /// An upgrade is grantable when no other live granted request remains
    /// on the queue.
    fn upgrade_grantable(&self, rid: Rid, txn_id: TxnId) -> bool {
        let queue = match self.queues.get(&rid) {
            Some(queue) => queue,
            None => return false,
        };
        for req in &queue.requests {
            if req.txn_id == txn_id {
                continue;
            }
            if req.granted && !self.is_aborted(req.txn_id) {
                return false;
            }
        }
        true
    }

    /// Wake every waiter in the lock table. Used after wounding: the victim
    /// may be parked on any queue, not just the one the wound happened on.
    fn notify_all(&self) {
        for queue in self.queues.values() {
            queue.cv.notify_all();
        }
    }

    fn set_granted(&mut self, rid: Rid, txn_id: TxnId) {
        if let Some(queue) = self.queues.get_mut(&rid) {
            if let Some(req) = queue.requests.iter_mut().find(|r| r.txn_id == txn_id) {
                req.granted = true;
            }
        }
    }

    /// Drop a transaction's request, waking the queue and discarding it
    /// once nothing references the rid anymore.
    fn remove_request(&mut self, rid: Rid, txn_id: TxnId) {
        if let Some(queue) = self.queues.get_mut(&rid) {
            if let Some(pos) = queue.requests.iter().position(|r| r.txn_id == txn_id) {
                queue.requests.remove(pos);
            }
            if queue.upgrading == Some(txn_id) {
                queue.upgrading = None;
            }
            queue.cv.notify_all();
            if queue.requests.is_empty() && queue.upgrading.is_none() {
                self.queues.remove(&rid);
            }
        }
    }
}

#[derive(Default)]
pub struct LockManager {
    latch: Mutex<LockTable>,
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            latch: Mutex::new(LockTable::default()),
        }
    }

    /// Acquire a shared lock on a rid, blocking until compatible.
    pub fn lock_shared(&self, txn: &Arc<Transaction>, rid: Rid) -> Result<(), TransactionError> {
        let mut table = self.latch.lock();
        let txn_id = txn.id();

        match txn.state() {
            TransactionState::Aborted | TransactionState::Committed => {
                return Err(TransactionError::NotActive(txn_id));
            }
            TransactionState::Shrinking => {
                txn.set_state(TransactionState::Aborted);
                return Err(TransactionError::LockOnShrinking(txn_id));
            }
            TransactionState::Growing => {}
        }
        if txn.isolation_level() == IsolationLevel::ReadUncommitted {
            txn.set_state(TransactionState::Aborted);
            return Err(TransactionError::SharedLockOnReadUncommitted(txn_id));
        }
        if txn.is_shared_locked(rid) || txn.is_exclusive_locked(rid) {
            return Ok(());
        }

        table.txns.insert(txn_id, txn.clone());
        let cv = {
            let queue = table.queues.entry(rid).or_insert_with(LockRequestQueue::new);
            queue.requests.push_back(LockRequest {
                txn_id,
                mode: LockMode::Shared,
                granted: false,
            });
            queue.cv.clone()
        };
        txn.add_shared_lock(rid);

        if table.wound_conflicting(rid, txn_id, LockMode::Shared) {
            table.notify_all();
        }

        loop {
            if table.shared_grantable(rid, txn_id) {
                table.set_granted(rid, txn_id);
                return Ok(());
            }
            cv.wait(&mut table);
            if txn.state() == TransactionState::Aborted {
                table.remove_request(rid, txn_id);
                txn.remove_shared_lock(rid);
                return Err(TransactionError::Deadlock(txn_id));
            }
        }
    }

    /// Acquire an exclusive lock on a rid, blocking until it is the sole
    /// holder.
    pub fn lock_exclusive(
        &self,
        txn: &Arc<Transaction>,
        rid: Rid,
    ) -> Result<(), TransactionError> {
        let mut table = self.latch.lock();
        let txn_id = txn.id();

        match txn.state() {
            TransactionState::Aborted | TransactionState::Committed => {
                return Err(TransactionError::NotActive(txn_id));
            }
            TransactionState::Shrinking => {
                txn.set_state(TransactionState::Aborted);
                return Err(TransactionError::LockOnShrinking(txn_id));
            }
            TransactionState::Growing => {}
        }
        if txn.is_exclusive_locked(rid) {
            return Ok(());
        }

        table.txns.insert(txn_id, txn.clone());
        let cv = {
            let queue = table.queues.entry(rid).or_insert_with(LockRequestQueue::new);
            queue.requests.push_back(LockRequest {
                txn_id,
                mode: LockMode::Exclusive,
                granted: false,
            });
            queue.cv.clone()
        };
        txn.add_exclusive_lock(rid);

        if table.wound_conflicting(rid, txn_id, LockMode::Exclusive) {
            table.notify_all();
        }

        loop {
            if table.exclusive_grantable(rid, txn_id) {
                table.set_granted(rid, txn_id);
                return Ok(());
            }
            cv.wait(&mut table);
            if txn.state() == TransactionState::Aborted {
                table.remove_request(rid, txn_id);
                txn.remove_exclusive_lock(rid);
                return Err(TransactionError::Deadlock(txn_id));
            }
        }
    }

    /// Atomically trade a held shared lock for an exclusive one. Only one
    /// upgrade may be pending per rid; a second upgrader aborts.
    pub fn lock_upgrade(&self, txn: &Arc<Transaction>, rid: Rid) -> Result<(), TransactionError> {
        let mut table = self.latch.lock();
        let txn_id = txn.id();

        match txn.state() {
            TransactionState::Aborted | TransactionState::Committed => {
                return Err(TransactionError::NotActive(txn_id));
            }
            TransactionState::Shrinking => {
                txn.set_state(TransactionState::Aborted);
                return Err(TransactionError::LockOnShrinking(txn_id));
            }
            TransactionState::Growing => {}
        }
        if txn.is_exclusive_locked(rid) {
            return Ok(());
        }
        if !txn.is_shared_locked(rid) {
            txn.set_state(TransactionState::Aborted);
            return Err(TransactionError::UpgradeConflict(txn_id));
        }

        let cv = {
            let queue = match table.queues.get_mut(&rid) {
                Some(queue) => queue,
                None => {
                    // Shared set says locked but the queue is gone; treat as
                    // a protocol violation
                    txn.set_state(TransactionState::Aborted);
                    return Err(TransactionError::UpgradeConflict(txn_id));
                }
            };
            if queue.upgrading.is_some() {
                txn.set_state(TransactionState::Aborted);
                return Err(TransactionError::UpgradeConflict(txn_id));
            }
            queue.upgrading = Some(txn_id);
            if let Some(req) = queue.requests.iter_mut().find(|r| r.txn_id == txn_id) {
                req.mode = LockMode::Exclusive;
                req.granted = false;
            }
            queue.cv.clone()
        };

        if table.wound_all_younger(rid, txn_id) {
            table.notify_all();
        }

        loop {
            if table.upgrade_grantable(rid, txn_id) {
                table.set_granted(rid, txn_id);
                if let Some(queue) = table.queues.get_mut(&rid) {
                    queue.upgrading = None;
                }
                txn.remove_shared_lock(rid);
                txn.add_exclusive_lock(rid);
                return Ok(());
            }
            cv.wait(&mut table);
            if txn.state() == TransactionState::Aborted {
                table.remove_request(rid, txn_id);
                txn.remove_shared_lock(rid);
                return Err(TransactionError::Deadlock(txn_id));
            }
        }
    }

    /// Release a lock. Under REPEATABLE READ the first unlock ends the
    /// growing phase; weaker levels may release early without shrinking.
    pub fn unlock(&self, txn: &Arc<Transaction>, rid: Rid) -> Result<(), TransactionError> {
        let mut table = self.latch.lock();
        let txn_id = txn.id();

        table.remove_request(rid, txn_id);
        txn.remove_shared_lock(rid);
        txn.remove_exclusive_lock(rid);

        if txn.state() == TransactionState::Growing
            && txn.isolation_level() == IsolationLevel::RepeatableRead
        {
            txn.set_state(TransactionState::Shrinking);
        }

        Ok(())
    }

    /// Release every lock a transaction still holds, used at commit/abort
    /// when the state is already terminal.
    pub fn release_all(&self, txn: &Arc<Transaction>) {
        let mut table = self.latch.lock();
        let txn_id = txn.id();

        for rid in txn.locked_rids() {
            table.remove_request(rid, txn_id);
            txn.remove_shared_lock(rid);
            txn.remove_exclusive_lock(rid);
        }
        table.txns.remove(&txn_id);
    }
}
