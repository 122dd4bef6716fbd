// Transaction Manager
//
// Creates and tracks transactions, and drives the commit and abort paths:
// commit finalizes pending deletes and releases locks; abort walks the
// table and index write sets in reverse, undoing every mutation, before
// releasing locks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::catalog::Catalog;
use crate::common::types::TxnId;
use crate::transaction::error::TransactionError;
use crate::transaction::lock_manager::LockManager;
use crate::transaction::transaction::{
    IsolationLevel, Transaction, TransactionState, WriteType,
};

pub struct TransactionManager {
    next_txn_id: AtomicU32,
    lock_manager: Arc<LockManager>,
    catalog: Arc<RwLock<Catalog>>,
    active: Mutex<HashMap<TxnId, Arc<Transaction>>>,
}

impl TransactionManager {
    pub fn new(lock_manager: Arc<LockManager>, catalog: Arc<RwLock<Catalog>>) -> Self {
        Self {
            next_txn_id: AtomicU32::new(1),
            lock_manager,
            catalog,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Begin a new transaction at the given isolation level
    pub fn begin(&self, isolation_level: IsolationLevel) -> Arc<Transaction> {
        let txn_id = self.next_txn_id.fetch_add(1, Ordering::SeqCst);
        let txn = Arc::new(Transaction::new(txn_id, isolation_level));
        self.active.lock().insert(txn_id, txn.clone());
        txn
    }

    pub fn get_transaction(&self, txn_id: TxnId) -> Option<Arc<Transaction>> {
        self.active.lock().get(&txn_id).cloned()
    }

    /// Commit: tombstoned deletes become permanent, the undo logs are
    /// discarded, and every lock is released.
    pub fn commit(&self, txn: &Arc<Transaction>) -> Result<(), TransactionError> {
        if txn.state() == TransactionState::Committed || txn.state() == TransactionState::Aborted {
            return Err(TransactionError::NotActive(txn.id()));
        }
        txn.set_state(TransactionState::Committed);

        let catalog = self.catalog.read();
        for record in txn.take_table_write_set() {
            if record.write_type == WriteType::Delete {
                let table = catalog
                    .get_table(record.table_oid)
                    .map_err(|e| self.rollback_error(txn.id(), e))?;
                table
                    .heap
                    .apply_delete(record.rid)
                    .map_err(|e| self.rollback_error(txn.id(), e))?;
            }
        }
        txn.take_index_write_set();
        drop(catalog);

        self.lock_manager.release_all(txn);
        self.active.lock().remove(&txn.id());
        Ok(())
    }

    /// Abort: undo heap and index mutations in reverse order, then release
    /// every lock.
    pub fn abort(&self, txn: &Arc<Transaction>) -> Result<(), TransactionError> {
        if txn.state() == TransactionState::Committed {
            return Err(TransactionError::NotActive(txn.id()));
        }
        txn.set_state(TransactionState::Aborted);
        log::debug!("aborting txn {}", txn.id());

        let catalog = self.catalog.read();

        let mut table_writes = txn.take_table_write_set();
        table_writes.reverse();
        for record in table_writes {
            let table = catalog
                .get_table(record.table_oid)
                .map_err(|e| self.rollback_error(txn.id(), e))?;
            match record.write_type {
                WriteType::Insert => {
                    table
                        .heap
                        .apply_delete(record.rid)
                        .map_err(|e| self.rollback_error(txn.id(), e))?;
                }
                WriteType::Delete => {
                    table
                        .heap
                        .rollback_delete(record.rid)
                        .map_err(|e| self.rollback_error(txn.id(), e))?;
                }
                WriteType::Update => {
                    let old_tuple = record.old_tuple.ok_or_else(|| {
                        TransactionError::RollbackFailed {
                            txn_id: txn.id(),
                            reason: "update record without a pre-image".to_string(),
                        }
                    })?;
                    let bytes = old_tuple
                        .to_bytes()
                        .map_err(|e| self.rollback_error(txn.id(), e))?;
                    table
                        .heap
                        .update_tuple(record.rid, &bytes)
                        .map_err(|e| self.rollback_error(txn.id(), e))?;
                }
            }
        }

        let mut index_writes = txn.take_index_write_set();
        index_writes.reverse();
        for record in index_writes {
            let index_info = catalog
                .get_index(record.index_oid)
                .map_err(|e| self.rollback_error(txn.id(), e))?;
            match record.write_type {
                WriteType::Insert => {
                    let key = index_info
                        .key_from_tuple(&record.tuple)
                        .map_err(|e| self.rollback_error(txn.id(), e))?;
                    index_info
                        .index
                        .remove(&key, record.rid)
                        .map_err(|e| self.rollback_error(txn.id(), e))?;
                }
                WriteType::Delete => {
                    let key = index_info
                        .key_from_tuple(&record.tuple)
                        .map_err(|e| self.rollback_error(txn.id(), e))?;
                    index_info
                        .index
                        .insert(&key, record.rid)
                        .map_err(|e| self.rollback_error(txn.id(), e))?;
                }
                WriteType::Update => {
                    let old_tuple = record.old_tuple.as_ref().ok_or_else(|| {
                        TransactionError::RollbackFailed {
                            txn_id: txn.id(),
                            reason: "index update record without a pre-image".to_string(),
                        }
                    })?;
                    let new_key = index_info
                        .key_from_tuple(&record.tuple)
                        .map_err(|e| self.rollback_error(txn.id(), e))?;
                    let old_key = index_info
                        .key_from_tuple(old_tuple)
                        .map_err(|e| self.rollback_error(txn.id(), e))?;
                    index_info
                        .index
                        .remove(&new_key, record.rid)
                        .map_err(|e| self.rollback_error(txn.id(), e))?;
                    index_info
                        .index
                        .insert(&old_key, record.rid)
                        .map_err(|e| self.rollback_error(txn.id(), e))?;
                }
            }
        }
        drop(catalog);

        self.lock_manager.release_all(txn);
        self.active.lock().remove(&txn.id());
        Ok(())
    }

    fn rollback_error(&self, txn_id: TxnId, source: impl std::fmt::Display) -> TransactionError {
        TransactionError::RollbackFailed {
            txn_id,
            reason: source.to_string(),
        }
    }
}
