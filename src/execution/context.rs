// Executor Context
//
// Everything an executor needs to run, threaded through the whole tree:
// the owning transaction, the catalog, the buffer pool, the lock manager
// and the transaction manager. No process-wide state.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::catalog::Catalog;
use crate::storage::buffer::BufferPoolManager;
use crate::transaction::{LockManager, Transaction, TransactionManager};

pub struct ExecutorContext {
    transaction: Arc<Transaction>,
    catalog: Arc<RwLock<Catalog>>,
    buffer_pool: Arc<BufferPoolManager>,
    lock_manager: Arc<LockManager>,
    transaction_manager: Arc<TransactionManager>,
}

impl ExecutorContext {
    pub fn new(
        transaction: Arc<Transaction>,
        catalog: Arc<RwLock<Catalog>>,
        buffer_pool: Arc<BufferPoolManager>,
        lock_manager: Arc<LockManager>,
        transaction_manager: Arc<TransactionManager>,
    ) -> Self {
        Self {
            transaction,
            catalog,
            buffer_pool,
            lock_manager,
            transaction_manager,
        }
    }

    pub fn transaction(&self) -> &Arc<Transaction> {
        &self.transaction
    }

    pub fn catalog(&self) -> &Arc<RwLock<Catalog>> {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPoolManager> {
        &self.buffer_pool
    }

    pub fn lock_manager(&self) -> &Arc<LockManager> {
        &self.lock_manager
    }

    pub fn transaction_manager(&self) -> &Arc<TransactionManager> {
        &self.transaction_manager
    }
}
