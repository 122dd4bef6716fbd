use std::sync::Arc;

use anyhow::Result;
use parking_lot::RwLock;
use tempfile::NamedTempFile;

use kestreldb::catalog::{Catalog, Column, DataType, DataValue, Schema};
use kestreldb::execution::ExecutorContext;
use kestreldb::storage::buffer::BufferPoolManager;
use kestreldb::transaction::{IsolationLevel, LockManager, Transaction, TransactionManager};

// Create a temporary database file for testing
#[allow(dead_code)]
pub fn create_temp_db_file() -> Result<(NamedTempFile, String)> {
    let file = NamedTempFile::new()?;
    let path = file.path().to_str().unwrap().to_string();
    Ok((file, path))
}

// Create a buffer pool manager backed by a temporary database
#[allow(dead_code)]
pub fn create_test_buffer_pool(pool_size: usize) -> Result<(Arc<BufferPoolManager>, NamedTempFile)> {
    let (file, path) = create_temp_db_file()?;
    let buffer_pool = Arc::new(BufferPoolManager::new(pool_size, path)?);
    Ok((buffer_pool, file))
}

// Everything an executor test needs, wired together
#[allow(dead_code)]
pub struct TestDb {
    pub buffer_pool: Arc<BufferPoolManager>,
    pub catalog: Arc<RwLock<Catalog>>,
    pub lock_manager: Arc<LockManager>,
    pub txn_manager: Arc<TransactionManager>,
    _file: NamedTempFile,
}

#[allow(dead_code)]
pub fn create_test_db(pool_size: usize) -> Result<TestDb> {
    let _ = env_logger::builder().is_test(true).try_init();

    let (buffer_pool, file) = create_test_buffer_pool(pool_size)?;
    let catalog = Arc::new(RwLock::new(Catalog::new(buffer_pool.clone())));
    let lock_manager = Arc::new(LockManager::new());
    let txn_manager = Arc::new(TransactionManager::new(
        lock_manager.clone(),
        catalog.clone(),
    ));

    Ok(TestDb {
        buffer_pool,
        catalog,
        lock_manager,
        txn_manager,
        _file: file,
    })
}

#[allow(dead_code)]
impl TestDb {
    pub fn context(&self, txn: &Arc<Transaction>) -> Arc<ExecutorContext> {
        Arc::new(ExecutorContext::new(
            txn.clone(),
            self.catalog.clone(),
            self.buffer_pool.clone(),
            self.lock_manager.clone(),
            self.txn_manager.clone(),
        ))
    }

    pub fn begin(&self, isolation_level: IsolationLevel) -> Arc<Transaction> {
        self.txn_manager.begin(isolation_level)
    }
}

// Schema used by the executor tests: accounts(id INTEGER, name TEXT, balance INTEGER)
#[allow(dead_code)]
pub fn accounts_schema() -> Schema {
    Schema::new(vec![
        Column::new("id".to_string(), DataType::Integer),
        Column::new("name".to_string(), DataType::Text),
        Column::new("balance".to_string(), DataType::Integer),
    ])
}

#[allow(dead_code)]
pub fn account_row(id: i64, name: &str, balance: i64) -> Vec<DataValue> {
    vec![
        DataValue::Integer(id),
        DataValue::Text(name.to_string()),
        DataValue::Integer(balance),
    ]
}
