// Export public modules
pub mod catalog;
pub mod common;
pub mod execution;
pub mod index;
pub mod storage;
pub mod transaction;

// Re-export key items for convenient access
pub use catalog::{Catalog, Column, DataType, DataValue, Schema};
pub use execution::{build_executor, Executor, ExecutorContext, PlanNode};
pub use index::hash::ExtendibleHashIndex;
pub use storage::buffer::{BufferPoolError, BufferPoolManager, PageGuard};
pub use storage::table::{TableHeap, Tuple};
pub use transaction::{
    IsolationLevel, LockManager, Transaction, TransactionError, TransactionManager,
};
