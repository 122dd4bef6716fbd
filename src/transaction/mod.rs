// Transaction Module
//
// Transactions, the two-phase-locking lock manager with wound-wait
// deadlock prevention, and the transaction manager that drives
// commit/abort and undo.

pub mod error;
pub mod lock_manager;
pub mod transaction;
pub mod transaction_manager;

pub use error::TransactionError;
pub use lock_manager::{LockManager, LockMode};
pub use transaction::{
    IndexWriteRecord, IsolationLevel, TableWriteRecord, Transaction, TransactionState, WriteType,
};
pub use transaction_manager::TransactionManager;
