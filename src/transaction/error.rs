use thiserror::Error;

use crate::common::types::TxnId;

/// Structured transaction failures. The abort variants carry the txn id so
/// the driver can unwind the right transaction.
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("transaction {0} aborted: lock requested in the shrinking phase")]
    LockOnShrinking(TxnId),

    #[error("transaction {0} aborted: shared lock requested under READ UNCOMMITTED")]
    SharedLockOnReadUncommitted(TxnId),

    #[error("transaction {0} aborted: conflicting lock upgrade on the same row")]
    UpgradeConflict(TxnId),

    #[error("transaction {0} aborted: wounded by an older transaction")]
    Deadlock(TxnId),

    #[error("transaction {0} is not active")]
    NotActive(TxnId),

    #[error("transaction {0} not found")]
    NotFound(TxnId),

    #[error("rollback of transaction {txn_id} failed: {reason}")]
    RollbackFailed { txn_id: TxnId, reason: String },
}
