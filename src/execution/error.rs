use thiserror::Error;

use crate::catalog::CatalogError;
use crate::index::hash::HashIndexError;
use crate::storage::table::TableError;
use crate::transaction::TransactionError;

/// Executor failures. Transaction errors pass through untouched so the
/// driver can abort cleanly; a failing child operator is reported as
/// ChildFailed by its parent.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("table error: {0}")]
    Table(#[from] TableError),

    #[error("index error: {0}")]
    Index(#[from] HashIndexError),

    #[error("child executor failed: {0}")]
    ChildFailed(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("executor used before init: {0}")]
    NotInitialized(&'static str),

    #[error("execution error: {0}")]
    Internal(String),
}

pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// Rewrap a child operator's failure, letting transaction aborts through
/// unchanged.
pub(crate) fn wrap_child_error(error: ExecutionError) -> ExecutionError {
    match error {
        ExecutionError::Transaction(_) => error,
        other => ExecutionError::ChildFailed(other.to_string()),
    }
}
