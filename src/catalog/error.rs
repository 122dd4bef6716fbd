use thiserror::Error;

use crate::index::hash::HashIndexError;
use crate::storage::table::TableError;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Table {0} not found")]
    TableNotFound(String),

    #[error("Table oid {0} not found")]
    TableOidNotFound(u32),

    #[error("Table {0} already exists")]
    DuplicateTable(String),

    #[error("Index {0} not found")]
    IndexNotFound(String),

    #[error("Index {0} already exists")]
    DuplicateIndex(String),

    #[error("Invalid key column {column} for table {table}")]
    InvalidKeyColumn { table: String, column: usize },

    #[error("Table error: {0}")]
    TableError(#[from] TableError),

    #[error("Index error: {0}")]
    IndexError(#[from] HashIndexError),

    #[error("Key serialization error: {0}")]
    KeySerialization(#[from] bincode::Error),
}
