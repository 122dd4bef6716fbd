use thiserror::Error;

use crate::common::types::Rid;
use crate::storage::buffer::BufferPoolError;
use crate::storage::page::PageError;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Tuple {0} not found")]
    TupleNotFound(Rid),

    #[error("Tuple of {0} bytes cannot fit in a page")]
    TupleTooLarge(usize),

    #[error("Page error: {0}")]
    PageError(#[from] PageError),

    #[error("Buffer pool error: {0}")]
    BufferPoolError(#[from] BufferPoolError),

    #[error("Tuple serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}
