use thiserror::Error;

use crate::storage::buffer::BufferPoolError;

#[derive(Error, Debug)]
pub enum HashIndexError {
    #[error("Bucket is at maximum depth; the directory cannot grow further")]
    DirectoryFull,

    #[error("Directory invariant violated: {0}")]
    CorruptDirectory(String),

    #[error("Buffer pool error: {0}")]
    BufferPoolError(#[from] BufferPoolError),
}
