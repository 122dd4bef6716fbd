// Index Module
//
// Secondary indexes layered on the buffer pool.

pub mod hash;

pub use hash::{ExtendibleHashIndex, HashIndexError};
