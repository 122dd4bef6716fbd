// Table Module
//
// Heap storage for tuples: a chain of slotted pages plus the tuple codec.

pub mod error;
pub mod heap;
pub mod tuple;

pub use error::TableError;
pub use heap::{TableHeap, TableIterator};
pub use tuple::Tuple;
