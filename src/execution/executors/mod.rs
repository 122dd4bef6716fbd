// Executor Implementations
//
// One module per operator. Scans and mutations talk to the heap, the lock
// manager and the secondary indexes; joins, aggregation and distinct are
// pure consumers of their children.

pub mod aggregation;
pub mod delete;
pub mod distinct;
pub mod hash_join;
pub mod insert;
pub mod nested_loop_join;
pub mod seq_scan;
pub mod update;

pub use aggregation::AggregationExecutor;
pub use delete::DeleteExecutor;
pub use distinct::DistinctExecutor;
pub use hash_join::HashJoinExecutor;
pub use insert::InsertExecutor;
pub use nested_loop_join::NestedLoopJoinExecutor;
pub use seq_scan::SeqScanExecutor;
pub use update::UpdateExecutor;
