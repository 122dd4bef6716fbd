// Delete Executor
//
// Pulls doomed tuples from its child, takes an exclusive lock on each (an
// upgrade under REPEATABLE READ, where the scan below already holds the
// shared lock), tombstones the heap row, removes the row from every
// secondary index, and records undo information. Produces no output
// tuples.

use std::sync::Arc;

use crate::common::types::Rid;
use crate::execution::context::ExecutorContext;
use crate::execution::error::{wrap_child_error, ExecutionResult};
use crate::execution::plan::DeletePlan;
use crate::execution::Executor;
use crate::storage::table::Tuple;
use crate::transaction::{IndexWriteRecord, IsolationLevel, TableWriteRecord, WriteType};

pub struct DeleteExecutor {
    ctx: Arc<ExecutorContext>,
    plan: DeletePlan,
    child: Box<dyn Executor>,
    done: bool,
}

impl DeleteExecutor {
    pub fn new(ctx: Arc<ExecutorContext>, plan: DeletePlan, child: Box<dyn Executor>) -> Self {
        Self {
            ctx,
            plan,
            child,
            done: false,
        }
    }
}

impl Executor for DeleteExecutor {
    fn init(&mut self) -> ExecutionResult<()> {
        self.child.init().map_err(wrap_child_error)?;
        self.done = false;
        Ok(())
    }

    fn next(&mut self) -> ExecutionResult<Option<(Tuple, Rid)>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;

        let (table, indexes) = {
            let catalog = self.ctx.catalog().read();
            let table = catalog.get_table(self.plan.table_oid)?;
            let indexes = catalog.get_table_indexes(&table.name);
            (table, indexes)
        };

        loop {
            let (old_tuple, rid) = match self.child.next().map_err(wrap_child_error)? {
                Some(entry) => entry,
                None => break,
            };

            let txn = self.ctx.transaction();
            let lock_result = if txn.isolation_level() == IsolationLevel::RepeatableRead {
                self.ctx.lock_manager().lock_upgrade(txn, rid)
            } else {
                self.ctx.lock_manager().lock_exclusive(txn, rid)
            };
            if let Err(e) = lock_result {
                self.ctx.transaction_manager().abort(txn)?;
                return Err(e.into());
            }

            table.heap.mark_delete(rid)?;
            txn.append_table_write(TableWriteRecord {
                rid,
                write_type: WriteType::Delete,
                table_oid: table.oid,
                old_tuple: Some(old_tuple.clone()),
            });

            for index_info in &indexes {
                let key = index_info.key_from_tuple(&old_tuple)?;
                index_info.index.remove(&key, rid)?;
                txn.append_index_write(IndexWriteRecord {
                    rid,
                    table_oid: table.oid,
                    index_oid: index_info.oid,
                    write_type: WriteType::Delete,
                    tuple: old_tuple.clone(),
                    old_tuple: None,
                });
            }
        }

        Ok(None)
    }
}
