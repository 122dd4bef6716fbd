// Sequential Scan Executor
//
// Walks a table heap tuple by tuple. Outside READ UNCOMMITTED every
// visited row is shared-locked before it is read; READ COMMITTED releases
// the lock again before advancing, REPEATABLE READ keeps it to commit.

use std::sync::Arc;

use crate::catalog::DataValue;
use crate::common::types::Rid;
use crate::execution::context::ExecutorContext;
use crate::execution::error::{ExecutionError, ExecutionResult};
use crate::execution::expression::value_as_bool;
use crate::execution::plan::SeqScanPlan;
use crate::execution::Executor;
use crate::storage::table::{TableIterator, Tuple};
use crate::transaction::IsolationLevel;

pub struct SeqScanExecutor {
    ctx: Arc<ExecutorContext>,
    plan: SeqScanPlan,
    iter: Option<TableIterator>,
}

impl SeqScanExecutor {
    pub fn new(ctx: Arc<ExecutorContext>, plan: SeqScanPlan) -> Self {
        Self {
            ctx,
            plan,
            iter: None,
        }
    }

    fn project(&self, tuple: &Tuple, rid: Rid) -> Tuple {
        let values: Vec<DataValue> = self
            .plan
            .output_columns
            .iter()
            .map(|&i| tuple.value(i).cloned().unwrap_or(DataValue::Null))
            .collect();
        Tuple::with_rid(values, rid)
    }
}

impl Executor for SeqScanExecutor {
    fn init(&mut self) -> ExecutionResult<()> {
        let table = self.ctx.catalog().read().get_table(self.plan.table_oid)?;
        self.iter = Some(table.heap.iter());
        Ok(())
    }

    fn next(&mut self) -> ExecutionResult<Option<(Tuple, Rid)>> {
        loop {
            let entry = self
                .iter
                .as_mut()
                .ok_or(ExecutionError::NotInitialized("SeqScanExecutor"))?
                .next()?;
            let (rid, bytes) = match entry {
                Some(entry) => entry,
                None => return Ok(None),
            };
            let tuple = Tuple::from_bytes(&bytes)?;

            let txn = self.ctx.transaction();
            let lock_manager = self.ctx.lock_manager();

            if txn.isolation_level() != IsolationLevel::ReadUncommitted
                && !txn.is_shared_locked(rid)
                && !txn.is_exclusive_locked(rid)
            {
                if let Err(e) = lock_manager.lock_shared(txn, rid) {
                    self.ctx.transaction_manager().abort(txn)?;
                    return Err(e.into());
                }
            }

            let passes = match &self.plan.predicate {
                Some(predicate) => value_as_bool(&predicate.evaluate(&tuple)?),
                None => true,
            };

            // READ COMMITTED gives shared locks back before moving on,
            // whether or not the row qualified
            if txn.isolation_level() == IsolationLevel::ReadCommitted
                && txn.is_shared_locked(rid)
            {
                lock_manager.unlock(txn, rid)?;
            }

            if passes {
                return Ok(Some((self.project(&tuple, rid), rid)));
            }
        }
    }
}
