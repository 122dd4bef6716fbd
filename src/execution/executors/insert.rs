// Insert Executor
//
// Inserts either the plan's literal value vectors or everything its child
// produces. Each new row is exclusively locked, every secondary index is
// updated, and undo records land in the transaction's write sets. Produces
// no output tuples.

use std::sync::Arc;

use crate::catalog::catalog::{IndexInfo, TableInfo};
use crate::common::types::Rid;
use crate::execution::context::ExecutorContext;
use crate::execution::error::{wrap_child_error, ExecutionError, ExecutionResult};
use crate::execution::plan::{InsertPlan, InsertSource};
use crate::execution::Executor;
use crate::storage::table::Tuple;
use crate::transaction::{IndexWriteRecord, TableWriteRecord, WriteType};

pub struct InsertExecutor {
    ctx: Arc<ExecutorContext>,
    plan: InsertPlan,
    child: Option<Box<dyn Executor>>,
    done: bool,
}

impl InsertExecutor {
    pub fn new(
        ctx: Arc<ExecutorContext>,
        plan: InsertPlan,
        child: Option<Box<dyn Executor>>,
    ) -> Self {
        Self {
            ctx,
            plan,
            child,
            done: false,
        }
    }

    fn insert_one(
        ctx: &Arc<ExecutorContext>,
        tuple: &Tuple,
        table: &Arc<TableInfo>,
        indexes: &[Arc<IndexInfo>],
    ) -> ExecutionResult<()> {
        let txn = ctx.transaction();

        let bytes = tuple.to_bytes()?;
        let rid = table.heap.insert_tuple(&bytes)?;

        if let Err(e) = ctx.lock_manager().lock_exclusive(txn, rid) {
            ctx.transaction_manager().abort(txn)?;
            return Err(e.into());
        }

        txn.append_table_write(TableWriteRecord {
            rid,
            write_type: WriteType::Insert,
            table_oid: table.oid,
            old_tuple: None,
        });

        for index_info in indexes {
            let key = index_info.key_from_tuple(tuple)?;
            index_info.index.insert(&key, rid)?;
            txn.append_index_write(IndexWriteRecord {
                rid,
                table_oid: table.oid,
                index_oid: index_info.oid,
                write_type: WriteType::Insert,
                tuple: tuple.clone(),
                old_tuple: None,
            });
        }
        Ok(())
    }
}

impl Executor for InsertExecutor {
    fn init(&mut self) -> ExecutionResult<()> {
        if let Some(child) = self.child.as_mut() {
            child.init().map_err(wrap_child_error)?;
        }
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

        match &self.plan.source {
            InsertSource::Raw(rows) => {
                for values in rows {
                    Self::insert_one(&self.ctx, &Tuple::new(values.clone()), &table, &indexes)?;
                }
            }
            InsertSource::Child(_) => {
                let child = self
                    .child
                    .as_mut()
                    .ok_or(ExecutionError::NotInitialized("InsertExecutor"))?;
                loop {
                    let tuple = match child.next().map_err(wrap_child_error)? {
                        Some((tuple, _rid)) => tuple,
                        None => break,
                    };
                    Self::insert_one(&self.ctx, &tuple, &table, &indexes)?;
                }
            }
        }

        Ok(None)
    }
}
