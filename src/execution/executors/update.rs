// Update Executor
//
// Pulls old tuples from its child, derives the updated tuple from the
// plan's per-column Set/Add attributes, exclusively locks the row
// (upgrading under REPEATABLE READ), overwrites the heap row in place,
// and swaps the row's key in every secondary index: old key out, new key
// in. Produces no output tuples.

use std::sync::Arc;

use crate::catalog::DataValue;
use crate::common::types::Rid;
use crate::execution::context::ExecutorContext;
use crate::execution::error::{wrap_child_error, ExecutionError, ExecutionResult};
use crate::execution::plan::{UpdateAttr, UpdatePlan};
use crate::execution::Executor;
use crate::storage::table::Tuple;
use crate::transaction::{IndexWriteRecord, IsolationLevel, TableWriteRecord, WriteType};

pub struct UpdateExecutor {
    ctx: Arc<ExecutorContext>,
    plan: UpdatePlan,
    child: Box<dyn Executor>,
    done: bool,
}

impl UpdateExecutor {
    pub fn new(ctx: Arc<ExecutorContext>, plan: UpdatePlan, child: Box<dyn Executor>) -> Self {
        Self {
            ctx,
            plan,
            child,
            done: false,
        }
    }

    /// Apply the plan's update attributes to a source tuple
    fn generate_updated_tuple(&self, src: &Tuple) -> ExecutionResult<Tuple> {
        let mut values = src.values().to_vec();
        for (&column, attr) in &self.plan.update_attrs {
            let slot = values.get_mut(column).ok_or_else(|| {
                ExecutionError::Internal(format!("update column {} out of range", column))
            })?;
            match attr {
                UpdateAttr::Set(value) => *slot = value.clone(),
                UpdateAttr::Add(delta) => {
                    *slot = slot.add(&DataValue::Integer(*delta)).ok_or_else(|| {
                        ExecutionError::Type(format!(
                            "cannot add {} to non-numeric column {}",
                            delta, column
                        ))
                    })?;
                }
            }
        }
        Ok(Tuple::new(values))
    }
}

impl Executor for UpdateExecutor {
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
            let new_tuple = self.generate_updated_tuple(&old_tuple)?;

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

            table.heap.update_tuple(rid, &new_tuple.to_bytes()?)?;
            txn.append_table_write(TableWriteRecord {
                rid,
                write_type: WriteType::Update,
                table_oid: table.oid,
                old_tuple: Some(old_tuple.clone()),
            });

            for index_info in &indexes {
                let old_key = index_info.key_from_tuple(&old_tuple)?;
                let new_key = index_info.key_from_tuple(&new_tuple)?;
                index_info.index.remove(&old_key, rid)?;
                index_info.index.insert(&new_key, rid)?;
                txn.append_index_write(IndexWriteRecord {
                    rid,
                    table_oid: table.oid,
                    index_oid: index_info.oid,
                    write_type: WriteType::Update,
                    tuple: new_tuple.clone(),
                    old_tuple: Some(old_tuple.clone()),
                });
            }
        }

        Ok(None)
    }
}
