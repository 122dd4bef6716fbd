// Nested Loop Join Executor
//
// Works for any join condition at O(n*m) cost. The whole result is
// materialized in init: for every outer tuple the inner child is
// re-initialized and drained; next() just streams the buffer.

use crate::common::types::Rid;
use crate::execution::error::{wrap_child_error, ExecutionResult};
use crate::execution::expression::value_as_bool;
use crate::execution::plan::{JoinColumn, JoinSide, NestedLoopJoinPlan};
use crate::execution::Executor;
use crate::catalog::DataValue;
use crate::storage::table::Tuple;

pub(crate) fn join_output(columns: &[JoinColumn], left: &Tuple, right: &Tuple) -> Tuple {
    let values: Vec<DataValue> = columns
        .iter()
        .map(|col| {
            let side = match col.side {
                JoinSide::Left => left,
                JoinSide::Right => right,
            };
            side.value(col.column_index).cloned().unwrap_or(DataValue::Null)
        })
        .collect();
    Tuple::new(values)
}

pub struct NestedLoopJoinExecutor {
    plan: NestedLoopJoinPlan,
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    results: Vec<Tuple>,
    cursor: usize,
}

impl NestedLoopJoinExecutor {
    pub fn new(
        plan: NestedLoopJoinPlan,
        left: Box<dyn Executor>,
        right: Box<dyn Executor>,
    ) -> Self {
        Self {
            plan,
            left,
            right,
            results: Vec::new(),
            cursor: 0,
        }
    }
}

impl Executor for NestedLoopJoinExecutor {
    fn init(&mut self) -> ExecutionResult<()> {
        self.results.clear();
        self.cursor = 0;

        self.left.init().map_err(wrap_child_error)?;

        loop {
            let (left_tuple, _) = match self.left.next().map_err(wrap_child_error)? {
                Some(entry) => entry,
                None => break,
            };

            self.right.init().map_err(wrap_child_error)?;
            loop {
                let (right_tuple, _) = match self.right.next().map_err(wrap_child_error)? {
                    Some(entry) => entry,
                    None => break,
                };

                let matches = match &self.plan.predicate {
                    Some(predicate) => {
                        value_as_bool(&predicate.evaluate_join(&left_tuple, &right_tuple)?)
                    }
                    None => true,
                };
                if matches {
                    self.results.push(join_output(
                        &self.plan.output_columns,
                        &left_tuple,
                        &right_tuple,
                    ));
                }
            }
        }

        Ok(())
    }

    fn next(&mut self) -> ExecutionResult<Option<(Tuple, Rid)>> {
        if self.cursor >= self.results.len() {
            return Ok(None);
        }
        let tuple = self.results[self.cursor].clone();
        self.cursor += 1;
        Ok(Some((tuple, Rid::invalid())))
    }
}
