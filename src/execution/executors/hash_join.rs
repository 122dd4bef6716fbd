// Hash Join Executor
//
// Equality joins at O(n+m): init drains the left (build) child into a
// multimap keyed by the join key, then drains the right (probe) child,
// emitting one joined tuple per left match. next() streams the buffer.

use std::collections::HashMap;

use crate::catalog::DataValue;
use crate::common::types::Rid;
use crate::execution::error::{wrap_child_error, ExecutionResult};
use crate::execution::executors::nested_loop_join::join_output;
use crate::execution::plan::HashJoinPlan;
use crate::execution::Executor;
use crate::storage::table::Tuple;

pub struct HashJoinExecutor {
    plan: HashJoinPlan,
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    results: Vec<Tuple>,
    cursor: usize,
}

impl HashJoinExecutor {
    pub fn new(plan: HashJoinPlan, left: Box<dyn Executor>, right: Box<dyn Executor>) -> Self {
        Self {
            plan,
            left,
            right,
            results: Vec::new(),
            cursor: 0,
        }
    }
}

impl Executor for HashJoinExecutor {
    fn init(&mut self) -> ExecutionResult<()> {
        self.results.clear();
        self.cursor = 0;

        self.left.init().map_err(wrap_child_error)?;
        self.right.init().map_err(wrap_child_error)?;

        // Build side
        let mut build_table: HashMap<DataValue, Vec<Tuple>> = HashMap::new();
        loop {
            let (tuple, _) = match self.left.next().map_err(wrap_child_error)? {
                Some(entry) => entry,
                None => break,
            };
            let key = self.plan.left_key.evaluate(&tuple)?;
            build_table.entry(key).or_default().push(tuple);
        }

        // Probe side
        loop {
            let (right_tuple, _) = match self.right.next().map_err(wrap_child_error)? {
                Some(entry) => entry,
                None => break,
            };
            let key = self.plan.right_key.evaluate(&right_tuple)?;
            if let Some(matches) = build_table.get(&key) {
                for left_tuple in matches {
                    self.results.push(join_output(
                        &self.plan.output_columns,
                        left_tuple,
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
