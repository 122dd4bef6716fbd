// Aggregation Executor
//
// Hash aggregation: init drains the child and folds every tuple into a
// hash table keyed by the group-by values, one running aggregate per
// aggregate expression. next() walks the groups, keeping those that pass
// the HAVING clause and shaping the output row from group/aggregate
// references. The ordered map keeps group output deterministic.

use linked_hash_map::LinkedHashMap;

use crate::catalog::DataValue;
use crate::common::types::Rid;
use crate::execution::error::{wrap_child_error, ExecutionError, ExecutionResult};
use crate::execution::expression::value_as_bool;
use crate::execution::plan::{AggregateExpr, AggregationPlan, AggregationType};
use crate::execution::Executor;
use crate::storage::table::Tuple;

/// Running aggregates for every group, keyed by group-by values
struct SimpleAggregationHashTable {
    aggregates: Vec<AggregateExpr>,
    groups: LinkedHashMap<Vec<DataValue>, Vec<DataValue>>,
}

impl SimpleAggregationHashTable {
    fn new(aggregates: Vec<AggregateExpr>) -> Self {
        Self {
            aggregates,
            groups: LinkedHashMap::new(),
        }
    }

    fn initial_values(aggregates: &[AggregateExpr]) -> Vec<DataValue> {
        aggregates
            .iter()
            .map(|agg| match agg.agg_type {
                AggregationType::Count => DataValue::Integer(0),
                _ => DataValue::Null,
            })
            .collect()
    }

    /// Fold one input tuple into its group
    fn insert_combine(&mut self, key: Vec<DataValue>, tuple: &Tuple) -> ExecutionResult<()> {
        let aggregates = &self.aggregates;
        let running = self
            .groups
            .entry(key)
            .or_insert_with(|| Self::initial_values(aggregates));

        for (i, agg) in aggregates.iter().enumerate() {
            let input = match &agg.argument {
                Some(expr) => expr.evaluate(tuple)?,
                None => DataValue::Integer(1),
            };
            // NULL inputs do not contribute, per SQL aggregate semantics
            if input.is_null() {
                continue;
            }

            let current = &mut running[i];
            match agg.agg_type {
                AggregationType::Count => {
                    if let DataValue::Integer(count) = current {
                        *count += 1;
                    }
                }
                AggregationType::Sum => {
                    *current = current.add(&input).ok_or_else(|| {
                        ExecutionError::Type(format!(
                            "cannot sum {:?} into {:?}",
                            input, current
                        ))
                    })?;
                }
                AggregationType::Min => {
                    if current.is_null() || input < *current {
                        *current = input;
                    }
                }
                AggregationType::Max => {
                    if current.is_null() || input > *current {
                        *current = input;
                    }
                }
            }
        }
        Ok(())
    }

    fn into_groups(self) -> Vec<(Vec<DataValue>, Vec<DataValue>)> {
        self.groups.into_iter().collect()
    }
}

pub struct AggregationExecutor {
    plan: AggregationPlan,
    child: Box<dyn Executor>,
    groups: Vec<(Vec<DataValue>, Vec<DataValue>)>,
    cursor: usize,
}

impl AggregationExecutor {
    pub fn new(plan: AggregationPlan, child: Box<dyn Executor>) -> Self {
        Self {
            plan,
            child,
            groups: Vec::new(),
            cursor: 0,
        }
    }
}

impl Executor for AggregationExecutor {
    fn init(&mut self) -> ExecutionResult<()> {
        self.groups.clear();
        self.cursor = 0;

        self.child.init().map_err(wrap_child_error)?;

        let mut table = SimpleAggregationHashTable::new(self.plan.aggregates.clone());
        loop {
            let (tuple, _) = match self.child.next().map_err(wrap_child_error)? {
                Some(entry) => entry,
                None => break,
            };

            let mut key = Vec::with_capacity(self.plan.group_bys.len());
            for group_expr in &self.plan.group_bys {
                key.push(group_expr.evaluate(&tuple)?);
            }
            table.insert_combine(key, &tuple)?;
        }

        self.groups = table.into_groups();
        Ok(())
    }

    fn next(&mut self) -> ExecutionResult<Option<(Tuple, Rid)>> {
        while self.cursor < self.groups.len() {
            let (group_bys, aggregates) = &self.groups[self.cursor];
            self.cursor += 1;

            let keep = match &self.plan.having {
                Some(having) => value_as_bool(&having.evaluate_aggregate(group_bys, aggregates)?),
                None => true,
            };
            if !keep {
                continue;
            }

            let mut values = Vec::with_capacity(self.plan.output_exprs.len());
            for expr in &self.plan.output_exprs {
                values.push(expr.evaluate_aggregate(group_bys, aggregates)?);
            }
            return Ok(Some((Tuple::new(values), Rid::invalid())));
        }
        Ok(None)
    }
}
