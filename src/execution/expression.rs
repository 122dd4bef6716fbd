// Expression Evaluation
//
// A small expression tree with three evaluation entry points: against one
// tuple (scans, predicates), against a pair of tuples (join conditions),
// and against aggregate key/value vectors (HAVING and aggregate output).
// Columns are referenced by position; name resolution happens in the
// planner, outside this crate.

use crate::catalog::DataValue;
use crate::execution::error::{ExecutionError, ExecutionResult};
use crate::storage::table::Tuple;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone)]
pub enum Expression {
    /// A literal value
    Constant(DataValue),
    /// Column of an input tuple. `tuple_index` is 0 for single-tuple
    /// evaluation, 0/1 for the left/right side of a join.
    ColumnRef {
        tuple_index: usize,
        column_index: usize,
    },
    Comparison {
        op: ComparisonOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Not(Box<Expression>),
    /// i-th group-by value, valid only in aggregate evaluation
    GroupBy(usize),
    /// i-th aggregate value, valid only in aggregate evaluation
    Aggregate(usize),
}

impl Expression {
    /// Evaluate against a single tuple
    pub fn evaluate(&self, tuple: &Tuple) -> ExecutionResult<DataValue> {
        match self {
            Expression::Constant(value) => Ok(value.clone()),
            Expression::ColumnRef { column_index, .. } => Ok(tuple
                .value(*column_index)
                .cloned()
                .unwrap_or(DataValue::Null)),
            Expression::Comparison { op, left, right } => {
                Ok(compare(*op, &left.evaluate(tuple)?, &right.evaluate(tuple)?))
            }
            Expression::And(left, right) => Ok(DataValue::Boolean(
                value_as_bool(&left.evaluate(tuple)?) && value_as_bool(&right.evaluate(tuple)?),
            )),
            Expression::Or(left, right) => Ok(DataValue::Boolean(
                value_as_bool(&left.evaluate(tuple)?) || value_as_bool(&right.evaluate(tuple)?),
            )),
            Expression::Not(inner) => {
                Ok(DataValue::Boolean(!value_as_bool(&inner.evaluate(tuple)?)))
            }
            Expression::GroupBy(_) | Expression::Aggregate(_) => Err(ExecutionError::Type(
                "aggregate reference outside aggregate evaluation".to_string(),
            )),
        }
    }

    /// Evaluate against a joined pair of tuples
    pub fn evaluate_join(&self, left: &Tuple, right: &Tuple) -> ExecutionResult<DataValue> {
        match self {
            Expression::Constant(value) => Ok(value.clone()),
            Expression::ColumnRef {
                tuple_index,
                column_index,
            } => {
                let side = if *tuple_index == 0 { left } else { right };
                Ok(side.value(*column_index).cloned().unwrap_or(DataValue::Null))
            }
            Expression::Comparison { op, left: l, right: r } => Ok(compare(
                *op,
                &l.evaluate_join(left, right)?,
                &r.evaluate_join(left, right)?,
            )),
            Expression::And(l, r) => Ok(DataValue::Boolean(
                value_as_bool(&l.evaluate_join(left, right)?)
                    && value_as_bool(&r.evaluate_join(left, right)?),
            )),
            Expression::Or(l, r) => Ok(DataValue::Boolean(
                value_as_bool(&l.evaluate_join(left, right)?)
                    || value_as_bool(&r.evaluate_join(left, right)?),
            )),
            Expression::Not(inner) => Ok(DataValue::Boolean(!value_as_bool(
                &inner.evaluate_join(left, right)?,
            ))),
            Expression::GroupBy(_) | Expression::Aggregate(_) => Err(ExecutionError::Type(
                "aggregate reference outside aggregate evaluation".to_string(),
            )),
        }
    }

    /// Evaluate against one aggregated group
    pub fn evaluate_aggregate(
        &self,
        group_bys: &[DataValue],
        aggregates: &[DataValue],
    ) -> ExecutionResult<DataValue> {
        match self {
            Expression::Constant(value) => Ok(value.clone()),
            Expression::GroupBy(i) => Ok(group_bys.get(*i).cloned().unwrap_or(DataValue::Null)),
            Expression::Aggregate(i) => Ok(aggregates.get(*i).cloned().unwrap_or(DataValue::Null)),
            Expression::Comparison { op, left, right } => Ok(compare(
                *op,
                &left.evaluate_aggregate(group_bys, aggregates)?,
                &right.evaluate_aggregate(group_bys, aggregates)?,
            )),
            Expression::And(l, r) => Ok(DataValue::Boolean(
                value_as_bool(&l.evaluate_aggregate(group_bys, aggregates)?)
                    && value_as_bool(&r.evaluate_aggregate(group_bys, aggregates)?),
            )),
            Expression::Or(l, r) => Ok(DataValue::Boolean(
                value_as_bool(&l.evaluate_aggregate(group_bys, aggregates)?)
                    || value_as_bool(&r.evaluate_aggregate(group_bys, aggregates)?),
            )),
            Expression::Not(inner) => Ok(DataValue::Boolean(!value_as_bool(
                &inner.evaluate_aggregate(group_bys, aggregates)?,
            ))),
            Expression::ColumnRef { .. } => Err(ExecutionError::Type(
                "column reference inside aggregate evaluation".to_string(),
            )),
        }
    }

    /// Shorthand for an equality predicate between two columns
    pub fn column_eq(left_tuple: usize, left_col: usize, right_tuple: usize, right_col: usize) -> Self {
        Expression::Comparison {
            op: ComparisonOp::Eq,
            left: Box::new(Expression::ColumnRef {
                tuple_index: left_tuple,
                column_index: left_col,
            }),
            right: Box::new(Expression::ColumnRef {
                tuple_index: right_tuple,
                column_index: right_col,
            }),
        }
    }
}

fn compare(op: ComparisonOp, left: &DataValue, right: &DataValue) -> DataValue {
    let result = match op {
        ComparisonOp::Eq => left == right,
        ComparisonOp::NotEq => left != right,
        ComparisonOp::Lt => matches!(left.partial_cmp(right), Some(std::cmp::Ordering::Less)),
        ComparisonOp::LtEq => matches!(
            left.partial_cmp(right),
            Some(std::cmp::Ordering::Less) | Some(std::cmp::Ordering::Equal)
        ),
        ComparisonOp::Gt => matches!(left.partial_cmp(right), Some(std::cmp::Ordering::Greater)),
        ComparisonOp::GtEq => matches!(
            left.partial_cmp(right),
            Some(std::cmp::Ordering::Greater) | Some(std::cmp::Ordering::Equal)
        ),
    };
    DataValue::Boolean(result)
}

/// Predicate truthiness: only Boolean(true) passes
pub fn value_as_bool(value: &DataValue) -> bool {
    matches!(value, DataValue::Boolean(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: Vec<DataValue>) -> Tuple {
        Tuple::new(values)
    }

    #[test]
    fn test_column_and_comparison() {
        let tuple = row(vec![DataValue::Integer(5), DataValue::Text("x".into())]);
        let expr = Expression::Comparison {
            op: ComparisonOp::Gt,
            left: Box::new(Expression::ColumnRef {
                tuple_index: 0,
                column_index: 0,
            }),
            right: Box::new(Expression::Constant(DataValue::Integer(3))),
        };
        assert_eq!(expr.evaluate(&tuple).unwrap(), DataValue::Boolean(true));
    }

    #[test]
    fn test_join_evaluation_picks_sides() {
        let left = row(vec![DataValue::Integer(1)]);
        let right = row(vec![DataValue::Integer(1), DataValue::Integer(2)]);
        let eq = Expression::column_eq(0, 0, 1, 0);
        assert_eq!(
            eq.evaluate_join(&left, &right).unwrap(),
            DataValue::Boolean(true)
        );

        let neq = Expression::column_eq(0, 0, 1, 1);
        assert_eq!(
            neq.evaluate_join(&left, &right).unwrap(),
            DataValue::Boolean(false)
        );
    }

    #[test]
    fn test_aggregate_references() {
        let group_bys = vec![DataValue::Integer(7)];
        let aggregates = vec![DataValue::Integer(3)];
        let having = Expression::Comparison {
            op: ComparisonOp::GtEq,
            left: Box::new(Expression::Aggregate(0)),
            right: Box::new(Expression::Constant(DataValue::Integer(2))),
        };
        assert_eq!(
            having.evaluate_aggregate(&group_bys, &aggregates).unwrap(),
            DataValue::Boolean(true)
        );

        // Column references have no meaning here
        let bad = Expression::ColumnRef {
            tuple_index: 0,
            column_index: 0,
        };
        assert!(bad.evaluate_aggregate(&group_bys, &aggregates).is_err());
    }

    #[test]
    fn test_null_comparisons_are_false() {
        let tuple = row(vec![DataValue::Null]);
        let expr = Expression::Comparison {
            op: ComparisonOp::Lt,
            left: Box::new(Expression::ColumnRef {
                tuple_index: 0,
                column_index: 0,
            }),
            right: Box::new(Expression::Constant(DataValue::Integer(1))),
        };
        assert_eq!(expr.evaluate(&tuple).unwrap(), DataValue::Boolean(false));
    }
}
