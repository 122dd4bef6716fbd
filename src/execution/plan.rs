// Plan Nodes
//
// The planner (outside this crate) hands the executor factory a tree of
// these nodes. Each node carries the expressions and column positions its
// executor needs; schemas stay positional.

use std::collections::HashMap;

use crate::catalog::catalog::TableOid;
use crate::catalog::DataValue;
use crate::execution::expression::Expression;

#[derive(Debug, Clone)]
pub enum PlanNode {
    SeqScan(SeqScanPlan),
    Insert(InsertPlan),
    Update(UpdatePlan),
    Delete(DeletePlan),
    NestedLoopJoin(NestedLoopJoinPlan),
    HashJoin(HashJoinPlan),
    Aggregation(AggregationPlan),
    Distinct(DistinctPlan),
}

#[derive(Debug, Clone)]
pub struct SeqScanPlan {
    pub table_oid: TableOid,
    /// Filter over the full table tuple; None scans everything
    pub predicate: Option<Expression>,
    /// Table columns to emit, in output order
    pub output_columns: Vec<usize>,
}

#[derive(Debug, Clone)]
pub enum InsertSource {
    /// Literal value vectors from the plan
    Raw(Vec<Vec<DataValue>>),
    /// Tuples pulled from a child executor
    Child(Box<PlanNode>),
}

#[derive(Debug, Clone)]
pub struct InsertPlan {
    pub table_oid: TableOid,
    pub source: InsertSource,
}

/// Per-column update action
#[derive(Debug, Clone)]
pub enum UpdateAttr {
    Set(DataValue),
    Add(i64),
}

#[derive(Debug, Clone)]
pub struct UpdatePlan {
    pub table_oid: TableOid,
    pub child: Box<PlanNode>,
    /// column index -> action
    pub update_attrs: HashMap<usize, UpdateAttr>,
}

#[derive(Debug, Clone)]
pub struct DeletePlan {
    pub table_oid: TableOid,
    pub child: Box<PlanNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinSide {
    Left,
    Right,
}

/// One output column of a join: which input tuple and which column of it
#[derive(Debug, Clone, Copy)]
pub struct JoinColumn {
    pub side: JoinSide,
    pub column_index: usize,
}

#[derive(Debug, Clone)]
pub struct NestedLoopJoinPlan {
    pub left: Box<PlanNode>,
    pub right: Box<PlanNode>,
    /// Join condition over (left, right); None means cross product
    pub predicate: Option<Expression>,
    pub output_columns: Vec<JoinColumn>,
}

#[derive(Debug, Clone)]
pub struct HashJoinPlan {
    pub left: Box<PlanNode>,
    pub right: Box<PlanNode>,
    /// Build-side key, evaluated against left tuples
    pub left_key: Expression,
    /// Probe-side key, evaluated against right tuples
    pub right_key: Expression,
    pub output_columns: Vec<JoinColumn>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationType {
    Count,
    Sum,
    Min,
    Max,
}

#[derive(Debug, Clone)]
pub struct AggregateExpr {
    pub agg_type: AggregationType,
    /// Argument evaluated per input tuple; None counts rows (COUNT(*))
    pub argument: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct AggregationPlan {
    pub child: Box<PlanNode>,
    /// Group-by keys, evaluated per input tuple
    pub group_bys: Vec<Expression>,
    pub aggregates: Vec<AggregateExpr>,
    /// Filter over (group_bys, aggregates); None keeps every group
    pub having: Option<Expression>,
    /// Output row, built from GroupBy/Aggregate references
    pub output_exprs: Vec<Expression>,
}

#[derive(Debug, Clone)]
pub struct DistinctPlan {
    pub child: Box<PlanNode>,
}
