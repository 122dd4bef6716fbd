// Execution Module
//
// The pull-based (iterator) executor framework. A plan tree is
// instantiated into a tree of executors; init() walks the tree and next()
// pulls one tuple upward per call.

pub mod context;
pub mod error;
pub mod executors;
pub mod expression;
pub mod plan;

use std::sync::Arc;

use crate::common::types::Rid;
use crate::storage::table::Tuple;

pub use context::ExecutorContext;
pub use error::{ExecutionError, ExecutionResult};
pub use expression::{ComparisonOp, Expression};
pub use plan::PlanNode;

use executors::aggregation::AggregationExecutor;
use executors::delete::DeleteExecutor;
use executors::distinct::DistinctExecutor;
use executors::hash_join::HashJoinExecutor;
use executors::insert::InsertExecutor;
use executors::nested_loop_join::NestedLoopJoinExecutor;
use executors::seq_scan::SeqScanExecutor;
use executors::update::UpdateExecutor;

/// The iterator interface every executor implements. `next` yields one
/// tuple and its rid per call; None means exhausted. Calls on one executor
/// instance are strictly sequential.
pub trait Executor: Send {
    fn init(&mut self) -> ExecutionResult<()>;
    fn next(&mut self) -> ExecutionResult<Option<(Tuple, Rid)>>;
}

/// Instantiate the executor tree for a plan tree
pub fn build_executor(
    ctx: Arc<ExecutorContext>,
    plan: &PlanNode,
) -> ExecutionResult<Box<dyn Executor>> {
    match plan {
        PlanNode::SeqScan(plan) => Ok(Box::new(SeqScanExecutor::new(ctx, plan.clone()))),
        PlanNode::Insert(plan) => {
            let child = match &plan.source {
                plan::InsertSource::Child(child_plan) => {
                    Some(build_executor(ctx.clone(), child_plan)?)
                }
                plan::InsertSource::Raw(_) => None,
            };
            Ok(Box::new(InsertExecutor::new(ctx, plan.clone(), child)))
        }
        PlanNode::Update(plan) => {
            let child = build_executor(ctx.clone(), &plan.child)?;
            Ok(Box::new(UpdateExecutor::new(ctx, plan.clone(), child)))
        }
        PlanNode::Delete(plan) => {
            let child = build_executor(ctx.clone(), &plan.child)?;
            Ok(Box::new(DeleteExecutor::new(ctx, plan.clone(), child)))
        }
        PlanNode::NestedLoopJoin(plan) => {
            let left = build_executor(ctx.clone(), &plan.left)?;
            let right = build_executor(ctx.clone(), &plan.right)?;
            Ok(Box::new(NestedLoopJoinExecutor::new(plan.clone(), left, right)))
        }
        PlanNode::HashJoin(plan) => {
            let left = build_executor(ctx.clone(), &plan.left)?;
            let right = build_executor(ctx.clone(), &plan.right)?;
            Ok(Box::new(HashJoinExecutor::new(plan.clone(), left, right)))
        }
        PlanNode::Aggregation(plan) => {
            let child = build_executor(ctx.clone(), &plan.child)?;
            Ok(Box::new(AggregationExecutor::new(plan.clone(), child)))
        }
        PlanNode::Distinct(plan) => {
            let child = build_executor(ctx.clone(), &plan.child)?;
            Ok(Box::new(DistinctExecutor::new(child)))
        }
    }
}
