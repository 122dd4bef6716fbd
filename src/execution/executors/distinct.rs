// Distinct Executor
//
// Deduplicates its child's output: init drains the child into an ordered
// hash set keyed by the full value vector; next() streams the survivors in
// first-seen order.

use linked_hash_map::LinkedHashMap;

use crate::catalog::DataValue;
use crate::common::types::Rid;
use crate::execution::error::{wrap_child_error, ExecutionResult};
use crate::execution::Executor;
use crate::storage::table::Tuple;

pub struct DistinctExecutor {
    child: Box<dyn Executor>,
    results: Vec<(Tuple, Rid)>,
    cursor: usize,
}

impl DistinctExecutor {
    pub fn new(child: Box<dyn Executor>) -> Self {
        Self {
            child,
            results: Vec::new(),
            cursor: 0,
        }
    }
}

impl Executor for DistinctExecutor {
    fn init(&mut self) -> ExecutionResult<()> {
        self.results.clear();
        self.cursor = 0;

        self.child.init().map_err(wrap_child_error)?;

        let mut seen: LinkedHashMap<Vec<DataValue>, (Tuple, Rid)> = LinkedHashMap::new();
        loop {
            let (tuple, rid) = match self.child.next().map_err(wrap_child_error)? {
                Some(entry) => entry,
                None => break,
            };
            let key = tuple.values().to_vec();
            if !seen.contains_key(&key) {
                seen.insert(key, (tuple, rid));
            }
        }

        self.results = seen.into_iter().map(|(_, entry)| entry).collect();
        Ok(())
    }

    fn next(&mut self) -> ExecutionResult<Option<(Tuple, Rid)>> {
        if self.cursor >= self.results.len() {
            return Ok(None);
        }
        let entry = self.results[self.cursor].clone();
        self.cursor += 1;
        Ok(Some(entry))
    }
}
