use phantom_core::errors::ConsensusResult;
use phantom_core::{BlockHashSet, Hash};
use phantom_utils::LazySet;
use std::collections::VecDeque;
use std::sync::Arc;

use super::relations::DagStore;

/// Derived relations over a [`DagStore`]: future, anticone and traversal orders.
#[derive(Clone, Copy)]
pub struct DagTopology<'a> {
    dag: &'a DagStore,
}

impl<'a> DagTopology<'a> {
    pub fn new(dag: &'a DagStore) -> Self {
        Self { dag }
    }

    pub fn is_tip(&self, hash: &Hash) -> ConsensusResult<bool> {
        Ok(self.dag.children(hash)?.is_empty())
    }

    /// Strict descendants of `hash`, found by a breadth-first walk of the
    /// children index. The result is materialized into a single layer.
    pub fn future(&self, hash: &Hash) -> ConsensusResult<LazySet<Hash>> {
        Ok(LazySet::from_set(self.future_set(hash)?))
    }

    fn future_set(&self, hash: &Hash) -> ConsensusResult<BlockHashSet> {
        let mut future = BlockHashSet::new();
        let mut queue: VecDeque<Hash> = self.dag.children(hash)?.iter().copied().collect();
        while let Some(current) = queue.pop_front() {
            if future.insert(current) {
                queue.extend(self.dag.children(&current)?.iter().copied());
            }
        }
        Ok(future)
    }

    /// Blocks neither in the past nor in the future of `hash`.
    pub fn anticone(&self, hash: &Hash) -> ConsensusResult<LazySet<Hash>> {
        let closed_past = self.dag.closed_past(hash)?.clone();
        let future = self.future_set(hash)?;
        let all: BlockHashSet = self.dag.iter().copied().collect();
        Ok(LazySet::from_set(all).and_difference(Arc::new(closed_past)).and_difference(Arc::new(future)))
    }

    pub fn is_in_anticone(&self, a: &Hash, b: &Hash) -> ConsensusResult<bool> {
        let a_past = self.dag.closed_past(a)?;
        let b_past = self.dag.closed_past(b)?;
        Ok(!a_past.contains(b) && !b_past.contains(a))
    }

    /// The closed past of `from`, parents before children.
    ///
    /// Depth-first over parents with an explicit stack, so long chains do
    /// not grow the call stack.
    pub fn topological_sort(&self, from: &Hash) -> ConsensusResult<Vec<Hash>> {
        let mut visited = BlockHashSet::new();
        let mut result = vec![];
        let mut stack = vec![WalkStep::Visit(*from)];
        while let Some(step) = stack.pop() {
            match step {
                // post-order puts every block after its parents
                WalkStep::Emit(hash) => result.push(hash),
                WalkStep::Visit(hash) => {
                    if !visited.insert(hash) {
                        continue;
                    }
                    stack.push(WalkStep::Emit(hash));
                    for parent in self.dag.parents(&hash)?.iter().rev() {
                        if !visited.contains(parent) {
                            stack.push(WalkStep::Visit(*parent));
                        }
                    }
                }
            }
        }
        Ok(result)
    }
}

enum WalkStep {
    Visit(Hash),
    Emit(Hash),
}
