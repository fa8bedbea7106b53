//! Total order of the blocks in the past of the virtual block.
//!
//! The selected chain is emitted genesis first. Each chain block is preceded
//! by the rest of its merge set, and the virtual block's merge set comes last.
//! Inside a merge set blue blocks come before red ones, higher blue scores
//! first, and a block never precedes one of its parents.

use crate::consensus::dag::DagStore;
use crate::consensus::ghostdag::GhostdagStore;
use phantom_core::errors::ConsensusResult;
use phantom_core::ghostdag::GhostdagData;
use phantom_core::{BlockHashMap, BlockHashSet, Hash};
use std::cmp::Reverse;

type PriorityKey = (bool, Reverse<u64>, Hash);

pub struct OrderingEngine<'a> {
    dag: &'a DagStore,
    store: &'a GhostdagStore,
}

impl<'a> OrderingEngine<'a> {
    pub fn new(dag: &'a DagStore, store: &'a GhostdagStore) -> Self {
        Self { dag, store }
    }

    /// Orders every block in the closed past of the virtual block's parents.
    pub fn total_order(&self, virtual_data: &GhostdagData) -> ConsensusResult<Vec<Hash>> {
        let mut chain = Vec::new();
        let mut current = virtual_data.selected_parent;
        while let Some(hash) = current {
            let data = self.store.get_data(&hash)?;
            current = data.selected_parent;
            chain.push((hash, data));
        }

        let mut order = Vec::with_capacity(self.dag.len());
        let mut emitted = BlockHashSet::new();
        for (hash, data) in chain.into_iter().rev() {
            self.emit_mergeset(&data, &mut order, &mut emitted)?;
            emitted.insert(hash);
            order.push(hash);
        }
        self.emit_mergeset(virtual_data, &mut order, &mut emitted)?;
        Ok(order)
    }

    /// Whether `a` comes no later than `b` in `order`. A stored block comes
    /// before one that is not stored; `None` if neither is stored.
    pub fn is_a_before_b(&self, order: &[Hash], a: &Hash, b: &Hash) -> Option<bool> {
        match (self.dag.contains(a), self.dag.contains(b)) {
            (false, false) => None,
            (true, false) => Some(true),
            (false, true) => Some(false),
            (true, true) => {
                let position = |hash: &Hash| order.iter().position(|ordered| ordered == hash);
                match (position(a), position(b)) {
                    (Some(i), Some(j)) => Some(i <= j),
                    (Some(_), None) => Some(true),
                    (None, Some(_)) => Some(false),
                    (None, None) => None,
                }
            }
        }
    }

    fn emit_mergeset(
        &self,
        data: &GhostdagData,
        order: &mut Vec<Hash>,
        emitted: &mut BlockHashSet,
    ) -> ConsensusResult<()> {
        let mut keys: BlockHashMap<PriorityKey> = BlockHashMap::new();
        for hash in data.unordered_mergeset_without_selected_parent() {
            let is_red = !data.is_mergeset_blue(hash);
            keys.insert(*hash, (is_red, Reverse(self.store.blue_score(hash)?), *hash));
        }

        let mut pending: Vec<PriorityKey> = keys.values().copied().collect();
        pending.sort();
        for (_, _, hash) in pending {
            self.emit_with_parents(hash, &keys, order, emitted)?;
        }
        Ok(())
    }

    /// Emits `hash` after its unemitted parents of the same merge set,
    /// depth-first with parents in priority order. The walk keeps its own
    /// stack since a merged side chain can be arbitrarily long.
    fn emit_with_parents(
        &self,
        hash: Hash,
        keys: &BlockHashMap<PriorityKey>,
        order: &mut Vec<Hash>,
        emitted: &mut BlockHashSet,
    ) -> ConsensusResult<()> {
        let mut stack = vec![EmitStep::Visit(hash)];
        while let Some(step) = stack.pop() {
            match step {
                EmitStep::Emit(hash) => {
                    if emitted.insert(hash) {
                        order.push(hash);
                    }
                }
                EmitStep::Visit(hash) => {
                    if emitted.contains(&hash) {
                        continue;
                    }
                    let mut parents: Vec<PriorityKey> = self
                        .dag
                        .parents(&hash)?
                        .iter()
                        .filter(|parent| !emitted.contains(*parent))
                        .filter_map(|parent| keys.get(parent).copied())
                        .collect();
                    parents.sort();

                    stack.push(EmitStep::Emit(hash));
                    // the highest priority parent is popped first
                    stack.extend(parents.into_iter().rev().map(|(_, _, parent)| EmitStep::Visit(parent)));
                }
            }
        }
        Ok(())
    }
}

enum EmitStep {
    Visit(Hash),
    Emit(Hash),
}
