//! Exact coloring by branch-and-bound.
//!
//! [`ExactColoring`] picks, for every block, the largest subset of its merge
//! set that keeps the block's blue past a k-cluster. [`MaxClusterSearch`]
//! runs the same search over a whole DAG and finds its largest k-cluster.
//! Both count search nodes against a budget and fail once it is spent.

use super::protocol::{blue_anticone_size, find_selected_parent, ordered_mergeset, ColoringStrategy};
use super::stores::GhostdagStore;
use crate::consensus::dag::{DagStore, DagTopology};
use phantom_core::config::ColoringStrategyKind;
use phantom_core::errors::{ConsensusError, ConsensusResult};
use phantom_core::ghostdag::GhostdagData;
use phantom_core::{BlockHashMap, Hash, KType};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Search over candidates `0..n` for the largest subset that can be added to
/// a fixed set of blues while every blue keeps at most `k` blues in its
/// anticone.
struct ClusterSearch {
    k: usize,
    budget: u64,
    /// Candidates in the anticone of each candidate
    conflicts: Vec<Vec<usize>>,
    /// Fixed blues in the anticone of each candidate
    fixed_conflicts: Vec<Vec<usize>>,
    /// Blue anticone size of each fixed blue before any candidate is added
    fixed_base: Vec<usize>,
}

enum Step {
    Visit(usize),
    Undo(usize),
}

struct SearchState {
    chosen: Vec<usize>,
    is_chosen: Vec<bool>,
    candidate_counts: Vec<usize>,
    fixed_counts: Vec<usize>,
}

impl ClusterSearch {
    fn feasible(&self, state: &SearchState, i: usize) -> bool {
        if self.fixed_conflicts[i].len() + state.candidate_counts[i] > self.k {
            return false;
        }
        let crowded_peer = self.conflicts[i]
            .iter()
            .any(|&j| state.is_chosen[j] && self.fixed_conflicts[j].len() + state.candidate_counts[j] >= self.k);
        let crowded_fixed = self.fixed_conflicts[i].iter().any(|&x| state.fixed_counts[x] >= self.k);
        !crowded_peer && !crowded_fixed
    }

    fn apply(&self, state: &mut SearchState, i: usize) {
        state.chosen.push(i);
        state.is_chosen[i] = true;
        for &j in &self.conflicts[i] {
            state.candidate_counts[j] += 1;
        }
        for &x in &self.fixed_conflicts[i] {
            state.fixed_counts[x] += 1;
        }
    }

    fn undo(&self, state: &mut SearchState, i: usize) {
        state.chosen.pop();
        state.is_chosen[i] = false;
        for &j in &self.conflicts[i] {
            state.candidate_counts[j] -= 1;
        }
        for &x in &self.fixed_conflicts[i] {
            state.fixed_counts[x] -= 1;
        }
    }

    /// Returns the chosen candidates in ascending order. Including a
    /// candidate is explored before excluding it and the best set is only
    /// replaced by a strictly larger one, so among maximum sets the one
    /// preferring earlier candidates wins.
    fn run(&self) -> ConsensusResult<Vec<usize>> {
        let n = self.conflicts.len();
        let mut state = SearchState {
            chosen: Vec::with_capacity(n),
            is_chosen: vec![false; n],
            candidate_counts: vec![0; n],
            fixed_counts: self.fixed_base.clone(),
        };
        let mut best: Vec<usize> = Vec::new();
        let mut found = false;
        let mut nodes: u64 = 0;

        let mut stack = vec![Step::Visit(0)];
        while let Some(step) = stack.pop() {
            let i = match step {
                Step::Undo(i) => {
                    self.undo(&mut state, i);
                    continue;
                }
                Step::Visit(i) => i,
            };

            nodes += 1;
            if nodes > self.budget {
                warn!("exact coloring gave up after {} search nodes", self.budget);
                return Err(ConsensusError::SearchBudgetExceeded { budget: self.budget });
            }

            if i == n {
                if !found || state.chosen.len() > best.len() {
                    best = state.chosen.clone();
                    found = true;
                }
                continue;
            }
            if found && state.chosen.len() + (n - i) <= best.len() {
                continue;
            }

            // Popped in reverse: the include branch runs first, then its undo,
            // then the exclude branch.
            stack.push(Step::Visit(i + 1));
            if self.feasible(&state, i) {
                self.apply(&mut state, i);
                stack.push(Step::Undo(i));
                stack.push(Step::Visit(i + 1));
            }
        }

        Ok(best)
    }
}

/// Exact per-block coloring.
pub struct ExactColoring {
    k: KType,
    budget: u64,
}

impl ExactColoring {
    pub fn new(k: KType, budget: u64) -> Self {
        Self { k, budget }
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    /// Blues of the selected parent's view that lie in the anticone of
    /// `candidate`, found along the selected chain.
    fn inherited_anticone(
        &self,
        dag: &DagStore,
        store: &GhostdagStore,
        selected_parent: Hash,
        candidate: &Hash,
    ) -> ConsensusResult<Vec<Hash>> {
        let candidate_past = dag.closed_past(candidate)?;
        // The selected parent itself is never in a merge set block's past.
        let mut anticone = vec![selected_parent];
        let mut current = Some(selected_parent);
        while let Some(chain_block) = current {
            if candidate_past.contains(&chain_block) {
                break;
            }
            let data = store.get_data(&chain_block)?;
            anticone.extend(data.mergeset_blues.iter().filter(|blue| !candidate_past.contains(blue)).copied());
            current = data.selected_parent;
        }
        Ok(anticone)
    }
}

impl ColoringStrategy for ExactColoring {
    fn kind(&self) -> ColoringStrategyKind {
        ColoringStrategyKind::Exact
    }

    fn k(&self) -> KType {
        self.k
    }

    fn color_block(&self, dag: &DagStore, store: &GhostdagStore, parents: &[Hash]) -> ConsensusResult<GhostdagData> {
        if parents.is_empty() {
            return Ok(GhostdagData::genesis());
        }

        let selected_parent = find_selected_parent(store, parents)?;
        let selected_data = store.get_data(&selected_parent)?;
        let candidates = ordered_mergeset(dag, store, selected_parent, parents)?;
        let topology = DagTopology::new(dag);

        // Inherited blues touched by some candidate, with their current sizes
        let mut fixed: Vec<Hash> = Vec::new();
        let mut fixed_index: BlockHashMap<usize> = BlockHashMap::new();
        let mut fixed_base: Vec<usize> = Vec::new();
        let mut fixed_conflicts = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            let mut indices = Vec::new();
            for blue in self.inherited_anticone(dag, store, selected_parent, candidate)? {
                let index = match fixed_index.get(&blue) {
                    Some(&index) => index,
                    None => {
                        // Inherited blues are all in the selected parent's closed past,
                        // so the selected parent has an empty blue anticone.
                        let base = if blue == selected_parent {
                            0
                        } else {
                            usize::from(blue_anticone_size(store, &selected_data, &blue)?)
                        };
                        fixed.push(blue);
                        fixed_base.push(base);
                        fixed_index.insert(blue, fixed.len() - 1);
                        fixed.len() - 1
                    }
                };
                indices.push(index);
            }
            fixed_conflicts.push(indices);
        }

        let mut conflicts = vec![Vec::new(); candidates.len()];
        for i in 0..candidates.len() {
            for j in i + 1..candidates.len() {
                if topology.is_in_anticone(&candidates[i], &candidates[j])? {
                    conflicts[i].push(j);
                    conflicts[j].push(i);
                }
            }
        }

        let search = ClusterSearch { k: usize::from(self.k), budget: self.budget, conflicts, fixed_conflicts, fixed_base };
        let chosen = search.run()?;

        // Record the final blue anticone sizes of every blue the chosen set touches.
        let mut new_data = GhostdagData::new_with_selected_parent(selected_parent);
        let mut is_chosen = vec![false; candidates.len()];
        for &i in &chosen {
            is_chosen[i] = true;
        }
        let mut fixed_counts = search.fixed_base.clone();
        for &i in &chosen {
            for &x in &search.fixed_conflicts[i] {
                fixed_counts[x] += 1;
            }
        }
        let mut sizes = BTreeMap::new();
        for (i, candidate) in candidates.iter().enumerate() {
            if !is_chosen[i] {
                new_data.add_red(*candidate);
                continue;
            }
            new_data.mergeset_blues.push(*candidate);
            let peers = search.conflicts[i].iter().filter(|&&j| is_chosen[j]).count();
            sizes.insert(*candidate, size_of(search.fixed_conflicts[i].len() + peers)?);
            for &x in &search.fixed_conflicts[i] {
                sizes.insert(fixed[x], size_of(fixed_counts[x])?);
            }
        }
        new_data.blues_anticone_sizes.extend(sizes);
        new_data.finalize_score_from_parent(selected_data.blue_score);
        Ok(new_data)
    }
}

fn size_of(count: usize) -> ConsensusResult<KType> {
    KType::try_from(count).map_err(|_| ConsensusError::InconsistentDag(format!("blue anticone size {} out of range", count)))
}

/// Whether `blocks` is a k-cluster of `dag`: every block has at most `k`
/// members of `blocks` in its anticone.
pub fn is_k_cluster(dag: &DagStore, blocks: &BTreeSet<Hash>, k: KType) -> ConsensusResult<bool> {
    let topology = DagTopology::new(dag);
    for block in blocks {
        let mut count = 0usize;
        for other in blocks {
            if other != block && topology.is_in_anticone(block, other)? {
                count += 1;
            }
        }
        if count > usize::from(k) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Largest k-cluster of a whole DAG, lowest hashes preferred on ties.
pub struct MaxClusterSearch {
    k: KType,
    budget: u64,
}

impl MaxClusterSearch {
    pub fn new(k: KType, budget: u64) -> Self {
        Self { k, budget }
    }

    pub fn run(&self, dag: &DagStore) -> ConsensusResult<BTreeSet<Hash>> {
        let blocks: Vec<Hash> = dag.iter().copied().collect::<BTreeSet<Hash>>().into_iter().collect();
        let topology = DagTopology::new(dag);
        let position: BlockHashMap<usize> = blocks.iter().enumerate().map(|(i, hash)| (*hash, i)).collect();

        let mut conflicts = Vec::with_capacity(blocks.len());
        for block in &blocks {
            let mut indices: Vec<usize> = topology.anticone(block)?.iter().filter_map(|other| position.get(other).copied()).collect();
            indices.sort_unstable();
            conflicts.push(indices);
        }

        let search = ClusterSearch {
            k: usize::from(self.k),
            budget: self.budget,
            fixed_conflicts: vec![Vec::new(); blocks.len()],
            fixed_base: Vec::new(),
            conflicts,
        };
        Ok(search.run()?.into_iter().map(|i| blocks[i]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::ghostdag::protocol::GreedyColoring;

    fn h(n: u64) -> Hash {
        Hash::from_u64_word(n)
    }

    fn seven_block_dag() -> DagStore {
        let mut dag = DagStore::new();
        dag.add_block(h(0), vec![]).unwrap();
        dag.add_block(h(1), vec![h(0)]).unwrap();
        dag.add_block(h(2), vec![h(0)]).unwrap();
        dag.add_block(h(3), vec![h(1), h(2)]).unwrap();
        dag.add_block(h(4), vec![h(0)]).unwrap();
        dag.add_block(h(5), vec![h(4)]).unwrap();
        dag.add_block(h(6), vec![h(5)]).unwrap();
        dag
    }

    fn set(ids: &[u64]) -> BTreeSet<Hash> {
        ids.iter().map(|id| h(*id)).collect()
    }

    fn color_all(strategy: &dyn ColoringStrategy, blocks: &[(u64, Vec<u64>)]) -> (DagStore, GhostdagStore) {
        let mut dag = DagStore::new();
        let mut store = GhostdagStore::new();
        for (id, parents) in blocks {
            let parents: Vec<Hash> = parents.iter().map(|p| h(*p)).collect();
            let data = strategy.color_block(&dag, &store, &parents).unwrap();
            dag.add_block(h(*id), parents).unwrap();
            store.insert(h(*id), data);
        }
        (dag, store)
    }

    #[test]
    fn test_max_cluster_per_k() {
        let dag = seven_block_dag();
        let expected: [&[u64]; 5] = [&[0, 4, 5, 6], &[0, 1, 2, 3], &[0, 1, 3, 4, 5], &[0, 1, 2, 3, 4, 5], &[0, 1, 2, 3, 4, 5, 6]];
        for (k, blues) in expected.iter().enumerate() {
            let cluster = MaxClusterSearch::new(k as KType, 1_000_000).run(&dag).unwrap();
            assert_eq!(cluster, set(blues), "k = {}", k);
            assert!(is_k_cluster(&dag, &cluster, k as KType).unwrap());
        }
    }

    #[test]
    fn test_max_cluster_budget() {
        let dag = seven_block_dag();
        assert!(matches!(
            MaxClusterSearch::new(2, 5).run(&dag),
            Err(ConsensusError::SearchBudgetExceeded { budget: 5 })
        ));
    }

    #[test]
    fn test_is_k_cluster() {
        let dag = seven_block_dag();
        assert!(is_k_cluster(&dag, &set(&[0, 1, 2, 3]), 1).unwrap());
        assert!(!is_k_cluster(&dag, &set(&[0, 1, 2, 3]), 0).unwrap());
        assert!(!is_k_cluster(&dag, &set(&[1, 4, 5, 6]), 2).unwrap());
    }

    #[test]
    fn test_exact_matches_greedy_when_greedy_is_maximal() {
        let blocks = vec![(0, vec![]), (1, vec![0]), (2, vec![0]), (3, vec![0]), (4, vec![1, 2, 3])];
        for k in 0..4 {
            let (_, greedy) = color_all(&GreedyColoring::new(k), &blocks);
            let (_, exact) = color_all(&ExactColoring::new(k, 10_000), &blocks);
            for id in 0..5 {
                assert_eq!(greedy.get(&h(id)), exact.get(&h(id)), "k = {}, block {}", k, id);
            }
        }
    }

    #[test]
    fn test_exact_inherits_chain_blues() {
        // Blocks 1 and 4 are in the anticone of both 2 and 3, which block 5
        // inherits through its selected parent 3.
        let blocks = vec![(0, vec![]), (1, vec![0]), (2, vec![0]), (3, vec![2]), (4, vec![0]), (5, vec![1, 3, 4])];
        let (_, greedy) = color_all(&GreedyColoring::new(1), &blocks);
        let (_, exact) = color_all(&ExactColoring::new(1, 10_000), &blocks);

        let data = exact.get(&h(5)).unwrap();
        assert_eq!(data.selected_parent, Some(h(3)));
        assert_eq!(data.mergeset_blues, vec![h(3)]);
        assert_eq!(data.mergeset_reds, vec![h(1), h(4)]);
        assert_eq!(greedy.get(&h(5)), exact.get(&h(5)));
    }

    #[test]
    fn test_exact_budget_exceeded() {
        let blocks = vec![(0, vec![]), (1, vec![0]), (2, vec![0]), (3, vec![0]), (4, vec![0])];
        let (dag, store) = color_all(&ExactColoring::new(2, 10_000), &blocks);
        let parents = [h(1), h(2), h(3), h(4)];
        let result = ExactColoring::new(2, 2).color_block(&dag, &store, &parents);
        assert!(matches!(result, Err(ConsensusError::SearchBudgetExceeded { budget: 2 })));

        let data = ExactColoring::new(2, 10_000).color_block(&dag, &store, &parents).unwrap();
        assert_eq!(data.mergeset_blues, vec![h(1), h(2), h(3)]);
        assert_eq!(data.mergeset_reds, vec![h(4)]);
        assert_eq!(data.blue_score, 4);
    }
}
