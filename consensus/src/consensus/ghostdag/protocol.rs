use super::stores::GhostdagStore;
use crate::consensus::dag::DagStore;
use phantom_core::config::ColoringStrategyKind;
use phantom_core::errors::{ConsensusError, ConsensusResult};
use phantom_core::ghostdag::GhostdagData;
use phantom_core::{BlockHashSet, Hash, KType};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::trace;

/// A rule that colors the merge set of a new block.
///
/// Implementations only read the DAG and the coloring data of the new
/// block's past; the caller stores the result.
pub trait ColoringStrategy: Send + Sync {
    fn kind(&self) -> ColoringStrategyKind;

    fn k(&self) -> KType;

    /// Computes the coloring data of a block with the given parents. Every
    /// parent must be stored and colored. No parents means genesis.
    fn color_block(&self, dag: &DagStore, store: &GhostdagStore, parents: &[Hash]) -> ConsensusResult<GhostdagData>;
}

/// The parent with the highest blue score, lowest hash on ties.
pub fn find_selected_parent(store: &GhostdagStore, parents: &[Hash]) -> ConsensusResult<Hash> {
    let mut selected: Option<(u64, Hash)> = None;
    for parent in parents {
        let score = store.blue_score(parent)?;
        selected = match selected {
            Some((best_score, best)) if best_score > score || (best_score == score && best < *parent) => {
                Some((best_score, best))
            }
            _ => Some((score, *parent)),
        };
    }
    selected
        .map(|(_, hash)| hash)
        .ok_or_else(|| ConsensusError::InconsistentDag("cannot select a parent from an empty parent set".to_string()))
}

/// Blocks in the past of a block with `parents` that are outside the closed
/// past of `selected_parent`, sorted by (blue score, hash). Blue score grows
/// along every edge, so the result is a topological order.
pub fn ordered_mergeset(
    dag: &DagStore,
    store: &GhostdagStore,
    selected_parent: Hash,
    parents: &[Hash],
) -> ConsensusResult<Vec<Hash>> {
    let selected_past = dag.closed_past(&selected_parent)?;
    let mut mergeset = BlockHashSet::new();
    let mut queue: VecDeque<Hash> = parents.iter().filter(|parent| **parent != selected_parent).copied().collect();
    while let Some(current) = queue.pop_front() {
        if selected_past.contains(&current) || !mergeset.insert(current) {
            continue;
        }
        queue.extend(dag.parents(&current)?.iter().copied());
    }

    let mut keyed = mergeset
        .into_iter()
        .map(|hash| Ok((store.blue_score(&hash)?, hash)))
        .collect::<ConsensusResult<Vec<(u64, Hash)>>>()?;
    keyed.sort();
    Ok(keyed.into_iter().map(|(_, hash)| hash).collect())
}

/// Blue anticone size of `block` as seen from `context`, looked up along the
/// selected-parent chain starting at `context`.
pub fn blue_anticone_size(store: &GhostdagStore, context: &GhostdagData, block: &Hash) -> ConsensusResult<KType> {
    if let Some(size) = context.blues_anticone_sizes.get(block) {
        return Ok(*size);
    }
    let mut current = context.selected_parent;
    while let Some(hash) = current {
        let data = store.get_data(&hash)?;
        if let Some(size) = data.blues_anticone_sizes.get(block) {
            return Ok(*size);
        }
        current = data.selected_parent;
    }
    Err(ConsensusError::InconsistentDag(format!("block {} is not in the blue set of the given context", block)))
}

enum CandidateColor {
    Blue { anticone_size: KType, anticone_blues: BTreeMap<Hash, KType> },
    Red,
}

/// The GhostDAG greedy coloring.
///
/// Candidates of the merge set are visited in order and each is colored
/// blue when that keeps the blue set a k-cluster given the earlier choices.
pub struct GreedyColoring {
    k: KType,
}

impl GreedyColoring {
    pub fn new(k: KType) -> Self {
        Self { k }
    }

    fn check_blue_candidate(
        &self,
        dag: &DagStore,
        store: &GhostdagStore,
        new_data: &GhostdagData,
        candidate: &Hash,
    ) -> ConsensusResult<CandidateColor> {
        // The selected parent is in the anticone of every candidate, so a
        // merge set that already holds k + 1 blues has no room left.
        if new_data.mergeset_blues.len() > usize::from(self.k) {
            return Ok(CandidateColor::Red);
        }

        let candidate_past = dag.closed_past(candidate)?;
        let mut anticone_blues = BTreeMap::new();
        let mut anticone_size: KType = 0;

        let mut chain_data: Option<Arc<GhostdagData>> = None;
        loop {
            let data: &GhostdagData = chain_data.as_deref().unwrap_or(new_data);
            for blue in &data.mergeset_blues {
                if candidate_past.contains(blue) {
                    continue;
                }
                if anticone_size == self.k {
                    return Ok(CandidateColor::Red);
                }
                anticone_size += 1;

                let size = blue_anticone_size(store, new_data, blue)?;
                if size == self.k {
                    return Ok(CandidateColor::Red);
                }
                anticone_blues.insert(*blue, size);
            }

            // Once a chain block is in the candidate's past, so is everything it colored.
            let next = data.selected_parent;
            match next {
                Some(parent) if !candidate_past.contains(&parent) => chain_data = Some(store.get_data(&parent)?),
                _ => break,
            }
        }

        Ok(CandidateColor::Blue { anticone_size, anticone_blues })
    }
}

impl ColoringStrategy for GreedyColoring {
    fn kind(&self) -> ColoringStrategyKind {
        ColoringStrategyKind::Greedy
    }

    fn k(&self) -> KType {
        self.k
    }

    fn color_block(&self, dag: &DagStore, store: &GhostdagStore, parents: &[Hash]) -> ConsensusResult<GhostdagData> {
        if parents.is_empty() {
            return Ok(GhostdagData::genesis());
        }

        let selected_parent = find_selected_parent(store, parents)?;
        let mut new_data = GhostdagData::new_with_selected_parent(selected_parent);

        for candidate in ordered_mergeset(dag, store, selected_parent, parents)? {
            match self.check_blue_candidate(dag, store, &new_data, &candidate)? {
                CandidateColor::Blue { anticone_size, anticone_blues } => {
                    trace!("candidate {} is blue with blue anticone size {}", candidate, anticone_size);
                    new_data.add_blue(candidate, anticone_size, &anticone_blues);
                }
                CandidateColor::Red => {
                    trace!("candidate {} is red", candidate);
                    new_data.add_red(candidate);
                }
            }
        }

        new_data.finalize_score_from_parent(store.blue_score(&selected_parent)?);
        Ok(new_data)
    }
}
