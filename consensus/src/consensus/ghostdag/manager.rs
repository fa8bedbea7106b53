use super::exact::ExactColoring;
use super::protocol::{ColoringStrategy, GreedyColoring};
use super::stores::GhostdagStore;
use crate::consensus::dag::DagStore;
use phantom_core::config::{ColoringStrategyKind, ConsensusParams};
use phantom_core::errors::{ConsensusError, ConsensusResult};
use phantom_core::ghostdag::{BlockColor, ColorInfo, GhostdagData};
use phantom_core::{BlockHashMap, BlockHashSet, Hash, KType};
use phantom_utils::LazySet;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::info;

fn build_strategy(kind: ColoringStrategyKind, k: KType, exact_search_budget: u64) -> Box<dyn ColoringStrategy> {
    match kind {
        ColoringStrategyKind::Greedy => Box::new(GreedyColoring::new(k)),
        ColoringStrategyKind::Exact => Box::new(ExactColoring::new(k, exact_search_budget)),
    }
}

/// Colors blocks incrementally and answers questions about the coloring as
/// seen from the virtual block.
pub struct GhostdagManager {
    strategy: Box<dyn ColoringStrategy>,
    store: GhostdagStore,
    exact_search_budget: u64,
    finality_depth: u64,
}

impl GhostdagManager {
    pub fn new(params: &ConsensusParams) -> Self {
        Self {
            strategy: build_strategy(params.coloring_strategy, params.ghostdag_k, params.exact_search_budget),
            store: GhostdagStore::new(),
            exact_search_budget: params.exact_search_budget,
            finality_depth: params.finality_depth,
        }
    }

    pub fn k(&self) -> KType {
        self.strategy.k()
    }

    pub fn strategy_kind(&self) -> ColoringStrategyKind {
        self.strategy.kind()
    }

    pub fn finality_depth(&self) -> u64 {
        self.finality_depth
    }

    pub fn store(&self) -> &GhostdagStore {
        &self.store
    }

    pub fn ghostdag_data(&self, hash: &Hash) -> Option<Arc<GhostdagData>> {
        self.store.get(hash)
    }

    /// Computes the coloring data of a block with `parents` without storing it.
    pub fn calculate(&self, dag: &DagStore, parents: &[Hash]) -> ConsensusResult<GhostdagData> {
        if let Some(parent) = parents.iter().find(|parent| !self.store.contains(parent)) {
            return Err(ConsensusError::InconsistentDag(format!("parent {} has not been colored", parent)));
        }
        self.strategy.color_block(dag, &self.store, parents)
    }

    pub fn insert(&mut self, hash: Hash, data: GhostdagData) -> Arc<GhostdagData> {
        self.store.insert(hash, data)
    }

    /// Colors a block that is already in `dag`.
    pub fn add_block(&mut self, dag: &DagStore, hash: &Hash) -> ConsensusResult<Arc<GhostdagData>> {
        let data = self.calculate(dag, dag.parents(hash)?)?;
        Ok(self.insert(*hash, data))
    }

    /// Colors every block of `dag` that has no coloring yet.
    pub fn color_all(&mut self, dag: &DagStore) -> ConsensusResult<()> {
        for hash in dag.iter() {
            if !self.store.contains(hash) {
                self.add_block(dag, hash)?;
            }
        }
        Ok(())
    }

    /// Recolors the whole DAG with a new k. On failure the previous strategy
    /// and coloring are kept.
    pub fn recolor(&mut self, dag: &DagStore, k: KType) -> ConsensusResult<()> {
        let strategy = build_strategy(self.strategy.kind(), k, self.exact_search_budget);
        let previous_strategy = std::mem::replace(&mut self.strategy, strategy);
        let previous_store = std::mem::take(&mut self.store);

        if let Err(err) = self.color_all(dag) {
            self.strategy = previous_strategy;
            self.store = previous_store;
            return Err(err);
        }
        info!("recolored {} blocks with k = {}", self.store.len(), k);
        Ok(())
    }

    /// Coloring data of the virtual block over the current tips, `None` for
    /// an empty DAG.
    pub fn virtual_data(&self, dag: &DagStore) -> ConsensusResult<Option<GhostdagData>> {
        if dag.is_empty() {
            return Ok(None);
        }
        self.calculate(dag, &dag.tips()).map(Some)
    }

    /// Blue blocks in the past of a block with coloring `data`: the merge
    /// set blues along its selected chain, collected into one set.
    pub fn blue_past(&self, data: &GhostdagData) -> ConsensusResult<LazySet<Hash>> {
        let mut blues: BlockHashSet = data.mergeset_blues.iter().copied().collect();
        let mut current = data.selected_parent;
        while let Some(hash) = current {
            let chain_data = self.store.get_data(&hash)?;
            blues.extend(chain_data.mergeset_blues.iter().copied());
            current = chain_data.selected_parent;
        }
        Ok(LazySet::from_set(blues))
    }

    /// Selected chain of a block with coloring `data`, genesis first and
    /// ending at its selected parent.
    pub fn selected_chain(&self, data: &GhostdagData) -> ConsensusResult<Vec<Hash>> {
        let mut chain = Vec::new();
        let mut current = data.selected_parent;
        while let Some(hash) = current {
            chain.push(hash);
            current = self.store.get_data(&hash)?.selected_parent;
        }
        chain.reverse();
        Ok(chain)
    }

    fn color_info_at(&self, data: &GhostdagData, color: BlockColor, merger_score: u64, virtual_score: u64) -> ColorInfo {
        let depth = virtual_score - merger_score;
        ColorInfo { color, blue_score: data.blue_score, depth, is_final: depth >= self.finality_depth }
    }

    /// Colors, blue scores and confirmation depths of every block as seen
    /// from the virtual block.
    pub fn coloring(&self, dag: &DagStore) -> ConsensusResult<Coloring> {
        let virtual_data = match self.virtual_data(dag)? {
            Some(data) => data,
            None => return Ok(Coloring::default()),
        };
        let virtual_score = virtual_data.blue_score;

        // Color and blue score of the chain block (or the virtual block) merging each block
        let mut merged_at: BlockHashMap<(BlockColor, u64)> = BlockHashMap::new();
        let mut record = |data: &GhostdagData| {
            merged_at.extend(data.mergeset_blues.iter().map(|hash| (*hash, (BlockColor::Blue, data.blue_score))));
            merged_at.extend(data.mergeset_reds.iter().map(|hash| (*hash, (BlockColor::Red, data.blue_score))));
        };
        record(&virtual_data);
        let mut current = virtual_data.selected_parent;
        while let Some(hash) = current {
            let data = self.store.get_data(&hash)?;
            record(data.as_ref());
            current = data.selected_parent;
        }

        let mut blocks = BTreeMap::new();
        for hash in dag.iter() {
            let info = match (self.store.get(hash), merged_at.get(hash)) {
                (Some(data), Some(&(color, merger_score))) => self.color_info_at(&data, color, merger_score, virtual_score),
                _ => ColorInfo::unknown(),
            };
            blocks.insert(*hash, info);
        }

        Ok(Coloring { virtual_data: Some(virtual_data), blocks })
    }

    /// Color of a single block, found by walking the virtual block's selected
    /// chain down to the chain block that merged it.
    pub fn color_info(&self, dag: &DagStore, hash: &Hash) -> ConsensusResult<ColorInfo> {
        if !dag.contains(hash) {
            return Err(ConsensusError::UnknownBlock(*hash));
        }
        let (Some(virtual_data), Some(data)) = (self.virtual_data(dag)?, self.store.get(hash)) else {
            return Ok(ColorInfo::unknown());
        };
        let virtual_score = virtual_data.blue_score;

        let mut merger: Arc<GhostdagData> = Arc::new(virtual_data);
        loop {
            if merger.is_mergeset_blue(hash) {
                return Ok(self.color_info_at(&data, BlockColor::Blue, merger.blue_score, virtual_score));
            }
            if merger.mergeset_reds.contains(hash) {
                return Ok(self.color_info_at(&data, BlockColor::Red, merger.blue_score, virtual_score));
            }
            let Some(parent) = merger.selected_parent else {
                return Ok(ColorInfo::unknown());
            };
            merger = self.store.get_data(&parent)?;
            // Blue scores grow along every edge, a block is only merged above its own score
            if merger.blue_score <= data.blue_score {
                return Ok(ColorInfo::unknown());
            }
        }
    }
}

/// Colors every block of a DAG from scratch.
pub fn color(dag: &DagStore, params: &ConsensusParams) -> ConsensusResult<Coloring> {
    params.validate()?;
    let mut manager = GhostdagManager::new(params);
    manager.color_all(dag)?;
    manager.coloring(dag)
}

/// A coloring snapshot of a whole DAG.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Coloring {
    pub virtual_data: Option<GhostdagData>,
    pub blocks: BTreeMap<Hash, ColorInfo>,
}

impl Coloring {
    pub fn get(&self, hash: &Hash) -> ColorInfo {
        self.blocks.get(hash).copied().unwrap_or_else(ColorInfo::unknown)
    }

    pub fn is_blue(&self, hash: &Hash) -> bool {
        self.get(hash).color.is_blue()
    }

    pub fn blue_set(&self) -> BTreeSet<Hash> {
        self.with_color(BlockColor::Blue)
    }

    pub fn red_set(&self) -> BTreeSet<Hash> {
        self.with_color(BlockColor::Red)
    }

    fn with_color(&self, color: BlockColor) -> BTreeSet<Hash> {
        self.blocks.iter().filter(|(_, info)| info.color == color).map(|(hash, _)| *hash).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(n: u64) -> Hash {
        Hash::from_u64_word(n)
    }

    fn params(k: i64) -> ConsensusParams {
        ConsensusParams::with_k(k).unwrap().with_finality_depth(2)
    }

    fn build(manager: &mut GhostdagManager, blocks: &[(u64, &[u64])]) -> DagStore {
        let mut dag = DagStore::new();
        for (id, parents) in blocks {
            dag.add_block(h(*id), parents.iter().map(|p| h(*p)).collect()).unwrap();
            manager.add_block(&dag, &h(*id)).unwrap();
        }
        dag
    }

    #[test]
    fn test_empty_dag() {
        let manager = GhostdagManager::new(&params(18));
        let dag = DagStore::new();
        assert!(manager.virtual_data(&dag).unwrap().is_none());
        assert_eq!(manager.coloring(&dag).unwrap(), Coloring::default());
    }

    #[test]
    fn test_chain_depth_and_finality() {
        let mut manager = GhostdagManager::new(&params(18));
        let dag = build(&mut manager, &[(0, &[]), (1, &[0]), (2, &[1]), (3, &[2])]);
        let coloring = manager.coloring(&dag).unwrap();

        let virtual_data = coloring.virtual_data.as_ref().unwrap();
        assert_eq!(virtual_data.selected_parent, Some(h(3)));
        assert_eq!(virtual_data.blue_score, 4);
        assert_eq!(manager.selected_chain(virtual_data).unwrap(), vec![h(0), h(1), h(2), h(3)]);

        let depths: Vec<u64> = (0..4).map(|id| coloring.get(&h(id)).depth).collect();
        assert_eq!(depths, vec![3, 2, 1, 0]);
        assert!(coloring.get(&h(0)).is_final);
        assert!(coloring.get(&h(1)).is_final);
        assert!(!coloring.get(&h(2)).is_final);
        assert_eq!(coloring.blue_set().len(), 4);
        assert!(coloring.red_set().is_empty());
    }

    #[test]
    fn test_blue_past_and_colors() {
        let mut manager = GhostdagManager::new(&params(1));
        let dag = build(&mut manager, &[(0, &[]), (1, &[0]), (2, &[0]), (3, &[0]), (4, &[1, 2, 3])]);
        let data = manager.ghostdag_data(&h(4)).unwrap();
        let blue_past = manager.blue_past(&data).unwrap();
        assert_eq!(blue_past.flatten(), [h(0), h(1), h(2)].into_iter().collect());

        let coloring = manager.coloring(&dag).unwrap();
        assert_eq!(coloring.red_set(), BTreeSet::from([h(3)]));
        assert!(coloring.is_blue(&h(4)));
        assert_eq!(manager.color_info(&dag, &h(3)).unwrap().color, BlockColor::Red);
        assert!(matches!(manager.color_info(&dag, &h(9)), Err(ConsensusError::UnknownBlock(_))));
    }

    #[test]
    fn test_uncolored_parent() {
        let manager = GhostdagManager::new(&params(18));
        let mut dag = DagStore::new();
        dag.add_block(h(0), vec![]).unwrap();
        assert!(matches!(manager.calculate(&dag, &[h(0)]), Err(ConsensusError::InconsistentDag(_))));
        assert!(manager.coloring(&dag).is_err());
    }

    #[test]
    fn test_recolor() {
        let mut manager = GhostdagManager::new(&params(1));
        let dag = build(&mut manager, &[(0, &[]), (1, &[0]), (2, &[0]), (3, &[0]), (4, &[1, 2, 3])]);
        assert_eq!(manager.coloring(&dag).unwrap().red_set().len(), 1);

        manager.recolor(&dag, 2).unwrap();
        assert_eq!(manager.k(), 2);
        assert!(manager.coloring(&dag).unwrap().red_set().is_empty());
        assert_eq!(manager.store().len(), 5);
    }

    #[test]
    fn test_recolor_failure_keeps_coloring() {
        let exact = ConsensusParams::with_k(2)
            .unwrap()
            .with_strategy(ColoringStrategyKind::Exact)
            .with_exact_search_budget(3);
        let mut manager = GhostdagManager::new(&exact);
        let dag = build(
            &mut manager,
            &[(0, &[]), (1, &[0]), (2, &[0]), (3, &[1, 2]), (4, &[0]), (5, &[0]), (6, &[3, 4, 5])],
        );
        let before = manager.coloring(&dag).unwrap();
        assert_eq!(before.red_set(), BTreeSet::from([h(4), h(5)]));

        // with k = 3 block 4 becomes a candidate and the search outgrows the budget
        assert!(matches!(manager.recolor(&dag, 3), Err(ConsensusError::SearchBudgetExceeded { budget: 3 })));
        assert_eq!(manager.k(), 2);
        assert_eq!(manager.store().len(), 7);
        assert_eq!(manager.coloring(&dag).unwrap(), before);
    }

    #[test]
    fn test_color_info_matches_coloring() {
        let mut manager = GhostdagManager::new(&params(1));
        let dag = build(
            &mut manager,
            &[
                (0, &[]),
                (1, &[0]),
                (2, &[0]),
                (3, &[0]),
                (4, &[1, 2, 3]),
                (5, &[4]),
                (6, &[2]),
                (7, &[5, 6]),
                (8, &[7]),
                (9, &[3]),
            ],
        );
        let coloring = manager.coloring(&dag).unwrap();
        assert!(!coloring.red_set().is_empty());
        for id in 0..10 {
            assert_eq!(manager.color_info(&dag, &h(id)).unwrap(), coloring.get(&h(id)), "block {}", id);
        }
    }

    #[test]
    fn test_color_info_on_long_chain() {
        let mut manager = GhostdagManager::new(&params(18));
        let mut dag = DagStore::new();
        let count = 20_000u64;
        dag.add_block(h(0), vec![]).unwrap();
        manager.add_block(&dag, &h(0)).unwrap();
        for id in 1..count {
            dag.add_block(h(id), vec![h(id - 1)]).unwrap();
            manager.add_block(&dag, &h(id)).unwrap();
        }

        let genesis = manager.color_info(&dag, &h(0)).unwrap();
        assert_eq!(genesis.color, BlockColor::Blue);
        assert_eq!(genesis.depth, count - 1);
        assert!(genesis.is_final);

        let tip = manager.color_info(&dag, &h(count - 1)).unwrap();
        assert_eq!((tip.depth, tip.blue_score), (0, count - 1));
        assert!(!tip.is_final);

        let data = manager.ghostdag_data(&h(count - 1)).unwrap();
        let blue_past = manager.blue_past(&data).unwrap();
        assert_eq!(blue_past.layer_count(), 1);
        assert_eq!(blue_past.len(), count as usize - 1);
    }

    #[test]
    fn test_color_snapshot() {
        let mut dag = DagStore::new();
        for (id, parents) in [(0u64, vec![]), (1, vec![0]), (2, vec![0]), (3, vec![1, 2])] {
            dag.add_block(h(id), parents.into_iter().map(h).collect()).unwrap();
        }
        let coloring = color(&dag, &params(0)).unwrap();
        assert_eq!(coloring.blue_set(), BTreeSet::from([h(0), h(1), h(3)]));
        assert_eq!(coloring.red_set(), BTreeSet::from([h(2)]));
        assert_eq!(coloring.get(&h(2)).depth, 1);
    }
}
