use phantom_core::constants::DEFAULT_PAST_FLATTEN_THRESHOLD;
use phantom_core::errors::{ConsensusError, ConsensusResult};
use phantom_core::{BlockHashMap, BlockHashSet, Hash};
use phantom_utils::LazySet;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use tracing::trace;

/// Arena entry of a stored block.
pub struct BlockRecord {
    hash: Hash,
    parents: Vec<Hash>,
    children: Vec<Hash>,
    sequence: u64,
    /// The block itself and all of its ancestors
    closed_past: LazySet<Hash>,
    closed_past_size: usize,
}

impl BlockRecord {
    pub fn hash(&self) -> Hash {
        self.hash
    }

    /// Parents in ascending order
    pub fn parents(&self) -> &[Hash] {
        &self.parents
    }

    /// Children in insertion order
    pub fn children(&self) -> &[Hash] {
        &self.children
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn closed_past(&self) -> &LazySet<Hash> {
        &self.closed_past
    }
}

/// Append-only block-DAG store.
///
/// Records live in an arena indexed by hash. Each record keeps its closed
/// past as a lazy chain on top of the closed past of its main parent (the
/// parent with the largest past), so inserting a block costs a walk over the
/// blocks its other parents bring in rather than a copy of its whole past.
/// Chains are compacted from the newest end, which keeps about log2(n)
/// shared layers per record and O(n log n) stored hashes along a chain.
pub struct DagStore {
    records: Vec<BlockRecord>,
    index: BlockHashMap<usize>,
    tips: BTreeSet<Hash>,
    past_flatten_threshold: usize,
}

impl Default for DagStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DagStore {
    pub fn new() -> Self {
        Self::with_flatten_threshold(DEFAULT_PAST_FLATTEN_THRESHOLD)
    }

    /// Past chains are kept to at most `threshold` layers.
    pub fn with_flatten_threshold(threshold: usize) -> Self {
        Self { records: Vec::new(), index: BlockHashMap::new(), tips: BTreeSet::new(), past_flatten_threshold: threshold.max(1) }
    }

    /// Checks that `hash` can be inserted with `parents` without touching the store.
    pub fn validate_block(&self, hash: Hash, parents: &[Hash]) -> ConsensusResult<()> {
        if self.contains(&hash) {
            return Err(ConsensusError::DuplicateBlock(hash));
        }
        if parents.contains(&hash) {
            return Err(ConsensusError::InconsistentDag(format!("block {} lists itself as a parent", hash)));
        }

        let mut sorted = parents.to_vec();
        sorted.sort();
        if let Some(pair) = sorted.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(ConsensusError::InconsistentDag(format!("block {} lists parent {} twice", hash, pair[0])));
        }
        if let Some(missing) = sorted.iter().find(|parent| !self.contains(parent)) {
            return Err(ConsensusError::UnknownParent { block: hash, parent: *missing });
        }
        if parents.is_empty() {
            if let Some(genesis) = self.genesis() {
                return Err(ConsensusError::InconsistentDag(format!(
                    "block {} has no parents but genesis {} is already stored",
                    hash, genesis
                )));
            }
        }
        Ok(())
    }

    /// Inserts a block and returns its insertion sequence. The insert is
    /// atomic: on error the store is unchanged.
    pub fn add_block(&mut self, hash: Hash, mut parents: Vec<Hash>) -> ConsensusResult<u64> {
        self.validate_block(hash, &parents)?;
        parents.sort();

        let (closed_past, closed_past_size) = self.build_closed_past(hash, &parents);
        let sequence = self.records.len() as u64;

        for parent in &parents {
            if let Some(&position) = self.index.get(parent) {
                self.records[position].children.push(hash);
            }
            self.tips.remove(parent);
        }
        self.tips.insert(hash);
        self.index.insert(hash, self.records.len());

        trace!("stored block {} with {} parents, past size {}", hash, parents.len(), closed_past_size - 1);
        self.records.push(BlockRecord { hash, parents, children: Vec::new(), sequence, closed_past, closed_past_size });
        Ok(sequence)
    }

    fn build_closed_past(&self, hash: Hash, parents: &[Hash]) -> (LazySet<Hash>, usize) {
        let main_parent = parents
            .iter()
            .filter_map(|parent| self.record(parent))
            .max_by(|a, b| a.closed_past_size.cmp(&b.closed_past_size).then_with(|| b.hash.cmp(&a.hash)));

        let Some(main_parent) = main_parent else {
            return (LazySet::from_set(BlockHashSet::from([hash])), 1);
        };

        let base = &main_parent.closed_past;
        let mut diff = BlockHashSet::from([hash]);
        let mut queue: VecDeque<Hash> = parents.iter().filter(|parent| **parent != main_parent.hash).copied().collect();
        while let Some(current) = queue.pop_front() {
            if base.contains(&current) || !diff.insert(current) {
                continue;
            }
            if let Some(record) = self.record(&current) {
                queue.extend(record.parents.iter().copied());
            }
        }

        let closed_past_size = main_parent.closed_past_size + diff.len();
        (base.union(Arc::new(diff)).compacted(self.past_flatten_threshold), closed_past_size)
    }

    fn record(&self, hash: &Hash) -> Option<&BlockRecord> {
        self.index.get(hash).map(|&position| &self.records[position])
    }

    pub fn get(&self, hash: &Hash) -> ConsensusResult<&BlockRecord> {
        self.record(hash).ok_or(ConsensusError::UnknownBlock(*hash))
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.index.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn genesis(&self) -> Option<Hash> {
        self.records.first().map(|record| record.hash)
    }

    pub fn parents(&self, hash: &Hash) -> ConsensusResult<&[Hash]> {
        Ok(self.get(hash)?.parents())
    }

    pub fn children(&self, hash: &Hash) -> ConsensusResult<&[Hash]> {
        Ok(self.get(hash)?.children())
    }

    pub fn sequence(&self, hash: &Hash) -> ConsensusResult<u64> {
        Ok(self.get(hash)?.sequence)
    }

    /// Blocks without children, ascending.
    pub fn tips(&self) -> Vec<Hash> {
        self.tips.iter().copied().collect()
    }

    /// All blocks in insertion order, which is a topological order.
    pub fn iter(&self) -> impl Iterator<Item = &Hash> + '_ {
        self.records.iter().map(|record| &record.hash)
    }

    pub fn closed_past(&self, hash: &Hash) -> ConsensusResult<&LazySet<Hash>> {
        Ok(self.get(hash)?.closed_past())
    }

    /// Strict ancestors of `hash`.
    pub fn past(&self, hash: &Hash) -> ConsensusResult<LazySet<Hash>> {
        let record = self.get(hash)?;
        Ok(record.closed_past.difference(Arc::new(BlockHashSet::from([*hash]))))
    }

    pub fn past_size(&self, hash: &Hash) -> ConsensusResult<usize> {
        Ok(self.get(hash)?.closed_past_size - 1)
    }

    /// Whether `ancestor` is in the strict past of `descendant`.
    pub fn is_dag_ancestor_of(&self, ancestor: &Hash, descendant: &Hash) -> ConsensusResult<bool> {
        if !self.contains(ancestor) {
            return Err(ConsensusError::UnknownBlock(*ancestor));
        }
        Ok(ancestor != descendant && self.get(descendant)?.closed_past.contains(ancestor))
    }
}
