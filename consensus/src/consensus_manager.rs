use crate::consensus::dag::DagTopology;
use crate::consensus::ghostdag::Coloring;
use crate::consensus::types::{BlockProcessingResult, VirtualBlock};
use crate::pipeline::BlockProcessor;
use parking_lot::RwLock;
use phantom_core::config::{ConsensusConfig, ConsensusParams};
use phantom_core::errors::ConsensusResult;
use phantom_core::ghostdag::{ColorInfo, GhostdagData};
use phantom_core::{Hash, KType};
use phantom_utils::LazySet;
use std::sync::Arc;
use tracing::info;

/// Consensus manager that coordinates all consensus components
///
/// Writers (`add_block`, `set_k`) are serialized by a single lock. Readers
/// run concurrently and always see the DAG between two writes.
pub struct ConsensusManager {
    block_processor: RwLock<BlockProcessor>,
}

impl ConsensusManager {
    /// Create a new consensus manager
    pub fn new(params: ConsensusParams) -> ConsensusResult<Self> {
        info!(
            "starting consensus with k = {}, {} coloring, finality depth {}",
            params.ghostdag_k, params.coloring_strategy, params.finality_depth
        );
        Ok(Self { block_processor: RwLock::new(BlockProcessor::new(params)?) })
    }

    pub fn from_config(config: &ConsensusConfig) -> ConsensusResult<Self> {
        Self::new(config.to_params()?)
    }

    /// Adds a block; the first block without parents is genesis
    pub fn add_block(&self, hash: Hash, parents: Vec<Hash>) -> ConsensusResult<BlockProcessingResult> {
        self.block_processor.write().process_block(hash, parents)
    }

    /// Recolors the whole DAG with a new k
    pub fn set_k(&self, k: i64) -> ConsensusResult<()> {
        self.block_processor.write().set_k(k)
    }

    pub fn k(&self) -> KType {
        self.block_processor.read().params().ghostdag_k
    }

    pub fn params(&self) -> ConsensusParams {
        self.block_processor.read().params().clone()
    }

    pub fn len(&self) -> usize {
        self.block_processor.read().dag().len()
    }

    pub fn is_empty(&self) -> bool {
        self.block_processor.read().dag().is_empty()
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.block_processor.read().dag().contains(hash)
    }

    pub fn genesis(&self) -> Option<Hash> {
        self.block_processor.read().dag().genesis()
    }

    /// Current tips in ascending order
    pub fn tips(&self) -> Vec<Hash> {
        self.block_processor.read().dag().tips()
    }

    pub fn parents(&self, hash: &Hash) -> ConsensusResult<Vec<Hash>> {
        Ok(self.block_processor.read().dag().parents(hash)?.to_vec())
    }

    pub fn past(&self, hash: &Hash) -> ConsensusResult<LazySet<Hash>> {
        self.block_processor.read().dag().past(hash)
    }

    pub fn future(&self, hash: &Hash) -> ConsensusResult<LazySet<Hash>> {
        let processor = self.block_processor.read();
        DagTopology::new(processor.dag()).future(hash)
    }

    pub fn anticone(&self, hash: &Hash) -> ConsensusResult<LazySet<Hash>> {
        let processor = self.block_processor.read();
        DagTopology::new(processor.dag()).anticone(hash)
    }

    /// Color, blue score and depth of a block as seen from the virtual block
    pub fn color(&self, hash: &Hash) -> ConsensusResult<ColorInfo> {
        self.block_processor.read().virtual_processor().color_info(hash)
    }

    pub fn coloring(&self) -> ConsensusResult<Coloring> {
        self.block_processor.read().virtual_processor().coloring()
    }

    pub fn blue_set(&self) -> ConsensusResult<Vec<Hash>> {
        self.block_processor.read().virtual_processor().blue_set()
    }

    pub fn ghostdag_data(&self, hash: &Hash) -> Option<Arc<GhostdagData>> {
        self.block_processor.read().ghostdag().ghostdag_data(hash)
    }

    pub fn total_order(&self) -> ConsensusResult<Vec<Hash>> {
        self.block_processor.read().virtual_processor().total_order()
    }

    pub fn virtual_block(&self) -> ConsensusResult<Option<VirtualBlock>> {
        self.block_processor.read().virtual_processor().virtual_block()
    }

    pub fn depth(&self, hash: &Hash) -> ConsensusResult<u64> {
        self.block_processor.read().virtual_processor().depth(hash)
    }

    pub fn is_final(&self, hash: &Hash) -> ConsensusResult<bool> {
        self.block_processor.read().virtual_processor().is_final(hash)
    }

    /// `None` if neither block is stored, otherwise whether `a` is ordered
    /// no later than `b`
    pub fn is_a_before_b(&self, a: &Hash, b: &Hash) -> ConsensusResult<Option<bool>> {
        self.block_processor.read().virtual_processor().is_a_before_b(a, b)
    }
}
