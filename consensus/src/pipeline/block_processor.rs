//! Block processor for consensus
//!
//! This module accepts new blocks: it validates their relations, colors them
//! and only then stores them, so a rejected block leaves no trace.

use crate::consensus::dag::DagStore;
use crate::consensus::ghostdag::GhostdagManager;
use crate::consensus::types::BlockProcessingResult;
use crate::pipeline::virtual_processor::VirtualProcessor;
use phantom_core::config::{ghostdag_k_from, ConsensusParams};
use phantom_core::errors::ConsensusResult;
use phantom_core::Hash;
use tracing::debug;

/// Block processor for consensus
pub struct BlockProcessor {
    params: ConsensusParams,
    dag: DagStore,
    ghostdag: GhostdagManager,
}

impl BlockProcessor {
    /// Create a new block processor
    pub fn new(params: ConsensusParams) -> ConsensusResult<Self> {
        params.validate()?;
        Ok(Self {
            dag: DagStore::with_flatten_threshold(params.past_flatten_threshold),
            ghostdag: GhostdagManager::new(&params),
            params,
        })
    }

    /// Process a block given by its hash and parents
    pub fn process_block(&mut self, hash: Hash, mut parents: Vec<Hash>) -> ConsensusResult<BlockProcessingResult> {
        self.dag.validate_block(hash, &parents)?;
        parents.sort();

        let data = self.ghostdag.calculate(&self.dag, &parents)?;
        let sequence = self.dag.add_block(hash, parents)?;
        let ghostdag_data = self.ghostdag.insert(hash, data);

        debug!(
            "accepted block {} (selected parent {:?}, blue score {}, {} blues, {} reds)",
            hash,
            ghostdag_data.selected_parent,
            ghostdag_data.blue_score,
            ghostdag_data.mergeset_blues.len(),
            ghostdag_data.mergeset_reds.len()
        );
        Ok(BlockProcessingResult { hash, sequence, ghostdag_data })
    }

    /// Recolor every stored block with a new k
    pub fn set_k(&mut self, k: i64) -> ConsensusResult<()> {
        let k = ghostdag_k_from(k)?;
        self.ghostdag.recolor(&self.dag, k)?;
        self.params.ghostdag_k = k;
        Ok(())
    }

    pub fn params(&self) -> &ConsensusParams {
        &self.params
    }

    pub fn dag(&self) -> &DagStore {
        &self.dag
    }

    pub fn ghostdag(&self) -> &GhostdagManager {
        &self.ghostdag
    }

    pub fn virtual_processor(&self) -> VirtualProcessor<'_> {
        VirtualProcessor::new(&self.dag, &self.ghostdag)
    }
}
