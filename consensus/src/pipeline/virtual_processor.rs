//! Virtual processor for consensus
//!
//! This module calculates the virtual state over the current DAG tips: the
//! virtual block's coloring data, the total order, and the colors and depths
//! every block has as seen from the virtual block.

use crate::consensus::dag::DagStore;
use crate::consensus::ghostdag::{Coloring, GhostdagManager};
use crate::consensus::ordering::OrderingEngine;
use crate::consensus::types::VirtualBlock;
use phantom_core::errors::ConsensusResult;
use phantom_core::ghostdag::{ColorInfo, GhostdagData};
use phantom_core::Hash;

/// Read-only view of the virtual block
pub struct VirtualProcessor<'a> {
    dag: &'a DagStore,
    ghostdag: &'a GhostdagManager,
}

impl<'a> VirtualProcessor<'a> {
    pub fn new(dag: &'a DagStore, ghostdag: &'a GhostdagManager) -> Self {
        Self { dag, ghostdag }
    }

    /// Parents of the virtual block, the current tips in ascending order
    pub fn virtual_parents(&self) -> Vec<Hash> {
        self.dag.tips()
    }

    pub fn virtual_data(&self) -> ConsensusResult<Option<GhostdagData>> {
        self.ghostdag.virtual_data(self.dag)
    }

    /// The virtual block with its order, `None` for an empty DAG
    pub fn virtual_block(&self) -> ConsensusResult<Option<VirtualBlock>> {
        let Some(ghostdag_data) = self.virtual_data()? else {
            return Ok(None);
        };
        let order = OrderingEngine::new(self.dag, self.ghostdag.store()).total_order(&ghostdag_data)?;
        Ok(Some(VirtualBlock { parents: self.virtual_parents(), ghostdag_data, order }))
    }

    pub fn total_order(&self) -> ConsensusResult<Vec<Hash>> {
        Ok(self.virtual_block()?.map(|block| block.order).unwrap_or_default())
    }

    pub fn coloring(&self) -> ConsensusResult<Coloring> {
        self.ghostdag.coloring(self.dag)
    }

    pub fn color_info(&self, hash: &Hash) -> ConsensusResult<ColorInfo> {
        self.ghostdag.color_info(self.dag, hash)
    }

    /// Confirmation depth of a stored block
    pub fn depth(&self, hash: &Hash) -> ConsensusResult<u64> {
        Ok(self.color_info(hash)?.depth)
    }

    pub fn is_final(&self, hash: &Hash) -> ConsensusResult<bool> {
        Ok(self.color_info(hash)?.is_final)
    }

    pub fn is_a_before_b(&self, a: &Hash, b: &Hash) -> ConsensusResult<Option<bool>> {
        let order = self.total_order()?;
        Ok(OrderingEngine::new(self.dag, self.ghostdag.store()).is_a_before_b(&order, a, b))
    }

    /// Blue blocks in the past of the virtual block
    pub fn blue_set(&self) -> ConsensusResult<Vec<Hash>> {
        let Some(data) = self.virtual_data()? else {
            return Ok(Vec::new());
        };
        let mut blues: Vec<Hash> = self.ghostdag.blue_past(&data)?.iter().copied().collect();
        blues.sort();
        Ok(blues)
    }
}
