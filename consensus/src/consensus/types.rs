//! Consensus-specific types
//!
//! This module defines types returned by the block pipeline and the
//! consensus manager.

use phantom_core::ghostdag::GhostdagData;
use phantom_core::Hash;
use serde::Serialize;
use std::sync::Arc;

/// Block processing result
#[derive(Debug, Clone)]
pub struct BlockProcessingResult {
    /// Block hash
    pub hash: Hash,
    /// Insertion sequence number in the DAG store
    pub sequence: u64,
    /// Coloring data computed for the block
    pub ghostdag_data: Arc<GhostdagData>,
}

/// The virtual block over the current tips and the order it implies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualBlock {
    /// Current tips in ascending order
    pub parents: Vec<Hash>,
    pub ghostdag_data: GhostdagData,
    /// Total order of every block in the past of the virtual block
    pub order: Vec<Hash>,
}

impl VirtualBlock {
    pub fn selected_parent(&self) -> Option<Hash> {
        self.ghostdag_data.selected_parent
    }

    pub fn blue_score(&self) -> u64 {
        self.ghostdag_data.blue_score
    }
}
