use phantom_core::errors::{ConsensusError, ConsensusResult};
use phantom_core::ghostdag::GhostdagData;
use phantom_core::{BlockHashMap, Hash};
use std::sync::Arc;

/// Coloring data of every colored block.
///
/// Only the coloring engine writes here. Synchronization is left to the
/// owner of the store.
#[derive(Clone, Default)]
pub struct GhostdagStore {
    data: BlockHashMap<Arc<GhostdagData>>,
}

impl GhostdagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, hash: Hash, data: GhostdagData) -> Arc<GhostdagData> {
        let data = Arc::new(data);
        self.data.insert(hash, Arc::clone(&data));
        data
    }

    pub fn get(&self, hash: &Hash) -> Option<Arc<GhostdagData>> {
        self.data.get(hash).cloned()
    }

    /// Like [`get`](Self::get), for blocks that must have been colored already.
    pub fn get_data(&self, hash: &Hash) -> ConsensusResult<Arc<GhostdagData>> {
        self.get(hash).ok_or_else(|| ConsensusError::InconsistentDag(format!("block {} has not been colored", hash)))
    }

    pub fn blue_score(&self, hash: &Hash) -> ConsensusResult<u64> {
        Ok(self.get_data(hash)?.blue_score)
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.data.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}
