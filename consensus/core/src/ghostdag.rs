use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Hash, KType};

/// GhostDAG coloring data of a single block.
///
/// The data is a function of the block's past only, so it is computed once
/// when the block is added and never changes for a fixed K.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GhostdagData {
    /// Number of blue blocks in the past of this block
    pub blue_score: u64,
    /// Parent with the highest blue score, `None` for genesis
    pub selected_parent: Option<Hash>,
    /// Blue blocks of the merge set, selected parent first, then in candidate order
    pub mergeset_blues: Vec<Hash>,
    /// Red blocks of the merge set in candidate order
    pub mergeset_reds: Vec<Hash>,
    /// Blue anticone sizes of the blues this block added or updated
    pub blues_anticone_sizes: BTreeMap<Hash, KType>,
}

impl GhostdagData {
    pub fn genesis() -> Self {
        Self::default()
    }

    /// Starts the data of a block whose selected parent is `selected_parent`.
    /// The selected parent is the first blue of the merge set and has an
    /// empty blue anticone from the new block's point of view.
    pub fn new_with_selected_parent(selected_parent: Hash) -> Self {
        Self {
            blue_score: 0,
            selected_parent: Some(selected_parent),
            mergeset_blues: vec![selected_parent],
            mergeset_reds: Vec::new(),
            blues_anticone_sizes: BTreeMap::from([(selected_parent, 0)]),
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.selected_parent.is_none()
    }

    /// Colors `block` blue and bumps the sizes of the blues in its anticone.
    pub fn add_blue(&mut self, block: Hash, blue_anticone_size: KType, anticone_blues: &BTreeMap<Hash, KType>) {
        self.mergeset_blues.push(block);
        self.blues_anticone_sizes.insert(block, blue_anticone_size);
        for (blue, size) in anticone_blues {
            self.blues_anticone_sizes.insert(*blue, size + 1);
        }
    }

    pub fn add_red(&mut self, block: Hash) {
        self.mergeset_reds.push(block);
    }

    /// Sets the blue score from the selected parent's score; the selected
    /// parent itself is counted through `mergeset_blues`.
    pub fn finalize_score_from_parent(&mut self, selected_parent_blue_score: u64) {
        self.blue_score = selected_parent_blue_score + self.mergeset_blues.len() as u64;
    }

    pub fn mergeset_size(&self) -> usize {
        self.mergeset_blues.len() + self.mergeset_reds.len()
    }

    pub fn unordered_mergeset(&self) -> impl Iterator<Item = &Hash> + '_ {
        self.mergeset_blues.iter().chain(self.mergeset_reds.iter())
    }

    pub fn unordered_mergeset_without_selected_parent(&self) -> impl Iterator<Item = &Hash> + '_ {
        self.mergeset_blues.iter().skip(1).chain(self.mergeset_reds.iter())
    }

    pub fn is_mergeset_blue(&self, block: &Hash) -> bool {
        self.mergeset_blues.contains(block)
    }
}

/// Color of a block as seen from the virtual block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockColor {
    /// Stored but not colored yet
    Unknown,
    Blue,
    Red,
}

impl BlockColor {
    pub fn is_blue(&self) -> bool {
        matches!(self, Self::Blue)
    }
}

/// Per-block coloring annotation reported to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorInfo {
    pub color: BlockColor,
    pub blue_score: u64,
    /// Blue score accumulated on top of the chain block that merged this block
    pub depth: u64,
    /// Whether `depth` reached the finality depth
    pub is_final: bool,
}

impl ColorInfo {
    pub fn unknown() -> Self {
        Self { color: BlockColor::Unknown, blue_score: 0, depth: 0, is_final: false }
    }
}
