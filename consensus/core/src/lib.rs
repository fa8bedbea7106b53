//! Core types of the PHANTOM consensus: block identifiers, errors,
//! GhostDAG coloring data and configuration.

pub mod config;
pub mod constants;
pub mod errors;
pub mod ghostdag;
pub mod hash;

use std::collections::{HashMap, HashSet};

pub use hash::Hash;

/// Type of the GhostDAG K parameter and of blue anticone sizes
pub type KType = u16;

pub type BlockHashSet = HashSet<Hash>;
pub type BlockHashMap<V> = HashMap<Hash, V>;
