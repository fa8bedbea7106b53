//! Consensus library for the PHANTOM block DAG
//!
//! This library colors the blocks of a DAG blue or red with the GhostDAG
//! rules, either greedily or exactly, and derives a total order from the
//! coloring.

pub mod consensus;
pub mod consensus_manager;
pub mod pipeline;

// Re-export key types for easier access
pub use consensus::dag::{DagStore, DagTopology};
pub use consensus::ghostdag::{color, Coloring, ColoringStrategy, GhostdagManager, GhostdagStore};
pub use consensus::ordering::OrderingEngine;
pub use consensus::types::{BlockProcessingResult, VirtualBlock};
pub use consensus_manager::ConsensusManager;
pub use phantom_core::Hash;

// Re-export pipeline types
pub use pipeline::{BlockProcessor, VirtualProcessor};
