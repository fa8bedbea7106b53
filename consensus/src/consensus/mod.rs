//! Consensus module for the PHANTOM block DAG
//!
//! This module implements the DAG store, the GhostDAG coloring of its
//! blocks, and the total order derived from the coloring.

pub mod dag;
pub mod ghostdag;
pub mod ordering;
pub mod types;

pub use dag::{BlockRecord, DagStore, DagTopology};
pub use ghostdag::{Coloring, ColoringStrategy, ExactColoring, GhostdagManager, GhostdagStore, GreedyColoring, MaxClusterSearch};
pub use ordering::OrderingEngine;
pub use types::{BlockProcessingResult, VirtualBlock};
