//! DAG (Directed Acyclic Graph) management for BlockDAG consensus
//!
//! This module provides:
//! - Append-only block storage with parent/children relations
//! - Lazily chained past sets for ancestor queries
//! - DAG topology operations (future, anticone, ordering)

pub mod relations;
pub mod topology;

pub use relations::{BlockRecord, DagStore};
pub use topology::DagTopology;
