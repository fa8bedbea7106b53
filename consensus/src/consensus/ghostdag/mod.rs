//! GhostDAG coloring of the block DAG
//!
//! This module implements the coloring rules (greedy and exact), the
//! per-block coloring store, and the manager that colors blocks as they
//! arrive and reports colors as seen from the virtual block.

pub mod exact;
pub mod manager;
pub mod protocol;
pub mod stores;

pub use exact::{is_k_cluster, ExactColoring, MaxClusterSearch};
pub use manager::{color, Coloring, GhostdagManager};
pub use protocol::{blue_anticone_size, find_selected_parent, ordered_mergeset, ColoringStrategy, GreedyColoring};
pub use stores::GhostdagStore;
