//! Block processing pipeline for consensus
//!
//! This module provides the block processor, which colors and stores new
//! blocks, and the virtual processor, which answers queries about the
//! virtual block over the current tips.

pub mod block_processor;
pub mod virtual_processor;

pub use block_processor::BlockProcessor;
pub use virtual_processor::VirtualProcessor;
