//! Shared utilities for the PHANTOM consensus crates.

pub mod lazy_set;
pub mod set_view;

pub use lazy_set::{LazySet, LazySetIter, SharedSet};
pub use set_view::{SetView, SortedVecSet};
