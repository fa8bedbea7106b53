use crate::KType;

/// GhostDAG K parameter - maximum number of blue blocks in the anticone of a blue block
pub const DEFAULT_GHOSTDAG_K: KType = 18;

/// Upper bound accepted for K; blue anticone sizes are tracked as `KType`
pub const MAX_GHOSTDAG_K: KType = 1024;

/// Search nodes the exact coloring may visit before giving up
pub const DEFAULT_EXACT_SEARCH_BUDGET: u64 = 1_000_000;

/// Confirmation depth (in blue score) at which a block's color is final
pub const DEFAULT_FINALITY_DEPTH: u64 = 100;

/// Lazy past chains longer than this are materialized into a single set
pub const DEFAULT_PAST_FLATTEN_THRESHOLD: usize = 64;
