use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{
    DEFAULT_EXACT_SEARCH_BUDGET, DEFAULT_FINALITY_DEPTH, DEFAULT_GHOSTDAG_K, DEFAULT_PAST_FLATTEN_THRESHOLD,
    MAX_GHOSTDAG_K,
};
use crate::errors::{ConsensusError, ConsensusResult};
use crate::KType;

/// Which coloring algorithm decides the blue set of each block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColoringStrategyKind {
    /// Maximum k-cluster per merge set, branch-and-bound
    Exact,
    /// Polynomial GhostDAG approximation
    #[default]
    Greedy,
}

impl fmt::Display for ColoringStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Greedy => write!(f, "greedy"),
        }
    }
}

impl FromStr for ColoringStrategyKind {
    type Err = ConsensusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(Self::Exact),
            "greedy" => Ok(Self::Greedy),
            other => Err(ConsensusError::InvalidParameter(format!("unknown coloring strategy: {}", other))),
        }
    }
}

/// Validated consensus parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    pub ghostdag_k: KType,
    pub coloring_strategy: ColoringStrategyKind,
    pub exact_search_budget: u64,
    pub finality_depth: u64,
    pub past_flatten_threshold: usize,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            ghostdag_k: DEFAULT_GHOSTDAG_K,
            coloring_strategy: ColoringStrategyKind::default(),
            exact_search_budget: DEFAULT_EXACT_SEARCH_BUDGET,
            finality_depth: DEFAULT_FINALITY_DEPTH,
            past_flatten_threshold: DEFAULT_PAST_FLATTEN_THRESHOLD,
        }
    }
}

/// Checks a user supplied K and narrows it to `KType`.
pub fn ghostdag_k_from(value: i64) -> ConsensusResult<KType> {
    if value < 0 {
        return Err(ConsensusError::InvalidParameter(format!("ghostdag_k must be non-negative, got {}", value)));
    }
    if value > i64::from(MAX_GHOSTDAG_K) {
        return Err(ConsensusError::InvalidParameter(format!(
            "ghostdag_k must be at most {}, got {}",
            MAX_GHOSTDAG_K, value
        )));
    }
    KType::try_from(value).map_err(|e| ConsensusError::InvalidParameter(e.to_string()))
}

impl ConsensusParams {
    /// Default parameters with the given K.
    pub fn with_k(k: i64) -> ConsensusResult<Self> {
        Ok(Self { ghostdag_k: ghostdag_k_from(k)?, ..Self::default() })
    }

    pub fn with_strategy(mut self, strategy: ColoringStrategyKind) -> Self {
        self.coloring_strategy = strategy;
        self
    }

    pub fn with_exact_search_budget(mut self, budget: u64) -> Self {
        self.exact_search_budget = budget;
        self
    }

    pub fn with_finality_depth(mut self, depth: u64) -> Self {
        self.finality_depth = depth;
        self
    }

    pub fn with_past_flatten_threshold(mut self, threshold: usize) -> Self {
        self.past_flatten_threshold = threshold;
        self
    }

    pub fn validate(&self) -> ConsensusResult<()> {
        ghostdag_k_from(i64::from(self.ghostdag_k))?;
        if self.exact_search_budget == 0 {
            return Err(ConsensusError::InvalidParameter("exact_search_budget must be positive".to_string()));
        }
        if self.past_flatten_threshold == 0 {
            return Err(ConsensusError::InvalidParameter("past_flatten_threshold must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = ConsensusParams::default();
        assert_eq!(params.ghostdag_k, 18);
        assert_eq!(params.coloring_strategy, ColoringStrategyKind::Greedy);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_k_validation() {
        assert_eq!(ghostdag_k_from(0).unwrap(), 0);
        assert_eq!(ghostdag_k_from(1024).unwrap(), 1024);
        assert!(matches!(ghostdag_k_from(-1), Err(ConsensusError::InvalidParameter(_))));
        assert!(matches!(ghostdag_k_from(1025), Err(ConsensusError::InvalidParameter(_))));
        assert!(matches!(ConsensusParams::with_k(-3), Err(ConsensusError::InvalidParameter(_))));
    }

    #[test]
    fn test_builder() {
        let params = ConsensusParams::with_k(3)
            .unwrap()
            .with_strategy(ColoringStrategyKind::Exact)
            .with_exact_search_budget(0);
        assert_eq!(params.ghostdag_k, 3);
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!("exact".parse::<ColoringStrategyKind>().unwrap(), ColoringStrategyKind::Exact);
        assert_eq!(ColoringStrategyKind::Greedy.to_string(), "greedy");
        assert!("Exact".parse::<ColoringStrategyKind>().is_err());
    }
}
