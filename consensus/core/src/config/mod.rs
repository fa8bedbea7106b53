//! File-backed consensus configuration.

pub mod params;

pub use params::{ghostdag_k_from, ColoringStrategyKind, ConsensusParams};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::constants::{
    DEFAULT_EXACT_SEARCH_BUDGET, DEFAULT_FINALITY_DEPTH, DEFAULT_GHOSTDAG_K, DEFAULT_PAST_FLATTEN_THRESHOLD,
};
use crate::errors::{ConsensusError, ConsensusResult};

/// Consensus options as written in a TOML file.
///
/// K is read as a signed integer so that a negative value is reported as an
/// invalid parameter rather than a parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsensusConfig {
    pub ghostdag_k: i64,
    pub coloring_strategy: ColoringStrategyKind,
    pub exact_search_budget: u64,
    pub finality_depth: u64,
    pub past_flatten_threshold: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            ghostdag_k: i64::from(DEFAULT_GHOSTDAG_K),
            coloring_strategy: ColoringStrategyKind::default(),
            exact_search_budget: DEFAULT_EXACT_SEARCH_BUDGET,
            finality_depth: DEFAULT_FINALITY_DEPTH,
            past_flatten_threshold: DEFAULT_PAST_FLATTEN_THRESHOLD,
        }
    }
}

impl ConsensusConfig {
    /// Load configuration from file if it exists, otherwise use defaults
    pub fn load(path: &Path) -> ConsensusResult<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            Self::from_toml_str(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> ConsensusResult<Self> {
        toml::from_str(content).map_err(|e| ConsensusError::InvalidParameter(format!("failed to parse config: {}", e)))
    }

    pub fn to_toml_string(&self) -> ConsensusResult<String> {
        toml::to_string(self).map_err(|e| ConsensusError::InvalidParameter(format!("failed to encode config: {}", e)))
    }

    /// Validates the options and converts them into consensus parameters.
    pub fn to_params(&self) -> ConsensusResult<ConsensusParams> {
        let params = ConsensusParams {
            ghostdag_k: ghostdag_k_from(self.ghostdag_k)?,
            coloring_strategy: self.coloring_strategy,
            exact_search_budget: self.exact_search_budget,
            finality_depth: self.finality_depth,
            past_flatten_threshold: self.past_flatten_threshold,
        };
        params.validate()?;
        Ok(params)
    }
}

impl From<&ConsensusParams> for ConsensusConfig {
    fn from(params: &ConsensusParams) -> Self {
        Self {
            ghostdag_k: i64::from(params.ghostdag_k),
            coloring_strategy: params.coloring_strategy,
            exact_search_budget: params.exact_search_budget,
            finality_depth: params.finality_depth,
            past_flatten_threshold: params.past_flatten_threshold,
        }
    }
}
