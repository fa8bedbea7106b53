use crate::Hash;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error("block {block} references unknown parent {parent}")]
    UnknownParent { block: Hash, parent: Hash },

    #[error("block {0} already exists")]
    DuplicateBlock(Hash),

    #[error("inconsistent DAG: {0}")]
    InconsistentDag(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("unknown block {0}")]
    UnknownBlock(Hash),

    #[error("exact coloring search exceeded its budget of {budget} nodes")]
    SearchBudgetExceeded { budget: u64 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ConsensusError {
    /// Duplicates are benign; callers relaying blocks usually ignore them.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateBlock(_))
    }

    /// The block can be retried once the missing parent arrives.
    pub fn is_missing_parent(&self) -> bool {
        matches!(self, Self::UnknownParent { .. })
    }
}

pub type ConsensusResult<T> = std::result::Result<T, ConsensusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let block = Hash::from_u64_word(2);
        let parent = Hash::from_u64_word(1);
        let err = ConsensusError::UnknownParent { block, parent };
        assert!(err.to_string().contains(&parent.to_string()));
        assert!(err.is_missing_parent());
        assert!(!err.is_duplicate());

        let err = ConsensusError::SearchBudgetExceeded { budget: 10 };
        assert_eq!(err.to_string(), "exact coloring search exceeded its budget of 10 nodes");
    }

    #[test]
    fn test_io_conversion() {
        fn read() -> ConsensusResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"))?
        }
        assert!(matches!(read(), Err(ConsensusError::IoError(_))));
    }
}
