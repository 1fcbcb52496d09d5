use crate::tree::{validate_rank, ConfigError, NodeKind};

/// Default max children per inner node.
pub const DEFAULT_INNER_RANK: usize = 7;
/// Default max entries per leaf.
pub const DEFAULT_LEAF_RANK: usize = 9;

/// Tree shape shared by every chromosome of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Max children per inner node (>= 3).
    pub inner_rank: usize,
    /// Max entries per leaf (>= 3).
    pub leaf_rank: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            inner_rank: DEFAULT_INNER_RANK,
            leaf_rank: DEFAULT_LEAF_RANK,
        }
    }
}

impl StoreConfig {
    /// Construct configuration with explicit ranks.
    pub fn new(inner_rank: usize, leaf_rank: usize) -> Result<Self, ConfigError> {
        let config = Self {
            inner_rank,
            leaf_rank,
        };
        config.validate()?;
        Ok(config)
    }

    /// Replace the inner rank.
    pub fn with_inner_rank(self, inner_rank: usize) -> Result<Self, ConfigError> {
        Self::new(inner_rank, self.leaf_rank)
    }

    /// Replace the leaf rank.
    pub fn with_leaf_rank(self, leaf_rank: usize) -> Result<Self, ConfigError> {
        Self::new(self.inner_rank, leaf_rank)
    }

    /// Check both ranks (fields are public, so callers may bypass `new`).
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_rank(NodeKind::Inner, self.inner_rank)?;
        validate_rank(NodeKind::Leaf, self.leaf_rank)?;
        Ok(())
    }
}
