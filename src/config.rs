//! Tunables for one clustering run.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SuffixTreeError};

pub const DEFAULT_MAX_TOKENS: usize = 1 << 24;
pub const DEFAULT_MIN_DOCUMENT_FREQUENCY: usize = 2;
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 1024;

/// Limits and thresholds for building and reading a tree.
///
/// Missing fields take their defaults when deserialized:
///
/// ```
/// use stc_suffix_tree::TreeConfig;
/// let config: TreeConfig = serde_json::from_str(r#"{ "max_tokens": 500 }"#).unwrap();
/// assert_eq!(config.max_tokens, 500);
/// assert_eq!(config.min_document_frequency, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Upper bound on stored symbols (tokens plus one end marker per document).
    pub max_tokens: usize,

    /// Smallest document set a base cluster may have.
    pub min_document_frequency: usize,

    /// Node count from which a membership level or an extraction pass is
    /// spread over the rayon pool.
    pub parallel_threshold: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            min_document_frequency: DEFAULT_MIN_DOCUMENT_FREQUENCY,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl TreeConfig {
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_min_document_frequency(mut self, min_document_frequency: usize) -> Self {
        self.min_document_frequency = min_document_frequency;
        self
    }

    pub fn with_parallel_threshold(mut self, parallel_threshold: usize) -> Self {
        self.parallel_threshold = parallel_threshold;
        self
    }

    /// Checks that the limits fit the tree's 32-bit node and position indices.
    pub fn validate(&self) -> Result<()> {
        // A tree over n symbols has at most 2n nodes.
        let ceiling = (u32::MAX / 2) as usize;
        if self.max_tokens == 0 || self.max_tokens > ceiling {
            return Err(SuffixTreeError::InvalidConfig {
                field: "max_tokens",
                reason: format!("must be in 1..={ceiling}, got {}", self.max_tokens),
            });
        }
        if self.parallel_threshold == 0 {
            return Err(SuffixTreeError::InvalidConfig {
                field: "parallel_threshold",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
