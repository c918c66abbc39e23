//! Configuration for the RAG pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Default number of results returned by retrieval.
pub const DEFAULT_TOP_K: usize = 5;

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Number of results to return when the caller does not specify `top_k`.
    pub top_k: usize,
    /// Instruction used by augmentation when the caller supplies none.
    pub default_instruction: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            default_instruction: "Process the following text".to_string(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the default number of results to return.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the fallback instruction used by augmentation.
    pub fn default_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.default_instruction = instruction.into();
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `top_k == 0`
    /// - `default_instruction` is blank
    pub fn build(self) -> Result<RagConfig> {
        if self.config.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        if self.config.default_instruction.trim().is_empty() {
            return Err(RagError::Config("default_instruction must not be empty".to_string()));
        }
        Ok(self.config)
    }
}
