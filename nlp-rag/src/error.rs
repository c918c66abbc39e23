//! Error types for the `nlp-rag` crate.

use thiserror::Error;

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// The caller supplied input the pipeline cannot accept.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The embedding provider failed or returned a malformed response.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingProvider {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The reranking provider failed or returned an unusable response.
    ///
    /// Retrieval treats this as a degraded condition, not a failure.
    #[error("Reranker error ({reranker}): {message}")]
    RerankProvider {
        /// The reranker that produced the error.
        reranker: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector store rejected some or all documents of a write.
    #[error("Vector store write error ({backend}): {message} ({stored} of {requested} stored)")]
    StoreWrite {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
        /// Number of documents actually stored.
        stored: usize,
        /// Number of documents in the batch.
        requested: usize,
    },

    /// A nearest-neighbor query or id listing failed.
    #[error("Vector store query error ({backend}): {message}")]
    StoreQuery {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The text generation provider failed.
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RagError {
    /// Shorthand for an [`RagError::EmbeddingProvider`] error.
    pub fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingProvider { provider: provider.into(), message: message.into() }
    }

    /// Shorthand for an [`RagError::RerankProvider`] error.
    pub fn rerank(reranker: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RerankProvider { reranker: reranker.into(), message: message.into() }
    }

    /// Shorthand for an [`RagError::StoreQuery`] error.
    pub fn store_query(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreQuery { backend: backend.into(), message: message.into() }
    }

    /// Shorthand for an [`RagError::Generation`] error.
    pub fn generation(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Generation { provider: provider.into(), message: message.into() }
    }

    /// Whether this error was caused by bad caller input rather than a backend.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Config(_))
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
