//! RAG pipeline facade.
//!
//! The [`RagPipeline`] wires an [`EmbeddingProvider`], a [`VectorStore`] and a
//! [`Reranker`] into an [`Ingestor`] and a [`Retriever`] that share them.
//!
//! # Example
//!
//! ```rust,ignore
//! use nlp_rag::{RagPipeline, RagConfig, FileVectorStore};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(FileVectorStore::open("store.json").await?))
//!     .reranker(Arc::new(my_reranker))
//!     .build()?;
//!
//! pipeline.ingest(&[DocumentInput::new("a", "cats are mammals")]).await?;
//! let texts = pipeline.retrieve("mammal classification", 2).await?;
//! ```

use std::sync::Arc;

use crate::config::RagConfig;
use crate::document::{DocumentInput, IngestReport, RankedText};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::ingestion::Ingestor;
use crate::reranker::{NoOpReranker, Reranker};
use crate::retrieval::Retriever;
use crate::vectorstore::VectorStore;

/// The ingestion and retrieval entry points over one shared store.
///
/// Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    vector_store: Arc<dyn VectorStore>,
    ingestor: Ingestor,
    retriever: Retriever,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Validate, embed, and store a batch of documents.
    ///
    /// See [`Ingestor::ingest`].
    pub async fn ingest(&self, documents: &[DocumentInput]) -> Result<IngestReport> {
        self.ingestor.ingest(documents).await
    }

    /// All stored document ids.
    pub async fn list_ids(&self) -> Result<Vec<String>> {
        self.vector_store.list_ids().await
    }

    /// Retrieve up to `top_k` reranked texts. See [`Retriever::retrieve`].
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>> {
        self.retriever.retrieve(query, top_k).await
    }

    /// Retrieve using the configured default `top_k`.
    pub async fn retrieve_default(&self, query: &str) -> Result<Vec<String>> {
        self.retriever.retrieve(query, self.config.top_k).await
    }

    /// Retrieve up to `top_k` texts with their relevance scores.
    pub async fn retrieve_scored(&self, query: &str, top_k: usize) -> Result<Vec<RankedText>> {
        self.retriever.retrieve_scored(query, top_k).await
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// The embedding provider and vector store are required. The config defaults
/// to [`RagConfig::default()`] and the reranker to [`NoOpReranker`].
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    reranker: Option<Arc<dyn Reranker>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the reranker applied after nearest-neighbor search.
    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the embedding provider or vector store
    /// is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::Config("vector_store is required".to_string()))?;
        let reranker = self.reranker.unwrap_or_else(|| Arc::new(NoOpReranker));

        Ok(RagPipeline {
            config,
            ingestor: Ingestor::new(embedding_provider.clone(), vector_store.clone()),
            retriever: Retriever::new(embedding_provider, vector_store.clone(), reranker),
            vector_store,
        })
    }
}
