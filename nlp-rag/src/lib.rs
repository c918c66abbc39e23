//! # nlp-rag
//!
//! Retrieval for context-augmented text generation: documents are embedded
//! and stored in a [`VectorStore`], queries are matched by nearest-neighbor
//! search, and the candidates are reranked before being handed to a
//! [`TextGenerator`] as context.
//!
//! The pipeline degrades instead of failing where a reasonable answer exists:
//! an empty store or an empty candidate set yields no results, and a reranker
//! failure yields the candidates in similarity order. Only a missing query
//! embedding is a hard retrieval error.
//!
//! ## Feature flags
//!
//! - `http` – [`http::HttpEmbeddingProvider`], [`http::HttpReranker`] and
//!   [`http::HttpTextGenerator`] over `reqwest`
//! - `qdrant` – [`qdrant::QdrantVectorStore`]
//! - `full` – everything

pub mod augment;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod file;
pub mod inmemory;
pub mod ingestion;
pub mod pipeline;
pub mod reranker;
pub mod retrieval;
pub mod vectorstore;

#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use augment::{Augmenter, TextGenerator};
pub use config::{DEFAULT_TOP_K, RagConfig, RagConfigBuilder};
pub use document::{Document, DocumentInput, IngestReport, RankedText};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use file::FileVectorStore;
pub use inmemory::InMemoryVectorStore;
pub use ingestion::Ingestor;
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use reranker::{NoOpReranker, Reranker};
pub use retrieval::Retriever;
pub use vectorstore::VectorStore;
