//! Data types for documents, ingestion reports, and ranked results.

use serde::{Deserialize, Serialize};

/// A document as submitted by a caller for ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentInput {
    /// Caller-assigned identifier. Must be non-empty.
    pub id: String,
    /// The text content. May be empty.
    pub text: String,
}

impl DocumentInput {
    /// Create a new document input.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into() }
    }
}

/// A stored document with its vector embedding.
///
/// `embedding` may be empty when a backend does not return vectors from a
/// query or when the provider returned no vector at ingestion time. Only
/// `text` is guaranteed to be meaningful on query results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// The vector embedding for this document's text.
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl Document {
    /// Pair a document input with its embedding.
    pub fn from_input(input: &DocumentInput, embedding: Vec<f32>) -> Self {
        Self { id: input.id.clone(), text: input.text.clone(), embedding }
    }
}

/// A retrieved text paired with a relevance score (higher is more relevant).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedText {
    /// The retrieved text.
    pub text: String,
    /// The relevance score.
    pub score: f32,
}

/// Counts reported after an ingestion call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestReport {
    /// Number of documents submitted by the caller.
    pub accepted_count: usize,
    /// Total number of documents in the store after the write.
    pub stored_total: usize,
    /// Number of embeddings the provider returned.
    pub embedded_count: usize,
}
