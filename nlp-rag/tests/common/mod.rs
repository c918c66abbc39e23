//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use nlp_rag::{
    Document, EmbeddingProvider, InMemoryVectorStore, RagError, Reranker, Result, TextGenerator,
    VectorStore,
};

pub const DIM: usize = 4;

/// Embeds known texts from a table and everything else from cheap text features.
#[derive(Default)]
pub struct TableEmbedder {
    pub table: HashMap<String, Vec<f32>>,
    pub calls: AtomicUsize,
    /// When set, drop this many vectors from the end of every response.
    pub drop_last: usize,
    /// When set, answer every call with an empty data list.
    pub empty_response: bool,
    pub fail: bool,
}

impl TableEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: &str, vector: [f32; DIM]) -> Self {
        self.table.insert(text.to_string(), vector.to_vec());
        self
    }

    /// Return an empty vector for `text`.
    pub fn with_empty(mut self, text: &str) -> Self {
        self.table.insert(text.to_string(), Vec::new());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn features(text: &str) -> Vec<f32> {
        let vowels = text.chars().filter(|c| "aeiou".contains(*c)).count();
        let spaces = text.chars().filter(|c| c.is_whitespace()).count();
        vec![(text.len() % 7) as f32 + 1.0, vowels as f32 + 1.0, spaces as f32 + 1.0, 1.0]
    }
}

#[async_trait]
impl EmbeddingProvider for TableEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RagError::embedding("table", "provider unavailable"));
        }
        if self.empty_response {
            return Ok(Vec::new());
        }
        let mut vectors: Vec<Vec<f32>> = texts
            .iter()
            .map(|t| self.table.get(*t).cloned().unwrap_or_else(|| Self::features(t)))
            .collect();
        let keep = vectors.len().saturating_sub(self.drop_last);
        vectors.truncate(keep);
        Ok(vectors)
    }

    fn name(&self) -> &str {
        "table"
    }
}

/// Scores candidates from a table; unknown texts score 0.
#[derive(Default)]
pub struct TableReranker {
    pub scores: HashMap<String, f32>,
    pub calls: AtomicUsize,
    pub fail: bool,
    /// Return one score fewer than requested.
    pub short: bool,
}

impl TableReranker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: &str, score: f32) -> Self {
        self.scores.insert(text.to_string(), score);
        self
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Reranker for TableReranker {
    async fn rerank(&self, _query: &str, candidates: &[&str]) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RagError::rerank("table", "reranker unavailable"));
        }
        let mut scores: Vec<f32> =
            candidates.iter().map(|t| self.scores.get(*t).copied().unwrap_or(0.0)).collect();
        if self.short {
            scores.pop();
        }
        Ok(scores)
    }

    fn name(&self) -> &str {
        "table"
    }
}

/// An in-memory store whose nearest-neighbor query always fails.
#[derive(Default)]
pub struct BrokenQueryStore {
    pub inner: InMemoryVectorStore,
}

#[async_trait]
impl VectorStore for BrokenQueryStore {
    async fn upsert(&self, documents: &[Document]) -> Result<usize> {
        self.inner.upsert(documents).await
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        self.inner.list_ids().await
    }

    async fn query_nearest(&self, _embedding: &[f32], _k: usize) -> Result<Vec<Document>> {
        Err(RagError::store_query("broken", "index offline"))
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        self.inner.get(id).await
    }

    fn backend(&self) -> &str {
        "broken"
    }
}

/// Records prompts and echoes them back.
#[derive(Default)]
pub struct RecordingGenerator {
    pub prompts: Mutex<Vec<String>>,
    pub fail: bool,
    /// Fail only prompts that carry retrieved context.
    pub fail_with_context: bool,
}

impl RecordingGenerator {
    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextGenerator for RecordingGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail || (self.fail_with_context && prompt.contains("Relevant Documents:")) {
            return Err(RagError::generation("recording", "model overloaded"));
        }
        Ok(format!("generated for {} chars", prompt.len()))
    }
}

/// Embedder and reranker wired for the mammal classification scenario.
///
/// For the query "mammal classification" the nearest-neighbor order is
/// a ("cats"), c ("dogs"), b ("Python").
pub fn mammal_embedder() -> TableEmbedder {
    TableEmbedder::new()
        .with("cats are mammals", [1.0, 0.2, 0.0, 0.0])
        .with("Python is a language", [0.0, 0.0, 1.0, 0.0])
        .with("dogs are mammals", [0.9, 0.4, 0.0, 0.0])
        .with("mammal classification", [1.0, 0.0, 0.0, 0.0])
}

pub fn mammal_reranker() -> TableReranker {
    TableReranker::new()
        .with("cats are mammals", 0.9)
        .with("dogs are mammals", 0.95)
        .with("Python is a language", 0.1)
}
