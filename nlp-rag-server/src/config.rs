//! Server configuration from command-line flags and environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use nlp_rag::http::{ApiKey, HttpEmbeddingProvider, HttpReranker, HttpTextGenerator};
use nlp_rag::{
    Augmenter, FileVectorStore, InMemoryVectorStore, RagConfig, RagPipeline, VectorStore,
};
use tracing::info;

use crate::routes::AppState;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Configuration for the RAG HTTP service.
#[derive(Debug, Clone, Parser)]
#[command(name = "nlp-rag-server", version, about = "Retrieval-augmented generation service")]
pub struct ServerConfig {
    /// Address to bind.
    #[arg(long, env = "RAG_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, env = "RAG_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Base URL of the embedding and reranking service.
    #[arg(long, env = "USF_API_URL")]
    pub usf_api_url: String,

    /// API key sent as `x-api-key` to the embedding and reranking service.
    #[arg(long, env = "USF_API_KEY", hide_env_values = true)]
    pub usf_api_key: Option<String>,

    /// Embedding model name.
    #[arg(long, env = "EMBEDDING_MODEL", default_value = nlp_rag::http::DEFAULT_EMBEDDING_MODEL)]
    pub embedding_model: String,

    /// Path of the embedding endpoint, relative to `--usf-api-url`.
    #[arg(long, env = "EMBEDDING_PATH", default_value = nlp_rag::http::DEFAULT_EMBEDDING_PATH)]
    pub embedding_path: String,

    /// Rerank model name.
    #[arg(long, env = "RERANK_MODEL", default_value = nlp_rag::http::DEFAULT_RERANK_MODEL)]
    pub rerank_model: String,

    /// Path of the rerank endpoint, relative to `--usf-api-url`.
    #[arg(long, env = "RERANK_PATH", default_value = nlp_rag::http::DEFAULT_RERANK_PATH)]
    pub rerank_path: String,

    /// Full URL of the chat completions endpoint.
    #[arg(long, env = "LLM_API_URL")]
    pub llm_api_url: String,

    /// Bearer token for the chat completions endpoint.
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// Chat model name.
    #[arg(long, env = "LLM_MODEL", default_value = "usf-mini")]
    pub llm_model: String,

    /// Sampling temperature for generation.
    #[arg(long, env = "LLM_TEMPERATURE", default_value_t = 0.7)]
    pub llm_temperature: f32,

    /// Completion token limit for generation.
    #[arg(long, env = "LLM_MAX_TOKENS", default_value_t = 1000)]
    pub llm_max_tokens: u32,

    /// JSON snapshot for documents. Documents are kept in memory only when unset.
    #[arg(long, env = "RAG_STORE_PATH")]
    pub store_path: Option<PathBuf>,

    /// Qdrant gRPC URL. Takes precedence over `--store-path`.
    #[cfg(feature = "qdrant")]
    #[arg(long, env = "QDRANT_URL")]
    pub qdrant_url: Option<String>,

    /// Qdrant collection name.
    #[cfg(feature = "qdrant")]
    #[arg(long, env = "QDRANT_COLLECTION", default_value = "documents")]
    pub qdrant_collection: String,

    /// Results returned when a request does not set `top_k`.
    #[arg(long, env = "RAG_TOP_K", default_value_t = nlp_rag::DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Timeout in seconds for each outbound provider request.
    #[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value_t = 30)]
    pub provider_timeout_secs: u64,

    /// Timeout in seconds for a whole inbound request.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 120)]
    pub request_timeout_secs: u64,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// The socket address to bind.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid host/port {}:{}", self.host, self.port))
    }

    /// Timeout for each outbound provider request.
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    /// Timeout for a whole inbound HTTP request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn rag_config(&self) -> anyhow::Result<RagConfig> {
        RagConfig::builder().top_k(self.top_k).build().context("invalid retrieval settings")
    }

    async fn vector_store(&self) -> anyhow::Result<Arc<dyn VectorStore>> {
        #[cfg(feature = "qdrant")]
        if let Some(url) = &self.qdrant_url {
            info!(url = %url, collection = %self.qdrant_collection, "using qdrant vector store");
            let store = nlp_rag::qdrant::QdrantVectorStore::new(url, &self.qdrant_collection)?;
            return Ok(Arc::new(store));
        }

        match &self.store_path {
            Some(path) => {
                let store = FileVectorStore::open(path)
                    .await
                    .with_context(|| format!("failed to open store at {}", path.display()))?;
                info!(path = %path.display(), documents = store.len().await?, "using file vector store");
                Ok(Arc::new(store))
            }
            None => {
                info!("using in-memory vector store");
                Ok(Arc::new(InMemoryVectorStore::new()))
            }
        }
    }

    /// Wire providers, the store, and the pipeline into shared handler state.
    pub async fn build_state(&self) -> anyhow::Result<AppState> {
        let timeout = self.provider_timeout();

        let mut embedder = HttpEmbeddingProvider::with_timeout(&self.usf_api_url, timeout)?
            .with_path(&self.embedding_path)
            .with_model(&self.embedding_model);
        let mut reranker = HttpReranker::with_timeout(&self.usf_api_url, timeout)?
            .with_path(&self.rerank_path)
            .with_model(&self.rerank_model);
        if let Some(key) = &self.usf_api_key {
            let api_key = ApiKey::Header { name: "x-api-key".into(), value: key.clone() };
            embedder = embedder.with_api_key(api_key.clone());
            reranker = reranker.with_api_key(api_key);
        }

        let mut generator =
            HttpTextGenerator::with_timeout(&self.llm_api_url, &self.llm_model, timeout)?
                .with_temperature(self.llm_temperature)
                .with_max_tokens(self.llm_max_tokens);
        if let Some(key) = &self.llm_api_key {
            generator = generator.with_api_key(ApiKey::Bearer(key.clone()));
        }

        let pipeline = Arc::new(
            RagPipeline::builder()
                .config(self.rag_config()?)
                .embedding_provider(Arc::new(embedder))
                .vector_store(self.vector_store().await?)
                .reranker(Arc::new(reranker))
                .build()?,
        );
        let augmenter = Arc::new(Augmenter::new(pipeline.clone(), Arc::new(generator)));
        Ok(AppState { pipeline, augmenter })
    }
}
