//! HTTP-backed embedding, reranking, and generation providers.
//!
//! This module is only available when the `http` feature is enabled.
//!
//! The embedding and reranking endpoints accept the payloads
//! `{"model", "input"}` and `{"model", "query", "texts"}` and may wrap their
//! data list either as `{"result": {"data": [...]}}` or as `{"data": [...]}`.
//! The generator speaks the OpenAI-style chat completions format.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::augment::TextGenerator;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::reranker::Reranker;

/// Default embedding model name.
pub const DEFAULT_EMBEDDING_MODEL: &str = "usf1-embed";
/// Default rerank model name.
pub const DEFAULT_RERANK_MODEL: &str = "usf1-rerank";
/// Default path of the embedding endpoint, relative to the base URL.
pub const DEFAULT_EMBEDDING_PATH: &str = "/hiring/embed/embeddings";
/// Default path of the rerank endpoint, relative to the base URL.
pub const DEFAULT_RERANK_PATH: &str = "/hiring/embed/reranker";
/// Timeout applied to embedding, rerank, and generation requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How an API key is attached to outgoing requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKey {
    /// `Authorization: Bearer <key>`.
    Bearer(String),
    /// A custom header, e.g. `x-api-key: <key>`.
    Header {
        /// Header name.
        name: String,
        /// Header value.
        value: String,
    },
}

/// Connection settings shared by the HTTP providers.
#[derive(Debug, Clone)]
struct Endpoint {
    client: reqwest::Client,
    url: String,
    api_key: Option<ApiKey>,
}

impl Endpoint {
    fn new(url: String, timeout: Duration) -> std::result::Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self { client, url, api_key: None })
    }

    /// POST `body` as JSON and decode the JSON response.
    ///
    /// The error string is wrapped into the caller's error variant.
    async fn post<B: Serialize + ?Sized>(&self, body: &B) -> std::result::Result<Value, String> {
        let mut request = self.client.post(&self.url).json(body);
        request = match &self.api_key {
            Some(ApiKey::Bearer(key)) => request.bearer_auth(key),
            Some(ApiKey::Header { name, value }) => request.header(name.as_str(), value.as_str()),
            None => request,
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                format!("request to {} timed out", self.url)
            } else {
                format!("request failed: {e}")
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("API returned {status}: {body}"));
        }

        response.json::<Value>().await.map_err(|e| format!("failed to parse response: {e}"))
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Locate the data list under `result.data` or top-level `data`.
fn data_list(response: &Value) -> Option<&Vec<Value>> {
    response
        .get("result")
        .and_then(|r| r.get("data"))
        .or_else(|| response.get("data"))
        .and_then(Value::as_array)
}

// ── Embeddings ─────────────────────────────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

/// Extract vectors, in response order, from an embedding response.
///
/// A missing data path is an error; an empty data list yields an empty batch.
/// Items whose `embedding` is missing or null become empty vectors.
pub fn parse_embedding_response(response: &Value) -> Result<Vec<Vec<f32>>> {
    let data = data_list(response).ok_or_else(|| {
        RagError::embedding("http", "response has no result.data or data list")
    })?;
    if data.is_empty() {
        warn!("embedding response contained no embeddings");
    }
    data.iter()
        .map(|item| {
            serde_json::from_value::<EmbeddingData>(item.clone())
                .map(|d| d.embedding.unwrap_or_default())
                .map_err(|e| RagError::embedding("http", format!("malformed embedding item: {e}")))
        })
        .collect()
}

/// An [`EmbeddingProvider`] calling a remote embeddings endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use nlp_rag::http::HttpEmbeddingProvider;
///
/// let provider = HttpEmbeddingProvider::new("https://api.example.com")?
///     .with_api_key(ApiKey::Bearer("sk-...".into()));
/// let vectors = provider.embed_batch(&["hello"]).await?;
/// ```
pub struct HttpEmbeddingProvider {
    endpoint: Endpoint,
    base_url: String,
    model: String,
}

impl HttpEmbeddingProvider {
    /// Create a provider for `{base_url}/hiring/embed/embeddings`.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a provider with a custom request timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Endpoint::new(join_url(base_url, DEFAULT_EMBEDDING_PATH), timeout)
            .map_err(|e| RagError::embedding("http", e))?;
        Ok(Self {
            endpoint,
            base_url: base_url.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
        })
    }

    /// Override the endpoint path relative to the base URL.
    pub fn with_path(mut self, path: &str) -> Self {
        self.endpoint.url = join_url(&self.base_url, path);
        self
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Attach an API key to every request.
    pub fn with_api_key(mut self, api_key: ApiKey) -> Self {
        self.endpoint.api_key = Some(api_key);
        self
    }

    /// The full endpoint URL.
    pub fn url(&self) -> &str {
        &self.endpoint.url
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(batch_size = texts.len(), model = %self.model, "requesting embeddings");

        let request = EmbeddingRequest { model: &self.model, input: texts };
        let response = self.endpoint.post(&request).await.map_err(|e| {
            error!(url = %self.endpoint.url, error = %e, "embedding request failed");
            RagError::embedding(self.name(), e)
        })?;

        let embeddings = parse_embedding_response(&response)?;
        if let Some(first) = embeddings.first() {
            debug!(count = embeddings.len(), dimensions = first.len(), "received embeddings");
        }
        Ok(embeddings)
    }

    fn name(&self) -> &str {
        "http-embedding"
    }
}

// ── Reranking ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    texts: &'a [&'a str],
}

/// One `{text, score}` record of a rerank response.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RerankRecord {
    /// The candidate text, echoed back by the service.
    #[serde(default)]
    pub text: Option<String>,
    /// Relevance score.
    pub score: f32,
    /// Position of the candidate in the request, when the service reports it.
    #[serde(default)]
    pub index: Option<usize>,
}

/// Parse the records of a rerank response.
pub fn parse_rerank_response(response: &Value) -> Result<Vec<RerankRecord>> {
    let data = data_list(response)
        .ok_or_else(|| RagError::rerank("http", "response has no result.data or data list"))?;
    data.iter()
        .map(|item| {
            serde_json::from_value::<RerankRecord>(item.clone())
                .map_err(|e| RagError::rerank("http", format!("malformed rerank item: {e}")))
        })
        .collect()
}

/// Map unordered rerank records back onto candidate positions.
///
/// Records carrying an `index` are placed directly; the rest are matched by
/// text, consuming duplicate candidates in order. Every candidate must end
/// up with a score.
pub fn align_scores(candidates: &[&str], records: &[RerankRecord]) -> Result<Vec<f32>> {
    let mut scores: Vec<Option<f32>> = vec![None; candidates.len()];
    let mut by_text: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, text) in candidates.iter().enumerate().rev() {
        by_text.entry(*text).or_default().push(i);
    }

    for record in records {
        let slot = match (record.index, record.text.as_deref()) {
            (Some(index), _) if index < candidates.len() => Some(index),
            (_, Some(text)) => by_text.get_mut(text).and_then(|positions| {
                while let Some(i) = positions.pop() {
                    if scores[i].is_none() {
                        return Some(i);
                    }
                }
                None
            }),
            _ => None,
        };
        match slot {
            Some(i) => scores[i] = Some(record.score),
            None => warn!(text = ?record.text, index = ?record.index, "unmatched rerank record"),
        }
    }

    scores
        .into_iter()
        .enumerate()
        .map(|(i, s)| s.ok_or_else(|| RagError::rerank("http", format!("no score for candidate {i}"))))
        .collect()
}

/// A [`Reranker`] calling a remote rerank endpoint.
pub struct HttpReranker {
    endpoint: Endpoint,
    base_url: String,
    model: String,
}

impl HttpReranker {
    /// Create a reranker for `{base_url}/hiring/embed/reranker`.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a reranker with a custom request timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Endpoint::new(join_url(base_url, DEFAULT_RERANK_PATH), timeout)
            .map_err(|e| RagError::rerank("http", e))?;
        Ok(Self {
            endpoint,
            base_url: base_url.to_string(),
            model: DEFAULT_RERANK_MODEL.into(),
        })
    }

    /// Override the endpoint path relative to the base URL.
    pub fn with_path(mut self, path: &str) -> Self {
        self.endpoint.url = join_url(&self.base_url, path);
        self
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Attach an API key to every request.
    pub fn with_api_key(mut self, api_key: ApiKey) -> Self {
        self.endpoint.api_key = Some(api_key);
        self
    }

    /// The full endpoint URL.
    pub fn url(&self) -> &str {
        &self.endpoint.url
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn rerank(&self, query: &str, candidates: &[&str]) -> Result<Vec<f32>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        debug!(candidates = candidates.len(), model = %self.model, "requesting rerank");

        let request = RerankRequest { model: &self.model, query, texts: candidates };
        let response = self
            .endpoint
            .post(&request)
            .await
            .map_err(|e| RagError::rerank(self.name(), e))?;

        let records = parse_rerank_response(&response)?;
        align_scores(candidates, &records)
    }

    fn name(&self) -> &str {
        "http-reranker"
    }
}

// ── Generation ─────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

/// Extract `choices[0].message.content` from a chat completion response.
pub fn parse_chat_response(response: &Value) -> Result<String> {
    response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| RagError::generation("http", "response has no choices[0].message.content"))
}

/// A [`TextGenerator`] calling an OpenAI-style chat completions endpoint.
pub struct HttpTextGenerator {
    endpoint: Endpoint,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl HttpTextGenerator {
    /// Create a generator posting to the full chat completions `url`.
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, model, DEFAULT_TIMEOUT)
    }

    /// Create a generator with a custom request timeout.
    pub fn with_timeout(
        url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let endpoint =
            Endpoint::new(url.into(), timeout).map_err(|e| RagError::generation("http", e))?;
        Ok(Self { endpoint, model: model.into(), temperature: 0.7, max_tokens: 1000 })
    }

    /// Attach an API key to every request.
    pub fn with_api_key(mut self, api_key: ApiKey) -> Self {
        self.endpoint.api_key = Some(api_key);
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the completion token limit.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };
        let response = self.endpoint.post(&request).await.map_err(|e| {
            error!(url = %self.endpoint.url, error = %e, "generation request failed");
            RagError::generation(self.name(), e)
        })?;
        parse_chat_response(&response)
    }

    fn name(&self) -> &str {
        "http-generator"
    }
}
