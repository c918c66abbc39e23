//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] which implements [`VectorStore`] using
//! the [qdrant-client](https://docs.rs/qdrant-client) crate over gRPC.
//!
//! Qdrant point ids must be integers or UUIDs, so caller ids are mapped to a
//! deterministic UUIDv5 and kept verbatim in the `doc_id` payload field.
//!
//! # Example
//!
//! ```rust,ignore
//! use nlp_rag::qdrant::QdrantVectorStore;
//!
//! let store = QdrantVectorStore::new("http://localhost:6334", "documents")?;
//! store.upsert(&documents).await?;
//! let nearest = store.query_nearest(&query_embedding, 5).await?;
//! ```

use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, GetPointsBuilder, PointId, PointStruct,
    ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue,
    VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::document::Document;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "qdrant";
const SCROLL_PAGE: u32 = 256;

/// A [`VectorStore`] backed by a single [Qdrant](https://qdrant.tech/) collection.
///
/// The collection is created with cosine distance on the first upsert, sized
/// to the first document's embedding. Query results carry no embeddings.
pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
}

impl QdrantVectorStore {
    /// Connect to Qdrant at `url` and use `collection`.
    pub fn new(url: &str, collection: impl Into<String>) -> Result<Self> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| RagError::Config(format!("failed to create qdrant client: {e}")))?;
        Ok(Self { client, collection: collection.into() })
    }

    /// Use an existing client.
    pub fn from_client(client: Qdrant, collection: impl Into<String>) -> Self {
        Self { client, collection: collection.into() }
    }

    /// Deterministic point id for a caller id.
    pub fn point_id(id: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()).to_string()
    }

    fn query_err(e: qdrant_client::QdrantError) -> RagError {
        RagError::store_query(BACKEND, e.to_string())
    }

    fn write_err(e: qdrant_client::QdrantError, requested: usize) -> RagError {
        RagError::StoreWrite {
            backend: BACKEND.to_string(),
            message: e.to_string(),
            stored: 0,
            requested,
        }
    }

    fn extract_string(value: &QdrantValue) -> Option<String> {
        match &value.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        }
    }

    fn document_from_payload(payload: &HashMap<String, QdrantValue>) -> Document {
        let field = |key: &str| payload.get(key).and_then(Self::extract_string).unwrap_or_default();
        Document { id: field("doc_id"), text: field("text"), embedding: Vec::new() }
    }

    async fn exists(&self) -> Result<bool> {
        self.client.collection_exists(&self.collection).await.map_err(Self::query_err)
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn upsert(&self, documents: &[Document]) -> Result<usize> {
        let requested = documents.len();
        let (with_vectors, without): (Vec<&Document>, Vec<&Document>) =
            documents.iter().partition(|d| !d.embedding.is_empty());
        if with_vectors.is_empty() {
            return if without.is_empty() {
                Ok(0)
            } else {
                Err(RagError::StoreWrite {
                    backend: BACKEND.to_string(),
                    message: "documents without embeddings cannot be stored".to_string(),
                    stored: 0,
                    requested,
                })
            };
        }

        if !self.exists().await.map_err(|e| RagError::StoreWrite {
            backend: BACKEND.to_string(),
            message: e.to_string(),
            stored: 0,
            requested,
        })? {
            let dimensions = with_vectors[0].embedding.len() as u64;
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection)
                        .vectors_config(VectorParamsBuilder::new(dimensions, Distance::Cosine)),
                )
                .await
                .map_err(|e| Self::write_err(e, requested))?;
            debug!(collection = %self.collection, dimensions, "created qdrant collection");
        }

        let points: Vec<PointStruct> = with_vectors
            .iter()
            .map(|doc| {
                let mut payload_map = serde_json::Map::new();
                payload_map.insert("doc_id".to_string(), serde_json::Value::String(doc.id.clone()));
                payload_map.insert("text".to_string(), serde_json::Value::String(doc.text.clone()));
                let payload =
                    Payload::try_from(serde_json::Value::Object(payload_map)).unwrap_or_default();
                PointStruct::new(Self::point_id(&doc.id), doc.embedding.clone(), payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| Self::write_err(e, requested))?;

        let stored = with_vectors.len();
        debug!(collection = %self.collection, stored, requested, "upserted documents to qdrant");

        if without.is_empty() {
            Ok(stored)
        } else {
            let ids: Vec<&str> = without.iter().map(|d| d.id.as_str()).collect();
            warn!(ids = ?ids, "skipped documents without embeddings");
            Err(RagError::StoreWrite {
                backend: BACKEND.to_string(),
                message: format!("documents without embeddings: {}", ids.join(", ")),
                stored,
                requested,
            })
        }
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        if !self.exists().await? {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        let mut offset: Option<PointId> = None;
        loop {
            let mut request =
                ScrollPointsBuilder::new(&self.collection).limit(SCROLL_PAGE).with_payload(true);
            if let Some(next) = offset.take() {
                request = request.offset(next);
            }
            let page = self.client.scroll(request).await.map_err(Self::query_err)?;
            ids.extend(page.result.iter().map(|p| Self::document_from_payload(&p.payload).id));
            match page.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn query_nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<Document>> {
        if k == 0 || !self.exists().await? {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, embedding.to_vec(), k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(Self::query_err)?;

        Ok(response.result.iter().map(|p| Self::document_from_payload(&p.payload)).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        if !self.exists().await? {
            return Ok(None);
        }

        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(&self.collection, vec![PointId::from(Self::point_id(id))])
                    .with_payload(true),
            )
            .await
            .map_err(Self::query_err)?;

        Ok(response.result.first().map(|p| Self::document_from_payload(&p.payload)))
    }

    async fn len(&self) -> Result<usize> {
        if !self.exists().await? {
            return Ok(0);
        }
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .map_err(Self::query_err)?;
        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }

    fn backend(&self) -> &str {
        BACKEND
    }
}
