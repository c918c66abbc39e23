//! JSON-file backed vector store.
//!
//! [`FileVectorStore`] keeps the whole index in memory and rewrites a single
//! JSON file after every successful upsert, so the collection survives
//! process restarts. Writes go to a sibling temp file that is then renamed
//! over the target, so a crash mid-write leaves the previous snapshot intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::document::Document;
use crate::error::{RagError, Result};
use crate::inmemory::DocumentIndex;
use crate::vectorstore::VectorStore;

const BACKEND: &str = "File";

/// A persistent vector store snapshotting its index to a JSON file.
///
/// Writers are serialised on a separate mutex and build the next index from a
/// clone, so the flush runs without holding the index lock. Queries during a
/// flush see the previous snapshot.
///
/// # Example
///
/// ```rust,ignore
/// use nlp_rag::{FileVectorStore, VectorStore};
///
/// let store = FileVectorStore::open("./rag_store/documents.json").await?;
/// store.upsert(&documents).await?;
/// ```
#[derive(Debug)]
pub struct FileVectorStore {
    path: PathBuf,
    index: RwLock<DocumentIndex>,
    writer: Mutex<()>,
}

impl FileVectorStore {
    /// Open the store at `path`, loading an existing snapshot if present.
    ///
    /// A missing file yields an empty store; the file and its parent
    /// directory are created on the first upsert.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::StoreQuery`] if the file exists but cannot be read
    /// or parsed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let index = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<DocumentIndex>(&bytes).map_err(|e| {
                error!(path = %path.display(), error = %e, "corrupt vector store snapshot");
                RagError::store_query(BACKEND, format!("failed to parse {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => DocumentIndex::default(),
            Err(e) => {
                return Err(RagError::store_query(
                    BACKEND,
                    format!("failed to read {}: {e}", path.display()),
                ));
            }
        };
        info!(path = %path.display(), documents = index.len(), "opened file vector store");
        Ok(Self { path, index: RwLock::new(index), writer: Mutex::new(()) })
    }

    /// The snapshot file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, index: &DocumentIndex) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec(index).map_err(std::io::Error::other)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await
    }
}

#[async_trait]
impl VectorStore for FileVectorStore {
    async fn upsert(&self, documents: &[Document]) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        let _writer = self.writer.lock().await;
        let mut next = self.index.read().await.clone();
        let outcome = next.apply(documents);

        if outcome.stored > 0 {
            if let Err(e) = self.persist(&next).await {
                error!(path = %self.path.display(), error = %e, "failed to flush vector store");
                return Err(RagError::StoreWrite {
                    backend: BACKEND.to_string(),
                    message: format!("failed to write {}: {e}", self.path.display()),
                    stored: 0,
                    requested: documents.len(),
                });
            }
            *self.index.write().await = next;
        }

        debug!(backend = BACKEND, stored = outcome.stored, requested = documents.len(), "upsert");
        outcome.into_result(BACKEND, documents.len())
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        Ok(self.index.read().await.ids())
    }

    async fn query_nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<Document>> {
        Ok(self.index.read().await.nearest(embedding, k))
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.index.read().await.get(id))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.index.read().await.len())
    }

    fn backend(&self) -> &str {
        BACKEND
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, text: &str, embedding: Vec<f32>) -> Document {
        Document { id: id.into(), text: text.into(), embedding }
    }

    #[tokio::test]
    async fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileVectorStore::open(dir.path().join("store.json")).await.unwrap();
        assert!(store.list_ids().await.unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn documents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = FileVectorStore::open(&path).await.unwrap();
        store
            .upsert(&[doc("a", "alpha", vec![1.0, 0.0]), doc("b", "beta", vec![0.0, 1.0])])
            .await
            .unwrap();
        drop(store);

        let reopened = FileVectorStore::open(&path).await.unwrap();
        assert_eq!(reopened.list_ids().await.unwrap(), vec!["a".to_string(), "b".to_string()]);
        let nearest = reopened.query_nearest(&[0.0, 1.0], 1).await.unwrap();
        assert_eq!(nearest[0].text, "beta");
    }

    #[tokio::test]
    async fn snapshot_without_embedding_field_loads_with_empty_vectors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        tokio::fs::write(&path, br#"{"documents":{"x":{"id":"x","text":"legacy"}}}"#)
            .await
            .unwrap();

        let store = FileVectorStore::open(&path).await.unwrap();
        let found = store.get("x").await.unwrap().unwrap();
        assert_eq!(found.text, "legacy");
        assert!(found.embedding.is_empty());
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        tokio::fs::write(&path, b"not json").await.unwrap();
        let err = FileVectorStore::open(&path).await.unwrap_err();
        assert!(matches!(err, RagError::StoreQuery { .. }));
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn reads_proceed_while_a_flush_is_blocked() {
        use std::sync::Arc;
        use std::time::Duration;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = Arc::new(FileVectorStore::open(&path).await.unwrap());
        store.upsert(&[doc("a", "alpha", vec![1.0, 0.0])]).await.unwrap();

        // A FIFO at the temp path blocks the flush until someone reads it.
        let tmp = path.with_extension("json.tmp");
        let status = std::process::Command::new("mkfifo").arg(&tmp).status().unwrap();
        assert!(status.success());

        let writer = {
            let store = store.clone();
            tokio::spawn(async move { store.upsert(&[doc("b", "beta", vec![0.0, 1.0])]).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!writer.is_finished());

        let ids = tokio::time::timeout(Duration::from_secs(2), store.list_ids())
            .await
            .expect("read blocked behind the flush")
            .unwrap();
        assert_eq!(ids, vec!["a".to_string()]);
        let query = store.query_nearest(&[0.0, 1.0], 1);
        let nearest = tokio::time::timeout(Duration::from_secs(2), query)
            .await
            .expect("query blocked behind the flush")
            .unwrap();
        assert_eq!(nearest[0].id, "a");

        let drain = tokio::task::spawn_blocking(move || std::fs::read(&tmp));
        assert_eq!(writer.await.unwrap().unwrap(), 1);
        drain.await.unwrap().unwrap();
        assert_eq!(store.list_ids().await.unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn partial_write_persists_accepted_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = FileVectorStore::open(&path).await.unwrap();
        store.upsert(&[doc("a", "alpha", vec![1.0, 0.0])]).await.unwrap();

        let err = store
            .upsert(&[doc("b", "beta", vec![0.0, 1.0]), doc("c", "gamma", vec![1.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::StoreWrite { stored: 1, requested: 2, .. }));

        let reopened = FileVectorStore::open(&path).await.unwrap();
        assert_eq!(reopened.len().await.unwrap(), 2);
        assert!(reopened.get("c").await.unwrap().is_none());
    }
}
