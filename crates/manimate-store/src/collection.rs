use std::sync::Arc;

use manimate_llm::{EmbeddingProvider, InputType, LlmError};

use crate::vector_store::{Payload, VectorPoint, VectorStore, VectorStoreError};

/// Flat per-document metadata. Values are JSON scalars; list-valued fields are stored
/// as JSON-encoded strings by convention.
pub type Metadata = Payload;

const DOCUMENT_FIELD: &str = "document";
const ID_FIELD: &str = "id";

/// Text used to discover the provider's vector size when an empty collection must be
/// created.
const PROBE_TEXT: &str = "dimension probe";

#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] LlmError),
    #[error(transparent)]
    Store(#[from] VectorStoreError),
    #[error("length mismatch: {ids} ids, {documents} documents, {metadata} metadata entries")]
    LengthMismatch {
        ids: usize,
        documents: usize,
        metadata: usize,
    },
    #[error("provider returned {got} vectors for {expected} documents")]
    VectorCount { expected: usize, got: usize },
}

#[derive(Debug, Clone)]
pub struct QueryHit {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
    /// Cosine distance, smaller is nearer.
    pub distance: f32,
}

/// One named collection in a vector store, embedded by `P`.
pub struct Collection<P> {
    name: String,
    store: Arc<dyn VectorStore>,
    provider: Arc<P>,
}

impl<P> Clone for Collection<P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            store: Arc::clone(&self.store),
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<P> std::fmt::Debug for Collection<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<P: EmbeddingProvider> Collection<P> {
    #[must_use]
    pub fn new(name: impl Into<String>, store: Arc<dyn VectorStore>, provider: Arc<P>) -> Self {
        Self {
            name: name.into(),
            store,
            provider,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    pub async fn exists(&self) -> Result<bool, CollectionError> {
        Ok(self.store.collection_exists(&self.name).await?)
    }

    /// # Errors
    ///
    /// Returns an error if the collection is missing or the store cannot be reached.
    pub async fn count(&self) -> Result<u64, CollectionError> {
        Ok(self.store.count(&self.name).await?)
    }

    /// # Errors
    ///
    /// Returns an error if the store refuses the deletion.
    pub async fn delete(&self) -> Result<(), CollectionError> {
        Ok(self.store.delete_collection(&self.name).await?)
    }

    /// Create the collection without adding documents. Embeds a probe text once to
    /// learn the vector size.
    ///
    /// # Errors
    ///
    /// Returns an error if the probe embedding or collection creation fails.
    pub async fn ensure_empty(&self) -> Result<(), CollectionError> {
        if self.exists().await? {
            return Ok(());
        }
        let probe = self.provider.embed_query(PROBE_TEXT).await?;
        self.store
            .ensure_collection(&self.name, probe.len() as u64)
            .await?;
        Ok(())
    }

    /// Embed `documents` and upsert them under `ids`, creating the collection on first
    /// use. Returns the number of documents written.
    ///
    /// # Errors
    ///
    /// Returns an error if the three inputs differ in length, embedding fails, or the
    /// store rejects the write.
    pub async fn add(
        &self,
        ids: Vec<String>,
        documents: Vec<String>,
        metadata: Vec<Metadata>,
    ) -> Result<usize, CollectionError> {
        if ids.len() != documents.len() || ids.len() != metadata.len() {
            return Err(CollectionError::LengthMismatch {
                ids: ids.len(),
                documents: documents.len(),
                metadata: metadata.len(),
            });
        }
        if ids.is_empty() {
            return Ok(0);
        }

        let vectors = self
            .provider
            .embed_batch(&documents, InputType::Document)
            .await?;
        if vectors.len() != documents.len() {
            return Err(CollectionError::VectorCount {
                expected: documents.len(),
                got: vectors.len(),
            });
        }
        let vector_size = vectors.first().map_or(0, Vec::len) as u64;
        self.store.ensure_collection(&self.name, vector_size).await?;

        let points: Vec<VectorPoint> = ids
            .into_iter()
            .zip(documents)
            .zip(metadata)
            .zip(vectors)
            .map(|(((id, document), mut payload), vector)| {
                payload.insert(ID_FIELD.into(), serde_json::Value::String(id.clone()));
                payload.insert(DOCUMENT_FIELD.into(), serde_json::Value::String(document));
                VectorPoint {
                    id,
                    vector,
                    payload,
                }
            })
            .collect();
        let written = points.len();
        self.store.upsert(&self.name, points).await?;
        tracing::debug!(collection = %self.name, written, "upserted documents");
        Ok(written)
    }

    /// Nearest `k` documents to `text`, nearest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query embedding or the store search fails.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<QueryHit>, CollectionError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let vector = self.provider.embed_query(text).await?;
        let points = self.store.search(&self.name, vector, k as u64).await?;
        Ok(points
            .into_iter()
            .map(|p| {
                let mut metadata = p.payload;
                let id = match metadata.remove(ID_FIELD) {
                    Some(serde_json::Value::String(id)) => id,
                    _ => p.id,
                };
                let document = match metadata.remove(DOCUMENT_FIELD) {
                    Some(serde_json::Value::String(doc)) => doc,
                    _ => String::new(),
                };
                QueryHit {
                    id,
                    document,
                    metadata,
                    distance: p.distance,
                }
            })
            .collect())
    }
}
