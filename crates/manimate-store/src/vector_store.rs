use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// JSON payload stored next to each vector.
pub type Payload = HashMap<String, serde_json::Value>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Collection-level operation that failed inside a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Create,
    Drop,
    Count,
    Upsert,
    Search,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Drop => "drop",
            Self::Count => "count",
            Self::Upsert => "upsert",
            Self::Search => "search",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VectorStoreError {
    #[error("vector store unreachable: {0}")]
    Connection(String),

    #[error("collection {0} does not exist")]
    MissingCollection(String),

    #[error("point {id} has {got} dimensions, collection {collection} expects {expected}")]
    DimensionMismatch {
        collection: String,
        id: String,
        expected: u64,
        got: usize,
    },

    #[error("{op} on {collection} failed: {message}")]
    Backend {
        op: StoreOp,
        collection: String,
        message: String,
    },

    #[error("payload encoding failed: {0}")]
    Payload(String),
}

impl VectorStoreError {
    pub fn backend(op: StoreOp, collection: &str, err: impl fmt::Display) -> Self {
        Self::Backend {
            op,
            collection: collection.to_owned(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

/// A search hit. `distance` is cosine distance (`1 - cosine similarity`, in `[0, 2]`),
/// smaller is nearer.
#[derive(Debug, Clone)]
pub struct ScoredVectorPoint {
    pub id: String,
    pub distance: f32,
    pub payload: Payload,
}

/// Storage seam shared by the Qdrant and in-memory backends.
///
/// Collections are cosine-distance only. `search` returns at most `limit` hits ordered
/// nearest first. `delete_collection` on a missing collection is not an error; `count`,
/// `upsert` and `search` on one are.
pub trait VectorStore: Send + Sync {
    /// Create `collection` for `vector_size`-dimensional vectors unless it already exists.
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>>;

    fn delete_collection(&self, collection: &str) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    fn count(&self, collection: &str) -> BoxFuture<'_, Result<u64, VectorStoreError>>;

    /// Insert or replace points by id.
    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>>;
}
