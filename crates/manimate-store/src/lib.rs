//! Persisted document collections over a pluggable vector store.
//!
//! A [`Collection`] binds one named collection of a [`VectorStore`] to an embedding
//! provider: documents are embedded on `add`, queries are embedded on `query`, and hits
//! come back ranked by cosine distance.

pub mod collection;
pub mod in_memory_store;
pub mod qdrant_store;
pub mod vector_store;

pub use collection::{Collection, CollectionError, Metadata, QueryHit};
pub use in_memory_store::InMemoryVectorStore;
pub use qdrant_store::QdrantStore;
pub use vector_store::{
    BoxFuture, Payload, ScoredVectorPoint, StoreOp, VectorPoint, VectorStore, VectorStoreError,
};
