use manimate_store::{CollectionError, VectorStoreError};

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Reading package sources or the curated examples directory.
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    /// Tree-sitter setup or parse failure.
    #[error("python parse failed: {0}")]
    Parse(String),

    /// Embedding provider failure.
    #[error(transparent)]
    Embedding(#[from] manimate_llm::LlmError),

    /// Vector store failure.
    #[error(transparent)]
    Store(#[from] VectorStoreError),

    /// `search` called before a successful `initialize`.
    #[error("retriever is not initialized")]
    NotReady,

    /// Collections are missing and building them is not allowed or did not produce them.
    #[error("index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("{0}")]
    Other(String),
}

impl From<CollectionError> for IndexError {
    fn from(err: CollectionError) -> Self {
        match err {
            CollectionError::Embedding(e) => Self::Embedding(e),
            CollectionError::Store(e) => Self::Store(e),
            other => Self::Other(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
