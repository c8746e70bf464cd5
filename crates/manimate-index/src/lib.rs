//! Library-API chunking, curated example indexing, and semantic retrieval.
//!
//! The [`chunker`] turns a Python library tree into module and class chunks, the
//! [`indexer`] embeds those chunks and the curated [`examples`] into two collections, and
//! the [`retriever`] searches both. [`keyword`] provides the lexical fallback used when
//! semantic search is unavailable.

pub mod chunker;
pub mod error;
pub mod examples;
pub mod indexer;
pub mod keyword;
pub mod metadata;
pub mod retriever;

pub use error::{IndexError, Result};
pub use examples::{Difficulty, Example, ExampleLibrary};
pub use indexer::{IndexCounts, IndexStats, Indexer, IndexerConfig};
pub use keyword::KeywordScorer;
pub use retriever::{
    ApiRef, DegradeReason, ExampleHit, RagRetriever, RetrievalOutcome, RetrieverConfig,
    RetrieverState, SearchResults,
};
