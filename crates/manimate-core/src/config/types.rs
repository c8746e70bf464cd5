use std::path::PathBuf;

use manimate_index::indexer::{
    DEFAULT_API_COLLECTION, DEFAULT_BATCH_SIZE, DEFAULT_EXAMPLES_COLLECTION,
};
use manimate_index::keyword::DEFAULT_MAX_RESULTS;
use serde::{Deserialize, Serialize};

use crate::secret::Secret;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

/// Embedding backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    #[default]
    Voyage,
    Ollama,
    #[cfg(feature = "mock")]
    Mock,
}

impl EmbeddingProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Voyage => "voyage",
            Self::Ollama => "ollama",
            #[cfg(feature = "mock")]
            Self::Mock => "mock",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProviderKind,
    /// Provider default when unset.
    #[serde(default)]
    pub model: Option<String>,
    /// Provider default when unset.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_embedding_batch_size() -> usize {
    manimate_llm::provider::MAX_EMBED_BATCH
}

fn default_max_retries() -> u32 {
    3
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            model: None,
            base_url: None,
            batch_size: default_embedding_batch_size(),
            max_retries: default_max_retries(),
        }
    }
}

/// Vector store backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Qdrant,
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,
    #[serde(default = "default_api_collection")]
    pub api_collection: String,
    #[serde(default = "default_examples_collection")]
    pub examples_collection: String,
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".into()
}

fn default_api_collection() -> String {
    DEFAULT_API_COLLECTION.into()
}

fn default_examples_collection() -> String {
    DEFAULT_EXAMPLES_COLLECTION.into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            qdrant_url: default_qdrant_url(),
            api_collection: default_api_collection(),
            examples_collection: default_examples_collection(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    /// Root of the installed library package to chunk.
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,
    #[serde(default = "default_package_name")]
    pub package_name: String,
    #[serde(default = "default_examples_dir")]
    pub examples_dir: PathBuf,
    #[serde(default = "default_index_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_auto_build")]
    pub auto_build: bool,
}

fn default_source_root() -> PathBuf {
    PathBuf::from("manim")
}

fn default_package_name() -> String {
    "manim".into()
}

fn default_examples_dir() -> PathBuf {
    PathBuf::from("curated")
}

fn default_index_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_auto_build() -> bool {
    true
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            source_root: default_source_root(),
            package_name: default_package_name(),
            examples_dir: default_examples_dir(),
            batch_size: default_index_batch_size(),
            auto_build: default_auto_build(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k_api")]
    pub top_k_api: usize,
    #[serde(default = "default_top_k_examples")]
    pub top_k_examples: usize,
    /// Cap on keyword fallback results.
    #[serde(default = "default_fallback_max_results")]
    pub fallback_max_results: usize,
}

fn default_top_k_api() -> usize {
    10
}

fn default_top_k_examples() -> usize {
    5
}

fn default_fallback_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k_api: default_top_k_api(),
            top_k_examples: default_top_k_examples(),
            fallback_max_results: default_fallback_max_results(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ResolvedSecrets {
    pub voyage_api_key: Option<Secret>,
}
