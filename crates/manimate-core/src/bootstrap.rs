//! Wiring from [`Config`] to the embedder, vector store, retriever, and context
//! assembler.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use manimate_index::chunker::ChunkerConfig;
use manimate_index::{
    ExampleLibrary, Indexer, IndexerConfig, KeywordScorer, RagRetriever, RetrieverConfig,
};
use manimate_llm::EmbeddingProvider;
use manimate_llm::any::AnyEmbedder;
use manimate_llm::ollama::{self, OllamaProvider};
use manimate_llm::voyage::{self, VoyageProvider};
use manimate_store::{InMemoryVectorStore, QdrantStore, VectorStore};

use crate::config::{Config, EmbeddingProviderKind, StoreBackend};
use crate::context::ContextAssembler;

pub struct AppBuilder {
    config: Config,
    config_path: PathBuf,
}

impl AppBuilder {
    /// Resolve the config path, load and validate the config, read secrets.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be parsed or fails validation.
    pub fn load(cli_path: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = resolve_config_path(cli_path);
        let mut config = Config::load(&config_path)?;
        config.validate()?;
        config.resolve_secrets();
        tracing::debug!(path = %config_path.display(), "configuration loaded");
        Ok(Self {
            config,
            config_path,
        })
    }

    #[must_use]
    pub fn from_config(config: Config, config_path: PathBuf) -> Self {
        Self {
            config,
            config_path,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// # Errors
    ///
    /// Returns an error if the embedder or store cannot be created.
    pub fn build_retriever(&self) -> anyhow::Result<Arc<RagRetriever<AnyEmbedder>>> {
        let embedder = create_embedder(&self.config)?;
        let store = create_store(&self.config)?;
        tracing::info!(
            provider = embedder.name(),
            backend = ?self.config.store.backend,
            "retriever backends ready"
        );
        Ok(self.build_retriever_with(embedder, store))
    }

    /// Build a retriever over an explicit provider and store.
    pub fn build_retriever_with<P: EmbeddingProvider>(
        &self,
        provider: P,
        store: Arc<dyn VectorStore>,
    ) -> Arc<RagRetriever<P>> {
        let indexer = Indexer::new(store, Arc::new(provider), indexer_config(&self.config));
        Arc::new(RagRetriever::new(indexer, retriever_config(&self.config)))
    }

    /// # Errors
    ///
    /// Returns an error if the examples directory exists but cannot be read.
    pub fn load_library(&self) -> anyhow::Result<Arc<ExampleLibrary>> {
        let library = ExampleLibrary::load(&self.config.index.examples_dir)
            .context("failed to load curated examples")?;
        Ok(Arc::new(library))
    }

    /// # Errors
    ///
    /// Returns an error if the example library cannot be loaded.
    pub fn build_assembler<P: EmbeddingProvider>(
        &self,
        retriever: Arc<RagRetriever<P>>,
    ) -> anyhow::Result<ContextAssembler<P>> {
        let library = self.load_library()?;
        let scorer = KeywordScorer::new(self.config.retrieval.fallback_max_results);
        Ok(ContextAssembler::new(retriever, library, scorer))
    }
}

/// Priority: `--config` > `MANIMATE_CONFIG` env > `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli_path: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_path {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("MANIMATE_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

/// # Errors
///
/// Returns an error if the Voyage backend is selected without an API key.
pub fn create_embedder(config: &Config) -> anyhow::Result<AnyEmbedder> {
    let cfg = &config.embedding;
    match cfg.provider {
        EmbeddingProviderKind::Voyage => {
            let Some(key) = config.secrets.voyage_api_key.as_ref() else {
                bail!("voyage embeddings need MANIMATE_VOYAGE_API_KEY or VOYAGE_API_KEY");
            };
            let provider = VoyageProvider::new(
                key.expose().to_owned(),
                cfg.base_url
                    .clone()
                    .unwrap_or_else(|| voyage::DEFAULT_BASE_URL.into()),
                cfg.model
                    .clone()
                    .unwrap_or_else(|| voyage::DEFAULT_MODEL.into()),
            )
            .context("failed to create voyage embedder")?
            .with_batch_size(cfg.batch_size)
            .with_max_retries(cfg.max_retries);
            Ok(AnyEmbedder::Voyage(provider))
        }
        EmbeddingProviderKind::Ollama => {
            let base_url = cfg.base_url.as_deref().unwrap_or(ollama::DEFAULT_BASE_URL);
            let model = cfg
                .model
                .clone()
                .unwrap_or_else(|| ollama::DEFAULT_MODEL.into());
            Ok(AnyEmbedder::Ollama(
                OllamaProvider::new(base_url, model).with_batch_size(cfg.batch_size),
            ))
        }
        #[cfg(feature = "mock")]
        EmbeddingProviderKind::Mock => Ok(AnyEmbedder::Mock(
            manimate_llm::mock::MockEmbedder::new(MOCK_DIMENSIONS),
        )),
    }
}

#[cfg(feature = "mock")]
const MOCK_DIMENSIONS: usize = 256;

/// # Errors
///
/// Returns an error if the Qdrant client cannot be created.
pub fn create_store(config: &Config) -> anyhow::Result<Arc<dyn VectorStore>> {
    match config.store.backend {
        StoreBackend::Qdrant => {
            let url = &config.store.qdrant_url;
            let qdrant = QdrantStore::new(url)
                .with_context(|| format!("failed to create qdrant client for {url}"))?;
            Ok(Arc::new(qdrant))
        }
        StoreBackend::Memory => Ok(Arc::new(InMemoryVectorStore::new())),
    }
}

#[must_use]
pub fn indexer_config(config: &Config) -> IndexerConfig {
    IndexerConfig {
        source_root: config.index.source_root.clone(),
        examples_dir: config.index.examples_dir.clone(),
        api_collection: config.store.api_collection.clone(),
        examples_collection: config.store.examples_collection.clone(),
        batch_size: config.index.batch_size,
        chunker: ChunkerConfig {
            package_name: config.index.package_name.clone(),
            ..ChunkerConfig::default()
        },
    }
}

#[must_use]
pub fn retriever_config(config: &Config) -> RetrieverConfig {
    RetrieverConfig {
        top_k_api: config.retrieval.top_k_api,
        top_k_examples: config.retrieval.top_k_examples,
        auto_build: config.index.auto_build,
    }
}
