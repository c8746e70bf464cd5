//! Index orchestrator: chunk library source and load examples, embed, store.

use std::path::PathBuf;
use std::sync::Arc;

use manimate_llm::EmbeddingProvider;
use manimate_store::{Collection, Metadata, VectorStore};
use serde::Serialize;

use crate::chunker::{ChunkerConfig, extract_chunks};
use crate::error::{IndexError, Result};
use crate::examples::{Example, ExampleLibrary};
use crate::metadata::{ChunkMetadata, ExampleMetadata};

pub const DEFAULT_API_COLLECTION: &str = "manim_api";
pub const DEFAULT_EXAMPLES_COLLECTION: &str = "manim_examples";
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Indexer configuration.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Root of the library's Python package.
    pub source_root: PathBuf,
    /// Curated example directory.
    pub examples_dir: PathBuf,
    pub api_collection: String,
    pub examples_collection: String,
    /// Documents per `add` call (default: 100).
    pub batch_size: usize,
    pub chunker: ChunkerConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("manim"),
            examples_dir: PathBuf::from("curated"),
            api_collection: DEFAULT_API_COLLECTION.into(),
            examples_collection: DEFAULT_EXAMPLES_COLLECTION.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            chunker: ChunkerConfig::default(),
        }
    }
}

/// Documents per collection after a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexCounts {
    pub api_chunks: usize,
    pub examples: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    pub name: String,
    pub exists: bool,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub api: CollectionStats,
    pub examples: CollectionStats,
}

impl IndexStats {
    #[must_use]
    pub fn counts(&self) -> IndexCounts {
        IndexCounts {
            api_chunks: usize::try_from(self.api.count).unwrap_or(usize::MAX),
            examples: usize::try_from(self.examples.count).unwrap_or(usize::MAX),
        }
    }
}

/// Builds the API and examples collections.
pub struct Indexer<P> {
    api: Collection<P>,
    examples: Collection<P>,
    config: IndexerConfig,
}

impl<P: EmbeddingProvider> Indexer<P> {
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>, provider: Arc<P>, config: IndexerConfig) -> Self {
        let api = Collection::new(
            config.api_collection.clone(),
            Arc::clone(&store),
            Arc::clone(&provider),
        );
        let examples = Collection::new(config.examples_collection.clone(), store, provider);
        Self {
            api,
            examples,
            config,
        }
    }

    #[must_use]
    pub fn api_collection(&self) -> &Collection<P> {
        &self.api
    }

    #[must_use]
    pub fn examples_collection(&self) -> &Collection<P> {
        &self.examples
    }

    #[must_use]
    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Build both collections.
    ///
    /// With `rebuild = false` an index whose collections both exist and are non-empty is
    /// reused without any embedding calls. Otherwise both collections are dropped and
    /// rebuilt from scratch.
    ///
    /// # Errors
    ///
    /// Returns an error if chunking, embedding or a store write fails. Batches written
    /// before the failure are kept.
    pub async fn build_index(&self, rebuild: bool) -> Result<IndexCounts> {
        if !rebuild && let Some(counts) = self.existing_counts().await? {
            tracing::info!(
                api_chunks = counts.api_chunks,
                examples = counts.examples,
                "index already built, skipping"
            );
            return Ok(counts);
        }

        self.drop_collections().await;

        let started = std::time::Instant::now();
        let api_chunks = self.index_api().await?;
        let examples = self.index_examples().await?;
        let counts = IndexCounts {
            api_chunks,
            examples,
        };

        tracing::info!(
            api_chunks,
            examples,
            rebuild,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "index built"
        );
        Ok(counts)
    }

    /// Whether both collections exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    pub async fn index_exists(&self) -> Result<bool> {
        Ok(self.api.exists().await? && self.examples.exists().await?)
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    pub async fn stats(&self) -> Result<IndexStats> {
        Ok(IndexStats {
            api: collection_stats(&self.api).await?,
            examples: collection_stats(&self.examples).await?,
        })
    }

    async fn existing_counts(&self) -> Result<Option<IndexCounts>> {
        let stats = self.stats().await?;
        let populated = |c: &CollectionStats| c.exists && c.count > 0;
        if populated(&stats.api) && populated(&stats.examples) {
            return Ok(Some(stats.counts()));
        }
        Ok(None)
    }

    async fn drop_collections(&self) {
        for collection in [&self.api, &self.examples] {
            if let Err(e) = collection.delete().await {
                tracing::debug!(collection = collection.name(), error = %e, "delete skipped");
            }
        }
    }

    async fn index_api(&self) -> Result<usize> {
        let root = self.config.source_root.clone();
        let chunker = self.config.chunker.clone();
        let chunks = tokio::task::spawn_blocking(move || extract_chunks(&root, &chunker))
            .await
            .map_err(|e| IndexError::Other(format!("chunker task failed: {e}")))??;

        if chunks.is_empty() {
            self.api.ensure_empty().await?;
            return Ok(0);
        }

        let total = chunks.len();
        let mut indexed = 0;
        for batch in chunks.chunks(self.batch_size()) {
            let ids = batch.iter().map(|c| c.id.clone()).collect();
            let documents = batch.iter().map(|c| c.content.clone()).collect();
            let metadata: Vec<Metadata> = batch
                .iter()
                .map(|c| {
                    ChunkMetadata::from_chunk(c, self.config.chunker.max_methods).to_payload()
                })
                .collect();
            indexed += self.api.add(ids, documents, metadata).await?;
            tracing::debug!(
                collection = self.api.name(),
                progress = format_args!("{indexed}/{total}"),
            );
        }
        Ok(indexed)
    }

    async fn index_examples(&self) -> Result<usize> {
        let library = ExampleLibrary::load(&self.config.examples_dir)?;
        if library.is_empty() {
            self.examples.ensure_empty().await?;
            return Ok(0);
        }

        let mut indexed = 0;
        for batch in library.list().chunks(self.batch_size()) {
            let ids = batch.iter().map(|e| e.id.clone()).collect();
            let documents = batch.iter().map(example_document).collect();
            let metadata: Vec<Metadata> = batch
                .iter()
                .map(|e| ExampleMetadata::from(e).to_payload())
                .collect();
            indexed += self.examples.add(ids, documents, metadata).await?;
        }
        Ok(indexed)
    }

    fn batch_size(&self) -> usize {
        self.config.batch_size.max(1)
    }
}

async fn collection_stats<P: EmbeddingProvider>(
    collection: &Collection<P>,
) -> Result<CollectionStats> {
    let exists = collection.exists().await?;
    let count = if exists { collection.count().await? } else { 0 };
    Ok(CollectionStats {
        name: collection.name().to_owned(),
        exists,
        count,
    })
}

/// Embedded text for an example.
#[must_use]
pub fn example_document(example: &Example) -> String {
    let mut doc = format!("Example: {}\n", example.name);
    if !example.description.is_empty() {
        doc.push_str(&format!("Description: {}\n", example.description));
    }
    if !example.tags.is_empty() {
        doc.push_str(&format!("Tags: {}\n", example.tags.join(", ")));
    }
    doc.push_str(&format!("\nCode:\n{}", example.code));
    if !example.notes.is_empty() {
        doc.push_str(&format!("\n\nNotes:\n{}", example.notes));
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::examples::Difficulty;

    fn example() -> Example {
        Example {
            id: "01_axes".into(),
            name: "Axes Plot".into(),
            tags: vec!["axes".into(), "plot".into()],
            difficulty: Difficulty::Easy,
            description: "Plot a sine curve".into(),
            code: "axes = Axes()".into(),
            notes: "Use axes.plot".into(),
        }
    }

    #[test]
    fn example_document_full() {
        assert_eq!(
            example_document(&example()),
            "Example: Axes Plot\nDescription: Plot a sine curve\nTags: axes, plot\n\nCode:\naxes = Axes()\n\nNotes:\nUse axes.plot"
        );
    }

    #[test]
    fn example_document_minimal() {
        let e = Example {
            description: String::new(),
            tags: Vec::new(),
            notes: String::new(),
            ..example()
        };
        assert_eq!(example_document(&e), "Example: Axes Plot\n\nCode:\naxes = Axes()");
    }

    #[test]
    fn default_config() {
        let config = IndexerConfig::default();
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.api_collection, "manim_api");
        assert_eq!(config.examples_collection, "manim_examples");
    }

    #[test]
    fn counts_serialize() {
        let json = serde_json::to_value(IndexCounts {
            api_chunks: 3,
            examples: 2,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"api_chunks": 3, "examples": 2}));
    }
}
