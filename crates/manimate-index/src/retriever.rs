//! Dual-collection semantic retrieval with explicit readiness state.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use manimate_llm::EmbeddingProvider;
use manimate_store::{Collection, QueryHit};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{IndexError, Result};
use crate::indexer::{IndexCounts, Indexer};
use crate::metadata::{ChunkMetadata, ExampleMetadata};

/// Retrieval configuration.
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// API chunks returned by [`RagRetriever::retrieve`] (default: 10).
    pub top_k_api: usize,
    /// Examples returned by [`RagRetriever::retrieve`] (default: 5).
    pub top_k_examples: usize,
    /// Build a missing index during `initialize` instead of failing (default: true).
    pub auto_build: bool,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            top_k_api: 10,
            top_k_examples: 5,
            auto_build: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrieverState {
    Uninitialized,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRef {
    pub id: String,
    pub name: String,
    pub module: String,
    pub kind: String,
    pub content: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleHit {
    pub id: String,
    pub name: String,
    pub code: String,
    pub notes: String,
    pub tags: Vec<String>,
    pub description: String,
    pub score: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub api_refs: Vec<ApiRef>,
    pub examples: Vec<ExampleHit>,
}

impl SearchResults {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.api_refs.is_empty() && self.examples.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradeReason {
    NotReady,
    InitFailed(String),
    SearchFailed(String),
}

impl fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => f.write_str("retriever not initialized"),
            Self::InitFailed(msg) => write!(f, "retriever initialization failed: {msg}"),
            Self::SearchFailed(msg) => write!(f, "semantic search failed: {msg}"),
        }
    }
}

/// What the caller gets from [`RagRetriever::retrieve`]: results, or the reason it
/// should fall back to keyword search.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalOutcome {
    Ok(SearchResults),
    Degraded(DegradeReason),
}

/// `1 - distance`, clamped into `[0, 1]`.
#[must_use]
pub fn similarity(distance: f32) -> f32 {
    (1.0 - distance).clamp(0.0, 1.0)
}

impl From<QueryHit> for ApiRef {
    fn from(hit: QueryHit) -> Self {
        let meta = ChunkMetadata::from_payload(&hit.metadata);
        Self {
            id: hit.id,
            name: meta.name,
            module: meta.module,
            kind: meta.kind,
            content: hit.document,
            score: similarity(hit.distance),
        }
    }
}

impl From<QueryHit> for ExampleHit {
    fn from(hit: QueryHit) -> Self {
        let meta = ExampleMetadata::from_payload(&hit.metadata);
        let name = if meta.name.is_empty() {
            hit.id.clone()
        } else {
            meta.name
        };
        Self {
            id: hit.id,
            name,
            code: meta.code,
            notes: meta.notes,
            tags: meta.tags,
            description: meta.description,
            score: similarity(hit.distance),
        }
    }
}

struct Bound<P> {
    api: Collection<P>,
    examples: Collection<P>,
}

type Searched = (Result<Vec<ApiRef>>, Result<Vec<ExampleHit>>);

/// Semantic retriever over the API and examples collections.
///
/// Starts `Uninitialized`; [`initialize`](Self::initialize) builds or validates the index
/// and moves it to `Ready` or `Failed`. Concurrent `initialize` calls run one at a time.
pub struct RagRetriever<P> {
    indexer: Indexer<P>,
    config: RetrieverConfig,
    state: RwLock<RetrieverState>,
    bound: RwLock<Option<Bound<P>>>,
    init_lock: Mutex<()>,
}

impl<P: EmbeddingProvider> RagRetriever<P> {
    #[must_use]
    pub fn new(indexer: Indexer<P>, config: RetrieverConfig) -> Self {
        Self {
            indexer,
            config,
            state: RwLock::new(RetrieverState::Uninitialized),
            bound: RwLock::new(None),
            init_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn indexer(&self) -> &Indexer<P> {
        &self.indexer
    }

    #[must_use]
    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> RetrieverState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == RetrieverState::Ready
    }

    /// Build (or reuse) the index, verify both collections exist, and mark the retriever
    /// ready.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::IndexUnavailable`] when the index is missing and
    /// `auto_build` is off, or when a build left a collection missing. Build errors
    /// propagate. Any error leaves the retriever `Failed`.
    pub async fn initialize(&self, rebuild: bool) -> Result<IndexCounts> {
        let _guard = self.init_lock.lock().await;
        match self.initialize_locked(rebuild).await {
            Ok(counts) => {
                self.set_state(RetrieverState::Ready);
                tracing::info!(
                    api_chunks = counts.api_chunks,
                    examples = counts.examples,
                    "retriever ready"
                );
                Ok(counts)
            }
            Err(e) => {
                *self.bound.write().unwrap_or_else(PoisonError::into_inner) = None;
                self.set_state(RetrieverState::Failed(e.to_string()));
                tracing::warn!(error = %e, "retriever initialization failed");
                Err(e)
            }
        }
    }

    async fn initialize_locked(&self, rebuild: bool) -> Result<IndexCounts> {
        let counts = if !rebuild && !self.config.auto_build {
            if !self.indexer.index_exists().await? {
                return Err(IndexError::IndexUnavailable(
                    "collections missing and auto_build is disabled".into(),
                ));
            }
            self.indexer.stats().await?.counts()
        } else {
            self.indexer.build_index(rebuild).await?
        };

        let api = self.indexer.api_collection();
        let examples = self.indexer.examples_collection();
        for collection in [api, examples] {
            if !collection.exists().await? {
                return Err(IndexError::IndexUnavailable(format!(
                    "collection {} missing after initialization",
                    collection.name()
                )));
            }
        }

        *self.bound.write().unwrap_or_else(PoisonError::into_inner) = Some(Bound {
            api: api.clone(),
            examples: examples.clone(),
        });
        Ok(counts)
    }

    fn set_state(&self, state: RetrieverState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn bound(&self) -> Result<(Collection<P>, Collection<P>)> {
        let bound = self.bound.read().unwrap_or_else(PoisonError::into_inner);
        bound
            .as_ref()
            .map(|b| (b.api.clone(), b.examples.clone()))
            .ok_or(IndexError::NotReady)
    }

    /// Search both collections concurrently. A failing collection contributes an empty
    /// list.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotReady`] before a successful `initialize`.
    pub async fn search(
        &self,
        query: &str,
        top_k_api: usize,
        top_k_examples: usize,
    ) -> Result<SearchResults> {
        let (api, examples) = self.search_collections(query, top_k_api, top_k_examples).await?;
        Ok(SearchResults {
            api_refs: degrade("api", api),
            examples: degrade("examples", examples),
        })
    }

    /// Search with the configured `top_k` values, reporting degradation instead of
    /// failing.
    pub async fn retrieve(&self, query: &str) -> RetrievalOutcome {
        match self.state() {
            RetrieverState::Ready => {}
            RetrieverState::Uninitialized => {
                return RetrievalOutcome::Degraded(DegradeReason::NotReady);
            }
            RetrieverState::Failed(msg) => {
                return RetrievalOutcome::Degraded(DegradeReason::InitFailed(msg));
            }
        }

        let searched = self
            .search_collections(query, self.config.top_k_api, self.config.top_k_examples)
            .await;
        match searched {
            Err(IndexError::NotReady) => RetrievalOutcome::Degraded(DegradeReason::NotReady),
            Err(e) => RetrievalOutcome::Degraded(DegradeReason::SearchFailed(e.to_string())),
            Ok((Err(api_err), Err(examples_err))) => {
                tracing::warn!(
                    api = %api_err,
                    examples = %examples_err,
                    "both collection searches failed"
                );
                RetrievalOutcome::Degraded(DegradeReason::SearchFailed(format!(
                    "api: {api_err}; examples: {examples_err}"
                )))
            }
            Ok((api, examples)) => RetrievalOutcome::Ok(SearchResults {
                api_refs: degrade("api", api),
                examples: degrade("examples", examples),
            }),
        }
    }

    async fn search_collections(
        &self,
        query: &str,
        top_k_api: usize,
        top_k_examples: usize,
    ) -> Result<Searched> {
        let (api, examples) = self.bound()?;
        let (api_hits, example_hits) = tokio::join!(
            api.query(query, top_k_api),
            examples.query(query, top_k_examples)
        );
        tracing::debug!(
            query,
            api_ok = api_hits.is_ok(),
            examples_ok = example_hits.is_ok(),
            "semantic search"
        );
        Ok((
            api_hits
                .map(|hits| hits.into_iter().map(ApiRef::from).collect())
                .map_err(IndexError::from),
            example_hits
                .map(|hits| hits.into_iter().map(ExampleHit::from).collect())
                .map_err(IndexError::from),
        ))
    }
}

fn degrade<T>(collection: &str, result: Result<Vec<T>>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        tracing::warn!(collection, error = %e, "collection search failed, returning no results");
        Vec::new()
    })
}
