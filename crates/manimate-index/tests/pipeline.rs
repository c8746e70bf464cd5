use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use manimate_index::{
    DegradeReason, IndexCounts, IndexError, Indexer, IndexerConfig, RagRetriever,
    RetrievalOutcome, RetrieverConfig, RetrieverState,
};
use manimate_llm::mock::MockEmbedder;
use manimate_store::{
    BoxFuture, InMemoryVectorStore, ScoredVectorPoint, VectorPoint, VectorStore,
    VectorStoreError,
};
use tempfile::TempDir;

const GEOMETRY: &str = r#""""Geometric primitives such as arcs and polygons."""

class Shape:
    pass


class Circle(Shape):
    """A circle with a radius."""

    def set_radius(self, r: float) -> None:
        self.r = r


class Square(Shape):
    """A square with equal sides."""

    def scale_sides(self, factor: float) -> None:
        pass
"#;

/// Store that can be told to fail searches on chosen collections.
#[derive(Default)]
struct FlakyStore {
    inner: InMemoryVectorStore,
    failing: Mutex<HashSet<String>>,
}

impl FlakyStore {
    fn fail_search(&self, collection: &str) {
        self.failing.lock().unwrap().insert(collection.to_owned());
    }
}

impl VectorStore for FlakyStore {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        self.inner.ensure_collection(collection, vector_size)
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        self.inner.collection_exists(collection)
    }

    fn delete_collection(&self, collection: &str) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        self.inner.delete_collection(collection)
    }

    fn count(&self, collection: &str) -> BoxFuture<'_, Result<u64, VectorStoreError>> {
        self.inner.count(collection)
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        self.inner.upsert(collection, points)
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        if self.failing.lock().unwrap().contains(collection) {
            let collection = collection.to_owned();
            return Box::pin(async move {
                Err(VectorStoreError::Connection(format!("{collection} unavailable")))
            });
        }
        self.inner.search(collection, vector, limit)
    }
}

fn write_example(root: &Path, id: &str, meta: &str, code: &str) {
    let dir = root.join(id);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("example.py"), code).unwrap();
    std::fs::write(dir.join("meta.json"), meta).unwrap();
}

fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let lib = dir.path().join("lib");
    std::fs::create_dir_all(&lib).unwrap();
    std::fs::write(lib.join("geometry.py"), GEOMETRY).unwrap();

    let curated = dir.path().join("curated");
    write_example(
        &curated,
        "01_moving_circle",
        r#"{"name": "Moving Circle", "tags": ["circle", "animate"]}"#,
        "circle = Circle(radius=2)\nself.play(circle.animate.shift(RIGHT))\n",
    );
    write_example(
        &curated,
        "02_vector_addition",
        r#"{"name": "Vector Addition", "tags": ["vector"]}"#,
        "arrow = Vector([1, 2])\nself.play(GrowArrow(arrow))\n",
    );
    dir
}

fn config(dir: &TempDir) -> IndexerConfig {
    IndexerConfig {
        source_root: dir.path().join("lib"),
        examples_dir: dir.path().join("curated"),
        batch_size: 2,
        ..IndexerConfig::default()
    }
}

fn retriever(
    dir: &TempDir,
    store: Arc<dyn VectorStore>,
    mock: &MockEmbedder,
    auto_build: bool,
) -> RagRetriever<MockEmbedder> {
    let indexer = Indexer::new(store, Arc::new(mock.clone()), config(dir));
    RagRetriever::new(
        indexer,
        RetrieverConfig {
            auto_build,
            ..RetrieverConfig::default()
        },
    )
}

// module chunk + Shape + Circle + Square
const API_CHUNKS: usize = 4;

#[tokio::test]
async fn second_build_reuses_index_without_embedding() {
    let dir = fixture();
    let mock = MockEmbedder::new(256);
    let indexer = Indexer::new(
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(mock.clone()),
        config(&dir),
    );

    let first = indexer.build_index(false).await.unwrap();
    assert_eq!(
        first,
        IndexCounts {
            api_chunks: API_CHUNKS,
            examples: 2
        }
    );
    let calls = mock.calls();
    assert!(calls > 0);

    let second = indexer.build_index(false).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(mock.calls(), calls);
}

#[tokio::test]
async fn rebuild_reextracts_and_reembeds() {
    let dir = fixture();
    let mock = MockEmbedder::new(256);
    let indexer = Indexer::new(
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(mock.clone()),
        config(&dir),
    );

    indexer.build_index(false).await.unwrap();
    let texts = mock.texts_embedded();
    assert_eq!(texts, API_CHUNKS + 2);

    std::fs::write(
        dir.path().join("lib/extra.py"),
        "class Arrow:\n    \"\"\"Points somewhere.\"\"\"\n",
    )
    .unwrap();
    let counts = indexer.build_index(true).await.unwrap();
    assert_eq!(counts.api_chunks, API_CHUNKS + 1);
    assert_eq!(mock.texts_embedded(), texts + API_CHUNKS + 1 + 2);

    let stats = indexer.stats().await.unwrap();
    assert_eq!(stats.api.count, (API_CHUNKS + 1) as u64);
    assert_eq!(stats.examples.count, 2);
}

#[tokio::test]
async fn empty_example_dir_still_creates_collection() {
    let dir = fixture();
    std::fs::remove_dir_all(dir.path().join("curated")).unwrap();
    let mock = MockEmbedder::new(256);
    let indexer = Indexer::new(
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(mock.clone()),
        config(&dir),
    );

    let counts = indexer.build_index(false).await.unwrap();
    assert_eq!(counts.examples, 0);
    let stats = indexer.stats().await.unwrap();
    assert!(stats.examples.exists);
    assert_eq!(stats.examples.count, 0);
    assert!(indexer.index_exists().await.unwrap());
}

#[tokio::test]
async fn embedding_failure_aborts_build() {
    let dir = fixture();
    let mock = MockEmbedder::failing();
    let indexer = Indexer::new(
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(mock),
        config(&dir),
    );
    assert!(matches!(
        indexer.build_index(false).await,
        Err(IndexError::Embedding(_))
    ));
}

#[tokio::test]
async fn search_before_initialize_is_not_ready() {
    let dir = fixture();
    let mock = MockEmbedder::new(256);
    let r = retriever(&dir, Arc::new(InMemoryVectorStore::new()), &mock, true);

    assert_eq!(r.state(), RetrieverState::Uninitialized);
    assert!(matches!(r.search("circle", 5, 5).await, Err(IndexError::NotReady)));
    assert_eq!(
        r.retrieve("circle").await,
        RetrievalOutcome::Degraded(DegradeReason::NotReady)
    );
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn initialize_then_search_ranks_relevant_chunks() {
    let dir = fixture();
    let mock = MockEmbedder::new(256);
    let r = retriever(&dir, Arc::new(InMemoryVectorStore::new()), &mock, true);

    let counts = r.initialize(false).await.unwrap();
    assert_eq!(counts.api_chunks, API_CHUNKS);
    assert!(r.is_ready());

    let results = r.search("circle radius", 2, 1).await.unwrap();
    assert_eq!(results.api_refs.len(), 2);
    let top = &results.api_refs[0];
    assert_eq!(top.id, "manim.geometry.Circle");
    assert_eq!(top.kind, "class");
    assert!(top.content.contains("set_radius(r: float) -> None"));
    assert!(results.api_refs.iter().all(|a| (0.0..=1.0).contains(&a.score)));
    assert!(results.api_refs[0].score >= results.api_refs[1].score);

    assert_eq!(results.examples.len(), 1);
    assert_eq!(results.examples[0].id, "01_moving_circle");
    assert_eq!(results.examples[0].tags, ["circle", "animate"]);
    assert!(results.examples[0].code.contains("Circle(radius=2)"));
}

#[tokio::test]
async fn one_failing_collection_degrades_only_that_list() {
    let dir = fixture();
    let mock = MockEmbedder::new(256);
    let flaky = Arc::new(FlakyStore::default());
    let store: Arc<dyn VectorStore> = flaky.clone();
    let r = retriever(&dir, store, &mock, true);
    r.initialize(false).await.unwrap();

    flaky.fail_search("manim_examples");
    let results = r.search("circle", 3, 3).await.unwrap();
    assert!(!results.api_refs.is_empty());
    assert!(results.examples.is_empty());

    match r.retrieve("circle").await {
        RetrievalOutcome::Ok(results) => {
            assert!(!results.api_refs.is_empty());
            assert!(results.examples.is_empty());
        }
        other => panic!("expected Ok outcome, got {other:?}"),
    }

    flaky.fail_search("manim_api");
    assert!(r.search("circle", 3, 3).await.unwrap().is_empty());
    assert!(matches!(
        r.retrieve("circle").await,
        RetrievalOutcome::Degraded(DegradeReason::SearchFailed(_))
    ));
}

#[tokio::test]
async fn failing_api_collection_still_returns_examples() {
    let dir = fixture();
    let mock = MockEmbedder::new(256);
    let flaky = Arc::new(FlakyStore::default());
    let store: Arc<dyn VectorStore> = flaky.clone();
    let r = retriever(&dir, store, &mock, true);
    r.initialize(false).await.unwrap();

    flaky.fail_search("manim_api");
    let results = r.search("circle", 3, 3).await.unwrap();
    assert!(results.api_refs.is_empty());
    assert_eq!(results.examples.len(), 2);
    assert!(results.examples.iter().any(|e| e.id == "01_moving_circle"));

    match r.retrieve("circle").await {
        RetrievalOutcome::Ok(results) => {
            assert!(results.api_refs.is_empty());
            assert!(!results.examples.is_empty());
        }
        other => panic!("expected Ok outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_index_without_auto_build_is_unavailable() {
    let dir = fixture();
    let mock = MockEmbedder::new(256);
    let r = retriever(&dir, Arc::new(InMemoryVectorStore::new()), &mock, false);

    assert!(matches!(
        r.initialize(false).await,
        Err(IndexError::IndexUnavailable(_))
    ));
    assert!(matches!(r.state(), RetrieverState::Failed(_)));
    assert!(matches!(
        r.retrieve("circle").await,
        RetrievalOutcome::Degraded(DegradeReason::InitFailed(_))
    ));
    assert_eq!(mock.calls(), 0);

    // an explicit rebuild is still allowed
    r.initialize(true).await.unwrap();
    assert!(r.is_ready());
}

#[tokio::test]
async fn existing_index_without_auto_build_binds_without_embedding() {
    let dir = fixture();
    let mock = MockEmbedder::new(256);
    let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
    Indexer::new(Arc::clone(&store), Arc::new(mock.clone()), config(&dir))
        .build_index(false)
        .await
        .unwrap();
    let calls = mock.calls();

    let r = retriever(&dir, store, &mock, false);
    let counts = r.initialize(false).await.unwrap();
    assert_eq!(counts.examples, 2);
    assert_eq!(mock.calls(), calls);
}

#[tokio::test]
async fn concurrent_initialize_builds_once() {
    let dir = fixture();
    let mock = MockEmbedder::new(256);
    let r = retriever(&dir, Arc::new(InMemoryVectorStore::new()), &mock, true);

    let (a, b) = tokio::join!(r.initialize(false), r.initialize(false));
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(mock.texts_embedded(), API_CHUNKS + 2);
}

#[tokio::test]
async fn failed_build_marks_retriever_failed() {
    let dir = fixture();
    let mock = MockEmbedder::failing();
    let r = retriever(&dir, Arc::new(InMemoryVectorStore::new()), &mock, true);

    assert!(r.initialize(false).await.is_err());
    assert!(!r.is_ready());
    assert!(matches!(r.search("x", 1, 1).await, Err(IndexError::NotReady)));
}
