use std::collections::HashMap;
use std::sync::Arc;

use manimate_llm::mock::MockEmbedder;
use manimate_store::{Collection, QdrantStore, VectorStore};
use testcontainers::ContainerAsync;
use testcontainers::GenericImage;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;

const QDRANT_GRPC_PORT: ContainerPort = ContainerPort::Tcp(6334);

fn qdrant_image() -> GenericImage {
    GenericImage::new("qdrant/qdrant", "v1.16.0")
        .with_wait_for(WaitFor::message_on_stdout("gRPC listening"))
        .with_exposed_port(QDRANT_GRPC_PORT)
}

async fn setup_with_qdrant() -> (QdrantStore, ContainerAsync<GenericImage>) {
    let container = qdrant_image().start().await.unwrap();
    let grpc_port = container.get_host_port_ipv4(6334).await.unwrap();
    let url = format!("http://127.0.0.1:{grpc_port}");
    (QdrantStore::new(&url).unwrap(), container)
}

#[tokio::test]
#[ignore = "requires docker"]
async fn ensure_collection_is_idempotent() {
    let (ops, _container) = setup_with_qdrant().await;

    VectorStore::ensure_collection(&ops, "manim_api", 8).await.unwrap();
    VectorStore::ensure_collection(&ops, "manim_api", 8).await.unwrap();
    assert!(VectorStore::collection_exists(&ops, "manim_api").await.unwrap());
    assert_eq!(VectorStore::count(&ops, "manim_api").await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn collection_round_trips_string_ids() {
    let (ops, _container) = setup_with_qdrant().await;
    let store: Arc<dyn VectorStore> = Arc::new(ops);
    let col = Collection::new("manim_api", store, Arc::new(MockEmbedder::new(32)));

    col.add(
        vec!["mobject.geometry.Circle".into(), "mobject.geometry.Square".into()],
        vec![
            "Class: Circle\nModule: mobject.geometry".into(),
            "Class: Square\nModule: mobject.geometry".into(),
        ],
        vec![
            HashMap::from([("name".into(), serde_json::json!("Circle"))]),
            HashMap::from([("name".into(), serde_json::json!("Square"))]),
        ],
    )
    .await
    .unwrap();

    assert_eq!(col.count().await.unwrap(), 2);
    let hits = col.query("Circle", 1).await.unwrap();
    assert_eq!(hits[0].id, "mobject.geometry.Circle");
    assert_eq!(hits[0].metadata["name"], "Circle");
    assert!(hits[0].document.starts_with("Class: Circle"));
    assert!((0.0..=2.0).contains(&hits[0].distance));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn delete_collection_removes_it() {
    let (ops, _container) = setup_with_qdrant().await;

    VectorStore::ensure_collection(&ops, "manim_examples", 4).await.unwrap();
    VectorStore::delete_collection(&ops, "manim_examples").await.unwrap();
    assert!(!VectorStore::collection_exists(&ops, "manim_examples").await.unwrap());
}
