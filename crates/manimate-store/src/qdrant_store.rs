//! Qdrant-backed [`VectorStore`].
//!
//! Qdrant only accepts integer or UUID point ids, so each caller id is hashed to a
//! UUIDv5 and carried in the payload under [`KEY_FIELD`], then restored on search.

use std::collections::HashMap;

use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, PointId, PointStruct, ScoredPoint,
    SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Qdrant, QdrantError};
use serde_json::Value as Json;
use uuid::Uuid;

use crate::vector_store::{
    BoxFuture, Payload, ScoredVectorPoint, StoreOp, VectorPoint, VectorStore, VectorStoreError,
};

const KEY_FIELD: &str = "_key";

#[derive(Clone)]
pub struct QdrantStore {
    client: Qdrant,
    url: String,
}

impl std::fmt::Debug for QdrantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantStore")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl QdrantStore {
    /// Build a gRPC client for `url`. No request is made until the first operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is rejected by the client builder.
    pub fn new(url: &str) -> Result<Self, Box<QdrantError>> {
        let client = Qdrant::from_url(url).build().map_err(Box::new)?;
        Ok(Self {
            client,
            url: url.to_owned(),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Deterministic UUID for a caller-supplied string id.
#[must_use]
pub fn point_uuid(id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()).to_string()
}

fn to_point(point: VectorPoint) -> Result<PointStruct, VectorStoreError> {
    let VectorPoint {
        id,
        vector,
        payload,
    } = point;
    let uuid = point_uuid(&id);
    let mut object: serde_json::Map<String, Json> = payload.into_iter().collect();
    object.insert(KEY_FIELD.to_owned(), Json::String(id));
    let fields: HashMap<String, QdrantValue> = serde_json::from_value(Json::Object(object))
        .map_err(|e| VectorStoreError::Payload(e.to_string()))?;
    Ok(PointStruct::new(uuid, vector, fields))
}

/// `None` for unset kinds and non-finite doubles, which JSON cannot carry.
fn to_json(value: QdrantValue) -> Option<Json> {
    let json = match value.kind? {
        Kind::NullValue(_) => Json::Null,
        Kind::BoolValue(flag) => Json::Bool(flag),
        Kind::IntegerValue(n) => Json::from(n),
        Kind::DoubleValue(x) => Json::Number(serde_json::Number::from_f64(x)?),
        Kind::StringValue(text) => Json::String(text),
        Kind::ListValue(list) => Json::Array(list.values.into_iter().filter_map(to_json).collect()),
        Kind::StructValue(map) => Json::Object(
            map.fields
                .into_iter()
                .filter_map(|(k, v)| to_json(v).map(|j| (k, j)))
                .collect(),
        ),
    };
    Some(json)
}

fn raw_point_id(id: Option<PointId>) -> String {
    match id.and_then(|p| p.point_id_options) {
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        Some(PointIdOptions::Num(n)) => n.to_string(),
        None => String::new(),
    }
}

fn from_scored(point: ScoredPoint) -> ScoredVectorPoint {
    let mut payload: Payload = point
        .payload
        .into_iter()
        .filter_map(|(k, v)| to_json(v).map(|j| (k, j)))
        .collect();
    let id = match payload.remove(KEY_FIELD) {
        Some(Json::String(key)) => key,
        _ => raw_point_id(point.id),
    };
    // Cosine collections score by similarity; callers expect distance.
    ScoredVectorPoint {
        id,
        distance: 1.0 - point.score,
        payload,
    }
}

fn unreachable(err: QdrantError) -> VectorStoreError {
    VectorStoreError::Connection(err.to_string())
}

impl VectorStore for QdrantStore {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let name = collection.to_owned();
        Box::pin(async move {
            if self.client.collection_exists(name.as_str()).await.map_err(unreachable)? {
                return Ok(());
            }
            let request = CreateCollectionBuilder::new(name.as_str())
                .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine));
            self.client
                .create_collection(request)
                .await
                .map_err(|e| VectorStoreError::backend(StoreOp::Create, &name, e))?;
            tracing::debug!(collection = %name, vector_size, "created qdrant collection");
            Ok(())
        })
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let name = collection.to_owned();
        Box::pin(async move {
            self.client
                .collection_exists(name.as_str())
                .await
                .map_err(unreachable)
        })
    }

    fn delete_collection(&self, collection: &str) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let name = collection.to_owned();
        Box::pin(async move {
            self.client
                .delete_collection(name.as_str())
                .await
                .map(|_| ())
                .map_err(|e| VectorStoreError::backend(StoreOp::Drop, &name, e))
        })
    }

    fn count(&self, collection: &str) -> BoxFuture<'_, Result<u64, VectorStoreError>> {
        let name = collection.to_owned();
        Box::pin(async move {
            let response = self
                .client
                .count(CountPointsBuilder::new(name.as_str()).exact(true))
                .await
                .map_err(|e| VectorStoreError::backend(StoreOp::Count, &name, e))?;
            Ok(response.result.map_or(0, |r| r.count))
        })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let name = collection.to_owned();
        let converted: Result<Vec<PointStruct>, _> = points.into_iter().map(to_point).collect();
        Box::pin(async move {
            self.client
                .upsert_points(UpsertPointsBuilder::new(name.as_str(), converted?).wait(true))
                .await
                .map(|_| ())
                .map_err(|e| VectorStoreError::backend(StoreOp::Upsert, &name, e))
        })
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        let name = collection.to_owned();
        Box::pin(async move {
            let request = SearchPointsBuilder::new(name.as_str(), vector, limit).with_payload(true);
            let response = self
                .client
                .search_points(request)
                .await
                .map_err(|e| VectorStoreError::backend(StoreOp::Search, &name, e))?;
            Ok(response.result.into_iter().map(from_scored).collect())
        })
    }
}
