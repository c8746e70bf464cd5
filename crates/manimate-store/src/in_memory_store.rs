use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::vector_store::{
    BoxFuture, Payload, ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError,
};

struct Table {
    dimensions: u64,
    // Ordered so equal-distance hits come back in id order.
    rows: BTreeMap<String, (Vec<f32>, Payload)>,
}

/// Process-local store. Collections vanish with the process; used by tests and by
/// `backend = "memory"` for throwaway sessions.
#[derive(Default)]
pub struct InMemoryVectorStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl std::fmt::Debug for InMemoryVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .tables
            .read()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("InMemoryVectorStore")
            .field("collections", &names)
            .finish()
    }
}

fn poisoned<T>(_: PoisonError<T>) -> VectorStoreError {
    VectorStoreError::Connection("in-memory store lock poisoned".into())
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// `1 - cos(a, b)`. A zero-norm side counts as orthogonal.
pub(crate) fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let denom = norm(a) * norm(b);
    if denom == 0.0 {
        return 1.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    1.0 - dot / denom
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Table>>, VectorStoreError> {
        self.tables.read().map_err(poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Table>>, VectorStoreError> {
        self.tables.write().map_err(poisoned)
    }

    fn insert(&self, collection: &str, points: Vec<VectorPoint>) -> Result<(), VectorStoreError> {
        let mut tables = self.write()?;
        let table = tables
            .get_mut(collection)
            .ok_or_else(|| VectorStoreError::MissingCollection(collection.to_owned()))?;
        // Reject the whole batch before touching any row.
        if let Some(bad) = points
            .iter()
            .find(|p| p.vector.len() as u64 != table.dimensions)
        {
            return Err(VectorStoreError::DimensionMismatch {
                collection: collection.to_owned(),
                id: bad.id.clone(),
                expected: table.dimensions,
                got: bad.vector.len(),
            });
        }
        table
            .rows
            .extend(points.into_iter().map(|p| (p.id, (p.vector, p.payload))));
        Ok(())
    }

    fn nearest(
        &self,
        collection: &str,
        query: &[f32],
        limit: u64,
    ) -> Result<Vec<ScoredVectorPoint>, VectorStoreError> {
        let tables = self.read()?;
        let table = tables
            .get(collection)
            .ok_or_else(|| VectorStoreError::MissingCollection(collection.to_owned()))?;
        let mut hits: Vec<ScoredVectorPoint> = table
            .rows
            .iter()
            .map(|(id, (vector, payload))| ScoredVectorPoint {
                id: id.clone(),
                distance: cosine_distance(query, vector),
                payload: payload.clone(),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(hits)
    }
}

impl VectorStore for InMemoryVectorStore {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let result = self.write().map(|mut tables| {
            tables.entry(collection.to_owned()).or_insert_with(|| Table {
                dimensions: vector_size,
                rows: BTreeMap::new(),
            });
        });
        Box::pin(async move { result })
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let result = self.read().map(|tables| tables.contains_key(collection));
        Box::pin(async move { result })
    }

    fn delete_collection(&self, collection: &str) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let result = self.write().map(|mut tables| {
            tables.remove(collection);
        });
        Box::pin(async move { result })
    }

    fn count(&self, collection: &str) -> BoxFuture<'_, Result<u64, VectorStoreError>> {
        let result = self.read().and_then(|tables| {
            tables
                .get(collection)
                .map(|t| t.rows.len() as u64)
                .ok_or_else(|| VectorStoreError::MissingCollection(collection.to_owned()))
        });
        Box::pin(async move { result })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let result = self.insert(collection, points);
        Box::pin(async move { result })
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        let result = self.nearest(collection, &vector, limit);
        Box::pin(async move { result })
    }
}
