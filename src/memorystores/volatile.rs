use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::Error;
use crate::schema::MemoryRecord;
use crate::traits::MemoryStore;
use crate::Result;

use super::similarity::{cosine_similarity, distance_to_similarity, dot_product, euclidean_distance};

/// Similarity metrics for comparing vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimilarityMetric {
    /// Cosine similarity (higher is more similar)
    Cosine,
    /// Euclidean distance mapped to (0, 1] (higher is more similar)
    Euclidean,
    /// Dot product (higher is more similar)
    DotProduct,
}

type Collections = HashMap<String, HashMap<String, MemoryRecord>>;

/// An in-process memory store; contents are lost when it is dropped
pub struct VolatileMemoryStore {
    collections: RwLock<Collections>,
    similarity_metric: SimilarityMetric,
}

impl Default for VolatileMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VolatileMemoryStore {
    /// Create an empty store using cosine similarity
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            similarity_metric: SimilarityMetric::Cosine,
        }
    }

    /// Set the similarity metric
    pub fn with_similarity_metric(mut self, metric: SimilarityMetric) -> Self {
        self.similarity_metric = metric;
        self
    }

    fn calculate_similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.similarity_metric {
            SimilarityMetric::Cosine => cosine_similarity(a, b),
            SimilarityMetric::Euclidean => distance_to_similarity(euclidean_distance(a, b)),
            SimilarityMetric::DotProduct => dot_product(a, b),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Collections>> {
        self.collections
            .read()
            .map_err(|_| Error::MemoryStore("Failed to acquire read lock on memory store".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Collections>> {
        self.collections
            .write()
            .map_err(|_| Error::MemoryStore("Failed to acquire write lock on memory store".to_string()))
    }
}

fn missing(collection: &str) -> Error {
    Error::MemoryStore(format!("Collection {} does not exist", collection))
}

#[async_trait]
impl MemoryStore for VolatileMemoryStore {
    async fn create_collection(&self, collection: &str) -> Result<()> {
        self.write()?.entry(collection.to_string()).or_default();
        Ok(())
    }

    async fn get_collections(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.read()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn delete_collection(&self, collection: &str) -> Result<()> {
        self.write()?.remove(collection);
        Ok(())
    }

    async fn does_collection_exist(&self, collection: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(collection))
    }

    async fn upsert(&self, collection: &str, mut record: MemoryRecord) -> Result<String> {
        let mut storage = self.write()?;
        let records = storage
            .get_mut(collection)
            .ok_or_else(|| missing(collection))?;

        let key = record.id.clone();
        record.key = Some(key.clone());
        records.insert(key.clone(), record);
        Ok(key)
    }

    async fn get(
        &self,
        collection: &str,
        key: &str,
        with_embedding: bool,
    ) -> Result<Option<MemoryRecord>> {
        let storage = self.read()?;
        let records = storage.get(collection).ok_or_else(|| missing(collection))?;
        Ok(records.get(key).cloned().map(|mut record| {
            if !with_embedding {
                record.embedding.clear();
            }
            record
        }))
    }

    async fn remove(&self, collection: &str, key: &str) -> Result<()> {
        let mut storage = self.write()?;
        let records = storage
            .get_mut(collection)
            .ok_or_else(|| missing(collection))?;
        records.remove(key);
        Ok(())
    }

    async fn get_nearest_matches(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
        min_relevance_score: f32,
        with_embeddings: bool,
    ) -> Result<Vec<(MemoryRecord, f32)>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let storage = self.read()?;
        let records = storage.get(collection).ok_or_else(|| missing(collection))?;

        let mut results: Vec<(MemoryRecord, f32)> = records
            .values()
            .filter_map(|record| {
                let relevance = self.calculate_similarity(embedding, &record.embedding);
                (relevance >= min_relevance_score).then(|| {
                    let mut record = record.clone();
                    if !with_embeddings {
                        record.embedding.clear();
                    }
                    (record, relevance)
                })
            })
            .collect();

        // Sort by relevance (highest first)
        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, embedding: Vec<f32>) -> MemoryRecord {
        MemoryRecord::reference_record(id, "test", format!("about {}", id), id, embedding)
    }

    #[tokio::test]
    async fn test_collection_lifecycle() {
        let store = VolatileMemoryStore::new();
        assert!(!store.does_collection_exist("notes").await.unwrap());

        store.create_collection("notes").await.unwrap();
        store.create_collection("notes").await.unwrap();
        store.create_collection("archive").await.unwrap();
        assert_eq!(
            store.get_collections().await.unwrap(),
            vec!["archive".to_string(), "notes".to_string()]
        );

        store.delete_collection("archive").await.unwrap();
        assert!(!store.does_collection_exist("archive").await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_id() {
        let store = VolatileMemoryStore::new();
        store.create_collection("c").await.unwrap();

        store.upsert("c", record("a", vec![1.0, 0.0])).await.unwrap();
        let mut updated = record("a", vec![0.0, 1.0]);
        updated.description = "updated".to_string();
        let key = store.upsert("c", updated).await.unwrap();

        let fetched = store.get("c", &key, true).await.unwrap().unwrap();
        assert_eq!(fetched.description, "updated");
        assert_eq!(fetched.embedding, vec![0.0, 1.0]);
        assert_eq!(fetched.key.as_deref(), Some("a"));

        let without = store.get("c", &key, false).await.unwrap().unwrap();
        assert!(without.embedding.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_into_missing_collection_fails() {
        let store = VolatileMemoryStore::new();
        let err = store.upsert("nope", record("a", vec![1.0])).await.unwrap_err();
        assert!(matches!(err, Error::MemoryStore(_)));
    }

    #[tokio::test]
    async fn test_remove() {
        let store = VolatileMemoryStore::new();
        store.create_collection("c").await.unwrap();
        store.upsert("c", record("a", vec![1.0])).await.unwrap();
        store.remove("c", "a").await.unwrap();
        assert!(store.get("c", "a", false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_nearest_matches_filter_order_and_limit() {
        let store = VolatileMemoryStore::new();
        store.create_collection("c").await.unwrap();
        store.upsert("c", record("exact", vec![1.0, 0.0])).await.unwrap();
        store.upsert("c", record("close", vec![0.9, 0.1])).await.unwrap();
        store.upsert("c", record("far", vec![0.0, 1.0])).await.unwrap();

        let matches = store
            .get_nearest_matches("c", &[1.0, 0.0], 5, 0.5, false)
            .await
            .unwrap();
        let ids: Vec<&str> = matches.iter().map(|(r, _)| r.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "close"]);
        assert!(matches[0].1 > matches[1].1);
        assert!(matches.iter().all(|(r, _)| r.embedding.is_empty()));

        let top = store
            .get_nearest_match("c", &[0.0, 1.0], 0.5, true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(top.0.id, "far");
        assert_eq!(top.0.embedding, vec![0.0, 1.0]);

        let limited = store
            .get_nearest_matches("c", &[1.0, 0.0], 1, 0.0, false)
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_euclidean_metric() {
        let store = VolatileMemoryStore::new().with_similarity_metric(SimilarityMetric::Euclidean);
        store.create_collection("c").await.unwrap();
        store.upsert("c", record("origin", vec![0.0, 0.0])).await.unwrap();

        let matches = store
            .get_nearest_matches("c", &[0.0, 0.0], 1, 0.0, false)
            .await
            .unwrap();
        assert_eq!(matches[0].1, 1.0);
    }
}
