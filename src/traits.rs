use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::schema::{MemoryRecord, Message};
use crate::Result;

/// Trait for any component that can be invoked with an input and produces an output asynchronously.
///
/// Chat models and embedding models are both runnables over their request type.
#[async_trait]
pub trait Runnable<Input: Send + 'static, Output: 'static> {
    /// Run the component on the given input and return the output.
    async fn invoke(&self, input: Input) -> Result<Output>;

    /// Run the component on a batch of inputs.
    async fn batch(&self, inputs: Vec<Input>) -> Result<Vec<Result<Output>>>
    where
        Self: Sized + Sync,
        Output: Send,
    {
        let mut results = Vec::with_capacity(inputs.len());
        for input in inputs {
            results.push(self.invoke(input).await);
        }
        Ok(results)
    }
}

/// Trait for chat models that can handle message exchanges (multi-turn).
#[async_trait]
pub trait ChatModel: Runnable<Vec<Message>, Message> + Send + Sync {
    /// Get the model name/identifier.
    fn model_name(&self) -> &str;
    /// Get model parameters as a key-value map.
    fn parameters(&self) -> HashMap<String, Value>;
}

/// Trait for embedding models (text to vector).
#[async_trait]
pub trait EmbeddingModel: Runnable<String, Vec<f32>> + Send + Sync {
    /// Get the model name/identifier.
    fn model_name(&self) -> &str;
    /// Get the dimension of the embeddings produced by this model.
    fn embedding_dimension(&self) -> usize;
    /// Embed multiple texts in a single batch call (default: loop invoke).
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.invoke(text).await?);
        }
        Ok(embeddings)
    }
}

/// Trait for stores holding embedded records in named collections.
///
/// Each record id maps to at most one record per collection; upserting an
/// existing id replaces it.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Create a collection, doing nothing if it already exists.
    async fn create_collection(&self, collection: &str) -> Result<()>;
    /// List the collection names.
    ///
    /// Stores that map collections onto backend names may return the mapped
    /// form: the Azure AI Search store lists `SKCertifications` as the index
    /// `skcertifications`, while the volatile store keeps the name as given.
    async fn get_collections(&self) -> Result<Vec<String>>;
    /// Delete a collection and all its records.
    async fn delete_collection(&self, collection: &str) -> Result<()>;
    /// Check whether a collection exists.
    async fn does_collection_exist(&self, collection: &str) -> Result<bool>;

    /// Insert or replace a record, returning its key.
    async fn upsert(&self, collection: &str, record: MemoryRecord) -> Result<String>;

    /// Insert or replace several records (default: loop upsert).
    async fn upsert_batch(&self, collection: &str, records: Vec<MemoryRecord>) -> Result<Vec<String>> {
        let mut keys = Vec::with_capacity(records.len());
        for record in records {
            keys.push(self.upsert(collection, record).await?);
        }
        Ok(keys)
    }

    /// Fetch a record by key.
    async fn get(
        &self,
        collection: &str,
        key: &str,
        with_embedding: bool,
    ) -> Result<Option<MemoryRecord>>;

    /// Remove a record by key.
    async fn remove(&self, collection: &str, key: &str) -> Result<()>;

    /// Find up to `limit` records whose relevance to `embedding` is at least
    /// `min_relevance_score`, ordered by descending relevance.
    async fn get_nearest_matches(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
        min_relevance_score: f32,
        with_embeddings: bool,
    ) -> Result<Vec<(MemoryRecord, f32)>>;

    /// Find the single closest record, if any clears the threshold.
    async fn get_nearest_match(
        &self,
        collection: &str,
        embedding: &[f32],
        min_relevance_score: f32,
        with_embedding: bool,
    ) -> Result<Option<(MemoryRecord, f32)>> {
        let mut matches = self
            .get_nearest_matches(collection, embedding, 1, min_relevance_score, with_embedding)
            .await?;
        Ok(if matches.is_empty() {
            None
        } else {
            Some(matches.remove(0))
        })
    }
}
