use std::sync::Arc;

use uuid::Uuid;

use crate::error::Error;
use crate::schema::{MemoryQueryResult, MemoryRecord};
use crate::traits::{EmbeddingModel, MemoryStore, Runnable};
use crate::Result;

/// Semantic text memory: embeds text through an embedding model and keeps
/// the vectors in a memory store
#[derive(Clone)]
pub struct SemanticTextMemory {
    storage: Arc<dyn MemoryStore>,
    embeddings: Arc<dyn EmbeddingModel>,
}

impl SemanticTextMemory {
    /// Create a memory over a store and an embedding model
    pub fn new(storage: Arc<dyn MemoryStore>, embeddings: Arc<dyn EmbeddingModel>) -> Self {
        Self {
            storage,
            embeddings,
        }
    }

    /// The underlying store
    pub fn storage(&self) -> &Arc<dyn MemoryStore> {
        &self.storage
    }

    async fn ensure_collection(&self, collection: &str) -> Result<()> {
        if !self.storage.does_collection_exist(collection).await? {
            self.storage.create_collection(collection).await?;
        }
        Ok(())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = self.embeddings.invoke(text.to_string()).await?;
        let expected = self.embeddings.embedding_dimension();
        if embedding.len() != expected {
            return Err(Error::Embedding(format!(
                "{} returned {} dimensions, expected {}",
                self.embeddings.model_name(),
                embedding.len(),
                expected
            )));
        }
        Ok(embedding)
    }

    /// Save a reference to an external resource.
    ///
    /// `text` is embedded; the record is stored under `external_id` in
    /// `collection`, which is created if missing. Returns the store key.
    pub async fn save_reference(
        &self,
        collection: &str,
        text: &str,
        external_id: &str,
        external_source_name: &str,
        description: &str,
    ) -> Result<String> {
        self.ensure_collection(collection).await?;
        let embedding = self.embed(text).await?;
        let record = MemoryRecord::reference_record(
            external_id,
            external_source_name,
            description,
            text,
            embedding,
        );
        let key = self.storage.upsert(collection, record).await?;
        tracing::debug!(collection, external_id, "saved reference");
        Ok(key)
    }

    /// Save a piece of information under `id`, generating one when `None`.
    pub async fn save_information(
        &self,
        collection: &str,
        text: &str,
        id: Option<&str>,
        description: &str,
    ) -> Result<String> {
        self.ensure_collection(collection).await?;
        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let embedding = self.embed(text).await?;
        let record = MemoryRecord::local_record(id.clone(), text, description, embedding);
        let key = self.storage.upsert(collection, record).await?;
        tracing::debug!(collection, id = %id, "saved information");
        Ok(key)
    }

    /// Fetch a saved memory by key
    pub async fn get(&self, collection: &str, key: &str) -> Result<Option<MemoryQueryResult>> {
        Ok(self
            .storage
            .get(collection, key, false)
            .await?
            .map(|record| MemoryQueryResult::from_record(record, 1.0)))
    }

    /// Remove a saved memory by key
    pub async fn remove(&self, collection: &str, key: &str) -> Result<()> {
        self.storage.remove(collection, key).await
    }

    /// Search `collection` for the memories most relevant to `query`.
    ///
    /// Returns at most `limit` results, each with relevance at least
    /// `min_relevance_score`, ordered by descending relevance.
    pub async fn search(
        &self,
        collection: &str,
        query: &str,
        limit: usize,
        min_relevance_score: f32,
    ) -> Result<Vec<MemoryQueryResult>> {
        let query_embedding = self.embed(query).await?;
        let matches = self
            .storage
            .get_nearest_matches(collection, &query_embedding, limit, min_relevance_score, false)
            .await?;

        let mut results: Vec<MemoryQueryResult> = matches
            .into_iter()
            .filter(|(_, relevance)| *relevance >= min_relevance_score)
            .map(|(record, relevance)| MemoryQueryResult::from_record(record, relevance))
            .collect();

        results.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);

        tracing::debug!(collection, hits = results.len(), "memory search completed");
        Ok(results)
    }

    /// List the collections of the underlying store
    pub async fn get_collections(&self) -> Result<Vec<String>> {
        self.storage.get_collections().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddings;
    use crate::memorystores::VolatileMemoryStore;

    fn memory(embeddings: MockEmbeddings) -> SemanticTextMemory {
        SemanticTextMemory::new(Arc::new(VolatileMemoryStore::new()), Arc::new(embeddings))
    }

    #[tokio::test]
    async fn test_save_reference_creates_collection() {
        let memory = memory(MockEmbeddings::new(16));
        let key = memory
            .save_reference("docs", "Rust book", "https://doc.rust-lang.org/book", "web", "The book")
            .await
            .unwrap();

        assert_eq!(key, "https://doc.rust-lang.org/book");
        assert_eq!(memory.get_collections().await.unwrap(), vec!["docs".to_string()]);

        let saved = memory.get("docs", &key).await.unwrap().unwrap();
        assert!(saved.is_reference);
        assert_eq!(saved.external_source_name, "web");
        assert_eq!(saved.description, "The book");
        assert_eq!(saved.text, "Rust book");
    }

    #[tokio::test]
    async fn test_save_information_generates_id() {
        let memory = memory(MockEmbeddings::new(16));
        let key = memory
            .save_information("notes", "likes tea", None, "")
            .await
            .unwrap();
        assert!(Uuid::parse_str(&key).is_ok());

        let given = memory
            .save_information("notes", "likes coffee", Some("fav"), "drink")
            .await
            .unwrap();
        assert_eq!(given, "fav");
        assert!(!memory.get("notes", "fav").await.unwrap().unwrap().is_reference);
    }

    #[tokio::test]
    async fn test_search_orders_by_relevance() {
        let embeddings = MockEmbeddings::new(2)
            .with_embedding("alpha", vec![1.0, 0.0])
            .with_embedding("beta", vec![0.8, 0.6])
            .with_embedding("gamma", vec![0.0, 1.0])
            .with_embedding("query", vec![1.0, 0.1]);
        let memory = memory(embeddings);
        for text in ["gamma", "beta", "alpha"] {
            memory
                .save_information("c", text, Some(text), text)
                .await
                .unwrap();
        }

        let results = memory.search("c", "query", 5, 0.5).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "beta"]);
        assert!(results.windows(2).all(|w| w[0].relevance > w[1].relevance));
        assert!(results.iter().all(|r| r.embedding.is_none()));
    }

    #[tokio::test]
    async fn test_remove() {
        let memory = memory(MockEmbeddings::new(4));
        memory
            .save_information("c", "x", Some("x"), "")
            .await
            .unwrap();
        memory.remove("c", "x").await.unwrap();
        assert!(memory.get("c", "x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_embedding_dimension_mismatch_is_an_error() {
        struct Wrong;

        #[async_trait::async_trait]
        impl crate::traits::Runnable<String, Vec<f32>> for Wrong {
            async fn invoke(&self, _input: String) -> Result<Vec<f32>> {
                Ok(vec![1.0])
            }
        }

        impl EmbeddingModel for Wrong {
            fn model_name(&self) -> &str {
                "wrong"
            }
            fn embedding_dimension(&self) -> usize {
                3
            }
        }

        let memory =
            SemanticTextMemory::new(Arc::new(VolatileMemoryStore::new()), Arc::new(Wrong));
        let err = memory.search("c", "q", 1, 0.0).await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }
}
