use async_trait::async_trait;
use std::collections::HashMap;

use crate::traits::{EmbeddingModel, Runnable};
use crate::Result;

/// A mock embeddings model for offline runs and tests
pub struct MockEmbeddings {
    dimension: usize,
    embeddings: HashMap<String, Vec<f32>>,
}

impl Default for MockEmbeddings {
    fn default() -> Self {
        Self {
            dimension: 4,
            embeddings: HashMap::new(),
        }
    }
}

impl MockEmbeddings {
    /// Create a new mock embeddings model
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            embeddings: HashMap::new(),
        }
    }

    /// Add a pre-defined embedding for a text
    pub fn with_embedding(mut self, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        let text = text.into();
        if embedding.len() != self.dimension {
            panic!(
                "Embedding dimension {} doesn't match expected dimension {}",
                embedding.len(),
                self.dimension
            );
        }
        self.embeddings.insert(text, embedding);
        self
    }

    /// Generate a deterministic embedding from the words of a text.
    ///
    /// Each lowercase word is hashed into a bucket, so texts sharing words
    /// land close together under cosine similarity.
    fn generate_embedding(&self, text: &str) -> Vec<f32> {
        let mut result = vec![0.0; self.dimension];
        if self.dimension == 0 {
            return result;
        }

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = word
                .to_lowercase()
                .bytes()
                .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
            result[bucket % self.dimension] += 1.0;
        }

        // Normalize the vector
        let magnitude: f32 = result.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for val in &mut result {
                *val /= magnitude;
            }
        }

        result
    }
}

#[async_trait]
impl Runnable<String, Vec<f32>> for MockEmbeddings {
    async fn invoke(&self, input: String) -> Result<Vec<f32>> {
        // Return pre-defined embedding if it exists
        if let Some(embedding) = self.embeddings.get(&input) {
            return Ok(embedding.clone());
        }

        // Otherwise generate a deterministic embedding
        Ok(self.generate_embedding(&input))
    }
}

impl EmbeddingModel for MockEmbeddings {
    fn model_name(&self) -> &str {
        "mock-embeddings"
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_predefined_embedding_wins() {
        let embeddings = MockEmbeddings::new(3).with_embedding("x", vec![1.0, 0.0, 0.0]);
        assert_eq!(
            embeddings.invoke("x".to_string()).await.unwrap(),
            vec![1.0, 0.0, 0.0]
        );
    }

    #[tokio::test]
    async fn test_generated_embedding_is_deterministic_and_normalized() {
        let embeddings = MockEmbeddings::new(64);
        let a = embeddings.invoke("Azure Administrator".to_string()).await.unwrap();
        let b = embeddings.invoke("azure administrator".to_string()).await.unwrap();
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let embeddings = MockEmbeddings::default();
        let v = embeddings.invoke(String::new()).await.unwrap();
        assert_eq!(v, vec![0.0; 4]);
    }

    #[tokio::test]
    async fn test_zero_dimension_yields_empty_vector() {
        let embeddings = MockEmbeddings::new(0);
        let v = embeddings.invoke("Azure Fundamentals".to_string()).await.unwrap();
        assert!(v.is_empty());
    }

    #[test]
    #[should_panic]
    fn test_wrong_dimension_panics() {
        let _ = MockEmbeddings::new(2).with_embedding("x", vec![1.0]);
    }
}
