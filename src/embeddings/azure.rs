use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::{AzureOpenAISettings, DEFAULT_OPENAI_API_VERSION};
use crate::error::Error;
use crate::traits::{EmbeddingModel, Runnable};
use crate::utils::{check_status, normalize_endpoint};
use crate::Result;

/// text-embedding-ada-002 produces 1536-dimensional vectors
pub const ADA_EMBEDDING_DIMENSION: usize = 1536;

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum EmbeddingInput {
    Single(String),
    Batch(Vec<String>),
}

#[derive(Debug, Clone, Serialize)]
struct AzureEmbeddingRequest {
    input: EmbeddingInput,
}

#[derive(Debug, Clone, Deserialize)]
struct AzureEmbeddingResponse {
    data: Vec<AzureEmbeddingData>,
    #[serde(default)]
    usage: Option<AzureUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct AzureEmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct AzureUsage {
    total_tokens: u32,
}

/// Azure OpenAI text embedding deployment
pub struct AzureTextEmbedding {
    deployment: String,
    endpoint: String,
    api_key: SecretString,
    api_version: String,
    client: reqwest::Client,
    dimension: usize,
}

impl AzureTextEmbedding {
    /// Create a client for an embedding deployment
    pub fn new(
        deployment: impl Into<String>,
        endpoint: impl AsRef<str>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            deployment: deployment.into(),
            endpoint: normalize_endpoint(endpoint.as_ref()),
            api_key: SecretString::new(api_key.into()),
            api_version: DEFAULT_OPENAI_API_VERSION.to_string(),
            client: reqwest::Client::new(),
            dimension: ADA_EMBEDDING_DIMENSION,
        }
    }

    /// Create the embedding client described by the settings
    pub fn from_settings(settings: &AzureOpenAISettings) -> Self {
        Self::new(
            settings.embedding_deployment.clone(),
            &settings.endpoint,
            settings.api_key.expose_secret().clone(),
        )
        .with_api_version(settings.api_version.clone())
    }

    /// Set the REST API version
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Set the embedding dimension for non-ada deployments
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/embeddings",
            self.endpoint, self.deployment
        )
    }

    async fn request(&self, input: EmbeddingInput, expected: usize) -> Result<Vec<Vec<f32>>> {
        let request = AzureEmbeddingRequest { input };

        let res = self
            .client
            .post(self.url())
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(Error::Request)?;

        let res = check_status(res, "Azure OpenAI", Error::Embedding).await?;
        let mut response: AzureEmbeddingResponse = res.json().await.map_err(Error::Request)?;

        if response.data.len() != expected {
            return Err(Error::Embedding(format!(
                "expected {} embeddings, got {}",
                expected,
                response.data.len()
            )));
        }
        if let Some(usage) = &response.usage {
            tracing::debug!(
                deployment = %self.deployment,
                tokens = usage.total_tokens,
                "embedding request completed"
            );
        }

        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Runnable<String, Vec<f32>> for AzureTextEmbedding {
    async fn invoke(&self, input: String) -> Result<Vec<f32>> {
        let mut embeddings = self.request(EmbeddingInput::Single(input), 1).await?;
        embeddings
            .pop()
            .ok_or_else(|| Error::Embedding("No embeddings returned".to_string()))
    }
}

#[async_trait]
impl EmbeddingModel for AzureTextEmbedding {
    fn model_name(&self) -> &str {
        &self.deployment
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let expected = texts.len();
        self.request(EmbeddingInput::Batch(texts), expected).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_invoke_posts_to_deployment() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/openai/deployments/embeddings-v0/embeddings")
            .match_query(Matcher::UrlEncoded(
                "api-version".into(),
                "2023-05-15".into(),
            ))
            .match_header("api-key", "secret")
            .match_body(Matcher::Json(json!({ "input": "hello" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "object": "list",
                    "data": [{ "object": "embedding", "embedding": [0.1, 0.2, 0.3], "index": 0 }],
                    "model": "ada",
                    "usage": { "prompt_tokens": 1, "total_tokens": 1 }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let embeddings = AzureTextEmbedding::new("embeddings-v0", server.url(), "secret");
        let vector = embeddings.invoke("hello".to_string()).await.unwrap();

        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_batch_orders_by_index() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/openai/deployments/embeddings-v0/embeddings")
            .match_query(Matcher::Any)
            .match_body(Matcher::Json(json!({ "input": ["a", "b"] })))
            .with_status(200)
            .with_body(
                json!({
                    "data": [
                        { "embedding": [2.0], "index": 1 },
                        { "embedding": [1.0], "index": 0 }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let embeddings = AzureTextEmbedding::new("embeddings-v0", server.url(), "secret");
        let vectors = embeddings
            .embed_batch(vec!["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors, vec![vec![1.0], vec![2.0]]);
    }

    #[tokio::test]
    async fn test_error_status_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/openai/deployments/embeddings-v0/embeddings")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("Access denied due to invalid subscription key")
            .create_async()
            .await;

        let embeddings = AzureTextEmbedding::new("embeddings-v0", server.url(), "wrong");
        let err = embeddings.invoke("hello".to_string()).await.unwrap_err();

        match err {
            Error::Embedding(msg) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("invalid subscription key"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_data_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/openai/deployments/embeddings-v0/embeddings")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({ "data": [] }).to_string())
            .create_async()
            .await;

        let embeddings = AzureTextEmbedding::new("embeddings-v0", server.url(), "secret");
        assert!(embeddings.invoke("hello".to_string()).await.is_err());
    }

    #[test]
    fn test_default_dimension() {
        let embeddings = AzureTextEmbedding::new("embeddings-v0", "https://x/", "k");
        assert_eq!(embeddings.embedding_dimension(), 1536);
        assert_eq!(
            embeddings.url(),
            "https://x/openai/deployments/embeddings-v0/embeddings"
        );
    }
}
