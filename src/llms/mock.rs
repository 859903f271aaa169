use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::Error;
use crate::schema::Message;
use crate::traits::{ChatModel, Runnable};
use crate::Result;

/// A mock chat model answering the last user message from a lookup table
pub struct MockChatModel {
    responses: HashMap<String, String>,
    default_response: String,
}

impl Default for MockChatModel {
    fn default() -> Self {
        Self {
            responses: HashMap::new(),
            default_response: "This is a mock response.".to_string(),
        }
    }
}

impl MockChatModel {
    /// Create a new mock chat model
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a response mapping
    pub fn with_response(mut self, input: impl Into<String>, response: impl Into<String>) -> Self {
        self.responses.insert(input.into(), response.into());
        self
    }

    /// Set the default response
    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }
}

#[async_trait]
impl Runnable<Vec<Message>, Message> for MockChatModel {
    async fn invoke(&self, input: Vec<Message>) -> Result<Message> {
        let last = input
            .last()
            .ok_or_else(|| Error::LLM("No messages provided".to_string()))?;
        let content = self
            .responses
            .get(&last.content)
            .cloned()
            .unwrap_or_else(|| self.default_response.clone());
        Ok(Message::assistant(content))
    }
}

impl ChatModel for MockChatModel {
    fn model_name(&self) -> &str {
        "mock-chat"
    }

    fn parameters(&self) -> HashMap<String, Value> {
        HashMap::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mapped_and_default_responses() {
        let chat = MockChatModel::new()
            .with_response("ping", "pong")
            .with_default_response("?");

        let reply = chat.invoke(vec![Message::user("ping")]).await.unwrap();
        assert_eq!(reply.content, "pong");

        let reply = chat.invoke(vec![Message::user("other")]).await.unwrap();
        assert_eq!(reply.content, "?");
    }

    #[tokio::test]
    async fn test_batch_runs_each_input() {
        let chat = MockChatModel::new().with_response("a", "1");
        let results = chat
            .batch(vec![vec![Message::user("a")], vec![]])
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().content, "1");
        assert!(results[1].is_err());
    }
}
