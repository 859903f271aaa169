use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::config::{AzureOpenAISettings, DEFAULT_OPENAI_API_VERSION};
use crate::error::Error;
use crate::schema::{Message, MessageRole};
use crate::traits::{ChatModel, Runnable};
use crate::utils::{check_status, normalize_endpoint};
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AzureChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct AzureChatRequest {
    messages: Vec<AzureChatMessage>,
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct AzureChatChoice {
    message: AzureChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AzureChatResponse {
    choices: Vec<AzureChatChoice>,
    #[serde(default)]
    usage: Option<AzureChatUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct AzureChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// Azure OpenAI chat completion deployment
pub struct AzureChatCompletion {
    deployment: String,
    endpoint: String,
    api_key: SecretString,
    api_version: String,
    temperature: f32,
    max_tokens: Option<u32>,
    top_p: Option<f32>,
    client: reqwest::Client,
}

impl AzureChatCompletion {
    /// Create a client for a chat deployment
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
            temperature: 0.7,
            max_tokens: None,
            top_p: None,
            client: reqwest::Client::new(),
        }
    }

    /// Create the chat client described by the settings
    pub fn from_settings(settings: &AzureOpenAISettings) -> Self {
        Self::new(
            settings.chat_deployment.clone(),
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

    /// Set the temperature parameter
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the max_tokens parameter
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the top_p parameter
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    fn convert_messages(&self, messages: &[Message]) -> Vec<AzureChatMessage> {
        messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    MessageRole::System => "system",
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                }
                .to_string();

                AzureChatMessage {
                    role,
                    content: msg.content.clone(),
                }
            })
            .collect()
    }
}

#[async_trait]
impl Runnable<Vec<Message>, Message> for AzureChatCompletion {
    async fn invoke(&self, input: Vec<Message>) -> Result<Message> {
        if input.is_empty() {
            return Err(Error::LLM("No messages provided".to_string()));
        }

        let request = AzureChatRequest {
            messages: self.convert_messages(&input),
            temperature: Some(self.temperature),
            top_p: self.top_p,
            max_tokens: self.max_tokens,
        };

        let res = self
            .client
            .post(format!(
                "{}/openai/deployments/{}/chat/completions",
                self.endpoint, self.deployment
            ))
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(Error::Request)?;

        let res = check_status(res, "Azure OpenAI", Error::LLM).await?;
        let response: AzureChatResponse = res.json().await.map_err(Error::Request)?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                deployment = %self.deployment,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "chat completion finished"
            );
        }

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::LLM("No chat completions returned".to_string()))?;

        if choice.finish_reason.as_deref() == Some("content_filter") {
            tracing::warn!(deployment = %self.deployment, "completion truncated by content filter");
        }

        let role = match choice.message.role.as_str() {
            "system" => MessageRole::System,
            "user" => MessageRole::User,
            _ => MessageRole::Assistant,
        };

        Ok(Message::new(role, choice.message.content))
    }
}

impl ChatModel for AzureChatCompletion {
    fn model_name(&self) -> &str {
        &self.deployment
    }

    fn parameters(&self) -> HashMap<String, Value> {
        let mut params = HashMap::new();
        params.insert("temperature".to_string(), json!(self.temperature));
        if let Some(max_tokens) = self.max_tokens {
            params.insert("max_tokens".to_string(), json!(max_tokens));
        }
        if let Some(top_p) = self.top_p {
            params.insert("top_p".to_string(), json!(top_p));
        }
        params
    }
}
