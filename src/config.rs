//! Service settings loaded from the environment.
//!
//! Values are read from process environment variables after a `.env` file in
//! the working directory (if any) has been loaded.

use secrecy::SecretString;

use crate::error::Error;
use crate::Result;

pub const DEFAULT_CHAT_DEPLOYMENT: &str = "completions-v0";
pub const DEFAULT_EMBEDDING_DEPLOYMENT: &str = "embeddings-v0";
pub const DEFAULT_OPENAI_API_VERSION: &str = "2023-05-15";
pub const DEFAULT_SEARCH_API_VERSION: &str = "2023-11-01";

/// Settings for the Azure OpenAI deployments
#[derive(Debug, Clone)]
pub struct AzureOpenAISettings {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`
    pub endpoint: String,
    pub api_key: SecretString,
    /// Deployment serving chat completions
    pub chat_deployment: String,
    /// Deployment serving text embeddings
    pub embedding_deployment: String,
    pub api_version: String,
}

/// Settings for the Azure AI Search service
#[derive(Debug, Clone)]
pub struct AzureSearchSettings {
    /// Search service URL, e.g. `https://my-search.search.windows.net`
    pub endpoint: String,
    pub admin_key: SecretString,
    pub api_version: String,
}

/// All settings needed to run against the remote services
#[derive(Debug, Clone)]
pub struct Settings {
    pub openai: AzureOpenAISettings,
    pub search: AzureSearchSettings,
}

impl Settings {
    /// Load settings from `.env` and the process environment
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(Error::Config(format!("failed to read .env: {}", e))),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| Error::Config(format!("{} is not set", key)))
        };

        let openai = AzureOpenAISettings {
            endpoint: require("AZURE_OPENAI_ENDPOINT")?,
            api_key: SecretString::new(require("AZURE_OPENAI_API_KEY")?),
            chat_deployment: get("AZURE_OPENAI_CHAT_DEPLOYMENT_NAME")
                .or_else(|| get("AZURE_OPENAI_DEPLOYMENT_NAME"))
                .unwrap_or_else(|| DEFAULT_CHAT_DEPLOYMENT.to_string()),
            embedding_deployment: get("AZURE_OPENAI_EMBEDDING_DEPLOYMENT_NAME")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_DEPLOYMENT.to_string()),
            api_version: get("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|| DEFAULT_OPENAI_API_VERSION.to_string()),
        };

        let search = AzureSearchSettings {
            endpoint: require("AZURE_AISEARCH_URL")?,
            admin_key: SecretString::new(require("AZURE_AISEARCH_API_KEY")?),
            api_version: get("AZURE_AISEARCH_API_VERSION")
                .unwrap_or_else(|| DEFAULT_SEARCH_API_VERSION.to_string()),
        };

        Ok(Self { openai, search })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("AZURE_OPENAI_ENDPOINT", "https://oai.example.com"),
        ("AZURE_OPENAI_API_KEY", "oai-key"),
        ("AZURE_AISEARCH_URL", "https://search.example.com"),
        ("AZURE_AISEARCH_API_KEY", "search-key"),
    ];

    #[test]
    fn test_defaults_applied() {
        let settings = Settings::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(settings.openai.endpoint, "https://oai.example.com");
        assert_eq!(settings.openai.api_key.expose_secret(), "oai-key");
        assert_eq!(settings.openai.chat_deployment, DEFAULT_CHAT_DEPLOYMENT);
        assert_eq!(
            settings.openai.embedding_deployment,
            DEFAULT_EMBEDDING_DEPLOYMENT
        );
        assert_eq!(settings.openai.api_version, DEFAULT_OPENAI_API_VERSION);
        assert_eq!(settings.search.admin_key.expose_secret(), "search-key");
        assert_eq!(settings.search.api_version, DEFAULT_SEARCH_API_VERSION);
    }

    #[test]
    fn test_generic_deployment_name_used_for_chat() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("AZURE_OPENAI_DEPLOYMENT_NAME", "turbo"));
        let settings = Settings::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(settings.openai.chat_deployment, "turbo");

        pairs.push(("AZURE_OPENAI_CHAT_DEPLOYMENT_NAME", "gpt-chat"));
        let settings = Settings::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(settings.openai.chat_deployment, "gpt-chat");
    }

    #[test]
    fn test_missing_variable_is_named() {
        let pairs: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "AZURE_AISEARCH_API_KEY")
            .collect();
        let err = Settings::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("AZURE_AISEARCH_API_KEY")));
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs.retain(|(k, _)| *k != "AZURE_OPENAI_API_KEY");
        pairs.push(("AZURE_OPENAI_API_KEY", "   "));
        assert!(Settings::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn test_debug_output_redacts_keys() {
        let settings = Settings::from_lookup(lookup(&REQUIRED)).unwrap();
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("oai-key"));
        assert!(!rendered.contains("search-key"));
    }
}
