use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A record held by a memory store: text, metadata and its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// External identifier of the record (a URL for references)
    pub id: String,

    /// Whether the record points at an external source rather than holding
    /// information of its own
    pub is_reference: bool,

    /// Name of the external source, for references
    #[serde(default)]
    pub external_source_name: String,

    #[serde(default)]
    pub description: String,

    /// The text that was embedded
    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub additional_metadata: String,

    /// The embedding vector
    #[serde(default)]
    pub embedding: Vec<f32>,

    /// Store-assigned key, set once the record has been upserted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl MemoryRecord {
    /// Create a record referencing an external source
    pub fn reference_record(
        external_id: impl Into<String>,
        source_name: impl Into<String>,
        description: impl Into<String>,
        text: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: external_id.into(),
            is_reference: true,
            external_source_name: source_name.into(),
            description: description.into(),
            text: text.into(),
            additional_metadata: String::new(),
            embedding,
            key: None,
            timestamp: Some(Utc::now()),
        }
    }

    /// Create a record holding a piece of information
    pub fn local_record(
        id: impl Into<String>,
        text: impl Into<String>,
        description: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: id.into(),
            is_reference: false,
            external_source_name: String::new(),
            description: description.into(),
            text: text.into(),
            additional_metadata: String::new(),
            embedding,
            key: None,
            timestamp: Some(Utc::now()),
        }
    }

    /// Attach free-form metadata
    pub fn with_additional_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.additional_metadata = metadata.into();
        self
    }
}

/// A record returned by a similarity search, with its relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryQueryResult {
    pub id: String,
    pub is_reference: bool,
    pub external_source_name: String,
    pub description: String,
    pub text: String,
    pub additional_metadata: String,
    /// Similarity between the query and the record, higher is closer
    pub relevance: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl MemoryQueryResult {
    /// Build a query result from a stored record and its score
    pub fn from_record(record: MemoryRecord, relevance: f32) -> Self {
        let embedding = if record.embedding.is_empty() {
            None
        } else {
            Some(record.embedding)
        };
        Self {
            id: record.id,
            is_reference: record.is_reference,
            external_source_name: record.external_source_name,
            description: record.description,
            text: record.text,
            additional_metadata: record.additional_metadata,
            relevance,
            embedding,
        }
    }
}

/// Message role types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A chat message, containing content and a role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// The message role
    pub role: MessageRole,

    /// The message content
    pub content: String,

    /// Optional ID for the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Message {
    /// Create a new message
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            id: Some(Uuid::new_v4().to_string()),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}
