//! Service registry tying chat models, embedding models and a memory store
//! together.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Error;
use crate::memory::SemanticTextMemory;
use crate::traits::{ChatModel, EmbeddingModel, MemoryStore};
use crate::Result;

/// Holds the named AI services and the semantic memory built on them
#[derive(Default)]
pub struct Kernel {
    chat_services: HashMap<String, Arc<dyn ChatModel>>,
    embedding_services: HashMap<String, Arc<dyn EmbeddingModel>>,
    default_chat_service: Option<String>,
    default_embedding_service: Option<String>,
    memory: Option<SemanticTextMemory>,
}

impl Kernel {
    /// Create an empty kernel
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a chat service; the first one registered becomes the default
    pub fn add_chat_service(
        &mut self,
        id: impl Into<String>,
        service: impl ChatModel + 'static,
    ) -> Result<&mut Self> {
        let id = id.into();
        if self.chat_services.contains_key(&id) {
            return Err(Error::Kernel(format!("Chat service {} already registered", id)));
        }
        tracing::debug!(service = %id, model = service.model_name(), "registered chat service");
        self.default_chat_service.get_or_insert_with(|| id.clone());
        self.chat_services.insert(id, Arc::new(service));
        Ok(self)
    }

    /// Register an embedding service; the first one registered becomes the default
    pub fn add_text_embedding_generation_service(
        &mut self,
        id: impl Into<String>,
        service: impl EmbeddingModel + 'static,
    ) -> Result<&mut Self> {
        let id = id.into();
        if self.embedding_services.contains_key(&id) {
            return Err(Error::Kernel(format!(
                "Embedding service {} already registered",
                id
            )));
        }
        tracing::debug!(service = %id, model = service.model_name(), "registered embedding service");
        self.default_embedding_service.get_or_insert_with(|| id.clone());
        self.embedding_services.insert(id, Arc::new(service));
        Ok(self)
    }

    /// Look up a chat service, or the default one when `id` is `None`
    pub fn chat_service(&self, id: Option<&str>) -> Result<Arc<dyn ChatModel>> {
        let id = id
            .or(self.default_chat_service.as_deref())
            .ok_or_else(|| Error::Kernel("No chat service registered".to_string()))?;
        self.chat_services
            .get(id)
            .cloned()
            .ok_or_else(|| Error::Kernel(format!("Chat service {} not found", id)))
    }

    /// Look up an embedding service, or the default one when `id` is `None`
    pub fn text_embedding_service(&self, id: Option<&str>) -> Result<Arc<dyn EmbeddingModel>> {
        let id = id
            .or(self.default_embedding_service.as_deref())
            .ok_or_else(|| Error::Kernel("No embedding service registered".to_string()))?;
        self.embedding_services
            .get(id)
            .cloned()
            .ok_or_else(|| Error::Kernel(format!("Embedding service {} not found", id)))
    }

    /// Build the semantic memory on `store` and the default embedding service
    pub fn register_memory_store(&mut self, store: impl MemoryStore + 'static) -> Result<&mut Self> {
        let embeddings = self.text_embedding_service(None)?;
        self.memory = Some(SemanticTextMemory::new(Arc::new(store), embeddings));
        Ok(self)
    }

    /// The semantic memory registered with the kernel
    pub fn memory(&self) -> Result<&SemanticTextMemory> {
        self.memory
            .as_ref()
            .ok_or_else(|| Error::Kernel("No memory store registered".to_string()))
    }
}
