//! Memory store backed by an Azure AI Search (formerly Cognitive Search)
//! service.
//!
//! Each collection maps to one search index holding a vector field
//! searched with HNSW under the cosine metric. Record ids are usually URLs,
//! which are not valid document keys, so keys are stored as URL-safe base64
//! of the id.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use regex::Regex;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::OnceLock;

use crate::config::{AzureSearchSettings, DEFAULT_SEARCH_API_VERSION};
use crate::embeddings::azure::ADA_EMBEDDING_DIMENSION;
use crate::error::Error;
use crate::schema::MemoryRecord;
use crate::traits::MemoryStore;
use crate::utils::{check_status, normalize_endpoint};
use crate::Result;

const VECTOR_PROFILE: &str = "az-vector-config";
const VECTOR_ALGORITHM: &str = "az-vector-hnsw-config";
const FIELDS_WITHOUT_EMBEDDING: &str =
    "Id,Text,Description,AdditionalMetadata,ExternalSourceName,IsReference";
const FIELDS_WITH_EMBEDDING: &str =
    "Id,Text,Description,AdditionalMetadata,ExternalSourceName,IsReference,Embedding";

fn invalid_index_chars() -> Result<&'static Regex> {
    static INVALID: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    INVALID
        .get_or_init(|| Regex::new(r"[^a-z0-9]+"))
        .as_ref()
        .map_err(|e| Error::Other(e.to_string()))
}

/// Map a collection name onto a valid index name: lowercase letters, digits
/// and single dashes, 2 to 128 characters, starting and ending alphanumeric
pub fn normalize_index_name(collection: &str) -> Result<String> {
    let invalid = invalid_index_chars()?;
    let lowered = collection.trim().to_lowercase();
    let name = invalid.replace_all(&lowered, "-").trim_matches('-').to_string();

    if name.len() < 2 || name.len() > 128 {
        return Err(Error::InvalidCollection(format!(
            "{:?} cannot be used as a search index name",
            collection
        )));
    }
    Ok(name)
}

/// Encode a record id as a document key
pub fn encode_key(id: &str) -> String {
    URL_SAFE.encode(id.as_bytes())
}

/// Recover a record id from a document key
pub fn decode_key(key: &str) -> Result<String> {
    let bytes = URL_SAFE
        .decode(key)
        .map_err(|e| Error::MemoryStore(format!("Invalid document key {}: {}", key, e)))?;
    String::from_utf8(bytes)
        .map_err(|e| Error::MemoryStore(format!("Invalid document key {}: {}", key, e)))
}

/// A document as stored in the search index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SearchDocument {
    id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    embedding: Vec<f32>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    additional_metadata: String,
    #[serde(default)]
    external_source_name: String,
    #[serde(default)]
    is_reference: bool,
}

impl SearchDocument {
    fn from_record(record: MemoryRecord) -> Self {
        Self {
            id: encode_key(&record.id),
            embedding: record.embedding,
            text: record.text,
            description: record.description,
            additional_metadata: record.additional_metadata,
            external_source_name: record.external_source_name,
            is_reference: record.is_reference,
        }
    }

    fn into_record(self) -> Result<MemoryRecord> {
        let id = decode_key(&self.id)?;
        Ok(MemoryRecord {
            key: Some(id.clone()),
            id,
            is_reference: self.is_reference,
            external_source_name: self.external_source_name,
            description: self.description,
            text: self.text,
            additional_metadata: self.additional_metadata,
            embedding: self.embedding,
            timestamp: None,
        })
    }
}

#[derive(Debug, Serialize)]
struct IndexAction {
    #[serde(rename = "@search.action")]
    action: &'static str,
    #[serde(flatten)]
    document: SearchDocument,
}

#[derive(Debug, Serialize)]
struct IndexBatch {
    value: Vec<IndexAction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexingResult {
    key: String,
    status: bool,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndexingResponse {
    value: Vec<IndexingResult>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VectorQuery<'a> {
    kind: &'static str,
    vector: &'a [f32],
    fields: &'static str,
    k: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    vector_queries: Vec<VectorQuery<'a>>,
    select: &'static str,
    top: usize,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "@search.score")]
    score: f32,
    #[serde(flatten)]
    document: SearchDocument,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    value: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct IndexName {
    name: String,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    value: Vec<IndexName>,
}

/// Azure AI Search memory store
pub struct AzureSearchMemoryStore {
    search_endpoint: String,
    admin_key: SecretString,
    api_version: String,
    vector_size: usize,
    client: reqwest::Client,
}

impl AzureSearchMemoryStore {
    /// Create a store for a search service
    pub fn new(
        vector_size: usize,
        search_endpoint: impl AsRef<str>,
        admin_key: impl Into<String>,
    ) -> Self {
        Self {
            search_endpoint: normalize_endpoint(search_endpoint.as_ref()),
            admin_key: SecretString::new(admin_key.into()),
            api_version: DEFAULT_SEARCH_API_VERSION.to_string(),
            vector_size,
            client: reqwest::Client::new(),
        }
    }

    /// Create the store described by the settings, sized for ada embeddings
    pub fn from_settings(settings: &AzureSearchSettings) -> Self {
        Self::new(
            ADA_EMBEDDING_DIMENSION,
            &settings.endpoint,
            settings.admin_key.expose_secret().clone(),
        )
        .with_api_version(settings.api_version.clone())
    }

    /// Set the REST API version
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Dimension of the vectors this store accepts
    pub fn vector_size(&self) -> usize {
        self.vector_size
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.search_endpoint, path))
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", self.admin_key.expose_secret())
    }

    fn index_definition(&self, index: &str) -> Value {
        json!({
            "name": index,
            "fields": [
                { "name": "Id", "type": "Edm.String", "key": true, "searchable": false,
                  "filterable": true, "retrievable": true },
                { "name": "Embedding", "type": "Collection(Edm.Single)", "searchable": true,
                  "retrievable": true, "dimensions": self.vector_size,
                  "vectorSearchProfile": VECTOR_PROFILE },
                { "name": "Text", "type": "Edm.String", "searchable": true,
                  "filterable": false, "retrievable": true },
                { "name": "Description", "type": "Edm.String", "searchable": true,
                  "filterable": false, "retrievable": true },
                { "name": "AdditionalMetadata", "type": "Edm.String", "searchable": true,
                  "filterable": false, "retrievable": true },
                { "name": "ExternalSourceName", "type": "Edm.String", "searchable": false,
                  "filterable": true, "retrievable": true },
                { "name": "IsReference", "type": "Edm.Boolean", "searchable": false,
                  "filterable": true, "retrievable": true }
            ],
            "vectorSearch": {
                "algorithms": [{
                    "name": VECTOR_ALGORITHM,
                    "kind": "hnsw",
                    "hnswParameters": { "m": 4, "efConstruction": 400, "efSearch": 500, "metric": "cosine" }
                }],
                "profiles": [{ "name": VECTOR_PROFILE, "algorithm": VECTOR_ALGORITHM }]
            }
        })
    }

    async fn index_documents(&self, index: &str, actions: Vec<IndexAction>) -> Result<()> {
        let res = self
            .request(Method::POST, &format!("/indexes/{}/docs/index", index))
            .json(&IndexBatch { value: actions })
            .send()
            .await
            .map_err(Error::Request)?;

        let res = check_status(res, "Azure AI Search", Error::MemoryStore).await?;
        let response: IndexingResponse = res.json().await.map_err(Error::Request)?;

        if let Some(failed) = response.value.iter().find(|r| !r.status) {
            return Err(Error::MemoryStore(format!(
                "Indexing document {} failed: {}",
                failed.key,
                failed.error_message.as_deref().unwrap_or("unknown error")
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl MemoryStore for AzureSearchMemoryStore {
    async fn create_collection(&self, collection: &str) -> Result<()> {
        if self.does_collection_exist(collection).await? {
            return Ok(());
        }

        let index = normalize_index_name(collection)?;
        tracing::info!(index = %index, "creating search index");

        let res = self
            .request(Method::PUT, &format!("/indexes/{}", index))
            .json(&self.index_definition(&index))
            .send()
            .await
            .map_err(Error::Request)?;
        check_status(res, "Azure AI Search", Error::MemoryStore).await?;
        Ok(())
    }

    async fn get_collections(&self) -> Result<Vec<String>> {
        let res = self
            .request(Method::GET, "/indexes")
            .query(&[("$select", "name")])
            .send()
            .await
            .map_err(Error::Request)?;

        let res = check_status(res, "Azure AI Search", Error::MemoryStore).await?;
        let list: IndexList = res.json().await.map_err(Error::Request)?;
        Ok(list.value.into_iter().map(|i| i.name).collect())
    }

    async fn delete_collection(&self, collection: &str) -> Result<()> {
        let index = normalize_index_name(collection)?;
        let res = self
            .request(Method::DELETE, &format!("/indexes/{}", index))
            .send()
            .await
            .map_err(Error::Request)?;

        // Deleting an index that is already gone is not an error
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        check_status(res, "Azure AI Search", Error::MemoryStore).await?;
        Ok(())
    }

    async fn does_collection_exist(&self, collection: &str) -> Result<bool> {
        let index = normalize_index_name(collection)?;
        let res = self
            .request(Method::GET, &format!("/indexes/{}", index))
            .send()
            .await
            .map_err(Error::Request)?;

        if res.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check_status(res, "Azure AI Search", Error::MemoryStore).await?;
        Ok(true)
    }

    async fn upsert(&self, collection: &str, record: MemoryRecord) -> Result<String> {
        let mut keys = self.upsert_batch(collection, vec![record]).await?;
        keys.pop()
            .ok_or_else(|| Error::MemoryStore("No key returned for upserted record".to_string()))
    }

    async fn upsert_batch(&self, collection: &str, records: Vec<MemoryRecord>) -> Result<Vec<String>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let index = normalize_index_name(collection)?;

        let mut keys = Vec::with_capacity(records.len());
        let mut actions = Vec::with_capacity(records.len());
        for record in records {
            if record.embedding.len() != self.vector_size {
                return Err(Error::MemoryStore(format!(
                    "Embedding for {} has dimension {}, index expects {}",
                    record.id,
                    record.embedding.len(),
                    self.vector_size
                )));
            }
            keys.push(record.id.clone());
            actions.push(IndexAction {
                action: "mergeOrUpload",
                document: SearchDocument::from_record(record),
            });
        }

        self.index_documents(&index, actions).await?;
        tracing::debug!(index = %index, count = keys.len(), "upserted documents");
        Ok(keys)
    }

    async fn get(
        &self,
        collection: &str,
        key: &str,
        with_embedding: bool,
    ) -> Result<Option<MemoryRecord>> {
        let index = normalize_index_name(collection)?;
        let select = if with_embedding {
            FIELDS_WITH_EMBEDDING
        } else {
            FIELDS_WITHOUT_EMBEDDING
        };

        let res = self
            .request(
                Method::GET,
                &format!("/indexes/{}/docs/{}", index, encode_key(key)),
            )
            .query(&[("$select", select)])
            .send()
            .await
            .map_err(Error::Request)?;

        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let res = check_status(res, "Azure AI Search", Error::MemoryStore).await?;
        let document: SearchDocument = res.json().await.map_err(Error::Request)?;
        document.into_record().map(Some)
    }

    async fn remove(&self, collection: &str, key: &str) -> Result<()> {
        let index = normalize_index_name(collection)?;
        let action = IndexAction {
            action: "delete",
            document: SearchDocument {
                id: encode_key(key),
                embedding: Vec::new(),
                text: String::new(),
                description: String::new(),
                additional_metadata: String::new(),
                external_source_name: String::new(),
                is_reference: false,
            },
        };
        self.index_documents(&index, vec![action]).await
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
        let index = normalize_index_name(collection)?;

        let request = SearchRequest {
            vector_queries: vec![VectorQuery {
                kind: "vector",
                vector: embedding,
                fields: "Embedding",
                k: limit,
            }],
            select: if with_embeddings {
                FIELDS_WITH_EMBEDDING
            } else {
                FIELDS_WITHOUT_EMBEDDING
            },
            top: limit,
        };

        let res = self
            .request(Method::POST, &format!("/indexes/{}/docs/search", index))
            .json(&request)
            .send()
            .await
            .map_err(Error::Request)?;

        let res = check_status(res, "Azure AI Search", Error::MemoryStore).await?;
        let response: SearchResponse = res.json().await.map_err(Error::Request)?;

        let mut results = Vec::with_capacity(response.value.len());
        for hit in response.value {
            if hit.score < min_relevance_score {
                continue;
            }
            results.push((hit.document.into_record()?, hit.score));
        }

        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);
        tracing::debug!(index = %index, hits = results.len(), "vector search completed");
        Ok(results)
    }
}
