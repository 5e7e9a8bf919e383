//! Artifact store - Persists uploaded milestone deliverables
//!
//! Milestone submissions may carry uploaded files alongside bare links. The
//! ledger stores each file through this interface and treats the returned
//! public URL exactly like a submitted link.

use crate::{error::EscrowError, EscrowResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// One uploaded file in a milestone submission
#[derive(Debug, Clone)]
pub struct ArtifactUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Storage interface consumed by the ledger
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist the bytes and return a public URL for them
    async fn store(&self, bytes: Vec<u8>, content_type: &str) -> EscrowResult<String>;
}

/// Quick scheme check for submitted links
pub fn is_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Configuration for the HTTP-backed store
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactStoreConfig {
    /// Base URL uploads are PUT to
    pub upload_base: String,
    /// Base URL served back to clients (CDN front)
    pub public_base: String,
    /// Key prefix within the bucket
    pub folder: String,
}

impl Default for ArtifactStoreConfig {
    fn default() -> Self {
        Self {
            upload_base: String::new(),
            public_base: String::new(),
            folder: "milestones".to_string(),
        }
    }
}

/// Object store reachable over plain HTTP PUT, fronted by a public CDN base
#[derive(Debug)]
pub struct HttpArtifactStore {
    config: ArtifactStoreConfig,
    client: reqwest::Client,
}

impl HttpArtifactStore {
    pub fn new(config: ArtifactStoreConfig) -> EscrowResult<Self> {
        if !is_url(&config.upload_base) || !is_url(&config.public_base) {
            return Err(EscrowError::config(
                "Artifact store requires http(s) upload_base and public_base",
            ));
        }
        Ok(Self {
            config,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    async fn store(&self, bytes: Vec<u8>, content_type: &str) -> EscrowResult<String> {
        let key = format!("{}/{}", self.config.folder, Uuid::new_v4());
        let upload_url = format!("{}/{}", self.config.upload_base.trim_end_matches('/'), key);

        let resp = self
            .client
            .put(&upload_url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|err| EscrowError::storage(format!("Upload failed: {err}")))?;

        if !resp.status().is_success() {
            return Err(EscrowError::storage(format!(
                "Upload rejected with status {}",
                resp.status()
            )));
        }

        Ok(format!(
            "{}/{}",
            self.config.public_base.trim_end_matches('/'),
            key
        ))
    }
}

/// In-memory store for tests and local runs
#[derive(Default)]
pub struct InMemoryArtifactStore {
    objects: Arc<RwLock<HashMap<String, (Vec<u8>, String)>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn store(&self, bytes: Vec<u8>, content_type: &str) -> EscrowResult<String> {
        let url = format!("mem://artifacts/{}", Uuid::new_v4());
        self.objects
            .write()
            .await
            .insert(url.clone(), (bytes, content_type.to_string()));
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_returns_unique_urls() {
        let store = InMemoryArtifactStore::new();
        let a = store.store(vec![1, 2, 3], "image/png").await.unwrap();
        let b = store.store(vec![4, 5], "image/png").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.len().await, 2);
        assert!(a.starts_with("mem://artifacts/"));
    }

    #[test]
    fn url_scheme_check() {
        assert!(is_url("https://cdn.example.com/x"));
        assert!(is_url("http://a"));
        assert!(!is_url("ftp://a"));
        assert!(!is_url("not a url"));
    }

    #[test]
    fn http_store_requires_http_bases() {
        let err = HttpArtifactStore::new(ArtifactStoreConfig::default()).unwrap_err();
        assert!(matches!(err, EscrowError::Config(_)));
    }
}
