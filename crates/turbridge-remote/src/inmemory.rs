//! In-memory [`CacheClient`] double.
//!
//! Backs the proxy in tests and offline runs with a plain map of
//! canonical key to stored bytes plus metadata. Misses report the same
//! NotFound rpc status the gRPC client would surface, so the HTTP
//! error-mapping paths exercise identically against either backend.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::client::CacheClient;
use crate::error::RemoteCacheError;
use crate::metadata::Metadata;

struct StoredArtifact {
    data: Vec<u8>,
    metadata: Metadata,
}

/// Map-backed artifact store.
#[derive(Default)]
pub struct InMemoryCacheClient {
    artifacts: Mutex<HashMap<String, StoredArtifact>>,
}

impl InMemoryCacheClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored artifacts.
    pub fn len(&self) -> usize {
        self.artifacts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.lock().is_empty()
    }
}

#[async_trait]
impl CacheClient for InMemoryCacheClient {
    async fn check_capabilities(&self) -> Result<(), RemoteCacheError> {
        Ok(())
    }

    async fn upload_file(
        &self,
        key: &str,
        path: &Path,
        metadata: Metadata,
    ) -> Result<(), RemoteCacheError> {
        let data = tokio::fs::read(path).await?;
        self.artifacts
            .lock()
            .insert(key.to_string(), StoredArtifact { data, metadata });
        Ok(())
    }

    async fn find_file(&self, key: &str) -> Result<bool, RemoteCacheError> {
        Ok(self.artifacts.lock().contains_key(key))
    }

    async fn download_file(
        &self,
        key: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<Metadata, RemoteCacheError> {
        let (data, metadata) = {
            let artifacts = self.artifacts.lock();
            match artifacts.get(key) {
                Some(artifact) => (artifact.data.clone(), artifact.metadata.clone()),
                None => {
                    return Err(tonic::Status::not_found("artifact not found").into());
                }
            }
        };
        sink.write_all(&data).await?;
        sink.flush().await?;
        Ok(metadata)
    }
}
