//! The remote cache client.
//!
//! [`CacheClient`] is the seam between the HTTP proxy and whatever
//! actually stores artifacts. [`RemoteCacheClient`] is the production
//! implementation speaking BRE v2 over gRPC; the in-memory double in
//! [`crate::inmemory`] implements the same trait for tests and offline
//! runs.
//!
//! An upload is four steps against the remote: stream the blob into CAS
//! via bytestream, batch-upload the fabricated command/action protos,
//! then publish an `ActionResult` that names the blob as its single
//! `cache_blob` output file. Downloads run the inverse: resolve the
//! action result, find the `cache_blob` entry, stream the blob out.
//! Nothing is transactional; a crash mid-upload leaves orphan CAS blobs
//! for the remote's own GC, and readers only ever observe keys whose
//! final `UpdateActionResult` landed.

use std::path::Path;

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tonic::transport::Channel;
use uuid::Uuid;

use crate::action::{action_protos_for_key, BLOB_FILE_NAME};
use crate::digest::digest_of_file;
use crate::error::RemoteCacheError;
use crate::metadata::{from_auxiliary, to_auxiliary, Metadata};
use crate::proto::bytestream::byte_stream_client::ByteStreamClient;
use crate::proto::bytestream::{ReadRequest, WriteRequest};
use crate::proto::remote_execution::action_cache_client::ActionCacheClient;
use crate::proto::remote_execution::capabilities_client::CapabilitiesClient;
use crate::proto::remote_execution::content_addressable_storage_client::ContentAddressableStorageClient;
use crate::proto::remote_execution::{
    batch_update_blobs_request, digest_function, ActionResult, BatchUpdateBlobsRequest,
    Digest, ExecutedActionMetadata, GetActionResultRequest, GetCapabilitiesRequest,
    OutputFile, UpdateActionResultRequest,
};

/// Chunk size for bytestream writes. 64 KiB keeps each gRPC message
/// comfortably under the usual 4 MiB server message limit.
const WRITE_CHUNK_SIZE: usize = 64 * 1024;

/// What a remote artifact cache must be able to do for the proxy.
#[async_trait]
pub trait CacheClient: Send + Sync {
    /// Verify the remote is usable for this workload. Called once at
    /// startup; failure is not retryable.
    async fn check_capabilities(&self) -> Result<(), RemoteCacheError>;

    /// Store the file at `path` under `key`, together with `metadata`
    /// when non-empty.
    async fn upload_file(
        &self,
        key: &str,
        path: &Path,
        metadata: Metadata,
    ) -> Result<(), RemoteCacheError>;

    /// Whether an artifact exists under `key`.
    async fn find_file(&self, key: &str) -> Result<bool, RemoteCacheError>;

    /// Stream the artifact stored under `key` into `sink` and return its
    /// metadata. A missing key surfaces as a NotFound rpc error.
    async fn download_file(
        &self,
        key: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<Metadata, RemoteCacheError>;
}

/// gRPC-backed [`CacheClient`] composing the four BRE services over one
/// shared channel. Cloning is cheap; every RPC clones the underlying
/// service client, so `&self` methods are safe for concurrent use.
#[derive(Debug, Clone)]
pub struct RemoteCacheClient {
    caps: CapabilitiesClient,
    cas: ContentAddressableStorageClient,
    ac: ActionCacheClient,
    bs: ByteStreamClient,
}

impl RemoteCacheClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            caps: CapabilitiesClient::new(channel.clone()),
            cas: ContentAddressableStorageClient::new(channel.clone()),
            ac: ActionCacheClient::new(channel.clone()),
            bs: ByteStreamClient::new(channel),
        }
    }

    /// Stream an already-hashed file into CAS under a fresh upload
    /// resource name. The per-upload UUID lets the server tell
    /// concurrent writes of the same digest apart.
    async fn write_blob(
        &self,
        file: tokio::fs::File,
        digest: &Digest,
    ) -> Result<(), RemoteCacheError> {
        let resource_name = format!(
            "uploads/{}/blobs/{}/{}",
            Uuid::new_v4(),
            digest.hash,
            digest.size_bytes
        );
        let total = digest.size_bytes;

        let requests = stream::unfold(
            (file, 0_i64, false),
            move |(mut file, offset, done)| {
                let resource_name = resource_name.clone();
                async move {
                    if done {
                        return None;
                    }
                    if total == 0 {
                        let request = WriteRequest {
                            resource_name,
                            write_offset: 0,
                            finish_write: true,
                            data: Vec::new(),
                        };
                        return Some((request, (file, 0, true)));
                    }
                    let mut data = vec![0u8; WRITE_CHUNK_SIZE];
                    match file.read(&mut data).await {
                        Ok(0) => None,
                        Ok(n) => {
                            data.truncate(n);
                            let next = offset + n as i64;
                            let request = WriteRequest {
                                // Only the first message names the resource.
                                resource_name: if offset == 0 {
                                    resource_name
                                } else {
                                    String::new()
                                },
                                write_offset: offset,
                                finish_write: next >= total,
                                data,
                            };
                            Some((request, (file, next, next >= total)))
                        }
                        Err(err) => {
                            // Ending the stream without finish_write makes
                            // the server fail the whole write.
                            tracing::warn!("staged upload read failed mid-stream: {err}");
                            None
                        }
                    }
                }
            },
        );

        let response = self.bs.clone().write(requests).await?.into_inner();
        if response.committed_size != total {
            return Err(RemoteCacheError::ShortWrite {
                committed: response.committed_size,
                expected: total,
            });
        }
        Ok(())
    }

    /// Resolve the action result for `key` and pick out the blob entry
    /// and stored metadata.
    async fn locate_artifact(
        &self,
        key: &str,
    ) -> Result<(OutputFile, Metadata), RemoteCacheError> {
        let protos = action_protos_for_key(key);
        let result = self
            .ac
            .clone()
            .get_action_result(GetActionResultRequest {
                instance_name: String::new(),
                action_digest: Some(protos.action.digest),
            })
            .await?
            .into_inner();

        let output_file = result
            .output_files
            .iter()
            .find(|f| f.path == BLOB_FILE_NAME)
            .cloned()
            .ok_or(RemoteCacheError::BlobEntryMissing)?;

        let metadata = match &result.execution_metadata {
            Some(em) => from_auxiliary(&em.auxiliary_metadata)?,
            None => Metadata::new(),
        };
        Ok((output_file, metadata))
    }
}

#[async_trait]
impl CacheClient for RemoteCacheClient {
    async fn check_capabilities(&self) -> Result<(), RemoteCacheError> {
        let capabilities = self
            .caps
            .clone()
            .get_capabilities(GetCapabilitiesRequest::default())
            .await?
            .into_inner();

        let cache = capabilities.cache_capabilities.unwrap_or_default();
        if !cache
            .digest_functions
            .contains(&(digest_function::Value::Sha256 as i32))
        {
            return Err(RemoteCacheError::Sha256Unsupported);
        }
        if !cache
            .action_cache_update_capabilities
            .unwrap_or_default()
            .update_enabled
        {
            return Err(RemoteCacheError::ActionCacheUpdateDisabled);
        }
        Ok(())
    }

    async fn upload_file(
        &self,
        key: &str,
        path: &Path,
        metadata: Metadata,
    ) -> Result<(), RemoteCacheError> {
        let mut file = tokio::fs::File::open(path).await?;
        let blob_digest = digest_of_file(&mut file).await?;
        self.write_blob(file, &blob_digest).await?;

        let protos = action_protos_for_key(key);
        let update = self
            .cas
            .clone()
            .batch_update_blobs(BatchUpdateBlobsRequest {
                instance_name: String::new(),
                requests: vec![
                    batch_update_blobs_request::Request {
                        digest: Some(protos.command.digest.clone()),
                        data: protos.command.data,
                    },
                    batch_update_blobs_request::Request {
                        digest: Some(protos.action.digest.clone()),
                        data: protos.action.data,
                    },
                ],
            })
            .await?
            .into_inner();

        for sub in &update.responses {
            let code = sub.status.as_ref().map_or(0, |s| s.code);
            if code != 0 {
                return Err(RemoteCacheError::BatchUpdateRejected(format!("{update:?}")));
            }
        }

        let execution_metadata = if metadata.is_empty() {
            None
        } else {
            Some(ExecutedActionMetadata {
                auxiliary_metadata: to_auxiliary(&metadata)?,
            })
        };

        self.ac
            .clone()
            .update_action_result(UpdateActionResultRequest {
                instance_name: String::new(),
                action_digest: Some(protos.action.digest),
                action_result: Some(ActionResult {
                    output_files: vec![OutputFile {
                        path: BLOB_FILE_NAME.to_string(),
                        digest: Some(blob_digest),
                    }],
                    exit_code: 0,
                    execution_metadata,
                }),
            })
            .await?;
        Ok(())
    }

    async fn find_file(&self, key: &str) -> Result<bool, RemoteCacheError> {
        match self.locate_artifact(key).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn download_file(
        &self,
        key: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<Metadata, RemoteCacheError> {
        let (output_file, metadata) = self.locate_artifact(key).await?;
        let digest = output_file
            .digest
            .ok_or(RemoteCacheError::BlobEntryMissing)?;

        let mut blob = self
            .bs
            .clone()
            .read(ReadRequest {
                resource_name: format!("blobs/{}/{}", digest.hash, digest.size_bytes),
                read_offset: 0,
                read_limit: 0,
            })
            .await?
            .into_inner();

        while let Some(chunk) = blob.message().await? {
            sink.write_all(&chunk.data).await?;
        }
        sink.flush().await?;
        Ok(metadata)
    }
}
