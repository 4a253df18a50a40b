//! Error type for remote cache operations.

use thiserror::Error;

/// Anything that can go wrong while talking to the remote cache.
#[derive(Debug, Error)]
pub enum RemoteCacheError {
    /// The endpoint could not be parsed or the transport failed to
    /// establish.
    #[error("remote cache transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// An RPC completed with a non-OK status.
    #[error("remote cache rpc failed: {0}")]
    Rpc(#[from] tonic::Status),

    /// The server does not advertise SHA-256 digests.
    #[error("SHA-256 is not supported by remote cache")]
    Sha256Unsupported,

    /// The server does not accept action cache updates.
    #[error("action cache update is not supported by remote cache")]
    ActionCacheUpdateDisabled,

    /// A CAS batch update reported a per-blob failure.
    #[error("batch blob update failed: {0}")]
    BatchUpdateRejected(String),

    /// The bytestream write committed fewer bytes than were sent.
    #[error("upload committed {committed} of {expected} bytes")]
    ShortWrite { committed: i64, expected: i64 },

    /// The action result exists but carries no artifact blob entry.
    #[error("cache blob not found among output files")]
    BlobEntryMissing,

    /// Auxiliary metadata could not be encoded.
    #[error("metadata encoding failed: {0}")]
    MetadataEncode(#[from] prost::EncodeError),

    /// Auxiliary metadata could not be decoded.
    #[error("metadata decoding failed: {0}")]
    MetadataDecode(#[from] prost::DecodeError),

    /// Local file I/O around staging failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RemoteCacheError {
    /// True when the error is the remote saying "no such entry", as
    /// opposed to a transport or protocol failure. Used at the HTTP edge
    /// to map cache misses to 404 instead of 500.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Rpc(status) if status.code() == tonic::Code::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_status_is_a_miss() {
        let err = RemoteCacheError::from(tonic::Status::not_found("artifact not found"));
        assert!(err.is_not_found());
    }

    #[test]
    fn other_statuses_are_not_misses() {
        let err = RemoteCacheError::from(tonic::Status::unavailable("down"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn missing_blob_entry_is_not_a_miss() {
        assert!(!RemoteCacheError::BlobEntryMissing.is_not_found());
    }
}
