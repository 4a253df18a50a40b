//! # Remote Execution Wire Types
//!
//! Message types and service clients for the subset of the Bazel Remote
//! Execution v2 protocol this crate speaks: `Capabilities`,
//! `ContentAddressableStorage`, `ActionCache`, and the `ByteStream`
//! streaming service, plus `google.rpc.Status` for batch sub-responses.
//!
//! Field numbers match the published `remote_execution.proto` and
//! `bytestream.proto`, so everything written here is readable by any
//! other client of the same remote. Fields the crate never reads or
//! writes are omitted from the structs; unknown fields are skipped on
//! decode, so responses from a full server decode cleanly.
//!
//! The service clients are thin wrappers over [`tonic::client::Grpc`]
//! with a [`ProstCodec`](tonic::codec::ProstCodec), shaped like the
//! output of `tonic-build` but carrying only the five RPCs in use.

/// `build.bazel.remote.execution.v2` message types and clients.
pub mod remote_execution {
    /// A content digest: lowercase hex SHA-256 plus the exact byte length
    /// of the blob that was hashed.
    #[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
    pub struct Digest {
        #[prost(string, tag = "1")]
        pub hash: ::prost::alloc::string::String,
        #[prost(int64, tag = "2")]
        pub size_bytes: i64,
    }

    /// A command to run. Only `arguments` is carried: the action cache
    /// entries fabricated by this crate populate nothing else, and the
    /// digest of the serialized message must stay a pure function of the
    /// arguments list.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Command {
        #[prost(string, repeated, tag = "1")]
        pub arguments: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    }

    /// An executable action, reduced to the command digest reference.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Action {
        #[prost(message, optional, tag = "1")]
        pub command_digest: ::core::option::Option<Digest>,
    }

    /// A file produced by an action.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct OutputFile {
        #[prost(string, tag = "1")]
        pub path: ::prost::alloc::string::String,
        #[prost(message, optional, tag = "2")]
        pub digest: ::core::option::Option<Digest>,
    }

    /// Execution metadata attached to an action result. The only field
    /// in use is `auxiliary_metadata`, which smuggles the artifact
    /// headers through the action cache as a packed `google.protobuf.Struct`.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ExecutedActionMetadata {
        #[prost(message, repeated, tag = "11")]
        pub auxiliary_metadata: ::prost::alloc::vec::Vec<::prost_types::Any>,
    }

    /// The result of running an action, as stored in the action cache.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ActionResult {
        #[prost(message, repeated, tag = "2")]
        pub output_files: ::prost::alloc::vec::Vec<OutputFile>,
        #[prost(int32, tag = "4")]
        pub exit_code: i32,
        #[prost(message, optional, tag = "9")]
        pub execution_metadata: ::core::option::Option<ExecutedActionMetadata>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GetActionResultRequest {
        #[prost(string, tag = "1")]
        pub instance_name: ::prost::alloc::string::String,
        #[prost(message, optional, tag = "2")]
        pub action_digest: ::core::option::Option<Digest>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct UpdateActionResultRequest {
        #[prost(string, tag = "1")]
        pub instance_name: ::prost::alloc::string::String,
        #[prost(message, optional, tag = "2")]
        pub action_digest: ::core::option::Option<Digest>,
        #[prost(message, optional, tag = "3")]
        pub action_result: ::core::option::Option<ActionResult>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BatchUpdateBlobsRequest {
        #[prost(string, tag = "1")]
        pub instance_name: ::prost::alloc::string::String,
        #[prost(message, repeated, tag = "2")]
        pub requests: ::prost::alloc::vec::Vec<batch_update_blobs_request::Request>,
    }

    /// Nested message types in `BatchUpdateBlobsRequest`.
    pub mod batch_update_blobs_request {
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Request {
            #[prost(message, optional, tag = "1")]
            pub digest: ::core::option::Option<super::Digest>,
            #[prost(bytes = "vec", tag = "2")]
            pub data: ::prost::alloc::vec::Vec<u8>,
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BatchUpdateBlobsResponse {
        #[prost(message, repeated, tag = "1")]
        pub responses: ::prost::alloc::vec::Vec<batch_update_blobs_response::Response>,
    }

    /// Nested message types in `BatchUpdateBlobsResponse`.
    pub mod batch_update_blobs_response {
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Response {
            #[prost(message, optional, tag = "1")]
            pub digest: ::core::option::Option<super::Digest>,
            #[prost(message, optional, tag = "2")]
            pub status: ::core::option::Option<crate::proto::rpc::Status>,
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GetCapabilitiesRequest {
        #[prost(string, tag = "1")]
        pub instance_name: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ServerCapabilities {
        #[prost(message, optional, tag = "1")]
        pub cache_capabilities: ::core::option::Option<CacheCapabilities>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CacheCapabilities {
        #[prost(enumeration = "digest_function::Value", repeated, tag = "1")]
        pub digest_functions: ::prost::alloc::vec::Vec<i32>,
        #[prost(message, optional, tag = "2")]
        pub action_cache_update_capabilities:
            ::core::option::Option<ActionCacheUpdateCapabilities>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ActionCacheUpdateCapabilities {
        #[prost(bool, tag = "1")]
        pub update_enabled: bool,
    }

    /// The digest functions a server may advertise.
    pub mod digest_function {
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
        )]
        #[repr(i32)]
        pub enum Value {
            Unknown = 0,
            Sha256 = 1,
            Sha1 = 2,
            Md5 = 3,
            Vso = 4,
            Sha384 = 5,
            Sha512 = 6,
            Murmur3 = 7,
        }
    }

    /// Client for `build.bazel.remote.execution.v2.Capabilities`.
    pub mod capabilities_client {
        use tonic::codegen::http::uri::PathAndQuery;
        use tonic::transport::Channel;

        #[derive(Debug, Clone)]
        pub struct CapabilitiesClient {
            inner: tonic::client::Grpc<Channel>,
        }

        impl CapabilitiesClient {
            pub fn new(channel: Channel) -> Self {
                Self {
                    inner: tonic::client::Grpc::new(channel),
                }
            }

            pub async fn get_capabilities(
                &mut self,
                request: super::GetCapabilitiesRequest,
            ) -> Result<tonic::Response<super::ServerCapabilities>, tonic::Status> {
                self.inner
                    .ready()
                    .await
                    .map_err(|e| tonic::Status::unknown(format!("service not ready: {e}")))?;
                let codec = tonic::codec::ProstCodec::default();
                let path = PathAndQuery::from_static(
                    "/build.bazel.remote.execution.v2.Capabilities/GetCapabilities",
                );
                self.inner
                    .unary(tonic::Request::new(request), path, codec)
                    .await
            }
        }
    }

    /// Client for `build.bazel.remote.execution.v2.ContentAddressableStorage`.
    pub mod content_addressable_storage_client {
        use tonic::codegen::http::uri::PathAndQuery;
        use tonic::transport::Channel;

        #[derive(Debug, Clone)]
        pub struct ContentAddressableStorageClient {
            inner: tonic::client::Grpc<Channel>,
        }

        impl ContentAddressableStorageClient {
            pub fn new(channel: Channel) -> Self {
                Self {
                    inner: tonic::client::Grpc::new(channel),
                }
            }

            pub async fn batch_update_blobs(
                &mut self,
                request: super::BatchUpdateBlobsRequest,
            ) -> Result<tonic::Response<super::BatchUpdateBlobsResponse>, tonic::Status> {
                self.inner
                    .ready()
                    .await
                    .map_err(|e| tonic::Status::unknown(format!("service not ready: {e}")))?;
                let codec = tonic::codec::ProstCodec::default();
                let path = PathAndQuery::from_static(
                    "/build.bazel.remote.execution.v2.ContentAddressableStorage/BatchUpdateBlobs",
                );
                self.inner
                    .unary(tonic::Request::new(request), path, codec)
                    .await
            }
        }
    }

    /// Client for `build.bazel.remote.execution.v2.ActionCache`.
    pub mod action_cache_client {
        use tonic::codegen::http::uri::PathAndQuery;
        use tonic::transport::Channel;

        #[derive(Debug, Clone)]
        pub struct ActionCacheClient {
            inner: tonic::client::Grpc<Channel>,
        }

        impl ActionCacheClient {
            pub fn new(channel: Channel) -> Self {
                Self {
                    inner: tonic::client::Grpc::new(channel),
                }
            }

            pub async fn get_action_result(
                &mut self,
                request: super::GetActionResultRequest,
            ) -> Result<tonic::Response<super::ActionResult>, tonic::Status> {
                self.inner
                    .ready()
                    .await
                    .map_err(|e| tonic::Status::unknown(format!("service not ready: {e}")))?;
                let codec = tonic::codec::ProstCodec::default();
                let path = PathAndQuery::from_static(
                    "/build.bazel.remote.execution.v2.ActionCache/GetActionResult",
                );
                self.inner
                    .unary(tonic::Request::new(request), path, codec)
                    .await
            }

            pub async fn update_action_result(
                &mut self,
                request: super::UpdateActionResultRequest,
            ) -> Result<tonic::Response<super::ActionResult>, tonic::Status> {
                self.inner
                    .ready()
                    .await
                    .map_err(|e| tonic::Status::unknown(format!("service not ready: {e}")))?;
                let codec = tonic::codec::ProstCodec::default();
                let path = PathAndQuery::from_static(
                    "/build.bazel.remote.execution.v2.ActionCache/UpdateActionResult",
                );
                self.inner
                    .unary(tonic::Request::new(request), path, codec)
                    .await
            }
        }
    }
}

/// `google.bytestream` message types and client.
pub mod bytestream {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ReadRequest {
        #[prost(string, tag = "1")]
        pub resource_name: ::prost::alloc::string::String,
        #[prost(int64, tag = "2")]
        pub read_offset: i64,
        /// Zero means "no limit".
        #[prost(int64, tag = "3")]
        pub read_limit: i64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ReadResponse {
        #[prost(bytes = "vec", tag = "10")]
        pub data: ::prost::alloc::vec::Vec<u8>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct WriteRequest {
        /// Required on the first request of a write; may be empty on
        /// subsequent requests of the same stream.
        #[prost(string, tag = "1")]
        pub resource_name: ::prost::alloc::string::String,
        #[prost(int64, tag = "2")]
        pub write_offset: i64,
        #[prost(bool, tag = "3")]
        pub finish_write: bool,
        #[prost(bytes = "vec", tag = "10")]
        pub data: ::prost::alloc::vec::Vec<u8>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct WriteResponse {
        #[prost(int64, tag = "1")]
        pub committed_size: i64,
    }

    /// Client for `google.bytestream.ByteStream`.
    pub mod byte_stream_client {
        use futures::Stream;
        use tonic::codegen::http::uri::PathAndQuery;
        use tonic::transport::Channel;

        #[derive(Debug, Clone)]
        pub struct ByteStreamClient {
            inner: tonic::client::Grpc<Channel>,
        }

        impl ByteStreamClient {
            pub fn new(channel: Channel) -> Self {
                Self {
                    inner: tonic::client::Grpc::new(channel),
                }
            }

            pub async fn read(
                &mut self,
                request: super::ReadRequest,
            ) -> Result<tonic::Response<tonic::Streaming<super::ReadResponse>>, tonic::Status>
            {
                self.inner
                    .ready()
                    .await
                    .map_err(|e| tonic::Status::unknown(format!("service not ready: {e}")))?;
                let codec = tonic::codec::ProstCodec::default();
                let path = PathAndQuery::from_static("/google.bytestream.ByteStream/Read");
                self.inner
                    .server_streaming(tonic::Request::new(request), path, codec)
                    .await
            }

            pub async fn write<S>(
                &mut self,
                requests: S,
            ) -> Result<tonic::Response<super::WriteResponse>, tonic::Status>
            where
                S: Stream<Item = super::WriteRequest> + Send + 'static,
            {
                self.inner
                    .ready()
                    .await
                    .map_err(|e| tonic::Status::unknown(format!("service not ready: {e}")))?;
                let codec = tonic::codec::ProstCodec::default();
                let path = PathAndQuery::from_static("/google.bytestream.ByteStream/Write");
                self.inner
                    .client_streaming(tonic::Request::new(requests), path, codec)
                    .await
            }
        }
    }
}

/// `google.rpc` message types.
pub mod rpc {
    /// Per-blob status in batch CAS responses. `code` follows the
    /// canonical gRPC code space; zero is OK.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Status {
        #[prost(int32, tag = "1")]
        pub code: i32,
        #[prost(string, tag = "2")]
        pub message: ::prost::alloc::string::String,
    }
}

#[cfg(test)]
mod tests {
    use prost::Message;

    use super::bytestream::WriteRequest;
    use super::remote_execution::{Command, Digest};

    #[test]
    fn digest_wire_format_uses_expected_tags() {
        let digest = Digest {
            hash: "ab".to_string(),
            size_bytes: 3,
        };
        // field 1 (string "ab"), field 2 (varint 3)
        assert_eq!(digest.encode_to_vec(), b"\x0a\x02ab\x10\x03");
    }

    #[test]
    fn command_arguments_encode_in_order() {
        let command = Command {
            arguments: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(command.encode_to_vec(), b"\x0a\x01a\x0a\x01b");
    }

    #[test]
    fn write_request_data_lives_in_field_ten() {
        let request = WriteRequest {
            resource_name: String::new(),
            write_offset: 0,
            finish_write: false,
            data: vec![0xff],
        };
        // field 10, wire type 2, length 1
        assert_eq!(request.encode_to_vec(), b"\x52\x01\xff");
    }

    #[test]
    fn unknown_fields_are_skipped_on_decode() {
        // A Digest with an extra field 5 (varint) a full server might send.
        let bytes = b"\x0a\x02ab\x10\x03\x28\x01";
        let digest = Digest::decode(&bytes[..]).expect("decode");
        assert_eq!(digest.hash, "ab");
        assert_eq!(digest.size_bytes, 3);
    }
}
