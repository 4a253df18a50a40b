//! Fabricated action-cache entries.
//!
//! The BRE action cache maps `Action` digests to `ActionResult` records.
//! To use it as a plain keyed map, every cache key is turned into a
//! placeholder `Command` carrying the key in its arguments, plus an
//! `Action` referencing that command. Both serializations are pure
//! functions of the key, so any process that knows the key can derive
//! the same action digest and look the artifact up.

use prost::Message;

use crate::digest::digest_of_bytes;
use crate::proto::remote_execution::{Action, Command, Digest};

/// Marker placed in the fabricated command's argument list. This is a
/// wire-format constant shared with other implementations of the same
/// scheme; changing it would orphan every previously written artifact.
const COMMAND_MARKER: &str = "tbc fake command";

/// Output-file name under which the artifact blob is recorded in the
/// action result.
pub const BLOB_FILE_NAME: &str = "cache_blob";

/// A serialized protobuf together with its digest, ready for a CAS
/// batch upload.
#[derive(Debug, Clone)]
pub struct EncodedProto {
    pub digest: Digest,
    pub data: Vec<u8>,
}

fn encode<M: Message>(message: &M) -> EncodedProto {
    let data = message.encode_to_vec();
    EncodedProto {
        digest: digest_of_bytes(&data),
        data,
    }
}

/// The command/action pair addressing one cache key.
#[derive(Debug, Clone)]
pub struct ActionProtos {
    pub command: EncodedProto,
    pub action: EncodedProto,
}

/// Derive the command/action pair for a canonical cache key.
pub fn action_protos_for_key(key: &str) -> ActionProtos {
    let command = encode(&Command {
        arguments: vec![
            COMMAND_MARKER.to_string(),
            "key".to_string(),
            key.to_string(),
        ],
    });
    let action = encode(&Action {
        command_digest: Some(command.digest.clone()),
    });
    ActionProtos { command, action }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_produces_byte_identical_protos() {
        let a = action_protos_for_key("slug/team/hash");
        let b = action_protos_for_key("slug/team/hash");
        assert_eq!(a.command.data, b.command.data);
        assert_eq!(a.command.digest, b.command.digest);
        assert_eq!(a.action.data, b.action.data);
        assert_eq!(a.action.digest, b.action.digest);
    }

    #[test]
    fn distinct_keys_produce_distinct_action_digests() {
        let a = action_protos_for_key("key-a");
        let b = action_protos_for_key("key-b");
        assert_ne!(a.command.digest, b.command.digest);
        assert_ne!(a.action.digest, b.action.digest);
    }

    #[test]
    fn command_carries_only_the_marker_and_key() {
        let protos = action_protos_for_key("some-key");
        let command = Command::decode(&protos.command.data[..]).expect("decode");
        assert_eq!(
            command.arguments,
            vec!["tbc fake command", "key", "some-key"]
        );
    }

    #[test]
    fn action_references_the_command_digest() {
        let protos = action_protos_for_key("some-key");
        let action = Action::decode(&protos.action.data[..]).expect("decode");
        assert_eq!(action.command_digest, Some(protos.command.digest));
    }

    #[test]
    fn proto_digests_describe_their_serializations() {
        let protos = action_protos_for_key("another-key");
        assert_eq!(
            protos.command.digest,
            digest_of_bytes(&protos.command.data)
        );
        assert_eq!(protos.action.digest, digest_of_bytes(&protos.action.data));
    }
}
