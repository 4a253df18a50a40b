//! Artifact metadata codec.
//!
//! A handful of headers from the upload request travel with the artifact
//! through the action cache, packed as a `google.protobuf.Struct` inside
//! a single `Any` entry of `ExecutedActionMetadata.auxiliary_metadata`.
//!
//! Decoding is deliberately forgiving: anything other than exactly one
//! `Any` entry yields an empty map, and non-string struct values are
//! dropped. A record written by some other tool should degrade to "no
//! metadata", never fail the download.

use std::collections::BTreeMap;

use prost::Message;
use prost_types::value::Kind;
use prost_types::{Any, Struct, Value};

use crate::error::RemoteCacheError;

/// Key-value pairs stored alongside an uploaded artifact.
pub type Metadata = BTreeMap<String, String>;

/// Type URL used for the packed `google.protobuf.Struct` entry.
///
/// `prost_types::Struct` does not implement `prost::Name`, so it cannot
/// go through `Any::from_msg`/`to_msg`; the URL is built by hand instead.
const STRUCT_TYPE_URL: &str = "type.googleapis.com/google.protobuf.Struct";

/// Pack a metadata map into the `auxiliary_metadata` representation.
/// An empty map encodes to no entries at all.
pub fn to_auxiliary(metadata: &Metadata) -> Result<Vec<Any>, RemoteCacheError> {
    if metadata.is_empty() {
        return Ok(Vec::new());
    }
    let packed = Struct {
        fields: metadata
            .iter()
            .map(|(key, value)| {
                (
                    key.clone(),
                    Value {
                        kind: Some(Kind::StringValue(value.clone())),
                    },
                )
            })
            .collect(),
    };
    Ok(vec![Any {
        type_url: STRUCT_TYPE_URL.to_string(),
        value: packed.encode_to_vec(),
    }])
}

/// Unpack `auxiliary_metadata` entries back into a metadata map.
///
/// Exactly one entry is recognized; zero or several decode to an empty
/// map rather than an error, since other writers are free to attach
/// their own auxiliary records.
pub fn from_auxiliary(entries: &[Any]) -> Result<Metadata, RemoteCacheError> {
    let [entry] = entries else {
        return Ok(Metadata::new());
    };
    if entry.type_url != STRUCT_TYPE_URL {
        return Err(RemoteCacheError::MetadataDecode(prost::DecodeError::new(
            format!("unexpected auxiliary metadata type URL: {}", entry.type_url),
        )));
    }
    let packed = Struct::decode(entry.value.as_slice())?;
    Ok(packed
        .fields
        .into_iter()
        .filter_map(|(key, value)| match value.kind {
            Some(Kind::StringValue(s)) => Some((key, s)),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Metadata {
        Metadata::from([
            ("x-artifact-duration".to_string(), "42".to_string()),
            (
                "x-artifact-tag".to_string(),
                "Tc0BmHvJYMIYJ62/zx87YqO0Flxk+5Ovip25NY825CQ=".to_string(),
            ),
        ])
    }

    #[test]
    fn round_trip_preserves_entries() {
        let entries = to_auxiliary(&sample()).expect("encode");
        assert_eq!(entries.len(), 1);
        let decoded = from_auxiliary(&entries).expect("decode");
        assert_eq!(decoded, sample());
    }

    #[test]
    fn empty_map_encodes_to_no_entries() {
        let entries = to_auxiliary(&Metadata::new()).expect("encode");
        assert!(entries.is_empty());
    }

    #[test]
    fn zero_entries_decode_to_empty() {
        assert_eq!(from_auxiliary(&[]).expect("decode"), Metadata::new());
    }

    #[test]
    fn multiple_entries_decode_to_empty() {
        let entry = to_auxiliary(&sample()).expect("encode").remove(0);
        let decoded = from_auxiliary(&[entry.clone(), entry]).expect("decode");
        assert_eq!(decoded, Metadata::new());
    }

    #[test]
    fn non_string_values_are_dropped() {
        let packed = Struct {
            fields: [
                (
                    "kept".to_string(),
                    Value {
                        kind: Some(Kind::StringValue("yes".to_string())),
                    },
                ),
                (
                    "dropped".to_string(),
                    Value {
                        kind: Some(Kind::NumberValue(7.0)),
                    },
                ),
            ]
            .into_iter()
            .collect(),
        };
        let entry = Any {
            type_url: STRUCT_TYPE_URL.to_string(),
            value: packed.encode_to_vec(),
        };
        let decoded = from_auxiliary(&[entry]).expect("decode");
        assert_eq!(decoded, Metadata::from([("kept".into(), "yes".into())]));
    }

    #[test]
    fn foreign_payload_type_is_an_error() {
        let foreign = Any::from_msg(&prost_types::Duration {
            seconds: 1,
            nanos: 0,
        })
        .expect("encode");
        assert!(from_auxiliary(&[foreign]).is_err());
    }

    #[test]
    fn struct_type_url_is_the_wellknown_one() {
        let entries = to_auxiliary(&sample()).expect("encode");
        assert_eq!(
            entries[0].type_url,
            "type.googleapis.com/google.protobuf.Struct"
        );
    }
}
