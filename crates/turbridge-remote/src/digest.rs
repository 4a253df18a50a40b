//! SHA-256 content digests.
//!
//! A [`Digest`] pairs the lowercase hex SHA-256 of a blob with its exact
//! byte length; both the CAS and the resource names of the bytestream
//! service address blobs this way.

use std::io::SeekFrom;

use sha2::{Digest as _, Sha256};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::proto::remote_execution::Digest;

const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Digest an in-memory blob.
pub fn digest_of_bytes(data: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Digest {
        hash: hex::encode(hasher.finalize()),
        size_bytes: data.len() as i64,
    }
}

/// Digest an open file by streaming it through the hasher, then rewind
/// it so the caller can re-read the same bytes for upload.
pub async fn digest_of_file(file: &mut File) -> std::io::Result<Digest> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];
    let mut size_bytes: i64 = 0;

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size_bytes += n as i64;
    }
    file.seek(SeekFrom::Start(0)).await?;

    Ok(Digest {
        hash: hex::encode(hasher.finalize()),
        size_bytes,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn digest_of_empty_input_matches_known_vector() {
        let digest = digest_of_bytes(b"");
        assert_eq!(digest.hash, EMPTY_SHA256);
        assert_eq!(digest.size_bytes, 0);
    }

    #[test]
    fn digest_is_lowercase_hex_of_expected_length() {
        let digest = digest_of_bytes(b"valuable content to be cached");
        assert_eq!(digest.hash.len(), 64);
        assert!(digest
            .hash
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(digest.size_bytes, 29);
    }

    #[tokio::test]
    async fn file_digest_agrees_with_bytes_digest_and_rewinds() {
        let mut tmp = tempfile::NamedTempFile::new().expect("temp file");
        let content = vec![0x5a_u8; 3 * HASH_CHUNK_SIZE + 17];
        tmp.write_all(&content).expect("write");

        let mut file = File::open(tmp.path()).await.expect("open");
        let digest = digest_of_file(&mut file).await.expect("digest");
        assert_eq!(digest, digest_of_bytes(&content));

        // The file is positioned back at the start for the upload pass.
        let mut reread = Vec::new();
        file.read_to_end(&mut reread).await.expect("read");
        assert_eq!(reread, content);
    }
}
