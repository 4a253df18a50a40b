//! Integration test against a live Bazel-compatible remote cache.
//!
//! Skipped unless `TURBRIDGE_TEST_REMOTE` names a cache host, e.g.
//!
//! ```text
//! TURBRIDGE_TEST_REMOTE=localhost:9092 cargo test -p turbridge-remote
//! ```
//!
//! `TURBRIDGE_TEST_TLS_CERT` / `TURBRIDGE_TEST_TLS_KEY` may point at PEM
//! files to exercise the TLS identity path.

use std::io::Cursor;
use std::time::Duration;

use rand::RngCore;
use turbridge_remote::{
    connect, CacheClient, Metadata, RemoteCacheClient, TlsIdentityPem,
};

fn remote_host() -> Option<String> {
    std::env::var("TURBRIDGE_TEST_REMOTE").ok().filter(|h| !h.is_empty())
}

fn tls_identity() -> Option<TlsIdentityPem> {
    let cert = std::env::var("TURBRIDGE_TEST_TLS_CERT").ok()?;
    let key = std::env::var("TURBRIDGE_TEST_TLS_KEY").ok()?;
    Some(TlsIdentityPem {
        cert: std::fs::read(cert).expect("read cert"),
        key: std::fs::read(key).expect("read key"),
    })
}

async fn upload_and_download(client: &RemoteCacheClient, metadata: Metadata) {
    let mut key_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut key_bytes);
    let key = format!("turbridge_test_{}", hex::encode(key_bytes));

    // A fresh random key must not exist yet.
    assert!(!client.find_file(&key).await.expect("find"));

    let mut sink = Cursor::new(Vec::new());
    let err = client
        .download_file(&key, &mut sink)
        .await
        .expect_err("download of a fresh key must miss");
    assert!(err.is_not_found(), "unexpected error: {err}");

    let mut content = vec![0u8; 4096];
    rand::thread_rng().fill_bytes(&mut content);
    let tmp = tempfile::NamedTempFile::new().expect("temp file");
    std::fs::write(tmp.path(), &content).expect("write");

    client
        .upload_file(&key, tmp.path(), metadata.clone())
        .await
        .expect("upload");

    assert!(client.find_file(&key).await.expect("find"));

    let mut sink = Cursor::new(Vec::new());
    let got = client.download_file(&key, &mut sink).await.expect("download");
    assert_eq!(sink.into_inner(), content);
    assert_eq!(got, metadata);
}

#[tokio::test]
async fn live_remote_round_trip() {
    let Some(host) = remote_host() else {
        eprintln!("TURBRIDGE_TEST_REMOTE is not set, skipping the integration test");
        return;
    };

    let channel = connect(&host, tls_identity()).expect("connect");
    let client = RemoteCacheClient::new(channel);

    tokio::time::timeout(Duration::from_secs(15), async {
        client.check_capabilities().await.expect("capabilities");

        upload_and_download(&client, Metadata::new()).await;
        upload_and_download(
            &client,
            Metadata::from([
                ("key1".to_string(), "value1".to_string()),
                ("key2".to_string(), "value2".to_string()),
            ]),
        )
        .await;
    })
    .await
    .expect("test timed out");
}
