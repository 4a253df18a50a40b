//! Supervisor tests: child exit-code propagation, bypass modes, and a
//! full HTTP round trip through a served proxy backed by the in-memory
//! cache client.

use std::sync::Arc;
use std::time::Duration;

use turbridge_cli::supervisor::{run, serve_proxy, Options, SupervisorError};
use turbridge_remote::InMemoryCacheClient;

/// Reserve a concrete local address for the proxy to bind. The listener
/// is dropped before the supervisor binds it; the small race is
/// acceptable in tests.
fn free_local_addr() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    format!("127.0.0.1:{}", addr.port())
}

fn shell_options(script: &str) -> Options {
    Options {
        command: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        remote_host: "127.0.0.1:1".to_string(),
        remote_timeout: Duration::from_secs(2),
        remote_tls: None,
        bind_addr: free_local_addr(),
        auto_env: false,
        disabled: true,
        ignore_failures: false,
    }
}

#[tokio::test]
async fn disabled_run_propagates_a_clean_exit() {
    let outcome = run(shell_options("exit 0")).await.expect("run");
    assert_eq!(outcome.exit_code, 0);
    assert!(!outcome.proxy_degraded);
    assert_eq!(outcome.stats.summary(), vec![("cache_requests", 0)]);
}

#[tokio::test]
async fn nonzero_child_exit_is_propagated_not_an_error() {
    let outcome = run(shell_options("exit 3")).await.expect("run");
    assert_eq!(outcome.exit_code, 3);
}

#[tokio::test]
async fn unspawnable_command_is_an_error() {
    let mut options = shell_options("exit 0");
    options.command = "/definitely/not/a/real/binary".to_string();
    let err = run(options).await.expect_err("spawn must fail");
    assert!(matches!(err, SupervisorError::Spawn { .. }), "got: {err}");
}

#[tokio::test]
async fn unreachable_remote_is_fatal_by_default() {
    let mut options = shell_options("exit 0");
    options.disabled = false;
    let err = run(options).await.expect_err("startup must fail");
    assert!(
        matches!(
            err,
            SupervisorError::Client(_) | SupervisorError::ClientTimeout(_)
        ),
        "got: {err}"
    );
}

#[tokio::test]
async fn ignore_failures_degrades_to_a_proxyless_run() {
    let mut options = shell_options("exit 0");
    options.disabled = false;
    options.ignore_failures = true;

    let outcome = run(options).await.expect("degraded run");
    assert_eq!(outcome.exit_code, 0);
    assert!(outcome.proxy_degraded);
    assert_eq!(outcome.stats.summary(), vec![("cache_requests", 0)]);
}

#[tokio::test]
async fn served_proxy_answers_over_real_http() {
    let options = shell_options("exit 0");
    let client = Arc::new(InMemoryCacheClient::new());
    let handle = serve_proxy(&options, client.clone())
        .await
        .expect("proxy must come up");

    let base = format!("http://{}", options.bind_addr);
    let http = reqwest::Client::new();

    // The readiness probe inside serve_proxy already hit /status once.
    let response = http
        .get(format!("{base}/v8/artifacts/status"))
        .send()
        .await
        .expect("status");
    assert!(response.status().is_success());

    let content = b"valuable content to be cached".to_vec();
    let response = http
        .put(format!("{base}/v8/artifacts/e2e-key"))
        .header("X-Artifact-Duration", "42")
        .body(content.clone())
        .send()
        .await
        .expect("upload");
    assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);

    let response = http
        .head(format!("{base}/v8/artifacts/e2e-key"))
        .send()
        .await
        .expect("exists");
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let response = http
        .get(format!("{base}/v8/artifacts/e2e-key"))
        .send()
        .await
        .expect("download");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("x-artifact-duration")
            .map(|v| v.to_str().expect("ascii")),
        Some("42")
    );
    assert_eq!(response.bytes().await.expect("body").to_vec(), content);

    let stats = handle.stats();
    assert_eq!(stats.uploads, 1);
    assert_eq!(stats.exists_yes, 1);
    assert_eq!(stats.downloads, 1);
    assert_eq!(stats.ul_bytes, content.len() as i64);
    assert_eq!(stats.dl_bytes, content.len() as i64);
}
