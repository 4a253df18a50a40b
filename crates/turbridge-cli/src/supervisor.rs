//! Startup sequencing and child-process supervision.
//!
//! [`run`] is a strict sequence: construct the remote cache client and
//! probe its capabilities under a timeout, bring up the HTTP proxy,
//! verify it answers over real HTTP, then spawn the wrapped command and
//! follow it to completion. The command's exit code is propagated
//! verbatim; a non-zero exit is not an error.
//!
//! Two bypass modes relax the sequence: `disabled` skips the proxy
//! entirely, and `ignore_failures` downgrades any startup failure to a
//! warning and runs the command without a proxy. In both cases the
//! `TURBO_*` environment is left untouched, so the wrapped build simply
//! sees no remote cache.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use turbridge_proxy::stats::StatsSnapshot;
use turbridge_proxy::ProxyState;
use turbridge_remote::{CacheClient, RemoteCacheClient, RemoteCacheError, TlsIdentityPem};

use crate::retry::retry_request;

/// Supervisor configuration.
#[derive(Debug, Clone)]
pub struct Options {
    /// The command to run, and its arguments.
    pub command: String,
    pub args: Vec<String>,

    /// Remote cache host, `host:port` or a full URI.
    pub remote_host: String,
    /// Budget for the startup capability probe.
    pub remote_timeout: Duration,
    /// Optional client TLS identity for the remote connection.
    pub remote_tls: Option<TlsIdentityPem>,

    /// Address the HTTP proxy binds to. A bare `:port` binds all
    /// interfaces, as the probe URL substitutes `localhost`.
    pub bind_addr: String,

    /// Export `TURBO_API`/`TURBO_TOKEN`/`TURBO_TEAM` to the command when
    /// they are not already set.
    pub auto_env: bool,
    /// Skip the proxy and just run the command.
    pub disabled: bool,
    /// Degrade to a proxy-less run when startup fails.
    pub ignore_failures: bool,
}

/// What a supervised run produced.
#[derive(Debug)]
pub struct RunOutcome {
    /// The wrapped command's exit code.
    pub exit_code: i32,
    /// Counters from the proxy; all zero when it never started.
    pub stats: StatsSnapshot,
    /// True when startup failed and `ignore_failures` swallowed it.
    pub proxy_degraded: bool,
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The remote cache client could not be created or is unusable.
    #[error("failed to create remote cache client: {0}")]
    Client(#[source] RemoteCacheError),

    /// The capability probe did not answer within the budget.
    #[error("remote cache did not answer the capability probe within {0:?}")]
    ClientTimeout(Duration),

    /// The proxy listener could not bind.
    #[error("failed to start proxy server: {0}")]
    Server(#[source] std::io::Error),

    /// The proxy never answered its status endpoint.
    #[error("proxy server did not become ready: {0}")]
    Readiness(#[source] reqwest::Error),

    /// The wrapped command could not be spawned at all. Distinct from a
    /// spawned command exiting non-zero, which is propagated, not an error.
    #[error("error starting command {command:?}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// Waiting on the spawned command failed.
    #[error("error running command: {0}")]
    Wait(#[source] std::io::Error),
}

/// A live proxy: its state handle, for the post-run stats snapshot.
pub struct ProxyHandle {
    state: ProxyState,
}

impl ProxyHandle {
    pub fn stats(&self) -> StatsSnapshot {
        self.state.stats().snapshot()
    }
}

/// Run the full supervised sequence and return the command's outcome.
pub async fn run(options: Options) -> Result<RunOutcome, SupervisorError> {
    let proxy = if options.disabled {
        tracing::info!("cache proxy disabled; running the command directly");
        None
    } else {
        match start_proxy(&options).await {
            Ok(handle) => Some(handle),
            Err(err) if options.ignore_failures => {
                tracing::warn!("cache proxy startup failed, running without it: {err}");
                None
            }
            Err(err) => return Err(err),
        }
    };

    let proxy_degraded = !options.disabled && proxy.is_none();
    let exit_code = run_command(&options, proxy.is_some()).await?;

    Ok(RunOutcome {
        exit_code,
        stats: proxy.map(|p| p.stats()).unwrap_or_default(),
        proxy_degraded,
    })
}

async fn start_proxy(options: &Options) -> Result<ProxyHandle, SupervisorError> {
    let client = connect_remote(options).await?;
    serve_proxy(options, client).await
}

/// Dial the remote and verify it can serve this workload, under the
/// configured timeout.
async fn connect_remote(
    options: &Options,
) -> Result<Arc<dyn CacheClient>, SupervisorError> {
    let channel = turbridge_remote::connect(&options.remote_host, options.remote_tls.clone())
        .map_err(SupervisorError::Client)?;
    let client = RemoteCacheClient::new(channel);

    tracing::debug!(host = %options.remote_host, "checking remote cache capabilities");
    match tokio::time::timeout(options.remote_timeout, client.check_capabilities()).await {
        Ok(Ok(())) => Ok(Arc::new(client)),
        Ok(Err(err)) => Err(SupervisorError::Client(err)),
        Err(_) => Err(SupervisorError::ClientTimeout(options.remote_timeout)),
    }
}

/// Bind the HTTP proxy, serve it on a background task, and verify over
/// real HTTP that it answers before declaring it up.
pub async fn serve_proxy(
    options: &Options,
    client: Arc<dyn CacheClient>,
) -> Result<ProxyHandle, SupervisorError> {
    let state = ProxyState::new(client, turbridge_proxy::Options::default());
    let router = turbridge_proxy::app(state.clone());

    let listener = tokio::net::TcpListener::bind(bind_address(&options.bind_addr))
        .await
        .map_err(SupervisorError::Server)?;
    tracing::debug!(addr = %options.bind_addr, "starting HTTP server");

    tokio::spawn(async move {
        // A serve error cannot be signalled from here; the readiness
        // probe below fails loudly instead.
        if let Err(err) = axum::serve(listener, router).await {
            tracing::error!("proxy server exited: {err}");
        }
    });

    probe_readiness(&options.bind_addr).await?;
    Ok(ProxyHandle { state })
}

async fn probe_readiness(addr: &str) -> Result<(), SupervisorError> {
    let url = format!("{}/v8/artifacts/status", base_url(addr));
    let client = reqwest::Client::builder()
        .build()
        .map_err(SupervisorError::Readiness)?;

    let response = retry_request(|| client.get(&url).send())
        .await
        .and_then(|response| response.error_for_status())
        .map_err(SupervisorError::Readiness)?;

    tracing::debug!(status = %response.status(), "HTTP server is accessible");
    Ok(())
}

/// Spawn the wrapped command with inherited stdio and wait it out.
/// A command killed by a signal has no exit code and maps to 1.
async fn run_command(options: &Options, proxy_live: bool) -> Result<i32, SupervisorError> {
    let mut command = tokio::process::Command::new(&options.command);
    command.args(&options.args);

    if proxy_live && options.auto_env {
        for (name, value) in turbo_environment(&options.bind_addr) {
            if std::env::var_os(name).is_none() {
                command.env(name, value);
            }
        }
    }

    let mut child = command.spawn().map_err(|source| SupervisorError::Spawn {
        command: options.command.clone(),
        source,
    })?;
    let status = child.wait().await.map_err(SupervisorError::Wait)?;
    Ok(status.code().unwrap_or(1))
}

/// The environment a Turborepo invocation needs to talk to this proxy.
/// `TURBO_TOKEN`/`TURBO_TEAM` are required by the client but unused
/// here, hence the placeholder value.
fn turbo_environment(bind_addr: &str) -> [(&'static str, String); 3] {
    [
        ("TURBO_API", base_url(bind_addr)),
        ("TURBO_TOKEN", "ignore".to_string()),
        ("TURBO_TEAM", "ignore".to_string()),
    ]
}

/// The proxy's base URL as seen from this host. A bare `:port` bind
/// address maps to `localhost:port`.
fn base_url(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("http://localhost{addr}")
    } else {
        format!("http://{addr}")
    }
}

/// The address handed to the listener. A bare `:port` binds all
/// interfaces.
fn bind_address(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}
