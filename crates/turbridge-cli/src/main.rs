//! # turbridge binary entry point
//!
//! Parses flags and environment, loads optional TLS material, then
//! hands off to the supervisor and exits with the wrapped command's
//! exit code.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use turbridge_remote::TlsIdentityPem;

use turbridge_cli::supervisor::{self, Options};

/// Turborepo ⇄ Bazel remote cache proxy.
///
/// Spins up a Turborepo-compatible remote cache server that forwards
/// artifacts to a Bazel-compatible remote cache, then executes the
/// provided command.
///
/// Examples:
///
///   # Check the server with curl (by default it binds to 0.0.0.0:8080)
///   turbridge --host bazel-cache-host:port -- curl http://localhost:8080/v8/artifacts/status
///
///   # Run 'turbo build' against the proxy
///   turbridge --host bazel-cache-host:port --summary -- pnpm turbo build
#[derive(Parser, Debug)]
#[command(name = "turbridge", version, about, verbatim_doc_comment)]
struct Cli {
    /// Remote cache server HOST
    #[arg(short = 'H', long, env = "TURBRIDGE_HOST", value_name = "HOST")]
    host: String,

    /// Address to bind to
    #[arg(long, env = "TURBRIDGE_ADDR", default_value = ":8080")]
    addr: String,

    /// TLS client certificate FILE (PEM)
    #[arg(
        long,
        env = "TURBRIDGE_CLIENT_CERT",
        value_name = "FILE",
        requires = "tls_client_key"
    )]
    tls_client_certificate: Option<PathBuf>,

    /// TLS client key FILE (PEM)
    #[arg(
        long,
        env = "TURBRIDGE_CLIENT_KEY",
        value_name = "FILE",
        requires = "tls_client_certificate"
    )]
    tls_client_key: Option<PathBuf>,

    /// Cache ops timeout in seconds
    #[arg(
        long,
        env = "TURBRIDGE_TIMEOUT",
        default_value_t = 30,
        value_name = "SECONDS"
    )]
    timeout: u64,

    /// Set up TURBO_* environment for the command
    #[arg(
        long,
        env = "TURBRIDGE_AUTO_ENV",
        default_value_t = true,
        action = clap::ArgAction::Set,
        value_name = "BOOL"
    )]
    auto_env: bool,

    /// Run the command without starting the proxy at all
    #[arg(long, env = "TURBRIDGE_DISABLED")]
    disabled: bool,

    /// If proxy startup fails, run the command without it instead of aborting
    #[arg(long, env = "TURBRIDGE_IGNORE_FAILURES")]
    ignore_failures: bool,

    /// Be more verbose
    #[arg(short, long, env = "TURBRIDGE_VERBOSE")]
    verbose: bool,

    /// Print cache statistics when the wrapped command exits
    #[arg(short, long, env = "TURBRIDGE_SUMMARY")]
    summary: bool,

    /// Command to execute, with its arguments
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let remote_tls = match load_tls_identity(&cli) {
        Ok(identity) => identity,
        Err(err) => {
            tracing::error!("{err:#}");
            return ExitCode::FAILURE;
        }
    };

    // clap guarantees at least one trailing argument.
    let (command, args) = cli
        .command
        .split_first()
        .map(|(command, args)| (command.clone(), args.to_vec()))
        .unwrap_or_default();

    let options = Options {
        command,
        args,
        remote_host: cli.host,
        remote_timeout: Duration::from_secs(cli.timeout),
        remote_tls,
        bind_addr: cli.addr,
        auto_env: cli.auto_env,
        disabled: cli.disabled,
        ignore_failures: cli.ignore_failures,
    };

    match supervisor::run(options).await {
        Ok(outcome) => {
            if cli.summary {
                tracing::info!("server stats: {}", outcome.stats);
            }
            if outcome.proxy_degraded {
                tracing::warn!("cache proxy was unavailable for this run");
            }
            ExitCode::from(outcome.exit_code.clamp(0, 255) as u8)
        }
        Err(err) => {
            tracing::error!("{:#}", anyhow::Error::new(err));
            ExitCode::FAILURE
        }
    }
}

/// Read the TLS client identity when both PEM files are configured.
/// clap enforces that the two flags only appear together.
fn load_tls_identity(cli: &Cli) -> anyhow::Result<Option<TlsIdentityPem>> {
    match (&cli.tls_client_certificate, &cli.tls_client_key) {
        (Some(cert), Some(key)) => Ok(Some(TlsIdentityPem {
            cert: std::fs::read(cert)
                .with_context(|| format!("reading TLS certificate {}", cert.display()))?,
            key: std::fs::read(key)
                .with_context(|| format!("reading TLS key {}", key.display()))?,
        })),
        (None, None) => Ok(None),
        _ => anyhow::bail!(
            "--tls-client-certificate and --tls-client-key must be provided together"
        ),
    }
}
