//! # turbridge-proxy — Turborepo-compatible artifact server
//!
//! The HTTP face of the proxy. Speaks the Turborepo remote-cache API
//! under `/v8/artifacts` and delegates storage to a
//! [`CacheClient`](turbridge_remote::CacheClient):
//!
//! | Method | Path                    | Handler |
//! |--------|-------------------------|---------|
//! | POST   | `/v8/artifacts/events`  | acknowledge-and-drop |
//! | GET    | `/v8/artifacts/status`  | `{"status":"enabled"}` |
//! | PUT    | `/v8/artifacts/{hash}`  | upload |
//! | HEAD   | `/v8/artifacts/{hash}`  | existence check |
//! | GET    | `/v8/artifacts/{hash}`  | download |
//!
//! Every artifact route sits behind the optional bearer gate
//! ([`auth`]). Request counters ([`stats`]) are the only shared mutable
//! state; the supervisor reads them once after the wrapped command
//! exits.

pub mod auth;
pub mod key;
pub mod routes;
pub mod stats;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;
use turbridge_remote::CacheClient;

use crate::stats::Stats;

/// Server construction options.
#[derive(Debug, Default, Clone)]
pub struct Options {
    /// Bearer token required on artifact requests; empty disables the gate.
    pub token: String,
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ProxyState {
    client: Arc<dyn CacheClient>,
    stats: Stats,
    token: Option<Arc<str>>,
}

impl ProxyState {
    pub fn new(client: Arc<dyn CacheClient>, options: Options) -> Self {
        let token = if options.token.is_empty() {
            None
        } else {
            Some(options.token.into())
        };
        Self {
            client,
            stats: Stats::new(),
            token,
        }
    }

    pub fn client(&self) -> &Arc<dyn CacheClient> {
        &self.client
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub(crate) fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

/// Assemble the artifact router.
///
/// The default request body limit is lifted: artifacts are routinely
/// tens of megabytes and the upload handler streams them to disk rather
/// than buffering. Unknown paths fall through to the router's 404.
pub fn app(state: ProxyState) -> Router {
    let api = Router::new()
        .route("/events", post(routes::service::record_events))
        .route("/status", get(routes::service::cache_status))
        .route(
            "/:hash",
            put(routes::artifacts::upload_artifact)
                .head(routes::artifacts::artifact_exists)
                .get(routes::artifacts::download_artifact),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(from_fn_with_state(state.clone(), auth::bearer_gate));

    Router::new()
        .nest("/v8/artifacts", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
