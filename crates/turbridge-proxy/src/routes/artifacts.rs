//! Artifact upload, existence, and download handlers.
//!
//! All three stage through the filesystem rather than memory: an upload
//! streams the request body into a temp file before handing it to the
//! remote client, and a download streams the remote blob into a temp
//! file before serving it. Temp files are [`NamedTempFile`]s, removed
//! on drop on every exit path.
//!
//! Error discipline (also the source of the counter semantics): remote
//! misses map to 404 and a miss counter; everything else maps to 500,
//! the `errors` counter, and a log line with the key. Errors never
//! propagate past a handler.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::{HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use serde::Serialize;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use turbridge_remote::Metadata;

use crate::key::{canonical_key, ArtifactScope};
use crate::ProxyState;

/// Headers that travel with an artifact through the remote cache. Every
/// other request header is dropped on upload.
const METADATA_HEADERS: [&str; 2] = ["x-artifact-duration", "x-artifact-tag"];

/// Epoch timestamp for the `Last-Modified` header, so clients never see
/// a modification time worth revalidating against.
const EPOCH_HTTP_DATE: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

#[derive(Serialize)]
pub struct UploadAccepted {
    urls: Vec<String>,
}

/// Collect the allowlisted, non-empty request headers into a metadata map.
fn collect_metadata(headers: &HeaderMap) -> Metadata {
    let mut metadata = Metadata::new();
    for name in METADATA_HEADERS {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            if !value.is_empty() {
                metadata.insert(name.to_string(), value.to_string());
            }
        }
    }
    metadata
}

/// Resolve the canonical key or produce the 500 the caller returns
/// as-is. An empty hash cannot arrive through the router; answering 500
/// keeps a routing regression loud.
fn require_key(hash: &str, scope: &ArtifactScope) -> Result<String, Response> {
    canonical_key(hash, scope)
        .ok_or_else(|| (StatusCode::INTERNAL_SERVER_ERROR, "bad hash").into_response())
}

fn failure(state: &ProxyState, key: &str, context: &str, body: &'static str) -> Response {
    state.stats().record_error();
    tracing::error!(%key, "{context}");
    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}

/// PUT /v8/artifacts/{hash} — stream the body to a staging file, then
/// hand it to the remote client under the canonical key.
pub async fn upload_artifact(
    State(state): State<ProxyState>,
    Path(hash): Path<String>,
    Query(scope): Query<ArtifactScope>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let key = match require_key(&hash, &scope) {
        Ok(key) => key,
        Err(response) => return response,
    };
    let fail = |context: String| failure(&state, &key, &context, "unable to upload");

    let staged = match NamedTempFile::new() {
        Ok(staged) => staged,
        Err(err) => return fail(format!("error creating a staging file: {err}")),
    };
    let mut file = match tokio::fs::File::create(staged.path()).await {
        Ok(file) => file,
        Err(err) => return fail(format!("error opening the staging file: {err}")),
    };

    let mut size: i64 = 0;
    let mut body = body.into_data_stream();
    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => return fail(format!("error reading the request body: {err}")),
        };
        if let Err(err) = file.write_all(&chunk).await {
            return fail(format!("error saving the uploaded artifact: {err}"));
        }
        size += chunk.len() as i64;
    }
    if let Err(err) = file.flush().await {
        return fail(format!("error flushing the uploaded artifact: {err}"));
    }
    // Close our handle before the client re-opens the path.
    drop(file);

    let metadata = collect_metadata(&headers);
    if let Err(err) = state.client().upload_file(&key, staged.path(), metadata).await {
        return fail(format!("error uploading the artifact: {err}"));
    }

    state.stats().record_upload(size);
    (StatusCode::ACCEPTED, Json(UploadAccepted { urls: Vec::new() })).into_response()
}

/// HEAD /v8/artifacts/{hash} — 200 when the key exists, 404 when not.
pub async fn artifact_exists(
    State(state): State<ProxyState>,
    Path(hash): Path<String>,
    Query(scope): Query<ArtifactScope>,
) -> Response {
    let key = match require_key(&hash, &scope) {
        Ok(key) => key,
        Err(response) => return response,
    };

    match state.client().find_file(&key).await {
        Ok(true) => {
            state.stats().record_exists_hit();
            StatusCode::OK.into_response()
        }
        Ok(false) => {
            state.stats().record_exists_miss();
            StatusCode::NOT_FOUND.into_response()
        }
        Err(err) => failure(
            &state,
            &key,
            &format!("error looking up the artifact: {err}"),
            "Error looking up file",
        ),
    }
}

/// GET /v8/artifacts/{hash} — fetch the blob into a staging file, then
/// serve it with the stored metadata projected into response headers.
pub async fn download_artifact(
    State(state): State<ProxyState>,
    Path(hash): Path<String>,
    Query(scope): Query<ArtifactScope>,
) -> Response {
    let key = match require_key(&hash, &scope) {
        Ok(key) => key,
        Err(response) => return response,
    };
    let fail = |context: String| failure(&state, &key, &context, "unable to download");

    let staged = match NamedTempFile::new() {
        Ok(staged) => staged,
        Err(err) => return fail(format!("error creating a staging file: {err}")),
    };
    let mut file = match tokio::fs::File::create(staged.path()).await {
        Ok(file) => file,
        Err(err) => return fail(format!("error opening the staging file: {err}")),
    };

    let metadata = match state.client().download_file(&key, &mut file).await {
        Ok(metadata) => metadata,
        Err(err) if err.is_not_found() => {
            state.stats().record_download_not_found();
            return (StatusCode::NOT_FOUND, "key not found").into_response();
        }
        Err(err) => return fail(format!("error downloading the artifact: {err}")),
    };
    drop(file);

    let file = match tokio::fs::File::open(staged.path()).await {
        Ok(file) => file,
        Err(err) => return fail(format!("error reopening the staged artifact: {err}")),
    };
    let size = match file.metadata().await {
        Ok(file_metadata) => file_metadata.len() as i64,
        Err(err) => return fail(format!("error sizing the staged artifact: {err}")),
    };

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/octet-stream")
        .header(CONTENT_LENGTH, size)
        .header(LAST_MODIFIED, EPOCH_HTTP_DATE);
    for (name, value) in &metadata {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => response = response.header(name, value),
            _ => tracing::warn!(%key, header = %name, "stored metadata is not a valid header"),
        }
    }

    state.stats().record_download(size);
    // The staging file is unlinked when `staged` drops below, but the
    // open handle keeps the bytes readable while the body streams.
    let body = Body::from_stream(ReaderStream::new(file));
    match response.body(body) {
        Ok(response) => response,
        Err(err) => fail(format!("error assembling the download response: {err}")),
    }
}
