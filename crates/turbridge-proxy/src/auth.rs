//! Bearer-token gate for the artifact API.

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use crate::ProxyState;

/// Reject artifact requests whose `Authorization` header is not exactly
/// `Bearer <token>`. When no token is configured the gate is inactive
/// and every request passes.
pub async fn bearer_gate(
    State(state): State<ProxyState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(token) = state.token() else {
        return next.run(request).await;
    };
    let expected = format!("Bearer {token}");

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|provided| constant_time_eq(provided, &expected));

    if authorized {
        next.run(request).await
    } else {
        tracing::error!("artifact request rejected: bad or missing bearer token");
        (StatusCode::FORBIDDEN, "Forbidden").into_response()
    }
}

/// Constant-time header comparison. A length mismatch performs a dummy
/// comparison so timing does not leak how close the length was.
fn constant_time_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_strings_compare_equal() {
        assert!(constant_time_eq("Bearer t0k3n", "Bearer t0k3n"));
    }

    #[test]
    fn different_strings_compare_unequal() {
        assert!(!constant_time_eq("Bearer t0k3n", "Bearer other"));
        assert!(!constant_time_eq("Bearer t0k3", "Bearer t0k3n"));
        assert!(!constant_time_eq("", "Bearer t0k3n"));
    }
}
