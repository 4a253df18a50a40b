//! Canonical artifact keys.
//!
//! The Turborepo client addresses artifacts by a hash in the URL path,
//! optionally scoped by `teamId` and `slug` query parameters. The
//! canonical internal form joins them as `[slug/][teamId/]<hash>`.
//!
//! Presence of a query parameter, not non-emptiness, gates its
//! segment: the client omits scopes it does not have, but may send
//! them empty, and an empty segment still namespaces the key.

use serde::Deserialize;

/// Scope query parameters on the `{hash}` endpoints.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ArtifactScope {
    #[serde(rename = "teamId")]
    pub team_id: Option<String>,
    pub slug: Option<String>,
}

/// Join the hash with any present scope segments. Returns `None` for an
/// empty hash, which the routing layer should have made impossible.
pub fn canonical_key(hash: &str, scope: &ArtifactScope) -> Option<String> {
    if hash.is_empty() {
        return None;
    }
    let mut parts: Vec<&str> = vec![hash];
    if let Some(team_id) = &scope.team_id {
        parts.insert(0, team_id);
    }
    if let Some(slug) = &scope.slug {
        parts.insert(0, slug);
    }
    Some(parts.join("/"))
}
