//! Channel construction for the remote cache endpoint.

use tonic::transport::{Channel, ClientTlsConfig, Endpoint, Identity};

use crate::error::RemoteCacheError;

/// Client TLS identity as PEM blobs. Constructing one requires both
/// halves, so a half-configured identity is unrepresentable here;
/// pairing of the two command-line flags is validated at the CLI.
#[derive(Clone)]
pub struct TlsIdentityPem {
    pub cert: Vec<u8>,
    pub key: Vec<u8>,
}

impl std::fmt::Debug for TlsIdentityPem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsIdentityPem")
            .field("cert", &format_args!("{} bytes", self.cert.len()))
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Initial HTTP/2 window size for both streams and the connection.
/// Some gRPC server stacks mis-handle flow-control updates on large
/// streamed reads and surface a spurious internal EOF; an 8 MiB window
/// on both levels sidesteps that.
const INITIAL_WINDOW_SIZE: u32 = 8 * 1024 * 1024;

/// Build a lazily-connecting channel to `host`. Without a TLS identity
/// the connection is plaintext; with one, the channel speaks TLS and
/// presents the client certificate. A scheme in `host` is respected,
/// otherwise one is chosen to match the TLS mode.
pub fn connect(host: &str, tls: Option<TlsIdentityPem>) -> Result<Channel, RemoteCacheError> {
    let uri = if host.contains("://") {
        host.to_string()
    } else if tls.is_some() {
        format!("https://{host}")
    } else {
        format!("http://{host}")
    };

    let mut endpoint = Endpoint::from_shared(uri)?
        .initial_stream_window_size(INITIAL_WINDOW_SIZE)
        .initial_connection_window_size(INITIAL_WINDOW_SIZE);

    if let Some(identity) = tls {
        endpoint = endpoint.tls_config(
            ClientTlsConfig::new().identity(Identity::from_pem(identity.cert, identity.key)),
        )?;
    }

    // Lazy connect: errors surface on the first RPC, which the startup
    // capability probe performs under its own timeout.
    Ok(endpoint.connect_lazy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plain_host_gets_a_scheme() {
        assert!(connect("cache.internal:9092", None).is_ok());
    }

    #[tokio::test]
    async fn explicit_scheme_is_accepted() {
        assert!(connect("http://cache.internal:9092", None).is_ok());
    }

    #[test]
    fn garbage_host_is_rejected() {
        assert!(connect("not a uri", None).is_err());
    }

    #[test]
    fn debug_redacts_the_private_key() {
        let identity = TlsIdentityPem {
            cert: b"CERT".to_vec(),
            key: b"KEY".to_vec(),
        };
        let rendered = format!("{identity:?}");
        assert!(!rendered.contains("KEY"));
        assert!(rendered.contains("REDACTED"));
    }
}
