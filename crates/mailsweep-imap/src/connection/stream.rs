//! TLS stream and connector for IMAP connections.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustls::crypto::CryptoProvider;
use rustls::pki_types::ServerName;
use rustls::{CipherSuite, ClientConfig, RootCertStore};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use super::{CipherPolicy, Config};
use crate::{Error, Result};

/// Suites allowed by [`CipherPolicy::Hardened`]: forward-secret key exchange
/// and AEAD encryption only.
const HARDENED_SUITES: [CipherSuite; 7] = [
    CipherSuite::TLS13_AES_256_GCM_SHA384,
    CipherSuite::TLS13_AES_128_GCM_SHA256,
    CipherSuite::TLS13_CHACHA20_POLY1305_SHA256,
    CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
    CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
    CipherSuite::TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
    CipherSuite::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
];

/// An implicit-TLS connection to an IMAP server.
pub struct ImapStream {
    inner: Box<TlsStream<TcpStream>>,
}

impl ImapStream {
    /// Wraps an established TLS stream.
    #[must_use]
    pub fn new(stream: TlsStream<TcpStream>) -> Self {
        Self {
            inner: Box::new(stream),
        }
    }
}

impl fmt::Debug for ImapStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ImapStream::Tls")
    }
}

impl AsyncRead for ImapStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for ImapStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

/// Returns the crypto provider for a cipher policy.
fn crypto_provider(policy: CipherPolicy) -> CryptoProvider {
    let base = rustls::crypto::aws_lc_rs::default_provider();
    match policy {
        CipherPolicy::Hardened | CipherPolicy::Tls13 => {
            let cipher_suites = base
                .cipher_suites
                .iter()
                .copied()
                .filter(|suite| HARDENED_SUITES.contains(&suite.suite()))
                .collect();
            CryptoProvider {
                cipher_suites,
                ..base
            }
        }
        CipherPolicy::Default => base,
    }
}

/// Builds the rustls client configuration for a cipher policy.
///
/// # Errors
///
/// Returns an error if the provider supports none of the requested
/// protocol versions.
pub fn client_config(policy: CipherPolicy) -> Result<ClientConfig> {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let builder = ClientConfig::builder_with_provider(Arc::new(crypto_provider(policy)));

    let builder = match policy {
        CipherPolicy::Hardened => {
            builder.with_protocol_versions(&[&rustls::version::TLS13, &rustls::version::TLS12])?
        }
        CipherPolicy::Tls13 => builder.with_protocol_versions(&[&rustls::version::TLS13])?,
        CipherPolicy::Default => builder.with_safe_default_protocol_versions()?,
    };

    Ok(builder
        .with_root_certificates(root_store)
        .with_no_client_auth())
}

/// Creates a TLS connector for a cipher policy, trusting the webpki roots.
///
/// # Errors
///
/// Returns an error if the TLS configuration cannot be built.
pub fn create_tls_connector(policy: CipherPolicy) -> Result<TlsConnector> {
    Ok(TlsConnector::from(Arc::new(client_config(policy)?)))
}

/// Connects to the configured server with TLS from the start.
///
/// TCP connect and TLS handshake together are bounded by
/// [`Config::connect_timeout`].
///
/// # Errors
///
/// Returns an error if the host name is invalid, the connection or handshake
/// fails, or the timeout expires.
pub async fn connect_tls(config: &Config) -> Result<ImapStream> {
    let connector = create_tls_connector(config.cipher_policy)?;
    let server_name = ServerName::try_from(config.host.clone())?;
    let addr = (config.host.as_str(), config.port);

    let handshake = async {
        let tcp = TcpStream::connect(addr).await?;
        let tls = connector.connect(server_name, tcp).await?;
        Ok::<_, Error>(ImapStream::new(tls))
    };

    tokio::time::timeout(config.connect_timeout, handshake)
        .await
        .map_err(|_| Error::Timeout(config.connect_timeout))?
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_hardened_provider_uses_allowlist_only() {
        let provider = crypto_provider(CipherPolicy::Hardened);
        assert!(!provider.cipher_suites.is_empty());
        for suite in &provider.cipher_suites {
            assert!(HARDENED_SUITES.contains(&suite.suite()), "{:?}", suite.suite());
        }
    }

    #[test]
    fn test_default_provider_is_untouched() {
        let provider = crypto_provider(CipherPolicy::Default);
        let base = rustls::crypto::aws_lc_rs::default_provider();
        assert_eq!(provider.cipher_suites.len(), base.cipher_suites.len());
    }

    #[test]
    fn test_create_tls_connector_for_every_policy() {
        for policy in [CipherPolicy::Hardened, CipherPolicy::Tls13, CipherPolicy::Default] {
            assert!(create_tls_connector(policy).is_ok(), "{policy}");
        }
    }

    #[tokio::test]
    async fn test_connect_tls_rejects_invalid_host() {
        let config = Config::new("not a host name");
        let err = connect_tls(&config).await.unwrap_err();
        assert!(matches!(err, Error::InvalidDnsName(_)));
    }
}
