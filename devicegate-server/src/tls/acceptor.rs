use std::io;
use std::sync::Arc;

use rustls::server::Acceptor;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::server::TlsStream;
use tokio_rustls::LazyConfigAcceptor;

use super::credentials::{CredentialProvider, HelloInfo};
use super::CredentialError;

/// Why a TLS handshake did not complete
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error("TLS handshake I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// Complete a server-side TLS handshake on `io`.
///
/// The ClientHello is read first; the provider is then asked for a fresh
/// configuration on the blocking pool, and the handshake continues with it.
pub async fn accept<IO>(
    provider: Arc<CredentialProvider>,
    io: IO,
) -> Result<TlsStream<IO>, HandshakeError>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    let start = LazyConfigAcceptor::new(Acceptor::default(), io).await?;
    let hello = HelloInfo::from(&start.client_hello());

    let config = tokio::task::spawn_blocking(move || provider.config_for_client(&hello))
        .await
        .map_err(io::Error::other)??;

    Ok(start.into_stream(config).await?)
}
