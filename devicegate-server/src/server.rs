//! Listener
//!
//! Accepts TCP connections, optionally completes a TLS handshake with
//! per-connection credentials, and serves the router over HTTP/1.1 or HTTP/2
//! with one task per connection. On shutdown the accept loop stops, open
//! connections are asked to finish their in-flight requests, and the drain is
//! bounded by [`DRAIN_TIMEOUT`].

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::Request, Router};
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tower::Service;

use crate::tls::{self, CredentialProvider};

/// Upper bound on waiting for open connections after a shutdown signal.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(15);

/// A client that has not finished the TLS handshake by then is dropped.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause after an accept error that is not tied to a single connection,
/// such as running out of file descriptors.
pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Serve `app` on `listener` until `shutdown` resolves, then drain.
///
/// With a credential provider every connection is TLS; otherwise plain HTTP.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    credentials: Option<Arc<CredentialProvider>>,
    shutdown: F,
) -> io::Result<()>
where
    F: Future<Output = ()> + Send,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut connections = JoinSet::new();

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                        if let Some(pause) = accept_backoff(&e) {
                            tokio::time::sleep(pause).await;
                        }
                        continue;
                    }
                };
                connections.spawn(handle_connection(
                    stream,
                    peer,
                    app.clone(),
                    credentials.clone(),
                    shutdown_rx.clone(),
                ));
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            _ = &mut shutdown => break,
        }
    }

    drop(listener);
    let open = connections.len();
    tracing::info!(open_connections = open, "Shutting down, draining connections");
    let _ = shutdown_tx.send(true);

    let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
        while connections.join_next().await.is_some() {}
    })
    .await;

    match drained {
        Ok(()) => tracing::info!("All connections drained"),
        Err(_) => {
            tracing::warn!(
                remaining = connections.len(),
                "Drain timeout elapsed, closing remaining connections"
            );
            connections.shutdown().await;
        }
    }

    Ok(())
}

/// Errors from a peer that reset before being accepted are retried at once;
/// anything else backs off so the loop does not spin.
fn accept_backoff(e: &io::Error) -> Option<Duration> {
    match e.kind() {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset => None,
        _ => Some(ACCEPT_ERROR_BACKOFF),
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    app: Router,
    credentials: Option<Arc<CredentialProvider>>,
    shutdown: watch::Receiver<bool>,
) {
    let Some(provider) = credentials else {
        serve_connection(stream, peer, app, shutdown).await;
        return;
    };

    match tokio::time::timeout(HANDSHAKE_TIMEOUT, tls::accept(provider, stream)).await {
        Ok(Ok(tls_stream)) => serve_connection(tls_stream, peer, app, shutdown).await,
        Ok(Err(e)) => tracing::warn!(peer = %peer, error = %e, "TLS handshake failed"),
        Err(_) => tracing::warn!(peer = %peer, "TLS handshake timed out"),
    }
}

async fn serve_connection<IO>(
    io: IO,
    peer: SocketAddr,
    app: Router,
    mut shutdown: watch::Receiver<bool>,
) where
    IO: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let service = hyper::service::service_fn(move |request: Request<Incoming>| {
        app.clone().call(request)
    });

    let builder = auto::Builder::new(TokioExecutor::new());
    let conn = builder.serve_connection_with_upgrades(TokioIo::new(io), service);
    tokio::pin!(conn);

    let mut closing = *shutdown.borrow();
    if closing {
        conn.as_mut().graceful_shutdown();
    }

    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(peer = %peer, error = %e, "Connection closed with error");
                }
                break;
            }
            changed = shutdown.changed(), if !closing => {
                closing = true;
                if changed.is_ok() {
                    conn.as_mut().graceful_shutdown();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_backoff_on_resource_errors() {
        // EMFILE surfaces as an uncategorized OS error
        let emfile = io::Error::from_raw_os_error(24);
        assert_eq!(accept_backoff(&emfile), Some(ACCEPT_ERROR_BACKOFF));

        let other = io::Error::new(io::ErrorKind::Other, "too many open files");
        assert_eq!(accept_backoff(&other), Some(ACCEPT_ERROR_BACKOFF));
    }

    #[test]
    fn test_accept_retries_peer_errors_immediately() {
        for kind in [
            io::ErrorKind::ConnectionRefused,
            io::ErrorKind::ConnectionAborted,
            io::ErrorKind::ConnectionReset,
        ] {
            assert_eq!(accept_backoff(&io::Error::from(kind)), None, "{:?}", kind);
        }
    }
}
