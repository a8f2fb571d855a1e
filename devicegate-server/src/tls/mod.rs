//! TLS credential provisioning
//!
//! Certificates are never cached: every handshake reloads the certificate
//! chain, private key and (optionally) the client root bundle from disk, so
//! files replaced on disk are served from the next new connection on.
//!
//! - [`pem`]: PEM file loading and leaf certificate parsing
//! - [`credentials`]: the per-handshake [`CredentialProvider`]
//! - [`acceptor`]: the lazy TLS accept that consults the provider after
//!   reading the ClientHello

mod acceptor;
mod credentials;
mod pem;

pub use acceptor::{accept, HandshakeError};
pub use credentials::{CredentialProvider, HelloInfo, ServerCredential};
pub use pem::{load_certs, load_private_key, load_root_store, parse_leaf, LeafInfo};

use std::path::PathBuf;

/// Failures producing server credentials. Each one aborts the handshake.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("error reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no certificates found in {0}")]
    NoCertificates(PathBuf),

    #[error("no private key found in {0}")]
    NoPrivateKey(PathBuf),

    #[error("error parsing certificate {path}: {reason}")]
    Leaf { path: PathBuf, reason: String },

    #[error("invalid root certificate in {path}: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: rustls::Error,
    },

    #[error("error building client verifier: {0}")]
    Verifier(#[from] rustls::server::VerifierBuilderError),

    #[error("error building TLS configuration: {0}")]
    Config(#[from] rustls::Error),
}
