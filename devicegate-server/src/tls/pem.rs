use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::RootCertStore;

use super::CredentialError;

/// Fields of the parsed leaf certificate, kept for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafInfo {
    pub subject: String,
    pub serial: String,
    /// Unix seconds
    pub not_after: i64,
    pub currently_valid: bool,
}

fn open(path: &Path) -> Result<BufReader<File>, CredentialError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| CredentialError::Read {
            path: path.to_path_buf(),
            source,
        })
}

/// Read every certificate from a PEM file. An empty file is an error.
pub fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, CredentialError> {
    let certs = rustls_pemfile::certs(&mut open(path)?)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| CredentialError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    if certs.is_empty() {
        return Err(CredentialError::NoCertificates(path.to_path_buf()));
    }
    Ok(certs)
}

/// Read the first private key (PKCS#1, PKCS#8 or SEC1) from a PEM file.
pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, CredentialError> {
    rustls_pemfile::private_key(&mut open(path)?)
        .map_err(|source| CredentialError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| CredentialError::NoPrivateKey(path.to_path_buf()))
}

/// Load a root bundle into a trust store. Every certificate must be usable
/// as a trust anchor.
pub fn load_root_store(path: &Path) -> Result<RootCertStore, CredentialError> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(path)? {
        roots.add(cert).map_err(|source| CredentialError::Root {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(roots)
}

/// Parse the leaf (first) certificate of a chain.
pub fn parse_leaf(
    path: &Path,
    chain: &[CertificateDer<'_>],
) -> Result<LeafInfo, CredentialError> {
    let leaf = chain
        .first()
        .ok_or_else(|| CredentialError::NoCertificates(path.to_path_buf()))?;

    let (_, cert) = x509_parser::parse_x509_certificate(leaf.as_ref()).map_err(|e| {
        CredentialError::Leaf {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    let validity = cert.validity();
    Ok(LeafInfo {
        subject: cert.subject().to_string(),
        serial: cert.raw_serial_as_string(),
        not_after: validity.not_after.timestamp(),
        currently_valid: validity.is_valid(),
    })
}
