use std::sync::Arc;

use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::{ClientHello, WebPkiClientVerifier};
use rustls::{RootCertStore, ServerConfig};

use super::pem::{load_certs, load_private_key, load_root_store, parse_leaf, LeafInfo};
use super::CredentialError;
use crate::config::TlsFiles;

/// ALPN protocols offered to clients
const ALPN_PROTOCOLS: [&[u8]; 2] = [b"h2", b"http/1.1"];

/// The parts of a ClientHello the provider is given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelloInfo {
    /// SNI host name, if the client sent one
    pub server_name: Option<String>,
}

impl From<&ClientHello<'_>> for HelloInfo {
    fn from(hello: &ClientHello<'_>) -> Self {
        Self {
            server_name: hello.server_name().map(str::to_owned),
        }
    }
}

/// A freshly loaded certificate chain and key, plus the client roots when
/// mutual TLS is configured.
pub struct ServerCredential {
    pub cert_chain: Vec<CertificateDer<'static>>,
    pub key: PrivateKeyDer<'static>,
    pub leaf: LeafInfo,
    pub client_roots: Option<RootCertStore>,
}

impl ServerCredential {
    /// Whether connections must present a verified client certificate.
    pub fn requires_client_auth(&self) -> bool {
        self.client_roots.is_some()
    }

    /// Build a per-connection server configuration: TLS 1.2 or 1.3, and
    /// client certificates required when roots are present.
    pub fn into_server_config(
        self,
        crypto: Arc<CryptoProvider>,
    ) -> Result<Arc<ServerConfig>, CredentialError> {
        let builder = ServerConfig::builder_with_provider(crypto.clone())
            .with_protocol_versions(&[&rustls::version::TLS13, &rustls::version::TLS12])?;

        let builder = match self.client_roots {
            Some(roots) => {
                let verifier =
                    WebPkiClientVerifier::builder_with_provider(Arc::new(roots), crypto).build()?;
                builder.with_client_cert_verifier(verifier)
            }
            None => builder.with_no_client_auth(),
        };

        let mut config = builder.with_single_cert(self.cert_chain, self.key)?;
        config.alpn_protocols = ALPN_PROTOCOLS.iter().map(|p| p.to_vec()).collect();

        Ok(Arc::new(config))
    }
}

/// Supplies server credentials for every new TLS handshake.
///
/// Holds only file paths. Each call re-reads the files, so it is stateless
/// and may run concurrently for simultaneous handshakes. The reads are
/// blocking and should run off the async workers.
#[derive(Debug, Clone)]
pub struct CredentialProvider {
    files: TlsFiles,
    crypto: Arc<CryptoProvider>,
}

impl CredentialProvider {
    pub fn new(files: TlsFiles) -> Self {
        Self {
            files,
            crypto: Arc::new(rustls::crypto::ring::default_provider()),
        }
    }

    /// Create a provider and check that the current files produce a usable
    /// configuration, so a broken setup fails at startup rather than on the
    /// first connection.
    pub fn from_files(files: TlsFiles) -> Result<Self, CredentialError> {
        let provider = Self::new(files);
        let credential = provider.load()?;

        tracing::info!(
            cert = %provider.files.cert.display(),
            subject = %credential.leaf.subject,
            not_after = credential.leaf.not_after,
            mutual_tls = credential.requires_client_auth(),
            "TLS credentials loaded"
        );

        credential.into_server_config(provider.crypto.clone())?;
        Ok(provider)
    }

    /// Read the certificate chain, key and optional root bundle from disk.
    pub fn load(&self) -> Result<ServerCredential, CredentialError> {
        let cert_chain = load_certs(&self.files.cert)?;
        let key = load_private_key(&self.files.key)?;
        let leaf = parse_leaf(&self.files.cert, &cert_chain)?;

        if !leaf.currently_valid {
            tracing::warn!(
                cert = %self.files.cert.display(),
                subject = %leaf.subject,
                not_after = leaf.not_after,
                "Server certificate is outside its validity period"
            );
        }

        let client_roots = self
            .files
            .root
            .as_deref()
            .map(load_root_store)
            .transpose()?;

        Ok(ServerCredential {
            cert_chain,
            key,
            leaf,
            client_roots,
        })
    }

    /// Produce the configuration for one handshake.
    pub fn config_for_client(&self, hello: &HelloInfo) -> Result<Arc<ServerConfig>, CredentialError> {
        let credential = self.load()?;
        tracing::debug!(
            server_name = hello.server_name.as_deref().unwrap_or(""),
            serial = %credential.leaf.serial,
            "Serving certificate"
        );
        credential.into_server_config(self.crypto.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use rcgen::{generate_simple_self_signed, CertifiedKey};

    fn write_self_signed(dir: &Path, name: &str) -> (PathBuf, PathBuf, Vec<u8>) {
        let CertifiedKey { cert, key_pair } =
            generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let cert_path = dir.join(format!("{name}.crt"));
        let key_path = dir.join(format!("{name}.key"));
        std::fs::write(&cert_path, cert.pem()).unwrap();
        std::fs::write(&key_path, key_pair.serialize_pem()).unwrap();
        (cert_path, key_path, cert.der().to_vec())
    }

    #[test]
    fn test_load_without_roots() {
        let dir = tempfile::tempdir().unwrap();
        let (cert, key, der) = write_self_signed(dir.path(), "server");

        let provider = CredentialProvider::from_files(TlsFiles {
            cert,
            key,
            root: None,
        })
        .unwrap();

        let credential = provider.load().unwrap();
        assert_eq!(credential.cert_chain[0].as_ref(), der.as_slice());
        assert!(!credential.requires_client_auth());
        assert!(credential.leaf.currently_valid);

        let config = provider.config_for_client(&HelloInfo::default()).unwrap();
        assert_eq!(config.alpn_protocols, vec![b"h2".to_vec(), b"http/1.1".to_vec()]);
    }

    #[test]
    fn test_load_with_roots() {
        let dir = tempfile::tempdir().unwrap();
        let (cert, key, _) = write_self_signed(dir.path(), "server");
        let (root, _, _) = write_self_signed(dir.path(), "client-ca");

        let provider = CredentialProvider::from_files(TlsFiles {
            cert,
            key,
            root: Some(root),
        })
        .unwrap();

        let credential = provider.load().unwrap();
        assert!(credential.requires_client_auth());
        assert_eq!(credential.client_roots.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_files_are_reloaded_every_time() {
        let dir = tempfile::tempdir().unwrap();
        let (cert, key, first) = write_self_signed(dir.path(), "server");
        let provider = CredentialProvider::new(TlsFiles {
            cert: cert.clone(),
            key: key.clone(),
            root: None,
        });
        assert_eq!(provider.load().unwrap().cert_chain[0].as_ref(), first.as_slice());

        let (new_cert, new_key, second) = write_self_signed(dir.path(), "rotated");
        std::fs::rename(new_cert, &cert).unwrap();
        std::fs::rename(new_key, &key).unwrap();

        assert_ne!(first, second);
        assert_eq!(provider.load().unwrap().cert_chain[0].as_ref(), second.as_slice());
    }

    #[test]
    fn test_missing_files_fail() {
        let dir = tempfile::tempdir().unwrap();
        let (cert, key, _) = write_self_signed(dir.path(), "server");

        let missing_key = CredentialProvider::from_files(TlsFiles {
            cert: cert.clone(),
            key: dir.path().join("absent.key"),
            root: None,
        });
        assert!(matches!(missing_key, Err(CredentialError::Read { .. })));

        let missing_root = CredentialProvider::new(TlsFiles {
            cert,
            key,
            root: Some(dir.path().join("absent-roots.pem")),
        });
        assert!(matches!(
            missing_root.config_for_client(&HelloInfo::default()),
            Err(CredentialError::Read { .. })
        ));
    }

    #[test]
    fn test_empty_and_garbage_files_fail() {
        let dir = tempfile::tempdir().unwrap();
        let (cert, key, _) = write_self_signed(dir.path(), "server");
        let empty = dir.path().join("empty.pem");
        std::fs::write(&empty, "").unwrap();

        let no_cert = CredentialProvider::new(TlsFiles {
            cert: empty.clone(),
            key: key.clone(),
            root: None,
        });
        assert!(matches!(no_cert.load(), Err(CredentialError::NoCertificates(_))));

        let no_key = CredentialProvider::new(TlsFiles {
            cert: cert.clone(),
            key: empty.clone(),
            root: None,
        });
        assert!(matches!(no_key.load(), Err(CredentialError::NoPrivateKey(_))));

        let no_roots = CredentialProvider::new(TlsFiles {
            cert,
            key,
            root: Some(empty),
        });
        assert!(matches!(no_roots.load(), Err(CredentialError::NoCertificates(_))));
    }

    #[test]
    fn test_mismatched_key_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (cert, _, _) = write_self_signed(dir.path(), "server");
        let (_, other_key, _) = write_self_signed(dir.path(), "other");

        let result = CredentialProvider::from_files(TlsFiles {
            cert,
            key: other_key,
            root: None,
        });
        assert!(matches!(result, Err(CredentialError::Config(_))));
    }
}
