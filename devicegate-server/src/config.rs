//! Server configuration module
//!
//! Configuration comes from command-line flags, each with an environment
//! variable fallback.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Configuration errors detected before the server starts
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("flag --database cannot be empty")]
    EmptyDatabase,

    #[error("flag --cert requires the flag --key")]
    CertWithoutKey,

    #[error("flag --key requires the flag --cert")]
    KeyWithoutCert,

    #[error("flag --root requires the flags --cert and --key")]
    RootWithoutTls,

    #[error("flag --max-connections must be at least 1")]
    NoConnections,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human-readable output
    Pretty,
}

/// Server configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "devicegate-server")]
#[command(version, about = "Device attestation allow-list service", long_about = None)]
pub struct Config {
    /// The TCP address to listen on (e.g. '0.0.0.0:8443')
    #[arg(long, env = "DEVICEGATE_ADDRESS", default_value = "0.0.0.0:3000")]
    pub address: SocketAddr,

    /// The path to the SQLite allow-list database
    #[arg(long, env = "DEVICEGATE_DATABASE", default_value = "db/database.sqlite3")]
    pub database: PathBuf,

    /// The path to the root CA bundle used to verify client certificates
    #[arg(long, env = "DEVICEGATE_ROOT", value_name = "PATH")]
    pub root: Option<PathBuf>,

    /// The path to the server certificate chain (PEM)
    #[arg(long, env = "DEVICEGATE_CERT", value_name = "PATH")]
    pub cert: Option<PathBuf>,

    /// The path to the server certificate key (PEM)
    #[arg(long, env = "DEVICEGATE_KEY", value_name = "PATH")]
    pub key: Option<PathBuf>,

    /// Maximum pooled database connections
    #[arg(long, env = "DEVICEGATE_MAX_CONNECTIONS", default_value_t = 8)]
    pub max_connections: u32,

    /// Request body limit in KiB
    #[arg(long, env = "DEVICEGATE_BODY_LIMIT_KB", default_value_t = 1024)]
    pub body_limit_kb: usize,

    /// Log output format
    #[arg(long, env = "DEVICEGATE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database: PathBuf::from("db/database.sqlite3"),
            root: None,
            cert: None,
            key: None,
            max_connections: 8,
            body_limit_kb: 1024,
            log_format: LogFormat::Json,
        }
    }
}

/// Paths of the files the TLS credentials are loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    pub cert: PathBuf,
    pub key: PathBuf,
    pub root: Option<PathBuf>,
}

impl Config {
    /// Parse flags and environment, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Reject inconsistent combinations of settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDatabase);
        }
        if self.max_connections == 0 {
            return Err(ConfigError::NoConnections);
        }
        match (&self.cert, &self.key) {
            (Some(_), None) => Err(ConfigError::CertWithoutKey),
            (None, Some(_)) => Err(ConfigError::KeyWithoutCert),
            (None, None) if self.root.is_some() => Err(ConfigError::RootWithoutTls),
            _ => Ok(()),
        }
    }

    /// TLS file paths, when both certificate and key are configured.
    pub fn tls_files(&self) -> Option<TlsFiles> {
        match (&self.cert, &self.key) {
            (Some(cert), Some(key)) => Some(TlsFiles {
                cert: cert.clone(),
                key: key.clone(),
                root: self.root.clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.address.port(), 3000);
        assert!(config.validate().is_ok());
        assert!(config.tls_files().is_none());
    }

    #[test]
    fn test_parse_flags() {
        let config = Config::try_parse_from([
            "devicegate-server",
            "--address",
            "127.0.0.1:8443",
            "--database",
            "/var/lib/devicegate/devices.db",
            "--cert",
            "server.crt",
            "--key",
            "server.key",
            "--root",
            "roots.pem",
            "--log-format",
            "pretty",
        ])
        .unwrap();

        assert_eq!(config.address, "127.0.0.1:8443".parse().unwrap());
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.validate().is_ok());

        let tls = config.tls_files().unwrap();
        assert_eq!(tls.cert, PathBuf::from("server.crt"));
        assert_eq!(tls.key, PathBuf::from("server.key"));
        assert_eq!(tls.root, Some(PathBuf::from("roots.pem")));
    }

    #[test]
    fn test_cert_requires_key() {
        let config = Config {
            cert: Some("server.crt".into()),
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::CertWithoutKey));
    }

    #[test]
    fn test_key_requires_cert() {
        let config = Config {
            key: Some("server.key".into()),
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::KeyWithoutCert));
    }

    #[test]
    fn test_root_requires_tls() {
        let config = Config {
            root: Some("roots.pem".into()),
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::RootWithoutTls));
    }

    #[test]
    fn test_empty_database_rejected() {
        let config = Config {
            database: PathBuf::new(),
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyDatabase));
    }
}
