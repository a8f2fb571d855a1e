//! Devicegate Server Library - device attestation allow-list service
//!
//! Answers `POST /devices` with whether an attested device is on the
//! allow-list, over TLS with per-handshake credential reloading.
//!
//! This library exposes the server components for use in integration tests.
//! The main binary uses these same components.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod policy;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;
pub mod tls;

pub use config::{Config, ConfigError, LogFormat, TlsFiles};
pub use db::{DeviceRecord, DeviceStore, MemoryDeviceStore, SqliteDeviceStore, StoreError};
pub use error::ApiError;
pub use policy::{decide, Decision, DecisionSource};
pub use routes::{create_router, create_router_with_config, DEVICES_PATH};
pub use server::serve;
pub use state::AppState;
pub use tls::{CredentialError, CredentialProvider, HelloInfo, ServerCredential};
