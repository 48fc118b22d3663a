// Shared transport configuration and the request contract.
//
// `TransportConfig` builds the reqwest client used for the lookup service
// and the REST host. `Transport` is the seam `hmip-core` talks through,
// so the state mirror can run against the real cloud or an in-memory fake.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use futures_core::Stream;
use secrecy::SecretString;
use serde_json::Value;

use crate::error::Error;

/// TLS verification mode (api-level mirror of core's TlsVerification).
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Use the system certificate store.
    #[default]
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (test rigs behind an intercepting proxy).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("hmip-mirror/", env!("CARGO_PKG_VERSION")));

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

// ── Request contract ─────────────────────────────────────────────────

/// One remote call: a relative endpoint path plus an optional JSON body.
///
/// `path` is relative to the `/hmip/` root of the REST host, e.g.
/// `home/getCurrentState`.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub path: String,
    pub body: Option<Value>,
    /// Sent as the `PIN` header when the home is PIN-protected.
    pub pin: Option<SecretString>,
}

impl ApiRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            body: None,
            pin: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_pin(mut self, pin: Option<SecretString>) -> Self {
        self.pin = pin;
        self
    }
}

/// The remote collaborator the home mirror is driven by.
///
/// `call` resolves to the decoded JSON response. A rejected call is still
/// `Ok`: the value then carries an `errorCode` field. `Err` is reserved
/// for connectivity failures.
///
/// `open_event_stream` yields raw push messages, one per item, until the
/// connection closes (`None`) or fails (`Some(Err(_))`). It never retries.
pub trait Transport: Send + Sync + 'static {
    type Events: Stream<Item = Result<String, Error>> + Send + Unpin + 'static;

    fn call(&self, request: ApiRequest) -> impl Future<Output = Result<Value, Error>> + Send;

    fn open_event_stream(&self) -> impl Future<Output = Result<Self::Events, Error>> + Send;
}
