// ── Runtime connection configuration ──
//
// These types describe *how* to reach one access point through the cloud.
// They carry the token pair and connection tuning, but never touch disk.
// `hmip-config` (or any embedding application) builds a `HomeConfig` and
// hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use hmip_api::{ClientCharacteristics, Credentials, DEFAULT_LOOKUP_URL, TlsMode, TransportConfig};

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification. Only useful behind an intercepting proxy.
    DangerAcceptInvalid,
}

/// Configuration for mirroring a single home.
#[derive(Debug, Clone)]
pub struct HomeConfig {
    /// Access point SGTIN, normalized to upper case without dashes.
    pub access_point_id: String,
    pub auth_token: SecretString,
    pub client_auth_token: SecretString,
    /// Where to ask for the REST / WebSocket hosts.
    pub lookup_url: String,
    /// Skip the lookup when both hosts are already known.
    pub rest_url: Option<Url>,
    pub websocket_url: Option<Url>,
    pub tls: TlsVerification,
    /// Request timeout, also bounds the WebSocket handshake.
    pub timeout: Duration,
    pub characteristics: ClientCharacteristics,
    /// Open the push-event stream as part of [`Home::connect`](crate::Home::connect).
    pub events_enabled: bool,
}

impl HomeConfig {
    pub fn new(
        access_point_id: &str,
        auth_token: SecretString,
        client_auth_token: SecretString,
    ) -> Self {
        Self {
            access_point_id: normalize_access_point_id(access_point_id),
            auth_token,
            client_auth_token,
            lookup_url: DEFAULT_LOOKUP_URL.to_owned(),
            rest_url: None,
            websocket_url: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            characteristics: ClientCharacteristics::default(),
            events_enabled: true,
        }
    }

    pub(crate) fn credentials(&self) -> Credentials {
        Credentials {
            auth_token: self.auth_token.clone(),
            client_auth_token: self.client_auth_token.clone(),
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        }
    }
}

/// `3014-F711-A000` and `3014f711a000` name the same access point.
pub fn normalize_access_point_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}
