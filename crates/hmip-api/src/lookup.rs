// ── Host lookup ──
//
// Before any REST call the client asks the lookup service which REST and
// WebSocket hosts serve its access point. The same client characteristics
// document is later sent with `home/getCurrentState`.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::error::Error;

pub const DEFAULT_LOOKUP_URL: &str = "https://lookup.homematic.com:48335/getHost";

const API_VERSION: &str = "10";

/// Describes the connecting application to the cloud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCharacteristics {
    pub api_version: String,
    pub application_identifier: String,
    pub application_version: String,
    pub device_manufacturer: String,
    pub device_type: String,
    pub language: String,
    pub os_type: String,
    pub os_version: String,
}

impl ClientCharacteristics {
    pub fn new(
        application_identifier: impl Into<String>,
        application_version: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            api_version: API_VERSION.to_owned(),
            application_identifier: application_identifier.into(),
            application_version: application_version.into(),
            device_manufacturer: "none".to_owned(),
            device_type: "Computer".to_owned(),
            language: language.into(),
            os_type: std::env::consts::OS.to_owned(),
            os_version: std::env::consts::ARCH.to_owned(),
        }
    }

    /// The `{clientCharacteristics, id}` document both the lookup service
    /// and `home/getCurrentState` expect.
    pub fn request_body(&self, access_point_id: &str) -> Value {
        json!({
            "clientCharacteristics": self,
            "id": access_point_id,
        })
    }
}

impl Default for ClientCharacteristics {
    fn default() -> Self {
        Self::new("hmip-mirror", env!("CARGO_PKG_VERSION"), "en_US")
    }
}

/// The hosts the lookup service assigned to an access point.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostUrls {
    #[serde(rename = "urlREST")]
    pub rest: Url,
    #[serde(rename = "urlWebSocket")]
    pub websocket: Url,
}

impl HostUrls {
    /// Ask the lookup service for the hosts serving `access_point_id`.
    pub async fn lookup(
        http: &reqwest::Client,
        lookup_url: &Url,
        access_point_id: &str,
        characteristics: &ClientCharacteristics,
    ) -> Result<Self, Error> {
        debug!(url = %lookup_url, "looking up REST and WebSocket hosts");

        let resp = http
            .post(lookup_url.clone())
            .json(&characteristics.request_body(access_point_id))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(Error::Lookup {
                message: format!("HTTP {}: {body}", status.as_u16()),
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::Lookup {
            message: format!("unexpected lookup response ({e}): {body}"),
        })
    }
}
