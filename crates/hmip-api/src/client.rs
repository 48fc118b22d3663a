// REST client for the HomematicIP cloud
//
// Every call is `POST {urlREST}/hmip/{path}` carrying the auth headers and
// an optional JSON body. Remote rejections come back as `{"errorCode": ..}`
// values rather than errors so callers can decide what a rejection means.

use std::time::Duration;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::lookup::{ClientCharacteristics, HostUrls};
use crate::transport::{ApiRequest, Transport, TransportConfig};
use crate::websocket::EventStream;

const CLIENT_VERSION: &str = "12";

/// The token pair issued when a client is registered with an access point.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub auth_token: SecretString,
    pub client_auth_token: SecretString,
}

/// HTTP client bound to the REST and WebSocket hosts of one access point.
pub struct HmipClient {
    http: reqwest::Client,
    hosts: HostUrls,
    credentials: Credentials,
    timeout: Duration,
}

impl HmipClient {
    /// Create a client for hosts that are already known.
    pub fn new(
        hosts: HostUrls,
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, hosts, credentials, transport.timeout))
    }

    /// Resolve the hosts through the lookup service, then create a client.
    pub async fn discover(
        lookup_url: &Url,
        access_point_id: &str,
        characteristics: &ClientCharacteristics,
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let hosts = HostUrls::lookup(&http, lookup_url, access_point_id, characteristics).await?;
        debug!(rest = %hosts.rest, websocket = %hosts.websocket, "hosts assigned");
        Ok(Self::with_client(http, hosts, credentials, transport.timeout))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        hosts: HostUrls,
        credentials: Credentials,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            hosts,
            credentials,
            timeout,
        }
    }

    pub fn hosts(&self) -> &HostUrls {
        &self.hosts
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{urlREST}/hmip/{path}`
    pub(crate) fn endpoint_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.hosts.rest.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/hmip/{}", path.trim_start_matches('/')))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// POST one request and decode the answer.
    pub async fn post(&self, request: &ApiRequest) -> Result<Value, Error> {
        let url = self.endpoint_url(&request.path)?;
        debug!("POST {}", url);

        let mut builder = self
            .http
            .post(url)
            .header("AUTHTOKEN", self.credentials.auth_token.expose_secret())
            .header("CLIENTAUTH", self.credentials.client_auth_token.expose_secret())
            .header("VERSION", CLIENT_VERSION);

        if let Some(ref pin) = request.pin {
            builder = builder.header("PIN", pin.expose_secret());
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(|e| self.map_send_error(e))?;
        decode_response(&request.path, resp).await
    }

    fn map_send_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }
}

/// Turn an HTTP response into the value the caller sees.
///
/// 200 with a body decodes the body, 200 without one yields `null`. Any
/// other status becomes an `errorCode` document: the body's own code when
/// it carries one, `INVALID_AUTHORIZATION` for 403, `HTTP_<status>` otherwise.
async fn decode_response(path: &str, resp: reqwest::Response) -> Result<Value, Error> {
    let status = resp.status();
    let body = resp.text().await?;

    if status.is_success() {
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        return serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        });
    }

    let remote: Option<Value> = serde_json::from_str(&body).ok();
    if let Some(code) = remote
        .as_ref()
        .and_then(|v| v.get("errorCode"))
        .filter(|c| !c.is_null())
    {
        warn!(path, status = status.as_u16(), error_code = %code, "call rejected");
        return Ok(json!({ "errorCode": code }));
    }

    let code = if status == StatusCode::FORBIDDEN {
        "INVALID_AUTHORIZATION".to_owned()
    } else {
        format!("HTTP_{}", status.as_u16())
    };
    warn!(path, status = status.as_u16(), error_code = %code, "call rejected");
    Ok(json!({ "errorCode": code }))
}

impl Transport for HmipClient {
    type Events = EventStream;

    async fn call(&self, request: ApiRequest) -> Result<Value, Error> {
        self.post(&request).await
    }

    async fn open_event_stream(&self) -> Result<EventStream, Error> {
        EventStream::connect(&self.hosts.websocket, &self.credentials, self.timeout).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(rest: &str) -> HmipClient {
        HmipClient::with_client(
            reqwest::Client::new(),
            HostUrls {
                rest: Url::parse(rest).unwrap(),
                websocket: Url::parse("wss://ws.example.com:8888").unwrap(),
            },
            Credentials {
                auth_token: SecretString::from("auth"),
                client_auth_token: SecretString::from("client"),
            },
            Duration::from_secs(5),
        )
    }

    #[test]
    fn endpoint_url_joins_hmip_root() {
        let c = client("https://rest.example.com:6969");
        let url = c.endpoint_url("home/getCurrentState").unwrap();
        assert_eq!(
            url.as_str(),
            "https://rest.example.com:6969/hmip/home/getCurrentState"
        );
    }

    #[test]
    fn endpoint_url_tolerates_slashes() {
        let c = client("https://rest.example.com/");
        let url = c.endpoint_url("/home/setPin").unwrap();
        assert_eq!(url.as_str(), "https://rest.example.com/hmip/home/setPin");
    }
}
