use thiserror::Error;

/// Top-level error type for the `hmip-api` crate.
///
/// Only connectivity-level failures live here. A cloud that answers with
/// an `errorCode` payload is not an error at this layer; that body is
/// handed back to the caller as a value. `hmip-core` maps these into
/// user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Host lookup ─────────────────────────────────────────────────
    /// The lookup service did not hand out usable REST / WebSocket hosts.
    #[error("Host lookup failed: {message}")]
    Lookup { message: String },

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed unexpectedly.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::WebSocketConnect(_) | Self::WebSocketClosed { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the failure happened on the push-event socket.
    pub fn is_websocket(&self) -> bool {
        matches!(
            self,
            Self::WebSocketConnect(_) | Self::WebSocketClosed { .. }
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_and_socket_drops_are_transient() {
        assert!(Error::Timeout { timeout_secs: 5 }.is_transient());
        assert!(Error::WebSocketConnect("refused".into()).is_transient());
        assert!(
            !Error::Lookup {
                message: "no urlREST".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn display_includes_close_code() {
        let err = Error::WebSocketClosed {
            code: 1008,
            reason: "policy".into(),
        };
        assert_eq!(err.to_string(), "WebSocket closed (code 1008): policy");
        assert!(err.is_websocket());
    }
}
