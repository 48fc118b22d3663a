// ── Core error types ──
//
// User-facing errors from hmip-core. Consumers never see HTTP status codes
// or raw serde failures directly. The `From<hmip_api::Error>` impl
// translates transport-layer errors into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the HomematicIP cloud at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Cloud request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Event stream failed: {reason}")]
    EventStream { reason: String },

    // ── Remote rejections ────────────────────────────────────────────
    /// The cloud answered with an `errorCode` document.
    #[error("Cloud rejected the request: {code}")]
    Api { code: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Malformed {what}: {reason}")]
    Malformed { what: &'static str, reason: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn malformed(what: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Malformed {
            what,
            reason: reason.to_string(),
        }
    }

    /// The remote error code, if this is a cloud rejection.
    pub fn api_error_code(&self) -> Option<&str> {
        match self {
            Self::Api { code } => Some(code),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<hmip_api::Error> for CoreError {
    fn from(err: hmip_api::Error) -> Self {
        match err {
            hmip_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                }
            }
            hmip_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid URL: {e}"),
            },
            hmip_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            hmip_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            hmip_api::Error::Lookup { message } => CoreError::ConnectionFailed {
                url: hmip_api::DEFAULT_LOOKUP_URL.into(),
                reason: message,
            },
            hmip_api::Error::WebSocketConnect(reason) => CoreError::EventStream { reason },
            hmip_api::Error::WebSocketClosed { code, reason } => CoreError::EventStream {
                reason: format!("closed with code {code}: {reason}"),
            },
            hmip_api::Error::Deserialization { message, body: _ } => CoreError::Malformed {
                what: "cloud response",
                reason: message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_failures_map_to_event_stream() {
        let err = CoreError::from(hmip_api::Error::WebSocketClosed {
            code: 1006,
            reason: "abnormal".into(),
        });
        assert!(matches!(err, CoreError::EventStream { .. }));
        assert!(err.to_string().contains("1006"));
    }

    #[test]
    fn api_code_is_exposed() {
        let err = CoreError::Api {
            code: "INVALID_AUTHORIZATION".into(),
        };
        assert_eq!(err.api_error_code(), Some("INVALID_AUTHORIZATION"));
        assert_eq!(CoreError::Internal("x".into()).api_error_code(), None);
    }
}
