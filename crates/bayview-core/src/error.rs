// ── Core error types ──
//
// User-facing errors from bayview-core. Consumers never match on HTTP
// status codes or frame parse failures directly; the
// `From<bayview_api::Error>` impl folds transport errors into these.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach status server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Status server disconnected")]
    Disconnected,

    #[error("Status server timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Push channel error: {message}")]
    PushChannel { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("Status server error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Unreadable machine list: {message}")]
    InvalidPayload { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Whether retrying later might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. }
            | Self::Disconnected
            | Self::Timeout { .. }
            | Self::PushChannel { .. } => true,
            Self::Api { status, .. } => status.is_some_and(|s| s >= 500),
            Self::InvalidPayload { .. } | Self::Config { .. } => false,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<bayview_api::Error> for CoreError {
    fn from(err: bayview_api::Error) -> Self {
        use bayview_api::Error as Api;

        match err {
            Api::Transport(ref e) => {
                if e.is_timeout() {
                    Self::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    Self::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    Self::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            Api::InvalidUrl(e) => Self::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::UnsupportedScheme(scheme) => Self::Config {
                message: format!("Unsupported URL scheme: {scheme}"),
            },
            Api::Timeout { timeout_secs } => Self::Timeout { timeout_secs },
            Api::Tls(msg) => Self::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            Api::Http { status, body } => Self::Api {
                message: if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    body
                },
                status: Some(status),
            },
            Api::WebSocketConnect(reason) => Self::PushChannel {
                message: format!("connection failed: {reason}"),
            },
            Api::WebSocketClosed { code, reason } => Self::PushChannel {
                message: format!("closed (code {code}): {reason}"),
            },
            Api::Protocol(message) => Self::PushChannel { message },
            Api::Deserialization { message, body: _ } => Self::InvalidPayload { message },
        }
    }
}
