// ── Runtime connection configuration ──
//
// These types describe *how* to reach a status server. They never touch
// disk: the TUI (via bayview-config) builds a `ControllerConfig` and hands
// it in.

use std::path::PathBuf;
use std::time::Duration;

use bayview_api::websocket::{DEFAULT_SOCKET_PATH, ReconnectConfig};
use url::Url;

/// Status server the dashboard talks to when nothing else is configured.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:12000";

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed certs). Applies to REST only.
    DangerAcceptInvalid,
}

/// Configuration for one status server.
///
/// Built by the TUI, passed to `Controller`; core never reads config files.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Base URL of the status server (e.g., `http://10.0.0.5:12000`).
    pub url: Url,
    /// Socket.IO mount path on that server.
    pub socket_path: String,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// REST request timeout.
    pub timeout: Duration,
    /// Subscribe to the `network-status` push channel after the first fetch.
    pub websocket_enabled: bool,
    /// Backoff for push-channel reconnects.
    pub reconnect: ReconnectConfig,
}

impl ControllerConfig {
    /// Defaults for everything but the server URL.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            socket_path: DEFAULT_SOCKET_PATH.to_owned(),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            websocket_enabled: true,
            reconnect: ReconnectConfig::default(),
        }
    }
}
