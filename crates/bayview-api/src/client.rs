// Machine snapshot HTTP client
//
// Wraps `reqwest::Client` with URL construction against the status server
// root and unwrapping of the `{ data: { machines } }` envelope.

use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{MachineRecord, MachinesEnvelope};
use crate::transport::TransportConfig;

/// HTTP client for the status server's REST snapshot endpoint.
#[derive(Clone)]
pub struct MachinesClient {
    http: reqwest::Client,
    base_url: Url,
}

impl MachinesClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the status server root (e.g. `http://localhost:12000`);
    /// a path prefix is kept when the server lives behind a reverse proxy.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The status server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/api/{path}`, tolerating a trailing slash on the base.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let full = format!(
            "{}/api/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(Url::parse(&full)?)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Fetch the full machine snapshot: `GET /api/machines`.
    ///
    /// A body without `data.machines` yields an empty list.
    pub async fn list_machines(&self) -> Result<Vec<MachineRecord>, Error> {
        let url = self.api_url("machines")?;
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: MachinesEnvelope =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?;

        let machines = envelope.into_machines();
        debug!(count = machines.len(), "machine snapshot received");
        Ok(machines)
    }
}
