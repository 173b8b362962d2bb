// ── Controller abstraction ──
//
// Owns one status-server connection: the REST snapshot fetch, the
// `network-status` push channel, and the MachineStore both feed. Created
// and torn down explicitly by whoever displays the data.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use bayview_api::transport::{TlsMode, TransportConfig};
use bayview_api::websocket::{PushEvent, StatusStream, socket_url};
use bayview_api::MachinesClient;

use crate::config::{ControllerConfig, TlsVerification};
use crate::convert::machines_from_records;
use crate::error::CoreError;
use crate::store::{MachineStore, Snapshot};
use crate::stream::MachineStream;

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Failed,
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Nothing happens until
/// [`connect()`](Self::connect); [`disconnect()`](Self::disconnect) stops
/// every background task and can be followed by another `connect()`.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    store: Arc<MachineStore>,
    connection_state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
    /// Child of `cancel` for the current session; replaced on each connect.
    cancel_child: Mutex<CancellationToken>,
    client: Mutex<Option<MachinesClient>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Create a controller from configuration. Does NOT connect.
    pub fn new(config: ControllerConfig) -> Self {
        let store = Arc::new(MachineStore::new());
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Self {
            inner: Arc::new(ControllerInner {
                config,
                store,
                connection_state,
                cancel,
                cancel_child: Mutex::new(cancel_child),
                client: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<MachineStore> {
        &self.inner.store
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Connect to the status server.
    ///
    /// Fetches the initial snapshot, then subscribes to the push channel
    /// (when enabled). A failed initial fetch is logged and otherwise
    /// ignored: the store stays empty until the first push arrives.
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.stop_session().await;
        self.set_state(ConnectionState::Connecting);

        let config = &self.inner.config;
        let transport = build_transport(config);

        let client = match MachinesClient::new(config.url.clone(), &transport) {
            Ok(client) => client,
            Err(e) => {
                self.set_state(ConnectionState::Failed);
                return Err(e.into());
            }
        };
        *self.inner.client.lock().await = Some(client);

        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        if let Err(e) = self.refresh().await {
            warn!(error = %e, "initial machine fetch failed");
        }

        if config.websocket_enabled {
            let url = match socket_url(&config.url, &config.socket_path) {
                Ok(url) => url,
                Err(e) => {
                    self.set_state(ConnectionState::Failed);
                    return Err(e.into());
                }
            };
            debug!(%url, "subscribing to push channel");

            let stream = StatusStream::connect(url, config.reconnect.clone(), child.clone());
            let ctrl = self.clone();
            self.inner
                .task_handles
                .lock()
                .await
                .push(tokio::spawn(push_task(ctrl, stream, child)));
        }

        self.set_state(ConnectionState::Connected);
        info!(url = %config.url, "connected to status server");
        Ok(())
    }

    /// Disconnect from the status server.
    ///
    /// Cancels background tasks, waits for them, empties the store and
    /// resets the state to [`Disconnected`](ConnectionState::Disconnected).
    pub async fn disconnect(&self) {
        self.stop_session().await;
        *self.inner.client.lock().await = None;
        self.inner.store.clear();
        self.set_state(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    /// Cancel the current session's tasks and wait for them to finish.
    async fn stop_session(&self) {
        self.inner.cancel_child.lock().await.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "push task ended abnormally");
            }
        }
    }

    /// Publish a state even when nobody is subscribed yet.
    fn set_state(&self, state: ConnectionState) {
        self.inner.connection_state.send_replace(state);
    }

    /// Fetch a full snapshot over REST and apply it to the store.
    ///
    /// Returns the number of machines received.
    pub async fn refresh(&self) -> Result<usize, CoreError> {
        let client = self
            .inner
            .client
            .lock()
            .await
            .clone()
            .ok_or(CoreError::Disconnected)?;

        let records = client.list_machines().await?;
        let count = records.len();
        let changed = self
            .inner
            .store
            .apply_snapshot(machines_from_records(records));

        debug!(machines = count, changed, "snapshot refresh complete");
        Ok(count)
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.inner.store.snapshot()
    }

    pub fn machines(&self) -> MachineStream {
        self.inner.store.subscribe()
    }

    pub fn last_snapshot(&self) -> Option<DateTime<Utc>> {
        self.inner.store.last_snapshot()
    }

    // ── Push handling ────────────────────────────────────────────

    fn apply_push_event(&self, event: PushEvent) {
        match event {
            PushEvent::Connected => {
                info!("push channel connected");
                self.set_state(ConnectionState::Connected);
            }
            PushEvent::Snapshot(records) => {
                let count = records.len();
                let machines = machines_from_records(records.iter().cloned());
                let changed = self.inner.store.apply_snapshot(machines);
                debug!(machines = count, changed, "push snapshot applied");
            }
            PushEvent::Disconnected { reason } => {
                warn!(%reason, "push channel disconnected");
            }
            PushEvent::Reconnecting { attempt, delay } => {
                debug!(attempt, ?delay, "push channel reconnecting");
                self.set_state(ConnectionState::Reconnecting { attempt });
            }
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Bridge push-channel events into the store and connection state.
async fn push_task(controller: Controller, mut stream: StatusStream, cancel: CancellationToken) {
    let mut rx = stream.subscribe();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = rx.recv() => match result {
                Ok(event) => controller.apply_push_event(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "push receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    warn!("push channel gave up reconnecting");
                    controller.set_state(ConnectionState::Failed);
                    break;
                }
            },
        }
    }

    stream.shutdown();
}

// ── Helpers ──────────────────────────────────────────────────────

/// Build a [`TransportConfig`] from the controller configuration.
fn build_transport(config: &ControllerConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
