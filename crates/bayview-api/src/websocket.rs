//! `network-status` push channel with auto-reconnect.
//!
//! Speaks Socket.IO over the websocket transport, subscribes to the default
//! namespace, and streams full machine snapshots through a
//! [`tokio::sync::broadcast`] channel. Handles heartbeats and reconnection
//! with exponential backoff + jitter automatically.
//!
//! # Example
//!
//! ```rust,ignore
//! use bayview_api::websocket::{socket_url, PushEvent, ReconnectConfig, StatusStream};
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let url = socket_url(&"http://localhost:12000".parse()?, "/socket.io/")?;
//!
//! let mut stream = StatusStream::connect(url, ReconnectConfig::default(), cancel.clone());
//! let mut rx = stream.subscribe();
//!
//! while let Ok(event) = rx.recv().await {
//!     if let PushEvent::Snapshot(machines) = event {
//!         println!("{} machines", machines.len());
//!     }
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::models::{MachineRecord, MachinesPayload};
use crate::socketio::{self, EnginePacket, SocketPacket};

// ── Constants ────────────────────────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Event name carrying full machine snapshots.
pub const STATUS_EVENT: &str = "network-status";

/// Default Socket.IO mount path on the status server.
pub const DEFAULT_SOCKET_PATH: &str = "/socket.io/";

/// How long to wait for the Engine.IO open packet after the upgrade.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(20);

// ── PushEvent ────────────────────────────────────────────────────────

/// Something that happened on the push channel.
#[derive(Debug, Clone)]
pub enum PushEvent {
    /// Namespace joined; snapshots will follow.
    Connected,
    /// A full replacement machine list.
    Snapshot(Arc<Vec<MachineRecord>>),
    /// Connection lost or closed.
    Disconnected { reason: String },
    /// Waiting before the next connection attempt.
    Reconnecting { attempt: u32, delay: Duration },
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── URL construction ─────────────────────────────────────────────────

/// Derive the websocket endpoint from the status server base URL.
///
/// `http` maps to `ws`, `https` to `wss`; the socket path is appended to
/// any path prefix on the base, and the Engine.IO query is set.
pub fn socket_url(base: &Url, socket_path: &str) -> Result<Url, Error> {
    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(Error::UnsupportedScheme(other.to_owned())),
    };

    let mut url = base.clone();
    url.set_scheme(scheme)
        .map_err(|()| Error::UnsupportedScheme(base.scheme().to_owned()))?;

    let prefix = base.path().trim_end_matches('/');
    let path = socket_path.trim_start_matches('/');
    let mut full_path = format!("{prefix}/{path}");
    if !full_path.ends_with('/') {
        full_path.push('/');
    }
    url.set_path(&full_path);
    url.set_query(Some("EIO=4&transport=websocket"));
    url.set_fragment(None);
    Ok(url)
}

// ── StatusStream ─────────────────────────────────────────────────────

/// Handle to a running push-channel subscription.
///
/// Owned by whoever started it; call [`shutdown`](Self::shutdown) (or
/// cancel the token passed to [`connect`](Self::connect)) to tear down
/// the background task.
pub struct StatusStream {
    /// Receiver created before the loop started; handed to the first subscriber.
    first_rx: Option<broadcast::Receiver<PushEvent>>,
    /// Weak so the channel closes once the loop gives up.
    event_tx: broadcast::WeakSender<PushEvent>,
    cancel: CancellationToken,
}

impl StatusStream {
    /// Spawn the connect/reconnect loop and return immediately.
    ///
    /// The first connection attempt happens asynchronously. The first call
    /// to [`subscribe`](Self::subscribe) sees every event from the very
    /// first one on; later calls start at the tail.
    pub fn connect(url: Url, reconnect: ReconnectConfig, cancel: CancellationToken) -> Self {
        let (event_tx, first_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let weak_tx = event_tx.downgrade();

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            ws_loop(url, event_tx, reconnect, task_cancel).await;
        });

        Self {
            first_rx: Some(first_rx),
            event_tx: weak_tx,
            cancel,
        }
    }

    /// Get a broadcast receiver for the event stream.
    ///
    /// Once the loop has exited the returned receiver is already closed.
    pub fn subscribe(&mut self) -> broadcast::Receiver<PushEvent> {
        if let Some(rx) = self.first_rx.take() {
            return rx;
        }
        match self.event_tx.upgrade() {
            Some(tx) => tx.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    /// Signal the background task to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read → on drop, backoff → reconnect.
async fn ws_loop(
    url: Url,
    event_tx: broadcast::Sender<PushEvent>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&url, &event_tx, &cancel) => result,
        };

        if cancel.is_cancelled() {
            break;
        }

        let reason = match result {
            // Joined the namespace before dropping: start the backoff over.
            Ok(true) => {
                attempt = 0;
                "connection closed".to_owned()
            }
            Ok(false) => "connection closed before handshake".to_owned(),
            Err(e) => {
                tracing::warn!(error = %e, attempt, "push channel error");
                e.to_string()
            }
        };
        let _ = event_tx.send(PushEvent::Disconnected { reason });

        if let Some(max) = reconnect.max_retries {
            if attempt >= max {
                tracing::error!(max_retries = max, "push channel reconnection limit reached");
                break;
            }
        }

        let delay = calculate_backoff(attempt, &reconnect);
        tracing::info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "waiting before reconnect"
        );
        let _ = event_tx.send(PushEvent::Reconnecting {
            attempt: attempt + 1,
            delay,
        });

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }

        attempt = attempt.saturating_add(1);
    }

    tracing::debug!("push channel loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Run one websocket session until it drops.
///
/// Returns `Ok(true)` when the namespace was joined before the session ended.
async fn connect_and_read(
    url: &Url,
    event_tx: &broadcast::Sender<PushEvent>,
    cancel: &CancellationToken,
) -> Result<bool, Error> {
    tracing::info!(url = %url, "connecting to push channel");

    let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
    let (mut write, mut read) = ws_stream.split();

    let mut session = Session::default();
    let mut deadline = Instant::now() + HANDSHAKE_TIMEOUT;

    loop {
        let frame = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                let _ = write.send(tungstenite::Message::Close(None)).await;
                return Ok(session.joined);
            }
            () = tokio::time::sleep_until(deadline) => {
                return Err(Error::Timeout {
                    timeout_secs: session.heartbeat_window().as_secs(),
                });
            }
            frame = read.next() => frame,
        };

        match frame {
            Some(Ok(tungstenite::Message::Text(text))) => {
                match session.handle_text(text.as_str(), event_tx)? {
                    Step::Continue => {}
                    Step::Reply(reply) => {
                        write
                            .send(tungstenite::Message::text(reply))
                            .await
                            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
                        // A reply is only sent for the open packet and pings,
                        // both of which restart the heartbeat clock.
                        deadline = Instant::now() + session.heartbeat_window();
                    }
                    Step::Close => return Ok(session.joined),
                }
            }
            Some(Ok(tungstenite::Message::Close(frame))) => {
                if let Some(ref cf) = frame {
                    tracing::info!(code = %cf.code, reason = %cf.reason, "push channel closed by server");
                    if !session.joined {
                        return Err(Error::WebSocketClosed {
                            code: u16::from(cf.code),
                            reason: cf.reason.to_string(),
                        });
                    }
                }
                return Ok(session.joined);
            }
            Some(Ok(_)) => {
                // Binary, websocket-level Ping/Pong, raw frames: not used by Engine.IO text mode.
            }
            Some(Err(e)) => return Err(Error::WebSocketConnect(e.to_string())),
            None => {
                tracing::info!("push channel stream ended");
                return Ok(session.joined);
            }
        }
    }
}

// ── Frame handling ───────────────────────────────────────────────────

/// What the read loop should do after a frame.
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Continue,
    Reply(String),
    Close,
}

/// Per-connection protocol state.
#[derive(Debug, Default)]
struct Session {
    ping_interval: Duration,
    ping_timeout: Duration,
    opened: bool,
    joined: bool,
}

impl Session {
    /// Time without a server ping after which the connection is considered dead.
    fn heartbeat_window(&self) -> Duration {
        if self.opened {
            self.ping_interval + self.ping_timeout
        } else {
            HANDSHAKE_TIMEOUT
        }
    }

    fn handle_text(
        &mut self,
        text: &str,
        event_tx: &broadcast::Sender<PushEvent>,
    ) -> Result<Step, Error> {
        match socketio::decode_engine(text)? {
            EnginePacket::Open(open) => {
                tracing::debug!(sid = %open.sid, ping_interval = open.ping_interval, "engine.io open");
                self.ping_interval = Duration::from_millis(open.ping_interval);
                self.ping_timeout = Duration::from_millis(open.ping_timeout);
                self.opened = true;
                Ok(Step::Reply(socketio::connect_frame(socketio::ROOT_NAMESPACE)))
            }
            EnginePacket::Ping(payload) => {
                tracing::trace!("engine.io ping");
                Ok(Step::Reply(format!("{}{payload}", socketio::PONG_FRAME)))
            }
            EnginePacket::Close => Ok(Step::Close),
            EnginePacket::Message(body) => self.handle_message(&body, event_tx),
            EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {
                Ok(Step::Continue)
            }
        }
    }

    fn handle_message(
        &mut self,
        body: &str,
        event_tx: &broadcast::Sender<PushEvent>,
    ) -> Result<Step, Error> {
        let packet = match socketio::decode_socket(body) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(error = %e, "skipping undecodable Socket.IO packet");
                return Ok(Step::Continue);
            }
        };

        if packet.namespace() != socketio::ROOT_NAMESPACE {
            return Ok(Step::Continue);
        }

        match packet {
            SocketPacket::Connect { .. } => {
                tracing::info!("push channel connected");
                self.joined = true;
                let _ = event_tx.send(PushEvent::Connected);
                Ok(Step::Continue)
            }
            SocketPacket::ConnectError { data, .. } => {
                let message = data
                    .as_ref()
                    .and_then(|d| d.get("message"))
                    .and_then(Value::as_str)
                    .unwrap_or("namespace connect refused")
                    .to_owned();
                Err(Error::Protocol(message))
            }
            SocketPacket::Disconnect { .. } => Ok(Step::Close),
            SocketPacket::Event { name, args, .. } if name == STATUS_EVENT => {
                broadcast_snapshot(args.into_iter().next(), event_tx);
                Ok(Step::Continue)
            }
            SocketPacket::Event { name, .. } => {
                tracing::trace!(event = %name, "ignoring event");
                Ok(Step::Continue)
            }
            SocketPacket::Ack { .. } => Ok(Step::Continue),
        }
    }
}

/// Decode a `network-status` payload and broadcast it as a snapshot.
///
/// A payload without a `machines` array is dropped rather than clearing
/// the current list.
fn broadcast_snapshot(payload: Option<Value>, event_tx: &broadcast::Sender<PushEvent>) {
    let Some(payload) = payload else {
        tracing::debug!("network-status event without payload");
        return;
    };

    match serde_json::from_value::<MachinesPayload>(payload) {
        Ok(MachinesPayload {
            machines: Some(machines),
        }) => {
            tracing::debug!(count = machines.len(), "network-status snapshot");
            // Ignore send errors -- just means no active subscribers right now
            let _ = event_tx.send(PushEvent::Snapshot(Arc::new(machines)));
        }
        Ok(_) => tracing::debug!("network-status payload has no machines"),
        Err(e) => tracing::debug!(error = %e, "failed to decode network-status payload"),
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) * (1 +- 0.25)`
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt.min(30)).unwrap_or(30);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────
