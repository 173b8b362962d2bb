// bayview-api: Async client for the machine status server (REST snapshot + Socket.IO push)

pub mod client;
pub mod error;
pub mod models;
pub mod socketio;
pub mod transport;
pub mod websocket;

pub use client::MachinesClient;
pub use error::Error;
pub use models::{MachineRecord, ProbeRecord, ProbeResults};
pub use transport::{TlsMode, TransportConfig};
pub use websocket::{PushEvent, ReconnectConfig, StatusStream};
